//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `STRIDE__*` 覆盖（双下划线表示嵌套，如 `STRIDE__LLM__PROVIDER=local`）。
//! `.env` 在此之前载入，托管凭据（OPENAI_API_KEY）可以放在其中。

use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::{DEFAULT_MODEL, HOSTED_BASE_URL, LOCAL_API_KEY, LOCAL_BASE_URL};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub processor: ProcessorSection,
    pub mirror: MirrorSection,
    pub run: RunSection,
}

/// [llm] 段：部署配置（hosted / local / mock）、模型、超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub provider: String,
    pub model: String,
    /// 覆盖所选部署的 base_url
    pub base_url: Option<String>,
    pub local: LlmLocalSection,
    pub hosted: LlmHostedSection,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "hosted".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            local: LlmLocalSection::default(),
            hosted: LlmHostedSection::default(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmLocalSection {
    pub base_url: String,
    pub api_key: String,
}

impl Default for LlmLocalSection {
    fn default() -> Self {
        Self {
            base_url: LOCAL_BASE_URL.to_string(),
            api_key: LOCAL_API_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmHostedSection {
    pub base_url: String,
    /// 存放凭据的环境变量名
    pub api_key_env: String,
}

impl Default for LlmHostedSection {
    fn default() -> Self {
        Self {
            base_url: HOSTED_BASE_URL.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒），由传输层施加
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [processor] 段：历史窗口与提炼节奏
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessorSection {
    /// 决策 Prompt 中包含的最近历史条数
    pub history_size: usize,
    /// 每隔多少步提炼一次知识（必须 >= 1）
    pub summary_interval: u64,
    /// 提炼时取最近多少条历史
    pub summary_window: usize,
}

impl Default for ProcessorSection {
    fn default() -> Self {
        Self {
            history_size: 10,
            summary_interval: 7,
            summary_window: 15,
        }
    }
}

/// [mirror] 段：Prompt 镜像网页
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MirrorSection {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for MirrorSection {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// [run] 段：命令行驱动的场景与步数上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub scenario: String,
    pub max_steps: usize,
    /// 场景文档目录（每个场景一个子目录，含 functions.json / goal.yaml）
    pub scenarios_dir: PathBuf,
    /// 分发前校验 required 参数（不通过只告警）
    pub validate_before_dispatch: bool,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            scenario: "calculator".to_string(),
            max_steps: 10,
            scenarios_dir: PathBuf::from("config/scenarios"),
            validate_before_dispatch: true,
        }
    }
}

/// 从 config 目录加载配置，环境变量 STRIDE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 STRIDE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    // .env 缺失是正常情况
    let _ = dotenvy::dotenv();

    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!("config file {} not found, ignoring", path.display());
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("STRIDE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
