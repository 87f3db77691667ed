//! Stride 命令行入口
//!
//! 加载配置，为选定场景构建 LlmProcessor 并注册命令实现，然后逐步驱动直到目标达成、步数用尽或 Ctrl-C。

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use stride::config::load_config;
use stride::mirror::WatchMirror;
use stride::{ProcessorBuilder, Scenario, StepRunner};

#[derive(Parser)]
#[command(name = "stride", about = "Single-step LLM decision loop over a command catalog", version)]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(short, long, env = "STRIDE_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// 场景：calculator | coffee_maker | maze_solver
    #[arg(short, long)]
    scenario: Option<String>,

    /// 最多执行的步数
    #[arg(long)]
    max_steps: Option<usize>,

    /// 推理后端：hosted | local | mock
    #[arg(long)]
    provider: Option<String>,

    /// 启动 Prompt 镜像网页（需要 web 特性）
    #[arg(long)]
    mirror: bool,

    /// 输出 debug 日志（包括完整 Prompt 与模型原始回复）
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    stride::observability::init(if cli.verbose { "debug" } else { "info" });

    let mut cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    if let Some(provider) = cli.provider {
        cfg.llm.provider = provider;
    }
    if let Some(scenario) = cli.scenario {
        cfg.run.scenario = scenario;
    }
    if let Some(max_steps) = cli.max_steps {
        cfg.run.max_steps = max_steps;
    }
    cfg.mirror.enabled |= cli.mirror;

    let scenario: Scenario = cfg.run.scenario.parse().map_err(anyhow::Error::msg)?;
    let dir = cfg.run.scenarios_dir.join(scenario.dir_name());
    tracing::info!(%scenario, dir = %dir.display(), provider = %cfg.llm.provider, "starting");

    let mut builder = ProcessorBuilder::for_scenario_dir(cfg.clone(), &dir);
    if cfg.mirror.enabled {
        let mirror = Arc::new(WatchMirror::new());
        start_mirror(&cfg, &mirror).await?;
        builder = builder.with_mirror(mirror);
    }
    let mut processor = builder.build().context("Failed to build processor")?;
    scenario
        .install(&mut processor, &dir)
        .context("Failed to install scenario")?;

    let runner = StepRunner::new(cfg.run.max_steps).with_validation(cfg.run.validate_before_dispatch);
    let cancel = runner.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping after the current step");
            cancel.cancel();
        }
    });

    let report = runner
        .run(&mut processor, |history| scenario.is_goal_achieved(history))
        .await
        .context("Run aborted")?;

    for (i, decision) in report.decisions.iter().enumerate() {
        println!("=== Step {} ===", i + 1);
        println!("{}", serde_json::to_string_pretty(decision)?);
    }
    println!("\n=== Execution History ===");
    for entry in processor.history() {
        println!("- {} {}", entry.command_name, serde_json::Value::Object(entry.parameters.clone()));
        println!("  result: {}", entry.result);
    }
    if !processor.knowledge().is_empty() {
        println!("\n=== Knowledge ===\n{}", processor.knowledge());
    }
    let (prompt, completion, total) = processor.token_usage();
    println!(
        "\nrun {}: {} steps, goal {}{} (tokens: {} prompt / {} completion / {} total)",
        report.run_id,
        report.steps,
        if report.goal_reached { "reached" } else { "not reached" },
        if report.cancelled { ", cancelled" } else { "" },
        prompt,
        completion,
        total
    );
    Ok(())
}

#[cfg(feature = "web")]
async fn start_mirror(cfg: &stride::config::AppConfig, mirror: &WatchMirror) -> anyhow::Result<()> {
    let addr: std::net::SocketAddr = format!("{}:{}", cfg.mirror.host, cfg.mirror.port)
        .parse()
        .context("Invalid mirror address")?;
    stride::mirror::serve_mirror(addr, mirror.subscribe())
        .await
        .context("Failed to start prompt mirror")?;
    Ok(())
}

#[cfg(not(feature = "web"))]
async fn start_mirror(_cfg: &stride::config::AppConfig, _mirror: &WatchMirror) -> anyhow::Result<()> {
    tracing::warn!("Prompt mirror page needs the `web` feature; prompts are only kept in memory");
    Ok(())
}
