use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::warn;

use rucheck::fixture::FixtureStore;
use rucheck::runner::{CancelHandle, ConsoleReporter, RunOptions, run_all, write_json_report};
use rucheck::scenario::{FailurePolicy, load_suites};
use rucheck::variable::{ConfigLoader, RucheckConfig, parse_duration};

/// 未配置时默认使用的 fixture 目录
const DEFAULT_FIXTURES_DIR: &str = "fixtures";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 显示通过的断言与调试日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 运行测试套件
    Run(RunArgs),

    /// 列出套件中的场景（会校验场景名唯一）
    List {
        /// 套件文件（.json 或 .toml）
        #[arg(required = true)]
        suites: Vec<PathBuf>,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// 套件文件（.json 或 .toml）
    #[arg(required = true)]
    pub suites: Vec<PathBuf>,

    /// 配置文件路径，缺省时自动查找 rucheck.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 使用的环境（配置文件中的 [environments.NAME]）
    #[arg(short, long)]
    pub env: Option<String>,

    /// 变量覆盖，可重复: --var key=value
    #[arg(long = "var", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// 基础 URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// fixture 目录
    #[arg(long)]
    pub fixtures: Option<PathBuf>,

    /// 并发运行的场景数
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// 断言失败后继续执行后续步骤
    #[arg(long)]
    pub continue_on_failure: bool,

    /// 单个场景的时间预算（如 30s、500ms、2m）
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// 写出 JSON 报告的路径
    #[arg(long)]
    pub report: Option<PathBuf>,
}

fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    ConfigLoader::parse_cli_var(s).ok_or_else(|| format!("expected key=value, got '{}'", s))
}

fn parse_timeout(s: &str) -> std::result::Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

fn load_config(path: Option<&PathBuf>) -> Result<RucheckConfig> {
    match path {
        Some(path) => ConfigLoader::load_from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ConfigLoader::find_and_load()?.unwrap_or_default()),
    }
}

/// 合并命令行与配置文件，命令行优先
fn build_options(args: &RunArgs, config: &RucheckConfig) -> Result<RunOptions> {
    let defaults = RunOptions::default();

    let failure_policy = if args.continue_on_failure {
        FailurePolicy::ContinueOnFailure
    } else {
        config.run.failure_policy.unwrap_or(defaults.failure_policy)
    };

    let scenario_timeout = match args.timeout {
        Some(timeout) => Some(timeout),
        None => config.scenario_timeout()?,
    };

    Ok(RunOptions {
        base_url: args.base_url.clone().or_else(|| config.run.base_url.clone()),
        concurrency: args
            .concurrency
            .or(config.run.concurrency)
            .unwrap_or(defaults.concurrency)
            .max(1),
        failure_policy,
        scenario_timeout,
        request_timeout: config.request_timeout()?.unwrap_or(defaults.request_timeout),
        seed: ConfigLoader::build_seed(config, args.env.as_deref(), &args.vars)?,
    })
}

fn load_fixtures(args: &RunArgs, config: &RucheckConfig) -> Result<FixtureStore> {
    let dir = match args.fixtures.clone().or_else(|| config.fixtures_dir()) {
        Some(dir) => dir,
        None => {
            let dir = PathBuf::from(DEFAULT_FIXTURES_DIR);
            if !dir.is_dir() {
                return Ok(FixtureStore::new());
            }
            dir
        }
    };

    FixtureStore::load_dir(&dir)
        .with_context(|| format!("Failed to load fixtures from {}", dir.display()))
}

/// 执行 run 子命令，返回是否全部通过
pub async fn run(args: RunArgs, verbose: bool) -> Result<bool> {
    let config = load_config(args.config.as_ref())?;
    let options = build_options(&args, &config)?;
    let fixtures = load_fixtures(&args, &config)?;
    let scenarios = load_suites(args.suites.as_slice())?;

    let (cancel, _) = CancelHandle::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            interrupt.cancel();
        }
    });

    let reporter = ConsoleReporter::new(verbose);
    reporter.print_header(options.base_url.as_deref(), scenarios.len());

    let report = run_all(scenarios, fixtures, options, &cancel).await?;

    for scenario in &report.scenarios {
        reporter.print_scenario(scenario);
    }
    reporter.print_summary(&report);

    if let Some(path) = &args.report {
        write_json_report(&report, path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("Report written to {}", path.display().to_string().bold());
    }

    Ok(report.is_success())
}

/// 执行 list 子命令
pub fn list(suites: &[PathBuf]) -> Result<bool> {
    let scenarios = load_suites(suites)?;

    for (index, scenario) in scenarios.iter().enumerate() {
        let skip = if scenario.skip {
            " (skipped)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            " [{}] {} {} {} steps{}",
            index,
            scenario.suite.as_deref().unwrap_or("-").cyan(),
            scenario.name.bold(),
            scenario.steps.len(),
            skip
        );
    }
    println!("\n{} scenarios", scenarios.len());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["rucheck", "run", "suite.json"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            Commands::List { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_run_args() {
        let args = args(&[
            "--var",
            "token=abc",
            "--var",
            "id=7",
            "-j",
            "4",
            "--timeout",
            "5s",
            "--continue-on-failure",
        ]);
        assert_eq!(args.vars.len(), 2);
        assert_eq!(args.concurrency, Some(4));
        assert_eq!(args.timeout, Some(Duration::from_secs(5)));
        assert!(args.continue_on_failure);
    }

    #[test]
    fn test_invalid_var_rejected() {
        assert!(Cli::try_parse_from(["rucheck", "run", "s.json", "--var", "novalue"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config: RucheckConfig = toml::from_str(
            r#"
[run]
base_url = "http://config.example.com"
concurrency = 2
failure_policy = "continueOnFailure"
request_timeout = "5s"
"#,
        )
        .unwrap();

        let options = build_options(&args(&["--base-url", "http://cli.example.com"]), &config).unwrap();
        assert_eq!(options.base_url.as_deref(), Some("http://cli.example.com"));
        assert_eq!(options.concurrency, 2);
        assert_eq!(options.failure_policy, FailurePolicy::ContinueOnFailure);
        assert_eq!(options.request_timeout, Duration::from_secs(5));
        assert_eq!(options.scenario_timeout, None);
    }

    #[test]
    fn test_defaults_without_config() {
        let options = build_options(&args(&[]), &RucheckConfig::default()).unwrap();
        assert_eq!(options.base_url, None);
        assert_eq!(options.concurrency, 1);
        assert_eq!(options.failure_policy, FailurePolicy::HaltOnFirstFailure);
    }
}
