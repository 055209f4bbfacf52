/// 运行模块 - 场景编排、并发执行与报告
pub mod aggregator;
pub mod cancel;
pub mod executor;
pub mod orchestrator;
pub mod pool;
pub mod reporter;
pub mod types;

pub use aggregator::finalize;
pub use cancel::{CancelHandle, CancelSignal};
pub use executor::StepExecutor;
pub use orchestrator::ScenarioRunner;
pub use pool::{run_all, run_scenarios};
pub use reporter::{ConsoleReporter, write_json_report};
pub use types::{
    RunOptions, RunReport, ScenarioError, ScenarioReport, ScenarioStatus, StepSummary, Totals,
};
