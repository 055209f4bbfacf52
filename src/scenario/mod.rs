/// 场景模块 - 套件加载、场景定义与运行前预检
pub mod loader;
pub mod plan;
pub mod types;

pub use loader::{collect_scenarios, load_suite, load_suites, parse_json, parse_toml};
pub use plan::{PlanError, ResolvedStep, ScenarioPlan, StepPlan};
pub use types::{FailurePolicy, FixtureRef, ScenarioDef, StepDef, Suite};
