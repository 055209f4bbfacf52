use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::assertion::{AssertionResult, evaluate};
use crate::fixture::FixtureStore;
use crate::http::Response;
use crate::runner::cancel::CancelSignal;
use crate::runner::executor::StepExecutor;
use crate::runner::types::{ScenarioError, ScenarioReport, StepSummary};
use crate::scenario::{FailurePolicy, ScenarioDef, ScenarioPlan, StepPlan};
use crate::variable::{VariableScope, capture};
use crate::{Result, RucheckError};

/// 单个步骤的执行结果
struct StepOutcome {
    results: Vec<AssertionResult>,
    summary: StepSummary,
    error: Option<RucheckError>,
}

/// 场景编排器
///
/// 场景内的步骤严格顺序执行；每次运行使用新的变量作用域。
pub struct ScenarioRunner {
    executor: StepExecutor,
    fixtures: Arc<FixtureStore>,
    seed: Arc<HashMap<String, Value>>,
    failure_policy: FailurePolicy,
    scenario_timeout: Option<Duration>,
}

impl ScenarioRunner {
    pub fn new(
        executor: StepExecutor,
        fixtures: Arc<FixtureStore>,
        seed: HashMap<String, Value>,
        failure_policy: FailurePolicy,
        scenario_timeout: Option<Duration>,
    ) -> Self {
        Self {
            executor,
            fixtures,
            seed: Arc::new(seed),
            failure_policy,
            scenario_timeout,
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.executor.base_url()
    }

    /// 运行一个场景，引擎错误体现在报告中而不是返回值
    pub async fn run(
        &self,
        index: usize,
        scenario: &ScenarioDef,
        mut cancel: CancelSignal,
    ) -> ScenarioReport {
        let name = scenario.name.clone();
        let suite = scenario.suite.clone();

        if scenario.skip {
            info!(scenario = %name, "scenario skipped");
            return ScenarioReport::skipped(index, name, suite);
        }

        let started = Instant::now();
        info!(scenario = %name, steps = scenario.steps.len(), "running scenario");

        let plan = match ScenarioPlan::build(scenario, &self.fixtures, &self.seed) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(scenario = %name, step = e.step_index, error = %e.error, "preflight failed");
                let error = ScenarioError::at_step(&e.error, e.step_index, e.step_name.as_deref());
                return ScenarioReport::finish(
                    index,
                    name,
                    suite,
                    Vec::new(),
                    Vec::new(),
                    Some(error),
                    started.elapsed(),
                );
            }
        };

        let policy = plan.failure_policy.unwrap_or(self.failure_policy);
        let deadline = self
            .scenario_timeout
            .map(|budget| tokio::time::Instant::now() + budget);

        let mut scope = VariableScope::seeded(&self.seed);
        let mut results = Vec::new();
        let mut steps = Vec::with_capacity(plan.steps.len());
        let mut error = None;

        for step in &plan.steps {
            let outcome = self
                .run_step(step, policy, &mut scope, &mut cancel, deadline)
                .await;
            let step_failed = outcome.results.iter().any(|r| !r.passed);

            results.extend(outcome.results);
            steps.push(outcome.summary);

            if let Some(e) = outcome.error {
                warn!(scenario = %name, step = step.index, error = %e, "step errored");
                error = Some(ScenarioError::at_step(&e, step.index, step.name.as_deref()));
                break;
            }
            if step_failed && policy == FailurePolicy::HaltOnFirstFailure {
                debug!(scenario = %name, step = step.index, "halting after failed step");
                break;
            }
        }

        let report = ScenarioReport::finish(
            index,
            name,
            suite,
            results,
            steps,
            error,
            started.elapsed(),
        );
        info!(
            scenario = %report.name,
            status = ?report.status,
            duration_ms = report.duration_ms,
            "scenario finished"
        );
        report
    }

    async fn run_step(
        &self,
        step: &StepPlan,
        policy: FailurePolicy,
        scope: &mut VariableScope,
        cancel: &mut CancelSignal,
        deadline: Option<tokio::time::Instant>,
    ) -> StepOutcome {
        let started = Instant::now();
        let mut summary = StepSummary {
            index: step.index,
            name: step.name.clone(),
            method: step.method.to_string(),
            url: step.url.clone(),
            status: None,
            duration_ms: 0,
            assertions: 0,
            passed: false,
        };

        let outcome = self.exchange(step, scope, cancel, deadline, &mut summary).await;
        summary.duration_ms = started.elapsed().as_millis() as u64;

        let (results, error) = match outcome {
            Ok(response) => {
                let results = evaluate(&step.assertions, &response);
                let halting =
                    policy == FailurePolicy::HaltOnFirstFailure && results.iter().any(|r| !r.passed);
                // 场景即将停止时不再捕获，断言失败不会被捕获错误覆盖
                let error = if halting {
                    None
                } else {
                    step.captures
                        .iter()
                        .try_for_each(|directive| capture(scope, directive, &response))
                        .err()
                };
                (results, error)
            }
            Err(RucheckError::UnexpectedStatus { status }) => {
                summary.status = Some(status);
                let result = AssertionResult::failure(
                    "status is 2xx/3xx".to_string(),
                    json!(status),
                    json!("2xx/3xx"),
                    format!("failOnStatusCode: unexpected status {}", status),
                );
                (vec![result], None)
            }
            Err(e) => (Vec::new(), Some(e)),
        };

        let results: Vec<AssertionResult> = results
            .into_iter()
            .map(|r| r.for_step(step.index, step.name.as_deref()))
            .collect();
        summary.assertions = results.len();
        summary.passed = error.is_none() && results.iter().all(|r| r.passed);

        debug!(
            step = %step.label(),
            status = ?summary.status,
            assertions = summary.assertions,
            passed = summary.passed,
            "step finished"
        );

        StepOutcome {
            results,
            summary,
            error,
        }
    }

    /// 替换占位符并发出请求，受场景时间预算与取消信号约束
    async fn exchange(
        &self,
        step: &StepPlan,
        scope: &VariableScope,
        cancel: &mut CancelSignal,
        deadline: Option<tokio::time::Instant>,
        summary: &mut StepSummary,
    ) -> Result<Response> {
        if cancel.is_cancelled() {
            return Err(RucheckError::Cancelled);
        }

        let resolved = step.resolve(scope)?;
        summary.url = resolved.url.clone();

        let response = match (deadline, self.scenario_timeout) {
            (Some(deadline), Some(budget)) => {
                tokio::time::timeout_at(deadline, self.executor.execute(&resolved, cancel))
                    .await
                    .map_err(|_| RucheckError::Timeout(budget))??
            }
            _ => self.executor.execute(&resolved, cancel).await?,
        };

        summary.status = Some(response.status.code());
        Ok(response)
    }
}
