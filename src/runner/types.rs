use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::assertion::AssertionResult;
use crate::error::{ErrorKind, RucheckError};
use crate::scenario::FailurePolicy;

/// 运行参数（配置文件与命令行合并后的结果）
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub base_url: Option<String>,
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
    /// 单个场景的累计时间预算
    pub scenario_timeout: Option<Duration>,
    pub request_timeout: Duration,
    /// 每个场景开始时的初始变量
    pub seed: HashMap<String, Value>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            concurrency: 1,
            failure_policy: FailurePolicy::default(),
            scenario_timeout: None,
            request_timeout: Duration::from_secs(30),
            seed: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Errored,
    Skipped,
}

impl ScenarioStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, ScenarioStatus::Failed | ScenarioStatus::Errored)
    }
}

/// 导致场景 Errored 的引擎错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioError {
    pub kind: ErrorKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,

    pub message: String,
}

impl ScenarioError {
    pub fn at_step(error: &RucheckError, step_index: usize, step_name: Option<&str>) -> Self {
        Self {
            kind: error.kind(),
            step_index: Some(step_index),
            step_name: step_name.map(str::to_string),
            message: error.to_string(),
        }
    }
}

/// 单个步骤的执行摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSummary {
    pub index: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub method: String,

    /// 实际请求的 URL（占位符已替换）
    pub url: String,

    /// 响应状态码（请求失败时为空）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    pub duration_ms: u64,

    /// 本步骤产生的断言结果数量
    pub assertions: usize,

    pub passed: bool,
}

/// 单个场景的报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    /// 声明顺序（跨套件）
    pub index: usize,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,

    pub status: ScenarioStatus,

    pub step_results: Vec<AssertionResult>,

    /// stepResults 中第一个失败结果的位置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_failure_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ScenarioError>,

    pub steps: Vec<StepSummary>,

    pub duration_ms: u64,
}

impl ScenarioReport {
    /// 根据结果与错误确定最终状态
    pub fn finish(
        index: usize,
        name: String,
        suite: Option<String>,
        step_results: Vec<AssertionResult>,
        steps: Vec<StepSummary>,
        error: Option<ScenarioError>,
        duration: Duration,
    ) -> Self {
        let first_failure_index = step_results.iter().position(|r| !r.passed);
        let status = if error.is_some() {
            ScenarioStatus::Errored
        } else if first_failure_index.is_some() {
            ScenarioStatus::Failed
        } else {
            ScenarioStatus::Passed
        };

        Self {
            index,
            name,
            suite,
            status,
            step_results,
            first_failure_index,
            error,
            steps,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn skipped(index: usize, name: String, suite: Option<String>) -> Self {
        Self {
            status: ScenarioStatus::Skipped,
            ..Self::finish(index, name, suite, Vec::new(), Vec::new(), None, Duration::ZERO)
        }
    }

    pub fn passed_assertions(&self) -> usize {
        self.step_results.iter().filter(|r| r.passed).count()
    }

    pub fn failed_assertions(&self) -> usize {
        self.step_results.len() - self.passed_assertions()
    }
}

/// 汇总统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub scenarios: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
    pub assertions_passed: usize,
    pub assertions_failed: usize,
}

impl Totals {
    pub fn from_reports(reports: &[ScenarioReport]) -> Self {
        let count = |status: ScenarioStatus| reports.iter().filter(|r| r.status == status).count();

        Self {
            scenarios: reports.len(),
            passed: count(ScenarioStatus::Passed),
            failed: count(ScenarioStatus::Failed),
            errored: count(ScenarioStatus::Errored),
            skipped: count(ScenarioStatus::Skipped),
            assertions_passed: reports.iter().map(ScenarioReport::passed_assertions).sum(),
            assertions_failed: reports.iter().map(ScenarioReport::failed_assertions).sum(),
        }
    }
}

/// 一次运行的完整报告，生成后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    pub totals: Totals,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    /// 没有 Failed 或 Errored 场景
    pub fn is_success(&self) -> bool {
        self.totals.failed == 0 && self.totals.errored == 0
    }
}
