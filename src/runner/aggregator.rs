use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::runner::types::{RunReport, ScenarioReport, Totals};

/// 生成运行报告
///
/// 场景按声明顺序排列，并发完成的先后不影响报告内容。
pub fn finalize(
    mut reports: Vec<ScenarioReport>,
    base_url: Option<&str>,
    started_at: DateTime<Utc>,
    duration: Duration,
) -> RunReport {
    reports.sort_by_key(|r| r.index);

    RunReport {
        run_id: Uuid::new_v4(),
        started_at,
        duration_ms: duration.as_millis() as u64,
        base_url: base_url.map(str::to_string),
        totals: Totals::from_reports(&reports),
        scenarios: reports,
    }
}
