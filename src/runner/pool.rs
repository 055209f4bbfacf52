use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::Result;
use crate::error::RucheckError;
use crate::fixture::FixtureStore;
use crate::http::Client;
use crate::runner::aggregator::finalize;
use crate::runner::cancel::CancelHandle;
use crate::runner::executor::StepExecutor;
use crate::runner::orchestrator::ScenarioRunner;
use crate::runner::types::{RunOptions, RunReport, ScenarioError, ScenarioReport};
use crate::scenario::ScenarioDef;

/// 运行所有场景并生成报告
pub async fn run_all(
    scenarios: Vec<ScenarioDef>,
    fixtures: FixtureStore,
    options: RunOptions,
    cancel: &CancelHandle,
) -> Result<RunReport> {
    let client = Client::with_timeout(options.request_timeout)?;
    let executor = StepExecutor::new(client, options.base_url.as_deref())?;
    let runner = Arc::new(ScenarioRunner::new(
        executor,
        Arc::new(fixtures),
        options.seed,
        options.failure_policy,
        options.scenario_timeout,
    ));

    info!(
        scenarios = scenarios.len(),
        concurrency = options.concurrency,
        "starting run"
    );
    let started_at = Utc::now();
    let started = Instant::now();
    let reports = run_scenarios(
        runner.clone(),
        Arc::new(scenarios),
        options.concurrency,
        cancel,
    )
    .await;

    Ok(finalize(reports, runner.base_url(), started_at, started.elapsed()))
}

/// 以固定数量的 worker 并发运行场景
///
/// 每个 worker 从共享计数器领取下一个场景下标，结果通过 channel 回传。
/// 返回的报告按声明顺序排列，与完成顺序无关。
pub async fn run_scenarios(
    runner: Arc<ScenarioRunner>,
    scenarios: Arc<Vec<ScenarioDef>>,
    concurrency: usize,
    cancel: &CancelHandle,
) -> Vec<ScenarioReport> {
    let total = scenarios.len();
    let worker_count = concurrency.clamp(1, total.max(1));
    let next_index = Arc::new(AtomicUsize::new(0));
    let (report_tx, mut report_rx) = mpsc::channel::<(usize, ScenarioReport)>(worker_count);

    let mut handles = Vec::with_capacity(worker_count);
    for worker in 0..worker_count {
        let runner = runner.clone();
        let scenarios = scenarios.clone();
        let next_index = next_index.clone();
        let report_tx = report_tx.clone();
        let signal = cancel.signal();

        handles.push(tokio::spawn(async move {
            loop {
                let index = next_index.fetch_add(1, Ordering::Relaxed);
                let Some(scenario) = scenarios.get(index) else {
                    break;
                };
                debug!(worker, index, scenario = %scenario.name, "worker picked scenario");

                let report = runner.run(index, scenario, signal.clone()).await;
                if report_tx.send((index, report)).await.is_err() {
                    break;
                }
            }
        }));
    }
    drop(report_tx);

    let mut slots: Vec<Option<ScenarioReport>> = vec![None; total];
    while let Some((index, report)) = report_rx.recv().await {
        slots[index] = Some(report);
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "scenario worker failed");
        }
    }

    // worker 异常退出时，未完成的场景记为 Errored
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                let scenario = &scenarios[index];
                let error = RucheckError::Other("scenario worker stopped unexpectedly".to_string());
                ScenarioReport::finish(
                    index,
                    scenario.name.clone(),
                    scenario.suite.clone(),
                    Vec::new(),
                    Vec::new(),
                    Some(ScenarioError {
                        kind: error.kind(),
                        step_index: None,
                        step_name: None,
                        message: error.to_string(),
                    }),
                    Duration::ZERO,
                )
            })
        })
        .collect()
}
