use std::time::Duration;

use rucheck::ErrorKind;
use rucheck::fixture::FixtureStore;
use rucheck::runner::{
    CancelHandle, RunOptions, RunReport, ScenarioStatus, run_all, write_json_report,
};
use rucheck::scenario::{FailurePolicy, collect_scenarios, parse_json};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_suite(
    server: &MockServer,
    suite: Value,
    fixtures: FixtureStore,
    configure: impl FnOnce(&mut RunOptions),
) -> RunReport {
    let suite = parse_json(&suite.to_string()).unwrap();
    let scenarios = collect_scenarios(vec![suite]).unwrap();

    let mut options = RunOptions {
        base_url: Some(server.uri()),
        ..RunOptions::default()
    };
    configure(&mut options);

    let (cancel, _) = CancelHandle::new();
    run_all(scenarios, fixtures, options, &cancel).await.unwrap()
}

/// 报告内容中去掉耗时
fn without_timing(report: &RunReport) -> Value {
    let mut scenarios = serde_json::to_value(&report.scenarios).unwrap();
    for scenario in scenarios.as_array_mut().unwrap() {
        scenario["durationMs"] = json!(0);
        for step in scenario["steps"].as_array_mut().unwrap() {
            step["durationMs"] = json!(0);
        }
    }
    json!({"totals": report.totals, "scenarios": scenarios})
}

/// 捕获的变量在后续步骤的 URL 中替换
#[tokio::test]
async fn test_capture_feeds_later_step() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "x"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pet/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "x"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [{
        "name": "create then fetch",
        "steps": [
            {
                "method": "POST",
                "url": "/pet",
                "body": {"name": "x"},
                "capture": {"id": "body.id"},
                "assert": ["status == 200"]
            },
            {
                "url": "/pet/${id}",
                "assert": [
                    "status == 200",
                    {"kind": "fieldEquals", "path": "name", "value": "x"}
                ]
            }
        ]
    }]});

    let report = run_suite(&mock_server, suite, FixtureStore::new(), |_| {}).await;

    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Passed);
    assert_eq!(scenario.step_results.len(), 3);
    assert_eq!(scenario.steps[1].url, "/pet/7");
    assert!(report.is_success());
}

/// continueOnFailure 时结果数等于声明的断言数
#[tokio::test]
async fn test_continue_on_failure_evaluates_every_step() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/store/inventory"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"approved": 1, "placed": 2})),
        )
        .mount(&mock_server)
        .await;

    let step = |assertions: Value| json!({"url": "/store/inventory", "assert": assertions});
    let suite = json!({"scenarios": [{
        "name": "inventory",
        "steps": [
            step(json!(["status == 200", "body.approved is integer"])),
            step(json!(["status == 201", "body.placed == 3"])),
            step(json!(["status == 200", "body has keys [approved]"]))
        ]
    }]});

    let report = run_suite(&mock_server, suite.clone(), FixtureStore::new(), |options| {
        options.failure_policy = FailurePolicy::ContinueOnFailure;
    })
    .await;
    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Failed);
    assert_eq!(scenario.step_results.len(), 6);
    assert_eq!(scenario.steps.len(), 3);
    assert_eq!(scenario.first_failure_index, Some(2));
    assert_eq!(report.totals.assertions_failed, 2);

    // 默认策略：第一个失败步骤之后没有结果
    let report = run_suite(&mock_server, suite, FixtureStore::new(), |_| {}).await;
    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Failed);
    assert_eq!(scenario.step_results.len(), 4);
    assert_eq!(scenario.steps.len(), 2);
    assert!(scenario.step_results.iter().all(|r| r.step_index <= 1));
}

/// 场景级失败策略覆盖运行级策略
#[tokio::test]
async fn test_scenario_policy_override() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [{
        "name": "keeps going",
        "failurePolicy": "continueOnFailure",
        "steps": [
            {"url": "/a", "assert": ["status == 200"]},
            {"url": "/b", "assert": ["status == 200"]}
        ]
    }]});

    let report = run_suite(&mock_server, suite, FixtureStore::new(), |_| {}).await;
    assert_eq!(report.scenarios[0].step_results.len(), 2);
}

#[tokio::test]
async fn test_status_one_of() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/store/order/0"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Order not found"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/store/order/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&mock_server)
        .await;

    let assertion = json!({"kind": "statusOneOf", "codes": [400, 404]});
    let suite = json!({"scenarios": [
        {"name": "missing order", "steps": [{"url": "/store/order/0", "assert": [assertion, "body == \"Order not found\""]}]},
        {"name": "existing order", "steps": [{"url": "/store/order/1", "assert": [assertion]}]}
    ]});

    let report = run_suite(&mock_server, suite, FixtureStore::new(), |_| {}).await;

    assert_eq!(report.scenarios[0].status, ScenarioStatus::Passed);
    let failed = &report.scenarios[1].step_results[0];
    assert!(!failed.passed);
    assert_eq!(failed.actual, json!(200));
    assert_eq!(failed.expected, json!([400, 404]));
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_for_each_element_reports_failing_index() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pet/findByStatus"))
        .and(query_param("status", "available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "status": "available"},
            {"id": 2, "status": "sold"}
        ])))
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [{
        "name": "find available",
        "steps": [{
            "url": "/pet/findByStatus",
            "query": {"status": "available"},
            "assert": [{
                "kind": "forEachElement",
                "path": "body",
                "assertions": [{"kind": "fieldEquals", "path": "status", "value": "available"}]
            }]
        }]
    }]});

    let report = run_suite(&mock_server, suite, FixtureStore::new(), |_| {}).await;

    let results = &report.scenarios[0].step_results;
    assert_eq!(results.len(), 2);
    assert!(results[0].passed);
    assert_eq!(results[0].element_index, Some(0));
    assert!(!results[1].passed);
    assert_eq!(results[1].element_index, Some(1));
    assert_eq!(report.scenarios[0].first_failure_index, Some(1));
}

/// 缺失的 fixture 在发出请求前就使场景 Errored
#[tokio::test]
async fn test_missing_fixture_errors_with_zero_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [{
        "name": "place order",
        "steps": [
            {"method": "POST", "url": "/store/order", "fixture": "order1", "assert": ["status == 200"]}
        ]
    }]});

    let report = run_suite(&mock_server, suite, FixtureStore::new(), |_| {}).await;

    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Errored);
    assert!(scenario.step_results.is_empty());
    let error = scenario.error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::FixtureNotFound);
    assert_eq!(error.step_index, Some(0));
}

/// 未捕获的变量在任何请求之前报告 UnboundVariable
#[tokio::test]
async fn test_unbound_variable_errors_before_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [{
        "name": "uses unknown id",
        "steps": [
            {"url": "/store/inventory"},
            {"url": "/store/order/${orderId}"}
        ]
    }]});

    let report = run_suite(&mock_server, suite, FixtureStore::new(), |_| {}).await;

    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Errored);
    let error = scenario.error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::UnboundVariable);
    assert_eq!(error.step_index, Some(1));
    assert!(error.message.contains("orderId"));
}

/// fixture 作为请求体发送，body 覆盖其中的键
#[tokio::test]
async fn test_fixture_body_with_overrides() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/store/order"))
        .and(body_json(json!({"id": 1, "petId": 5, "quantity": 2, "status": "approved"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "status": "approved"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fixtures = FixtureStore::from_documents([(
        "orders",
        json!({"order1": {"id": 1, "petId": 5, "quantity": 2, "status": "placed"}}),
    )])
    .unwrap();

    let suite = json!({"scenarios": [{
        "name": "approve order",
        "steps": [{
            "method": "POST",
            "url": "/store/order",
            "fixture": "order1",
            "body": {"status": "approved"},
            "assert": [{"kind": "bodyIncludes", "value": {"status": "approved"}}]
        }]
    }]});

    let report = run_suite(&mock_server, suite, fixtures, |_| {}).await;
    assert_eq!(report.scenarios[0].status, ScenarioStatus::Passed);
}

/// failOnStatusCode 产生一个合成的失败结果，声明的断言不再求值
#[tokio::test]
async fn test_fail_on_status_code() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/nobody"))
        .respond_with(ResponseTemplate::new(404).set_body_string("User not found"))
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [{
        "name": "strict lookup",
        "steps": [
            {
                "url": "/user/nobody",
                "failOnStatusCode": true,
                "assert": ["status == 404", "body not null"]
            },
            {"url": "/user/nobody"}
        ]
    }]});

    let report = run_suite(&mock_server, suite, FixtureStore::new(), |_| {}).await;

    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Failed);
    assert!(scenario.error.is_none());
    assert_eq!(scenario.step_results.len(), 1);
    assert_eq!(scenario.step_results[0].description, "status is 2xx/3xx");
    assert_eq!(scenario.step_results[0].actual, json!(404));
    assert_eq!(scenario.steps.len(), 1);
    assert_eq!(scenario.steps[0].status, Some(404));
}

/// 捕获路径不存在时场景 Errored，已有的断言结果保留
#[tokio::test]
async fn test_capture_path_missing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200})))
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [{
        "name": "create user",
        "steps": [
            {
                "method": "POST",
                "url": "/user",
                "body": {"username": "user1"},
                "capture": {"userId": "body.id"},
                "assert": ["status == 200"]
            },
            {"url": "/user/${userId}"}
        ]
    }]});

    let report = run_suite(&mock_server, suite, FixtureStore::new(), |_| {}).await;

    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Errored);
    assert_eq!(scenario.step_results.len(), 1);
    assert!(scenario.step_results[0].passed);
    assert_eq!(
        scenario.error.as_ref().unwrap().kind,
        ErrorKind::CapturePathMissing
    );
}

/// 创建失败时：默认策略下场景是 Failed，不会因为捕获不到 id 而变成 Errored
#[tokio::test]
async fn test_failed_create_with_capture() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/store/order"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid input"))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [{
        "name": "create then delete order",
        "steps": [
            {
                "method": "POST",
                "url": "/store/order",
                "body": {"petId": "x"},
                "capture": {"id": "body.id"},
                "assert": ["status == 200"]
            },
            {"method": "DELETE", "url": "/store/order/${id}", "assert": ["status == 200"]}
        ]
    }]});

    let report = run_suite(&mock_server, suite.clone(), FixtureStore::new(), |_| {}).await;
    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Failed);
    assert!(scenario.error.is_none());
    assert_eq!(scenario.step_results.len(), 1);
    assert_eq!(scenario.first_failure_index, Some(0));
    assert_eq!(scenario.steps.len(), 1);

    // continueOnFailure 仍然执行捕获，缺失的路径作为错误报告
    let report = run_suite(&mock_server, suite, FixtureStore::new(), |options| {
        options.failure_policy = FailurePolicy::ContinueOnFailure;
    })
    .await;
    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Errored);
    assert_eq!(
        scenario.error.as_ref().unwrap().kind,
        ErrorKind::CapturePathMissing
    );
    assert_eq!(scenario.step_results.len(), 1);
}

#[tokio::test]
async fn test_header_assertion_and_seed_variables() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/login"))
        .and(query_param("username", "user1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Rate-Limit", "5000")
                .set_body_json(json!("logged in user session:1")),
        )
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [{
        "name": "login",
        "steps": [{
            "url": "/user/login",
            "query": {"username": "${username}"},
            "assert": [
                "headers.x-rate-limit contains \"5000\"",
                {"kind": "bodyIncludes", "value": "session"}
            ]
        }]
    }]});

    let report = run_suite(&mock_server, suite, FixtureStore::new(), |options| {
        options
            .seed
            .insert("username".to_string(), json!("user1"));
    })
    .await;

    assert_eq!(report.scenarios[0].status, ScenarioStatus::Passed);
}

/// 同一套件对无状态服务运行两次，报告内容（除耗时与 runId 外）相同
#[tokio::test]
async fn test_reports_are_deterministic() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/store/inventory"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"approved": 1, "placed": 2, "delivered": 3})),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/store/order/5"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [
        {"name": "inventory keys", "steps": [{"url": "/store/inventory", "assert": ["body has all keys [approved, placed, delivered]"]}]},
        {"name": "inventory types", "steps": [{"url": "/store/inventory", "assert": [{"kind": "forEachElement", "path": "body", "assertions": ["$ is integer"]}]}]},
        {"name": "missing order", "steps": [{"url": "/store/order/5", "assert": ["status == 200"]}]},
        {"name": "skipped", "skip": true, "steps": [{"url": "/store/order/5"}]}
    ]});

    let first = run_suite(&mock_server, suite.clone(), FixtureStore::new(), |options| {
        options.concurrency = 3;
    })
    .await;
    let second = run_suite(&mock_server, suite, FixtureStore::new(), |options| {
        options.concurrency = 3;
    })
    .await;

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(without_timing(&first), without_timing(&second));

    let names: Vec<_> = first.scenarios.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["inventory keys", "inventory types", "missing order", "skipped"]
    );
    assert_eq!(first.totals.passed, 2);
    assert_eq!(first.totals.failed, 1);
    assert_eq!(first.totals.skipped, 1);
}

/// 超过场景时间预算时中止请求并标记 Timeout
#[tokio::test]
async fn test_scenario_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [{
        "name": "slow",
        "steps": [
            {"url": "/fast", "assert": ["status == 200"]},
            {"url": "/slow", "assert": ["status == 200"]}
        ]
    }]});

    let report = run_suite(&mock_server, suite, FixtureStore::new(), |options| {
        options.scenario_timeout = Some(Duration::from_millis(300));
    })
    .await;

    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Errored);
    assert_eq!(scenario.error.as_ref().unwrap().kind, ErrorKind::Timeout);
    assert_eq!(scenario.error.as_ref().unwrap().step_index, Some(1));
    // 超时前的结果保留
    assert_eq!(scenario.step_results.len(), 1);
}

/// 运行级取消会中止进行中的请求
#[tokio::test]
async fn test_cancel_run() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let suite = parse_json(
        &json!({"scenarios": [
            {"name": "a", "steps": [{"url": "/a"}]},
            {"name": "b", "steps": [{"url": "/b"}]},
            {"name": "c", "steps": [{"url": "/c"}]}
        ]})
        .to_string(),
    )
    .unwrap();
    let scenarios = collect_scenarios(vec![suite]).unwrap();
    let options = RunOptions {
        base_url: Some(mock_server.uri()),
        concurrency: 2,
        ..RunOptions::default()
    };

    let (cancel, _) = CancelHandle::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let report = run_all(scenarios, FixtureStore::new(), options, &cancel)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.totals.errored, 3);
    for scenario in &report.scenarios {
        assert_eq!(scenario.error.as_ref().unwrap().kind, ErrorKind::Cancelled);
    }
}

/// 传输错误使场景 Errored，其他场景不受影响
#[tokio::test]
async fn test_transport_error_is_isolated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/store/inventory"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let suite = json!({"scenarios": [
        {"name": "unreachable", "steps": [{"url": "http://127.0.0.1:9/health"}]},
        {"name": "reachable", "steps": [{"url": "/store/inventory", "assert": ["status == 200"]}]}
    ]});

    let report = run_suite(&mock_server, suite, FixtureStore::new(), |options| {
        options.concurrency = 2;
    })
    .await;

    assert_eq!(report.scenarios[0].status, ScenarioStatus::Errored);
    assert_eq!(
        report.scenarios[0].error.as_ref().unwrap().kind,
        ErrorKind::TransportError
    );
    assert_eq!(report.scenarios[1].status, ScenarioStatus::Passed);
}

/// JSON 报告写入文件后可以被读回
#[tokio::test]
async fn test_json_report_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pet/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&mock_server)
        .await;

    let suite = json!({"name": "pet", "scenarios": [
        {"name": "get pet", "steps": [{"url": "/pet/1", "assert": ["body.id == 2"]}]}
    ]});
    let report = run_suite(&mock_server, suite, FixtureStore::new(), |_| {}).await;

    let temp_dir = TempDir::new().unwrap();
    let report_path = temp_dir.path().join("reports").join("run.json");
    write_json_report(&report, &report_path).unwrap();

    let content = std::fs::read_to_string(&report_path).unwrap();
    let json: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["runId"], json!(report.run_id.to_string()));
    assert_eq!(json["totals"]["failed"], json!(1));

    let scenario = &json["scenarios"][0];
    assert_eq!(scenario["suite"], json!("pet"));
    assert_eq!(scenario["status"], json!("failed"));
    assert_eq!(scenario["firstFailureIndex"], json!(0));
    assert_eq!(scenario["stepResults"][0]["actual"], json!(1));
    assert_eq!(scenario["stepResults"][0]["expected"], json!(2));

    let parsed: RunReport = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, report);
}
