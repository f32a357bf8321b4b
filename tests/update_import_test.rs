mod common;

use common::{closed_port_url, config, engine, id_name_csv, ScriptedTokenProvider};
use httpmock::prelude::*;
use zuora_import::core::{FailureReason, Unit};
use zuora_import::Action;

#[tokio::test]
async fn test_two_rows_single_batch_succeeds() {
    let server = MockServer::start_async().await;
    let update_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/action/update")
                .header("authorization", "Bearer tok-1")
                .json_body(serde_json::json!({
                    "objects": [
                        {"Id": "A1", "Name": "Account 1"},
                        {"Id": "A2", "Name": "Account 2"}
                    ],
                    "type": "Account"
                }));
            then.status(200).json_body(serde_json::json!([
                {"Success": true, "Id": "A1"},
                {"Success": true, "Id": "A2"}
            ]));
        })
        .await;

    let provider = ScriptedTokenProvider::new(&["tok-1"]);
    let report = engine(config(&server, Action::Update), provider.clone())
        .run(id_name_csv(2).as_bytes())
        .await
        .unwrap();

    update_mock.assert_async().await;
    assert_eq!(provider.calls(), 1);
    assert_eq!(report.results.len(), 1);
    assert!(report.is_clean());
    assert_eq!(report.last_successful_id.as_deref(), Some("A2"));
    assert_eq!(report.resume_offset, 2);
    assert_eq!(report.token_refreshes, 0);
    assert!(report.log.contains("Update URL: "));
    assert!(report.log.contains("Last successful record ID: A2"));
}

#[tokio::test]
async fn test_fifty_records_fit_in_one_batch() {
    let server = MockServer::start_async().await;
    let update_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/action/update");
            then.status(200).body("[]");
        })
        .await;

    let report = engine(
        config(&server, Action::Update),
        ScriptedTokenProvider::new(&["tok-1"]),
    )
    .run(id_name_csv(50).as_bytes())
    .await
    .unwrap();

    update_mock.assert_hits_async(1).await;
    assert_eq!(report.succeeded_record_count(), 50);
    assert_eq!(report.last_successful_id.as_deref(), Some("A50"));
}

#[tokio::test]
async fn test_101_records_are_sent_as_50_50_1() {
    let server = MockServer::start_async().await;
    let update_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/action/update");
            then.status(200).body("[]");
        })
        .await;

    let report = engine(
        config(&server, Action::Update),
        ScriptedTokenProvider::new(&["tok-1"]),
    )
    .run(id_name_csv(101).as_bytes())
    .await
    .unwrap();

    update_mock.assert_hits_async(3).await;
    let sizes: Vec<usize> = report.succeeded().map(|s| s.ids.len()).collect();
    assert_eq!(sizes, vec![50, 50, 1]);

    let units: Vec<Unit> = report.succeeded().map(|s| s.unit).collect();
    assert_eq!(
        units,
        vec![
            Unit::Batch { index: 0 },
            Unit::Batch { index: 1 },
            Unit::Batch { index: 2 }
        ]
    );
    assert_eq!(report.last_successful_id.as_deref(), Some("A101"));
    assert_eq!(report.resume_offset, 101);
}

#[tokio::test]
async fn test_401_refreshes_once_and_retries() {
    let server = MockServer::start_async().await;
    let stale_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/action/update")
                .header("authorization", "Bearer stale");
            then.status(401).body(r#"{"message":"Authentication error"}"#);
        })
        .await;
    let fresh_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/action/update")
                .header("authorization", "Bearer fresh");
            then.status(200).body("[]");
        })
        .await;

    let provider = ScriptedTokenProvider::new(&["stale", "fresh"]);
    let report = engine(config(&server, Action::Update), provider.clone())
        .run(id_name_csv(2).as_bytes())
        .await
        .unwrap();

    stale_mock.assert_hits_async(1).await;
    fresh_mock.assert_hits_async(1).await;
    assert_eq!(provider.calls(), 2);
    assert_eq!(report.token_refreshes, 1);

    let success = report.succeeded().next().unwrap();
    assert!(success.after_refresh);
    assert_eq!(report.last_successful_id.as_deref(), Some("A2"));
    assert!(report.log.contains("Token expired, refreshing token..."));
    assert!(report.log.contains("after refreshing token"));
}

#[tokio::test]
async fn test_second_401_is_a_failure_not_another_retry() {
    let server = MockServer::start_async().await;
    let update_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/action/update");
            then.status(401).body("still unauthorized");
        })
        .await;

    let provider = ScriptedTokenProvider::new(&["stale", "also-stale"]);
    let report = engine(config(&server, Action::Update), provider.clone())
        .run(id_name_csv(2).as_bytes())
        .await
        .unwrap();

    update_mock.assert_hits_async(2).await;
    assert_eq!(provider.calls(), 2);
    assert_eq!(report.token_refreshes, 1);

    let failure = report.failed().next().unwrap();
    assert_eq!(failure.ids, vec!["A1".to_string(), "A2".to_string()]);
    assert_eq!(
        failure.reason,
        FailureReason::Http {
            status: 401,
            body: "still unauthorized".to_string()
        }
    );
    assert_eq!(report.last_successful_id, None);
}

#[tokio::test]
async fn test_missing_id_fails_only_its_batch() {
    let server = MockServer::start_async().await;
    let update_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/action/update");
            then.status(200).body("[]");
        })
        .await;

    let csv = "Id,Name\nA1,One\nA2,Two\n,Three\nA4,Four\nA5,Five\n";
    let mut config = config(&server, Action::Update);
    config.batch_size = 2;
    let report = engine(config, ScriptedTokenProvider::new(&["tok-1"]))
        .run(csv.as_bytes())
        .await
        .unwrap();

    // The batch with the blank Id is never sent.
    update_mock.assert_hits_async(2).await;
    assert_eq!(report.results.len(), 3);
    assert!(report.results[0].is_ok());
    assert!(report.results[2].is_ok());

    let failure = report.results[1].as_ref().unwrap_err();
    assert_eq!(failure.unit, Unit::Batch { index: 1 });
    assert_eq!(failure.ids, vec!["Unknown".to_string(), "A4".to_string()]);
    assert_eq!(
        failure.reason,
        FailureReason::MissingField {
            field: "Id".to_string()
        }
    );
    assert_eq!(report.last_successful_id.as_deref(), Some("A5"));
    assert_eq!(report.resume_offset, 2);
    assert!(report
        .log
        .contains("Failed record ID: A4, Status Code: FieldError"));
}

#[tokio::test]
async fn test_failed_batch_keeps_watermark() {
    let server = MockServer::start_async().await;
    let first_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/action/update")
                .body_contains("\"A1\"");
            then.status(200).body("[]");
        })
        .await;
    let second_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/action/update")
                .body_contains("\"A3\"");
            then.status(500).body("internal error");
        })
        .await;

    let mut config = config(&server, Action::Update);
    config.batch_size = 2;
    let report = engine(config, ScriptedTokenProvider::new(&["tok-1"]))
        .run(id_name_csv(4).as_bytes())
        .await
        .unwrap();

    first_mock.assert_hits_async(1).await;
    second_mock.assert_hits_async(1).await;
    assert_eq!(report.succeeded_record_count(), 2);
    assert_eq!(report.failed_record_count(), 2);
    assert_eq!(report.last_successful_id.as_deref(), Some("A2"));
    assert_eq!(report.resume_offset, 2);
    assert!(report
        .log
        .contains("Failed record ID: A3, Status Code: 500, Response: internal error"));
    assert!(report
        .log
        .contains("Failed record ID: A4, Status Code: 500, Response: internal error"));
}

#[tokio::test]
async fn test_failed_batch_before_success_limits_resume_offset() {
    let server = MockServer::start_async().await;
    let first_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/action/update")
                .body_contains("\"A1\"");
            then.status(500).body("internal error");
        })
        .await;
    let second_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/action/update")
                .body_contains("\"A3\"");
            then.status(200).body("[]");
        })
        .await;

    let mut config = config(&server, Action::Update);
    config.batch_size = 2;
    let report = engine(config, ScriptedTokenProvider::new(&["tok-1"]))
        .run(id_name_csv(4).as_bytes())
        .await
        .unwrap();

    first_mock.assert_hits_async(1).await;
    second_mock.assert_hits_async(1).await;
    assert_eq!(report.last_successful_id.as_deref(), Some("A4"));
    assert_eq!(report.resume_offset, 0);
    assert!(report
        .log
        .contains("Last successful record ID: A4 (row 1 failed earlier, resume with --skip 0)"));
    assert!(!report.log.contains("resume with --skip 4"));
}

#[tokio::test]
async fn test_transport_error_fails_each_batch_and_continues() {
    let server = MockServer::start_async().await;
    let mut config = config(&server, Action::Update);
    config.api_url = closed_port_url();
    config.batch_size = 2;

    let report = engine(config, ScriptedTokenProvider::new(&["tok-1"]))
        .run(id_name_csv(5).as_bytes())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 3);
    let units: Vec<Unit> = report.failed().map(|f| f.unit).collect();
    assert_eq!(
        units,
        vec![
            Unit::Batch { index: 0 },
            Unit::Batch { index: 1 },
            Unit::Batch { index: 2 }
        ]
    );
    assert!(report
        .failed()
        .all(|f| matches!(f.reason, FailureReason::Transport(_))));
    assert_eq!(report.failed_record_count(), 5);
    assert_eq!(report.last_successful_id, None);
    assert_eq!(report.resume_offset, 0);
    assert!(report.log.contains("Failed record ID: A5, Status Code: Exception"));
}

#[tokio::test]
async fn test_refresh_failure_mid_run_fails_the_batch_only() {
    let server = MockServer::start_async().await;
    let update_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/action/update");
            then.status(401).body("expired");
        })
        .await;

    let provider = ScriptedTokenProvider::exhausting(&["stale"]);
    let report = engine(config(&server, Action::Update), provider.clone())
        .run(id_name_csv(3).as_bytes())
        .await
        .unwrap();

    update_mock.assert_hits_async(1).await;
    assert_eq!(provider.calls(), 2);
    let failure = report.failed().next().unwrap();
    assert!(matches!(failure.reason, FailureReason::TokenRefresh(_)));
    assert_eq!(report.failed_record_count(), 3);
}
