use crate::config::DataProbeConfig;
use crate::probes::data;
use httpmock::prelude::*;
use serde_json::json;

fn sample_ip_row(ip: &str, country: Option<&str>) -> serde_json::Value {
    json!({
        "user_id": "u1",
        "ip_address": ip,
        "country": country,
        "city": "Berlin",
        "device_type": "desktop",
        "browser": "Firefox",
        "os": "Linux",
        "last_seen": "2026-08-01T12:00:00Z",
        "created_at": "2026-07-01T12:00:00Z"
    })
}

async fn mock_empty_tail_queries(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/user_ips")
                .query_param("country", "is.null");
            then.status(200).json_body(json!([]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/test_records");
            then.status(200).json_body(json!([]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/test_results");
            then.status(200).json_body(json!([]));
        })
        .await;
}

#[tokio::test]
async fn failing_first_query_does_not_halt_battery() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/user_ips")
                .query_param("order", "last_seen.desc");
            then.status(500)
                .json_body(json!({"message": "permission denied for table user_ips"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/user_ips")
                .query_param("country", "is.null");
            then.status(200).json_body(json!([]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/test_records");
            then.status(200).json_body(json!([
                {"record_id": "r1", "user_id": "u1", "test_type": "speed", "created_at": "2026-08-01T00:00:00Z"}
            ]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/test_results");
            then.status(200).json_body(json!([]));
        })
        .await;

    let config = DataProbeConfig::new(&server.base_url(), "test-key");
    let report = data::run(&config).await.unwrap();

    assert_eq!(report.sections.len(), 4);
    assert!(
        report.sections[0]
            .error
            .as_deref()
            .unwrap()
            .contains("permission denied"),
    );
    // Subsequent independent queries still ran
    assert!(report.sections[1].error.is_none());
    assert!(report.sections[2].error.is_none());
    assert_eq!(report.sections[2].row_count, 1);
    assert_eq!(report.failed_sections(), 1);
}

#[tokio::test]
async fn coverage_is_computed_over_the_sampled_page() {
    let server = MockServer::start_async().await;

    // 10 sampled rows, 3 with a usable country value
    let mut rows = Vec::new();
    rows.push(sample_ip_row("192.168.1.1", Some("DE")));
    rows.push(sample_ip_row("10.0.0.1", Some("US")));
    rows.push(sample_ip_row("172.16.0.1", Some("FR")));
    rows.push(sample_ip_row("999.1.1", Some("unknown")));
    for _ in 0..6 {
        rows.push(sample_ip_row("8.8.8.8", None));
    }

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/user_ips")
                .query_param("order", "last_seen.desc")
                .query_param("limit", "10")
                .header("apikey", "test-key");
            then.status(200).json_body(serde_json::Value::Array(rows));
        })
        .await;
    mock_empty_tail_queries(&server).await;

    let config = DataProbeConfig::new(&server.base_url(), "test-key");
    let report = data::run(&config).await.unwrap();

    let sample = &report.sections[0];
    assert!(sample.error.is_none());
    assert_eq!(sample.row_count, 10);
    assert_eq!(sample.lines[0], "country coverage (sampled): 30.0%");
    // 999.1.1 fails dotted-quad validation; the other nine pass
    assert_eq!(sample.lines[1], "valid ipv4 format: 9 of 10");
}

#[tokio::test]
async fn store_error_includes_table_name() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path_includes("/rest/v1/");
            then.status(401).json_body(json!({"message": "JWT expired"}));
        })
        .await;

    let config = DataProbeConfig::new(&server.base_url(), "stale-key");
    let report = data::run(&config).await.unwrap();

    // Every query failed, and each failure names its table
    assert_eq!(report.failed_sections(), 4);
    assert!(
        report.sections[0]
            .error
            .as_deref()
            .unwrap()
            .contains("user_ips")
    );
    assert!(
        report.sections[3]
            .error
            .as_deref()
            .unwrap()
            .contains("test_results")
    );
}

#[tokio::test]
async fn missing_credentials_abort_before_any_query() {
    let config = DataProbeConfig::new("", "");
    let err = data::run(&config).await.unwrap_err();
    assert!(err.to_string().contains("endpoint"));
}
