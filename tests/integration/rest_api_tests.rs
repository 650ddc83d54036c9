use crate::common::{backend, january, portal_config, UNREACHABLE};
use planning_harvester::config::PortalKind;
use planning_harvester::{ApplicationStatus, FetchState};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entities(start: usize, count: usize) -> Value {
    let entities: Vec<Value> = (start..start + count)
        .map(|i| {
            json!({
                "entity": 7010000000u64 + i as u64,
                "reference": format!("24/{:05}/FUL", i),
                "description": "Single storey rear extension",
                "address": "12 Thorne Road, Doncaster, DN2 5AA",
                "entry-date": "2024-01-15",
                "planning-permission-status": "pending",
                "point": "POINT(-1.1128 53.5311)"
            })
        })
        .collect();
    json!({ "entities": entities, "count": count })
}

async fn mount_page(server: &MockServer, offset: &str, body: Value, times: u64) {
    Mock::given(method("GET"))
        .and(path("/entity.json"))
        .and(query_param("dataset", "planning-application"))
        .and(query_param("limit", "100"))
        .and(query_param("offset", offset))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_full_pages_then_short_page() {
    let server = MockServer::start().await;
    mount_page(&server, "0", entities(0, 100), 1).await;
    mount_page(&server, "100", entities(100, 100), 1).await;
    mount_page(&server, "200", entities(200, 40), 1).await;
    mount_page(&server, "300", entities(300, 100), 0).await;

    let config = portal_config(PortalKind::RestApi, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    assert_eq!(report.records.len(), 240);
    assert_eq!(report.pages, 3);

    let first = &report.records[0];
    assert_eq!(first.id, "24/00000/FUL");
    assert_eq!(first.postcode, "DN2 5AA");
    assert_eq!(first.status, ApplicationStatus::Pending);
    assert_eq!(first.date_received.to_string(), "2024-01-15");
    assert_eq!(first.lat, 53.5311);
    assert_eq!(first.lng, -1.1128);
    assert_eq!(first.link, format!("{}/entity/7010000000", server.uri()));
    assert_eq!(report.records[239].id, "24/00239/FUL");
}

#[tokio::test]
async fn test_empty_first_page() {
    let server = MockServer::start().await;
    mount_page(&server, "0", json!({ "entities": [] }), 1).await;

    let config = portal_config(PortalKind::RestApi, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn test_organisation_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/entity.json"))
        .and(query_param("organisation_entity", "109"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entities(0, 3)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = portal_config(PortalKind::RestApi, &server.uri());
    config.organisation_entity = Some(109);
    let records = backend(&config)
        .fetch_applications(january().start, january().end)
        .await;

    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_later_page_failure_keeps_earlier_records() {
    let server = MockServer::start().await;
    mount_page(&server, "0", entities(0, 100), 1).await;
    Mock::given(method("GET"))
        .and(path("/entity.json"))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = portal_config(PortalKind::RestApi, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    assert_eq!(report.records.len(), 100);
    assert!(report.warning_count() >= 1);
}

#[tokio::test]
async fn test_malformed_json_fails_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/entity.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Gateway</html>"))
        .mount(&server)
        .await;

    let config = portal_config(PortalKind::RestApi, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert!(report.is_failed());
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn test_unreachable_api_returns_empty_report() {
    let config = portal_config(PortalKind::RestApi, UNREACHABLE);
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Failed);
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn test_malformed_entity_is_skipped() {
    let server = MockServer::start().await;
    let mut page = entities(0, 5);
    if let Some(list) = page["entities"].as_array_mut() {
        list.push(json!({ "entity": 99, "reference": "R99", "address": 12 }));
    }
    mount_page(&server, "0", page, 1).await;

    let config = portal_config(PortalKind::RestApi, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    assert_eq!(report.records.len(), 5);
    assert!(report.records.iter().all(|r| r.id != "R99"));
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Skipping entity 5")));
}

#[tokio::test]
async fn test_walk_stops_at_offset_cap() {
    let server = MockServer::start().await;
    // Offsets 0, 100, ..., 10_000 are requested, then the cap ends the walk
    Mock::given(method("GET"))
        .and(path("/entity.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entities(0, 100)))
        .expect(101)
        .mount(&server)
        .await;

    let config = portal_config(PortalKind::RestApi, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    assert_eq!(report.pages, 101);
    assert_eq!(report.records.len(), 10_100);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.message.contains("Reached maximum offset")));

    let offsets: Vec<String> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "offset")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(offsets.last().map(String::as_str), Some("10000"));
}
