use planning_harvester::config::{load_config, PortalKind};
use planning_harvester::output::{JsonFileSink, RecordSink, RunSummary};
use planning_harvester::{build_backend, CanonicalRecord, DateRange};
use serde_json::json;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{date, UNREACHABLE};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file.flush().expect("Failed to flush config");
    file
}

#[tokio::test]
async fn test_config_to_output_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/entity.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entities": [
                {
                    "entity": 7010000001u64,
                    "reference": "24/00001/FUL",
                    "description": "New boundary wall and gates",
                    "address": "1 Hall Gate, Doncaster, DN1 3NA",
                    "entry-date": "2024-01-03",
                    "planning-permission-status": "approved"
                },
                { "name": "Entity without an identifier" }
            ]
        })))
        .mount(&server)
        .await;

    let output_dir = TempDir::new().expect("Failed to create temp dir");
    let output_path = output_dir.path().join("applications.json");

    let config_file = write_config(&format!(
        r#"
[output]
path = "{output}"

[[portal]]
name = "Doncaster"
kind = "rest-api"
base-url = "{api}"
organisation-entity = 109
retry = {{ max-retries = 0, base-delay-ms = 1, max-delay-ms = 1 }}
rate-limit = {{ rate = 100.0, burst = 10 }}

[[portal]]
name = "Offline"
kind = "form-token"
base-url = "{offline}"
retry = {{ max-retries = 0, base-delay-ms = 1, max-delay-ms = 1 }}
"#,
        output = output_path.display(),
        api = server.uri(),
        offline = UNREACHABLE,
    ));

    let config = load_config(config_file.path()).expect("Failed to load config");
    assert_eq!(config.portals[0].kind, PortalKind::RestApi);

    let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 7));
    let mut sink = JsonFileSink::new(&config.output.path);
    let mut summary = RunSummary::new("test");

    for portal in config.enabled_portals() {
        let backend = build_backend(portal, &config.http).expect("Failed to build backend");
        let report = backend.fetch(&range).await;
        sink.record_batch(&report.portal, &report.records)
            .expect("Failed to record batch");
        summary.record(&report);
    }
    assert_eq!(sink.finalize().expect("Failed to write output"), 1);

    assert_eq!(summary.total_records(), 1);
    assert_eq!(summary.failed_portals(), 1);
    assert_eq!(summary.portals[0].rejected, 1);

    let written: Vec<CanonicalRecord> =
        serde_json::from_str(&std::fs::read_to_string(&output_path).expect("output exists"))
            .expect("valid JSON");
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].id, "24/00001/FUL");
    assert_eq!(written[0].postcode, "DN1 3NA");
    assert_eq!(written[0].date_received, date(2024, 1, 3));
}
