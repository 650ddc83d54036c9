use crate::common::{backend, january, portal_config, UNREACHABLE};
use planning_harvester::config::PortalKind;
use planning_harvester::{ApplicationStatus, FetchState};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PAGE: &str = r#"<html><body>
  <form name="searchCriteriaForm" method="post" action="/advancedSearchResults.do?action=firstPage">
    <input type="hidden" name="org.apache.struts.taglib.html.TOKEN" value="f00d">
    <input type="text" name="searchCriteria.reference" value="">
    <input type="text" name="date(applicationReceivedStart)" value="">
    <input type="text" name="date(applicationReceivedEnd)" value="">
  </form>
</body></html>"#;

fn result_item(reference: &str, address: &str) -> String {
    format!(
        r#"<li class="searchresult">
             <a href="/applicationDetails.do?activeTab=summary&amp;keyVal={reference}">Single storey rear extension</a>
             <p class="address">{address}</p>
             <p class="metaInfo">
               Ref. No: <span class="caseNumber">{reference}</span>
               <span class="date">Received: 05/01/2024</span>
               <span class="status">Awaiting decision - registered</span>
             </p>
           </li>"#
    )
}

fn results_page(items: &[(&str, &str)], next: Option<&str>) -> String {
    let items: String = items
        .iter()
        .map(|(reference, address)| result_item(reference, address))
        .collect();
    let pager = next
        .map(|href| format!(r#"<p class="pager"><a class="next" href="{href}">Next</a></p>"#))
        .unwrap_or_else(|| r#"<p class="pager"><a class="next disabled" href="">Next</a></p>"#.to_string());
    format!(r#"<html><body><ul id="searchresults">{items}</ul>{pager}</body></html>"#)
}

async fn mount_search_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search.do"))
        .and(query_param("action", "advanced"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_weekly_list(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path("/search.do"))
        .and(query_param("action", "weeklyList"))
        .respond_with(ResponseTemplate::new(200).set_body_string(WEEKLY_PAGE))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pagination_stops_without_next_link() {
    let server = MockServer::start().await;
    mount_search_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/advancedSearchResults.do"))
        .and(body_string_contains("org.apache.struts.taglib.html.TOKEN=f00d"))
        .and(body_string_contains("searchType=Application"))
        .and(body_string_contains("date%28applicationReceivedStart%29=01%2F01%2F2024"))
        .and(body_string_contains("date%28applicationReceivedEnd%29=14%2F01%2F2024"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            &[
                ("24/00001/FUL", "1 High Street, Portsmouth, PO1 2AB"),
                ("24/00002/HOU", "2 High Street, Portsmouth, PO1 2AC"),
            ],
            Some("/pagedSearchResults.do?action=page&amp;searchCriteria.page=2"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pagedSearchResults.do"))
        .and(query_param("searchCriteria.page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            &[
                ("24/00003/FUL", "3 Elm Grove, Southsea, PO5 1JE"),
                ("24/00004/LBC", "4 Elm Grove, Southsea"),
            ],
            Some("/pagedSearchResults.do?action=page&amp;searchCriteria.page=3"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pagedSearchResults.do"))
        .and(query_param("searchCriteria.page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            &[("24/00005/ADV", "5 Albert Road, Southsea, PO4 0JT")],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    mount_weekly_list(&server, 0).await;

    let config = portal_config(PortalKind::FormToken, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    assert_eq!(report.pages, 3);
    let ids: Vec<&str> = report.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["24/00001/FUL", "24/00002/HOU", "24/00003/FUL", "24/00004/LBC", "24/00005/ADV"]
    );

    let first = &report.records[0];
    assert_eq!(first.postcode, "PO1 2AB");
    assert_eq!(first.status, ApplicationStatus::Pending);
    assert_eq!(first.date_received.to_string(), "2024-01-05");
    assert_eq!(
        first.link,
        format!("{}/applicationDetails.do?activeTab=summary&keyVal=24/00001/FUL", server.uri())
    );
    assert_eq!(report.records[3].postcode, "");
}

#[tokio::test]
async fn test_infinite_next_chain_hits_page_limit() {
    let server = MockServer::start().await;
    mount_search_page(&server).await;

    let endless = results_page(
        &[("24/00010/FUL", "10 London Road, Portsmouth, PO2 9AA")],
        Some("/pagedSearchResults.do?action=page"),
    );
    Mock::given(method("POST"))
        .and(path("/advancedSearchResults.do"))
        .respond_with(ResponseTemplate::new(200).set_body_string(endless.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pagedSearchResults.do"))
        .respond_with(ResponseTemplate::new(200).set_body_string(endless))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = portal_config(PortalKind::FormToken, &server.uri());
    config.max_pages = 4;
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    assert_eq!(report.pages, 4);
    assert_eq!(report.records.len(), 4);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.message.contains("page limit")));
}

const WEEKLY_PAGE: &str = r#"<html><body>
  <form name="searchCriteriaForm" method="post" action="/weeklyListResults.do?action=firstPage">
    <input type="hidden" name="org.apache.struts.taglib.html.TOKEN" value="beef">
    <select name="week">
      <option value="15/01/2024">15 Jan 2024</option>
      <option value="08/01/2024">08 Jan 2024</option>
      <option value="01/01/2024">01 Jan 2024</option>
      <option value="18/12/2023">18 Dec 2023</option>
    </select>
    <input type="radio" name="dateType" value="DC_Validated">
    <input type="radio" name="dateType" value="DC_Decided">
  </form>
</body></html>"#;

#[tokio::test]
async fn test_falls_back_to_weekly_list() {
    let server = MockServer::start().await;

    // Advanced search page without the expected form
    Mock::given(method("GET"))
        .and(path("/search.do"))
        .and(query_param("action", "advanced"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Search unavailable</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    // Weeks of 8 Jan and 1 Jan overlap the range; the list is reloaded for the second week
    mount_weekly_list(&server, 2).await;

    Mock::given(method("POST"))
        .and(path("/weeklyListResults.do"))
        .and(body_string_contains("week=08%2F01%2F2024"))
        .and(body_string_contains("dateType=DC_Validated"))
        .and(body_string_contains("org.apache.struts.taglib.html.TOKEN=beef"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            &[("24/00020/FUL", "20 Copnor Road, Portsmouth, PO3 5LH")],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/weeklyListResults.do"))
        .and(body_string_contains("week=01%2F01%2F2024"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            &[
                ("24/00011/HOU", "11 Highland Road, Southsea, PO4 8LD"),
                ("24/00012/HOU", "12 Highland Road, Southsea, PO4 8LD"),
            ],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = portal_config(PortalKind::FormToken, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    let ids: Vec<&str> = report.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["24/00020/FUL", "24/00011/HOU", "24/00012/HOU"]);
}

#[tokio::test]
async fn test_empty_primary_search_uses_weekly_list() {
    let server = MockServer::start().await;
    mount_search_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/advancedSearchResults.do"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(&[], None)))
        .expect(1)
        .mount(&server)
        .await;

    mount_weekly_list(&server, 2).await;
    Mock::given(method("POST"))
        .and(path("/weeklyListResults.do"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(
            &[("24/00030/FUL", "30 Fratton Road, Portsmouth, PO2 0LT")],
            None,
        )))
        .expect(2)
        .mount(&server)
        .await;

    let config = portal_config(PortalKind::FormToken, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    assert_eq!(report.records.len(), 2);
}

#[tokio::test]
async fn test_unreachable_portal_returns_empty_report() {
    let config = portal_config(PortalKind::FormToken, UNREACHABLE);
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Failed);
    assert!(report.records.is_empty());
    assert!(!report.diagnostics.is_empty());
}
