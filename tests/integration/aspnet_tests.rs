use crate::common::{backend, january, portal_config};
use planning_harvester::config::PortalKind;
use planning_harvester::{ApplicationStatus, FetchState};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PAGE: &str = r#"<html><body>
  <form method="post" action="./PlanningSearch.aspx" id="aspnetForm">
    <input type="hidden" name="__EVENTTARGET" id="__EVENTTARGET" value="">
    <input type="hidden" name="__EVENTARGUMENT" id="__EVENTARGUMENT" value="">
    <input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="search0">
    <input type="hidden" name="__VIEWSTATEGENERATOR" value="6E4A3B2C">
    <input type="hidden" name="__EVENTVALIDATION" value="valid0">
    <select name="ctl00$MainContent$ddlWeek">
      <option value="15/01/2024">w/c 15/01/2024</option>
      <option value="08/01/2024">w/c 08/01/2024</option>
      <option value="01/01/2024">w/c 01/01/2024</option>
    </select>
    <input type="radio" name="ctl00$MainContent$rblDateType" value="DATE_DECIDED">
    <input type="radio" name="ctl00$MainContent$rblDateType" value="DATE_VALIDATED">
    <input type="submit" name="ctl00$MainContent$btnSearch" value="Search">
  </form>
</body></html>"#;

fn grid_page(viewstate: &str, rows: &[(&str, &str)], next: bool) -> String {
    let rows: String = rows
        .iter()
        .enumerate()
        .map(|(i, (reference, status))| {
            let class = if i % 2 == 0 { "rgRow" } else { "rgAltRow" };
            format!(
                r#"<tr class="{class}">
                     <td><a href="ApplicationDetails.aspx?ref={reference}">{reference}</a></td>
                     <td>7 Wickham Road, Fareham, PO15 5TD</td>
                     <td>Erection of garden room</td>
                     <td>09/01/2024</td>
                     <td>{status}</td>
                   </tr>"#
            )
        })
        .collect();
    let pager = if next {
        r#"<a href="javascript:__doPostBack('ctl00$MainContent$grdResults$ctl00$ctl03$ctl01$ctl10','')" title="Next Page">Next &gt;</a>"#
    } else {
        ""
    };
    format!(
        r#"<html><body>
             <form method="post" action="./PlanningSearch.aspx" id="aspnetForm">
               <input type="hidden" name="__VIEWSTATE" value="{viewstate}">
               <input type="hidden" name="__EVENTVALIDATION" value="ev-{viewstate}">
               <table class="rgMasterTable"><tbody>{rows}</tbody></table>
               {pager}
             </form>
           </body></html>"#
    )
}

#[tokio::test]
async fn test_weekly_queries_with_postback_paging() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/PlanningSearch.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
        .expect(2)
        .mount(&server)
        .await;

    // Week of 8 Jan: two pages joined by a postback
    Mock::given(method("POST"))
        .and(path("/PlanningSearch.aspx"))
        .and(body_string_contains("ddlWeek=08%2F01%2F2024"))
        .and(body_string_contains("__VIEWSTATE=search0"))
        .and(body_string_contains("rblDateType=DATE_VALIDATED"))
        .and(body_string_contains("btnSearch=Search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(grid_page(
            "week1page1",
            &[("P/24/0001/FP", "Registered"), ("P/24/0002/FP", "Granted")],
            true,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/PlanningSearch.aspx"))
        .and(body_string_contains("__VIEWSTATE=week1page1"))
        .and(body_string_contains("__EVENTVALIDATION=ev-week1page1"))
        .and(body_string_contains("__EVENTTARGET=ctl00%24MainContent%24grdResults"))
        .respond_with(ResponseTemplate::new(200).set_body_string(grid_page(
            "week1page2",
            &[("P/24/0003/FP", "Refused")],
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    // Week of 1 Jan: a single page
    Mock::given(method("POST"))
        .and(path("/PlanningSearch.aspx"))
        .and(body_string_contains("ddlWeek=01%2F01%2F2024"))
        .respond_with(ResponseTemplate::new(200).set_body_string(grid_page(
            "week2page1",
            &[("P/23/0999/FP", "Withdrawn")],
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = portal_config(PortalKind::Aspnet, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    assert_eq!(report.pages, 3);
    let statuses: Vec<&ApplicationStatus> = report.records.iter().map(|r| &r.status).collect();
    assert_eq!(
        statuses,
        vec![
            &ApplicationStatus::Pending,
            &ApplicationStatus::Approved,
            &ApplicationStatus::Refused,
            &ApplicationStatus::Withdrawn
        ]
    );
    assert_eq!(report.records[0].id, "P/24/0001/FP");
    assert_eq!(report.records[0].postcode, "PO15 5TD");
    assert_eq!(
        report.records[0].link,
        format!("{}/ApplicationDetails.aspx?ref=P/24/0001/FP", server.uri())
    );
}

#[tokio::test]
async fn test_failing_week_is_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/PlanningSearch.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/PlanningSearch.aspx"))
        .and(body_string_contains("ddlWeek=08%2F01%2F2024"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/PlanningSearch.aspx"))
        .and(body_string_contains("ddlWeek=01%2F01%2F2024"))
        .respond_with(ResponseTemplate::new(200).set_body_string(grid_page(
            "week2page1",
            &[("P/24/0004/FP", "Registered")],
            false,
        )))
        .mount(&server)
        .await;

    let config = portal_config(PortalKind::Aspnet, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].id, "P/24/0004/FP");
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.message.contains("2024-01-08")));
}

#[tokio::test]
async fn test_date_field_search() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/PlanningSearch.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<form method="post" action="PlanningSearch.aspx">
                 <input type="hidden" name="__VIEWSTATE" value="dates0">
                 <input type="text" name="ctl00$MainContent$txtDateReceivedFrom">
                 <input type="text" name="ctl00$MainContent$txtDateReceivedTo">
                 <input type="submit" name="ctl00$MainContent$btnSearch" value="Search">
               </form>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/PlanningSearch.aspx"))
        .and(body_string_contains("txtDateReceivedFrom=01%2F01%2F2024"))
        .and(body_string_contains("txtDateReceivedTo=14%2F01%2F2024"))
        .respond_with(ResponseTemplate::new(200).set_body_string(grid_page(
            "results",
            &[("P/24/0005/FP", "Registered"), ("P/24/0006/FP", "Registered")],
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = portal_config(PortalKind::Aspnet, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert_eq!(report.state, FetchState::Done);
    assert_eq!(report.records.len(), 2);
}

#[tokio::test]
async fn test_missing_postback_form_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/PlanningSearch.aspx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Service unavailable</body></html>"))
        .mount(&server)
        .await;

    let config = portal_config(PortalKind::Aspnet, &server.uri());
    let report = backend(&config).fetch(&january()).await;

    assert!(report.is_failed());
    assert!(report.records.is_empty());
}
