//! JSON REST portal backend
//!
//! Queries an `entity.json` endpoint with `limit`/`offset` paging. There is
//! no HTML session: the first request goes straight from `Init` to
//! `QuerySubmitted`.

use crate::fetch::{Fetcher, PortalRequest};
use crate::portal::run::{FetchReport, FetchRun};
use crate::portal::session::PortalContext;
use crate::portal::state::FetchState;
use crate::portal::{DateRange, PortalBackend};
use crate::record::RawRecord;
use crate::PortalResult;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Entities requested per page
pub const PAGE_LIMIT: u32 = 100;

/// Paging stops once the offset passes this value
pub const MAX_OFFSET: u32 = 10_000;

const DATASET: &str = "planning-application";

#[derive(Debug, Default, Deserialize)]
struct EntityPage {
    /// Entities stay untyped until each is decoded on its own
    #[serde(default)]
    entities: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Entity {
    #[serde(default)]
    entity: Option<Value>,
    #[serde(default)]
    reference: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default, rename = "entry-date")]
    entry_date: Option<String>,
    #[serde(default, rename = "start-date")]
    start_date: Option<String>,
    #[serde(default, rename = "planning-permission-status")]
    status: Option<String>,
    #[serde(default)]
    point: Option<String>,
}

/// Offset-paginated JSON API portal
pub struct RestApiBackend {
    context: PortalContext,
    organisation_entity: Option<u64>,
}

impl RestApiBackend {
    pub fn new(context: PortalContext, organisation_entity: Option<u64>) -> Self {
        Self {
            context,
            organisation_entity,
        }
    }

    /// URL of the page starting at `offset`
    fn page_url(&self, offset: u32) -> PortalResult<Url> {
        let mut url = self.context.url("entity.json")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("dataset", DATASET)
                .append_pair("limit", &PAGE_LIMIT.to_string())
                .append_pair("offset", &offset.to_string());
            if let Some(organisation) = self.organisation_entity {
                query.append_pair("organisation_entity", &organisation.to_string());
            }
        }
        Ok(url)
    }

    async fn page(&self, fetcher: &Fetcher, offset: u32) -> PortalResult<Vec<Value>> {
        let url = self.page_url(offset)?;
        tracing::debug!("[{}] Fetching {}", self.context.name, url);
        let page = fetcher.execute(&PortalRequest::get(url)).await?;
        let parsed: EntityPage = serde_json::from_str(&page.body)?;
        Ok(parsed.entities)
    }

    async fn collect(&self, fetcher: &Fetcher, run: &mut FetchRun) -> PortalResult<Vec<RawRecord>> {
        let mut records = Vec::new();
        let mut offset = 0u32;

        let mut entities = self.page(fetcher, offset).await?;
        run.advance(FetchState::QuerySubmitted);

        loop {
            let count = entities.len();
            run.page_parsed(count);
            records.extend(self.decode_page(run, offset, entities));

            if count < PAGE_LIMIT as usize {
                break;
            }

            offset += PAGE_LIMIT;
            if offset > MAX_OFFSET {
                run.warn(format!("Reached maximum offset ({})", MAX_OFFSET));
                break;
            }

            entities = match self.page(fetcher, offset).await {
                Ok(entities) => entities,
                Err(e) => {
                    run.warn(format!("Stopping at offset {}: {}", offset, e));
                    break;
                }
            };
        }

        Ok(records)
    }

    /// Decodes and converts a page of entities, skipping any that do not decode
    fn decode_page(&self, run: &mut FetchRun, offset: u32, entities: Vec<Value>) -> Vec<RawRecord> {
        let mut records = Vec::with_capacity(entities.len());
        for (index, value) in entities.into_iter().enumerate() {
            match serde_json::from_value::<Entity>(value) {
                Ok(entity) => records.push(self.convert(entity)),
                Err(e) => {
                    let position = offset as usize + index;
                    run.warn(format!("Skipping entity {}: {}", position, e));
                }
            }
        }
        records
    }

    /// Maps one API entity onto a raw record
    fn convert(&self, entity: Entity) -> RawRecord {
        let entity_id = entity.entity.as_ref().map(value_text).unwrap_or_default();
        let name = non_empty(entity.name).unwrap_or_default();
        let (lat, lng) = entity
            .point
            .as_deref()
            .and_then(parse_wkt_point)
            .unwrap_or((0.0, 0.0));

        let link = if entity_id.is_empty() {
            String::new()
        } else {
            self.context
                .url(&format!("entity/{}", entity_id))
                .map(|u| u.to_string())
                .unwrap_or_default()
        };

        RawRecord {
            reference: entity
                .reference
                .as_ref()
                .map(value_text)
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| entity_id.clone()),
            description: non_empty(entity.description).unwrap_or_else(|| name.clone()),
            address: non_empty(entity.address).unwrap_or(name),
            postcode: None,
            status: non_empty(entity.status).unwrap_or_else(|| "Unknown".to_string()),
            date_text: non_empty(entity.entry_date)
                .or_else(|| non_empty(entity.start_date))
                .unwrap_or_default(),
            link,
            lat,
            lng,
        }
    }
}

#[async_trait]
impl PortalBackend for RestApiBackend {
    fn name(&self) -> &str {
        &self.context.name
    }

    async fn fetch(&self, range: &DateRange) -> FetchReport {
        let mut run = FetchRun::new(self.context.name.clone());
        match self.organisation_entity {
            Some(organisation) => tracing::info!(
                "[{}] Fetching via API (organisation entity {})",
                self.context.name,
                organisation
            ),
            None => run.warn("No organisation entity configured, fetching all recent applications"),
        }
        tracing::debug!(
            "[{}] API results are not filtered to {} - {}",
            self.context.name,
            range.start,
            range.end
        );

        let fetcher = match self.context.open_session() {
            Ok(fetcher) => fetcher,
            Err(e) => return run.fail(&e),
        };

        match self.collect(&fetcher, &mut run).await {
            Ok(records) => run.finish(records),
            Err(e) => run.fail(&e),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Renders a JSON scalar as text; entity ids may be numbers or strings
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parses a WKT `POINT(lng lat)` into `(lat, lng)`
pub fn parse_wkt_point(wkt: &str) -> Option<(f64, f64)> {
    let inner = wkt.trim().strip_prefix("POINT")?.trim();
    let inner = inner.strip_prefix('(')?.strip_suffix(')')?;
    let mut coords = inner.split_whitespace();
    let lng: f64 = coords.next()?.parse().ok()?;
    let lat: f64 = coords.next()?.parse().ok()?;
    if coords.next().is_some() {
        return None;
    }
    Some((lat, lng))
}
