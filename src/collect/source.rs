use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::error::FetchError;
use crate::model::{Counters, RootServerRecord};

/// Where a collection run gets its root-server records from. One call
/// returns the full set; the remote API has no pagination.
#[async_trait]
pub trait RootServerSource: Send + Sync {
    async fn fetch_root_servers(&self) -> Result<Vec<RootServerRecord>, FetchError>;
    fn name(&self) -> &'static str;
}

// --- Wire shapes -----------------------------------------------------------
//
// The remote API has shipped two response schemas over time: counters
// nested under `statistics.serviceBodies` / `statistics.meetings`, and a
// flat variant with `num_*` fields at the top level. Both are accepted
// here and normalized into `RootServerRecord` immediately; nothing
// downstream branches on the source shape.

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSourceId {
    Num(u64),
    Str(String),
}

impl RawSourceId {
    fn into_string(self) -> String {
        match self {
            RawSourceId::Num(n) => n.to_string(),
            RawSourceId::Str(s) => s,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawServiceBodies {
    #[serde(default, rename = "numZones")]
    num_zones: u64,
    #[serde(default, rename = "numAreas")]
    num_areas: u64,
    #[serde(default, rename = "numRegions")]
    num_regions: u64,
    #[serde(default, rename = "numGroups")]
    num_groups: u64,
}

#[derive(Debug, Default, Deserialize)]
struct RawMeetings {
    #[serde(default, rename = "numTotal")]
    num_total: u64,
    #[serde(default, rename = "numInPerson")]
    num_in_person: u64,
    #[serde(default, rename = "numVirtual")]
    num_virtual: u64,
    #[serde(default, rename = "numHybrid")]
    num_hybrid: u64,
}

#[derive(Debug, Default, Deserialize)]
struct RawStatistics {
    #[serde(default, rename = "serviceBodies")]
    service_bodies: RawServiceBodies,
    #[serde(default)]
    meetings: RawMeetings,
}

#[derive(Debug, Deserialize)]
struct RawRootServer {
    #[serde(default, alias = "sourceId", alias = "id")]
    source_id: Option<RawSourceId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    statistics: Option<RawStatistics>,
    // Flat-schema counters; all default to zero when absent.
    #[serde(flatten)]
    flat: Counters,
}

impl RawRootServer {
    fn normalize(self) -> RootServerRecord {
        let counters = match self.statistics {
            Some(stats) => Counters {
                num_zones: stats.service_bodies.num_zones,
                num_areas: stats.service_bodies.num_areas,
                num_regions: stats.service_bodies.num_regions,
                num_groups: stats.service_bodies.num_groups,
                num_meetings: stats.meetings.num_total,
                num_in_person: stats.meetings.num_in_person,
                num_virtual: stats.meetings.num_virtual,
                num_hybrid: stats.meetings.num_hybrid,
            },
            None => self.flat,
        };
        RootServerRecord {
            source_id: self
                .source_id
                .map(RawSourceId::into_string)
                .unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            counters,
        }
    }
}

fn parse_records(body: &str) -> Result<Vec<RootServerRecord>, FetchError> {
    let t0 = std::time::Instant::now();
    let raw: Vec<RawRootServer> = serde_json::from_str(body)?;
    let records: Vec<RootServerRecord> = raw.into_iter().map(RawRootServer::normalize).collect();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("collect_parse_ms").record(ms);
    counter!("collect_sources_total").increment(records.len() as u64);
    Ok(records)
}

/// Fetches the live root-server list over HTTP with an explicit request
/// timeout. A timeout, non-2xx status, or undecodable body is a
/// `FetchError` and aborts the whole run.
pub struct HttpRootServerSource {
    client: reqwest::Client,
    url: String,
}

impl HttpRootServerSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Http)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RootServerSource for HttpRootServerSource {
    async fn fetch_root_servers(&self) -> Result<Vec<RootServerRecord>, FetchError> {
        let resp = match self.client.get(&self.url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = ?e, url = %self.url, "root server fetch failed");
                counter!("collect_fetch_errors_total").increment(1);
                return Err(FetchError::Http(e));
            }
        };
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = %status, url = %self.url, "root server returned non-success");
            counter!("collect_fetch_errors_total").increment(1);
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.text().await.map_err(FetchError::Http)?;
        parse_records(&body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Serves a canned JSON body, for tests and offline runs.
pub struct FixtureSource {
    body: String,
}

impl FixtureSource {
    pub fn from_json(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

#[async_trait]
impl RootServerSource for FixtureSource {
    async fn fetch_root_servers(&self) -> Result<Vec<RootServerRecord>, FetchError> {
        parse_records(&self.body)
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_shape_normalizes_to_canonical_counters() {
        let body = r#"[{
            "sourceId": 5,
            "name": "Great Lakes",
            "statistics": {
                "serviceBodies": {"numZones": 1, "numAreas": 12, "numRegions": 3, "numGroups": 400},
                "meetings": {"numTotal": 900, "numInPerson": 700, "numVirtual": 150, "numHybrid": 50}
            }
        }]"#;
        let records = parse_records(body).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.source_id, "5");
        assert_eq!(r.name, "Great Lakes");
        assert_eq!(r.counters.num_zones, 1);
        assert_eq!(r.counters.num_meetings, 900);
        assert_eq!(r.counters.num_hybrid, 50);
    }

    #[test]
    fn flat_shape_normalizes_to_canonical_counters() {
        let body = r#"[{
            "source_id": "9",
            "name": "Plains",
            "num_zones": 0,
            "num_areas": 4,
            "num_regions": 1,
            "num_groups": 80,
            "num_meetings": 120
        }]"#;
        let records = parse_records(body).unwrap();
        let r = &records[0];
        assert_eq!(r.source_id, "9");
        assert_eq!(r.counters.num_areas, 4);
        assert_eq!(r.counters.num_meetings, 120);
        // fields the flat schema never carried default to zero
        assert_eq!(r.counters.num_virtual, 0);
    }

    #[test]
    fn missing_nested_sections_default_to_zero() {
        let body = r#"[{"sourceId": "7", "name": "Quiet", "statistics": {}}]"#;
        let records = parse_records(body).unwrap();
        assert_eq!(records[0].counters, Counters::default());
    }

    #[test]
    fn non_array_body_is_malformed() {
        assert!(matches!(
            parse_records(r#"{"oops": true}"#),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            parse_records("not json"),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn http_source_builds_with_explicit_timeout() {
        let src = HttpRootServerSource::new(
            "http://localhost:9000/rootservers/",
            Duration::from_secs(5),
        );
        assert!(src.is_ok(), "timeout-configured client must construct");
    }

    #[tokio::test]
    async fn fixture_source_round_trips() {
        let src = FixtureSource::from_json(r#"[{"sourceId": 1, "name": "A", "num_meetings": 3}]"#);
        let records = src.fetch_root_servers().await.unwrap();
        assert_eq!(records[0].counters.num_meetings, 3);
    }
}
