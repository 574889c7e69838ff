//! Canonical data model: counter set, per-source records, dated snapshots,
//! and the pure aggregation fold the collector runs over fetched records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The fixed counter set every root server reports. Absent fields decode
/// as zero; directory participation is optional per source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(default)]
    pub num_zones: u64,
    #[serde(default)]
    pub num_areas: u64,
    #[serde(default)]
    pub num_regions: u64,
    #[serde(default)]
    pub num_groups: u64,
    #[serde(default)]
    pub num_meetings: u64,
    #[serde(default)]
    pub num_in_person: u64,
    #[serde(default)]
    pub num_virtual: u64,
    #[serde(default)]
    pub num_hybrid: u64,
}

impl Counters {
    pub fn add(&self, other: &Counters) -> Counters {
        Counters {
            num_zones: self.num_zones + other.num_zones,
            num_areas: self.num_areas + other.num_areas,
            num_regions: self.num_regions + other.num_regions,
            num_groups: self.num_groups + other.num_groups,
            num_meetings: self.num_meetings + other.num_meetings,
            num_in_person: self.num_in_person + other.num_in_person,
            num_virtual: self.num_virtual + other.num_virtual,
            num_hybrid: self.num_hybrid + other.num_hybrid,
        }
    }

    /// Element-wise sum over any iterator of counter sets.
    pub fn sum<'a, I: IntoIterator<Item = &'a Counters>>(iter: I) -> Counters {
        iter.into_iter()
            .fold(Counters::default(), |acc, c| acc.add(c))
    }
}

/// One root server's self-reported statistics, normalized from the wire
/// shape on ingest. Ephemeral: consumed once per collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootServerRecord {
    pub source_id: String,
    pub name: String,
    pub counters: Counters,
}

/// One persisted daily rollup. `date` (YYYY-MM-DD) is the store key, so a
/// same-day re-run overwrites rather than duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub date: String,
    #[serde(flatten)]
    pub counters: Counters,
}

impl AggregateSnapshot {
    pub fn from_records(date: String, records: &[RootServerRecord]) -> Self {
        let counters = Counters::sum(records.iter().map(|r| &r.counters));
        Self { date, counters }
    }
}

/// One source's contribution on one date. `id` is a deterministic
/// composite of the date hash and the source id, so re-runs upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSourceSnapshot {
    pub id: String,
    pub date: String,
    pub source_id: String,
    pub name: String,
    #[serde(flatten)]
    pub counters: Counters,
}

impl PerSourceSnapshot {
    pub fn from_record(date: &str, date_hash: &str, record: &RootServerRecord) -> Self {
        Self {
            id: per_source_id(date_hash, &record.source_id),
            date: date.to_string(),
            source_id: record.source_id.clone(),
            name: record.name.clone(),
            counters: record.counters,
        }
    }
}

/// Store key format, lexicographically equivalent to chronological order.
pub fn date_label(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Compact date form used in per-source composite ids.
pub fn date_hash(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub fn per_source_id(date_hash: &str, source_id: &str) -> String {
    format!("{date_hash}{source_id}")
}
