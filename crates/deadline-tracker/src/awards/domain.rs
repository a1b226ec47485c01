use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Marker used in snapshot files for awards without a page to poll.
pub const NOT_APPLICABLE: &str = "N/A";

const NAME: &str = "name";
const ENTRY: &str = "latestOpeningEntry";
const DEADLINE: &str = "deadline";
const FETCHED_AT: &str = "_fetchedAt";

/// One tracked award as stored in the snapshot file.
///
/// Fields this crate does not interpret are kept in `extra` so that a
/// load/persist round trip never drops data other tools rely on. A known key
/// holding a value of the wrong type (a numeric deadline, an unparseable
/// timestamp) is kept there too instead of rejecting the record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct AwardRecord {
    pub name: String,
    pub latest_opening_entry: Option<String>,
    pub deadline: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for AwardRecord {
    fn from(mut fields: Map<String, Value>) -> Self {
        let name = take_string(&mut fields, NAME).unwrap_or_default();
        let latest_opening_entry = take_string(&mut fields, ENTRY);
        let deadline = take_string(&mut fields, DEADLINE);
        let last_fetched_at = match fields.get(FETCHED_AT) {
            Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw.trim())
                .ok()
                .map(|parsed| parsed.with_timezone(&Utc)),
            _ => None,
        };
        if last_fetched_at.is_some() {
            fields.remove(FETCHED_AT);
        }

        Self {
            name,
            latest_opening_entry,
            deadline,
            last_fetched_at,
            extra: fields,
        }
    }
}

/// Removes `key` only when it holds a string; anything else stays in `fields`.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(_)) => match fields.remove(key) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        },
        _ => None,
    }
}

impl Serialize for AwardRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        // A typed field wins over a leftover raw value under the same key.
        let mut written: Vec<&str> = Vec::with_capacity(4);
        if !self.extra.contains_key(NAME) {
            map.serialize_entry(NAME, &self.name)?;
            written.push(NAME);
        }
        if let Some(entry) = &self.latest_opening_entry {
            map.serialize_entry(ENTRY, entry)?;
            written.push(ENTRY);
        }
        if let Some(deadline) = &self.deadline {
            map.serialize_entry(DEADLINE, deadline)?;
            written.push(DEADLINE);
        }
        if let Some(fetched_at) = &self.last_fetched_at {
            map.serialize_entry(FETCHED_AT, fetched_at)?;
            written.push(FETCHED_AT);
        }

        for (key, value) in &self.extra {
            if !written.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl AwardRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latest_opening_entry: None,
            deadline: None,
            last_fetched_at: None,
            extra: Map::new(),
        }
    }

    pub fn with_entry(mut self, url: impl Into<String>) -> Self {
        self.latest_opening_entry = Some(url.into());
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    pub fn with_last_fetched_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_fetched_at = Some(at);
        self
    }

    /// URL to poll, or `None` when the award is not tracked.
    pub fn poll_url(&self) -> Option<&str> {
        let url = self.latest_opening_entry.as_deref()?.trim();
        if url.is_empty() || url == NOT_APPLICABLE {
            None
        } else {
            Some(url)
        }
    }

    /// True when the last fetch attempt is at least `window` old, or never happened.
    pub fn is_stale(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        fetch_due(self.last_fetched_at, now, window)
    }
}

/// Staleness rule shared by [`AwardRecord::is_stale`] and the refresher's
/// per-cycle plan.
pub(crate) fn fetch_due(
    last_fetched_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: chrono::Duration,
) -> bool {
    match last_fetched_at {
        Some(fetched_at) => now.signed_duration_since(fetched_at) >= window,
        None => true,
    }
}

/// Ordered award list. Order follows the snapshot file and names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AwardCollection(Vec<AwardRecord>);

impl AwardCollection {
    pub fn new(records: Vec<AwardRecord>) -> Self {
        Self(records)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AwardRecord> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&AwardRecord> {
        self.0.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut AwardRecord> {
        self.0.get_mut(index)
    }

    pub fn into_inner(self) -> Vec<AwardRecord> {
        self.0
    }
}

impl<'a> IntoIterator for &'a AwardCollection {
    type Item = &'a AwardRecord;
    type IntoIter = std::slice::Iter<'a, AwardRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Process-wide tracker state shared by the refresher and the query surface.
#[derive(Debug, Clone, Default)]
pub struct AwardState {
    pub awards: AwardCollection,
    /// Completion time of the most recent refresh cycle.
    pub last_updated: Option<DateTime<Utc>>,
}

impl AwardState {
    pub fn new(awards: AwardCollection) -> Self {
        Self {
            awards,
            last_updated: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn poll_url_ignores_missing_and_sentinel_entries() {
        assert_eq!(AwardRecord::new("A").poll_url(), None);
        assert_eq!(AwardRecord::new("B").with_entry("N/A").poll_url(), None);
        assert_eq!(AwardRecord::new("C").with_entry("   ").poll_url(), None);
        assert_eq!(
            AwardRecord::new("D")
                .with_entry(" https://example.org/call ")
                .poll_url(),
            Some("https://example.org/call")
        );
    }

    #[test]
    fn staleness_is_measured_from_last_attempt() {
        let window = Duration::hours(24);
        let record = AwardRecord::new("A").with_last_fetched_at(at(0));
        assert!(!record.is_stale(at(0) + Duration::hours(23), window));
        assert!(record.is_stale(at(0) + Duration::hours(24), window));
        assert!(record.is_stale(at(0) + Duration::hours(25), window));
        assert!(AwardRecord::new("B").is_stale(at(0), window));
    }

    #[test]
    fn snapshot_fields_use_existing_names_and_keep_unknown_keys() {
        let raw = json!([
            {
                "name": "Portrait Prize",
                "latestOpeningEntry": "https://example.org/portrait",
                "deadline": "March 3, 2025",
                "_fetchedAt": "2025-03-01T06:00:00.000Z",
                "category": "portrait",
                "prize": { "amount": 5000, "currency": "EUR" }
            },
            { "name": "Archive Award", "latestOpeningEntry": "N/A" }
        ]);

        let collection: AwardCollection =
            serde_json::from_value(raw.clone()).expect("snapshot parses");
        assert_eq!(collection.len(), 2);

        let first = collection.get(0).expect("first record");
        assert_eq!(first.deadline.as_deref(), Some("March 3, 2025"));
        assert_eq!(first.last_fetched_at, Some(at(6)));
        assert_eq!(first.extra.get("category"), Some(&json!("portrait")));

        let round_trip = serde_json::to_value(&collection).expect("serializes");
        assert_eq!(round_trip[0]["prize"], json!({ "amount": 5000, "currency": "EUR" }));
        assert_eq!(round_trip[0]["category"], json!("portrait"));
        assert_eq!(round_trip[1], json!({ "name": "Archive Award", "latestOpeningEntry": "N/A" }));
    }

    #[test]
    fn unparseable_fetch_timestamp_counts_as_never_fetched() {
        let record: AwardRecord = serde_json::from_value(json!({
            "name": "A",
            "latestOpeningEntry": "https://example.org/a",
            "_fetchedAt": "yesterday-ish"
        }))
        .expect("record parses");
        assert_eq!(record.last_fetched_at, None);
        assert!(record.is_stale(at(0), Duration::hours(24)));
        assert_eq!(record.extra.get("_fetchedAt"), Some(&json!("yesterday-ish")));

        let stamped = record.with_last_fetched_at(at(6));
        let value = serde_json::to_value(&stamped).expect("serializes");
        assert_eq!(value["_fetchedAt"], json!("2025-03-01T06:00:00Z"));
    }

    #[test]
    fn mistyped_known_fields_are_kept_verbatim() {
        let raw = json!({
            "name": "Odd",
            "latestOpeningEntry": "https://example.org/odd",
            "deadline": 20250101
        });
        let record: AwardRecord = serde_json::from_value(raw.clone()).expect("record parses");
        assert_eq!(record.name, "Odd");
        assert_eq!(record.deadline, None);
        assert_eq!(record.extra.get("deadline"), Some(&json!(20250101)));
        assert_eq!(serde_json::to_value(&record).expect("serializes"), raw);

        let updated = record.with_deadline("March 3, 2025");
        let value = serde_json::to_value(&updated).expect("serializes");
        assert_eq!(value["deadline"], json!("March 3, 2025"));
        assert_eq!(
            value.as_object().map(|fields| fields.len()),
            Some(3),
            "no duplicate deadline key"
        );
    }

    #[test]
    fn non_string_name_is_not_replaced_by_an_empty_one() {
        let raw = json!({ "name": 42, "latestOpeningEntry": null });
        let record: AwardRecord = serde_json::from_value(raw.clone()).expect("record parses");
        assert_eq!(record.poll_url(), None);
        assert_eq!(serde_json::to_value(&record).expect("serializes"), raw);
    }

    #[test]
    fn duplicate_names_are_kept_in_order() {
        let collection = AwardCollection::new(vec![
            AwardRecord::new("Same").with_entry("https://example.org/1"),
            AwardRecord::new("Same").with_entry("https://example.org/2"),
        ]);
        let urls: Vec<_> = collection.iter().filter_map(AwardRecord::poll_url).collect();
        assert_eq!(urls, vec!["https://example.org/1", "https://example.org/2"]);
    }
}
