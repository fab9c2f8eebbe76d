//! Compaction of raw CMS records into the few fields a prompt needs.

use crate::dates::{self, Occasion, RecurrenceRule};
use crate::html::clean_content;
use crate::kinds::ContentKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw node exactly as returned by the content API.
pub type RawRecord = Value;

/// Default location for events without one.
pub const LOCATION_NOT_SPECIFIED: &str = "Location not specified";

/// Marker carried by records that could not be reduced.
pub const PROCESSING_ERROR: &str = "Processing error";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReducedEvent {
    pub title: String,
    pub summary: String,
    pub location: String,
    pub dates: Vec<String>,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReducedPage {
    pub title: String,
    pub content: String,
    pub uri: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReducedRecord {
    Event(ReducedEvent),
    Page(ReducedPage),
}

impl ReducedRecord {
    pub fn title(&self) -> &str {
        match self {
            ReducedRecord::Event(e) => &e.title,
            ReducedRecord::Page(p) => &p.title,
        }
    }
}

/// Placeholder for a record that failed reduction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReductionFailure {
    pub title: String,
    pub error: String,
    #[serde(skip)]
    pub reason: String,
}

pub type Reduction = std::result::Result<ReducedRecord, ReductionFailure>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventNode {
    title: Option<String>,
    content: Option<Value>,
    uri: Option<String>,
    location: Option<EventLocation>,
    #[serde(rename = "acfGroupEvent")]
    fields: Option<EventFields>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventLocation {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EventFields {
    #[serde(deserialize_with = "dates::null_as_empty")]
    occasions: Vec<Occasion>,
    #[serde(deserialize_with = "dates::null_as_empty")]
    rcr_rules: Vec<RecurrenceRule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageNode {
    title: Option<String>,
    content: Option<Value>,
    uri: Option<String>,
    date: Option<String>,
}

/// Reduce one raw record of the given kind.
pub fn reduce(record: &RawRecord, kind: ContentKind) -> Reduction {
    if !record.is_object() {
        return Err(failure(record, kind, "record is not a JSON object".to_string()));
    }
    let reduced = match kind {
        ContentKind::Events => reduce_event(record),
        ContentKind::Pages => reduce_page(record),
    };
    reduced.map_err(|e| failure(record, kind, e.to_string()))
}

fn reduce_event(record: &RawRecord) -> serde_json::Result<ReducedRecord> {
    let node = EventNode::deserialize(record)?;
    let location = node
        .location
        .and_then(|l| l.name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| LOCATION_NOT_SPECIFIED.to_string());
    let fields = node.fields.unwrap_or_default();

    Ok(ReducedRecord::Event(ReducedEvent {
        title: node.title.unwrap_or_default(),
        summary: clean_content(node.content.as_ref()),
        location,
        dates: dates::format_dates(&fields.occasions, &fields.rcr_rules),
        uri: node.uri.unwrap_or_default(),
    }))
}

fn reduce_page(record: &RawRecord) -> serde_json::Result<ReducedRecord> {
    let node = PageNode::deserialize(record)?;
    Ok(ReducedRecord::Page(ReducedPage {
        title: node.title.unwrap_or_default(),
        content: clean_content(node.content.as_ref()),
        uri: node.uri.unwrap_or_default(),
        date: node.date.unwrap_or_default(),
    }))
}

fn failure(record: &RawRecord, kind: ContentKind, reason: String) -> ReductionFailure {
    let title = record
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(kind.unknown_title())
        .to_string();
    ReductionFailure {
        title,
        error: PROCESSING_ERROR.to_string(),
        reason,
    }
}

/// Reduce every record, one outcome per input in input order.
pub fn reduce_all(records: &[RawRecord], kind: ContentKind) -> Vec<Reduction> {
    records
        .iter()
        .map(|record| {
            let outcome = reduce(record, kind);
            if let Err(ref f) = outcome {
                tracing::warn!("Failed to reduce {} record '{}': {}", kind, f.title, f.reason);
            }
            outcome
        })
        .collect()
}

pub fn failure_count(outcomes: &[Reduction]) -> usize {
    outcomes.iter().filter(|o| o.is_err()).count()
}

#[derive(Serialize)]
#[serde(untagged)]
enum ContextEntry<'a> {
    Reduced(&'a ReducedRecord),
    Failed(&'a ReductionFailure),
}

/// Serialise outcomes as the JSON array placed in the prompt.
pub fn to_context_json(outcomes: &[Reduction]) -> serde_json::Result<String> {
    let entries: Vec<ContextEntry<'_>> = outcomes
        .iter()
        .map(|o| match o {
            Ok(r) => ContextEntry::Reduced(r),
            Err(f) => ContextEntry::Failed(f),
        })
        .collect();
    serde_json::to_string(&entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn midsummer_event() -> Value {
        json!({
            "title": "Midsommarfirande",
            "content": "<p>Dans kring stången&nbsp;i Doktorsparken.</p>",
            "uri": "/evenemang/midsommarfirande/",
            "slug": "midsommarfirande",
            "location": { "active": true, "name": "Doktorsparken" },
            "acfGroupEvent": {
                "bookingLink": null,
                "occasions": [{ "startDate": "2025-06-20", "endDate": "2025-06-20" }],
                "rcrRules": null
            },
            "date": "2025-05-01T10:00:00"
        })
    }

    #[test]
    fn test_reduce_event() {
        let reduced = reduce(&midsummer_event(), ContentKind::Events).unwrap();
        let ReducedRecord::Event(event) = reduced else {
            panic!("expected an event");
        };
        assert_eq!(event.title, "Midsommarfirande");
        assert_eq!(event.summary, "Dans kring stången i Doktorsparken.");
        assert_eq!(event.location, "Doktorsparken");
        assert_eq!(event.dates, vec!["2025-06-20"]);
        assert_eq!(event.uri, "/evenemang/midsommarfirande/");
    }

    #[test]
    fn test_event_defaults() {
        let reduced = reduce(&json!({ "title": "Loppis", "location": null }), ContentKind::Events)
            .unwrap();
        let ReducedRecord::Event(event) = reduced else {
            panic!("expected an event");
        };
        assert_eq!(event.location, LOCATION_NOT_SPECIFIED);
        assert_eq!(event.dates, vec![dates::DATE_NOT_SPECIFIED]);
        assert_eq!(event.summary, "");
        assert_eq!(event.uri, "");
    }

    #[test]
    fn test_reduce_page_keeps_raw_date() {
        let page = json!({
            "title": "Skrea strand",
            "content": "<h1>Skrea strand</h1><p>En av Hallands längsta sandstränder.</p>",
            "uri": "/uppleva/skrea-strand/",
            "date": "2023-04-11T08:15:00"
        });
        let ReducedRecord::Page(page) = reduce(&page, ContentKind::Pages).unwrap() else {
            panic!("expected a page");
        };
        assert_eq!(page.date, "2023-04-11T08:15:00");
        assert_eq!(page.content, "Skrea strand En av Hallands längsta sandstränder.");
    }

    #[test]
    fn test_type_mismatch_becomes_failure_with_title() {
        let bad = json!({
            "title": "Trasigt evenemang",
            "acfGroupEvent": { "occasions": "not a list" }
        });
        let failure = reduce(&bad, ContentKind::Events).unwrap_err();
        assert_eq!(failure.title, "Trasigt evenemang");
        assert_eq!(failure.error, PROCESSING_ERROR);
        assert!(!failure.reason.is_empty());
    }

    #[test]
    fn test_one_bad_record_does_not_abort_batch() {
        let records = vec![
            midsummer_event(),
            json!("just a string"),
            midsummer_event(),
            json!({ "title": 42 }),
            midsummer_event(),
        ];
        let outcomes = reduce_all(&records, ContentKind::Events);
        assert_eq!(outcomes.len(), 5);
        assert_eq!(failure_count(&outcomes), 2);
        assert!(outcomes[1].is_err());
        assert_eq!(outcomes[1].as_ref().unwrap_err().title, "Unknown event");
        assert_eq!(outcomes[3].as_ref().unwrap_err().title, "Unknown event");
    }

    #[test]
    fn test_context_json_shape() {
        let outcomes = reduce_all(
            &[midsummer_event(), json!(null)],
            ContentKind::Events,
        );
        let json: Value = serde_json::from_str(&to_context_json(&outcomes).unwrap()).unwrap();
        let arr = json.as_array().unwrap();
        assert_eq!(arr[0]["location"], "Doktorsparken");
        assert_eq!(arr[0]["dates"][0], "2025-06-20");
        assert_eq!(arr[1], json!({ "title": "Unknown event", "error": "Processing error" }));
    }
}
