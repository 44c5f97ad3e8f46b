//! Record mapper: raw backend rows to normalized [`Event`] / [`Platform`] values.
//!
//! Rows arrive as untyped JSON objects with snake_case columns and, for events,
//! the joined `platform` sub-object:
//!
//! ```json
//! {
//!   "id": "1", "title": "...", "date": "2024-03-15T10:00:00+00:00",
//!   "mode": "Online", "theme": ["AI"], "created_at": "...",
//!   "platform": { "id": "devfolio", "name": "Devfolio", "logo": "...", "color": "#3770FF" }
//! }
//! ```
//!
//! Required fields: `id`, `title`, `date`, `platform`, `platform.id`, `mode`,
//! `created_at`. Nullable columns (`end_date`, `location`, `college`) map to
//! `None`; absent text columns map to empty strings.

use crate::error::MalformedRecordError;
use crate::model::{Event, EventMode, Platform, RawRecord, Theme};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::str::FromStr;

type Row = Map<String, Value>;

/// How a batch treats a row that fails to map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordPolicy {
    /// Log and drop the bad row, load the rest.
    #[default]
    SkipInvalid,
    /// Abort the whole batch on the first bad row.
    FailBatch,
}

impl FromStr for RecordPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" | "skip_invalid" => Ok(Self::SkipInvalid),
            "fail" | "fail_batch" => Ok(Self::FailBatch),
            other => Err(format!("unknown record policy `{other}`")),
        }
    }
}

/// A row the mapper dropped under [`RecordPolicy::SkipInvalid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// The row's `id`, when it had a readable one
    pub id: Option<String>,
    /// Why it was rejected
    pub error: MalformedRecordError,
}

/// Result of mapping a batch of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedBatch<T> {
    /// Successfully mapped values, in input order
    pub records: Vec<T>,
    /// Rows that were skipped
    pub rejected: Vec<RejectedRecord>,
}

impl<T> Default for MappedBatch<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// Map one joined event row.
///
/// # Errors
///
/// Returns [`MalformedRecordError`] if a required field is absent or null, a
/// field has the wrong type, a date does not parse, `mode` is unknown or
/// `view_count` is not a non-negative integer.
pub fn map_event(row: &RawRecord) -> Result<Event, MalformedRecordError> {
    let row = as_object(row)?;

    let platform = match row.get("platform") {
        None | Some(Value::Null) => return Err(MalformedRecordError::missing("platform")),
        Some(Value::Object(platform)) => map_embedded_platform(platform)?,
        Some(_) => return Err(MalformedRecordError::wrong_type("platform", "an object")),
    };

    let mode_name = required_str(row, "mode", "mode")?;
    let mode = EventMode::from_str(mode_name)
        .map_err(|_| MalformedRecordError::UnknownMode(mode_name.to_string()))?;

    Ok(Event {
        id: identifier(row, "id", "id")?,
        title: required_str(row, "title", "title")?.to_string(),
        short_description: text(row, "short_description", "short_description")?,
        description: text(row, "description", "description")?,
        platform,
        theme: themes(row)?,
        date: required_date(row, "date")?,
        end_date: optional_date(row, "end_date")?,
        organizer: text(row, "organizer", "organizer")?,
        location: optional_text(row, "location")?,
        mode,
        images: images(row)?,
        external_link: text(row, "external_link", "external_link")?,
        is_trending: flag(row, "is_trending")?,
        is_popular: flag(row, "is_popular")?,
        view_count: view_count(row)?,
        created_at: required_date(row, "created_at")?,
        college: optional_text(row, "college")?,
    })
}

/// Map one row of the `platforms` table.
///
/// # Errors
///
/// Returns [`MalformedRecordError`] if `id` or `name` is missing or any field
/// has the wrong type.
pub fn map_platform(row: &RawRecord) -> Result<Platform, MalformedRecordError> {
    let row = as_object(row)?;

    Ok(Platform {
        id: identifier(row, "id", "id")?,
        name: required_str(row, "name", "name")?.to_string(),
        logo: text(row, "logo", "logo")?,
        color: text(row, "color", "color")?,
    })
}

/// Map a batch of event rows under `policy`.
///
/// # Errors
///
/// Under [`RecordPolicy::FailBatch`], returns the first row's error.
/// [`RecordPolicy::SkipInvalid`] never fails.
pub fn map_batch(
    rows: &[RawRecord],
    policy: RecordPolicy,
) -> Result<MappedBatch<Event>, MalformedRecordError> {
    map_rows(rows, policy, "event", map_event)
}

/// Map a batch of platform rows under `policy`.
///
/// # Errors
///
/// Same as [`map_batch`].
pub fn map_platform_batch(
    rows: &[RawRecord],
    policy: RecordPolicy,
) -> Result<MappedBatch<Platform>, MalformedRecordError> {
    map_rows(rows, policy, "platform", map_platform)
}

/// Drop events whose platform is not in `platforms`.
///
/// A dangling platform reference is a data error and follows the same policy
/// as a malformed row.
///
/// # Errors
///
/// Under [`RecordPolicy::FailBatch`], returns
/// [`MalformedRecordError::UnknownPlatform`] for the first dangling event.
pub fn link_platforms(
    events: Vec<Event>,
    platforms: &[Platform],
    policy: RecordPolicy,
) -> Result<MappedBatch<Event>, MalformedRecordError> {
    let known: HashSet<&str> = platforms.iter().map(|p| p.id.as_str()).collect();
    let mut batch = MappedBatch::default();

    for event in events {
        if known.contains(event.platform.id.as_str()) {
            batch.records.push(event);
            continue;
        }

        let error = MalformedRecordError::UnknownPlatform {
            event_id: event.id.clone(),
            platform_id: event.platform.id.clone(),
        };
        match policy {
            RecordPolicy::FailBatch => return Err(error),
            RecordPolicy::SkipInvalid => {
                tracing::warn!(event_id = %event.id, %error, "Skipping event with dangling platform");
                batch.rejected.push(RejectedRecord {
                    id: Some(event.id),
                    error,
                });
            },
        }
    }

    Ok(batch)
}

fn map_rows<T>(
    rows: &[RawRecord],
    policy: RecordPolicy,
    kind: &'static str,
    map: impl Fn(&RawRecord) -> Result<T, MalformedRecordError>,
) -> Result<MappedBatch<T>, MalformedRecordError> {
    let mut batch = MappedBatch {
        records: Vec::with_capacity(rows.len()),
        rejected: Vec::new(),
    };

    for row in rows {
        match map(row) {
            Ok(record) => batch.records.push(record),
            Err(error) if policy == RecordPolicy::FailBatch => return Err(error),
            Err(error) => {
                let id = row.get("id").and_then(id_text);
                tracing::warn!(kind, id = ?id, %error, "Skipping malformed record");
                batch.rejected.push(RejectedRecord { id, error });
            },
        }
    }

    Ok(batch)
}

fn map_embedded_platform(row: &Row) -> Result<Platform, MalformedRecordError> {
    Ok(Platform {
        id: identifier(row, "id", "platform.id")?,
        name: text(row, "name", "platform.name")?,
        logo: text(row, "logo", "platform.logo")?,
        color: text(row, "color", "platform.color")?,
    })
}

fn as_object(row: &RawRecord) -> Result<&Row, MalformedRecordError> {
    row.as_object().ok_or(MalformedRecordError::NotAnObject)
}

fn required_str<'a>(
    row: &'a Row,
    key: &str,
    path: &str,
) -> Result<&'a str, MalformedRecordError> {
    match row.get(key) {
        None | Some(Value::Null) => Err(MalformedRecordError::missing(path)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(MalformedRecordError::wrong_type(path, "a string")),
    }
}

/// Row key as text. Integer-keyed tables hand back numbers.
fn identifier(row: &Row, key: &str, path: &str) -> Result<String, MalformedRecordError> {
    match row.get(key) {
        None | Some(Value::Null) => Err(MalformedRecordError::missing(path)),
        Some(value) => id_text(value)
            .ok_or_else(|| MalformedRecordError::wrong_type(path, "a string or number")),
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(row: &Row, key: &str, path: &str) -> Result<String, MalformedRecordError> {
    match row.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(MalformedRecordError::wrong_type(path, "a string")),
    }
}

fn optional_text(row: &Row, key: &str) -> Result<Option<String>, MalformedRecordError> {
    let value = text(row, key, key)?;
    Ok((!value.is_empty()).then_some(value))
}

fn flag(row: &Row, key: &str) -> Result<bool, MalformedRecordError> {
    match row.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(MalformedRecordError::wrong_type(key, "a boolean")),
    }
}

fn view_count(row: &Row) -> Result<u64, MalformedRecordError> {
    match row.get("view_count") {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| MalformedRecordError::InvalidViewCount(n.to_string())),
        Some(_) => Err(MalformedRecordError::wrong_type("view_count", "an integer")),
    }
}

fn string_array(
    row: &Row,
    key: &str,
    required: bool,
) -> Result<Vec<String>, MalformedRecordError> {
    let items = match row.get(key) {
        None | Some(Value::Null) if required => return Err(MalformedRecordError::missing(key)),
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(MalformedRecordError::wrong_type(key, "an array of strings")),
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| MalformedRecordError::wrong_type(key, "an array of strings"))
        })
        .collect()
}

fn themes(row: &Row) -> Result<Vec<Theme>, MalformedRecordError> {
    Ok(string_array(row, "theme", true)?
        .into_iter()
        .map(Theme::from)
        .collect())
}

fn images(row: &Row) -> Result<Vec<String>, MalformedRecordError> {
    string_array(row, "images", false)
}

fn required_date(row: &Row, key: &str) -> Result<DateTime<Utc>, MalformedRecordError> {
    let value = required_str(row, key, key)?;
    parse_datetime(key, value)
}

fn optional_date(row: &Row, key: &str) -> Result<Option<DateTime<Utc>>, MalformedRecordError> {
    match row.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => parse_datetime(key, s).map(Some),
        Some(_) => Err(MalformedRecordError::wrong_type(key, "a date string")),
    }
}

/// Parse the date forms the backend and admin forms produce.
///
/// Accepts RFC 3339, naive date-times (read as UTC) and bare dates (midnight UTC).
///
/// # Errors
///
/// Returns [`MalformedRecordError::InvalidDate`] if no form matches.
pub fn parse_datetime(field: &str, value: &str) -> Result<DateTime<Utc>, MalformedRecordError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| MalformedRecordError::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Literal timestamps
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn row() -> Value {
        json!({
            "id": "evt-1",
            "title": "Global AI Hackathon",
            "short_description": "48 hours of AI",
            "description": "Build with models.",
            "date": "2024-03-15T10:00:00+00:00",
            "end_date": null,
            "organizer": "Devfolio",
            "location": null,
            "mode": "Hybrid",
            "theme": ["AI", "Quantum"],
            "images": ["https://img/1.png"],
            "external_link": "https://example.com/register",
            "is_trending": true,
            "is_popular": false,
            "view_count": 42,
            "created_at": "2024-02-01T08:30:00.123456+00:00",
            "college": "",
            "platform": { "id": "devfolio", "name": "Devfolio", "logo": "https://logo", "color": "#3770FF" }
        })
    }

    fn without(mut value: Value, key: &str) -> Value {
        if let Some(map) = value.as_object_mut() {
            map.remove(key);
        }
        value
    }

    fn with(mut value: Value, key: &str, field: Value) -> Value {
        if let Some(map) = value.as_object_mut() {
            map.insert(key.to_string(), field);
        }
        value
    }

    #[test]
    fn maps_full_row() -> Result<(), MalformedRecordError> {
        let event = map_event(&row())?;

        assert_eq!(event.id, "evt-1");
        assert_eq!(event.platform.id, "devfolio");
        assert_eq!(event.mode, EventMode::Hybrid);
        assert_eq!(
            event.theme,
            vec![Theme::Ai, Theme::Other("Quantum".to_string())]
        );
        assert_eq!(event.date, Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap());
        assert_eq!(event.end_date, None);
        assert_eq!(event.location, None);
        assert_eq!(event.college, None);
        assert_eq!(event.view_count, 42);
        assert!(event.is_trending);
        Ok(())
    }

    #[test]
    fn missing_platform_is_malformed() {
        assert_eq!(
            map_event(&without(row(), "platform")),
            Err(MalformedRecordError::missing("platform"))
        );
        assert_eq!(
            map_event(&with(row(), "platform", Value::Null)),
            Err(MalformedRecordError::missing("platform"))
        );
    }

    #[test]
    fn missing_platform_id_is_malformed() {
        let broken = with(row(), "platform", json!({ "name": "Devfolio" }));
        assert_eq!(
            map_event(&broken),
            Err(MalformedRecordError::missing("platform.id"))
        );
    }

    #[test]
    fn numeric_keys_map_to_text() -> Result<(), MalformedRecordError> {
        let keyed = with(
            with(row(), "id", json!(7)),
            "platform",
            json!({ "id": 3, "name": "MLH" }),
        );

        let event = map_event(&keyed)?;
        assert_eq!(event.id, "7");
        assert_eq!(event.platform.id, "3");
        assert_eq!(map_platform(&json!({ "id": 3, "name": "MLH" }))?.id, "3");
        assert_eq!(
            map_event(&with(row(), "id", json!(true))),
            Err(MalformedRecordError::wrong_type("id", "a string or number"))
        );
        Ok(())
    }

    #[test]
    fn required_fields_are_enforced() {
        for key in ["id", "title", "date", "mode", "created_at", "theme"] {
            assert_eq!(
                map_event(&without(row(), key)),
                Err(MalformedRecordError::missing(key)),
                "{key} should be required"
            );
        }
    }

    #[test]
    fn non_array_theme_is_malformed() {
        let broken = with(row(), "theme", json!("AI"));
        assert!(matches!(
            map_event(&broken),
            Err(MalformedRecordError::WrongType { ref field, .. }) if field == "theme"
        ));
    }

    #[test]
    fn absent_optionals_get_defaults() -> Result<(), MalformedRecordError> {
        let minimal = json!({
            "id": "2",
            "title": "Minimal",
            "date": "2024-03-22",
            "mode": "Online",
            "theme": [],
            "created_at": "2024-03-01T00:00:00Z",
            "platform": { "id": "mlh" }
        });

        let event = map_event(&minimal)?;
        assert_eq!(event.short_description, "");
        assert_eq!(event.platform.name, "");
        assert!(event.images.is_empty());
        assert!(!event.is_popular);
        assert_eq!(event.view_count, 0);
        assert_eq!(event.date, Utc.with_ymd_and_hms(2024, 3, 22, 0, 0, 0).unwrap());
        Ok(())
    }

    #[test]
    fn rejects_bad_scalars() {
        assert_eq!(
            map_event(&with(row(), "mode", json!("Remote"))),
            Err(MalformedRecordError::UnknownMode("Remote".to_string()))
        );
        assert_eq!(
            map_event(&with(row(), "view_count", json!(-3))),
            Err(MalformedRecordError::InvalidViewCount("-3".to_string()))
        );
        assert!(matches!(
            map_event(&with(row(), "date", json!("next tuesday"))),
            Err(MalformedRecordError::InvalidDate { .. })
        ));
        assert_eq!(map_event(&json!([1, 2])), Err(MalformedRecordError::NotAnObject));
    }

    #[test]
    fn naive_datetimes_are_utc() -> Result<(), MalformedRecordError> {
        let expected = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        assert_eq!(parse_datetime("date", "2024-03-15T10:00:00")?, expected);
        assert_eq!(parse_datetime("date", "2024-03-15 10:00:00")?, expected);
        assert_eq!(parse_datetime("date", "2024-03-15T10:00")?, expected);
        assert_eq!(parse_datetime("date", "2024-03-15T12:00:00+02:00")?, expected);
        Ok(())
    }

    #[test]
    fn skip_policy_keeps_good_rows() -> Result<(), MalformedRecordError> {
        let rows = vec![row(), without(row(), "platform"), with(row(), "id", json!("evt-2"))];

        let batch = map_batch(&rows, RecordPolicy::SkipInvalid)?;

        let ids: Vec<_> = batch.records.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["evt-1", "evt-2"]);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].id.as_deref(), Some("evt-1"));
        Ok(())
    }

    #[test]
    fn fail_policy_aborts_batch() {
        let rows = vec![row(), without(row(), "platform")];
        assert_eq!(
            map_batch(&rows, RecordPolicy::FailBatch),
            Err(MalformedRecordError::missing("platform"))
        );
    }

    #[test]
    fn platform_rows_require_name() -> Result<(), MalformedRecordError> {
        let platform = map_platform(&json!({ "id": "mlh", "name": "MLH", "color": "#E73427" }))?;
        assert_eq!(platform.logo, "");

        assert_eq!(
            map_platform(&json!({ "id": "mlh" })),
            Err(MalformedRecordError::missing("name"))
        );
        Ok(())
    }

    #[test]
    fn dangling_platform_follows_policy() -> Result<(), MalformedRecordError> {
        let event = map_event(&row())?;
        let platforms = vec![Platform {
            id: "mlh".to_string(),
            name: "MLH".to_string(),
            logo: String::new(),
            color: String::new(),
        }];

        let linked = link_platforms(vec![event.clone()], &platforms, RecordPolicy::SkipInvalid)?;
        assert!(linked.records.is_empty());
        assert_eq!(linked.rejected.len(), 1);

        assert_eq!(
            link_platforms(vec![event], &platforms, RecordPolicy::FailBatch),
            Err(MalformedRecordError::UnknownPlatform {
                event_id: "evt-1".to_string(),
                platform_id: "devfolio".to_string(),
            })
        );
        Ok(())
    }

    #[test]
    fn policy_parses_from_config_values() {
        assert_eq!("skip".parse(), Ok(RecordPolicy::SkipInvalid));
        assert_eq!("FAIL_BATCH".parse(), Ok(RecordPolicy::FailBatch));
        assert!("maybe".parse::<RecordPolicy>().is_err());
    }
}
