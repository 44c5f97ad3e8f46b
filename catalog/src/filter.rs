//! Filter predicate engine.
//!
//! [`filter`] keeps the events that satisfy every field of a [`FilterSpec`]
//! (logical AND), in input order. It never reorders, truncates or mutates.
//!
//! Date buckets are relative to `now`, which carries the viewer's UTC offset:
//!
//! | Bucket  | Passes when                                      |
//! |---------|--------------------------------------------------|
//! | `all`   | always                                           |
//! | `today` | start falls on now's local calendar day          |
//! | `week`  | `now <= start <= now + 7 days`                   |
//! | `month` | `now <= start <= now + 30 days`                  |
//!
//! The lower bound is `now`, not the event's end. A multi-day event that
//! started yesterday is excluded from `today` and `week` even while it runs.

use crate::model::{Event, EventMode, Theme};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Wire name of the wildcard.
pub const ALL: &str = "all";

/// A wildcard or one concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection<T> {
    /// Match everything
    All,
    /// Match exactly this value
    Only(T),
}

impl<T: PartialEq> Selection<T> {
    /// Whether `value` passes this selection.
    #[must_use]
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == value,
        }
    }
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T> Selection<T> {
    /// Whether this is the wildcard.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL),
            Self::Only(value) => value.fmt(f),
        }
    }
}

impl<T: FromStr> FromStr for Selection<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

impl<T: fmt::Display> Serialize for Selection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T> Deserialize<'de> for Selection<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Relative date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateBucket {
    /// No date restriction
    #[default]
    All,
    /// Same local calendar day as now
    Today,
    /// Within the next 7 days
    Week,
    /// Within the next 30 days
    Month,
}

impl DateBucket {
    /// Length of the forward window, for the ranged buckets.
    #[must_use]
    pub fn window(self) -> Option<Duration> {
        match self {
            Self::Week => Some(Duration::days(7)),
            Self::Month => Some(Duration::days(30)),
            Self::All | Self::Today => None,
        }
    }

    /// Whether an event starting at `start` falls in this bucket.
    #[must_use]
    pub fn contains(self, start: DateTime<Utc>, now: DateTime<FixedOffset>) -> bool {
        match self {
            Self::All => true,
            Self::Today => start.with_timezone(now.offset()).date_naive() == now.date_naive(),
            Self::Week | Self::Month => {
                let now = now.with_timezone(&Utc);
                let end = self.window().map_or(now, |window| now + window);
                now <= start && start <= end
            },
        }
    }
}

/// Active filter criteria, combined with logical AND.
///
/// Serializes with the wire names the directory UI uses:
///
/// ```
/// use techevents_catalog::filter::{DateBucket, FilterSpec};
/// use techevents_catalog::model::EventMode;
///
/// let spec = FilterSpec::default()
///     .with_mode(EventMode::Online)
///     .with_date(DateBucket::Week);
///
/// let json = serde_json::to_string(&spec).unwrap();
/// assert_eq!(json, r#"{"theme":"all","platform":"all","date":"week","mode":"Online"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Theme tag the event must carry
    pub theme: Selection<Theme>,
    /// Platform id the event must be listed under
    pub platform: Selection<String>,
    /// Date window the event must start in
    pub date: DateBucket,
    /// Mode the event must have
    pub mode: Selection<EventMode>,
}

impl FilterSpec {
    /// Restrict to a theme.
    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Selection::Only(theme);
        self
    }

    /// Restrict to a platform id.
    #[must_use]
    pub fn with_platform(mut self, platform_id: impl Into<String>) -> Self {
        self.platform = Selection::Only(platform_id.into());
        self
    }

    /// Restrict to a date bucket.
    #[must_use]
    pub fn with_date(mut self, date: DateBucket) -> Self {
        self.date = date;
        self
    }

    /// Restrict to a mode.
    #[must_use]
    pub fn with_mode(mut self, mode: EventMode) -> Self {
        self.mode = Selection::Only(mode);
        self
    }

    /// Whether every field is the wildcard.
    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        self.theme.is_all()
            && self.platform.is_all()
            && self.date == DateBucket::All
            && self.mode.is_all()
    }

    /// Whether one event passes all four predicates.
    #[must_use]
    pub fn matches(&self, event: &Event, now: DateTime<FixedOffset>) -> bool {
        let theme = match &self.theme {
            Selection::All => true,
            Selection::Only(theme) => event.has_theme(theme),
        };

        theme
            && self.platform.accepts(&event.platform.id)
            && self.mode.accepts(&event.mode)
            && self.date.contains(event.date, now)
    }
}

/// Keep the events matching `spec`, in input order.
#[must_use]
pub fn filter<'a>(
    events: &'a [Event],
    spec: &FilterSpec,
    now: DateTime<FixedOffset>,
) -> Vec<&'a Event> {
    if spec.is_unfiltered() {
        return events.iter().collect();
    }
    events.iter().filter(|event| spec.matches(event, now)).collect()
}

/// Decode a spec from its JSON wire form.
///
/// # Errors
///
/// Returns the serde error if a field has an unknown value.
pub fn parse_spec(json: &str) -> Result<FilterSpec, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Literal timestamps
mod tests {
    use super::*;
    use crate::model::Platform;
    use chrono::TimeZone;

    fn event(id: &str, date: &str, mode: EventMode, theme: Theme, platform: &str) -> Event {
        Event {
            id: id.to_string(),
            title: format!("Event {id}"),
            short_description: String::new(),
            description: String::new(),
            platform: Platform {
                id: platform.to_string(),
                name: platform.to_string(),
                logo: String::new(),
                color: String::new(),
            },
            theme: vec![theme],
            date: crate::mapper::parse_datetime("date", date).unwrap(),
            end_date: None,
            organizer: String::new(),
            location: None,
            mode,
            images: Vec::new(),
            external_link: String::new(),
            is_trending: false,
            is_popular: false,
            view_count: 0,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            college: None,
        }
    }

    fn utc(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn ids<'a>(events: &[&'a Event]) -> Vec<&'a str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn mode_filter_keeps_only_online() {
        let events = vec![
            event("1", "2024-03-15", EventMode::Hybrid, Theme::Ai, "devfolio"),
            event("2", "2024-03-22", EventMode::Online, Theme::Web3, "devfolio"),
        ];
        let spec = FilterSpec::default().with_mode(EventMode::Online);

        assert_eq!(ids(&filter(&events, &spec, utc("2024-03-01T00:00:00Z"))), vec!["2"]);
    }

    #[test]
    fn theme_and_platform_combine_with_and() {
        let events = vec![
            event("1", "2024-03-15", EventMode::Online, Theme::Ai, "devfolio"),
            event("2", "2024-03-15", EventMode::Online, Theme::Ai, "mlh"),
            event("3", "2024-03-15", EventMode::Online, Theme::Gaming, "mlh"),
        ];
        let spec = FilterSpec::default().with_theme(Theme::Ai).with_platform("mlh");

        assert_eq!(ids(&filter(&events, &spec, utc("2024-03-01T00:00:00Z"))), vec!["2"]);
    }

    #[test]
    fn today_uses_local_calendar_day() {
        // 23:30 UTC on the 14th is already the 15th at +05:30
        let events = vec![event(
            "late",
            "2024-03-14T23:30:00Z",
            EventMode::Online,
            Theme::Ai,
            "devfolio",
        )];
        let spec = FilterSpec::default().with_date(DateBucket::Today);

        let ist_morning = utc("2024-03-15T09:00:00+05:30");
        let utc_morning = utc("2024-03-15T09:00:00Z");

        assert_eq!(filter(&events, &spec, ist_morning).len(), 1);
        assert!(filter(&events, &spec, utc_morning).is_empty());
    }

    #[test]
    fn week_bounds_are_inclusive() {
        let now = utc("2024-03-15T12:00:00Z");
        let spec = FilterSpec::default().with_date(DateBucket::Week);
        let events = vec![
            event("now", "2024-03-15T12:00:00Z", EventMode::Online, Theme::Ai, "p"),
            event("edge", "2024-03-22T12:00:00Z", EventMode::Online, Theme::Ai, "p"),
            event("past-edge", "2024-03-22T12:00:01Z", EventMode::Online, Theme::Ai, "p"),
            event("yesterday", "2024-03-14T12:00:00Z", EventMode::Online, Theme::Ai, "p"),
        ];

        assert_eq!(ids(&filter(&events, &spec, now)), vec!["now", "edge"]);
    }

    #[test]
    fn month_window_is_thirty_days() {
        let now = utc("2024-03-01T00:00:00Z");
        assert!(DateBucket::Month.contains(Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap(), now));
        assert!(!DateBucket::Month.contains(Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 1).unwrap(), now));
    }

    #[test]
    fn ongoing_event_is_excluded_from_week() {
        let mut running = event("running", "2024-03-14T09:00:00Z", EventMode::Online, Theme::Ai, "p");
        running.end_date = Some(Utc.with_ymd_and_hms(2024, 3, 17, 18, 0, 0).unwrap());

        let spec = FilterSpec::default().with_date(DateBucket::Week);
        assert!(!spec.matches(&running, utc("2024-03-15T12:00:00Z")));
    }

    #[test]
    fn spec_wire_format_round_trips() -> Result<(), serde_json::Error> {
        let spec = parse_spec(
            r#"{"theme":"Web Development","platform":"devfolio","date":"month","mode":"all"}"#,
        )?;

        assert_eq!(spec.theme, Selection::Only(Theme::WebDevelopment));
        assert_eq!(spec.platform, Selection::Only("devfolio".to_string()));
        assert_eq!(spec.date, DateBucket::Month);
        assert!(spec.mode.is_all());

        let partial = parse_spec(r#"{"mode":"Offline"}"#)?;
        assert_eq!(partial, FilterSpec::default().with_mode(EventMode::Offline));
        Ok(())
    }

    #[test]
    fn unknown_mode_is_rejected_on_decode() {
        assert!(parse_spec(r#"{"mode":"Remote"}"#).is_err());
    }
}
