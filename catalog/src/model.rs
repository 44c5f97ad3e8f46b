//! Normalized catalog types.
//!
//! [`Event`] and [`Platform`] are produced fresh by the [record mapper](crate::mapper)
//! on every fetch. Nothing in this crate mutates them after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An untyped backend row, as returned by the REST layer.
pub type RawRecord = serde_json::Value;

/// The hosting service an event is listed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Opaque unique id, referenced by [`Event::platform`]
    pub id: String,
    /// Display name
    pub name: String,
    /// Logo URL (may be empty)
    pub logo: String,
    /// Brand color, expected in `#rrggbb` form but not validated
    pub color: String,
}

/// Where an event takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventMode {
    /// Remote only
    Online,
    /// In person only
    Offline,
    /// Both
    Hybrid,
}

impl EventMode {
    /// All modes, in display order.
    pub const ALL: [Self; 3] = [Self::Online, Self::Offline, Self::Hybrid];

    /// Wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
            Self::Hybrid => "Hybrid",
        }
    }
}

impl fmt::Display for EventMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`EventMode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for EventMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Online" => Ok(Self::Online),
            "Offline" => Ok(Self::Offline),
            "Hybrid" => Ok(Self::Hybrid),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// A topic tag on an event.
///
/// The known tags are the ones the directory offers as filters. Tags entered by
/// an admin outside that list are kept verbatim as [`Theme::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Theme {
    /// "AI"
    Ai,
    /// "Web3"
    Web3,
    /// "Mobile"
    Mobile,
    /// "Web Development"
    WebDevelopment,
    /// "Data Science"
    DataScience,
    /// "Blockchain"
    Blockchain,
    /// "IoT"
    Iot,
    /// "Gaming"
    Gaming,
    /// "Fintech"
    Fintech,
    /// "Healthcare"
    Healthcare,
    /// "Sustainability"
    Sustainability,
    /// "Education"
    Education,
    /// "Open Source"
    OpenSource,
    /// Any tag outside the known list
    Other(String),
}

impl Theme {
    /// The known tags, in the order the directory lists them.
    pub const KNOWN: [Self; 13] = [
        Self::Ai,
        Self::Web3,
        Self::Mobile,
        Self::WebDevelopment,
        Self::DataScience,
        Self::Blockchain,
        Self::Iot,
        Self::Gaming,
        Self::Fintech,
        Self::Healthcare,
        Self::Sustainability,
        Self::Education,
        Self::OpenSource,
    ];

    /// Wire name of the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ai => "AI",
            Self::Web3 => "Web3",
            Self::Mobile => "Mobile",
            Self::WebDevelopment => "Web Development",
            Self::DataScience => "Data Science",
            Self::Blockchain => "Blockchain",
            Self::Iot => "IoT",
            Self::Gaming => "Gaming",
            Self::Fintech => "Fintech",
            Self::Healthcare => "Healthcare",
            Self::Sustainability => "Sustainability",
            Self::Education => "Education",
            Self::OpenSource => "Open Source",
            Self::Other(tag) => tag,
        }
    }

    /// Whether this is one of the known tags.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for Theme {
    fn from(tag: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|known| known.as_str() == tag)
            .cloned()
            .unwrap_or_else(|| Self::Other(tag.to_string()))
    }
}

impl FromStr for Theme {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<String> for Theme {
    fn from(tag: String) -> Self {
        match Self::from(tag.as_str()) {
            Self::Other(_) => Self::Other(tag),
            known => known,
        }
    }
}

impl From<Theme> for String {
    fn from(theme: Theme) -> Self {
        match theme {
            Theme::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listed hackathon or tech event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Opaque unique id
    pub id: String,
    /// Title
    pub title: String,
    /// One-line summary shown on cards
    pub short_description: String,
    /// Full description
    pub description: String,
    /// Owning platform, embedded from the join
    pub platform: Platform,
    /// Ordered topic tags
    pub theme: Vec<Theme>,
    /// Start date-time
    pub date: DateTime<Utc>,
    /// End date-time, if the event spans several days
    pub end_date: Option<DateTime<Utc>>,
    /// Organizer name
    pub organizer: String,
    /// Venue, if any
    pub location: Option<String>,
    /// Online, offline or hybrid
    pub mode: EventMode,
    /// Image URLs, in display order
    pub images: Vec<String>,
    /// Registration URL
    pub external_link: String,
    /// Admin-set trending flag
    pub is_trending: bool,
    /// Admin-set popular flag
    pub is_popular: bool,
    /// Number of detail views
    pub view_count: u64,
    /// When the row was created
    pub created_at: DateTime<Utc>,
    /// College category tag
    pub college: Option<String>,
}

impl Event {
    /// Whether the event carries the given tag.
    #[must_use]
    pub fn has_theme(&self, theme: &Theme) -> bool {
        self.theme.contains(theme)
    }
}
