//! Catalog statistics and browse categories.

use crate::filter::{DateBucket, FilterSpec, filter};
use crate::model::{Event, EventMode, Platform};
use crate::ranking::{popular, top_by_views, trending};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How many events the admin "most viewed" panel lists.
pub const ADMIN_TOP_VIEWED: usize = 5;

/// Dashboard counters over one loaded catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Number of events
    pub total_events: usize,
    /// Number of platforms
    pub total_platforms: usize,
    /// Sum of all view counts
    pub total_views: u64,
    /// Events flagged trending
    pub trending: usize,
    /// Events flagged popular
    pub popular: usize,
    /// Events with a location
    pub located: usize,
    /// Online events
    pub online: usize,
    /// Offline events
    pub offline: usize,
    /// Hybrid events
    pub hybrid: usize,
}

impl CatalogStats {
    /// Count over the given lists.
    #[must_use]
    pub fn collect(events: &[Event], platforms: &[Platform]) -> Self {
        let mut stats = Self {
            total_events: events.len(),
            total_platforms: platforms.len(),
            ..Self::default()
        };

        for event in events {
            stats.total_views = stats.total_views.saturating_add(event.view_count);
            stats.trending += usize::from(event.is_trending);
            stats.popular += usize::from(event.is_popular);
            stats.located += usize::from(event.location.is_some());
            match event.mode {
                EventMode::Online => stats.online += 1,
                EventMode::Offline => stats.offline += 1,
                EventMode::Hybrid => stats.hybrid += 1,
            }
        }

        stats
    }

    /// Count of events in one mode.
    #[must_use]
    pub const fn mode_count(&self, mode: EventMode) -> usize {
        match mode {
            EventMode::Online => self.online,
            EventMode::Offline => self.offline,
            EventMode::Hybrid => self.hybrid,
        }
    }
}

/// The admin "most viewed" panel.
#[must_use]
pub fn most_viewed(events: &[Event]) -> Vec<&Event> {
    top_by_views(events, ADMIN_TOP_VIEWED)
}

/// A browse category with its own filter preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Everything
    #[default]
    All,
    /// Browse by hosting platform
    Platforms,
    /// Upcoming this week
    Dates,
    /// In-person events
    Places,
    /// Trending flag set
    Trending,
    /// Popular flag set
    Popular,
}

impl Category {
    /// The selectable categories, in display order.
    pub const BROWSABLE: [Self; 5] = [
        Self::Platforms,
        Self::Dates,
        Self::Places,
        Self::Trending,
        Self::Popular,
    ];

    /// Filter spec the category applies when selected.
    #[must_use]
    pub fn preset(self) -> FilterSpec {
        match self {
            Self::Dates => FilterSpec::default().with_date(DateBucket::Week),
            Self::Places => FilterSpec::default().with_mode(EventMode::Offline),
            Self::All | Self::Platforms | Self::Trending | Self::Popular => FilterSpec::default(),
        }
    }

    /// Events shown for this category under `spec`.
    ///
    /// Trending and popular narrow by flag after the filter applies.
    #[must_use]
    pub fn select<'a>(
        self,
        events: &'a [Event],
        spec: &FilterSpec,
        now: DateTime<FixedOffset>,
    ) -> Vec<&'a Event> {
        let visible = filter(events, spec, now);
        match self {
            Self::Trending => trending(visible),
            Self::Popular => popular(visible),
            Self::All | Self::Platforms | Self::Dates | Self::Places => visible,
        }
    }

    /// Badge count shown on the category card.
    #[must_use]
    pub const fn count(self, stats: &CatalogStats) -> usize {
        match self {
            Self::Platforms => stats.total_platforms,
            Self::All | Self::Dates => stats.total_events,
            Self::Places => stats.located,
            Self::Trending => stats.trending,
            Self::Popular => stats.popular,
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Platforms => "platforms",
            Self::Dates => "dates",
            Self::Places => "places",
            Self::Trending => "trending",
            Self::Popular => "popular",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::All]
            .into_iter()
            .chain(Self::BROWSABLE)
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("unknown category `{s}`"))
    }
}
