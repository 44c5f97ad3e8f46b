//! Admin drafts: validation and row shaping for event and platform writes,
//! plus the submit workflows that drive an [`AdminBackend`].
//!
//! Access control belongs to the backend. Nothing here decides who may write.

use crate::backend::{AdminBackend, UploadFile};
use crate::error::{BackendError, DraftError};
use crate::model::{Event, EventMode, Platform, RawRecord, Theme};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashSet;

/// Brand color used when an admin does not pick one.
pub const DEFAULT_PLATFORM_COLOR: &str = "#6366f1";

/// An event as entered in the admin form.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    /// Title
    pub title: String,
    /// Card summary
    pub short_description: String,
    /// Full description
    pub description: String,
    /// Start
    pub date: DateTime<Utc>,
    /// Optional end
    pub end_date: Option<DateTime<Utc>>,
    /// Venue; empty means none
    pub location: String,
    /// Mode
    pub mode: EventMode,
    /// Platform id the event is listed under
    pub platform_id: String,
    /// Organizer
    pub organizer: String,
    /// Registration URL
    pub external_link: String,
    /// Theme tags, in order
    pub themes: Vec<Theme>,
    /// Trending flag
    pub is_trending: bool,
    /// Popular flag
    pub is_popular: bool,
    /// College tag; empty means none
    pub college: String,
    /// Images already attached to the event
    pub images: Vec<String>,
}

impl EventDraft {
    /// Start editing an existing event.
    #[must_use]
    pub fn from_event(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            short_description: event.short_description.clone(),
            description: event.description.clone(),
            date: event.date,
            end_date: event.end_date,
            location: event.location.clone().unwrap_or_default(),
            mode: event.mode,
            platform_id: event.platform.id.clone(),
            organizer: event.organizer.clone(),
            external_link: event.external_link.clone(),
            themes: event.theme.clone(),
            is_trending: event.is_trending,
            is_popular: event.is_popular,
            college: event.college.clone().unwrap_or_default(),
            images: event.images.clone(),
        }
    }

    /// Add a theme unless it is blank or already present.
    pub fn add_theme(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }
        let theme = Theme::from(tag);
        if !self.themes.contains(&theme) {
            self.themes.push(theme);
        }
    }

    /// Remove a theme.
    pub fn remove_theme(&mut self, theme: &Theme) {
        self.themes.retain(|t| t != theme);
    }

    /// Check the draft before writing.
    ///
    /// # Errors
    ///
    /// - [`DraftError::Required`] for an empty title, platform, organizer or link
    /// - [`DraftError::NoThemes`] / [`DraftError::DuplicateTheme`]
    /// - [`DraftError::EndBeforeStart`]
    pub fn validate(&self) -> Result<(), DraftError> {
        for (field, value) in [
            ("title", &self.title),
            ("platform_id", &self.platform_id),
            ("organizer", &self.organizer),
            ("external_link", &self.external_link),
        ] {
            if value.trim().is_empty() {
                return Err(DraftError::Required(field));
            }
        }

        if self.themes.is_empty() {
            return Err(DraftError::NoThemes);
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.themes.iter().find(|t| !seen.insert(*t)) {
            return Err(DraftError::DuplicateTheme(dup.to_string()));
        }

        if self.end_date.is_some_and(|end| end < self.date) {
            return Err(DraftError::EndBeforeStart);
        }

        Ok(())
    }

    /// The `events` table columns. Empty optionals become `null`.
    #[must_use]
    pub fn to_row(&self) -> RawRecord {
        json!({
            "title": self.title,
            "short_description": self.short_description,
            "description": self.description,
            "date": self.date.to_rfc3339(),
            "end_date": self.end_date.map(|end| end.to_rfc3339()),
            "location": non_empty(&self.location),
            "mode": self.mode.as_str(),
            "platform_id": self.platform_id,
            "organizer": self.organizer,
            "external_link": self.external_link,
            "theme": self.themes,
            "is_trending": self.is_trending,
            "is_popular": self.is_popular,
            "college": non_empty(&self.college),
            "images": self.images,
        })
    }
}

/// A platform as entered in the admin form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDraft {
    /// Fixed id when editing; derived from the name when creating
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Logo URL
    pub logo: String,
    /// Brand color
    pub color: String,
}

impl PlatformDraft {
    /// A new platform with the default color.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            logo: String::new(),
            color: DEFAULT_PLATFORM_COLOR.to_string(),
        }
    }

    /// Start editing an existing platform. Its id cannot change.
    #[must_use]
    pub fn from_platform(platform: &Platform) -> Self {
        let color = if platform.color.is_empty() {
            DEFAULT_PLATFORM_COLOR.to_string()
        } else {
            platform.color.clone()
        };
        Self {
            id: Some(platform.id.clone()),
            name: platform.name.clone(),
            logo: platform.logo.clone(),
            color,
        }
    }

    /// The id this draft writes to.
    #[must_use]
    pub fn resolved_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| platform_slug(&self.name))
    }

    /// Check the draft before writing.
    ///
    /// # Errors
    ///
    /// [`DraftError::Required`] for an empty name or color,
    /// [`DraftError::InvalidSlug`] if the name yields an empty id.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.name.trim().is_empty() {
            return Err(DraftError::Required("name"));
        }
        if self.color.trim().is_empty() {
            return Err(DraftError::Required("color"));
        }
        if self.resolved_id().is_empty() {
            return Err(DraftError::InvalidSlug(self.name.clone()));
        }
        Ok(())
    }

    /// The `platforms` table columns.
    #[must_use]
    pub fn to_row(&self) -> RawRecord {
        json!({
            "id": self.resolved_id(),
            "name": self.name,
            "logo": self.logo,
            "color": self.color,
        })
    }
}

/// Platform id derived from a display name: lowercase, whitespace runs become `-`.
///
/// ```
/// use techevents_catalog::drafts::platform_slug;
///
/// assert_eq!(platform_slug("  Hacker  Earth "), "hacker-earth");
/// ```
#[must_use]
pub fn platform_slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Failure of an admin submit workflow.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AdminError {
    /// The draft is invalid; nothing was written.
    #[error(transparent)]
    Draft(#[from] DraftError),

    /// A backend write or upload failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Create or update an event, then upload and attach new images.
///
/// Creating inserts first to obtain the id the images are stored under.
/// Updating appends the new image URLs to the existing ones.
///
/// # Errors
///
/// Returns [`AdminError::Draft`] before any write if the draft is invalid, or
/// [`AdminError::Backend`] for the first failing backend call.
#[tracing::instrument(skip(admin, draft, files), fields(files = files.len()))]
pub async fn submit_event(
    admin: &dyn AdminBackend,
    existing_id: Option<&str>,
    draft: &EventDraft,
    files: Vec<UploadFile>,
) -> Result<String, AdminError> {
    draft.validate()?;

    let id = admin.save_event(existing_id, draft.to_row()).await?;

    if !files.is_empty() {
        let uploaded = admin.upload_images(&id, files).await?;
        let mut images = draft.images.clone();
        images.extend(uploaded);
        admin.set_event_images(&id, images).await?;
    }

    tracing::info!(event_id = %id, updated = existing_id.is_some(), "Event saved");
    Ok(id)
}

/// Create or update a platform, uploading its logo first when one is given.
///
/// # Errors
///
/// Same as [`submit_event`].
#[tracing::instrument(skip(admin, draft, logo))]
pub async fn submit_platform(
    admin: &dyn AdminBackend,
    mut draft: PlatformDraft,
    logo: Option<UploadFile>,
) -> Result<Platform, AdminError> {
    draft.validate()?;
    let id = draft.resolved_id();
    let update = draft.id.is_some();

    if let Some(file) = logo {
        draft.logo = admin.upload_logo(&id, file).await?;
    }

    admin.save_platform(draft.to_row(), update).await?;

    tracing::info!(platform_id = %id, updated = update, "Platform saved");
    Ok(Platform {
        id,
        name: draft.name,
        logo: draft.logo,
        color: draft.color,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Literal timestamps
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> EventDraft {
        EventDraft {
            title: "Open Source Sprint".to_string(),
            short_description: "Weekend sprint".to_string(),
            description: String::new(),
            date: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
            end_date: Some(Utc.with_ymd_and_hms(2024, 6, 2, 18, 0, 0).unwrap()),
            location: "  ".to_string(),
            mode: EventMode::Online,
            platform_id: "github".to_string(),
            organizer: "GitHub".to_string(),
            external_link: "https://github.com/sprint".to_string(),
            themes: vec![Theme::OpenSource],
            is_trending: false,
            is_popular: true,
            college: String::new(),
            images: Vec::new(),
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert_eq!(draft().validate(), Ok(()));
    }

    #[test]
    fn required_fields_are_checked() {
        let mut d = draft();
        d.organizer = " ".to_string();
        assert_eq!(d.validate(), Err(DraftError::Required("organizer")));

        let mut d = draft();
        d.themes.clear();
        assert_eq!(d.validate(), Err(DraftError::NoThemes));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut d = draft();
        d.end_date = Some(d.date - chrono::Duration::hours(1));
        assert_eq!(d.validate(), Err(DraftError::EndBeforeStart));
    }

    #[test]
    fn duplicate_themes_are_rejected() {
        let mut d = draft();
        d.themes.push(Theme::OpenSource);
        assert_eq!(
            d.validate(),
            Err(DraftError::DuplicateTheme("Open Source".to_string()))
        );
    }

    #[test]
    fn add_theme_skips_blanks_and_duplicates() {
        let mut d = draft();
        d.add_theme("Open Source");
        d.add_theme("   ");
        d.add_theme("Rust");
        assert_eq!(
            d.themes,
            vec![Theme::OpenSource, Theme::Other("Rust".to_string())]
        );
        d.remove_theme(&Theme::OpenSource);
        assert_eq!(d.themes.len(), 1);
    }

    #[test]
    fn row_uses_nulls_for_empty_optionals() {
        let row = draft().to_row();
        assert_eq!(row["location"], serde_json::Value::Null);
        assert_eq!(row["college"], serde_json::Value::Null);
        assert_eq!(row["mode"], "Online");
        assert_eq!(row["theme"], json!(["Open Source"]));
        assert_eq!(row["end_date"], "2024-06-02T18:00:00+00:00");
    }

    #[test]
    fn platform_draft_defaults_and_slug() {
        let d = PlatformDraft::new("Major League Hacking");
        assert_eq!(d.color, DEFAULT_PLATFORM_COLOR);
        assert_eq!(d.resolved_id(), "major-league-hacking");
        assert_eq!(d.to_row()["id"], "major-league-hacking");

        assert_eq!(
            PlatformDraft::new("   ").validate(),
            Err(DraftError::Required("name"))
        );
    }

    #[test]
    fn editing_keeps_platform_id() {
        let existing = Platform {
            id: "hackerearth".to_string(),
            name: "HackerEarth".to_string(),
            logo: String::new(),
            color: String::new(),
        };
        let mut d = PlatformDraft::from_platform(&existing);
        d.name = "HackerEarth Pro".to_string();

        assert_eq!(d.resolved_id(), "hackerearth");
        assert_eq!(d.color, DEFAULT_PLATFORM_COLOR);
    }
}
