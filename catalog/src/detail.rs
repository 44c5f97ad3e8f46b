//! Single-event detail load.

use crate::backend::CatalogBackend;
use crate::error::DetailError;
use crate::mapper::map_event;
use crate::model::Event;

/// Fetch and map one event, then count the view.
///
/// The returned event carries the view count as read, before the increment.
/// A failed increment is logged and does not fail the load.
///
/// # Errors
///
/// - [`DetailError::NotFound`] if no event has this id
/// - [`DetailError::Backend`] if the query fails
/// - [`DetailError::Malformed`] if the row does not map
#[tracing::instrument(skip(backend))]
pub async fn load_event_detail(backend: &dyn CatalogBackend, id: &str) -> Result<Event, DetailError> {
    let row = backend
        .fetch_event(id)
        .await?
        .ok_or_else(|| DetailError::NotFound(id.to_string()))?;
    let event = map_event(&row)?;

    if let Err(error) = backend.record_view(id).await {
        tracing::warn!(%error, "Failed to record event view");
    }

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MalformedRecordError;
    use crate::mocks::InMemoryBackend;
    use serde_json::{Value, json};

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new()
            .with_platform(json!({ "id": "mlh", "name": "MLH", "logo": "", "color": "#E73427" }))
            .with_event(json!({
                "id": "hack-1",
                "title": "Local Hack Day",
                "date": "2025-02-01T09:00:00Z",
                "created_at": "2025-01-01T00:00:00Z",
                "mode": "Online",
                "theme": ["Open Innovation"],
                "view_count": 41,
                "platform_id": "mlh"
            }))
    }

    #[tokio::test]
    async fn loads_and_counts_view() {
        let backend = backend();

        let event = load_event_detail(&backend, "hack-1").await;
        let Ok(event) = event else {
            unreachable!("seeded event loads: {event:?}");
        };
        assert_eq!(event.title, "Local Hack Day");
        assert_eq!(event.platform.name, "MLH");
        assert_eq!(event.view_count, 41);

        let stored = backend.event_row("hack-1").and_then(|row| row.get("view_count").cloned());
        assert_eq!(stored, Some(Value::from(42)));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let result = load_event_detail(&backend(), "nope").await;
        assert_eq!(result, Err(DetailError::NotFound("nope".to_string())));
    }

    #[tokio::test]
    async fn dangling_platform_is_malformed() {
        let backend = backend().with_event(json!({
            "id": "orphan",
            "title": "Orphan",
            "date": "2025-02-01",
            "created_at": "2025-01-01",
            "mode": "Offline",
            "theme": [],
            "platform_id": "gone"
        }));

        let result = load_event_detail(&backend, "orphan").await;
        assert!(matches!(
            result,
            Err(DetailError::Malformed(MalformedRecordError::MissingField { .. }))
        ));
    }
}
