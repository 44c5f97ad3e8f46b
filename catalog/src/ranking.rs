//! Ranking and partitioning by view count and admin flags.

use crate::model::Event;

/// How many events the "top viewed" section shows by default.
pub const DEFAULT_TOP_VIEWED: usize = 6;

/// The `n` most viewed events, highest first.
///
/// Ties keep their input order. Returns everything when there are fewer than
/// `n` events. The input is not reordered.
#[must_use]
pub fn top_by_views<'a>(events: impl IntoIterator<Item = &'a Event>, n: usize) -> Vec<&'a Event> {
    let mut ranked: Vec<&Event> = events.into_iter().collect();
    ranked.sort_by(|a, b| b.view_count.cmp(&a.view_count));
    ranked.truncate(n);
    ranked
}

/// Events flagged trending, in input order.
#[must_use]
pub fn trending<'a>(events: impl IntoIterator<Item = &'a Event>) -> Vec<&'a Event> {
    events.into_iter().filter(|e| e.is_trending).collect()
}

/// Events flagged popular, in input order.
#[must_use]
pub fn popular<'a>(events: impl IntoIterator<Item = &'a Event>) -> Vec<&'a Event> {
    events.into_iter().filter(|e| e.is_popular).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::map_event;
    use serde_json::json;

    fn ranked(id: &str, views: u64, trending: bool, popular: bool) -> Event {
        let row = json!({
            "id": id,
            "title": id,
            "date": "2024-05-01",
            "created_at": "2024-04-01",
            "mode": "Online",
            "theme": ["AI"],
            "view_count": views,
            "is_trending": trending,
            "is_popular": popular,
            "platform": { "id": "devpost" }
        });
        match map_event(&row) {
            Ok(event) => event,
            Err(e) => unreachable!("fixture row is valid: {e}"),
        }
    }

    fn views(events: &[&Event]) -> Vec<u64> {
        events.iter().map(|e| e.view_count).collect()
    }

    #[test]
    fn top_two_of_three() {
        let events = vec![
            ranked("a", 100, false, false),
            ranked("b", 500, false, false),
            ranked("c", 50, false, false),
        ];

        assert_eq!(views(&top_by_views(&events, 2)), vec![500, 100]);
        // input untouched
        assert_eq!(events[0].id, "a");
    }

    #[test]
    fn fewer_than_n_returns_all() {
        let events = vec![ranked("a", 1, false, false), ranked("b", 2, false, false)];
        assert_eq!(top_by_views(&events, DEFAULT_TOP_VIEWED).len(), 2);
        assert!(top_by_views(&events, 0).is_empty());
    }

    #[test]
    fn ties_keep_input_order() {
        let events = vec![
            ranked("first", 10, false, false),
            ranked("second", 10, false, false),
            ranked("top", 20, false, false),
        ];

        let ids: Vec<_> = top_by_views(&events, 3).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["top", "first", "second"]);
    }

    #[test]
    fn flags_partition_independently() {
        let events = vec![
            ranked("both", 0, true, true),
            ranked("trend", 0, true, false),
            ranked("pop", 0, false, true),
            ranked("none", 0, false, false),
        ];

        let trend: Vec<_> = trending(&events).iter().map(|e| e.id.as_str()).collect();
        let pop: Vec<_> = popular(&events).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(trend, vec!["both", "trend"]);
        assert_eq!(pop, vec!["both", "pop"]);
    }
}
