//! Property tests for filtering and ranking.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use proptest::prelude::*;
use techevents_catalog::{
    DateBucket, Event, EventMode, FilterSpec, Platform, Selection, Theme, filter, top_by_views,
};

const PLATFORMS: [&str; 3] = ["devfolio", "unstop", "mlh"];

fn now() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(19_800)
        .unwrap()
        .with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
        .unwrap()
}

fn arb_mode() -> impl Strategy<Value = EventMode> {
    prop::sample::select(EventMode::ALL.to_vec())
}

fn arb_theme() -> impl Strategy<Value = Theme> {
    prop_oneof![
        4 => prop::sample::select(Theme::KNOWN.to_vec()),
        1 => "[A-Z][a-z]{2,8}".prop_map(Theme::from),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    (
        "[a-z0-9]{1,8}",
        prop::sample::select(PLATFORMS.to_vec()),
        prop::collection::vec(arb_theme(), 0..4),
        -60i64..60,
        arb_mode(),
        0u64..10_000,
        any::<(bool, bool)>(),
    )
        .prop_map(|(id, platform, theme, offset_hours, mode, views, (trending, popular))| {
            let base = Utc.with_ymd_and_hms(2025, 1, 1, 6, 30, 0).unwrap();
            Event {
                id,
                title: "Event".to_string(),
                short_description: String::new(),
                description: String::new(),
                platform: Platform {
                    id: platform.to_string(),
                    name: platform.to_string(),
                    logo: String::new(),
                    color: String::new(),
                },
                theme,
                date: base + Duration::hours(offset_hours * 12),
                end_date: None,
                organizer: String::new(),
                location: None,
                mode,
                images: Vec::new(),
                external_link: String::new(),
                is_trending: trending,
                is_popular: popular,
                view_count: views,
                created_at: base,
                college: None,
            }
        })
}

fn arb_selection<T: Clone + std::fmt::Debug + 'static>(
    values: impl Strategy<Value = T> + 'static,
) -> impl Strategy<Value = Selection<T>> {
    prop_oneof![Just(Selection::All), values.prop_map(Selection::Only)]
}

fn arb_spec() -> impl Strategy<Value = FilterSpec> {
    (
        arb_selection(arb_theme()),
        arb_selection(prop::sample::select(PLATFORMS.to_vec()).prop_map(str::to_string)),
        prop::sample::select(vec![
            DateBucket::All,
            DateBucket::Today,
            DateBucket::Week,
            DateBucket::Month,
        ]),
        arb_selection(arb_mode()),
    )
        .prop_map(|(theme, platform, date, mode)| FilterSpec {
            theme,
            platform,
            date,
            mode,
        })
}

fn ids<'a>(events: impl IntoIterator<Item = &'a Event>) -> Vec<&'a str> {
    events.into_iter().map(|e| e.id.as_str()).collect()
}

proptest! {
    #[test]
    fn filter_is_an_ordered_subsequence(
        events in prop::collection::vec(arb_event(), 0..40),
        spec in arb_spec(),
    ) {
        let kept = filter(&events, &spec, now());

        // every kept element is a distinct input element, in input order
        let mut cursor = events.iter();
        for event in &kept {
            prop_assert!(cursor.any(|candidate| std::ptr::eq(candidate, *event)));
        }
    }

    #[test]
    fn filter_is_idempotent(
        events in prop::collection::vec(arb_event(), 0..40),
        spec in arb_spec(),
    ) {
        let once: Vec<Event> = filter(&events, &spec, now()).into_iter().cloned().collect();
        let twice = filter(&once, &spec, now());
        prop_assert_eq!(ids(&once), ids(twice));
    }

    #[test]
    fn wildcard_spec_is_identity(events in prop::collection::vec(arb_event(), 0..40)) {
        let kept = filter(&events, &FilterSpec::default(), now());
        prop_assert_eq!(kept.len(), events.len());
        prop_assert_eq!(ids(kept), ids(&events));
    }

    #[test]
    fn singleton_matches_independent_predicates(event in arb_event(), spec in arb_spec()) {
        let theme = match &spec.theme {
            Selection::All => true,
            Selection::Only(theme) => event.theme.contains(theme),
        };
        let expected = theme
            && spec.platform.accepts(&event.platform.id)
            && spec.mode.accepts(&event.mode)
            && spec.date.contains(event.date, now());

        let kept = filter(std::slice::from_ref(&event), &spec, now());
        prop_assert_eq!(kept.len() == 1, expected);
    }

    #[test]
    fn top_by_views_is_sorted_prefix(
        events in prop::collection::vec(arb_event(), 0..40),
        n in 0usize..12,
    ) {
        let before = ids(&events).into_iter().map(str::to_string).collect::<Vec<_>>();
        let top = top_by_views(&events, n);

        prop_assert_eq!(top.len(), n.min(events.len()));
        prop_assert!(top.windows(2).all(|w| w[0].view_count >= w[1].view_count));
        for event in &top {
            prop_assert!(events.iter().any(|candidate| std::ptr::eq(candidate, *event)));
        }
        // nothing left out outranks the last kept element
        if let Some(last) = top.last() {
            let excluded = events
                .iter()
                .filter(|e| !top.iter().any(|t| std::ptr::eq(*t, *e)));
            for event in excluded {
                prop_assert!(event.view_count <= last.view_count);
            }
        }
        prop_assert_eq!(ids(&events), before.iter().map(String::as_str).collect::<Vec<_>>());
    }
}

#[test]
fn scenario_mode_filter_keeps_only_online() {
    let hybrid = sample("1", "2024-03-15T00:00:00Z", EventMode::Hybrid, "AI");
    let online = sample("2", "2024-03-22T00:00:00Z", EventMode::Online, "Web3");

    let events = vec![hybrid, online];
    let spec = FilterSpec::default().with_mode(EventMode::Online);

    assert_eq!(ids(filter(&events, &spec, now())), vec!["2"]);
}

fn sample(id: &str, date: &str, mode: EventMode, theme: &str) -> Event {
    Event {
        id: id.to_string(),
        title: id.to_string(),
        short_description: String::new(),
        description: String::new(),
        platform: Platform {
            id: "unstop".to_string(),
            name: "Unstop".to_string(),
            logo: String::new(),
            color: String::new(),
        },
        theme: vec![Theme::from(theme)],
        date: date.parse().unwrap(),
        end_date: None,
        organizer: String::new(),
        location: None,
        mode,
        images: Vec::new(),
        external_link: String::new(),
        is_trending: false,
        is_popular: false,
        view_count: 0,
        created_at: date.parse().unwrap(),
        college: None,
    }
}
