//! Selector behavior against the in-memory store

use std::sync::Arc;

use blogstat_analytics::{
    AnalyticsError, Blog, CompareType, Country, MemoryStore, MetricRow, MetricValue,
    MetricsEngine, ObjectType, RangeType, TopType, User, ViewEvent,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn engine(store: MemoryStore) -> MetricsEngine {
    MetricsEngine::new(Arc::new(store))
}

/// 3 blogs, 5 views from 2 countries plus one anonymous-location view, all in March 2024
fn march_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_country(Country::new("US", "United States")).unwrap();
    store.insert_country(Country::new("FR", "France")).unwrap();
    for user in ["ann", "ben", "cid"] {
        store.insert_user(User::new(user)).unwrap();
    }
    store.insert_blog(Blog::new(1, "Rust tips", "ann")).unwrap();
    store.insert_blog(Blog::new(2, "Baking", "ben")).unwrap();
    store.insert_blog(Blog::new(3, "Rust async", "ann")).unwrap();

    let views = [
        ViewEvent::new(1, 1, ts(2024, 3, 1, 9)).with_viewer("ben").with_country("US"),
        ViewEvent::new(2, 2, ts(2024, 3, 2, 9)).with_viewer("cid").with_country("US"),
        ViewEvent::new(3, 1, ts(2024, 3, 3, 9)).with_viewer("cid").with_country("US"),
        ViewEvent::new(4, 3, ts(2024, 3, 4, 9)).with_viewer("ben").with_country("FR"),
        ViewEvent::new(5, 3, ts(2024, 3, 5, 9)).with_country("FR"),
    ];
    for view in views {
        store.insert_view(view).unwrap();
    }
    store
}

#[tokio::test]
async fn test_grouped_by_country_one_month() {
    let engine = engine(march_store());
    let rows = engine
        .blog_views_get_grouped_metrics(ObjectType::Country, RangeType::Month, None)
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            MetricRow::new("FR", 1, 2u64),
            MetricRow::new("US", 2, 3u64),
        ]
    );
    let total: u64 = rows.iter().filter_map(|r| r.z.as_count()).sum();
    assert_eq!(total, 5);
}

#[tokio::test]
async fn test_unknown_country_grouped_but_not_ranked() {
    let store = march_store();
    store
        .insert_view(ViewEvent::new(6, 2, ts(2024, 3, 6, 9)).with_viewer("ann"))
        .unwrap();
    let engine = engine(store);

    let grouped = engine
        .blog_views_get_grouped_metrics(ObjectType::Country, RangeType::Month, None)
        .await
        .unwrap();
    assert_eq!(grouped.last().unwrap().x, MetricValue::from("Unknown"));
    assert_eq!(grouped.last().unwrap().z, MetricValue::Count(1));

    let ranked = engine
        .top_get_ranked(TopType::Country, None, None, None)
        .await
        .unwrap();
    assert_eq!(ranked.len(), 2);
    let ranked_views: u64 = ranked.iter().map(|r| r.y).sum();
    assert_eq!(ranked_views, 5);
}

#[tokio::test]
async fn test_grouped_by_user_week() {
    let engine = engine(march_store());
    let rows = engine
        .blog_views_get_grouped_metrics(ObjectType::User, RangeType::Week, None)
        .await
        .unwrap();

    // 2024-03-01..03 fall in the week of Feb 26, 03-04..05 in the week of Mar 4
    let labels: Vec<String> = rows.iter().map(|r| r.x.to_string()).collect();
    assert_eq!(labels, vec!["ben", "cid", "ben", "Unknown"]);
}

#[tokio::test]
async fn test_top_returns_ten_highest() {
    let store = MemoryStore::new();
    store.insert_user(User::new("owner")).unwrap();
    store.insert_blog(Blog::new(1, "Popular", "owner")).unwrap();

    let mut view_id = 0;
    for i in 1..=15 {
        let user = format!("user{:02}", i);
        store.insert_user(User::new(user.clone())).unwrap();
        for _ in 0..i {
            view_id += 1;
            store
                .insert_view(ViewEvent::new(view_id, 1, ts(2024, 1, 1, 0)).with_viewer(user.clone()))
                .unwrap();
        }
    }

    let rows = engine(store)
        .top_get_ranked(TopType::User, None, None, None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 10);
    let counts: Vec<u64> = rows.iter().map(|r| r.y).collect();
    assert_eq!(counts, (6..=15).rev().collect::<Vec<u64>>());
    assert!(rows.iter().all(|r| r.x == MetricValue::Count(1)));
}

#[tokio::test]
async fn test_top_blog_metrics() {
    let rows = engine(march_store())
        .top_get_ranked(TopType::Blog, None, None, None)
        .await
        .unwrap();

    // blog 1: 2 views (ben, cid; US); blog 3: 2 views (ben; FR); blog 2: 1 view
    assert_eq!(
        rows,
        vec![
            MetricRow::new(2u64, 2, 1u64),
            MetricRow::new(1u64, 2, 1u64),
            MetricRow::new(1u64, 1, 1u64),
        ]
    );
}

#[tokio::test]
async fn test_top_user_metrics() {
    let rows = engine(march_store())
        .top_get_ranked(TopType::User, None, None, None)
        .await
        .unwrap();

    // ben: blogs 1 and 3 from US and FR; cid: blogs 2 and 1 from US
    assert_eq!(
        rows,
        vec![MetricRow::new(2u64, 2, 2u64), MetricRow::new(2u64, 2, 1u64)]
    );
}

#[tokio::test]
async fn test_bare_dates_cover_whole_days() {
    let engine = engine(march_store());

    let bare = engine
        .top_get_ranked(TopType::Country, Some("2024-03-02"), Some("2024-03-04"), None)
        .await
        .unwrap();
    let explicit = engine
        .top_get_ranked(
            TopType::Country,
            Some("2024-03-02T00:00:00Z"),
            Some("2024-03-04T23:59:59Z"),
            None,
        )
        .await
        .unwrap();

    assert_eq!(bare, explicit);
    let views: u64 = bare.iter().map(|r| r.y).sum();
    assert_eq!(views, 3);
}

#[tokio::test]
async fn test_invalid_date_rejected() {
    let err = engine(march_store())
        .top_get_ranked(TopType::User, Some("March 1st"), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::InvalidTimeRange(_)));
}

#[tokio::test]
async fn test_growth_by_day_for_owner() {
    let rows = engine(march_store())
        .performance_get_time_series(CompareType::Day, Some("ann"), None)
        .await
        .unwrap();

    let labels: Vec<String> = rows.iter().map(|r| r.x.to_string()).collect();
    assert_eq!(
        labels,
        vec![
            "2024-03-01 (1 blogs)",
            "2024-03-03 (1 blogs)",
            "2024-03-04 (1 blogs)",
            "2024-03-05 (1 blogs)",
        ]
    );
    assert!(rows.iter().all(|r| r.z == MetricValue::Percent(0.0)));
}

#[tokio::test]
async fn test_growth_percentages() {
    let store = march_store();
    for (id, day) in [(10, 1), (11, 2), (12, 3)] {
        store
            .insert_view(ViewEvent::new(id, 2, ts(2024, 4, day, 9)))
            .unwrap();
    }
    store
        .insert_view(ViewEvent::new(13, 2, ts(2024, 5, 1, 9)))
        .unwrap();

    let rows = engine(store)
        .performance_get_time_series(CompareType::Month, Some(""), None)
        .await
        .unwrap();

    let summary: Vec<(String, u64, f64)> = rows
        .iter()
        .map(|r| (r.x.to_string(), r.y, r.z.as_percent().unwrap()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("2024-03 (3 blogs)".to_string(), 5, 0.0),
            ("2024-04 (1 blogs)".to_string(), 3, -40.0),
            ("2024-05 (1 blogs)".to_string(), 1, -66.67),
        ]
    );
}

#[tokio::test]
async fn test_filters_apply_to_selectors() {
    let engine = engine(march_store());
    let filters = json!({"field": "blog__title", "contains": "RUST"});

    let rows = engine
        .blog_views_get_grouped_metrics(ObjectType::Country, RangeType::Year, Some(&filters))
        .await
        .unwrap();
    assert_eq!(
        rows,
        vec![MetricRow::new("FR", 1, 2u64), MetricRow::new("US", 1, 2u64)]
    );
}

#[tokio::test]
async fn test_filter_errors_propagate() {
    let engine = engine(march_store());

    let unknown = json!({"field": "blog__secret", "eq": 1});
    let err = engine
        .performance_get_time_series(CompareType::Day, None, Some(&unknown))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::InvalidField(_)));

    let scalar_in = json!({"field": "viewer_country", "in": "US"});
    let err = engine
        .top_get_ranked(TopType::Blog, None, None, Some(&scalar_in))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::TypeMismatch { .. }));
}

#[tokio::test]
async fn test_empty_store_yields_no_rows() {
    let engine = engine(MemoryStore::new());
    let rows = engine
        .performance_get_time_series(CompareType::Week, None, None)
        .await
        .unwrap();
    assert!(rows.is_empty());
}
