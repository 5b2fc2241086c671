//! Tests for the in-memory record store

use std::io::Write;

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;

use crate::error::AnalyticsError;
use crate::filter::{Condition, Predicate, compile};
use crate::model::{Blog, Country, User, ViewEvent};
use crate::plan::{Aggregate, AggregateQuery, SortOrder};
use crate::schema::{Field, FieldValue};
use crate::store::{MemoryStore, RecordStore};
use crate::timerange::Bucket;

fn at(y: i32, m: u32, d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn sample_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_country(Country::new("US", "United States")).unwrap();
    store.insert_country(Country::new("DE", "Germany")).unwrap();
    store.insert_user(User::new("alice")).unwrap();
    store.insert_user(User::new("bob")).unwrap();
    store
        .insert_blog(Blog::new(1, "Learning Rust", "alice").with_country("US"))
        .unwrap();
    store.insert_blog(Blog::new(2, "Cooking", "bob")).unwrap();

    store
        .insert_view(ViewEvent::new(1, 1, at(2024, 1, 5)).with_viewer("bob").with_country("US"))
        .unwrap();
    store
        .insert_view(ViewEvent::new(2, 1, at(2024, 1, 6)).with_country("DE"))
        .unwrap();
    store
        .insert_view(ViewEvent::new(3, 2, at(2024, 2, 1)).with_viewer("alice"))
        .unwrap();
    store
        .insert_view(ViewEvent::new(4, 2, at(2024, 2, 2)).with_viewer("alice").with_country("US"))
        .unwrap();
    store
}

fn ids(store: &MemoryStore, doc: serde_json::Value) -> Vec<i64> {
    store.filter_ids(&compile(Some(&doc)).unwrap()).unwrap()
}

#[test]
fn test_rejects_duplicates() {
    let store = sample_store();
    assert!(matches!(
        store.insert_country(Country::new("US", "Other")),
        Err(AnalyticsError::InvalidReference(_))
    ));
    assert!(store.insert_country(Country::new("XX", "Germany")).is_err());
    assert!(store.insert_user(User::new("alice")).is_err());
    assert!(store.insert_blog(Blog::new(1, "Again", "alice")).is_err());
    assert!(store.insert_view(ViewEvent::new(1, 1, at(2024, 3, 1))).is_err());
    assert_eq!(store.view_count(), 4);
}

#[test]
fn test_rejects_dangling_references() {
    let store = sample_store();
    assert!(store.insert_blog(Blog::new(9, "x", "carol")).is_err());
    assert!(store.insert_blog(Blog::new(9, "x", "alice").with_country("FR")).is_err());
    assert!(store.insert_view(ViewEvent::new(9, 42, at(2024, 3, 1))).is_err());
    assert!(
        store
            .insert_view(ViewEvent::new(9, 1, at(2024, 3, 1)).with_viewer("carol"))
            .is_err()
    );
    assert!(
        store
            .insert_view(ViewEvent::new(9, 1, at(2024, 3, 1)).with_country("FR"))
            .is_err()
    );
}

#[test]
fn test_filter_relations() {
    let store = sample_store();
    assert_eq!(ids(&store, json!({})), vec![1, 2, 3, 4]);
    assert_eq!(ids(&store, json!({"field": "blog__user__id", "eq": "alice"})), vec![1, 2]);
    assert_eq!(ids(&store, json!({"field": "blog.country.name", "eq": "United States"})), vec![1, 2]);
    assert_eq!(ids(&store, json!({"field": "viewer_country__name", "contains": "germ"})), vec![2]);
    assert_eq!(ids(&store, json!({"field": "viewer_user", "eq": null})), vec![2]);
    assert_eq!(ids(&store, json!({"field": "viewer_country", "ne": "US"})), vec![2, 3]);
    assert_eq!(
        ids(&store, json!({"field": "viewed_at", "gte": "2024-02-01"})),
        vec![3, 4]
    );
}

#[test]
fn test_sub_second_timestamp_bounds() {
    let store = sample_store();
    let nine = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    store.insert_view(ViewEvent::new(10, 1, nine)).unwrap();
    store
        .insert_view(ViewEvent::new(11, 1, nine + chrono::Duration::seconds(1)))
        .unwrap();

    assert_eq!(
        ids(&store, json!({"field": "viewed_at", "gte": "2024-03-01T09:00:00.5Z"})),
        vec![11]
    );
    assert_eq!(
        ids(&store, json!({"field": "viewed_at", "lte": "2024-03-01T09:00:00.5Z"})),
        vec![1, 2, 3, 4, 10]
    );
    assert_eq!(
        ids(&store, json!({"field": "viewed_at", "gte": "2024-03-01T09:00:00Z"})),
        vec![10, 11]
    );
}

#[test]
fn test_filter_type_mismatch() {
    let store = sample_store();
    let predicate = compile(Some(&json!({"field": "blog", "in": 1}))).unwrap();
    assert!(matches!(
        store.filter_ids(&predicate),
        Err(AnalyticsError::TypeMismatch { .. })
    ));
}

#[tokio::test]
async fn test_aggregate_bucketed_groups() {
    let store = sample_store();
    let query = AggregateQuery::new(Predicate::All)
        .with_bucket(Bucket::Month)
        .group_by(Field::ViewerCountryCode)
        .aggregate(Aggregate::CountDistinct(Field::BlogId))
        .aggregate(Aggregate::Count);

    let rows = store.aggregate(&query).await.unwrap();
    let jan = NaiveDate::from_ymd_opt(2024, 1, 1);
    let feb = NaiveDate::from_ymd_opt(2024, 2, 1);

    let summary: Vec<_> = rows
        .iter()
        .map(|r| (r.bucket, r.key(0).clone(), r.values.clone()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (jan, FieldValue::from("DE"), vec![1, 1]),
            (jan, FieldValue::from("US"), vec![1, 1]),
            (feb, FieldValue::from("US"), vec![1, 1]),
            (feb, FieldValue::Null, vec![1, 1]),
        ]
    );
}

#[tokio::test]
async fn test_distinct_ignores_nulls() {
    let store = sample_store();
    let query = AggregateQuery::new(Predicate::All)
        .aggregate(Aggregate::CountDistinct(Field::ViewerUser))
        .aggregate(Aggregate::CountDistinct(Field::ViewerCountryCode))
        .aggregate(Aggregate::Count);

    let rows = store.aggregate(&query).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].values, vec![2, 2, 4]);
}

#[tokio::test]
async fn test_aggregate_ranked_with_limit() {
    let store = sample_store();
    let predicate = Predicate::All.with_condition(Condition::is_not_null("viewer_user"));
    let query = AggregateQuery::new(predicate)
        .group_by(Field::ViewerUser)
        .aggregate(Aggregate::Count)
        .with_order(SortOrder::ValueDescending(0))
        .with_limit(1);

    let rows = store.aggregate(&query).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].keys, vec![FieldValue::from("alice")]);
    assert_eq!(rows[0].value(0), 2);
}

#[tokio::test]
async fn test_empty_result() {
    let store = sample_store();
    let predicate = compile(Some(&json!({"field": "blog", "eq": 99}))).unwrap();
    let query = AggregateQuery::new(predicate).aggregate(Aggregate::Count);
    assert!(store.aggregate(&query).await.unwrap().is_empty());
    assert!(store.health_check().await.is_ok());
    assert_eq!(store.name(), "memory");
}

#[test]
fn test_from_json() {
    let store = MemoryStore::from_json(
        r#"{
            "countries": [{"code": "US", "name": "United States"}],
            "users": [{"id": "u1"}],
            "blogs": [{"id": 1, "title": "Hello", "user_id": "u1", "country": "US"}],
            "views": [
                {"id": 1, "blog_id": 1, "viewer_user": "u1", "viewed_at": "2024-01-01T00:00:00Z"},
                {"id": 2, "blog_id": 1, "viewed_at": "2024-01-02T00:00:00Z"}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(store.view_count(), 2);

    let err = MemoryStore::from_json("{\"views\": 3}").unwrap_err();
    assert!(matches!(err, AnalyticsError::Dataset(_)));

    let err = MemoryStore::from_json(r#"{"blogs": [{"id": 1, "title": "x", "user_id": "nobody"}]}"#)
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::InvalidReference(_)));
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"users": [{{"id": "u1"}}], "blogs": [{{"id": 5, "title": "t", "user_id": "u1"}}]}}"#
    )
    .unwrap();

    let store = MemoryStore::from_file(file.path()).unwrap();
    assert_eq!(store.view_count(), 0);

    let err = MemoryStore::from_file("/nonexistent/views.json").unwrap_err();
    assert!(matches!(err, AnalyticsError::Dataset(_)));
}
