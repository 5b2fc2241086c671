//! In-memory record store
//!
//! Holds a validated dataset behind a read-write lock. Each query takes one
//! read lock for its whole evaluation, so it sees a consistent snapshot.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::debug;

use crate::bound::BoundPredicate;
use crate::error::{AnalyticsError, Result};
use crate::filter::Predicate;
use crate::model::{Blog, Country, Dataset, User, ViewEvent};
use crate::plan::{Aggregate, AggregateQuery, AggregateRow, sort_rows};
use crate::schema::{Field, FieldValue, Record};
use crate::store::RecordStore;

#[derive(Debug, Default)]
struct Tables {
    countries: HashMap<String, Country>,
    users: HashSet<String>,
    blogs: HashMap<i64, Blog>,
    views: Vec<ViewEvent>,
    view_ids: HashSet<i64>,
}

impl Tables {
    fn record<'a>(&'a self, view: &'a ViewEvent) -> Option<ViewRecord<'a>> {
        let blog = self.blogs.get(&view.blog_id)?;
        Some(ViewRecord {
            view,
            blog,
            blog_country: blog.country.as_ref().and_then(|c| self.countries.get(c)),
            viewer_country: view
                .viewer_country
                .as_ref()
                .and_then(|c| self.countries.get(c)),
        })
    }

    fn matching<'a>(
        &'a self,
        predicate: &'a BoundPredicate,
    ) -> impl Iterator<Item = ViewRecord<'a>> + 'a {
        self.views
            .iter()
            .filter_map(move |view| self.record(view))
            .filter(move |record| predicate.evaluate(record))
    }
}

/// A view joined with its blog and countries
struct ViewRecord<'a> {
    view: &'a ViewEvent,
    blog: &'a Blog,
    blog_country: Option<&'a Country>,
    viewer_country: Option<&'a Country>,
}

impl Record for ViewRecord<'_> {
    fn field(&self, field: Field) -> FieldValue {
        match field {
            Field::ViewId => FieldValue::Integer(self.view.id),
            Field::ViewedAt => FieldValue::Timestamp(self.view.viewed_at),
            Field::BlogId => FieldValue::Integer(self.blog.id),
            Field::BlogTitle => FieldValue::Text(self.blog.title.clone()),
            Field::BlogOwner => FieldValue::Text(self.blog.user_id.clone()),
            Field::BlogCountryCode => self.blog.country.as_deref().into(),
            Field::BlogCountryName => self.blog_country.map(|c| c.name.as_str()).into(),
            Field::ViewerUser => self.view.viewer_user.as_deref().into(),
            Field::ViewerCountryCode => self.view.viewer_country.as_deref().into(),
            Field::ViewerCountryName => self.viewer_country.map(|c| c.name.as_str()).into(),
        }
    }
}

enum Accumulator {
    Count(u64),
    Distinct(HashSet<FieldValue>),
}

impl Accumulator {
    fn new(aggregate: &Aggregate) -> Self {
        match aggregate {
            Aggregate::Count => Self::Count(0),
            Aggregate::CountDistinct(_) => Self::Distinct(HashSet::new()),
        }
    }

    fn add(&mut self, aggregate: &Aggregate, record: &ViewRecord<'_>) {
        match (self, aggregate) {
            (Self::Count(n), _) => *n += 1,
            (Self::Distinct(seen), Aggregate::CountDistinct(field)) => {
                let value = record.field(*field);
                if !value.is_null() {
                    seen.insert(value);
                }
            }
            (Self::Distinct(_), Aggregate::Count) => {}
        }
    }

    fn finish(self) -> u64 {
        match self {
            Self::Count(n) => n,
            Self::Distinct(seen) => seen.len() as u64,
        }
    }
}

/// In-memory record store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a dataset, validating every insert
    pub fn from_dataset(dataset: Dataset) -> Result<Self> {
        let store = Self::new();
        for country in dataset.countries {
            store.insert_country(country)?;
        }
        for user in dataset.users {
            store.insert_user(user)?;
        }
        for blog in dataset.blogs {
            store.insert_blog(blog)?;
        }
        for view in dataset.views {
            store.insert_view(view)?;
        }
        debug!(views = store.view_count(), "loaded dataset");
        Ok(store)
    }

    /// Load a dataset from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(json)
            .map_err(|e| AnalyticsError::Dataset(e.to_string()))?;
        Self::from_dataset(dataset)
    }

    /// Load a dataset from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnalyticsError::Dataset(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn insert_country(&self, country: Country) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.countries.contains_key(&country.code) {
            return Err(AnalyticsError::InvalidReference(format!(
                "duplicate country code: {}",
                country.code
            )));
        }
        if tables.countries.values().any(|c| c.name == country.name) {
            return Err(AnalyticsError::InvalidReference(format!(
                "duplicate country name: {}",
                country.name
            )));
        }
        tables.countries.insert(country.code.clone(), country);
        Ok(())
    }

    pub fn insert_user(&self, user: User) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.users.insert(user.id.clone()) {
            return Err(AnalyticsError::InvalidReference(format!(
                "duplicate user: {}",
                user.id
            )));
        }
        Ok(())
    }

    pub fn insert_blog(&self, blog: Blog) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.blogs.contains_key(&blog.id) {
            return Err(AnalyticsError::InvalidReference(format!(
                "duplicate blog: {}",
                blog.id
            )));
        }
        if !tables.users.contains(&blog.user_id) {
            return Err(AnalyticsError::InvalidReference(format!(
                "blog {} owned by unknown user {}",
                blog.id, blog.user_id
            )));
        }
        if let Some(code) = &blog.country
            && !tables.countries.contains_key(code)
        {
            return Err(AnalyticsError::InvalidReference(format!(
                "blog {} in unknown country {}",
                blog.id, code
            )));
        }
        tables.blogs.insert(blog.id, blog);
        Ok(())
    }

    pub fn insert_view(&self, view: ViewEvent) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.view_ids.contains(&view.id) {
            return Err(AnalyticsError::InvalidReference(format!(
                "duplicate view: {}",
                view.id
            )));
        }
        if !tables.blogs.contains_key(&view.blog_id) {
            return Err(AnalyticsError::InvalidReference(format!(
                "view {} of unknown blog {}",
                view.id, view.blog_id
            )));
        }
        if let Some(user) = &view.viewer_user
            && !tables.users.contains(user)
        {
            return Err(AnalyticsError::InvalidReference(format!(
                "view {} by unknown user {}",
                view.id, user
            )));
        }
        if let Some(code) = &view.viewer_country
            && !tables.countries.contains_key(code)
        {
            return Err(AnalyticsError::InvalidReference(format!(
                "view {} from unknown country {}",
                view.id, code
            )));
        }
        tables.view_ids.insert(view.id);
        tables.views.push(view);
        Ok(())
    }

    /// Number of stored views
    pub fn view_count(&self) -> usize {
        self.tables.read().views.len()
    }

    /// Ids of the views matching a predicate, in insertion order
    pub fn filter_ids(&self, predicate: &Predicate) -> Result<Vec<i64>> {
        let bound = predicate.bind()?;
        let tables = self.tables.read();
        Ok(tables.matching(&bound).map(|r| r.view.id).collect())
    }

    fn run_aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>> {
        let predicate = query.predicate.bind()?;
        let tables = self.tables.read();

        let mut groups: BTreeMap<(Option<NaiveDate>, Vec<FieldValue>), Vec<Accumulator>> =
            BTreeMap::new();

        for record in tables.matching(&predicate) {
            let bucket = query.bucket.map(|b| b.truncate(record.view.viewed_at));
            let keys = query.group_by.iter().map(|f| record.field(*f)).collect();

            let accumulators = groups
                .entry((bucket, keys))
                .or_insert_with(|| query.aggregates.iter().map(Accumulator::new).collect());
            for (acc, aggregate) in accumulators.iter_mut().zip(&query.aggregates) {
                acc.add(aggregate, &record);
            }
        }

        let mut rows: Vec<AggregateRow> = groups
            .into_iter()
            .map(|((bucket, keys), accumulators)| AggregateRow {
                bucket,
                keys,
                values: accumulators.into_iter().map(Accumulator::finish).collect(),
            })
            .collect();

        sort_rows(&mut rows, query.order, query.limit);
        Ok(rows)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>> {
        self.run_aggregate(query)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
