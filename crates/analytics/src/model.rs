//! Entities owned by the record store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Country, identified by ISO 3166-1 alpha-2 code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
}

impl Country {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// User, identified by an opaque id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Blog owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    pub id: i64,
    pub title: String,
    /// Owner
    pub user_id: String,
    /// Country code
    #[serde(default)]
    pub country: Option<String>,
}

impl Blog {
    pub fn new(id: i64, title: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            user_id: user_id.into(),
            country: None,
        }
    }

    pub fn with_country(mut self, code: impl Into<String>) -> Self {
        self.country = Some(code.into());
        self
    }
}

/// One view of a blog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEvent {
    pub id: i64,
    pub blog_id: i64,
    /// Viewing user, absent for anonymous views
    #[serde(default)]
    pub viewer_user: Option<String>,
    /// Viewer location, absent when unknown
    #[serde(default)]
    pub viewer_country: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

impl ViewEvent {
    pub fn new(id: i64, blog_id: i64, viewed_at: DateTime<Utc>) -> Self {
        Self {
            id,
            blog_id,
            viewer_user: None,
            viewer_country: None,
            viewed_at,
        }
    }

    pub fn with_viewer(mut self, user_id: impl Into<String>) -> Self {
        self.viewer_user = Some(user_id.into());
        self
    }

    pub fn with_country(mut self, code: impl Into<String>) -> Self {
        self.viewer_country = Some(code.into());
        self
    }
}

/// Dataset document loaded into a memory store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub countries: Vec<Country>,
    pub users: Vec<User>,
    pub blogs: Vec<Blog>,
    pub views: Vec<ViewEvent>,
}
