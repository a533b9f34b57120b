//! # facematch record source (`records`)
//!
//! Candidate photos live in a document store under
//! `groups/{group_id}/photos`; each document carries the picture's URL in its
//! `photoURL` field. This crate hides the store behind [`RecordSource`] so the
//! matching pipeline only ever sees a list of URLs.
//!
//! - [`FirestoreClient`] talks to Cloud Firestore over its REST API, using a
//!   service-account key (file or individual fields) or a local emulator.
//! - [`StaticRecordSource`] serves fixed lists from memory; tests and demos use it.
//!
//! Documents without a usable `photoURL` show up as `None` entries rather
//! than being dropped, so callers decide what to do with them.

pub mod config;
pub mod credentials;
pub mod error;
pub mod firestore;

mod token;

use std::collections::HashMap;

use async_trait::async_trait;

pub use crate::config::FirestoreConfig;
pub use crate::credentials::{resolve_credentials, ServiceAccountKey};
pub use crate::error::{CredentialsError, RecordsError};
pub use crate::firestore::{Document, FirestoreClient};

/// Field holding the photo URL in each record.
pub const PHOTO_URL_FIELD: &str = "photoURL";

/// Source of candidate photo URLs for a group.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// URLs of every photo record in `group_id`, in store order. Records
    /// lacking a URL yield `None`.
    async fn list_photo_urls(&self, group_id: &str) -> Result<Vec<Option<String>>, RecordsError>;
}

/// Collection path of a group's photos.
///
/// Group ids are a single path segment: empty ids, ids containing `/`, and the
/// relative segments `.` and `..` are rejected. Other characters are kept as is
/// and escaped when the request URL is built.
pub fn photos_path(group_id: &str) -> Result<String, RecordsError> {
    if group_id.trim().is_empty() || group_id.contains('/') || matches!(group_id, "." | "..") {
        return Err(RecordsError::InvalidGroupId(group_id.to_string()));
    }
    Ok(format!("groups/{group_id}/photos"))
}

/// In-memory record source. Unknown groups are empty.
#[derive(Debug, Default, Clone)]
pub struct StaticRecordSource {
    groups: HashMap<String, Vec<Option<String>>>,
}

impl StaticRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group<I, S>(mut self, group_id: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.groups.insert(
            group_id.into(),
            urls.into_iter().map(|u| u.map(Into::into)).collect(),
        );
        self
    }
}

#[async_trait]
impl RecordSource for StaticRecordSource {
    async fn list_photo_urls(&self, group_id: &str) -> Result<Vec<Option<String>>, RecordsError> {
        photos_path(group_id)?;
        Ok(self.groups.get(group_id).cloned().unwrap_or_default())
    }
}
