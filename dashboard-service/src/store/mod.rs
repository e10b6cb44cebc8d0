//! Document store seam.
//!
//! [`DocumentStore`] is the only suspending boundary of the crate. The
//! production implementation talks to MongoDB; [`InMemoryStore`] evaluates
//! the same pipeline values in process.

mod evaluate;
pub mod memory;
pub mod mongo;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

use crate::query::{Pipeline, SortOrder};
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("Pipeline rejected: {0}")]
    Rejected(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Which fields a plain find returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Every stored field except `_id`.
    WithoutId,
    /// Only the listed fields, never `_id`.
    Only(Vec<String>),
}

impl Projection {
    pub fn to_document(&self) -> Document {
        match self {
            Projection::WithoutId => doc! { "_id": 0 },
            Projection::Only(fields) => {
                let mut projection = Document::new();
                for field in fields {
                    projection.insert(field.as_str(), 1);
                }
                projection.insert("_id", 0);
                projection
            }
        }
    }
}

/// A non-aggregation read: optional equality filter, projection and sort.
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub filter: Option<(String, Bson)>,
    pub projection: Projection,
    pub sort: Option<(String, SortOrder)>,
}

impl FindQuery {
    pub fn all() -> Self {
        Self {
            filter: None,
            projection: Projection::WithoutId,
            sort: None,
        }
    }

    /// Point lookup on a key field.
    pub fn by_key(field: &str, value: impl Into<Bson>) -> Self {
        Self {
            filter: Some((field.to_string(), value.into())),
            ..Self::all()
        }
    }

    pub fn only(mut self, fields: &[&str]) -> Self {
        self.projection = Projection::Only(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn sorted_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort = Some((field.to_string(), order));
        self
    }

    pub fn filter_document(&self) -> Document {
        match &self.filter {
            Some((field, value)) => {
                let mut filter = Document::new();
                filter.insert(field.as_str(), value.clone());
                filter
            }
            None => Document::new(),
        }
    }

    pub fn sort_document(&self) -> Option<Document> {
        self.sort.as_ref().map(|(field, order)| {
            let mut sort = Document::new();
            let direction = match order {
                SortOrder::Ascending => 1,
                SortOrder::Descending => -1,
            };
            sort.insert(field.as_str(), direction);
            sort
        })
    }
}

/// Read access to the dashboard collections.
///
/// Implementations return complete results or an error, never a prefix.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run `pipeline` against its base collection.
    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>, StoreError>;

    async fn find(&self, collection: &str, query: &FindQuery)
        -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> Result<Option<Document>, StoreError>;

    /// Number of documents in the whole collection.
    async fn count_documents(&self, collection: &str) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
