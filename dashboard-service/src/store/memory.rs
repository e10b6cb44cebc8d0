//! In-process document store.
//!
//! Holds collections as BSON documents and evaluates pipelines with the same
//! stage semantics MongoDB applies. Used by the test suite and by local runs
//! with `MONGODB_URI=memory://`.

use super::evaluate::{self, compare, get_path, Collections};
use super::{DocumentStore, FindQuery, Projection, StoreError};
use crate::query::{Pipeline, SortOrder};
use async_trait::async_trait;
use bson::{oid::ObjectId, Document};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<Collections>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append documents to a collection, assigning an `_id` where missing.
    pub async fn insert_documents(&self, collection: &str, documents: Vec<Document>) {
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();
        for mut document in documents {
            if !document.contains_key("_id") {
                document.insert("_id", ObjectId::new());
            }
            target.push(document);
        }
    }

    pub async fn insert_many<T: Serialize>(
        &self,
        collection: &str,
        items: &[T],
    ) -> Result<(), StoreError> {
        let documents = items
            .iter()
            .map(bson::to_document)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Rejected(format!("Unserializable document: {}", e)))?;
        self.insert_documents(collection, documents).await;
        Ok(())
    }

    /// Make every subsequent call fail as if the server were unreachable.
    pub async fn fail_with(&self, reason: &str) {
        *self.failure.write().await = Some(reason.to_string());
    }

    pub async fn recover(&self) {
        *self.failure.write().await = None;
    }

    async fn check_available(&self) -> Result<(), StoreError> {
        match self.failure.read().await.as_ref() {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

fn apply_projection(mut document: Document, projection: &Projection) -> Document {
    match projection {
        Projection::WithoutId => {
            document.remove("_id");
            document
        }
        Projection::Only(fields) => {
            let mut out = Document::new();
            for field in fields {
                if let Some(value) = document.remove(field) {
                    out.insert(field.as_str(), value);
                }
            }
            out
        }
    }
}

fn select(documents: &[Document], query: &FindQuery) -> Vec<Document> {
    let mut selected: Vec<Document> = documents
        .iter()
        .filter(|document| match &query.filter {
            Some((field, value)) => get_path(document, field) == Some(value),
            None => true,
        })
        .cloned()
        .collect();

    if let Some((field, order)) = &query.sort {
        selected.sort_by(|a, b| {
            let ordering = compare(get_path(a, field), get_path(b, field));
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
    }

    selected
        .into_iter()
        .map(|document| apply_projection(document, &query.projection))
        .collect()
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>, StoreError> {
        self.check_available().await?;
        let collections = self.collections.read().await;
        let input = collections
            .get(pipeline.collection())
            .cloned()
            .unwrap_or_default();
        evaluate::run(pipeline.stages(), input, &collections)
    }

    async fn find(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> Result<Vec<Document>, StoreError> {
        self.check_available().await?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| select(documents, query))
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.find(collection, query).await?.into_iter().next())
    }

    async fn count_documents(&self, collection: &str) -> Result<u64, StoreError> {
        self.check_available().await?;
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map_or(0, |c| c.len() as u64))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available().await
    }
}
