//! Execution boundary between the dashboard operations and the store.
//!
//! Every call is timed, materialised in full and decoded into its row type.
//! Store and decode failures are logged here with their cause and replaced by
//! the operation's [`DataError`].

use super::error::DataError;
use super::metrics::{DB_ERRORS_TOTAL, DB_QUERY_DURATION};
use crate::query::Pipeline;
use crate::store::{DocumentStore, FindQuery};
use bson::Document;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A named data operation: metric label plus the message callers see when it
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub failure: &'static str,
}

impl Operation {
    pub const fn new(name: &'static str, failure: &'static str) -> Self {
        Self { name, failure }
    }

    fn fail(&self, cause: &dyn Display) -> DataError {
        tracing::error!(operation = self.name, error = %cause, "Database Error");
        DB_ERRORS_TOTAL.with_label_values(&[self.name]).inc();
        DataError::DataAccess(self.failure)
    }
}

#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn DocumentStore>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Run a pipeline on its base collection and decode every row.
    #[instrument(skip(self, pipeline), fields(operation = operation.name, collection = pipeline.collection()))]
    pub async fn aggregate<T: DeserializeOwned>(
        &self,
        pipeline: &Pipeline,
        operation: Operation,
    ) -> Result<Vec<T>, DataError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&[operation.name])
            .start_timer();

        debug!(stages = pipeline.stages().len(), "Running aggregation");
        let documents = self
            .store
            .aggregate(pipeline)
            .await
            .map_err(|e| operation.fail(&e))?;
        let rows = decode_all(documents, operation)?;

        timer.observe_duration();
        Ok(rows)
    }

    #[instrument(skip(self, query), fields(operation = operation.name))]
    pub async fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &FindQuery,
        operation: Operation,
    ) -> Result<Vec<T>, DataError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&[operation.name])
            .start_timer();

        let documents = self
            .store
            .find(collection, query)
            .await
            .map_err(|e| operation.fail(&e))?;
        let rows = decode_all(documents, operation)?;

        timer.observe_duration();
        Ok(rows)
    }

    /// Point lookup. `Ok(None)` when nothing matches.
    #[instrument(skip(self, query), fields(operation = operation.name))]
    pub async fn find_one<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &FindQuery,
        operation: Operation,
    ) -> Result<Option<T>, DataError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&[operation.name])
            .start_timer();

        let document = self
            .store
            .find_one(collection, query)
            .await
            .map_err(|e| operation.fail(&e))?;
        let row = document
            .map(|document| decode(document, operation))
            .transpose()?;

        timer.observe_duration();
        Ok(row)
    }

    #[instrument(skip(self), fields(operation = operation.name))]
    pub async fn count(&self, collection: &str, operation: Operation) -> Result<u64, DataError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&[operation.name])
            .start_timer();

        let count = self
            .store
            .count_documents(collection)
            .await
            .map_err(|e| operation.fail(&e))?;

        timer.observe_duration();
        Ok(count)
    }
}

fn decode<T: DeserializeOwned>(document: Document, operation: Operation) -> Result<T, DataError> {
    bson::from_document(document).map_err(|e| operation.fail(&e))
}

fn decode_all<T: DeserializeOwned>(
    documents: Vec<Document>,
    operation: Operation,
) -> Result<Vec<T>, DataError> {
    documents
        .into_iter()
        .map(|document| decode(document, operation))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Customer;
    use crate::query::{PipelineKind, CUSTOMERS};
    use crate::store::InMemoryStore;
    use bson::doc;

    const TEST_OP: Operation = Operation::new("test_op", "Failed to run test op.");

    #[tokio::test]
    async fn test_store_failure_becomes_data_error() {
        let store = InMemoryStore::new();
        store.fail_with("socket closed").await;
        let executor = QueryExecutor::new(Arc::new(store));

        let result = executor
            .aggregate::<Document>(&Pipeline::build(&PipelineKind::StatusTotals), TEST_OP)
            .await;
        assert_eq!(result, Err(DataError::DataAccess("Failed to run test op.")));

        let result = executor.count(CUSTOMERS, TEST_OP).await;
        assert_eq!(result, Err(DataError::DataAccess("Failed to run test op.")));
    }

    #[tokio::test]
    async fn test_malformed_document_fails_whole_result() {
        let store = InMemoryStore::new();
        store
            .insert_documents(
                CUSTOMERS,
                vec![
                    doc! { "id": "1", "name": "A", "email": "a@x.com", "image_url": "/a.png" },
                    doc! { "id": "2", "name": "B" },
                ],
            )
            .await;
        let executor = QueryExecutor::new(Arc::new(store));

        let result = executor
            .find::<Customer>(CUSTOMERS, &FindQuery::all(), TEST_OP)
            .await;
        assert_eq!(result, Err(DataError::DataAccess("Failed to run test op.")));
    }

    #[tokio::test]
    async fn test_find_one_absent_is_not_an_error() {
        let executor = QueryExecutor::new(Arc::new(InMemoryStore::new()));
        let result = executor
            .find_one::<Customer>(CUSTOMERS, &FindQuery::by_key("id", "nope"), TEST_OP)
            .await;
        assert_eq!(result, Ok(None));
    }
}
