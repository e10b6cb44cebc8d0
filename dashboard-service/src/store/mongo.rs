use super::{DocumentStore, FindQuery, StoreError};
use crate::config::MongoConfig;
use crate::query::Pipeline;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{FindOneOptions, FindOptions},
    Client as MongoClient, Database,
};
use tokio::sync::OnceCell;

static SHARED: OnceCell<MongoStore> = OnceCell::const_new();

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            StoreError::from(e)
        })?;
        let db = client.database(database);
        let store = Self { client, db };
        store.ping().await?;
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(store)
    }

    /// Process-wide handle.
    ///
    /// The first caller connects; concurrent callers wait for that attempt and
    /// later callers reuse its result. A failed attempt leaves the handle
    /// unset, so the next call connects again.
    pub async fn shared(config: &MongoConfig) -> Result<&'static MongoStore, StoreError> {
        SHARED
            .get_or_try_init(|| Self::connect(&config.uri, &config.database))
            .await
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>, StoreError> {
        let cursor = self
            .db
            .collection::<Document>(pipeline.collection())
            .aggregate(pipeline.to_documents(), None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let options = FindOptions::builder()
            .projection(query.projection.to_document())
            .sort(query.sort_document())
            .build();
        let cursor = self
            .db
            .collection::<Document>(collection)
            .find(query.filter_document(), options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_one(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> Result<Option<Document>, StoreError> {
        let options = FindOneOptions::builder()
            .projection(query.projection.to_document())
            .sort(query.sort_document())
            .build();
        Ok(self
            .db
            .collection::<Document>(collection)
            .find_one(query.filter_document(), options)
            .await?)
    }

    async fn count_documents(&self, collection: &str) -> Result<u64, StoreError> {
        Ok(self
            .db
            .collection::<Document>(collection)
            .count_documents(doc! {}, None)
            .await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                StoreError::from(e)
            })?;
        Ok(())
    }
}
