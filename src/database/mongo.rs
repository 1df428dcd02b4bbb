use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{FindOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct MongoDatabase {
    database: Database,
}

impl MongoDatabase {
    pub async fn connect(uri: &str, name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;

        Ok(Self {
            database: client.database(name),
        })
    }

    pub fn typed_collection<T>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }

    pub async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! {"ping": 1}, None).await?;
        Ok(())
    }

    pub async fn ensure_descending_index<T: Send + Sync>(&self, collection: &Collection<T>, field: &str) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! {field: -1})
            .options(IndexOptions::builder().background(true).build())
            .build();

        collection.create_index(index, None).await?;
        Ok(())
    }

    pub async fn insert_one<T: Serialize + Send + Sync>(&self, collection: &Collection<T>, value: &T) -> Result<()> {
        collection.insert_one(value, None).await?;
        Ok(())
    }

    pub async fn find_one<T: DeserializeOwned + Unpin + Send + Sync>(
        &self,
        collection: &Collection<T>,
        filter: Document,
    ) -> Result<Option<T>> {
        Ok(collection.find_one(filter, None).await?)
    }

    pub async fn find_many<T: DeserializeOwned + Unpin + Send + Sync>(
        &self,
        collection: &Collection<T>,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<T>> {
        let cursor = collection.find(filter, options).await?;
        let results: Vec<T> = cursor.try_collect().await?;

        Ok(results)
    }

    pub async fn count<T: Send + Sync>(&self, collection: &Collection<T>, filter: Document) -> Result<u64> {
        Ok(collection.count_documents(filter, None).await?)
    }

    /// Number of deleted documents.
    pub async fn delete_one<T: Send + Sync>(&self, collection: &Collection<T>, filter: Document) -> Result<u64> {
        Ok(collection.delete_one(filter, None).await?.deleted_count)
    }
}
