use std::time::Duration;

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions as MongoFindOptions},
};
use tracing::debug;

use docrud_core::{
    backend::{Namespace, StoreBackend, StoreBackendBuilder},
    document::DocumentExt,
    error::DocumentStoreResult,
    options::{FindOptions, UpdateOptions, WriteScope},
    query::{Expr, QueryVisitor},
    result::OperationResult,
    update::Update,
};

use crate::{
    error::{classify, classify_connect, classify_insert},
    query::{MongoQueryTranslator, translate_update},
};

/// MongoDB storage backend.
///
/// Wraps a driver [`Client`], which pools connections internally. Cloning is cheap and clones
/// share the pool.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
}

impl MongoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn builder(uri: impl Into<String>) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(uri)
    }

    fn collection(&self, namespace: &Namespace) -> MongoCollection<Document> {
        self.client
            .database(&namespace.database)
            .collection(&namespace.collection)
    }

    fn translate_filter(filter: &Expr) -> DocumentStoreResult<Document> {
        MongoQueryTranslator.visit_expr(filter)
    }
}

fn find_options(options: &FindOptions) -> MongoFindOptions {
    let mut translated = MongoFindOptions::default();

    // A limit of zero means no limit.
    translated.limit = options
        .limit
        .filter(|limit| *limit > 0)
        .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
    translated.skip = options
        .skip
        .map(|skip| skip as u64);
    translated.sort = options.sort_document();
    translated.projection = options
        .projection
        .as_ref()
        .map(|projection| projection.to_document());

    translated
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    #[tracing::instrument(skip(self))]
    async fn ping(&self) -> DocumentStoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(classify_connect)?;

        debug!("ping acknowledged");

        Ok(())
    }

    async fn insert_documents(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<OperationResult> {
        let (ids, documents): (Vec<Bson>, Vec<Document>) = documents
            .into_iter()
            .map(|mut document| (document.ensure_id(), document))
            .unzip();

        self.collection(namespace)
            .insert_many(documents)
            .await
            .map_err(|err| classify_insert(err, &ids))?;

        Ok(OperationResult::inserted_many(
            ids.into_iter().enumerate().collect(),
        ))
    }

    async fn find_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        options: &FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.collection(namespace)
            .find(Self::translate_filter(filter)?)
            .with_options(find_options(options))
            .await
            .map_err(classify)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(classify)
    }

    async fn update_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        update: &Update,
        scope: WriteScope,
        options: UpdateOptions,
    ) -> DocumentStoreResult<OperationResult> {
        let collection = self.collection(namespace);
        let filter = Self::translate_filter(filter)?;
        let update = translate_update(update);

        let result = match scope {
            WriteScope::One => {
                collection
                    .update_one(filter, update)
                    .upsert(options.upsert)
                    .await
            }
            WriteScope::Many => {
                collection
                    .update_many(filter, update)
                    .upsert(options.upsert)
                    .await
            }
        }
        .map_err(classify)?;

        Ok(OperationResult::updated(
            result.matched_count,
            result.modified_count,
            result.upserted_id,
        ))
    }

    async fn delete_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        scope: WriteScope,
    ) -> DocumentStoreResult<OperationResult> {
        let collection = self.collection(namespace);
        let filter = Self::translate_filter(filter)?;

        let result = match scope {
            WriteScope::One => collection.delete_one(filter).await,
            WriteScope::Many => collection.delete_many(filter).await,
        }
        .map_err(classify)?;

        Ok(OperationResult::deleted(result.deleted_count))
    }

    async fn list_databases(&self) -> DocumentStoreResult<Vec<String>> {
        self.client
            .list_database_names()
            .await
            .map_err(classify)
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(classify)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        debug!("mongodb client shut down");

        Ok(())
    }
}

/// Builder for [`MongoDbStore`].
///
/// Only the URI is required. The timeouts bound how long the driver waits for a suitable server
/// and for a TCP connection; operations exceeding them fail with `Timeout`.
#[derive(Debug, Clone)]
pub struct MongoDbStoreBuilder {
    uri: String,
    app_name: Option<String>,
    server_selection_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl MongoDbStoreBuilder {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            app_name: None,
            server_selection_timeout: None,
            connect_timeout: None,
        }
    }

    /// Name reported to the server in the connection handshake.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    #[tracing::instrument(skip_all)]
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(classify_connect)?;

        if self.app_name.is_some() {
            options.app_name = self.app_name;
        }
        if self.server_selection_timeout.is_some() {
            options.server_selection_timeout = self.server_selection_timeout;
        }
        if self.connect_timeout.is_some() {
            options.connect_timeout = self.connect_timeout;
        }

        let client = Client::with_options(options).map_err(classify_connect)?;

        debug!("mongodb client created");

        Ok(MongoDbStore::new(client))
    }
}

#[cfg(test)]
mod tests {
    use docrud_core::{
        error::DocumentStoreError,
        options::{Projection, SortDirection},
    };

    use super::*;

    #[test]
    fn find_options_translate() {
        let options = FindOptions::builder()
            .sort("quantity", SortDirection::Desc)
            .skip(2)
            .limit(1)
            .projection(Projection::include(["name"]).exclude_id())
            .build();

        let translated = find_options(&options);

        assert_eq!(translated.limit, Some(1));
        assert_eq!(translated.skip, Some(2));
        assert_eq!(translated.sort, Some(doc! { "quantity": -1 }));
        assert_eq!(translated.projection, Some(doc! { "name": 1, "_id": 0 }));
    }

    #[test]
    fn zero_limit_is_unbounded() {
        let options = FindOptions::builder().limit(0).build();

        assert_eq!(find_options(&options).limit, None);
        assert_eq!(find_options(&FindOptions::default()).sort, None);
    }

    #[tokio::test]
    async fn malformed_uri_is_a_connection_error() {
        let err = MongoDbStore::builder("postgres://localhost/")
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::Connection(_)));
    }
}
