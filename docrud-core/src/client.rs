//! The CRUD façade over one collection of a document store.
//!
//! [`DocumentStoreClient`] owns a backend (one logical connection) for its whole lifetime. It is
//! constructed with [`DocumentStoreClient::connect`], which pings the store, and released with
//! [`DocumentStoreClient::close`]. Between the two, every operation is a single round-trip.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docrud::{prelude::*, memory::InMemoryStore};
//!
//! let backend = InMemoryStore::builder().build().await?;
//! let client = DocumentStoreClient::connect(backend, "shop", "products").await?;
//!
//! client.insert_one(doc! { "name": "Watermelon", "price": 2.0, "quantity": 10 }).await?;
//! client
//!     .update_one(doc! { "name": "Watermelon" }, Update::new().set("price", 2.3))
//!     .await?;
//!
//! let watermelon = client.find_one(doc! { "name": "Watermelon" }).await?;
//!
//! client.close().await?;
//! ```

use bson::Document;
use mea::rwlock::RwLock;
use tracing::{debug, info, warn};

use crate::{
    backend::{Namespace, StoreBackend},
    error::{DocumentStoreError, DocumentStoreResult},
    options::{FindOptions, UpdateOptions, WriteScope},
    query::IntoFilter,
    result::OperationResult,
    update::IntoUpdate,
};

/// A client bound to one database/collection of a document store.
///
/// The client is either connected or closed. All operations except [`close`](Self::close)
/// require the connected state and fail with [`DocumentStoreError::NotConnected`] otherwise.
///
/// # Concurrency
///
/// Operations take `&self` and may be issued concurrently; each holds a shared guard on the
/// backend for the duration of its round-trip. `close` takes the exclusive guard, so it waits
/// for in-flight operations before releasing the backend.
#[derive(Debug)]
pub struct DocumentStoreClient<B: StoreBackend> {
    backend: RwLock<Option<B>>,
    namespace: Namespace,
}

fn connected<B>(backend: &Option<B>) -> DocumentStoreResult<&B> {
    backend
        .as_ref()
        .ok_or(DocumentStoreError::NotConnected)
}

impl<B: StoreBackend> DocumentStoreClient<B> {
    /// Takes ownership of `backend`, verifies the store is reachable and binds the client to
    /// `database`/`collection`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Connection`] if the liveness ping fails. No retry is
    /// attempted; the backend is shut down before returning.
    pub async fn connect(
        backend: B,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> DocumentStoreResult<Self> {
        let namespace = Namespace::new(database, collection);

        debug!(%namespace, "probing document store");

        if let Err(err) = backend.ping().await {
            if let Err(shutdown_err) = backend.shutdown().await {
                warn!(error = %shutdown_err, "failed to release backend after failed ping");
            }

            return Err(match err {
                DocumentStoreError::Connection(_) => err,
                other => DocumentStoreError::Connection(other.to_string()),
            });
        }

        info!(%namespace, "connected to document store");

        Ok(Self {
            backend: RwLock::new(Some(backend)),
            namespace,
        })
    }

    /// The database and collection operations are addressed to.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn database_name(&self) -> &str {
        &self.namespace.database
    }

    pub fn collection_name(&self) -> &str {
        &self.namespace.collection
    }

    /// Switches to another database, keeping the current collection name.
    pub fn set_database(&mut self, database: impl Into<String>) {
        self.namespace.database = database.into();
    }

    /// Switches to another collection of the current database.
    pub fn set_collection(&mut self, collection: impl Into<String>) {
        self.namespace.collection = collection.into();
    }

    /// Returns `true` until [`close`](Self::close) has run.
    pub async fn is_connected(&self) -> bool {
        self.backend.read().await.is_some()
    }

    /// Inserts a single document, assigning an `_id` if it has none.
    ///
    /// The result carries `inserted_id`.
    #[tracing::instrument(skip(self, document), fields(namespace = %self.namespace))]
    pub async fn insert_one(&self, document: Document) -> DocumentStoreResult<OperationResult> {
        let guard = self.backend.read().await;
        let backend = connected(&guard)?;

        let result = match backend
            .insert_documents(&self.namespace, vec![document])
            .await
        {
            Ok(result) => result,
            Err(DocumentStoreError::PartialInsert { detail, .. }) => {
                return Err(DocumentStoreError::Operation(detail));
            }
            Err(err) => return Err(err),
        };

        let id = result
            .inserted_ids
            .into_values()
            .next()
            .ok_or_else(|| {
                DocumentStoreError::Operation("store did not report an inserted id".to_string())
            })?;

        debug!(inserted_id = %id, "inserted document");

        Ok(OperationResult::inserted_one(id))
    }

    /// Inserts documents as one ordered batch.
    ///
    /// The result's `inserted_ids` maps each input position to its identifier.
    ///
    /// # Errors
    ///
    /// If the store stops partway, [`DocumentStoreError::PartialInsert`] reports which
    /// positions were written. An empty batch is rejected with `InvalidDocument`.
    #[tracing::instrument(skip(self, documents), fields(namespace = %self.namespace, count = documents.len()))]
    pub async fn insert_many(
        &self,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<OperationResult> {
        let guard = self.backend.read().await;
        let backend = connected(&guard)?;

        if documents.is_empty() {
            return Err(DocumentStoreError::InvalidDocument(
                "insert_many requires at least one document".to_string(),
            ));
        }

        let result = backend
            .insert_documents(&self.namespace, documents)
            .await
            .inspect_err(|err| {
                if let DocumentStoreError::PartialInsert { inserted_ids, .. } = err {
                    warn!(inserted = inserted_ids.len(), "batch insert stopped early");
                }
            })?;

        debug!(inserted = result.inserted_ids.len(), "inserted documents");

        Ok(result)
    }

    /// Returns the first document matching `filter`, or `None` when nothing matches.
    pub async fn find_one(&self, filter: impl IntoFilter) -> DocumentStoreResult<Option<Document>> {
        self.find_one_with(filter, FindOptions::default())
            .await
    }

    /// Returns the first document matching `filter` under `options` (sort, skip, projection).
    ///
    /// Any limit in `options` is replaced by 1.
    #[tracing::instrument(skip(self, filter, options), fields(namespace = %self.namespace))]
    pub async fn find_one_with(
        &self,
        filter: impl IntoFilter,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        let guard = self.backend.read().await;
        let backend = connected(&guard)?;

        let filter = filter.into_filter()?;
        let options = FindOptions { limit: Some(1), ..options };

        let found = backend
            .find_documents(&self.namespace, &filter, &options)
            .await?
            .into_iter()
            .next();

        debug!(found = found.is_some(), "find one");

        Ok(found)
    }

    /// Returns every document matching `filter`, materialized in memory.
    ///
    /// Order is unspecified unless `options` sorts.
    #[tracing::instrument(skip(self, filter, options), fields(namespace = %self.namespace))]
    pub async fn find_many(
        &self,
        filter: impl IntoFilter,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        let guard = self.backend.read().await;
        let backend = connected(&guard)?;

        let filter = filter.into_filter()?;

        let documents = backend
            .find_documents(&self.namespace, &filter, &options)
            .await?;

        debug!(returned = documents.len(), "find many");

        Ok(documents)
    }

    /// Applies `update` to the first document matching `filter`.
    pub async fn update_one(
        &self,
        filter: impl IntoFilter,
        update: impl IntoUpdate,
    ) -> DocumentStoreResult<OperationResult> {
        self.update(filter, update, WriteScope::One, UpdateOptions::default())
            .await
    }

    /// Like [`update_one`](Self::update_one), with options such as upsert.
    pub async fn update_one_with(
        &self,
        filter: impl IntoFilter,
        update: impl IntoUpdate,
        options: UpdateOptions,
    ) -> DocumentStoreResult<OperationResult> {
        self.update(filter, update, WriteScope::One, options)
            .await
    }

    /// Applies `update` to every document matching `filter`.
    pub async fn update_many(
        &self,
        filter: impl IntoFilter,
        update: impl IntoUpdate,
    ) -> DocumentStoreResult<OperationResult> {
        self.update(filter, update, WriteScope::Many, UpdateOptions::default())
            .await
    }

    /// Like [`update_many`](Self::update_many), with options such as upsert.
    pub async fn update_many_with(
        &self,
        filter: impl IntoFilter,
        update: impl IntoUpdate,
        options: UpdateOptions,
    ) -> DocumentStoreResult<OperationResult> {
        self.update(filter, update, WriteScope::Many, options)
            .await
    }

    #[tracing::instrument(skip(self, filter, update), fields(namespace = %self.namespace))]
    async fn update(
        &self,
        filter: impl IntoFilter,
        update: impl IntoUpdate,
        scope: WriteScope,
        options: UpdateOptions,
    ) -> DocumentStoreResult<OperationResult> {
        let guard = self.backend.read().await;
        let backend = connected(&guard)?;

        let filter = filter.into_filter()?;
        let update = update.into_update()?;

        let result = backend
            .update_documents(&self.namespace, &filter, &update, scope, options)
            .await?;

        debug!(
            matched = result.matched_count,
            modified = result.modified_count,
            upserted = result.upserted_id.is_some(),
            "updated documents"
        );

        Ok(result)
    }

    /// Removes the first document matching `filter`. Zero matches is not an error.
    pub async fn delete_one(&self, filter: impl IntoFilter) -> DocumentStoreResult<OperationResult> {
        self.delete(filter, WriteScope::One).await
    }

    /// Removes every document matching `filter`.
    pub async fn delete_many(&self, filter: impl IntoFilter) -> DocumentStoreResult<OperationResult> {
        self.delete(filter, WriteScope::Many).await
    }

    #[tracing::instrument(skip(self, filter), fields(namespace = %self.namespace))]
    async fn delete(
        &self,
        filter: impl IntoFilter,
        scope: WriteScope,
    ) -> DocumentStoreResult<OperationResult> {
        let guard = self.backend.read().await;
        let backend = connected(&guard)?;

        let filter = filter.into_filter()?;

        let result = backend
            .delete_documents(&self.namespace, &filter, scope)
            .await?;

        debug!(deleted = result.deleted_count, "deleted documents");

        Ok(result)
    }

    /// Lists the databases visible to the current credentials.
    pub async fn list_databases(&self) -> DocumentStoreResult<Vec<String>> {
        let guard = self.backend.read().await;

        connected(&guard)?
            .list_databases()
            .await
    }

    /// Lists the collections of the current database.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let guard = self.backend.read().await;

        connected(&guard)?
            .list_collections(&self.namespace.database)
            .await
    }

    /// Releases the connection. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the backend's shutdown error, if any. The client is closed either way.
    pub async fn close(&self) -> DocumentStoreResult<()> {
        let backend = self.backend.write().await.take();

        match backend {
            Some(backend) => {
                backend.shutdown().await?;
                info!(namespace = %self.namespace, "connection closed");
            }
            None => debug!(namespace = %self.namespace, "connection already closed"),
        }

        Ok(())
    }
}
