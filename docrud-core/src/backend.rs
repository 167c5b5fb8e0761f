//! Storage backend abstraction for the document store client.
//!
//! This module defines the traits that abstract over store implementations, allowing
//! [`DocumentStoreClient`](crate::client::DocumentStoreClient) to work with an in-memory store or
//! a MongoDB deployment through the same surface.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! Backends receive already-parsed filters ([`Expr`]) and updates ([`Update`]); translating those
//! to a native query language or evaluating them in-process is the backend's job.

use std::fmt::{self, Debug, Display};

use async_trait::async_trait;
use bson::Document;

use crate::{
    error::DocumentStoreResult,
    options::{FindOptions, UpdateOptions, WriteScope},
    query::Expr,
    result::OperationResult,
    update::Update,
};

/// A database/collection pair addressed by an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent calls from multiple
/// async tasks. Each call is an independent round-trip to the store.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult). Store
/// failures map to `Operation`, deadline overruns to `Timeout`, and batch inserts that stop
/// midway to `PartialInsert`.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Lightweight liveness ping, run once when a client is constructed.
    async fn ping(&self) -> DocumentStoreResult<()>;

    /// Inserts documents in order, stopping at the first failure.
    ///
    /// Documents without an `_id` are assigned one before the write. On success the result's
    /// `inserted_ids` maps every input position to its identifier.
    async fn insert_documents(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<OperationResult>;

    /// Returns the documents matching `filter`, sorted, paged and projected per `options`.
    async fn find_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        options: &FindOptions,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Applies `update` to the first (or every) document matching `filter`.
    async fn update_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        update: &Update,
        scope: WriteScope,
        options: UpdateOptions,
    ) -> DocumentStoreResult<OperationResult>;

    /// Removes the first (or every) document matching `filter`.
    async fn delete_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        scope: WriteScope,
    ) -> DocumentStoreResult<OperationResult>;

    /// Lists the database names visible to the current credentials.
    async fn list_databases(&self) -> DocumentStoreResult<Vec<String>>;

    /// Lists the collection names of `database`.
    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op; backends holding external connections should
    /// override this.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe mirror of [`StoreBackend`], for choosing a backend at runtime.
///
/// Every `StoreBackend` is a `DynStoreBackend`, and `Box<dyn DynStoreBackend>` is itself a
/// `StoreBackend`, so a client can be built over either.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn ping(&self) -> DocumentStoreResult<()>;
    async fn insert_documents(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<OperationResult>;
    async fn find_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        options: &FindOptions,
    ) -> DocumentStoreResult<Vec<Document>>;
    async fn update_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        update: &Update,
        scope: WriteScope,
        options: UpdateOptions,
    ) -> DocumentStoreResult<OperationResult>;
    async fn delete_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        scope: WriteScope,
    ) -> DocumentStoreResult<OperationResult>;
    async fn list_databases(&self) -> DocumentStoreResult<Vec<String>>;
    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn ping(&self) -> DocumentStoreResult<()> {
        StoreBackend::ping(self).await
    }

    async fn insert_documents(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<OperationResult> {
        StoreBackend::insert_documents(self, namespace, documents).await
    }

    async fn find_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        options: &FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        StoreBackend::find_documents(self, namespace, filter, options).await
    }

    async fn update_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        update: &Update,
        scope: WriteScope,
        options: UpdateOptions,
    ) -> DocumentStoreResult<OperationResult> {
        StoreBackend::update_documents(self, namespace, filter, update, scope, options).await
    }

    async fn delete_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        scope: WriteScope,
    ) -> DocumentStoreResult<OperationResult> {
        StoreBackend::delete_documents(self, namespace, filter, scope).await
    }

    async fn list_databases(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_databases(self).await
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(self, database).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }
}

#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn ping(&self) -> DocumentStoreResult<()> {
        (**self).ping().await
    }

    async fn insert_documents(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<OperationResult> {
        (**self)
            .insert_documents(namespace, documents)
            .await
    }

    async fn find_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        options: &FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        (**self)
            .find_documents(namespace, filter, options)
            .await
    }

    async fn update_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        update: &Update,
        scope: WriteScope,
        options: UpdateOptions,
    ) -> DocumentStoreResult<OperationResult> {
        (**self)
            .update_documents(namespace, filter, update, scope, options)
            .await
    }

    async fn delete_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        scope: WriteScope,
    ) -> DocumentStoreResult<OperationResult> {
        (**self)
            .delete_documents(namespace, filter, scope)
            .await
    }

    async fn list_databases(&self) -> DocumentStoreResult<Vec<String>> {
        (**self).list_databases().await
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        (**self).list_collections(database).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        <dyn DynStoreBackend as DynStoreBackend>::shutdown_boxed(self).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
