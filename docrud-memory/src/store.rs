//! In-memory storage implementation for document stores.
//!
//! Documents live in insertion order per collection, inside a map of databases guarded by an
//! async-aware read-write lock.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use bson::Document;
use mea::rwlock::RwLock;
use tracing::debug;

use docrud_core::{
    backend::{Namespace, StoreBackend, StoreBackendBuilder},
    document::DocumentExt,
    error::{DocumentStoreError, DocumentStoreResult},
    options::{FindOptions, SortDirection, UpdateOptions, WriteScope},
    query::Expr,
    result::OperationResult,
    update::Update,
};

use crate::{
    evaluator::{DocumentEvaluator, sort_key},
    update::{apply_update, check_unique_id, project, upsert_seed},
};

type Collection = Vec<Document>;
type Database = HashMap<String, Collection>;
type StoreMap = HashMap<String, Database>;

/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait with MongoDB's observable CRUD semantics,
/// entirely in memory. Databases and collections are created implicitly by the first write.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use docrud_memory::InMemoryStore;
/// use docrud::{DocumentStoreClient, backend::StoreBackendBuilder};
///
/// let store = InMemoryStore::builder().build().await?;
/// let client = DocumentStoreClient::connect(store.clone(), "shop", "products").await?;
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// database name -> collection name -> documents
    store: Arc<RwLock<StoreMap>>,
    unreachable: bool,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use docrud_memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::builder().build().await.unwrap();
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

fn matching_positions(
    documents: &[Document],
    filter: &Expr,
    scope: WriteScope,
) -> DocumentStoreResult<Vec<usize>> {
    let mut positions = Vec::new();

    for (position, document) in documents.iter().enumerate() {
        if DocumentEvaluator::matches(document, filter)? {
            positions.push(position);

            if scope == WriteScope::One {
                break;
            }
        }
    }

    Ok(positions)
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        if self.unreachable {
            return Err(DocumentStoreError::Connection(
                "in-memory store is configured as unreachable".to_string(),
            ));
        }

        Ok(())
    }

    async fn insert_documents(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<OperationResult> {
        let mut store = self.store.write().await;
        let collection = store
            .entry(namespace.database.clone())
            .or_default()
            .entry(namespace.collection.clone())
            .or_default();

        let mut inserted_ids = BTreeMap::new();

        for (position, mut document) in documents.into_iter().enumerate() {
            let id = document.ensure_id();

            if let Err(err) = check_unique_id(collection, &document) {
                return Err(DocumentStoreError::PartialInsert {
                    inserted_ids,
                    detail: err.to_string(),
                });
            }

            collection.push(document);
            inserted_ids.insert(position, id);
        }

        Ok(OperationResult::inserted_many(inserted_ids))
    }

    async fn find_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        options: &FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(collection) = store
            .get(&namespace.database)
            .and_then(|database| database.get(&namespace.collection))
        else {
            return Ok(vec![]);
        };

        let mut matched = Vec::new();

        for document in collection {
            if DocumentEvaluator::matches(document, filter)? {
                matched.push(document);
            }
        }

        // Stable sort, so ties keep insertion order.
        if !options.sort.is_empty() {
            matched.sort_by(|a, b| {
                options
                    .sort
                    .iter()
                    .map(|sort| {
                        let ordering = sort_key(a, &sort.field).total_cmp(&sort_key(b, &sort.field));

                        match sort.direction {
                            SortDirection::Asc => ordering,
                            SortDirection::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        // A limit of zero means no limit.
        let limit = options
            .limit
            .filter(|limit| *limit > 0)
            .unwrap_or(usize::MAX);

        Ok(matched
            .into_iter()
            .skip(options.skip.unwrap_or(0))
            .take(limit)
            .map(|document| match &options.projection {
                Some(projection) => project(document.clone(), projection),
                None => document.clone(),
            })
            .collect())
    }

    async fn update_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        update: &Update,
        scope: WriteScope,
        options: UpdateOptions,
    ) -> DocumentStoreResult<OperationResult> {
        let mut store = self.store.write().await;

        let positions = match store
            .get(&namespace.database)
            .and_then(|database| database.get(&namespace.collection))
        {
            Some(collection) => matching_positions(collection, filter, scope)?,
            None => Vec::new(),
        };

        if positions.is_empty() {
            if !options.upsert {
                return Ok(OperationResult::updated(0, 0, None));
            }

            let mut document = upsert_seed(&filter.equality_fields())?;
            apply_update(&mut document, update)?;
            let id = document.ensure_id();

            let collection = store
                .entry(namespace.database.clone())
                .or_default()
                .entry(namespace.collection.clone())
                .or_default();

            check_unique_id(collection, &document)?;
            collection.push(document);

            debug!(%namespace, upserted_id = %id, "upserted document");

            return Ok(OperationResult::updated(0, 0, Some(id)));
        }

        let Some(collection) = store
            .get_mut(&namespace.database)
            .and_then(|database| database.get_mut(&namespace.collection))
        else {
            return Ok(OperationResult::updated(0, 0, None));
        };

        let mut modified = 0;

        for position in &positions {
            let current = &mut collection[*position];
            let mut updated = current.clone();

            apply_update(&mut updated, update)?;

            if updated != *current {
                *current = updated;
                modified += 1;
            }
        }

        Ok(OperationResult::updated(positions.len() as u64, modified, None))
    }

    async fn delete_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        scope: WriteScope,
    ) -> DocumentStoreResult<OperationResult> {
        let mut store = self.store.write().await;
        let Some(collection) = store
            .get_mut(&namespace.database)
            .and_then(|database| database.get_mut(&namespace.collection))
        else {
            return Ok(OperationResult::deleted(0));
        };

        let positions = matching_positions(collection, filter, scope)?;

        for position in positions.iter().rev() {
            collection.remove(*position);
        }

        Ok(OperationResult::deleted(positions.len() as u64))
    }

    async fn list_databases(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        names.sort();

        Ok(names)
    }

    async fn list_collections(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .get(database)
            .map(|collections| collections.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();

        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docrud_memory::InMemoryStore;
/// use docrud::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await.unwrap();
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder {
    unreachable: bool,
}

impl InMemoryStoreBuilder {
    /// Makes the store fail its liveness ping, as a stopped server would.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore {
            unreachable: self.unreachable,
            ..InMemoryStore::default()
        })
    }
}
