//! Main docrud crate: a thin CRUD façade over MongoDB-compatible document stores.
//!
//! This crate is the primary entry point for users of docrud. It re-exports the core types
//! from the sub-crates and provides access to the storage backends.
//!
//! # Features
//!
//! - **One collection, one client** - [`DocumentStoreClient`] binds a connection to a database/collection
//! - **Schema-less documents** - Documents are plain [`bson::Document`] values
//! - **MongoDB filter and update syntax** - Pass `doc!` filters and updates, or build them with [`query::Filter`] and [`update::Update`]
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docrud::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let client = DocumentStoreClient::connect(backend, "shop", "products").await?;
//!
//!     client
//!         .insert_many(vec![
//!             doc! { "name": "Clementine", "price": 1.05, "quantity": 12 },
//!             doc! { "name": "sweet Potato", "price": 3.05, "quantity": 2 },
//!         ])
//!         .await?;
//!
//!     let cheap = client
//!         .find_many(doc! { "price": { "$lt": 2.00 } }, FindOptions::default())
//!         .await?;
//!     println!("cheap products: {cheap:?}");
//!
//!     client
//!         .update_many(doc! {}, Update::new().push("tags", "seasonal"))
//!         .await?;
//!
//!     client.close().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! When the backend is only known at runtime, box it as a [`backend::DynStoreBackend`]. The
//! boxed backend is itself a `StoreBackend`, so the client works unchanged:
//!
//! ```ignore
//! use docrud::{prelude::*, backend::DynStoreBackend, memory::InMemoryStore};
//!
//! let backend: Box<dyn DynStoreBackend> = Box::new(InMemoryStore::builder().build().await?);
//! let client = DocumentStoreClient::connect(backend, "shop", "products").await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docrud_core::{backend, client, document, error, options, query, result, update};
pub use docrud_core::client::DocumentStoreClient;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docrud_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docrud_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
