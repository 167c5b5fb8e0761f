//! In-memory document storage backend for docrud.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait
//! that reproduces MongoDB's observable CRUD behavior. It is what the test suite and the demo's
//! `--memory` mode run against.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **MongoDB filter semantics** - Numeric normalization, array element matching, dotted paths
//! - **Full find options** - Multi-key sorting, skip, limit and projections
//! - **Update operators** - `$set`, `$unset`, `$push`, `$pull`, `$pop` and upserts
//! - **Failure injection** - An unreachable store for exercising connection errors
//!
//! # Quick Start
//!
//! ```ignore
//! use bson::doc;
//! use docrud::{DocumentStoreClient, memory::InMemoryStore, backend::StoreBackendBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let client = DocumentStoreClient::connect(backend, "shop", "products").await?;
//!
//!     client.insert_one(doc! { "name": "Clementine", "price": 1.05 }).await?;
//!     client.close().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod evaluator;
pub mod store;
mod update;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
