//! A thin CRUD façade over MongoDB-compatible document stores.
//!
//! This crate is the core of the docrud project and provides:
//!
//! - **Client** ([`client`]) - The [`DocumentStoreClient`](client::DocumentStoreClient) façade bound to one collection
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Filters** ([`query`]) - Filter expressions, their document syntax and the visitor backends translate them with
//! - **Updates** ([`update`]) - `$set`, `$unset`, `$push`, `$pull` and `$pop` mutations
//! - **Options** ([`options`]) - Sorting, paging, projection and upsert
//! - **Results** ([`result`]) - The [`OperationResult`](result::OperationResult) record returned by writes
//! - **Documents** ([`document`]) - Identifier handling and serde conversions
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docrud::{prelude::*, memory::InMemoryStore};
//!
//! let client = DocumentStoreClient::connect(InMemoryStore::builder().build().await?, "shop", "products").await?;
//!
//! let cheap = client
//!     .find_many(doc! { "price": { "$lt": 2.00 } }, FindOptions::default())
//!     .await?;
//! ```

pub mod backend;
pub mod client;
pub mod document;
pub mod error;
pub mod options;
pub mod query;
pub mod result;
pub mod update;
