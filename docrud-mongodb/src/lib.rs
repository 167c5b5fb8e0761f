//! MongoDB backend implementation for docrud.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait on top of the
//! official async driver. Filters and updates are translated to MongoDB's native operators and
//! executed server-side.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docrud = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Error mapping
//!
//! | driver error | docrud error |
//! |---|---|
//! | any failure while parsing the URI or probing the server | `Connection` |
//! | I/O timeout, server selection timeout | `Timeout` |
//! | client already shut down | `NotConnected` |
//! | write errors in an ordered `insert_many` | `PartialInsert` |
//! | anything else | `Operation` |
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use docrud::{DocumentStoreClient, backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017/")
//!         .app_name("inventory")
//!         .server_selection_timeout(Duration::from_secs(5))
//!         .build()
//!         .await?;
//!     let client = DocumentStoreClient::connect(store, "shop", "products").await?;
//!
//!     Ok(())
//! }
//! ```

mod error;
pub mod query;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
