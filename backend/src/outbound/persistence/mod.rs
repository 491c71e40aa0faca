//! MongoDB persistence adapter.
//!
//! [`MongoDocumentStore`] implements the domain
//! [`DocumentStore`](crate::domain::ports::DocumentStore) port for any
//! serde-serialisable document type. Connection parameters come from
//! [`MongoStoreConfig`] overrides layered over [`MongoSettings`] loaded from
//! the environment.
//!
//! # Example
//!
//! ```ignore
//! use ambulance_webapi::domain::Ambulance;
//! use ambulance_webapi::outbound::persistence::{MongoDocumentStore, MongoStoreConfig};
//!
//! let store = MongoDocumentStore::<Ambulance>::connect(MongoStoreConfig::default()).await?;
//! ```

mod config;
mod mongo_document_store;

pub use config::{ConfigError, MongoSettings, MongoStoreConfig, ResolvedMongoConfig};
pub use mongo_document_store::{MongoConnectError, MongoDocumentStore};
