//! MongoDB-backed [`DocumentStore`] adapter.
//!
//! Documents are stored as-is in one collection and addressed by their `id`
//! field, which carries a unique index. The adapter owns a single driver
//! client; the driver pools connections internally, so one store instance is
//! shared by every request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::error::{Error as DriverError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::config::{ConfigError, MongoSettings, MongoStoreConfig, ResolvedMongoConfig};
use crate::domain::ports::{DocumentStore, DocumentStoreError};

const APP_NAME: &str = "ambulance-webapi";
const ID_FIELD: &str = "id";
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Errors raised while establishing the store connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MongoConnectError {
    /// Settings could not be loaded from the environment.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The connection string or client options were rejected.
    #[error("invalid document store options: {message}")]
    Options { message: String },

    /// The server did not answer the initial ping.
    #[error("document store unreachable: {message}")]
    Unreachable { message: String },
}

impl MongoConnectError {
    fn options(message: impl Into<String>) -> Self {
        Self::Options {
            message: message.into(),
        }
    }

    fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }
}

/// Document store holding `T` values in a MongoDB collection.
pub struct MongoDocumentStore<T>
where
    T: Send + Sync,
{
    client: Client,
    collection: Collection<T>,
    timeout: Duration,
    closed: AtomicBool,
}

impl<T> std::fmt::Debug for MongoDocumentStore<T>
where
    T: Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoDocumentStore")
            .field("collection", &self.collection.name())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

fn id_filter(id: &str) -> Document {
    doc! { ID_FIELD: id }
}

fn is_duplicate_key(err: &DriverError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

fn map_driver_error(err: DriverError) -> DocumentStoreError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => {
            DocumentStoreError::unavailable(err.to_string())
        }
        _ => DocumentStoreError::query(err.to_string()),
    }
}

impl<T> MongoDocumentStore<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + 'static,
{
    /// Connect using `config`, filling unset values from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`MongoConnectError`] when settings cannot be loaded, the
    /// options are invalid, or the server does not answer a ping.
    pub async fn connect(config: MongoStoreConfig) -> Result<Self, MongoConnectError> {
        let settings = MongoSettings::load_from_env()?;
        Self::connect_with(config.resolve(&settings)).await
    }

    /// Connect using fully resolved parameters.
    ///
    /// # Errors
    ///
    /// See [`MongoDocumentStore::connect`].
    pub async fn connect_with(config: ResolvedMongoConfig) -> Result<Self, MongoConnectError> {
        let mut options = ClientOptions::parse(config.uri())
            .await
            .map_err(|err| MongoConnectError::options(err.to_string()))?;
        options.app_name = Some(APP_NAME.to_owned());
        options.connect_timeout = Some(config.timeout());
        options.server_selection_timeout = Some(config.timeout());
        if let Some(credential) = config.credential() {
            options.credential = Some(credential);
        }

        let client = Client::with_options(options)
            .map_err(|err| MongoConnectError::options(err.to_string()))?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|err| MongoConnectError::unreachable(err.to_string()))?;

        let store = Self::from_client(client, &config);
        store.ensure_id_index().await;
        info!(
            database = config.database(),
            collection = config.collection(),
            "connected to document store"
        );
        Ok(store)
    }

    fn from_client(client: Client, config: &ResolvedMongoConfig) -> Self {
        let collection = client
            .database(config.database())
            .collection::<T>(config.collection());
        Self {
            client,
            collection,
            timeout: config.timeout(),
            closed: AtomicBool::new(false),
        }
    }

    async fn ensure_id_index(&self) {
        let index = IndexModel::builder()
            .keys(doc! { ID_FIELD: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        if let Err(err) = self.collection.create_index(index).await {
            warn!(error = %err, "failed to ensure unique id index");
        }
    }

    fn ensure_open(&self) -> Result<(), DocumentStoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(DocumentStoreError::unavailable("store disconnected"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<T> DocumentStore<T> for MongoDocumentStore<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + 'static,
{
    async fn create_document(&self, id: &str, document: &T) -> Result<(), DocumentStoreError> {
        self.ensure_open()?;
        let existing = self
            .collection
            .find_one(id_filter(id))
            .await
            .map_err(map_driver_error)?;
        if existing.is_some() {
            return Err(DocumentStoreError::conflict(id));
        }
        match self.collection.insert_one(document).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(DocumentStoreError::conflict(id)),
            Err(err) => Err(map_driver_error(err)),
        }
    }

    async fn find_document(&self, id: &str) -> Result<T, DocumentStoreError> {
        self.ensure_open()?;
        self.collection
            .find_one(id_filter(id))
            .await
            .map_err(map_driver_error)?
            .ok_or_else(|| DocumentStoreError::not_found(id))
    }

    async fn update_document(&self, id: &str, document: &T) -> Result<(), DocumentStoreError> {
        self.ensure_open()?;
        let result = self
            .collection
            .replace_one(id_filter(id), document)
            .await
            .map_err(map_driver_error)?;
        if result.matched_count == 0 {
            return Err(DocumentStoreError::not_found(id));
        }
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<(), DocumentStoreError> {
        self.ensure_open()?;
        let result = self
            .collection
            .delete_one(id_filter(id))
            .await
            .map_err(map_driver_error)?;
        if result.deleted_count == 0 {
            return Err(DocumentStoreError::not_found(id));
        }
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<T>, DocumentStoreError> {
        self.ensure_open()?;
        self.collection
            .find(doc! {})
            .await
            .map_err(map_driver_error)?
            .try_collect()
            .await
            .map_err(map_driver_error)
    }

    async fn disconnect(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match tokio::time::timeout(self.timeout, self.client.clone().shutdown()).await {
            Ok(()) => debug!("document store disconnected"),
            Err(_) => warn!(
                timeout_ms = self.timeout.as_millis() as u64,
                "document store shutdown timed out"
            ),
        }
    }
}
