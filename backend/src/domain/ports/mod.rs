//! Domain ports: the boundary between use-cases and infrastructure.

mod macros;
pub(crate) use macros::define_port_error;

mod document_store;

pub use document_store::{DocumentStore, DocumentStoreError, InMemoryDocumentStore};
