//! The persistence collaborators used by the request handlers.
//!
//! Handlers never talk to SQLite or the filesystem directly. They receive a
//! [DocumentStore] for structured records and a [BlobStore] for receipt
//! images through the application state, which keeps the handler logic
//! testable against in-memory implementations.

mod blob;
mod sqlite;

use std::{fmt::Display, future::Future};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

pub use blob::{BlobStore, FileBlobStore};
pub use sqlite::{SQLiteDocumentStore, create_document_table};

use crate::Error;

/// The top-level fields of a document.
pub type Fields = Map<String, Value>;

/// The identifier of a document within its collection.
///
/// Identifiers are opaque strings. Documents created with
/// [DocumentStore::create] get a random identifier from the store, documents
/// written with [DocumentStore::set] use the identifier chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new random identifier.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A stored document together with the metadata the store assigns.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The document's identifier within its collection.
    pub id: DocumentId,
    /// The document's fields.
    pub fields: Fields,
    /// When the store first saw this document.
    pub created_at: OffsetDateTime,
}

/// The direction to sort query results in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest value first.
    Ascending,
    /// Largest value first.
    Descending,
}

/// A query over a single collection.
///
/// Filters are equality matches on top-level fields and are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// `(field, value)` pairs a document must all match.
    pub filters: Vec<(String, Value)>,
    /// The field to sort by. Without one the order is unspecified.
    pub order_by: Option<(String, Direction)>,
    /// The most documents to return, after sorting.
    pub limit: Option<usize>,
}

impl Query {
    /// A query that matches every document in a collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only match documents where `field` equals `value`.
    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_owned(), value.into()));
        self
    }

    /// Sort the results by `field`.
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_owned(), direction));
        self
    }

    /// Return at most `limit` documents.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A reference to a document, used for batched writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// The collection the document lives in, e.g. "transactions".
    pub collection: String,
    /// The document's identifier within `collection`.
    pub id: DocumentId,
}

impl DocumentRef {
    /// Refer to document `id` in `collection`.
    pub fn new(collection: &str, id: DocumentId) -> Self {
        Self {
            collection: collection.to_owned(),
            id,
        }
    }
}

/// An asynchronous document store organised into named collections.
///
/// Every operation can fail, and implementations must report failures through
/// the returned [Error] rather than hiding them.
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Insert a new document and return the identifier assigned to it.
    fn create(
        &self,
        collection: &str,
        fields: Fields,
    ) -> impl Future<Output = Result<DocumentId, Error>> + Send;

    /// Insert or replace the document `id` in `collection`.
    ///
    /// Replacing a document keeps its original creation time.
    fn set(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Get a single document, `None` if it does not exist.
    fn get(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Option<Document>, Error>> + Send;

    /// Get the documents in `collection` that match `query`.
    fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Document>, Error>> + Send;

    /// Merge `patch` into the top-level fields of an existing document.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the document does not exist.
    fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        patch: Fields,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Delete a single document. Deleting a missing document is not an error.
    fn delete(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Delete all of `refs` atomically: either every document is deleted or none are.
    fn batch_delete(&self, refs: &[DocumentRef]) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Convert a serializable value into document fields.
///
/// # Errors
/// Returns [Error::Serialization] if `value` does not serialize to a JSON object.
pub fn to_fields(value: &impl Serialize) -> Result<Fields, Error> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(Error::Serialization(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(error) => Err(Error::Serialization(error.to_string())),
    }
}

/// Convert document fields into a deserializable value.
///
/// # Errors
/// Returns [Error::Serialization] if the fields do not match the shape of `T`.
pub fn from_fields<T: for<'de> Deserialize<'de>>(fields: Fields) -> Result<T, Error> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|error| Error::Serialization(error.to_string()))
}
