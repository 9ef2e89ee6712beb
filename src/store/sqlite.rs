//! A [DocumentStore] backed by a single SQLite table.
//!
//! Each document is stored as a JSON object in the `data` column. Queries are
//! translated into `json_extract` expressions so filtering and ordering happen
//! inside SQLite.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{
    Connection, OptionalExtension, params_from_iter, types::Value as SqlValue,
};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    Error,
    store::{Direction, Document, DocumentId, DocumentRef, DocumentStore, Fields, Query},
};

/// Create the table that holds every collection's documents.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_document_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS document (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
                )",
        (),
    )?;

    Ok(())
}

/// A document store that keeps every collection in one SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteDocumentStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteDocumentStore {
    /// Wrap a shared connection. The document table must already exist, see
    /// [create_document_table].
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

impl DocumentStore for SQLiteDocumentStore {
    async fn create(&self, collection: &str, fields: Fields) -> Result<DocumentId, Error> {
        let id = DocumentId::random();
        let connection = self.lock()?;
        insert_document(collection, &id, &fields, &connection)?;

        Ok(id)
    }

    async fn set(&self, collection: &str, id: &DocumentId, fields: Fields) -> Result<(), Error> {
        let connection = self.lock()?;
        upsert_document(collection, id, &fields, &connection)
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>, Error> {
        let connection = self.lock()?;
        get_document(collection, id, &connection)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, Error> {
        let connection = self.lock()?;
        query_documents(collection, query, &connection)
    }

    async fn update(&self, collection: &str, id: &DocumentId, patch: Fields) -> Result<(), Error> {
        let connection = self.lock()?;
        update_document(collection, id, patch, &connection)
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), Error> {
        self.lock()?.execute(
            "DELETE FROM document WHERE collection = ?1 AND id = ?2",
            (collection, id.as_str()),
        )?;

        Ok(())
    }

    async fn batch_delete(&self, refs: &[DocumentRef]) -> Result<(), Error> {
        let mut connection = self.lock()?;
        let transaction = connection.transaction()?;

        for document in refs {
            transaction.execute(
                "DELETE FROM document WHERE collection = ?1 AND id = ?2",
                (&document.collection, document.id.as_str()),
            )?;
        }

        transaction.commit()?;

        Ok(())
    }
}

fn insert_document(
    collection: &str,
    id: &DocumentId,
    fields: &Fields,
    connection: &Connection,
) -> Result<(), Error> {
    let data = serialize_fields(fields)?;

    connection.execute(
        "INSERT INTO document (collection, id, data, created_at) VALUES (?1, ?2, ?3, ?4)",
        (collection, id.as_str(), data, OffsetDateTime::now_utc()),
    )?;

    Ok(())
}

fn upsert_document(
    collection: &str,
    id: &DocumentId,
    fields: &Fields,
    connection: &Connection,
) -> Result<(), Error> {
    let data = serialize_fields(fields)?;

    connection.execute(
        "INSERT INTO document (collection, id, data, created_at) VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data",
        (collection, id.as_str(), data, OffsetDateTime::now_utc()),
    )?;

    Ok(())
}

fn get_document(
    collection: &str,
    id: &DocumentId,
    connection: &Connection,
) -> Result<Option<Document>, Error> {
    let row: Option<(String, OffsetDateTime)> = connection
        .query_row(
            "SELECT data, created_at FROM document WHERE collection = ?1 AND id = ?2",
            (collection, id.as_str()),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((data, created_at)) => Ok(Some(Document {
            id: id.clone(),
            fields: deserialize_fields(&data)?,
            created_at,
        })),
        None => Ok(None),
    }
}

fn update_document(
    collection: &str,
    id: &DocumentId,
    patch: Fields,
    connection: &Connection,
) -> Result<(), Error> {
    let Some(mut document) = get_document(collection, id, connection)? else {
        return Err(Error::NotFound);
    };

    document.fields.extend(patch);
    let data = serialize_fields(&document.fields)?;

    connection.execute(
        "UPDATE document SET data = ?1 WHERE collection = ?2 AND id = ?3",
        (data, collection, id.as_str()),
    )?;

    Ok(())
}

fn query_documents(
    collection: &str,
    query: &Query,
    connection: &Connection,
) -> Result<Vec<Document>, Error> {
    let mut sql = String::from("SELECT id, data, created_at FROM document WHERE collection = ?");
    let mut params = vec![SqlValue::Text(collection.to_owned())];

    for (field, value) in &query.filters {
        params.push(SqlValue::Text(json_path(field)?));

        match to_sql_value(value)? {
            Some(value) => {
                sql.push_str(" AND json_extract(data, ?) = ?");
                params.push(value);
            }
            None => sql.push_str(" AND json_extract(data, ?) IS NULL"),
        }
    }

    if let Some((field, direction)) = &query.order_by {
        let direction = match direction {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        };
        sql.push_str(&format!(
            " ORDER BY json_extract(data, ?) {direction}, created_at {direction}"
        ));
        params.push(SqlValue::Text(json_path(field)?));
    }

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        params.push(SqlValue::Integer(limit as i64));
    }

    let rows = connection
        .prepare(&sql)?
        .query_map(params_from_iter(params.iter()), |row| {
            let id: String = row.get(0)?;
            let data: String = row.get(1)?;
            let created_at: OffsetDateTime = row.get(2)?;

            Ok((id, data, created_at))
        })?
        .collect::<Result<Vec<_>, rusqlite::Error>>()?;

    rows.into_iter()
        .map(|(id, data, created_at)| -> Result<Document, Error> {
            Ok(Document {
                id: DocumentId::new(id),
                fields: deserialize_fields(&data)?,
                created_at,
            })
        })
        .collect()
}

/// Build the JSON path for a top-level field.
///
/// Field names are restricted to ASCII letters, digits and underscores so
/// they can be embedded in the path without escaping.
fn json_path(field: &str) -> Result<String, Error> {
    let is_valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !is_valid {
        return Err(Error::InvalidQuery(format!("invalid field name {field:?}")));
    }

    Ok(format!("$.{field}"))
}

/// Convert a JSON scalar into the value `json_extract` produces for it.
///
/// Returns `None` for JSON null, which must be matched with `IS NULL`.
fn to_sql_value(value: &Value) -> Result<Option<SqlValue>, Error> {
    let value = match value {
        Value::Null => return Ok(None),
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => SqlValue::Integer(integer),
            None => SqlValue::Real(number.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Array(_) | Value::Object(_) => {
            return Err(Error::InvalidQuery(
                "can only filter on strings, numbers, booleans and null".to_owned(),
            ));
        }
    };

    Ok(Some(value))
}

fn serialize_fields(fields: &Fields) -> Result<String, Error> {
    serde_json::to_string(fields).map_err(|error| Error::Serialization(error.to_string()))
}

fn deserialize_fields(data: &str) -> Result<Fields, Error> {
    serde_json::from_str(data).map_err(|error| {
        tracing::error!("stored document is not a JSON object: {error}");
        Error::Serialization(error.to_string())
    })
}
