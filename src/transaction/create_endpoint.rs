//! The endpoint for recording a new transaction with an optional receipt.

use axum::{
    Extension,
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use time::OffsetDateTime;

use crate::{
    AppState, Error, endpoints,
    store::{BlobStore, FileBlobStore, SQLiteDocumentStore},
    transaction::{NewTransaction, create_transaction, receipt::receipt_path},
    user::UserID,
};

/// The state needed for creating a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    pub store: SQLiteDocumentStore,
    pub blobs: FileBlobStore,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            blobs: state.blobs.clone(),
        }
    }
}

/// An uploaded receipt file.
#[derive(Debug, Default)]
struct Receipt {
    file_name: String,
    bytes: Vec<u8>,
}

/// The raw fields of the add-transaction form.
#[derive(Debug, Default)]
struct TransactionForm {
    transaction_type: String,
    amount: String,
    category: String,
    date: String,
    description: String,
    receipt: Option<Receipt>,
}

impl TransactionForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, Error> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(|error| {
            tracing::error!("Could not read multipart form: {error}");
            Error::MultipartError(error.body_text())
        })? {
            let name = field.name().unwrap_or_default().to_owned();

            match name.as_str() {
                "type" => form.transaction_type = read_text(field).await?,
                "amount" => form.amount = read_text(field).await?,
                "category" => form.category = read_text(field).await?,
                "date" => form.date = read_text(field).await?,
                "description" => form.description = read_text(field).await?,
                "receipt" => form.receipt = read_receipt(field).await?,
                _ => tracing::debug!("Ignoring unexpected form field {name:?}"),
            }
        }

        Ok(form)
    }
}

async fn read_text(field: Field<'_>) -> Result<String, Error> {
    field.text().await.map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError("Could not read data from multipart form field.".to_owned())
    })
}

/// Browsers send an empty file part when no file was chosen, which is treated
/// as no receipt.
async fn read_receipt(field: Field<'_>) -> Result<Option<Receipt>, Error> {
    let file_name = field.file_name().unwrap_or_default().to_owned();

    let bytes = field.bytes().await.map_err(|error| {
        tracing::error!("Could not read receipt from multipart form field: {error}");
        Error::MultipartError("Could not read receipt from multipart form field.".to_owned())
    })?;

    if file_name.is_empty() || bytes.is_empty() {
        return Ok(None);
    }

    tracing::debug!("Received receipt '{file_name}' that is {} bytes", bytes.len());

    Ok(Some(Receipt {
        file_name,
        bytes: bytes.to_vec(),
    }))
}

/// A route handler for recording a new transaction.
///
/// The receipt, if any, is uploaded before the transaction is saved so the
/// transaction can store the receipt's URL. On success the client is
/// redirected to the transactions page.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserID>,
    multipart: Multipart,
) -> Response {
    let form = match TransactionForm::from_multipart(multipart).await {
        Ok(form) => form,
        Err(error) => return error.into_alert_response(),
    };

    let new_transaction = match NewTransaction::parse(
        &form.transaction_type,
        &form.amount,
        &form.category,
        &form.date,
        &form.description,
    ) {
        Ok(new_transaction) => new_transaction,
        Err(error) => {
            tracing::debug!("Rejected transaction from user {user_id}: {error}");
            return error.into_alert_response();
        }
    };

    let receipt_url = match form.receipt {
        Some(receipt) => {
            let timestamp_millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
            let path = receipt_path(user_id, timestamp_millis, &receipt.file_name);

            match state.blobs.upload(&path, receipt.bytes).await {
                Ok(url) => Some(url),
                Err(error) => {
                    tracing::error!("Could not upload receipt for user {user_id}: {error}");
                    return error.into_alert_response();
                }
            }
        }
        None => None,
    };

    match create_transaction(user_id, &new_transaction, receipt_url, &state.store).await {
        Ok(id) => tracing::info!("User {user_id} added transaction {id}"),
        Err(error) => {
            tracing::error!("Could not create transaction for user {user_id}: {error}");
            return error.into_alert_response();
        }
    }

    (
        HxRedirect(format!("{}?added=true", endpoints::TRANSACTIONS_VIEW)),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
