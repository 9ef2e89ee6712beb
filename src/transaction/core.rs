//! Defines the transaction record, its validation, and how it is stored.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::{
    Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::{
    Error,
    store::{
        Direction, Document, DocumentId, DocumentRef, DocumentStore, Query, from_fields, to_fields,
    },
    transaction::category::validate_category,
    user::UserID,
};

/// The collection that holds every user's transactions.
pub const TRANSACTIONS_COLLECTION: &str = "transactions";

/// The format of dates in forms and in stored documents, e.g. "2025-10-09".
///
/// Dates in this format sort lexicographically, which the store relies on
/// when ordering by date.
pub(crate) const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

mod date_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::DATE_FORMAT;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = date.format(DATE_FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Date::parse(&s, DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money spent, stored with a negative amount.
    #[default]
    Expense,
    /// Money earned, stored with a positive amount.
    Income,
}

impl TransactionType {
    /// The lowercase name used in forms and documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
        }
    }

    /// Parse the lowercase name, `None` for anything else.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "expense" => Some(TransactionType::Expense),
            "income" => Some(TransactionType::Income),
            _ => None,
        }
    }

    /// The sign applied to the amount entered by the user.
    pub fn sign(&self) -> f64 {
        match self {
            TransactionType::Expense => -1.0,
            TransactionType::Income => 1.0,
        }
    }

    /// The glyph shown in front of displayed amounts.
    pub fn glyph(&self) -> &'static str {
        match self {
            TransactionType::Expense => "-",
            TransactionType::Income => "+",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expense or income recorded by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID the store assigned to the transaction.
    pub id: DocumentId,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// Positive for income, negative for expenses.
    pub amount: f64,
    /// One of the categories for `transaction_type`.
    pub category: String,
    /// When the transaction happened, as entered by the user.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// Whether the transaction is income or an expense.
    pub transaction_type: TransactionType,
    /// Where the photo of the receipt can be fetched from, if one was uploaded.
    pub receipt_url: Option<String>,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
}

/// The fields of a transaction document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionFields {
    user_id: UserID,
    amount: f64,
    category: String,
    #[serde(with = "date_format")]
    date: Date,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    #[serde(default)]
    receipt_url: Option<String>,
}

impl Transaction {
    fn from_document(document: Document) -> Result<Self, Error> {
        let fields: TransactionFields = from_fields(document.fields)?;

        Ok(Self {
            id: document.id,
            user_id: fields.user_id,
            amount: fields.amount,
            category: fields.category,
            date: fields.date,
            description: fields.description,
            transaction_type: fields.transaction_type,
            receipt_url: fields.receipt_url,
            created_at: document.created_at,
        })
    }
}

/// A validated transaction that has not been saved yet.
///
/// The amount is the magnitude entered by the user, the sign is applied from
/// the type when the transaction is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    /// Always positive.
    pub amount: f64,
    /// One of the categories listed for `transaction_type`.
    pub category: String,
    /// The day the money moved, in the user's calendar.
    pub date: Date,
    /// Trimmed, may be empty.
    pub description: String,
}

impl NewTransaction {
    /// Validate the raw values submitted in the add-transaction form.
    ///
    /// # Errors
    /// - [Error::MissingField] if the type, amount, category or date is empty,
    /// - [Error::InvalidTransactionType] if the type is not income or expense,
    /// - [Error::InvalidAmount] if the amount is not a finite number above zero,
    /// - [Error::InvalidCategory] if the category does not belong to the type,
    /// - [Error::InvalidDate] if the date is not in the format YYYY-MM-DD.
    pub fn parse(
        transaction_type: &str,
        amount: &str,
        category: &str,
        date: &str,
        description: &str,
    ) -> Result<Self, Error> {
        let transaction_type = parse_transaction_type(transaction_type)?;
        let amount = parse_amount(amount)?;

        let category = category.trim();
        if category.is_empty() {
            return Err(Error::MissingField("category"));
        }
        validate_category(category, transaction_type)?;

        let date = parse_date(date)?;

        Ok(Self {
            transaction_type,
            amount,
            category: category.to_owned(),
            date,
            description: description.trim().to_owned(),
        })
    }

    /// The amount with the sign of the transaction type.
    pub fn signed_amount(&self) -> f64 {
        self.amount * self.transaction_type.sign()
    }
}

fn parse_transaction_type(text: &str) -> Result<TransactionType, Error> {
    let text = text.trim();

    if text.is_empty() {
        return Err(Error::MissingField("type"));
    }

    TransactionType::from_label(text).ok_or_else(|| Error::InvalidTransactionType(text.to_owned()))
}

fn parse_amount(text: &str) -> Result<f64, Error> {
    let text = text.trim();

    if text.is_empty() {
        return Err(Error::MissingField("amount"));
    }

    match text.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(Error::InvalidAmount(text.to_owned())),
    }
}

fn parse_date(text: &str) -> Result<Date, Error> {
    let text = text.trim();

    if text.is_empty() {
        return Err(Error::MissingField("date"));
    }

    Date::parse(text, DATE_FORMAT).map_err(|_| Error::InvalidDate(text.to_owned()))
}

// ============================================================================
// STORE FUNCTIONS
// ============================================================================

/// Save a new transaction for `user_id` and return its ID.
///
/// # Errors
/// Returns an error if the store rejects the write.
pub async fn create_transaction(
    user_id: UserID,
    transaction: &NewTransaction,
    receipt_url: Option<String>,
    store: &impl DocumentStore,
) -> Result<DocumentId, Error> {
    let fields = TransactionFields {
        user_id,
        amount: transaction.signed_amount(),
        category: transaction.category.clone(),
        date: transaction.date,
        description: transaction.description.clone(),
        transaction_type: transaction.transaction_type,
        receipt_url,
    };

    store
        .create(TRANSACTIONS_COLLECTION, to_fields(&fields)?)
        .await
}

/// Get a user's transactions, newest first.
///
/// Transactions on the same day are ordered by when they were recorded.
/// Pass `limit` to only get the most recent transactions.
///
/// # Errors
/// Returns an error if the store could not be queried or a document is malformed.
pub async fn load_transactions(
    user_id: UserID,
    limit: Option<usize>,
    store: &impl DocumentStore,
) -> Result<Vec<Transaction>, Error> {
    let mut query = Query::new()
        .where_eq("userId", user_id.to_string())
        .order_by("date", Direction::Descending);

    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    store
        .query(TRANSACTIONS_COLLECTION, &query)
        .await?
        .into_iter()
        .map(Transaction::from_document)
        .collect()
}

/// References to all of a user's transactions, used when deleting an account.
///
/// # Errors
/// Returns an error if the store could not be queried.
pub async fn transaction_refs(
    user_id: UserID,
    store: &impl DocumentStore,
) -> Result<Vec<DocumentRef>, Error> {
    let query = Query::new().where_eq("userId", user_id.to_string());

    Ok(store
        .query(TRANSACTIONS_COLLECTION, &query)
        .await?
        .into_iter()
        .map(|document| DocumentRef::new(TRANSACTIONS_COLLECTION, document.id))
        .collect())
}
