//! The fixed category lists for each transaction type.

use crate::{Error, transaction::TransactionType};

const EXPENSE_CATEGORIES: [&str; 6] = [
    "Food",
    "Transportation",
    "Entertainment",
    "Utilities",
    "Subscription",
    "Other",
];

const INCOME_CATEGORIES: [&str; 5] = ["Salary", "Freelance", "Investment", "Gift", "Other Income"];

/// The categories a transaction of `transaction_type` can have, in display order.
pub fn categories_for(transaction_type: TransactionType) -> &'static [&'static str] {
    match transaction_type {
        TransactionType::Expense => &EXPENSE_CATEGORIES,
        TransactionType::Income => &INCOME_CATEGORIES,
    }
}

/// Like [categories_for], but takes the raw type from a form or query string.
///
/// Unknown types get the expense categories.
pub fn categories_for_label(transaction_type: &str) -> &'static [&'static str] {
    categories_for(TransactionType::from_label(transaction_type).unwrap_or_default())
}

/// Check that `category` belongs to `transaction_type`.
///
/// # Errors
/// Returns [Error::InvalidCategory] if the category is not in the type's list.
pub fn validate_category(category: &str, transaction_type: TransactionType) -> Result<(), Error> {
    if categories_for(transaction_type).contains(&category) {
        Ok(())
    } else {
        Err(Error::InvalidCategory {
            category: category.to_owned(),
            transaction_type: transaction_type.as_str().to_owned(),
        })
    }
}
