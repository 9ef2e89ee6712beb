//! Transactions: income and expenses recorded by a user.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` record, its validation and its store functions
//! - The fixed category lists for each transaction type
//! - Receipt uploads and the route serving them back to their owner
//! - The transactions page and the add-transaction endpoint

mod category;
mod core;
mod create_endpoint;
mod form;
mod receipt;
mod transactions_page;
mod view;

pub use category::{categories_for, categories_for_label, validate_category};
pub use core::{
    NewTransaction, TRANSACTIONS_COLLECTION, Transaction, TransactionType, create_transaction,
    load_transactions, transaction_refs,
};
pub use create_endpoint::create_transaction_endpoint;
pub use form::get_category_options;
pub use receipt::{get_receipt, receipt_path, receipt_prefix, sanitize_file_name};
pub use transactions_page::get_transactions_page;
pub use view::{
    ListKind, RECENT_TRANSACTIONS_LIMIT, display_amount, icon_class, transaction_list,
};
