//! Creates the database tables used by the app.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    auth::{create_account_table, create_password_reset_table},
    store::create_document_table,
};

/// Create all the tables used by the app if they do not already exist.
///
/// # Errors
/// Returns an error if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_account_table(&transaction)?;
    create_password_reset_table(&transaction)?;
    create_document_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
