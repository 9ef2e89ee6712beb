//! The page listing all of a user's transactions with the add-transaction form.

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    alert::Alert,
    endpoints,
    html::{CARD_STYLE, PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    store::SQLiteDocumentStore,
    timezone::today_in,
    transaction::{
        Transaction,
        form::add_transaction_form,
        load_transactions,
        view::{ListKind, transaction_list},
    },
    user::{Currency, UserID, preferred_currency},
};

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsViewState {
    /// The store holding profiles and transactions.
    pub store: SQLiteDocumentStore,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionsViewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The query string accepted by the transactions page.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    /// Set after a transaction was created to show a confirmation.
    #[serde(default)]
    pub added: bool,
}

/// Render the user's transactions, newest first.
pub async fn get_transactions_page(
    State(state): State<TransactionsViewState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Response, Error> {
    let today = today_in(&state.local_timezone)?;
    let currency = preferred_currency(user_id, &state.store)
        .await
        .inspect_err(|error| tracing::error!("could not get profile for {user_id}: {error}"))?;
    let transactions = load_transactions(user_id, None, &state.store)
        .await
        .inspect_err(|error| tracing::error!("could not get transactions for {user_id}: {error}"))?;

    Ok(transactions_view(&transactions, currency, today, query.added).into_response())
}

fn transactions_view(
    transactions: &[Transaction],
    currency: Currency,
    today: Date,
    show_added_alert: bool,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-3xl space-y-6"
            {
                @if show_added_alert {
                    (Alert::success("Transaction added successfully!", "").into_html())
                }

                (add_transaction_form(today))

                section class=(CARD_STYLE)
                {
                    h1 class="text-xl font-bold mb-4" { "Transactions" }

                    div id="full-transactions-list"
                    {
                        (transaction_list(transactions, ListKind::Full, currency))
                    }
                }
            }
        }
    };

    base("Transactions", &[], &content)
}
