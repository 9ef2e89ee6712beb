//! The add-transaction form and the category options it reloads.

use axum::{
    extract::Query,
    response::{Html, IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    endpoints,
    html::{
        CARD_STYLE, FORM_LABEL_STYLE, FORM_RADIO_GROUP_STYLE, FORM_RADIO_INPUT_STYLE,
        FORM_RADIO_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, submit_button,
    },
    transaction::{
        TransactionType,
        category::{categories_for, categories_for_label},
    },
};

fn category_options(categories: &[&str]) -> Markup {
    html! {
        @for category in categories {
            option value=(category) { (category) }
        }
    }
}

fn type_radio(transaction_type: TransactionType, label: &str, is_checked: bool) -> Markup {
    let id = format!("transaction-type-{transaction_type}");

    html! {
        div class="flex flex-1 items-center gap-3"
        {
            input
                name="type"
                id=(id)
                type="radio"
                value=(transaction_type)
                checked[is_checked]
                required
                hx-get=(endpoints::CATEGORIES_API)
                hx-target="#category"
                hx-trigger="change"
                class=(FORM_RADIO_INPUT_STYLE);

            label for=(id) class=(FORM_RADIO_LABEL_STYLE) { (label) }
        }
    }
}

/// The form for recording a new transaction, defaulting to an expense dated `today`.
pub fn add_transaction_form(today: Date) -> Markup {
    html! {
        section class=(CARD_STYLE)
        {
            h2 class="text-lg font-semibold mb-4" { "Add Transaction" }

            form
                id="new-transaction-form"
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-encoding="multipart/form-data"
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                hx-disabled-elt="#submit-button"
                class="space-y-4 md:space-y-6"
            {
                fieldset class="space-y-2"
                {
                    legend class=(FORM_LABEL_STYLE) { "Type" }

                    div class=(FORM_RADIO_GROUP_STYLE)
                    {
                        (type_radio(TransactionType::Expense, "Expense", true))
                        (type_radio(TransactionType::Income, "Income", false))
                    }
                }

                div
                {
                    label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                    input
                        name="amount"
                        id="amount"
                        type="number"
                        step="0.01"
                        min="0.01"
                        placeholder="0.00"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                    select
                        name="category"
                        id="category"
                        required
                        class=(FORM_TEXT_INPUT_STYLE)
                    {
                        (category_options(categories_for(TransactionType::Expense)))
                    }
                }

                div
                {
                    label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                    input
                        name="date"
                        id="date"
                        type="date"
                        value=(today)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                    input
                        name="description"
                        id="description"
                        type="text"
                        placeholder="Description"
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="receipt" class=(FORM_LABEL_STYLE) { "Receipt (optional)" }

                    input
                        name="receipt"
                        id="receipt"
                        type="file"
                        accept="image/*,application/pdf"
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                (submit_button("Add Transaction"))
            }
        }
    }
}

/// The query string of the category options endpoint.
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    /// "income" or "expense". Anything else gets no options.
    #[serde(rename = "type", default)]
    pub transaction_type: String,
}

/// The `<option>` elements for the categories of `?type=`.
///
/// Unknown types get the expense categories.
pub async fn get_category_options(Query(query): Query<CategoryQuery>) -> Response {
    Html(category_options(categories_for_label(&query.transaction_type)).into_string())
        .into_response()
}
