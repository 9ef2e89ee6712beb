//! HTML rendering for lists of transactions.

use maud::{Markup, html};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    html::{LINK_STYLE, format_currency},
    transaction::{Transaction, TransactionType},
    user::Currency,
};

/// The most transactions shown in the dashboard's recent list.
pub const RECENT_TRANSACTIONS_LIMIT: usize = 5;

/// "Oct 9"
const SHORT_DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[month repr:short] [day padding:none]");

/// "10/9/2025"
const FULL_DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[month padding:none]/[day padding:none]/[year]");

/// Which list a transaction is rendered in, controls the date format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListKind {
    /// The dashboard's short list of recent transactions.
    Recent,
    /// The transactions page.
    Full,
}

impl ListKind {
    fn empty_message(&self) -> &'static str {
        match self {
            ListKind::Recent => "No recent transactions found.",
            ListKind::Full => "No transactions found. Start adding one!",
        }
    }
}

/// The CSS class for a category icon, e.g. "icon-other-income".
pub fn icon_class(category: &str) -> String {
    let slug: String = category
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();

    format!("icon-{slug}")
}

/// The amount as a magnitude with a glyph for the direction, e.g. "- $40.00".
pub fn display_amount(
    amount: f64,
    transaction_type: TransactionType,
    currency: Currency,
) -> String {
    format!(
        "{} {}",
        transaction_type.glyph(),
        format_currency(amount.abs(), currency)
    )
}

fn display_date(date: Date, kind: ListKind) -> String {
    let format = match kind {
        ListKind::Recent => SHORT_DATE_FORMAT,
        ListKind::Full => FULL_DATE_FORMAT,
    };

    date.format(format).unwrap_or_else(|error| {
        tracing::error!("could not format date {date}: {error}");
        date.to_string()
    })
}

fn amount_class(transaction_type: TransactionType) -> &'static str {
    match transaction_type {
        TransactionType::Income => "text-green-700 dark:text-green-300",
        TransactionType::Expense => "text-red-700 dark:text-red-300",
    }
}

fn transaction_item(transaction: &Transaction, kind: ListKind, currency: Currency) -> Markup {
    let transaction_type = transaction.transaction_type;

    html! {
        li
            class={
                "transaction-item " (transaction_type)
                " flex items-center justify-between gap-4 py-3"
            }
            data-transaction-id=(transaction.id)
        {
            div class="icon-name flex items-center gap-3"
            {
                i class=(icon_class(&transaction.category)) {}

                div class="flex flex-col"
                {
                    span class="name font-medium" { (transaction.description) }
                    span class="category text-sm text-gray-500 dark:text-gray-400"
                    {
                        (transaction.category)
                    }
                }
            }

            div class="amount-date flex flex-col items-end"
            {
                span class={ "amount font-semibold " (amount_class(transaction_type)) }
                {
                    (display_amount(transaction.amount, transaction_type, currency))
                }
                span class="date text-sm text-gray-500 dark:text-gray-400"
                {
                    (display_date(transaction.date, kind))
                }
            }

            @if let Some(receipt_url) = &transaction.receipt_url {
                a
                    href=(receipt_url)
                    target="_blank"
                    title="View Receipt"
                    class={ "receipt-link " (LINK_STYLE) }
                {
                    "📎"
                }
            }
        }
    }
}

/// Render `transactions` as a list, or the list's empty message.
pub fn transaction_list(
    transactions: &[Transaction],
    kind: ListKind,
    currency: Currency,
) -> Markup {
    html! {
        @if transactions.is_empty() {
            p class="text-gray-500 dark:text-gray-400" { (kind.empty_message()) }
        } @else {
            ul class="divide-y divide-gray-200 dark:divide-gray-700"
            {
                @for transaction in transactions {
                    (transaction_item(transaction, kind, currency))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};
    use time::{OffsetDateTime, macros::date};

    use crate::{
        store::DocumentId,
        transaction::{
            Transaction, TransactionType,
            view::{ListKind, display_amount, display_date, icon_class, transaction_list},
        },
        user::{Currency, UserID},
    };

    fn transaction(amount: f64, transaction_type: TransactionType, category: &str) -> Transaction {
        Transaction {
            id: DocumentId::random(),
            user_id: UserID::new_random(),
            amount,
            category: category.to_owned(),
            date: date!(2025 - 10 - 09),
            description: "Something".to_owned(),
            transaction_type,
            receipt_url: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn icon_class_slugifies_category() {
        assert_eq!(icon_class("Food"), "icon-food");
        assert_eq!(icon_class("Other Income"), "icon-other-income");
    }

    #[test]
    fn amount_shows_magnitude_with_glyph() {
        assert_eq!(
            display_amount(25.0, TransactionType::Income, Currency::USD),
            "+ $25.00"
        );
        assert_eq!(
            display_amount(-25.0, TransactionType::Expense, Currency::USD),
            "- $25.00"
        );
    }

    #[test]
    fn date_format_depends_on_list() {
        assert_eq!(display_date(date!(2025 - 10 - 09), ListKind::Recent), "Oct 9");
        assert_eq!(
            display_date(date!(2025 - 10 - 09), ListKind::Full),
            "10/9/2025"
        );
    }

    #[test]
    fn empty_lists_show_message() {
        let recent = transaction_list(&[], ListKind::Recent, Currency::USD).into_string();
        let recent = Html::parse_fragment(&recent);
        let full = transaction_list(&[], ListKind::Full, Currency::USD).into_string();
        let full = Html::parse_fragment(&full);
        let p = Selector::parse("p").unwrap();

        let recent_text: String = recent.select(&p).next().unwrap().text().collect();
        let full_text: String = full.select(&p).next().unwrap().text().collect();
        assert_eq!(recent_text, "No recent transactions found.");
        assert_eq!(full_text, "No transactions found. Start adding one!");
    }

    #[test]
    fn renders_receipt_link_only_when_present() {
        let mut with_receipt = transaction(-12.0, TransactionType::Expense, "Food");
        with_receipt.receipt_url = Some("/receipts/u/1_r.png".to_owned());
        let without_receipt = transaction(100.0, TransactionType::Income, "Salary");

        let html = Html::parse_fragment(
            &transaction_list(&[with_receipt, without_receipt], ListKind::Full, Currency::USD)
                .into_string(),
        );

        let items: Vec<_> = html.select(&Selector::parse("li").unwrap()).collect();
        assert_eq!(items.len(), 2);
        let receipt_links: Vec<_> = html
            .select(&Selector::parse("a.receipt-link").unwrap())
            .map(|link| link.value().attr("href").unwrap())
            .collect();
        assert_eq!(receipt_links, ["/receipts/u/1_r.png"]);
        let amounts: Vec<String> = html
            .select(&Selector::parse("span.amount").unwrap())
            .map(|amount| amount.text().collect::<String>().trim().to_owned())
            .collect();
        assert_eq!(amounts, ["- $12.00", "+ $100.00"]);
    }
}
