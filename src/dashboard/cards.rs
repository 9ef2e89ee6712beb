//! Card components for the dashboard's headline numbers.

use maud::{Markup, html};

use crate::{dashboard::aggregation::DashboardStats, html::format_currency, user::Currency};

fn stat_card(id: &str, title: &str, value: &str, value_class: &str) -> Markup {
    html! {
        div class="p-6 bg-white rounded-lg shadow dark:bg-gray-800 dark:border dark:border-gray-700"
        {
            h3 class="text-sm font-medium text-gray-500 dark:text-gray-400" { (title) }
            p id=(id) class={ "mt-2 text-2xl font-bold " (value_class) } { (value) }
        }
    }
}

/// Renders the total balance, this month's income, and this month's expenses.
pub(super) fn stat_cards_view(stats: &DashboardStats, currency: Currency) -> Markup {
    let balance_class = if stats.total_balance < 0.0 {
        "text-red-700 dark:text-red-300"
    } else {
        "text-gray-900 dark:text-white"
    };

    html! {
        section class="w-full grid grid-cols-1 md:grid-cols-3 gap-4"
        {
            (stat_card(
                "total-balance",
                "Total Balance",
                &format_currency(stats.total_balance, currency),
                balance_class,
            ))
            (stat_card(
                "monthly-income",
                "Income This Month",
                &format_currency(stats.monthly_income, currency),
                "text-green-700 dark:text-green-300",
            ))
            (stat_card(
                "monthly-expense",
                "Expenses This Month",
                &format_currency(stats.monthly_expense, currency),
                "text-red-700 dark:text-red-300",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use crate::{
        dashboard::{aggregation::DashboardStats, cards::stat_cards_view},
        user::Currency,
    };

    fn stat_text(html: &Html, id: &str) -> String {
        html.select(&Selector::parse(&format!("#{id}")).unwrap())
            .next()
            .unwrap_or_else(|| panic!("No element with id {id}"))
            .text()
            .collect()
    }

    #[test]
    fn formats_stats_in_currency() {
        let stats = DashboardStats {
            total_balance: -234.5,
            monthly_income: 100.0,
            monthly_expense: 40.0,
        };

        let html = Html::parse_fragment(&stat_cards_view(&stats, Currency::USD).into_string());

        assert_eq!(stat_text(&html, "total-balance"), "-$234.50");
        assert_eq!(stat_text(&html, "monthly-income"), "$100.00");
        assert_eq!(stat_text(&html, "monthly-expense"), "$40.00");
    }
}
