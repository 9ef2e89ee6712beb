//! Dashboard and analytics HTTP handlers and view rendering.
//!
//! This module contains:
//! - Route handlers for the dashboard and analytics pages
//! - HTML view functions for rendering both pages
//! - The state used by the handlers

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    auth::get_account,
    dashboard::{
        aggregation::{DashboardStats, summarize},
        cards::stat_cards_view,
        charts::{
            DashboardChart, ECHARTS_SCRIPT, balance_trend_chart, charts_script, charts_view,
            income_vs_expense_chart, spending_by_category_chart,
        },
    },
    endpoints,
    html::{CARD_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base, link},
    navigation::NavBar,
    store::SQLiteDocumentStore,
    timezone::today_in,
    transaction::{
        ListKind, RECENT_TRANSACTIONS_LIMIT, Transaction, load_transactions, transaction_list,
    },
    user::{Currency, UserID, preferred_currency},
};

/// The name used in the welcome message when the user has not set one.
const DEFAULT_DISPLAY_NAME: &str = "clever";

/// The state needed for the dashboard and analytics pages.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection, used to look up the user's display name.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The store holding profiles and transactions.
    pub store: SQLiteDocumentStore,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            store: state.store.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The welcome message at the top of the dashboard.
fn welcome_message(display_name: Option<&str>) -> String {
    let name = display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DISPLAY_NAME);

    format!("Welcome back, {name}!")
}

fn get_display_name(user_id: UserID, state: &DashboardState) -> Result<Option<String>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let account = get_account(user_id, &connection)
        .inspect_err(|error| tracing::error!("could not get account {user_id}: {error}"))?;

    Ok(account.display_name)
}

/// Everything both pages need: today's date, the user's currency and their transactions.
async fn load_page_data(
    user_id: UserID,
    state: &DashboardState,
) -> Result<(Date, Currency, Vec<Transaction>), Error> {
    let today = today_in(&state.local_timezone)?;
    let currency = preferred_currency(user_id, &state.store)
        .await
        .inspect_err(|error| tracing::error!("could not get profile for {user_id}: {error}"))?;
    let transactions = load_transactions(user_id, None, &state.store)
        .await
        .inspect_err(|error| tracing::error!("could not get transactions for {user_id}: {error}"))?;

    Ok((today, currency, transactions))
}

/// Display a page with an overview of the user's finances.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let display_name = get_display_name(user_id, &state)?;
    let (today, currency, transactions) = load_page_data(user_id, &state).await?;

    let stats = summarize(&transactions, today);
    let recent = &transactions[..transactions.len().min(RECENT_TRANSACTIONS_LIMIT)];
    let charts = [DashboardChart {
        id: "balance-trend-chart",
        options: balance_trend_chart(&transactions, currency).to_string(),
    }];

    Ok(dashboard_view(
        &welcome_message(display_name.as_deref()),
        &stats,
        recent,
        currency,
        &charts,
    )
    .into_response())
}

fn dashboard_view(
    welcome_message: &str,
    stats: &DashboardStats,
    recent_transactions: &[Transaction],
    currency: Currency,
    charts: &[DashboardChart],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl space-y-6"
            {
                h1 id="welcome-message" class="text-2xl font-bold" { (welcome_message) }

                (stat_cards_view(stats, currency))

                section class=(CARD_STYLE)
                {
                    div class="flex justify-between items-baseline mb-4"
                    {
                        h2 class="text-xl font-semibold" { "Recent Transactions" }
                        (link(endpoints::TRANSACTIONS_VIEW, "View all"))
                    }

                    div id="recent-transactions-list"
                    {
                        (transaction_list(recent_transactions, ListKind::Recent, currency))
                    }
                }

                (charts_view(charts))
            }
        }
    );

    let scripts = [
        HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned()),
        charts_script(charts),
    ];

    base("Dashboard", &scripts, &content)
}

/// Display charts comparing income and expenses and breaking down this month's spending.
pub async fn get_analytics_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let (today, currency, transactions) = load_page_data(user_id, &state).await?;

    let charts = [
        DashboardChart {
            id: "income-vs-expense-chart",
            options: income_vs_expense_chart(&transactions, today, currency).to_string(),
        },
        DashboardChart {
            id: "spending-by-category-chart",
            options: spending_by_category_chart(&transactions, today, currency).to_string(),
        },
    ];

    Ok(analytics_view(&charts).into_response())
}

fn analytics_view(charts: &[DashboardChart]) -> Markup {
    let nav_bar = NavBar::new(endpoints::ANALYTICS_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl space-y-6"
            {
                h1 class="text-2xl font-bold" { "Analytics" }

                (charts_view(charts))
            }
        }
    );

    let scripts = [
        HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned()),
        charts_script(charts),
    ];

    base("Analytics", &scripts, &content)
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use scraper::{Html, Selector};

    use crate::{
        AppState,
        dashboard::handlers::{
            DashboardState, get_analytics_page, get_dashboard_page, welcome_message,
        },
        test_utils::{
            assert_valid_html, create_test_user, get_test_app_state, parse_html_document,
        },
        timezone::today_in,
        transaction::{NewTransaction, create_transaction},
        user::UserID,
    };

    fn text_of(html: &Html, selector: &str) -> String {
        html.select(&Selector::parse(selector).unwrap())
            .next()
            .unwrap_or_else(|| panic!("No element matches {selector}"))
            .text()
            .collect::<String>()
            .trim()
            .to_owned()
    }

    #[track_caller]
    fn assert_chart_exists(html: &Html, chart_id: &str) {
        let selector = Selector::parse(&format!("#{}", chart_id)).unwrap();
        assert!(
            html.select(&selector).next().is_some(),
            "Chart with id '{}' not found",
            chart_id
        );
    }

    async fn add(
        state: &AppState,
        user_id: UserID,
        transaction_type: &str,
        amount: &str,
        category: &str,
        date: &str,
    ) {
        let transaction =
            NewTransaction::parse(transaction_type, amount, category, date, "test").unwrap();
        create_transaction(user_id, &transaction, None, &state.store)
            .await
            .unwrap();
    }

    async fn get_page(state: &AppState, user_id: UserID) -> Response {
        get_dashboard_page(
            State(DashboardState {
                db_connection: state.db_connection.clone(),
                store: state.store.clone(),
                local_timezone: state.local_timezone.clone(),
            }),
            Extension(user_id),
        )
        .await
        .into_response()
    }

    #[test]
    fn welcome_message_falls_back_to_clever() {
        assert_eq!(welcome_message(Some("Ann")), "Welcome back, Ann!");
        assert_eq!(welcome_message(Some("  ")), "Welcome back, clever!");
        assert_eq!(welcome_message(None), "Welcome back, clever!");
    }

    #[tokio::test]
    async fn dashboard_shows_stats_and_recent_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        let user_id = create_test_user(&state, "ann@example.com", "hunter2", "Ann").await;
        let today = today_in("Etc/UTC").unwrap().to_string();
        add(&state, user_id, "income", "100", "Salary", &today).await;
        add(&state, user_id, "expense", "40", "Food", &today).await;
        add(&state, user_id, "expense", "10", "Food", "2001-01-01").await;

        let response = get_page(&state, user_id).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(text_of(&html, "#welcome-message"), "Welcome back, Ann!");
        assert_eq!(text_of(&html, "#total-balance"), "$50.00");
        assert_eq!(text_of(&html, "#monthly-income"), "$100.00");
        assert_eq!(text_of(&html, "#monthly-expense"), "$40.00");
        let items = html
            .select(&Selector::parse("#recent-transactions-list li").unwrap())
            .count();
        assert_eq!(items, 3);
        assert_chart_exists(&html, "balance-trend-chart");
    }

    #[tokio::test]
    async fn dashboard_shows_at_most_five_recent_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        let user_id = create_test_user(&state, "ann@example.com", "hunter2", "Ann").await;
        for day in 1..=7 {
            add(&state, user_id, "expense", "1", "Other", &format!("2025-01-{day:02}")).await;
        }

        let html = parse_html_document(get_page(&state, user_id).await).await;

        let items = html
            .select(&Selector::parse("#recent-transactions-list li").unwrap())
            .count();
        assert_eq!(items, 5);
        assert_eq!(
            text_of(&html, "#recent-transactions-list li span.date"),
            "Jan 7"
        );
    }

    #[tokio::test]
    async fn dashboard_without_transactions_shows_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        let user_id = create_test_user(&state, "ann@example.com", "hunter2", "Ann").await;

        let html = parse_html_document(get_page(&state, user_id).await).await;

        assert_eq!(
            text_of(&html, "#recent-transactions-list p"),
            "No recent transactions found."
        );
        assert_eq!(text_of(&html, "#total-balance"), "$0.00");
    }

    #[tokio::test]
    async fn dashboard_for_unknown_account_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());

        let response = get_page(&state, UserID::new_random()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn analytics_page_renders_both_charts() {
        let dir = tempfile::tempdir().unwrap();
        let state = get_test_app_state(dir.path());
        let user_id = create_test_user(&state, "ann@example.com", "hunter2", "Ann").await;

        let response = get_analytics_page(
            State(DashboardState {
                db_connection: state.db_connection.clone(),
                store: state.store.clone(),
                local_timezone: state.local_timezone.clone(),
            }),
            Extension(user_id),
        )
        .await
        .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_chart_exists(&html, "income-vs-expense-chart");
        assert_chart_exists(&html, "spending-by-category-chart");
    }
}
