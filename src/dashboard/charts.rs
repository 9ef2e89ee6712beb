//! Chart generation and rendering for the dashboard and analytics pages.
//!
//! This module creates ECharts visualizations from the aggregated transactions:
//! - **Balance Trend**: Running balance at the end of each month
//! - **Income vs Expense**: Monthly totals for the last six months
//! - **Spending by Category**: This month's expenses per category
//!
//! Each chart is generated as JSON configuration for the ECharts library and
//! rendered with corresponding HTML containers and JavaScript initialization code.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Emphasis, EmphasisFocus, JsFunction,
        Tooltip, Trigger,
    },
    series::{Bar, Line, Pie},
};
use maud::{Markup, PreEscaped, html};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    dashboard::aggregation::{balance_trend, income_vs_expense, spending_by_category},
    html::HeadElement,
    transaction::Transaction,
    user::Currency,
};

/// The ECharts build loaded on pages with charts.
pub(super) const ECHARTS_SCRIPT: &str =
    "https://cdn.jsdelivr.net/npm/echarts@6.0.0/dist/echarts.min.js";

/// "Oct 2025"
const MONTH_LABEL_FORMAT: &[BorrowedFormatItem] = format_description!("[month repr:short] [year]");

/// A chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for `charts`.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for `charts`.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

fn month_label(month: Date) -> String {
    month.format(MONTH_LABEL_FORMAT).unwrap_or_else(|error| {
        tracing::error!("could not format month {month}: {error}");
        month.to_string()
    })
}

fn grid() -> Grid {
    Grid::new()
        .left("3%")
        .right("4%")
        .bottom("3%")
        .contain_label(true)
}

pub(super) fn balance_trend_chart(transactions: &[Transaction], currency: Currency) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) = balance_trend(transactions)
        .into_iter()
        .map(|(month, balance)| (month_label(month), balance))
        .unzip();

    Chart::new()
        .title(Title::new().text("Balance Trend").subtext("End of each month"))
        .tooltip(currency_tooltip(currency))
        .grid(grid())
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter(currency))),
        )
        .series(Line::new().name("Balance").data(values))
}

pub(super) fn income_vs_expense_chart(
    transactions: &[Transaction],
    today: Date,
    currency: Currency,
) -> Chart {
    let totals = income_vs_expense(transactions, today);
    let labels: Vec<String> = totals.iter().map(|total| month_label(total.month)).collect();
    let income: Vec<f64> = totals.iter().map(|total| total.income).collect();
    let expense: Vec<f64> = totals.iter().map(|total| total.expense).collect();

    Chart::new()
        .title(Title::new().text("Income vs Expense").subtext("Last six months"))
        .tooltip(currency_tooltip(currency))
        .legend(Legend::new().top("1%").right("4%"))
        .grid(grid().top(70))
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter(currency))),
        )
        .series(
            Bar::new()
                .name("Income")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(income),
        )
        .series(
            Bar::new()
                .name("Expense")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(expense),
        )
}

pub(super) fn spending_by_category_chart(
    transactions: &[Transaction],
    today: Date,
    currency: Currency,
) -> Chart {
    let data: Vec<(f64, &str)> = spending_by_category(transactions, today)
        .into_iter()
        .map(|(category, total)| (total, category))
        .collect();

    Chart::new()
        .title(Title::new().text("Spending by Category").subtext("This month"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter(currency)),
        )
        .legend(Legend::new().bottom("1%"))
        .series(
            Pie::new()
                .name("Spending")
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

fn currency_formatter(currency: Currency) -> JsFunction {
    JsFunction::new_with_args(
        "number",
        &format!(
            "const currencyFormatter = new Intl.NumberFormat('en-US', {{
              style: 'currency',
              currency: '{}'
            }});
            return (number) ? currencyFormatter.format(number) : \"-\";",
            currency.code()
        ),
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip(currency: Currency) -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter(currency))
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
