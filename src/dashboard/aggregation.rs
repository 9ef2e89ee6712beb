//! Folds a user's transactions into the totals shown on the dashboard and
//! the series plotted in the charts.
//!
//! Every function takes the reference date explicitly instead of reading the
//! clock, the handlers pass in today's date in the server's timezone.

use std::collections::BTreeMap;

use time::{Date, Duration};

use crate::transaction::{Transaction, TransactionType, categories_for};

/// The number of months shown in the income vs expense chart, including the current month.
pub(super) const INCOME_EXPENSE_MONTHS: usize = 6;

/// The three headline numbers on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DashboardStats {
    /// The sum of every transaction amount, all time.
    pub total_balance: f64,
    /// The income recorded in the current calendar month.
    pub monthly_income: f64,
    /// The magnitude of the expenses recorded in the current calendar month.
    pub monthly_expense: f64,
}

/// The first day of the month `date` falls in.
pub(super) fn month_start(date: Date) -> Date {
    date - Duration::days(i64::from(date.day()) - 1)
}

fn is_same_month(date: Date, today: Date) -> bool {
    date.year() == today.year() && date.month() == today.month()
}

/// Compute the dashboard totals, treating the month containing `today` as
/// the current month.
///
/// Income and expenses are classified by the transaction type, not the sign
/// of the amount.
pub fn summarize(transactions: &[Transaction], today: Date) -> DashboardStats {
    let mut stats = DashboardStats::default();

    for transaction in transactions {
        stats.total_balance += transaction.amount;

        if !is_same_month(transaction.date, today) {
            continue;
        }

        match transaction.transaction_type {
            TransactionType::Income => stats.monthly_income += transaction.amount,
            TransactionType::Expense => stats.monthly_expense += transaction.amount.abs(),
        }
    }

    stats
}

/// The running balance at the end of each month that has transactions,
/// oldest month first.
pub(super) fn balance_trend(transactions: &[Transaction]) -> Vec<(Date, f64)> {
    let mut monthly_totals: BTreeMap<Date, f64> = BTreeMap::new();

    for transaction in transactions {
        *monthly_totals
            .entry(month_start(transaction.date))
            .or_insert(0.0) += transaction.amount;
    }

    let mut balance = 0.0;

    monthly_totals
        .into_iter()
        .map(|(month, total)| {
            balance += total;
            (month, balance)
        })
        .collect()
}

/// Income and expense totals for one month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct MonthlyIncomeExpense {
    /// The first day of the month.
    pub month: Date,
    pub income: f64,
    /// The magnitude of the month's expenses.
    pub expense: f64,
}

/// The first day of each of the last `count` months, ending with the month of `today`.
pub(super) fn last_months(today: Date, count: usize) -> Vec<Date> {
    let mut months = Vec::with_capacity(count);
    let mut month = month_start(today);

    for _ in 0..count {
        months.push(month);
        month = month_start(month - Duration::days(1));
    }

    months.reverse();
    months
}

/// Income and expense totals for each of the last [INCOME_EXPENSE_MONTHS]
/// months, oldest first. Months without transactions are zero.
pub(super) fn income_vs_expense(
    transactions: &[Transaction],
    today: Date,
) -> Vec<MonthlyIncomeExpense> {
    let mut totals: Vec<MonthlyIncomeExpense> = last_months(today, INCOME_EXPENSE_MONTHS)
        .into_iter()
        .map(|month| MonthlyIncomeExpense {
            month,
            income: 0.0,
            expense: 0.0,
        })
        .collect();

    for transaction in transactions {
        let month = month_start(transaction.date);

        let Some(entry) = totals.iter_mut().find(|entry| entry.month == month) else {
            continue;
        };

        match transaction.transaction_type {
            TransactionType::Income => entry.income += transaction.amount,
            TransactionType::Expense => entry.expense += transaction.amount.abs(),
        }
    }

    totals
}

/// The magnitude of this month's expenses per category, in the order of the
/// expense category list. Categories with no spending are left out.
pub(super) fn spending_by_category(
    transactions: &[Transaction],
    today: Date,
) -> Vec<(&'static str, f64)> {
    categories_for(TransactionType::Expense)
        .iter()
        .map(|&category| {
            let total = transactions
                .iter()
                .filter(|transaction| {
                    transaction.transaction_type == TransactionType::Expense
                        && transaction.category == category
                        && is_same_month(transaction.date, today)
                })
                .map(|transaction| transaction.amount.abs())
                .sum();

            (category, total)
        })
        .filter(|(_, total)| *total != 0.0)
        .collect()
}
