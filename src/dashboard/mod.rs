//! Dashboard module
//!
//! Provides the overview page with the headline numbers, the most recent
//! transactions and the balance trend, and the analytics page with the
//! income vs expense and spending by category charts.

mod aggregation;
mod cards;
mod charts;
mod handlers;

pub use aggregation::{DashboardStats, summarize};
pub use handlers::{get_analytics_page, get_dashboard_page};
