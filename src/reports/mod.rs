pub mod aggregate;
pub mod date_range;
pub mod filter;
pub mod transfer;

pub use aggregate::DashboardStats;
pub use date_range::{DateRange, UnknownDateRange};
pub use filter::{FilterError, ReportFilter};
