pub mod aggregate;
pub mod models;
pub mod render;

pub use aggregate::{generate_report, DAYS_WINDOW_A, DAYS_WINDOW_B, OLDER_REPORT_OFFSET_DAYS};
pub use models::{CountEntry, CountTable, Report, SubReport};
