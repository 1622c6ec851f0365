//! Output module for crawl reports and exports
//!
//! This module handles:
//! - Per-run crawl reports
//! - Statistics over a whole checkpoint (`--stats`)
//! - JSON export of the extracted data store (`--export`)

mod export;
pub mod stats;

pub use export::export_extracted;
pub use stats::{load_statistics, print_report, print_statistics, CrawlReport, CrawlStatistics};
