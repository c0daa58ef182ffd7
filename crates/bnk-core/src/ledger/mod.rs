//! Ledger export for the accounting system.

mod exporter;
pub mod format;

pub use exporter::{ExportOptions, LedgerExporter, LedgerLine};
pub use format::{apartment_account, clean_description, format_amount, format_date};
