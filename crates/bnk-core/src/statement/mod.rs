//! Bank statement input: XML parsing and pre-conversion filtering.

mod filter;
mod parser;

pub use filter::{TransactionFilter, BANK_FEE_CODE};
pub use parser::{parse_amount, parse_date, StatementParser};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::TransactionRecord;

/// A parsed bank statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub bank_name: String,
    pub iban: String,
    pub stmt_no: String,
    pub begin_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub begin_value: Decimal,
    pub end_value: Decimal,
    pub transactions: Vec<TransactionRecord>,
}

impl Statement {
    /// Month the statement covers: end date, then begin date, then the first
    /// transaction.
    pub fn month(&self) -> Option<u32> {
        use chrono::Datelike;
        self.end_date
            .or(self.begin_date)
            .or_else(|| self.transactions.first().map(|t| t.exe_date))
            .map(|d| d.month())
    }
}
