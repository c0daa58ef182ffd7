//! Bank statement transaction records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line of a bank statement.
///
/// Immutable once parsed; the converter only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Bank transaction code (e.g. `X_06` for bank fees).
    pub trn_code: String,

    /// Execution date.
    pub exe_date: NaiveDate,

    /// Creation date, when the bank supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creat_date: Option<NaiveDate>,

    /// Signed amount: positive is income, negative is expense.
    pub amount: Decimal,

    /// Account running value after the transaction.
    pub acc_value: Decimal,

    /// Real value.
    pub real_value: Decimal,

    /// Primary description field ("desc-base").
    pub desc_base: String,

    /// Secondary description field ("desc-opt"), often the payer name and address.
    pub desc_opt: String,
}

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionRecord {
    /// Create a record with the fields the pipeline actually reads.
    pub fn new(
        exe_date: NaiveDate,
        amount: Decimal,
        desc_base: impl Into<String>,
        desc_opt: impl Into<String>,
    ) -> Self {
        Self {
            trn_code: String::new(),
            exe_date,
            creat_date: None,
            amount,
            acc_value: Decimal::ZERO,
            real_value: amount,
            desc_base: desc_base.into(),
            desc_opt: desc_opt.into(),
        }
    }

    /// Set the bank transaction code.
    pub fn with_code(mut self, trn_code: impl Into<String>) -> Self {
        self.trn_code = trn_code.into();
        self
    }

    /// Income for zero and positive amounts, expense otherwise.
    pub fn kind(&self) -> TransactionKind {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
    }

    #[test]
    fn test_kind_by_sign() {
        let income = TransactionRecord::new(date(), Decimal::from_str("450.00").unwrap(), "a", "b");
        let zero = TransactionRecord::new(date(), Decimal::ZERO, "a", "b");
        let expense = TransactionRecord::new(date(), Decimal::from_str("-12.50").unwrap(), "a", "b");

        assert_eq!(income.kind(), TransactionKind::Income);
        assert_eq!(zero.kind(), TransactionKind::Income);
        assert_eq!(expense.kind(), TransactionKind::Expense);
    }

    #[test]
    fn test_serialized_field_names() {
        let record = TransactionRecord::new(date(), Decimal::ONE, "base", "opt").with_code("X_01");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["trnCode"], "X_01");
        assert_eq!(json["descBase"], "base");
        assert!(json.get("creatDate").is_none());
    }
}
