use serde::{Deserialize, Serialize};

use crate::models::TransactionRecord;

/// Transaction code the bank uses for its own fees.
pub const BANK_FEE_CODE: &str = "X_06";

/// Flags deciding which statement lines reach the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionFilter {
    /// Drop expenses (negative amounts).
    pub skip_negative: bool,
    /// Drop bank fee lines.
    pub skip_bank_fees: bool,
    /// Keep only strictly positive amounts.
    pub only_positive: bool,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            skip_negative: false,
            skip_bank_fees: true,
            only_positive: false,
        }
    }
}

impl TransactionFilter {
    /// Filter that lets everything through.
    pub fn none() -> Self {
        Self {
            skip_negative: false,
            skip_bank_fees: false,
            only_positive: false,
        }
    }

    pub fn accepts(&self, record: &TransactionRecord) -> bool {
        if self.skip_negative && record.amount.is_sign_negative() && !record.amount.is_zero() {
            return false;
        }
        if self.only_positive && (record.amount.is_zero() || record.amount.is_sign_negative()) {
            return false;
        }
        if self.skip_bank_fees && record.trn_code == BANK_FEE_CODE {
            return false;
        }
        true
    }

    /// Records that pass the filter, in input order.
    pub fn apply(&self, records: &[TransactionRecord]) -> Vec<TransactionRecord> {
        records.iter().filter(|r| self.accepts(r)).cloned().collect()
    }
}
