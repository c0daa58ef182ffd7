//! Santander-style statement XML parser.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use super::Statement;
use crate::error::StatementError;
use crate::models::TransactionRecord;

#[derive(Debug, Default, Deserialize)]
struct RawStatement {
    #[serde(rename = "bank-unit", default)]
    bank_unit: Option<RawBankUnit>,
    #[serde(default)]
    account: Option<RawAccount>,
    #[serde(default)]
    stmt: Option<RawStmt>,
    #[serde(default)]
    transactions: Option<RawTransactions>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBankUnit {
    #[serde(rename = "bank-name", default)]
    bank_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAccount {
    #[serde(default)]
    iban: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStmt {
    #[serde(rename = "stmt-no", default)]
    stmt_no: Option<String>,
    #[serde(default)]
    begin: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(rename = "begin-value", default)]
    begin_value: Option<String>,
    #[serde(rename = "end-value", default)]
    end_value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTransactions {
    #[serde(default)]
    trn: Vec<RawTrn>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTrn {
    #[serde(rename = "trn-code", default)]
    trn_code: Option<String>,
    #[serde(rename = "exe-date", default)]
    exe_date: Option<String>,
    #[serde(rename = "creat-date", default)]
    creat_date: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(rename = "acc-value", default)]
    acc_value: Option<String>,
    #[serde(rename = "real-value", default)]
    real_value: Option<String>,
    #[serde(rename = "desc-base", default)]
    desc_base: Option<String>,
    #[serde(rename = "desc-opt", default)]
    desc_opt: Option<String>,
}

fn text(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Parse a `DD/MM/YYYY` date (ISO `YYYY-MM-DD` is also accepted).
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, StatementError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| StatementError::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        })
}

/// Parse an amount with `.` or `,` as the decimal separator.
pub fn parse_amount(field: &str, value: &str) -> Result<Decimal, StatementError> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{00a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    Decimal::from_str(&cleaned).map_err(|_| StatementError::InvalidAmount {
        field: field.to_string(),
        value: value.trim().to_string(),
    })
}

fn optional_date(field: &str, value: Option<String>) -> Result<Option<NaiveDate>, StatementError> {
    let value = text(value);
    if value.is_empty() {
        return Ok(None);
    }
    parse_date(field, &value).map(Some)
}

fn optional_amount(field: &str, value: Option<String>) -> Result<Decimal, StatementError> {
    let value = text(value);
    if value.is_empty() {
        return Ok(Decimal::ZERO);
    }
    parse_amount(field, &value)
}

/// Parser for statement XML exports.
#[derive(Debug, Default, Clone)]
pub struct StatementParser;

impl StatementParser {
    pub fn new() -> Self {
        Self
    }

    /// Strip byte order marks and anything before the first tag.
    fn clean(content: &str) -> Result<&str, StatementError> {
        let content = content.trim_start_matches(['\u{feff}', '\u{fffe}']);
        let start = content.find('<').ok_or(StatementError::NoXml)?;
        if start > 0 {
            debug!(skipped = start, "dropping bytes before XML start");
        }
        Ok(content[start..].trim())
    }

    /// Parse statement XML into records. Any malformed field fails the whole
    /// document.
    pub fn parse(&self, content: &str) -> Result<Statement, StatementError> {
        let xml = Self::clean(content)?;
        let raw: RawStatement =
            quick_xml::de::from_str(xml).map_err(|e| StatementError::Parse(e.to_string()))?;

        let stmt = raw.stmt.unwrap_or_default();
        let transactions = raw
            .transactions
            .unwrap_or_default()
            .trn
            .into_iter()
            .enumerate()
            .map(|(i, trn)| Self::record(i, trn))
            .collect::<Result<Vec<_>, _>>()?;

        let statement = Statement {
            bank_name: text(raw.bank_unit.and_then(|b| b.bank_name)),
            iban: text(raw.account.and_then(|a| a.iban)),
            stmt_no: text(stmt.stmt_no),
            begin_date: optional_date("begin", stmt.begin)?,
            end_date: optional_date("end", stmt.end)?,
            begin_value: optional_amount("begin-value", stmt.begin_value)?,
            end_value: optional_amount("end-value", stmt.end_value)?,
            transactions,
        };

        info!(
            transactions = statement.transactions.len(),
            stmt_no = %statement.stmt_no,
            "parsed statement"
        );
        Ok(statement)
    }

    fn record(index: usize, trn: RawTrn) -> Result<TransactionRecord, StatementError> {
        let exe_date = text(trn.exe_date);
        let value = text(trn.value);
        Ok(TransactionRecord {
            trn_code: text(trn.trn_code),
            exe_date: parse_date(&format!("trn[{index}].exe-date"), &exe_date)?,
            creat_date: optional_date(&format!("trn[{index}].creat-date"), trn.creat_date)?,
            amount: parse_amount(&format!("trn[{index}].value"), &value)?,
            acc_value: optional_amount(&format!("trn[{index}].acc-value"), trn.acc_value)?,
            real_value: optional_amount(&format!("trn[{index}].real-value"), trn.real_value)?,
            desc_base: text(trn.desc_base),
            desc_opt: text(trn.desc_opt),
        })
    }
}
