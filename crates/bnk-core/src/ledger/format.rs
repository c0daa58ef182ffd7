//! Pure formatting helpers for ledger lines.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::DateFormat;

/// Bank clearing account.
pub const BANK_ACCOUNT: &str = "131-1";

/// Account column placeholder for the side left open.
pub const PLACEHOLDER_ACCOUNT: &str = "   -";

/// Apartment code of the managing company, booked on the all-zero account.
pub const MANAGER_APARTMENT: &str = "ZGN";

const APARTMENT_ACCOUNT_PREFIX: &str = "204-";
const APARTMENT_ACCOUNT_DIGITS: usize = 6;

/// Two-decimal amount with the given decimal separator.
pub fn format_amount(amount: Decimal, decimal_separator: char) -> String {
    let mut value = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(2);
    let text = value.to_string();
    if decimal_separator == '.' {
        text
    } else {
        text.replace('.', &decimal_separator.to_string())
    }
}

pub fn format_date(date: NaiveDate, format: DateFormat) -> String {
    let pattern = match format {
        DateFormat::DayMonthYearDots => "%-d.%m.%Y",
        DateFormat::DayMonthYearSlashes => "%d/%m/%Y",
        DateFormat::Iso => "%Y-%m-%d",
    };
    date.format(pattern).to_string()
}

/// Receivables account for an apartment: `204-` and the digits padded to six.
///
/// `ZGN` maps to `204-000000`.
pub fn apartment_account(apartment: &str) -> String {
    let apartment = apartment.trim();
    if apartment.eq_ignore_ascii_case(MANAGER_APARTMENT) {
        return format!("{APARTMENT_ACCOUNT_PREFIX}{}", "0".repeat(APARTMENT_ACCOUNT_DIGITS));
    }
    let digits: String = apartment.chars().filter(char::is_ascii_digit).collect();
    format!(
        "{APARTMENT_ACCOUNT_PREFIX}{digits:0>width$}",
        width = APARTMENT_ACCOUNT_DIGITS
    )
}

/// Trim and collapse whitespace runs.
pub fn clean_description(description: &str) -> String {
    description.split_whitespace().collect::<Vec<_>>().join(" ")
}
