//! Ledger text and the audit companion report.

use std::fmt::Write;

use chrono::{Datelike, Local};

use super::format::{
    apartment_account, clean_description, format_amount, format_date, BANK_ACCOUNT,
    PLACEHOLDER_ACCOUNT,
};
use crate::models::{
    ClassifiedTransaction, DateFormat, ExportConfig, ExtractionMethod, MatchField,
    TransactionKind,
};

const HEADER: [&str; 7] = ["nr_dok", "nr_poz", "data_p", "tresc", "kwota", "k_wn", "k_ma"];
const RULE_WIDTH: usize = 80;

/// Layout options for the ledger export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub separator: String,
    pub date_format: DateFormat,
    pub decimal_separator: char,
    /// Month for the document number; the current month when unset.
    pub document_month: Option<u32>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            separator: config.separator.clone(),
            date_format: config.date_format,
            decimal_separator: config.decimal_separator,
            document_month: None,
        }
    }
}

impl ExportOptions {
    pub fn with_document_month(mut self, month: u32) -> Self {
        self.document_month = Some(month);
        self
    }
}

/// One posting line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLine {
    pub document: String,
    pub position: usize,
    pub date: String,
    pub description: String,
    pub amount: String,
    pub debit: String,
    pub credit: String,
}

impl LedgerLine {
    fn render(&self, separator: &str) -> String {
        [
            self.document.as_str(),
            &self.position.to_string(),
            &self.date,
            &self.description,
            &self.amount,
            &self.debit,
            &self.credit,
        ]
        .join(separator)
    }
}

/// Renders classified transactions for the accounting system.
#[derive(Debug, Clone, Default)]
pub struct LedgerExporter {
    options: ExportOptions,
}

impl LedgerExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// `BNK/MMMM` for the configured or current month.
    pub fn document_number(&self) -> String {
        let month = self
            .options
            .document_month
            .unwrap_or_else(|| Local::now().month());
        format!("BNK/{month:04}")
    }

    fn amount(&self, transaction: &ClassifiedTransaction) -> String {
        format_amount(transaction.record.amount.abs(), self.options.decimal_separator)
    }

    fn date(&self, transaction: &ClassifiedTransaction) -> String {
        format_date(transaction.record.exe_date, self.options.date_format)
    }

    /// Posting lines in ledger order.
    ///
    /// Unrecognized income comes first as single lines, then each recognized
    /// income as a bank/apartment pair, then one line per expense. Income
    /// markers count within all income, expense markers within expenses.
    pub fn lines(&self, transactions: &[ClassifiedTransaction]) -> Vec<LedgerLine> {
        let document = self.document_number();
        let mut lines = Vec::new();
        let mut position = 0;
        let mut push = |date: String, description: String, amount: String, debit: &str, credit: &str| {
            position += 1;
            lines.push(LedgerLine {
                document: document.clone(),
                position,
                date,
                description,
                amount,
                debit: debit.to_string(),
                credit: credit.to_string(),
            });
        };

        let income: Vec<&ClassifiedTransaction> = transactions
            .iter()
            .filter(|t| t.kind() == TransactionKind::Income)
            .collect();

        for (i, transaction) in income.iter().enumerate() {
            if transaction.apartment_number().is_none() {
                push(
                    self.date(transaction),
                    format!(
                        "NIEROZPOZNANE #{} {}",
                        i + 1,
                        clean_description(&transaction.record.desc_base)
                    ),
                    self.amount(transaction),
                    BANK_ACCOUNT,
                    PLACEHOLDER_ACCOUNT,
                );
            }
        }

        for transaction in &income {
            let Some(apartment) = transaction.apartment_number() else {
                continue;
            };
            let description = clean_description(&transaction.record.desc_base);
            let (date, amount) = (self.date(transaction), self.amount(transaction));
            push(date.clone(), description.clone(), amount.clone(), BANK_ACCOUNT, PLACEHOLDER_ACCOUNT);
            push(date, description, amount, PLACEHOLDER_ACCOUNT, &apartment_account(&apartment));
        }

        let expenses = transactions
            .iter()
            .filter(|t| t.kind() == TransactionKind::Expense);
        for (i, transaction) in expenses.enumerate() {
            let description = clean_description(&transaction.record.desc_base);
            let (description, debit) = match transaction.contractor() {
                Some(contractor) => (description, contractor.account_code.as_str()),
                None => (
                    format!("NIEROZPOZNANY KONTRAHENT #{} {description}", i + 1),
                    PLACEHOLDER_ACCOUNT,
                ),
            };
            push(
                self.date(transaction),
                description,
                self.amount(transaction),
                debit,
                BANK_ACCOUNT,
            );
        }

        lines
    }

    /// Header plus posting lines, newline separated.
    pub fn export(&self, transactions: &[ClassifiedTransaction]) -> String {
        let separator = self.options.separator.as_str();
        std::iter::once(HEADER.join(separator))
            .chain(self.lines(transactions).iter().map(|l| l.render(separator)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Human-readable audit report of every decision behind the ledger.
    pub fn export_auxiliary(&self, transactions: &[ClassifiedTransaction]) -> String {
        let mut out = String::new();
        let (income, expenses): (Vec<&ClassifiedTransaction>, Vec<&ClassifiedTransaction>) =
            transactions
                .iter()
                .partition(|t| t.kind() == TransactionKind::Income);

        if !income.is_empty() {
            section(&mut out, "WPŁATY (INCOME)");
            for (i, transaction) in income.iter().enumerate() {
                self.entry_heading(&mut out, i, transaction);
                match transaction.apartment_number() {
                    Some(apartment) => {
                        let _ = writeln!(out, "Rozpoznane mieszkanie: {apartment}");
                        let _ = writeln!(out, "Konto: {}", apartment_account(&apartment));
                        if let Some(address) = transaction.full_address() {
                            let _ = writeln!(out, "Adres: {address}");
                        }
                        if let Some(tenant) = transaction.tenant_name() {
                            let _ = writeln!(out, "Nazwa najemcy: {tenant}");
                        }
                    }
                    None => out.push_str("Status: NIEROZPOZNANE\n"),
                }
                decision(&mut out, transaction);
                entry_footer(&mut out);
            }
        }

        if !expenses.is_empty() {
            section(&mut out, "WYDATKI (EXPENSES) - DOPASOWANIE KONTRAHENTÓW");
            for (i, transaction) in expenses.iter().enumerate() {
                self.entry_heading(&mut out, i, transaction);
                match transaction.contractor() {
                    Some(contractor) => {
                        let _ = writeln!(out, "Dopasowany kontrahent: {}", contractor.name);
                        let _ = writeln!(out, "Konto kontrahenta: {}", contractor.account_code);
                        let matched_in = transaction.contractor_match().map(|m| m.matched_in);
                        match matched_in {
                            Some(MatchField::SecondaryDescription) => {
                                out.push_str("Dopasowano w: opis opcjonalny\n")
                            }
                            Some(MatchField::PrimaryDescription) => {
                                out.push_str("Dopasowano w: opis bazowy\n")
                            }
                            _ => {}
                        }
                    }
                    None => {
                        out.push_str("Status: NIEROZPOZNANY KONTRAHENT\n");
                        out.push_str("Wymaga ręcznego przypisania kontrahenta\n");
                    }
                }
                decision(&mut out, transaction);
                entry_footer(&mut out);
            }
        }

        section(&mut out, "PODSUMOWANIE");
        let _ = writeln!(out, "Łączna liczba transakcji: {}", transactions.len());
        let _ = writeln!(out, "  - Wpłaty: {}", income.len());
        let _ = write!(out, "  - Wydatki: {}", expenses.len());
        if !expenses.is_empty() {
            let matched = expenses.iter().filter(|t| t.contractor().is_some()).count();
            let rate = matched as f64 / expenses.len() as f64 * 100.0;
            let _ = write!(
                out,
                "\n  - Wydatki rozpoznane: {matched}\n  - Wydatki nierozpoznane: {}\n  - Wskaźnik dopasowania: {rate:.1}%",
                expenses.len() - matched
            );
        }
        out
    }

    fn entry_heading(&self, out: &mut String, i: usize, transaction: &ClassifiedTransaction) {
        let record = &transaction.record;
        let _ = writeln!(out, "Pozycja #{}", i + 1);
        let _ = writeln!(out, "Data: {}", self.date(transaction));
        let _ = writeln!(out, "Kwota: {}", self.amount(transaction));
        let _ = writeln!(out, "Opis bazowy: {}", record.desc_base);
        if !record.desc_opt.trim().is_empty() {
            let _ = writeln!(out, "Opis opcjonalny: {}", record.desc_opt);
        }
    }
}

fn section(out: &mut String, title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "{rule}\n{title}\n{rule}");
    if title != "PODSUMOWANIE" {
        out.push('\n');
    }
}

fn entry_footer(out: &mut String) {
    let _ = writeln!(out, "{}\n", "-".repeat(RULE_WIDTH));
}

fn method_label(method: ExtractionMethod) -> &'static str {
    match method {
        ExtractionMethod::PatternMatch => "dopasowanie wzorca",
        ExtractionMethod::ExternalReasoning => "analiza zewnętrzna",
        ExtractionMethod::CacheHit => "pamięć podręczna",
        ExtractionMethod::ManualFallback => "brak, wymaga ręcznego uzupełnienia",
    }
}

/// Confidence, method, reasoning, warnings and any correction.
fn decision(out: &mut String, transaction: &ClassifiedTransaction) {
    let _ = writeln!(out, "Pewność: {}%", transaction.confidence());
    let _ = writeln!(out, "Metoda: {}", method_label(transaction.method()));
    let reasoning = match transaction.extraction() {
        Some(extracted) => extracted.reasoning.as_deref(),
        None => transaction.contractor_match().and_then(|m| m.reasoning.as_deref()),
    };
    if let Some(reasoning) = reasoning {
        let _ = writeln!(out, "Uzasadnienie: {reasoning}");
    }
    if !transaction.warnings().is_empty() {
        let _ = writeln!(out, "Ostrzeżenia: {}", transaction.warnings().join(", "));
    }
    if let Some(correction) = &transaction.correction {
        let _ = writeln!(
            out,
            "Korekta: {} ({})",
            correction.corrected_by,
            correction.corrected_at.format("%Y-%m-%d %H:%M")
        );
    }
}
