//! Classified transactions and review status.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::contractor::{Contractor, ContractorMatchResult};
use super::extraction::{ExtractionMethod, ExtractionResult};
use super::transaction::{TransactionKind, TransactionRecord};

lazy_static! {
    // "Joliot-Curie 3/27", "3/27", "Joliot-Curie 3 m. 27", "ZGN"
    static ref ADDRESS_APARTMENT: Regex =
        Regex::new(r"(?i)(?:\d+\s*/\s*|\d+\s+m\.?\s*)(\w+)\s*$").unwrap();
}

/// Review tier assigned after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewStatus {
    AutoApproved,
    NeedsReview,
    NeedsManualInput,
}

/// Thresholds that split confidence into review tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// At or above: auto-approved.
    pub auto_approve: u8,
    /// At or above (and below `auto_approve`): needs review.
    pub needs_review: u8,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            auto_approve: 85,
            needs_review: 60,
        }
    }
}

impl ConfidenceThresholds {
    pub fn status_for(&self, confidence: u8) -> ReviewStatus {
        if confidence >= self.auto_approve {
            ReviewStatus::AutoApproved
        } else if confidence >= self.needs_review {
            ReviewStatus::NeedsReview
        } else {
            ReviewStatus::NeedsManualInput
        }
    }
}

/// Machine-derived outcome for one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "result", rename_all = "lowercase")]
pub enum Classification {
    Income(ExtractionResult),
    Expense(ContractorMatchResult),
}

/// A user-supplied correction. Always wins over machine-derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    #[serde(default)]
    pub full_address: Option<String>,
    #[serde(default)]
    pub tenant_name: Option<String>,
    /// Explicit apartment; derived from `full_address` when absent.
    #[serde(default)]
    pub apartment_number: Option<String>,
    /// Contractor for expense corrections.
    #[serde(default)]
    pub contractor: Option<Contractor>,
    pub corrected_by: String,
    pub corrected_at: DateTime<Utc>,
}

impl Correction {
    /// Correction by `who`, timestamped now.
    pub fn by(who: impl Into<String>) -> Self {
        Self {
            full_address: None,
            tenant_name: None,
            apartment_number: None,
            contractor: None,
            corrected_by: who.into(),
            corrected_at: Utc::now(),
        }
    }

    pub fn with_address(mut self, full_address: impl Into<String>) -> Self {
        self.full_address = Some(full_address.into());
        self
    }

    pub fn with_tenant(mut self, tenant_name: impl Into<String>) -> Self {
        self.tenant_name = Some(tenant_name.into());
        self
    }

    pub fn with_contractor(mut self, contractor: Contractor) -> Self {
        self.contractor = Some(contractor);
        self
    }

    /// Apartment number from the explicit field or the trailing unit of the address.
    pub fn apartment(&self) -> Option<String> {
        if let Some(apartment) = self.apartment_number.as_deref().map(str::trim) {
            if !apartment.is_empty() {
                return Some(apartment.to_string());
            }
        }
        let address = self.full_address.as_deref()?.trim();
        if address.eq_ignore_ascii_case("zgn") {
            return Some(address.to_uppercase());
        }
        ADDRESS_APARTMENT
            .captures(address)
            .map(|caps| caps[1].to_string())
    }
}

/// A transaction together with its classification and review status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedTransaction {
    pub record: TransactionRecord,
    pub classification: Classification,
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<Correction>,
}

impl ClassifiedTransaction {
    /// Classify `record`, computing the status from the relevant confidence.
    pub fn new(
        record: TransactionRecord,
        classification: Classification,
        thresholds: &ConfidenceThresholds,
    ) -> Self {
        let confidence = match &classification {
            Classification::Income(extracted) => extracted.confidence.overall(),
            Classification::Expense(matched) => matched.confidence,
        };
        Self {
            record,
            classification,
            status: thresholds.status_for(confidence),
            correction: None,
        }
    }

    pub fn kind(&self) -> TransactionKind {
        match self.classification {
            Classification::Income(_) => TransactionKind::Income,
            Classification::Expense(_) => TransactionKind::Expense,
        }
    }

    /// Confidence the status was computed from.
    pub fn confidence(&self) -> u8 {
        match &self.classification {
            Classification::Income(extracted) => extracted.confidence.overall(),
            Classification::Expense(matched) => matched.confidence,
        }
    }

    pub fn method(&self) -> ExtractionMethod {
        match &self.classification {
            Classification::Income(extracted) => extracted.method,
            Classification::Expense(matched) => matched.method,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match &self.classification {
            Classification::Income(extracted) => &extracted.warnings,
            Classification::Expense(matched) => &matched.warnings,
        }
    }

    pub fn extraction(&self) -> Option<&ExtractionResult> {
        match &self.classification {
            Classification::Income(extracted) => Some(extracted),
            Classification::Expense(_) => None,
        }
    }

    pub fn contractor_match(&self) -> Option<&ContractorMatchResult> {
        match &self.classification {
            Classification::Expense(matched) => Some(matched),
            Classification::Income(_) => None,
        }
    }

    /// Apartment number, preferring a correction.
    pub fn apartment_number(&self) -> Option<String> {
        if let Some(apartment) = self.correction.as_ref().and_then(Correction::apartment) {
            return Some(apartment);
        }
        self.extraction()
            .and_then(ExtractionResult::apartment)
            .map(str::to_string)
    }

    /// Tenant name, preferring a correction.
    pub fn tenant_name(&self) -> Option<&str> {
        self.correction
            .as_ref()
            .and_then(|c| c.tenant_name.as_deref())
            .or_else(|| self.extraction().and_then(|e| e.tenant_name.as_deref()))
    }

    /// Full address, preferring a correction.
    pub fn full_address(&self) -> Option<&str> {
        self.correction
            .as_ref()
            .and_then(|c| c.full_address.as_deref())
            .or_else(|| self.extraction().and_then(|e| e.full_address.as_deref()))
    }

    /// Contractor, preferring a correction.
    pub fn contractor(&self) -> Option<&Contractor> {
        self.correction
            .as_ref()
            .and_then(|c| c.contractor.as_ref())
            .or_else(|| self.contractor_match().and_then(|m| m.contractor.as_ref()))
    }

    /// Attach a user correction.
    pub fn apply_correction(&mut self, correction: Correction) {
        self.correction = Some(correction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, MatchField, RawDescriptions};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn record() -> TransactionRecord {
        TransactionRecord::new(
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            Decimal::new(45000, 2),
            "CZYNSZ",
            "JAN KOWALSKI",
        )
    }

    fn extraction(apartment: Option<&str>, apartment_conf: u8) -> ExtractionResult {
        ExtractionResult {
            street_name: None,
            building_number: None,
            apartment_number: apartment.map(str::to_string),
            full_address: None,
            tenant_name: Some("Jan Kowalski".into()),
            confidence: Confidence::from_apartment(0, apartment_conf, 75),
            method: ExtractionMethod::PatternMatch,
            reasoning: None,
            warnings: Vec::new(),
            raw: RawDescriptions::default(),
        }
    }

    #[test]
    fn test_status_tier_boundaries() {
        let t = ConfidenceThresholds::default();
        assert_eq!(t.status_for(100), ReviewStatus::AutoApproved);
        assert_eq!(t.status_for(85), ReviewStatus::AutoApproved);
        assert_eq!(t.status_for(84), ReviewStatus::NeedsReview);
        assert_eq!(t.status_for(60), ReviewStatus::NeedsReview);
        assert_eq!(t.status_for(59), ReviewStatus::NeedsManualInput);
        assert_eq!(t.status_for(0), ReviewStatus::NeedsManualInput);
    }

    #[test]
    fn test_income_status_uses_overall() {
        let classified = ClassifiedTransaction::new(
            record(),
            Classification::Income(extraction(Some("7"), 70)),
            &ConfidenceThresholds::default(),
        );
        assert_eq!(classified.status, ReviewStatus::NeedsReview);
        assert_eq!(classified.kind(), TransactionKind::Income);
    }

    #[test]
    fn test_expense_status_uses_match_confidence() {
        let matched = ContractorMatchResult::new(
            Contractor::new(1, "ENERGA", "201-1"),
            95,
            MatchField::SecondaryDescription,
            ExtractionMethod::PatternMatch,
        );
        let classified = ClassifiedTransaction::new(
            record(),
            Classification::Expense(matched),
            &ConfidenceThresholds::default(),
        );
        assert_eq!(classified.status, ReviewStatus::AutoApproved);
        assert_eq!(classified.contractor().map(|c| c.id), Some(1));
    }

    #[test]
    fn test_correction_takes_precedence() {
        let mut classified = ClassifiedTransaction::new(
            record(),
            Classification::Income(extraction(Some("7"), 95)),
            &ConfidenceThresholds::default(),
        );
        classified.apply_correction(
            Correction::by("user")
                .with_address("Joliot-Curie 3/12")
                .with_tenant("Anna Nowak"),
        );

        assert_eq!(classified.apartment_number().as_deref(), Some("12"));
        assert_eq!(classified.tenant_name(), Some("Anna Nowak"));
        assert_eq!(classified.full_address(), Some("Joliot-Curie 3/12"));
    }

    #[test]
    fn test_correction_apartment_forms() {
        assert_eq!(Correction::by("u").with_address("3/27").apartment().as_deref(), Some("27"));
        assert_eq!(
            Correction::by("u").with_address("Joliot-Curie 3 m. 11").apartment().as_deref(),
            Some("11")
        );
        assert_eq!(Correction::by("u").with_address("zgn").apartment().as_deref(), Some("ZGN"));
        assert_eq!(Correction::by("u").with_address("Joliot-Curie").apartment(), None);
    }

    #[test]
    fn test_blank_apartment_is_unrecognized() {
        let classified = ClassifiedTransaction::new(
            record(),
            Classification::Income(extraction(Some("  "), 0)),
            &ConfidenceThresholds::default(),
        );
        assert_eq!(classified.apartment_number(), None);
    }
}
