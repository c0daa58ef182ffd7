//! Contractor directory entries and match results.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::extraction::ExtractionMethod;

/// Minimum confidence for a contractor match to be kept.
pub const MIN_MATCH_CONFIDENCE: u8 = 50;

/// A contractor from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contractor {
    /// Numeric identifier.
    pub id: i64,
    /// Display name as it tends to appear in transfer titles.
    #[serde(alias = "nazwa")]
    pub name: String,
    /// Ledger account to debit for this contractor.
    #[serde(alias = "account_code", alias = "kontoKontrahenta", alias = "konto")]
    pub account_code: String,
}

impl Contractor {
    pub fn new(id: i64, name: impl Into<String>, account_code: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            account_code: account_code.into(),
        }
    }
}

/// Description field a contractor match was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchField {
    #[serde(rename = "desc-opt", alias = "desc_opt", alias = "descOpt")]
    SecondaryDescription,
    #[serde(rename = "desc-base", alias = "desc_base", alias = "descBase")]
    PrimaryDescription,
    #[default]
    #[serde(rename = "none")]
    None,
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SecondaryDescription => "desc-opt",
            Self::PrimaryDescription => "desc-base",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

/// Outcome of matching an expense transaction to a contractor.
///
/// Built through the constructors, which null out the contractor whenever the
/// confidence is below [`MIN_MATCH_CONFIDENCE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorMatchResult {
    pub contractor: Option<Contractor>,
    pub confidence: u8,
    pub matched_in: MatchField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
    pub method: ExtractionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ContractorMatchResult {
    /// A match of `contractor` with the given confidence.
    pub fn new(
        contractor: Contractor,
        confidence: u8,
        matched_in: MatchField,
        method: ExtractionMethod,
    ) -> Self {
        let confidence = confidence.min(100);
        if confidence < MIN_MATCH_CONFIDENCE {
            return Self {
                confidence,
                method,
                ..Self::none()
            };
        }
        Self {
            matched_text: Some(contractor.name.clone()),
            contractor: Some(contractor),
            confidence,
            matched_in,
            method,
            reasoning: None,
            warnings: Vec::new(),
        }
    }

    /// No contractor found.
    pub fn none() -> Self {
        Self {
            contractor: None,
            confidence: 0,
            matched_in: MatchField::None,
            matched_text: None,
            method: ExtractionMethod::PatternMatch,
            reasoning: None,
            warnings: Vec::new(),
        }
    }

    /// Zero-confidence result carrying the reason delegation did not help.
    pub fn manual_fallback(warning: impl Into<String>) -> Self {
        Self {
            method: ExtractionMethod::ManualFallback,
            warnings: vec![warning.into()],
            ..Self::none()
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Whether a contractor was assigned.
    pub fn is_matched(&self) -> bool {
        self.contractor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_confidence_forces_null() {
        let result = ContractorMatchResult::new(
            Contractor::new(1, "ENERGA", "201-1"),
            49,
            MatchField::PrimaryDescription,
            ExtractionMethod::PatternMatch,
        );
        assert!(result.contractor.is_none());
        assert_eq!(result.matched_in, MatchField::None);
        assert_eq!(result.confidence, 49);
    }

    #[test]
    fn test_match_keeps_contractor() {
        let result = ContractorMatchResult::new(
            Contractor::new(1, "ENERGA", "201-1"),
            50,
            MatchField::SecondaryDescription,
            ExtractionMethod::ExternalReasoning,
        );
        assert!(result.is_matched());
        assert_eq!(result.matched_text.as_deref(), Some("ENERGA"));
    }

    #[test]
    fn test_match_field_serde() {
        assert_eq!(
            serde_json::to_string(&MatchField::SecondaryDescription).unwrap(),
            "\"desc-opt\""
        );
        let field: MatchField = serde_json::from_str("\"desc-base\"").unwrap();
        assert_eq!(field, MatchField::PrimaryDescription);
    }

    #[test]
    fn test_contractor_accepts_snake_case_account() {
        let c: Contractor =
            serde_json::from_str(r#"{"id": 3, "name": "PGNiG", "account_code": "201-3"}"#).unwrap();
        assert_eq!(c.account_code, "201-3");
    }
}
