//! Address and tenant extraction results.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::transaction::TransactionRecord;

/// Per-field confidence scores, each 0-100.
///
/// `overall` is always derived from the other fields and cannot be set on its
/// own: pattern matches use the apartment score, delegated results use the
/// rounded mean of all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredConfidence")]
pub struct Confidence {
    address: u8,
    apartment: u8,
    tenant_name: u8,
    overall: u8,
}

/// Confidence as written to disk, checked before it becomes a [`Confidence`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredConfidence {
    address: u8,
    apartment: u8,
    tenant_name: u8,
    overall: u8,
}

impl TryFrom<StoredConfidence> for Confidence {
    type Error = String;

    fn try_from(stored: StoredConfidence) -> Result<Self, Self::Error> {
        let StoredConfidence {
            address,
            apartment,
            tenant_name,
            overall,
        } = stored;
        [
            Confidence::from_apartment(address, apartment, tenant_name),
            Confidence::averaged(address, apartment, tenant_name),
        ]
        .into_iter()
        .find(|c| {
            *c == Confidence {
                address,
                apartment,
                tenant_name,
                overall,
            }
        })
        .ok_or_else(|| {
            format!(
                "confidence {address}/{apartment}/{tenant_name} does not yield overall {overall}"
            )
        })
    }
}

impl Confidence {
    /// All-zero confidence.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Confidence for a pattern match: overall equals the apartment score,
    /// since the apartment number drives the ledger account.
    pub fn from_apartment(address: u8, apartment: u8, tenant_name: u8) -> Self {
        let apartment = apartment.min(100);
        Self {
            address: address.min(100),
            apartment,
            tenant_name: tenant_name.min(100),
            overall: apartment,
        }
    }

    /// Confidence for a delegated result: overall is the rounded mean.
    pub fn averaged(address: u8, apartment: u8, tenant_name: u8) -> Self {
        let (address, apartment, tenant_name) =
            (address.min(100), apartment.min(100), tenant_name.min(100));
        let sum = u16::from(address) + u16::from(apartment) + u16::from(tenant_name);
        // A sum divided by three never lands on .5, so this is round-to-nearest.
        let overall = ((sum + 1) / 3) as u8;
        Self {
            address,
            apartment,
            tenant_name,
            overall,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn apartment(&self) -> u8 {
        self.apartment
    }

    pub fn tenant_name(&self) -> u8 {
        self.tenant_name
    }

    pub fn overall(&self) -> u8 {
        self.overall
    }
}

/// How an extraction result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    PatternMatch,
    ExternalReasoning,
    CacheHit,
    ManualFallback,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PatternMatch => "pattern-match",
            Self::ExternalReasoning => "external-reasoning",
            Self::CacheHit => "cache-hit",
            Self::ManualFallback => "manual-fallback",
        };
        f.write_str(s)
    }
}

/// Copy of the source description fields kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDescriptions {
    pub desc_base: String,
    pub desc_opt: String,
}

impl From<&TransactionRecord> for RawDescriptions {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            desc_base: record.desc_base.clone(),
            desc_opt: record.desc_opt.clone(),
        }
    }
}

/// Output of any extraction strategy for an income transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Canonical street name ("Joliot-Curie").
    pub street_name: Option<String>,
    /// Building number.
    pub building_number: Option<String>,
    /// Apartment number; drives the ledger account.
    pub apartment_number: Option<String>,
    /// Composed address ("Joliot-Curie 3/27").
    pub full_address: Option<String>,
    /// Tenant name in title case.
    pub tenant_name: Option<String>,
    /// Confidence vector.
    pub confidence: Confidence,
    /// Which strategy produced this result.
    pub method: ExtractionMethod,
    /// Explanation from the reasoning service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Human-readable warnings.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Source fields for audit.
    pub raw: RawDescriptions,
}

impl ExtractionResult {
    /// Zero-confidence result used when nothing could be extracted.
    pub fn manual_fallback(record: &TransactionRecord, warning: impl Into<String>) -> Self {
        Self {
            street_name: None,
            building_number: None,
            apartment_number: None,
            full_address: None,
            tenant_name: None,
            confidence: Confidence::zero(),
            method: ExtractionMethod::ManualFallback,
            reasoning: None,
            warnings: vec![warning.into()],
            raw: RawDescriptions::from(record),
        }
    }

    /// Apartment number if present and non-blank.
    pub fn apartment(&self) -> Option<&str> {
        self.apartment_number
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_overall_is_apartment() {
        let c = Confidence::from_apartment(95, 90, 75);
        assert_eq!(c.overall(), 90);
        assert_eq!(c.address(), 95);
    }

    #[test]
    fn test_averaged_rounds() {
        assert_eq!(Confidence::averaged(95, 90, 85).overall(), 90);
        assert_eq!(Confidence::averaged(0, 70, 85).overall(), 52);
        assert_eq!(Confidence::averaged(1, 1, 2).overall(), 1);
        assert_eq!(Confidence::averaged(1, 2, 2).overall(), 2);
    }

    #[test]
    fn test_scores_clamped() {
        let c = Confidence::averaged(200, 100, 100);
        assert_eq!(c.address(), 100);
        assert_eq!(c.overall(), 100);
    }

    #[test]
    fn test_stored_confidence_must_be_consistent() {
        for c in [Confidence::from_apartment(95, 95, 75), Confidence::averaged(0, 70, 85)] {
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(serde_json::from_str::<Confidence>(&json).unwrap(), c);
        }

        let forged = r#"{"address": 10, "apartment": 10, "tenantName": 10, "overall": 99}"#;
        assert!(serde_json::from_str::<Confidence>(forged).is_err());
        let out_of_range = r#"{"address": 150, "apartment": 150, "tenantName": 0, "overall": 150}"#;
        assert!(serde_json::from_str::<Confidence>(out_of_range).is_err());
    }

    #[test]
    fn test_method_serde_is_kebab() {
        let json = serde_json::to_string(&ExtractionMethod::CacheHit).unwrap();
        assert_eq!(json, "\"cache-hit\"");
        assert_eq!(ExtractionMethod::ManualFallback.to_string(), "manual-fallback");
    }
}
