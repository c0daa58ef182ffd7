//! Pattern extractor combining the rule strategies.

use tracing::debug;

use super::normalize::normalize_description;
use super::rules::{
    AddressStrategy, Descriptions, FieldStrategy, IdentifierStrategy, LocationMatch,
    TenantMatch, TenantNameStrategy,
};
use crate::models::{
    Confidence, ExtractionMethod, ExtractionResult, RawDescriptions, TransactionRecord,
};

/// Apartment confidence below which the extractor gives up.
pub const MIN_APARTMENT_CONFIDENCE: u8 = 70;

/// Regex extractor for income descriptions.
///
/// Runs the identifier, address and tenant strategies and merges them. The
/// location (street, building, apartment, full address) comes whole from the
/// most confident location strategy, earlier strategies winning ties; the
/// tenant name is merged on its own. Returns `None` when the apartment is not
/// known with at least [`MIN_APARTMENT_CONFIDENCE`].
#[derive(Debug, Default, Clone)]
pub struct PatternExtractor {
    identifier: IdentifierStrategy,
    address: AddressStrategy,
    tenant: TenantNameStrategy,
}

/// Merge state across strategies.
#[derive(Debug, Default)]
struct Merged {
    location: Option<LocationMatch>,
    tenant_name: Option<(String, u8)>,
}

impl Merged {
    /// Take `found` only if it is strictly more confident than the current
    /// location, so fields from different strategies never mix.
    fn location(&mut self, found: LocationMatch) {
        match &self.location {
            Some(current) if current.confidence >= found.confidence => {
                debug!(kept = %current.source, dropped = %found.source, "location already known");
            }
            _ => self.location = Some(found),
        }
    }

    fn tenant(&mut self, found: TenantMatch) {
        match &self.tenant_name {
            Some((_, current)) if *current >= found.confidence => {}
            _ => self.tenant_name = Some((found.name, found.confidence)),
        }
    }

    fn location_confidence(&self) -> u8 {
        self.location.as_ref().map_or(0, |l| l.confidence)
    }

    fn tenant_confidence(&self) -> u8 {
        self.tenant_name.as_ref().map_or(0, |(_, c)| *c)
    }
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract address and tenant from a record, or `None` to escalate.
    pub fn extract(&self, record: &TransactionRecord) -> Option<ExtractionResult> {
        let base = normalize_description(&record.desc_base);
        let opt = normalize_description(&record.desc_opt);
        let text = Descriptions { base: &base, opt: &opt };

        let mut merged = Merged::default();

        if let Some(found) = self.identifier.extract(&text) {
            debug!(source = %found.source, "identifier strategy matched");
            merged.location(found);
        }
        if let Some(found) = self.address.extract(&text) {
            debug!(source = %found.source, confidence = found.confidence, "address strategy matched");
            merged.location(found);
        }
        if let Some(found) = self.tenant.extract(&text) {
            debug!(confidence = found.confidence, "tenant strategy matched");
            merged.tenant(found);
        }

        let located = merged.location_confidence();
        if located < MIN_APARTMENT_CONFIDENCE {
            debug!(apartment = located, "pattern extraction below floor");
            return None;
        }
        let confidence = Confidence::from_apartment(located, located, merged.tenant_confidence());
        let location = merged.location?;

        Some(ExtractionResult {
            street_name: location.street_name,
            building_number: Some(location.building_number),
            apartment_number: Some(location.apartment_number),
            full_address: Some(location.full_address),
            tenant_name: merged.tenant_name.map(|(v, _)| v),
            confidence,
            method: ExtractionMethod::PatternMatch,
            reasoning: None,
            warnings: Vec::new(),
            raw: RawDescriptions::from(record),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn record(base: &str, opt: &str) -> TransactionRecord {
        TransactionRecord::new(
            NaiveDate::from_ymd_opt(2025, 4, 3).unwrap(),
            Decimal::new(45000, 2),
            base,
            opt,
        )
    }

    #[test]
    fn test_fundusz_remontowy_scenario() {
        let result = PatternExtractor::new()
            .extract(&record(
                "FUNDUSZ REMONTOWY",
                "EWA TERESA OSIECKA-CISOWSKA UL. JOLIOT-CURIE 3/27 02-646 WARSZAWA",
            ))
            .unwrap();

        assert_eq!(result.apartment_number.as_deref(), Some("27"));
        assert_eq!(result.building_number.as_deref(), Some("3"));
        assert_eq!(result.full_address.as_deref(), Some("Joliot-Curie 3/27"));
        assert_eq!(result.tenant_name.as_deref(), Some("Ewa Teresa Osiecka-Cisowska"));
        assert_eq!(result.confidence.overall(), 95);
        assert_eq!(result.confidence.tenant_name(), 75);
        assert_eq!(result.method, ExtractionMethod::PatternMatch);
        assert_eq!(result.raw.desc_base, "FUNDUSZ REMONTOWY");
    }

    #[test]
    fn test_identifier_wins_over_address() {
        let result = PatternExtractor::new()
            .extract(&record(
                "CZYNSZ I FUNDUSZ REMONTOWY ZA LOKAL IDENTYFIKATOR: 27/4",
                "SYLWESTER ŚCIŚLEWSKI UL.JOLIOT-CURIE 3 M.5 02-646 WARSZAWA",
            ))
            .unwrap();

        assert_eq!(result.building_number.as_deref(), Some("27"));
        assert_eq!(result.apartment_number.as_deref(), Some("4"));
        assert_eq!(result.full_address.as_deref(), Some("27/4"));
        assert_eq!(result.street_name, None);
        assert_eq!(result.tenant_name.as_deref(), Some("Sylwester Ściślewski"));
        assert_eq!(result.confidence.apartment(), 95);
    }

    #[test]
    fn test_location_fields_come_from_one_strategy() {
        let result = PatternExtractor::new()
            .extract(&record("ID.27/4", "JCURIE 3/9"))
            .unwrap();
        assert_eq!(result.building_number.as_deref(), Some("27"));
        assert_eq!(result.apartment_number.as_deref(), Some("4"));
        assert_eq!(result.full_address.as_deref(), Some("27/4"));
        assert_eq!(result.street_name, None);
        assert_eq!(result.confidence.overall(), 95);
    }

    #[test]
    fn test_address_strategy_supplies_street_alone() {
        let result = PatternExtractor::new()
            .extract(&record("CZYNSZ", "JAN NOWAK J.CURIE 3 M.11"))
            .unwrap();
        assert_eq!(result.street_name.as_deref(), Some("Joliot-Curie"));
        assert_eq!(result.building_number.as_deref(), Some("3"));
        assert_eq!(result.apartment_number.as_deref(), Some("11"));
        assert_eq!(result.tenant_name.as_deref(), Some("Jan Nowak"));
        assert_eq!(result.confidence.overall(), 90);
    }

    #[test]
    fn test_null_gate() {
        let extractor = PatternExtractor::new();
        assert!(extractor.extract(&record("PRZELEW", "")).is_none());
        // Name alone does not carry an apartment.
        assert!(extractor
            .extract(&record("", "KOSKA DANIEL UL RÓŻANA 11 77-100 RZEPNICA"))
            .is_none());
        assert!(extractor
            .extract(&record("Op\u{FFFD}aty za lokalu 17", "KOSKA DANIEL"))
            .is_none());
    }

    #[test]
    fn test_abbreviated_overall_tracks_template() {
        let result = PatternExtractor::new()
            .extract(&record("CZYNSZ", "JAN NOWAK JCURIE 3/34"))
            .unwrap();
        assert_eq!(result.confidence.overall(), 85);
        assert_eq!(result.full_address.as_deref(), Some("Joliot-Curie 3/34"));
    }

    #[test]
    fn test_messy_whitespace_is_normalized() {
        let result = PatternExtractor::new()
            .extract(&record("  CZYNSZ  ", "JAN   NOWAK   UL.  JOLIOT   CURIE   3   M.11"))
            .unwrap();
        assert_eq!(result.apartment_number.as_deref(), Some("11"));
        assert_eq!(result.tenant_name.as_deref(), Some("Jan Nowak"));
    }
}
