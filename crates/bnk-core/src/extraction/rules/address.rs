//! Street address templates for the Joliot-Curie spelling variants.

use lazy_static::lazy_static;
use regex::Regex;

use super::patterns::{
    CANONICAL_STREET, STREET_CONCATENATED, STREET_FULL_SLASH, STREET_FULL_UNIT_DOT,
    STREET_FULL_UNIT_SPACE, STREET_FULL_UNIT_TIGHT, STREET_INITIAL_SLASH, STREET_INITIAL_UNIT,
};
use super::{Descriptions, FieldStrategy, LocationMatch};

/// One recognized spelling of the street with its confidence.
#[derive(Debug)]
pub struct AddressTemplate {
    pub name: &'static str,
    pub pattern: &'static Regex,
    pub confidence: u8,
}

lazy_static! {
    /// Templates in priority order; the first match wins.
    pub static ref ADDRESS_TEMPLATES: Vec<AddressTemplate> = vec![
        AddressTemplate { name: "full-slash", pattern: &*STREET_FULL_SLASH, confidence: 95 },
        AddressTemplate { name: "full-unit-dot", pattern: &*STREET_FULL_UNIT_DOT, confidence: 95 },
        AddressTemplate { name: "full-unit-space", pattern: &*STREET_FULL_UNIT_SPACE, confidence: 95 },
        AddressTemplate { name: "full-unit-tight", pattern: &*STREET_FULL_UNIT_TIGHT, confidence: 95 },
        AddressTemplate { name: "initial-slash", pattern: &*STREET_INITIAL_SLASH, confidence: 90 },
        AddressTemplate { name: "initial-unit", pattern: &*STREET_INITIAL_UNIT, confidence: 90 },
        AddressTemplate { name: "concatenated", pattern: &*STREET_CONCATENATED, confidence: 85 },
    ];
}

/// Matches the street templates against both fields combined.
#[derive(Debug, Default, Clone, Copy)]
pub struct AddressStrategy;

impl FieldStrategy for AddressStrategy {
    type Output = LocationMatch;

    fn extract(&self, text: &Descriptions<'_>) -> Option<Self::Output> {
        let combined = text.combined();
        ADDRESS_TEMPLATES.iter().find_map(|template| {
            let caps = template.pattern.captures(&combined)?;
            let building = caps[1].to_string();
            let apartment = caps[2].to_string();
            tracing::trace!(template = template.name, "address template matched");
            Some(LocationMatch {
                street_name: Some(CANONICAL_STREET.to_string()),
                full_address: format!("{CANONICAL_STREET} {building}/{apartment}"),
                building_number: building,
                apartment_number: apartment,
                confidence: template.confidence,
                source: caps[0].to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(opt: &str) -> Option<LocationMatch> {
        AddressStrategy.extract(&Descriptions { base: "", opt })
    }

    #[test]
    fn test_every_variant_is_canonical() {
        for (text, building, apartment, confidence) in [
            ("Joliot-Curie 3/27", "3", "27", 95),
            ("UL. JOLIOT CURIE 3 M.11", "3", "11", 95),
            ("JOLIOT CURIE 3 M 11", "3", "11", 95),
            ("JOLIOT CURIE 3 M11", "3", "11", 95),
            ("J. CURIE 3/27", "3", "27", 90),
            ("J.CURIE 3 M.11", "3", "11", 90),
            ("JCURIE 3/34", "3", "34", 85),
        ] {
            let m = run(text).unwrap_or_else(|| panic!("no match for {text}"));
            assert_eq!(m.street_name.as_deref(), Some("Joliot-Curie"), "{text}");
            assert_eq!(m.building_number, building, "{text}");
            assert_eq!(m.apartment_number, apartment, "{text}");
            assert_eq!(m.confidence, confidence, "{text}");
        }
    }

    #[test]
    fn test_full_address_composed() {
        let m = run("UL.JOLIOT-CURIE 3 M.4 02-646 WARSZAWA").unwrap();
        assert_eq!(m.full_address, "Joliot-Curie 3/4");
    }

    #[test]
    fn test_other_street_ignored() {
        assert!(run("KOSKA DANIEL UL RÓŻANA 11 77-100 RZEPNICA").is_none());
    }

    #[test]
    fn test_templates_ordered_by_confidence() {
        let confidences: Vec<u8> = ADDRESS_TEMPLATES.iter().map(|t| t.confidence).collect();
        let mut sorted = confidences.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(confidences, sorted);
    }
}
