//! Tenant name from the leading name-shaped run of a description.

use super::patterns::TENANT_NAME_PREFIX;
use super::{Descriptions, FieldStrategy, TenantMatch};
use crate::extraction::normalize::title_case_name;

/// Confidence when the name comes from desc-opt.
pub const SECONDARY_FIELD_CONFIDENCE: u8 = 75;
/// Confidence when the name comes from desc-base.
pub const PRIMARY_FIELD_CONFIDENCE: u8 = 60;

/// Reads the payer name, preferring desc-opt over desc-base.
#[derive(Debug, Default, Clone, Copy)]
pub struct TenantNameStrategy;

impl TenantNameStrategy {
    fn name_in(field: &str, confidence: u8) -> Option<TenantMatch> {
        let caps = TENANT_NAME_PREFIX.captures(field)?;
        let raw = caps[1].trim().trim_matches('-').trim();
        if raw.chars().filter(|c| c.is_alphabetic()).count() < 3 {
            return None;
        }
        Some(TenantMatch {
            name: title_case_name(raw),
            confidence,
            source: raw.to_string(),
        })
    }
}

impl FieldStrategy for TenantNameStrategy {
    type Output = TenantMatch;

    fn extract(&self, text: &Descriptions<'_>) -> Option<Self::Output> {
        Self::name_in(text.opt, SECONDARY_FIELD_CONFIDENCE)
            .or_else(|| Self::name_in(text.base, PRIMARY_FIELD_CONFIDENCE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(base: &str, opt: &str) -> Option<TenantMatch> {
        TenantNameStrategy.extract(&Descriptions { base, opt })
    }

    #[test]
    fn test_name_before_street_marker() {
        let m = run(
            "FUNDUSZ REMONTOWY",
            "EWA TERESA OSIECKA-CISOWSKA UL. JOLIOT-CURIE 3/27 02-646 WARSZAWA",
        )
        .unwrap();
        assert_eq!(m.name, "Ewa Teresa Osiecka-Cisowska");
        assert_eq!(m.confidence, 75);
    }

    #[test]
    fn test_diacritics_and_lowercase_marker() {
        let m = run("", "SYLWESTER ŚCIŚLEWSKI ul.Joliot-Curie 3 m.4").unwrap();
        assert_eq!(m.name, "Sylwester Ściślewski");
    }

    #[test]
    fn test_falls_back_to_primary_field() {
        let m = run("ANNA NOWAK 3/12 CZYNSZ", "PRZELEW").unwrap();
        assert_eq!(m.name, "Anna Nowak");
        assert_eq!(m.confidence, 60);
    }

    #[test]
    fn test_abbreviated_street_ends_name() {
        assert_eq!(run("", "JAN NOWAK JCURIE 3/34").unwrap().name, "Jan Nowak");
        assert_eq!(run("", "JAN NOWAK J.CURIE 3/34").unwrap().name, "Jan Nowak");
        assert_eq!(run("", "JAN NOWAK J. CURIE 3 M.11").unwrap().name, "Jan Nowak");
        assert_eq!(run("", "JAN NOWAK J CURIE 3/27").unwrap().name, "Jan Nowak");
    }

    #[test]
    fn test_bare_ul_marker_ends_name() {
        let m = run("", "KOSKA DANIEL UL RÓŻANA 11 77-100 RZEPNICA").unwrap();
        assert_eq!(m.name, "Koska Daniel");
        // "Ul" inside a word is part of the name.
        let m = run("", "ULA NOWAK UL. JOLIOT-CURIE 3/5").unwrap();
        assert_eq!(m.name, "Ula Nowak");
    }

    #[test]
    fn test_no_terminator_no_name() {
        assert!(run("OPLATA", "JAN KOWALSKI").is_none());
    }
}
