//! Explicit building/unit identifiers ("IDENTYFIKATOR: 27/4").

use lazy_static::lazy_static;
use regex::Regex;

use super::patterns::{
    IDENTIFIER_COMMUNITY, IDENTIFIER_LABELED, IDENTIFIER_SHORT, IDENTIFIER_UNIT,
};
use super::{Descriptions, FieldStrategy, LocationMatch};

/// Confidence for an explicit identifier.
pub const IDENTIFIER_CONFIDENCE: u8 = 95;

lazy_static! {
    /// Identifier idioms in priority order.
    pub static ref IDENTIFIER_PATTERNS: Vec<&'static Regex> = vec![
        &*IDENTIFIER_LABELED,
        &*IDENTIFIER_UNIT,
        &*IDENTIFIER_SHORT,
        &*IDENTIFIER_COMMUNITY,
    ];
}

/// Looks for explicit identifiers in both fields combined.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentifierStrategy;

impl FieldStrategy for IdentifierStrategy {
    type Output = LocationMatch;

    fn extract(&self, text: &Descriptions<'_>) -> Option<Self::Output> {
        let combined = text.combined();
        IDENTIFIER_PATTERNS.iter().find_map(|pattern| {
            let caps = pattern.captures(&combined)?;
            let building = caps[1].to_string();
            let apartment = caps[2].to_string();
            Some(LocationMatch {
                street_name: None,
                full_address: format!("{building}/{apartment}"),
                building_number: building,
                apartment_number: apartment,
                confidence: IDENTIFIER_CONFIDENCE,
                source: caps[0].to_string(),
            })
        })
    }
}
