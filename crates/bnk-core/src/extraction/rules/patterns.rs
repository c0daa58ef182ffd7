//! Regex patterns for Polish transfer descriptions.
//!
//! Every building/apartment pattern captures the building in group 1 and
//! the apartment in group 2.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();

    // IDENTYFIKATOR: 27/4
    pub static ref IDENTIFIER_LABELED: Regex = Regex::new(
        r"(?i)identyfikator[:\s]+(\d+)/(\d+)"
    ).unwrap();

    // lokal ID 27/7
    pub static ref IDENTIFIER_UNIT: Regex = Regex::new(
        r"(?i)lokal\s+id\s+(\d+)/(\d+)"
    ).unwrap();

    // ID.27/7, ID: 27/7
    pub static ref IDENTIFIER_SHORT: Regex = Regex::new(
        r"(?i)\bid[:\s.]+(\d+)/(\d+)"
    ).unwrap();

    // Wspolnotanr 27 - Identyfikator lokalu 26
    pub static ref IDENTIFIER_COMMUNITY: Regex = Regex::new(
        r"(?i)wsp[oó]lnotanr\s+(\d+)\s*-\s*identyfikator\s+lokalu\s+(\d+)"
    ).unwrap();

    // Joliot-Curie 3/27
    pub static ref STREET_FULL_SLASH: Regex = Regex::new(
        r"(?i)joliot[-\s]?curie\s+(\d+)/(\d+)"
    ).unwrap();

    // UL. JOLIOT CURIE 3 M.11
    pub static ref STREET_FULL_UNIT_DOT: Regex = Regex::new(
        r"(?i)joliot[-\s]?curie\s+(\d+)\s+m\.(\d+)"
    ).unwrap();

    // JOLIOT CURIE 3 M 11
    pub static ref STREET_FULL_UNIT_SPACE: Regex = Regex::new(
        r"(?i)joliot[-\s]?curie\s+(\d+)\s+m\s+(\d+)"
    ).unwrap();

    // JOLIOT CURIE 3 M11
    pub static ref STREET_FULL_UNIT_TIGHT: Regex = Regex::new(
        r"(?i)joliot[-\s]?curie\s+(\d+)\s+m\.?(\d+)"
    ).unwrap();

    // J. CURIE 3/27
    pub static ref STREET_INITIAL_SLASH: Regex = Regex::new(
        r"(?i)\bj(?:\.\s*|\s+)curie\s+(\d+)/(\d+)"
    ).unwrap();

    // J.CURIE 3 M.11
    pub static ref STREET_INITIAL_UNIT: Regex = Regex::new(
        r"(?i)\bj(?:\.\s*|\s+)curie\s+(\d+)\s+m\.?\s*(\d+)"
    ).unwrap();

    // JCURIE 3/34
    pub static ref STREET_CONCATENATED: Regex = Regex::new(
        r"(?i)jcurie\s+(\d+)/(\d+)"
    ).unwrap();

    // Name-shaped prefix ended by a street marker (any spelling the address
    // rules accept) or a digit.
    pub static ref TENANT_NAME_PREFIX: Regex = Regex::new(
        r"(?i)^([A-ZĄĆĘŁŃÓŚŹŻ\s-]{3,50}?)\s+(?:UL\b|JOLIOT|JCURIE|J\.?\s*CURIE\b|[0-9])"
    ).unwrap();
}

/// Canonical spelling of the only street the rules recognize.
pub const CANONICAL_STREET: &str = "Joliot-Curie";
