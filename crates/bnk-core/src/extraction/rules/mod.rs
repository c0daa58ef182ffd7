//! Rule-based strategies for income descriptions.
//!
//! Each strategy reads the cleaned description pair and yields a partial
//! match with its own confidence; [`crate::extraction::PatternExtractor`]
//! merges them.

pub mod address;
pub mod identifier;
pub mod patterns;
pub mod tenant;

pub use address::{AddressStrategy, AddressTemplate, ADDRESS_TEMPLATES};
pub use identifier::{IdentifierStrategy, IDENTIFIER_PATTERNS};
pub use tenant::TenantNameStrategy;

/// Cleaned description pair handed to every strategy.
#[derive(Debug, Clone, Copy)]
pub struct Descriptions<'a> {
    pub base: &'a str,
    pub opt: &'a str,
}

impl Descriptions<'_> {
    /// Both fields joined by a space.
    pub fn combined(&self) -> String {
        format!("{} {}", self.base, self.opt)
    }
}

/// Trait for a single extraction strategy.
pub trait FieldStrategy {
    /// What the strategy yields.
    type Output;

    /// Run against a description pair; first match wins.
    fn extract(&self, text: &Descriptions<'_>) -> Option<Self::Output>;
}

/// Building and apartment location found in a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationMatch {
    /// Canonical street, when the rule names one.
    pub street_name: Option<String>,
    pub building_number: String,
    pub apartment_number: String,
    pub full_address: String,
    /// Confidence for both address and apartment (0-100).
    pub confidence: u8,
    /// Text the rule matched.
    pub source: String,
}

/// Tenant name found in a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantMatch {
    /// Title-cased name.
    pub name: String,
    pub confidence: u8,
    pub source: String,
}
