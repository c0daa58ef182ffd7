//! Pattern-based extraction of apartment, address and tenant from income
//! transfer descriptions.

pub mod normalize;
pub mod pattern;
pub mod rules;

pub use normalize::{normalize_description, title_case_name};
pub use pattern::{PatternExtractor, MIN_APARTMENT_CONFIDENCE};
