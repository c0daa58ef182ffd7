//! Contractor name scoring tiers.
//!
//! Both arguments are expected lower-cased with whitespace collapsed.

/// A scoring tier: returns a confidence when the tier applies.
#[derive(Debug, Clone, Copy)]
pub struct ScoringRule {
    pub name: &'static str,
    pub score: fn(name: &str, description: &str) -> Option<u8>,
}

/// Highest score a token-overlap match can reach.
pub const TOKEN_OVERLAP_MAX: u8 = 70;

/// Shortest name word counted by token overlap.
const MIN_TOKEN_CHARS: usize = 4;

/// Tiers in priority order; the first that applies decides the score.
pub const RULES: &[ScoringRule] = &[
    ScoringRule { name: "exact", score: exact },
    ScoringRule { name: "prefix", score: prefix },
    ScoringRule { name: "suffix", score: suffix },
    ScoringRule { name: "substring", score: substring },
    ScoringRule { name: "token-overlap", score: token_overlap },
];

fn exact(name: &str, description: &str) -> Option<u8> {
    (description == name).then_some(100)
}

fn prefix(name: &str, description: &str) -> Option<u8> {
    description.starts_with(name).then_some(95)
}

fn suffix(name: &str, description: &str) -> Option<u8> {
    description.ends_with(name).then_some(90)
}

fn substring(name: &str, description: &str) -> Option<u8> {
    if !description.contains(name) {
        return None;
    }
    let ratio = name.chars().count() as f64 / description.chars().count() as f64;
    Some(if ratio > 0.8 {
        85
    } else if ratio > 0.5 {
        80
    } else {
        75
    })
}

fn token_overlap(name: &str, description: &str) -> Option<u8> {
    let words: Vec<&str> = name
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS)
        .collect();
    if words.is_empty() {
        return None;
    }
    let matched = words.iter().filter(|w| description.contains(*w)).count();
    if matched == 0 {
        return None;
    }
    Some((matched * usize::from(TOKEN_OVERLAP_MAX) / words.len()) as u8)
}

/// First tier that applies, with its name and score.
pub fn best_rule(name: &str, description: &str) -> Option<(&'static str, u8)> {
    if name.is_empty() || description.is_empty() {
        return None;
    }
    RULES
        .iter()
        .find_map(|rule| (rule.score)(name, description).map(|s| (rule.name, s)))
}

/// Score a contractor name against a description; 0 when nothing applies.
pub fn score(name: &str, description: &str) -> u8 {
    best_rule(name, description).map_or(0, |(_, s)| s)
}
