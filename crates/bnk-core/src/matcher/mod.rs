//! Fuzzy matching of expense descriptions against the contractor directory.

pub mod scoring;

use tracing::debug;

use crate::extraction::normalize_description;
use crate::models::{
    Contractor, ContractorMatchResult, ExtractionMethod, MatchField, TransactionRecord,
};

pub use scoring::{best_rule, score, ScoringRule, RULES};

/// Matches transactions to contractors by name.
#[derive(Debug, Clone, Default)]
pub struct ContractorMatcher {
    contractors: Vec<Contractor>,
    /// Lower-cased, whitespace-collapsed names, parallel to `contractors`.
    names: Vec<String>,
}

fn prepare(text: &str) -> String {
    normalize_description(text).to_lowercase()
}

impl ContractorMatcher {
    pub fn new(contractors: Vec<Contractor>) -> Self {
        let names = contractors.iter().map(|c| prepare(&c.name)).collect();
        Self { contractors, names }
    }

    /// Best contractor for one field with the tier that scored it; ties keep
    /// directory order.
    fn best_in(&self, field: &str) -> Option<(usize, u8, &'static str)> {
        let description = prepare(field);
        if description.is_empty() {
            return None;
        }
        let mut best: Option<(usize, u8, &'static str)> = None;
        for (i, name) in self.names.iter().enumerate() {
            let Some((rule, s)) = best_rule(name, &description) else {
                continue;
            };
            if s > 0 && best.is_none_or(|(_, b, _)| s > b) {
                best = Some((i, s, rule));
            }
        }
        best
    }

    /// Match an expense: desc-opt first, desc-base only when desc-opt gave
    /// no contractor.
    pub fn match_transaction(&self, record: &TransactionRecord) -> ContractorMatchResult {
        let mut weakest = ContractorMatchResult::none();

        let fields = [
            (record.desc_opt.as_str(), MatchField::SecondaryDescription),
            (record.desc_base.as_str(), MatchField::PrimaryDescription),
        ];
        for (text, field) in fields {
            let Some((index, confidence, rule)) = self.best_in(text) else {
                continue;
            };
            let result = ContractorMatchResult::new(
                self.contractors[index].clone(),
                confidence,
                field,
                ExtractionMethod::PatternMatch,
            );
            if result.is_matched() {
                debug!(
                    contractor = %self.contractors[index].name,
                    confidence,
                    rule,
                    field = %field,
                    "contractor matched"
                );
                return result;
            }
            if result.confidence > weakest.confidence {
                weakest = result;
            }
        }
        weakest
    }

    /// Score of a contractor against a record: best of both fields.
    fn record_score(&self, index: usize, opt: &str, base: &str) -> u8 {
        let name = &self.names[index];
        score(name, opt).max(score(name, base))
    }

    /// Up to `n` contractors for delegation, best first.
    ///
    /// Scored contractors come first (equal scores keep directory order);
    /// the rest of the directory fills any remaining places in directory
    /// order, so a name the fuzzy scores miss can still be offered.
    pub fn top_candidates(&self, record: &TransactionRecord, n: usize) -> Vec<Contractor> {
        let opt = prepare(&record.desc_opt);
        let base = prepare(&record.desc_base);

        let mut scored: Vec<(usize, u8)> = (0..self.contractors.len())
            .map(|i| (i, self.record_score(i, &opt, &base)))
            .collect();
        // Stable: equal scores (zero included) keep directory order.
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        scored
            .into_iter()
            .take(n)
            .map(|(i, _)| self.contractors[i].clone())
            .collect()
    }
}
