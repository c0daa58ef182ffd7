//! Hybrid converter: cache, patterns and fuzzy matching first, external
//! reasoning for whatever is left.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, MemoryCache, NoopCache, ResultCache};
use crate::delegate::{
    align_results, AddressRequestItem, AddressResponseItem, CandidateRef, ContractorRequestItem,
    ContractorResponseItem, NoProvider, PatternHint, ReasoningProvider,
};
use crate::error::{CacheError, DelegationError};
use crate::extraction::PatternExtractor;
use crate::matcher::ContractorMatcher;
use crate::models::contractor::MIN_MATCH_CONFIDENCE;
use crate::models::{
    Classification, ClassifiedTransaction, Confidence, Contractor, ContractorMatchResult,
    ConverterConfig, ExtractionMethod, ExtractionResult, RawDescriptions, ReviewStatus,
    TransactionKind, TransactionRecord,
};

/// Overall confidence below which delegated results get a warning.
pub const LOW_CONFIDENCE: u8 = 60;

const LOW_CONFIDENCE_WARNING: &str = "Low confidence extraction";
const NO_PROVIDER_WARNING: &str = "External reasoning not configured - needs manual input";

/// Status counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSummary {
    pub auto_approved: usize,
    pub needs_review: usize,
    pub needs_manual_input: usize,
    /// Filtered out before classification.
    pub skipped: usize,
}

/// How many results each method produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodCounts {
    pub pattern_match: usize,
    pub external_reasoning: usize,
    pub cache_hit: usize,
    pub manual_fallback: usize,
}

impl MethodCounts {
    fn record(&mut self, method: ExtractionMethod) {
        match method {
            ExtractionMethod::PatternMatch => self.pattern_match += 1,
            ExtractionMethod::ExternalReasoning => self.external_reasoning += 1,
            ExtractionMethod::CacheHit => self.cache_hit += 1,
            ExtractionMethod::ManualFallback => self.manual_fallback += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStatistics {
    pub average_confidence: f64,
    pub methods: MethodCounts,
}

/// Outcome of one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Records handed in, before filtering.
    pub total_transactions: usize,
    /// Classified records in input order.
    pub processed: Vec<ClassifiedTransaction>,
    pub summary: ConversionSummary,
    pub statistics: ConversionStatistics,
}

impl ConversionResult {
    fn build(processed: Vec<ClassifiedTransaction>, total_transactions: usize) -> Self {
        let mut summary = ConversionSummary {
            skipped: total_transactions.saturating_sub(processed.len()),
            ..ConversionSummary::default()
        };
        let mut methods = MethodCounts::default();
        let mut confidence_sum = 0u64;

        for item in &processed {
            match item.status {
                ReviewStatus::AutoApproved => summary.auto_approved += 1,
                ReviewStatus::NeedsReview => summary.needs_review += 1,
                ReviewStatus::NeedsManualInput => summary.needs_manual_input += 1,
            }
            methods.record(item.method());
            confidence_sum += u64::from(item.confidence());
        }

        let average_confidence = if processed.is_empty() {
            0.0
        } else {
            confidence_sum as f64 / processed.len() as f64
        };

        Self {
            total_transactions,
            processed,
            summary,
            statistics: ConversionStatistics {
                average_confidence,
                methods,
            },
        }
    }

    pub fn income(&self) -> impl Iterator<Item = &ClassifiedTransaction> {
        self.processed
            .iter()
            .filter(|t| t.kind() == TransactionKind::Income)
    }

    pub fn expenses(&self) -> impl Iterator<Item = &ClassifiedTransaction> {
        self.processed
            .iter()
            .filter(|t| t.kind() == TransactionKind::Expense)
    }
}

/// Run a delegated call under a deadline.
async fn with_deadline<T>(
    secs: u64,
    call: impl Future<Output = Result<T, DelegationError>>,
) -> Result<T, DelegationError> {
    tokio::time::timeout(Duration::from_secs(secs), call)
        .await
        .map_err(|_| DelegationError::Timeout(secs))?
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Turn a delegated answer into an extraction result.
fn delegated_extraction(record: &TransactionRecord, answer: AddressResponseItem) -> ExtractionResult {
    let c = answer.confidence;
    let confidence = Confidence::averaged(c.address, c.apartment, c.tenant_name);
    let mut warnings = Vec::new();
    if confidence.overall() < LOW_CONFIDENCE {
        warnings.push(LOW_CONFIDENCE_WARNING.to_string());
    }
    ExtractionResult {
        street_name: non_blank(answer.street_name),
        building_number: non_blank(answer.building_number),
        apartment_number: non_blank(answer.apartment_number),
        full_address: non_blank(answer.full_address),
        tenant_name: non_blank(answer.tenant_name),
        confidence,
        method: ExtractionMethod::ExternalReasoning,
        reasoning: answer.reasoning,
        warnings,
        raw: RawDescriptions::from(record),
    }
}

/// Resolve a delegated contractor answer against the item's shortlist.
fn delegated_match(candidates: &[Contractor], answer: ContractorResponseItem) -> ContractorMatchResult {
    let unmatched = |warning: Option<String>| ContractorMatchResult {
        method: ExtractionMethod::ExternalReasoning,
        reasoning: answer.reasoning.clone(),
        warnings: warning.into_iter().collect(),
        ..ContractorMatchResult::none()
    };

    let Some(id) = answer.contractor_id else {
        return unmatched(None);
    };
    if answer.confidence < MIN_MATCH_CONFIDENCE {
        return unmatched(None);
    }
    let Some(contractor) = candidates.iter().find(|c| c.id == id) else {
        return unmatched(Some(format!("Contractor id {id} is not among the candidates")));
    };

    let result = ContractorMatchResult::new(
        contractor.clone(),
        answer.confidence,
        answer.matched_in,
        ExtractionMethod::ExternalReasoning,
    );
    match answer.reasoning {
        Some(reasoning) => result.with_reasoning(reasoning),
        None => result,
    }
}

/// Orchestrates extraction for a statement.
///
/// Income goes cache, then patterns, then the reasoning provider; expenses go
/// fuzzy matcher, then the provider with a candidate shortlist. Delegation is
/// batched and a failed batch only affects its own items.
pub struct HybridConverter<P = NoProvider> {
    config: ConverterConfig,
    cache: Box<dyn ResultCache>,
    provider: Option<P>,
    matcher: ContractorMatcher,
    extractor: PatternExtractor,
}

impl HybridConverter<NoProvider> {
    /// Converter without a reasoning provider. Uses an in-memory cache when
    /// caching is enabled.
    pub fn new(config: ConverterConfig) -> Self {
        let cache: Box<dyn ResultCache> = if config.processing.use_cache {
            Box::new(MemoryCache::new())
        } else {
            Box::new(NoopCache)
        };
        Self {
            config,
            cache,
            provider: None,
            matcher: ContractorMatcher::default(),
            extractor: PatternExtractor::new(),
        }
    }
}

impl<P: ReasoningProvider> HybridConverter<P> {
    /// Use `provider` for delegated batches.
    pub fn with_provider<Q: ReasoningProvider>(self, provider: Q) -> HybridConverter<Q> {
        self.with_optional_provider(Some(provider))
    }

    /// Use `provider` if there is one.
    pub fn with_optional_provider<Q: ReasoningProvider>(
        self,
        provider: Option<Q>,
    ) -> HybridConverter<Q> {
        HybridConverter {
            config: self.config,
            cache: self.cache,
            provider,
            matcher: self.matcher,
            extractor: self.extractor,
        }
    }

    /// Replace the result cache.
    pub fn with_cache(mut self, cache: Box<dyn ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Set the contractor directory.
    pub fn with_contractors(mut self, contractors: Vec<Contractor>) -> Self {
        self.matcher = ContractorMatcher::new(contractors);
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Write the cache to `path` if it is persistable.
    pub fn save_cache(&self, path: &Path) -> Result<(), CacheError> {
        self.cache.persist(path)
    }

    fn classify(&self, record: &TransactionRecord, classification: Classification) -> ClassifiedTransaction {
        ClassifiedTransaction::new(record.clone(), classification, &self.config.thresholds)
    }

    fn address_batch_size(&self) -> usize {
        if self.config.processing.use_batch_processing {
            self.config.processing.address_batch_size.max(1)
        } else {
            1
        }
    }

    fn contractor_batch_size(&self) -> usize {
        if self.config.processing.use_batch_processing {
            self.config.processing.contractor_batch_size.max(1)
        } else {
            1
        }
    }

    /// Filter, classify and summarize `records`.
    ///
    /// Never fails: delegation problems become manual-fallback entries.
    pub async fn convert(&mut self, records: &[TransactionRecord]) -> ConversionResult {
        let kept = self.config.filter.apply(records);
        info!(
            total = records.len(),
            kept = kept.len(),
            skipped = records.len() - kept.len(),
            "starting conversion"
        );

        let (income, expenses): (Vec<usize>, Vec<usize>) =
            (0..kept.len()).partition(|&i| kept[i].kind() == TransactionKind::Income);

        let mut slots: Vec<Option<ClassifiedTransaction>> = vec![None; kept.len()];
        self.convert_income(&kept, &income, &mut slots).await;
        self.convert_expenses(&kept, &expenses, &mut slots).await;

        let processed: Vec<ClassifiedTransaction> = slots.into_iter().flatten().collect();
        let result = ConversionResult::build(processed, records.len());
        info!(
            auto_approved = result.summary.auto_approved,
            needs_review = result.summary.needs_review,
            needs_manual_input = result.summary.needs_manual_input,
            skipped = result.summary.skipped,
            "conversion complete"
        );
        result
    }

    async fn convert_income(
        &mut self,
        records: &[TransactionRecord],
        income: &[usize],
        slots: &mut [Option<ClassifiedTransaction>],
    ) {
        let use_cache = self.config.processing.use_cache;
        let mut pending: Vec<(usize, Option<PatternHint>)> = Vec::new();

        for &i in income {
            let record = &records[i];

            if use_cache {
                if let Some(hit) = self.cache.get(&record.desc_base, &record.desc_opt) {
                    debug!(index = i, "cache hit");
                    slots[i] = Some(self.classify(record, Classification::Income(hit)));
                    continue;
                }
            }

            let mut hint = None;
            if self.config.processing.use_regex_first {
                if let Some(found) = self.extractor.extract(record) {
                    if found.confidence.overall() >= self.config.processing.regex_acceptance {
                        if use_cache {
                            self.cache.set(&record.desc_base, &record.desc_opt, found.clone());
                        }
                        slots[i] = Some(self.classify(record, Classification::Income(found)));
                        continue;
                    }
                    debug!(
                        index = i,
                        overall = found.confidence.overall(),
                        "pattern match below acceptance, delegating with hint"
                    );
                    hint = Some(PatternHint {
                        building_number: found.building_number,
                        apartment_number: found.apartment_number,
                        tenant_name: found.tenant_name,
                        confidence: found.confidence.overall(),
                    });
                }
            }
            pending.push((i, hint));
        }

        info!(
            quick = income.len() - pending.len(),
            delegated = pending.len(),
            "income quick path finished"
        );
        if pending.is_empty() {
            return;
        }

        let Some(provider) = &self.provider else {
            warn!(count = pending.len(), "no reasoning provider, income needs manual input");
            for (i, _) in pending {
                let fallback = ExtractionResult::manual_fallback(&records[i], NO_PROVIDER_WARNING);
                slots[i] = Some(self.classify(&records[i], Classification::Income(fallback)));
            }
            return;
        };

        let batch_size = self.address_batch_size();
        let batches = pending.len().div_ceil(batch_size);
        let deadline = self.config.reasoning.delegation_timeout_secs;

        for (batch_no, chunk) in pending.chunks(batch_size).enumerate() {
            info!(batch = batch_no + 1, of = batches, items = chunk.len(), "address batch");
            let items: Vec<AddressRequestItem> = chunk
                .iter()
                .enumerate()
                .map(|(j, (i, hint))| {
                    let record = &records[*i];
                    AddressRequestItem {
                        index: j,
                        desc_base: record.desc_base.clone(),
                        desc_opt: record.desc_opt.clone(),
                        amount: record.amount,
                        date: record.exe_date,
                        hint: hint.clone(),
                    }
                })
                .collect();

            let answered = with_deadline(deadline, provider.extract_addresses(&items))
                .await
                .and_then(|results| align_results(results, items.len()));

            match answered {
                Ok(answers) => {
                    for (answer, (i, _)) in answers.into_iter().zip(chunk) {
                        let record = &records[*i];
                        let extracted = delegated_extraction(record, answer);
                        if use_cache {
                            self.cache.set(&record.desc_base, &record.desc_opt, extracted.clone());
                        }
                        slots[*i] = Some(ClassifiedTransaction::new(
                            record.clone(),
                            Classification::Income(extracted),
                            &self.config.thresholds,
                        ));
                    }
                }
                Err(e) => {
                    warn!(batch = batch_no + 1, provider = provider.name(), error = %e, "address batch failed");
                    let warning = format!("External reasoning failed: {e}");
                    for (i, _) in chunk {
                        let fallback = ExtractionResult::manual_fallback(&records[*i], warning.clone());
                        slots[*i] = Some(ClassifiedTransaction::new(
                            records[*i].clone(),
                            Classification::Income(fallback),
                            &self.config.thresholds,
                        ));
                    }
                }
            }
        }
    }

    async fn convert_expenses(
        &mut self,
        records: &[TransactionRecord],
        expenses: &[usize],
        slots: &mut [Option<ClassifiedTransaction>],
    ) {
        let acceptance = self.config.processing.contractor_acceptance;
        let mut pending: Vec<usize> = Vec::new();

        for &i in expenses {
            let matched = self.matcher.match_transaction(&records[i]);
            if matched.is_matched() && matched.confidence >= acceptance {
                slots[i] = Some(self.classify(&records[i], Classification::Expense(matched)));
            } else {
                pending.push(i);
            }
        }

        info!(
            quick = expenses.len() - pending.len(),
            delegated = pending.len(),
            "expense quick path finished"
        );
        if pending.is_empty() {
            return;
        }

        let Some(provider) = &self.provider else {
            warn!(count = pending.len(), "no reasoning provider, expenses need manual input");
            for i in pending {
                let fallback = ContractorMatchResult::manual_fallback(NO_PROVIDER_WARNING);
                slots[i] = Some(self.classify(&records[i], Classification::Expense(fallback)));
            }
            return;
        };

        let shortlist = self.config.processing.candidate_shortlist;
        let batch_size = self.contractor_batch_size();
        let batches = pending.len().div_ceil(batch_size);
        let deadline = self.config.reasoning.delegation_timeout_secs;

        for (batch_no, chunk) in pending.chunks(batch_size).enumerate() {
            info!(batch = batch_no + 1, of = batches, items = chunk.len(), "contractor batch");
            let shortlists: Vec<Vec<Contractor>> = chunk
                .iter()
                .map(|&i| self.matcher.top_candidates(&records[i], shortlist))
                .collect();
            let items: Vec<ContractorRequestItem> = chunk
                .iter()
                .zip(&shortlists)
                .enumerate()
                .map(|(j, (&i, candidates))| ContractorRequestItem {
                    index: j,
                    desc_base: records[i].desc_base.clone(),
                    desc_opt: records[i].desc_opt.clone(),
                    candidates: candidates.iter().map(CandidateRef::from).collect(),
                })
                .collect();

            let answered = with_deadline(deadline, provider.match_contractors(&items))
                .await
                .and_then(|results| align_results(results, items.len()));

            match answered {
                Ok(answers) => {
                    for ((answer, &i), candidates) in answers.into_iter().zip(chunk).zip(&shortlists) {
                        let matched = delegated_match(candidates, answer);
                        slots[i] = Some(self.classify(&records[i], Classification::Expense(matched)));
                    }
                }
                Err(e) => {
                    warn!(batch = batch_no + 1, provider = provider.name(), error = %e, "contractor batch failed");
                    let warning = format!("External reasoning failed: {e}");
                    for &i in chunk {
                        let fallback = ContractorMatchResult::manual_fallback(warning.clone());
                        slots[i] = Some(self.classify(&records[i], Classification::Expense(fallback)));
                    }
                }
            }
        }
    }
}
