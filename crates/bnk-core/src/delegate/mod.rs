//! Contract with the external reasoning service.
//!
//! The converter hands uncertain transactions to a [`ReasoningProvider`] in
//! batches. Items carry a batch-local `index`; responses are matched back by
//! that index.

pub mod prompts;
mod prompted;

use std::future::Future;
use std::time::Duration;

use bnk_reasoning::{Backend, CompletionBackend, ProviderKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::DelegationError;
use crate::models::{Contractor, MatchField, ReasoningConfig};

pub use prompted::PromptedProvider;

/// Partial pattern match passed along with an address request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternHint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apartment_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,
    pub confidence: u8,
}

/// One income transaction to extract an address from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequestItem {
    pub index: usize,
    pub desc_base: String,
    pub desc_opt: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<PatternHint>,
}

/// Per-field confidence returned by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfidence {
    #[serde(default, deserialize_with = "score")]
    pub address: u8,
    #[serde(default, deserialize_with = "score")]
    pub apartment: u8,
    #[serde(default, deserialize_with = "score")]
    pub tenant_name: u8,
}

/// Extraction answer for one request item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressResponseItem {
    pub index: usize,
    #[serde(default)]
    pub street_name: Option<String>,
    #[serde(default)]
    pub building_number: Option<String>,
    #[serde(default)]
    pub apartment_number: Option<String>,
    #[serde(default)]
    pub full_address: Option<String>,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub confidence: FieldConfidence,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Contractor offered to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRef {
    pub id: i64,
    pub name: String,
}

impl From<&Contractor> for CandidateRef {
    fn from(contractor: &Contractor) -> Self {
        Self {
            id: contractor.id,
            name: contractor.name.clone(),
        }
    }
}

/// One expense transaction with its candidate shortlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorRequestItem {
    pub index: usize,
    pub desc_base: String,
    pub desc_opt: String,
    pub candidates: Vec<CandidateRef>,
}

/// Contractor answer for one request item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorResponseItem {
    pub index: usize,
    #[serde(default)]
    pub contractor_id: Option<i64>,
    #[serde(default, deserialize_with = "score")]
    pub confidence: u8,
    #[serde(default)]
    pub matched_in: MatchField,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// `{ "results": [...] }` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse<T> {
    pub results: Vec<T>,
}

/// Accept integer or fractional scores, clamped to 0-100.
fn score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.round().clamp(0.0, 100.0) as u8)
}

/// Items answered by index.
pub trait Indexed {
    fn index(&self) -> usize;
}

impl Indexed for AddressResponseItem {
    fn index(&self) -> usize {
        self.index
    }
}

impl Indexed for ContractorResponseItem {
    fn index(&self) -> usize {
        self.index
    }
}

/// Order a response by index, requiring exactly one answer per request item.
pub fn align_results<T: Indexed>(
    results: Vec<T>,
    expected: usize,
) -> Result<Vec<T>, DelegationError> {
    if results.len() != expected {
        return Err(DelegationError::Mismatch(format!(
            "expected {expected} results, got {}",
            results.len()
        )));
    }
    let mut slots: Vec<Option<T>> = (0..expected).map(|_| None).collect();
    for item in results {
        let index = item.index();
        let slot = slots.get_mut(index).ok_or_else(|| {
            DelegationError::Mismatch(format!("index {index} out of range 0..{expected}"))
        })?;
        if slot.is_some() {
            return Err(DelegationError::Mismatch(format!("duplicate index {index}")));
        }
        *slot = Some(item);
    }
    // Every slot is filled: lengths match and no index repeats.
    Ok(slots.into_iter().flatten().collect())
}

/// External reasoning capability.
///
/// Implementations receive one batch at a time and answer every item or
/// fail the whole batch.
pub trait ReasoningProvider: Send + Sync {
    /// Extract address and tenant for each income item.
    fn extract_addresses(
        &self,
        items: &[AddressRequestItem],
    ) -> impl Future<Output = Result<Vec<AddressResponseItem>, DelegationError>> + Send;

    /// Pick a contractor from each item's shortlist.
    fn match_contractors(
        &self,
        items: &[ContractorRequestItem],
    ) -> impl Future<Output = Result<Vec<ContractorResponseItem>, DelegationError>> + Send;

    /// Name used in logs and warnings.
    fn name(&self) -> &str;
}

/// Provider type for converters built without one. Cannot be constructed.
#[derive(Debug, Clone, Copy)]
pub enum NoProvider {}

impl ReasoningProvider for NoProvider {
    async fn extract_addresses(
        &self,
        _items: &[AddressRequestItem],
    ) -> Result<Vec<AddressResponseItem>, DelegationError> {
        match *self {}
    }

    async fn match_contractors(
        &self,
        _items: &[ContractorRequestItem],
    ) -> Result<Vec<ContractorResponseItem>, DelegationError> {
        match *self {}
    }

    fn name(&self) -> &str {
        match *self {}
    }
}

/// Build the configured provider.
///
/// `Ok(None)` when the provider is `none` or no API key can be found; the
/// converter then routes uncertain items to manual input.
pub fn provider_from_config(
    config: &ReasoningConfig,
) -> Result<Option<PromptedProvider<Backend>>, DelegationError> {
    if config.provider == ProviderKind::None {
        return Ok(None);
    }
    let Some(api_key) = config.resolve_api_key() else {
        warn!(
            provider = ?config.provider,
            env = config.api_key_env.as_deref().unwrap_or("-"),
            "no API key for reasoning provider, delegation disabled"
        );
        return Ok(None);
    };
    let Some(backend) = Backend::from_kind(
        config.provider,
        &api_key,
        config.model.as_deref(),
        Duration::from_secs(config.request_timeout_secs),
    )?
    else {
        return Ok(None);
    };
    let backend = match &config.base_url {
        Some(url) => backend.with_url(url.clone()),
        None => backend,
    }
    .with_max_retries(config.max_retries);
    debug!(
        provider = backend.provider(),
        model = backend.model(),
        endpoint = backend.url(),
        "reasoning backend ready"
    );
    Ok(Some(PromptedProvider::new(backend)))
}
