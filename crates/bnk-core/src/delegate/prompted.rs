//! Reasoning provider backed by a text-completion API.

use bnk_reasoning::{strip_code_fences, CompletionBackend, CompletionRequest};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::prompts::{
    address_max_tokens, address_prompt, contractor_max_tokens, contractor_prompt,
    ADDRESS_SYSTEM_PROMPT, CONTRACTOR_SYSTEM_PROMPT,
};
use super::{
    AddressRequestItem, AddressResponseItem, BatchResponse, ContractorRequestItem,
    ContractorResponseItem, ReasoningProvider,
};
use crate::error::DelegationError;

/// Sends prompts to a [`CompletionBackend`] and parses the JSON answers.
pub struct PromptedProvider<B> {
    backend: B,
    label: String,
}

impl<B: CompletionBackend> PromptedProvider<B> {
    pub fn new(backend: B) -> Self {
        let label = format!("{} ({})", backend.provider(), backend.model());
        Self { backend, label }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn ask<T: DeserializeOwned>(
        &self,
        request: CompletionRequest,
    ) -> Result<Vec<T>, DelegationError> {
        let raw = self.backend.complete(&request).await?;
        debug!(provider = %self.label, chars = raw.len(), "received completion");
        parse_batch(&raw)
    }
}

/// Parse a possibly fenced `{ "results": [...] }` answer.
pub(crate) fn parse_batch<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, DelegationError> {
    let json = strip_code_fences(raw);
    serde_json::from_str::<BatchResponse<T>>(json)
        .map(|response| response.results)
        .map_err(|e| DelegationError::MalformedResponse(e.to_string()))
}

impl<B: CompletionBackend> ReasoningProvider for PromptedProvider<B> {
    async fn extract_addresses(
        &self,
        items: &[AddressRequestItem],
    ) -> Result<Vec<AddressResponseItem>, DelegationError> {
        info!(provider = %self.label, items = items.len(), "delegating address extraction");
        let request = CompletionRequest::new(ADDRESS_SYSTEM_PROMPT, address_prompt(items))
            .with_max_tokens(address_max_tokens(items.len()));
        self.ask(request).await
    }

    async fn match_contractors(
        &self,
        items: &[ContractorRequestItem],
    ) -> Result<Vec<ContractorResponseItem>, DelegationError> {
        info!(provider = %self.label, items = items.len(), "delegating contractor matching");
        let request = CompletionRequest::new(CONTRACTOR_SYSTEM_PROMPT, contractor_prompt(items))
            .with_max_tokens(contractor_max_tokens(items.len()));
        self.ask(request).await
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::CandidateRef;
    use bnk_reasoning::ReasoningError;
    use std::sync::Mutex;

    /// Backend returning a canned answer and recording prompts.
    struct CannedBackend {
        answer: Result<String, ReasoningError>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl CannedBackend {
        fn ok(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionBackend for CannedBackend {
        async fn complete(&self, request: &CompletionRequest) -> bnk_reasoning::Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            self.answer.clone()
        }

        fn provider(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "test"
        }
    }

    fn contractor_items() -> Vec<ContractorRequestItem> {
        vec![ContractorRequestItem {
            index: 0,
            desc_base: "FV ORANGE".into(),
            desc_opt: "".into(),
            candidates: vec![CandidateRef { id: 4, name: "ORANGE POLSKA".into() }],
        }]
    }

    #[tokio::test]
    async fn test_fenced_answer_is_parsed() {
        let provider = PromptedProvider::new(CannedBackend::ok(
            "```json\n{\"results\": [{\"index\": 0, \"contractorId\": 4, \"confidence\": 88, \"matchedIn\": \"desc-base\"}]}\n```",
        ));
        let results = provider.match_contractors(&contractor_items()).await.unwrap();
        assert_eq!(results[0].contractor_id, Some(4));
        assert_eq!(results[0].confidence, 88);

        let seen = provider.backend().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].user.contains("ORANGE POLSKA"));
        assert_eq!(seen[0].max_tokens, 1100);
        assert_eq!(provider.name(), "canned (test)");
    }

    #[tokio::test]
    async fn test_prose_answer_is_malformed() {
        let provider = PromptedProvider::new(CannedBackend::ok("I could not find anything."));
        let err = provider.match_contractors(&contractor_items()).await.unwrap_err();
        assert!(matches!(err, DelegationError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = CannedBackend {
            answer: Err(ReasoningError::quota_exceeded("canned", "test")),
            seen: Mutex::new(Vec::new()),
        };
        let err = PromptedProvider::new(backend)
            .match_contractors(&contractor_items())
            .await
            .unwrap_err();
        assert!(matches!(err, DelegationError::Backend(_)));
    }
}
