//! Core library for Polish bank statement conversion.
//!
//! This crate provides:
//! - Santander-style XML statement parsing and filtering
//! - Address and tenant extraction from transfer descriptions
//! - Contractor matching for expenses
//! - A hybrid converter that delegates uncertain cases to an external reasoning service
//! - Ledger export for the accounting system

pub mod cache;
pub mod converter;
pub mod delegate;
pub mod error;
pub mod extraction;
pub mod ledger;
pub mod matcher;
pub mod models;
pub mod statement;

pub use cache::{CacheStats, MemoryCache, NoopCache, ResultCache};
pub use converter::{ConversionResult, ConversionSummary, HybridConverter};
pub use delegate::{provider_from_config, NoProvider, PromptedProvider, ReasoningProvider};
pub use error::{BnkError, Result};
pub use extraction::PatternExtractor;
pub use ledger::{ExportOptions, LedgerExporter};
pub use matcher::ContractorMatcher;
pub use models::{
    ClassifiedTransaction, Contractor, ConverterConfig, ExtractionResult, TransactionRecord,
};
pub use statement::{Statement, StatementParser, TransactionFilter};

/// Re-export backend types.
pub use bnk_reasoning::{Backend, ProviderKind};
