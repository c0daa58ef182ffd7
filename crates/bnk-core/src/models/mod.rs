//! Data models shared by the extraction pipeline and the ledger exporter.

pub mod classified;
pub mod config;
pub mod contractor;
pub mod extraction;
pub mod transaction;

pub use classified::{
    Classification, ClassifiedTransaction, ConfidenceThresholds, Correction, ReviewStatus,
};
pub use config::{
    ConverterConfig, DateFormat, ExportConfig, ProcessingConfig, ReasoningConfig,
};
pub use contractor::{Contractor, ContractorMatchResult, MatchField};
pub use extraction::{Confidence, ExtractionMethod, ExtractionResult, RawDescriptions};
pub use transaction::{TransactionKind, TransactionRecord};
