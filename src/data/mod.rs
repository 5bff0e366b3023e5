//! Data module - loading, StatBank fetch, merge and derived metrics

pub mod loader;
mod merge;
mod processor;
pub mod statbank;

pub use loader::DataLoader;
pub use merge::{DataMerger, JoinPolicy, MergeError, RegionYearRecord};
pub use processor::{DataProcessor, DerivedRecord, ProcessorError};
pub use statbank::StatBankClient;
