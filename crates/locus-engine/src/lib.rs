pub mod cache;
pub mod candidate;
pub mod config;
pub mod dom;
pub mod history;
pub mod llm;
pub mod pipeline;
pub mod rank;
pub mod rerank;
pub mod scoring;
pub mod vision;

pub use config::{ConfigError, ConfigLoader, LocusConfig};
pub use pipeline::{Healer, Resolution};
