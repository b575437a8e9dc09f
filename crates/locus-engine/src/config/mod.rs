pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{
    BatchConfig, CacheConfig, ExtractionConfig, LlmConfig, LocusConfig, MAX_BUCKET_SIZE,
    RerankConfig, ScoringConfig, ScoringWeights, VisionConfig, VolatilityPolicy,
};
