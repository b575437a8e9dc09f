use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocusConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub volatility: VolatilityPolicy,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default = "default_request_deadline_ms")]
    pub request_deadline_ms: u64,
}

impl Default for LocusConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            extraction: ExtractionConfig::default(),
            volatility: VolatilityPolicy::default(),
            rerank: RerankConfig::default(),
            vision: VisionConfig::default(),
            cache: CacheConfig::default(),
            batch: BatchConfig::default(),
            request_deadline_ms: default_request_deadline_ms(),
        }
    }
}

fn default_request_deadline_ms() -> u64 {
    45000
}

// ============================================================================
// Scoring
// ============================================================================

/// Composite score weights. Must sum to 1; see `ScoringWeights::validated`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_weight_base")]
    pub base: f64,
    #[serde(default = "default_weight_stability")]
    pub stability: f64,
    #[serde(default = "default_weight_semantic")]
    pub semantic: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: default_weight_base(),
            stability: default_weight_stability(),
            semantic: default_weight_semantic(),
        }
    }
}

impl ScoringWeights {
    const SUM_TOLERANCE: f64 = 1e-6;

    pub fn new(base: f64, stability: f64, semantic: f64) -> Self {
        Self {
            base,
            stability,
            semantic,
        }
    }

    pub fn is_valid(&self) -> bool {
        let parts = [self.base, self.stability, self.semantic];
        parts.iter().all(|w| w.is_finite() && *w >= 0.0)
            && (parts.iter().sum::<f64>() - 1.0).abs() <= Self::SUM_TOLERANCE
    }

    /// The weights themselves if valid, otherwise the defaults.
    pub fn validated(self) -> Self {
        if self.is_valid() {
            self
        } else {
            tracing::warn!(
                base = self.base,
                stability = self.stability,
                semantic = self.semantic,
                "Scoring weights do not sum to 1, falling back to defaults"
            );
            Self::default()
        }
    }
}

fn default_weight_base() -> f64 {
    0.3
}

fn default_weight_stability() -> f64 {
    0.4
}

fn default_weight_semantic() -> f64 {
    0.3
}

/// Upper bound on candidates returned per locator kind.
pub const MAX_BUCKET_SIZE: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_bucket_size")]
    pub bucket_size: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            max_candidates: default_max_candidates(),
            bucket_size: default_bucket_size(),
        }
    }
}

impl ScoringConfig {
    /// Replace invalid weights with the defaults and bound `bucket_size` to
    /// `1..=MAX_BUCKET_SIZE`, warning once for each correction.
    pub fn validated(self) -> Self {
        let bucket_size = self.bucket_size.clamp(1, MAX_BUCKET_SIZE);
        if bucket_size != self.bucket_size {
            tracing::warn!(
                configured = self.bucket_size,
                used = bucket_size,
                "Bucket size out of range, clamping"
            );
        }
        Self {
            weights: self.weights.validated(),
            bucket_size,
            ..self
        }
    }
}

fn default_max_candidates() -> usize {
    30
}

fn default_bucket_size() -> usize {
    5
}

// ============================================================================
// Extraction
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,
    #[serde(default = "default_text_limit")]
    pub text_limit: usize,
    #[serde(default = "default_max_text_locator_len")]
    pub max_text_locator_len: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_elements: default_max_elements(),
            text_limit: default_text_limit(),
            max_text_locator_len: default_max_text_locator_len(),
        }
    }
}

fn default_max_elements() -> usize {
    250
}

fn default_text_limit() -> usize {
    150
}

fn default_max_text_locator_len() -> usize {
    60
}

// ============================================================================
// Volatility policy
// ============================================================================

/// Thresholds deciding when a token or locator looks unstable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilityPolicy {
    /// Alphanumeric runs at least this long that mix letters and digits are
    /// treated as generated.
    #[serde(default = "default_min_random_run")]
    pub min_random_run: usize,
    #[serde(default = "default_ephemeral_substrings")]
    pub ephemeral_substrings: Vec<String>,
    #[serde(default = "default_ephemeral_prefixes")]
    pub ephemeral_prefixes: Vec<String>,
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
    #[serde(default = "default_short_locator_len")]
    pub short_locator_len: usize,
}

impl Default for VolatilityPolicy {
    fn default() -> Self {
        Self {
            min_random_run: default_min_random_run(),
            ephemeral_substrings: default_ephemeral_substrings(),
            ephemeral_prefixes: default_ephemeral_prefixes(),
            max_nesting_depth: default_max_nesting_depth(),
            short_locator_len: default_short_locator_len(),
        }
    }
}

fn default_min_random_run() -> usize {
    8
}

fn default_ephemeral_substrings() -> Vec<String> {
    vec!["weblab".to_string(), "dingo".to_string(), "abtest".to_string()]
}

fn default_ephemeral_prefixes() -> Vec<String> {
    vec![
        "css-".to_string(),
        "sc-".to_string(),
        "jsx-".to_string(),
        "ember".to_string(),
        "ng-tns".to_string(),
    ]
}

fn default_max_nesting_depth() -> usize {
    4
}

fn default_short_locator_len() -> usize {
    40
}

// ============================================================================
// External services
// ============================================================================

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

impl LlmConfig {
    fn vision_default() -> Self {
        Self {
            model: default_vision_model(),
            max_tokens: 500,
            ..Self::default()
        }
    }
}

fn default_llm_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "meta-llama/llama-3-8b-instruct".to_string()
}

fn default_vision_model() -> String {
    "google/gemini-pro-vision".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    800
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    #[serde(default = "default_rerank_enabled")]
    pub enabled: bool,
    #[serde(default = "default_rerank_top_k")]
    pub top_k: usize,
    #[serde(default = "default_service_timeout_ms")]
    pub timeout_ms: u64,
    /// Score increment applied to the promoted candidate.
    #[serde(default = "default_rerank_boost")]
    pub boost: f64,
    #[serde(default = "default_rerank_min_candidates")]
    pub min_candidates: usize,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: default_rerank_enabled(),
            top_k: default_rerank_top_k(),
            timeout_ms: default_service_timeout_ms(),
            boost: default_rerank_boost(),
            min_candidates: default_rerank_min_candidates(),
            llm: LlmConfig::default(),
        }
    }
}

fn default_rerank_enabled() -> bool {
    true
}

fn default_rerank_top_k() -> usize {
    8
}

fn default_service_timeout_ms() -> u64 {
    30000
}

fn default_rerank_boost() -> f64 {
    0.05
}

fn default_rerank_min_candidates() -> usize {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_service_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "LlmConfig::vision_default")]
    pub llm: LlmConfig,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: default_service_timeout_ms(),
            llm: LlmConfig::vision_default(),
        }
    }
}

// ============================================================================
// Cache & batch
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: default_cache_ttl_secs(),
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_cache_capacity() -> usize {
    512
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_batch_max_items")]
    pub max_items: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_items: default_batch_max_items(),
        }
    }
}

fn default_batch_max_items() -> usize {
    10
}
