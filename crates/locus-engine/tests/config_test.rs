use locus_common::protocol::{ElementInput, HealRequest};
use locus_engine::Healer;
use locus_engine::config::loader::ConfigLoader;
use locus_engine::config::schema::{LocusConfig, MAX_BUCKET_SIZE, ScoringWeights};
use std::io::Write;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_default_config_loading() {
    let config = ConfigLoader::load_default()
        .await
        .expect("Failed to load default config");
    assert_eq!(config.scoring.max_candidates, 30);
    assert_eq!(config.rerank.top_k, 8);
}

#[tokio::test]
async fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
scoring:
  weights:
    base: 0.5
    stability: 0.3
    semantic: 0.2
  bucket_size: 3
volatility:
  ephemeral_substrings:
    - "experiment"
rerank:
  enabled: false
  llm:
    model: "local/tiny"
    "#
    )
    .unwrap();

    let config = ConfigLoader::load_from(file.path())
        .await
        .expect("Failed to load config from file");

    assert_eq!(config.scoring.weights, ScoringWeights::new(0.5, 0.3, 0.2));
    assert_eq!(config.scoring.bucket_size, 3);
    // Unset fields in a section keep their defaults.
    assert_eq!(config.scoring.max_candidates, 30);
    // Serde replaces lists rather than merging them.
    assert_eq!(
        config.volatility.ephemeral_substrings,
        vec!["experiment".to_string()]
    );
    assert!(!config.rerank.enabled);
    assert_eq!(config.rerank.llm.model, "local/tiny");
    assert_eq!(config.rerank.llm.api_key_env, "OPENROUTER_API_KEY");
}

#[tokio::test]
async fn test_empty_file_is_default() {
    let file = NamedTempFile::new().unwrap();
    let config = ConfigLoader::load_from(file.path()).await.unwrap();
    assert_eq!(config.request_deadline_ms, 45000);
    assert!(!config.cache.enabled);
}

#[test]
fn test_default_values() {
    let config = LocusConfig::default();
    assert_eq!(config.scoring.weights, ScoringWeights::new(0.3, 0.4, 0.3));
    assert_eq!(config.extraction.max_elements, 250);
    assert_eq!(config.batch.max_items, 10);
    assert!(config.rerank.enabled);
    assert!(!config.vision.enabled);
    assert_eq!(config.vision.llm.model, "google/gemini-pro-vision");
}

#[test]
fn test_weight_validation() {
    assert!(ScoringWeights::default().is_valid());
    assert!(!ScoringWeights::new(0.3, 0.3, 0.3).is_valid());
    assert!(!ScoringWeights::new(0.5, 0.4, 0.2).is_valid());
    assert!(!ScoringWeights::new(1.2, -0.2, 0.0).is_valid());
    assert!(!ScoringWeights::new(f64::NAN, 0.5, 0.5).is_valid());

    assert_eq!(
        ScoringWeights::new(0.3, 0.3, 0.3).validated(),
        ScoringWeights::default()
    );
    let custom = ScoringWeights::new(0.2, 0.5, 0.3);
    assert_eq!(custom.validated(), custom);
}

#[tokio::test]
async fn test_oversized_bucket_is_clamped() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
scoring:
  bucket_size: 8
  weights:
    base: 0.6
    stability: 0.6
    semantic: 0.6
    "#
    )
    .unwrap();

    let config = ConfigLoader::load_from(file.path()).await.unwrap();
    assert_eq!(config.scoring.bucket_size, 8);

    let healer = Healer::new(config);
    assert_eq!(healer.config().scoring.bucket_size, MAX_BUCKET_SIZE);
    assert_eq!(healer.config().scoring.weights, ScoringWeights::default());

    let buttons: Vec<ElementInput> = (0..8)
        .map(|i| ElementInput::new("button").attr("id", format!("action-{}", i)))
        .collect();
    let response = healer
        .heal(&HealRequest::new("#action-old").with_elements(buttons))
        .await
        .unwrap();
    assert_eq!(response.css_candidates.len(), MAX_BUCKET_SIZE);
    assert_eq!(response.xpath_candidates.len(), MAX_BUCKET_SIZE);
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
async fn test_load_from_nonexistent_file() {
    let result =
        ConfigLoader::load_from(std::path::Path::new("/nonexistent/path/locus.yaml")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_load_from_invalid_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{{invalid yaml: [unclosed").unwrap();

    let result = ConfigLoader::load_from(file.path()).await;
    assert!(result.is_err());
}
