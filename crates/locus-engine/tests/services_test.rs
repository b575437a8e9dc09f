//! Reranking and vision hinting through the pipeline, with fake services.

use async_trait::async_trait;
use locus_common::LocatorKind;
use locus_common::locator::LocatorKindHint;
use locus_common::protocol::{ElementInput, HealRequest};
use locus_engine::Healer;
use locus_engine::config::LocusConfig;
use locus_engine::rerank::{ContextReranker, RerankChoice, RerankError, RerankRequest};
use locus_engine::vision::{VisionError, VisionHinter, VisionHints, VisionRequest};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

enum Behaviour {
    Choose(&'static str),
    Fail,
    Hang,
}

struct FakeReranker {
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl FakeReranker {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextReranker for FakeReranker {
    async fn choose(&self, _request: &RerankRequest) -> Result<RerankChoice, RerankError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Choose(selector) => Ok(RerankChoice {
                selector: selector.to_string(),
                kind: LocatorKind::Css,
                reason: None,
            }),
            Behaviour::Fail => Err(RerankError::Unusable("garbled".into())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(RerankError::Unusable("unreachable".into()))
            }
        }
    }
}

struct FakeVision {
    fail: bool,
}

#[async_trait]
impl VisionHinter for FakeVision {
    async fn hint(&self, request: &VisionRequest) -> Result<VisionHints, VisionError> {
        if self.fail {
            return Err(VisionError::Unusable("blurry".into()));
        }
        let prominence: BTreeMap<u32, f64> = request
            .targets
            .iter()
            .map(|t| (t.element, if t.element == 0 { 0.9 } else { 0.1 }))
            .collect();
        Ok(VisionHints {
            prominence,
            summary: Some("login form".into()),
        })
    }
}

fn login_request() -> HealRequest {
    HealRequest::new("#username-old")
        .with_elements(vec![
            ElementInput::new("input").attr("id", "username"),
            ElementInput::new("input").attr("id", "password"),
        ])
        .with_usage("focus on password field")
}

#[tokio::test]
async fn test_failed_rerank_keeps_heuristic_order() {
    let baseline = Healer::new(LocusConfig::default())
        .heal(&login_request())
        .await
        .unwrap();

    let reranker = FakeReranker::new(Behaviour::Fail);
    let healer = Healer::new(LocusConfig::default()).with_reranker(reranker.clone());
    let response = healer.heal(&login_request()).await.unwrap();

    assert_eq!(reranker.calls(), 1);
    assert!(!response.metadata.reranked);
    assert_eq!(response.metadata.degradations.len(), 1);
    assert!(response.metadata.degradations[0].starts_with("rerank"));
    assert_eq!(response.css_candidates, baseline.css_candidates);
    assert_eq!(response.auto_selected, baseline.auto_selected);
}

#[tokio::test]
async fn test_unknown_choice_is_ignored() {
    let healer = Healer::new(LocusConfig::default())
        .with_reranker(FakeReranker::new(Behaviour::Choose("#not-submitted")));
    let response = healer.heal(&login_request()).await.unwrap();

    assert!(!response.metadata.reranked);
    assert_eq!(response.auto_selected.css.as_deref(), Some("#username"));
    assert!(response.metadata.degradations[0].contains("#not-submitted"));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_rerank_times_out() {
    let mut config = LocusConfig::default();
    config.rerank.timeout_ms = 50;
    let healer = Healer::new(config).with_reranker(FakeReranker::new(Behaviour::Hang));

    let response = healer.heal(&login_request()).await.unwrap();
    assert!(!response.metadata.reranked);
    assert!(response.metadata.degradations[0].contains("timed out"));
    assert_eq!(response.auto_selected.css.as_deref(), Some("#username"));
}

#[tokio::test(start_paused = true)]
async fn test_lapsed_deadline_skips_waiting() {
    let mut config = LocusConfig::default();
    config.request_deadline_ms = 0;
    let healer = Healer::new(config).with_reranker(FakeReranker::new(Behaviour::Hang));

    let response = healer.heal(&login_request()).await.unwrap();
    assert!(!response.metadata.reranked);
    assert!(!response.css_candidates.is_empty());
}

#[tokio::test]
async fn test_rerank_needs_usage_and_enough_candidates() {
    let reranker = FakeReranker::new(Behaviour::Choose("#password"));
    let healer = Healer::new(LocusConfig::default()).with_reranker(reranker.clone());

    let no_usage = HealRequest {
        usage_description: Some("   ".into()),
        ..login_request()
    };
    healer.heal(&no_usage).await.unwrap();
    assert_eq!(reranker.calls(), 0);

    let single = HealRequest {
        locator_kind_hint: LocatorKindHint::Css,
        ..HealRequest::new("#old")
            .with_elements(vec![ElementInput::new("input").attr("id", "only")])
            .with_usage("type the query")
    };
    let response = healer.heal(&single).await.unwrap();
    assert_eq!(reranker.calls(), 0);
    assert!(!response.metadata.reranked);
    assert!(response.metadata.degradations.is_empty());
}

#[tokio::test]
async fn test_vision_hints_never_change_scores() {
    let request = HealRequest {
        screenshot_ref: Some("/tmp/login.png".into()),
        ..login_request()
    };
    let baseline = Healer::new(LocusConfig::default())
        .heal(&request)
        .await
        .unwrap();

    let healer = Healer::new(LocusConfig::default()).with_vision(Arc::new(FakeVision { fail: false }));
    let response = healer.heal(&request).await.unwrap();

    assert!(response.metadata.vision_used);
    let username = &response.css_candidates[0];
    assert_eq!(username.selector, "#username");
    assert_eq!(username.visual_prominence, Some(0.9));
    assert_eq!(response.css_candidates[1].visual_prominence, Some(0.1));

    for (with, without) in response.css_candidates.iter().zip(&baseline.css_candidates) {
        assert_eq!(with.selector, without.selector);
        assert_eq!(with.score, without.score);
        assert_eq!(with.rank, without.rank);
    }
}

#[tokio::test]
async fn test_vision_failure_and_absent_screenshot() {
    let healer = Healer::new(LocusConfig::default()).with_vision(Arc::new(FakeVision { fail: true }));

    let with_shot = HealRequest {
        screenshot_ref: Some("/tmp/login.png".into()),
        ..login_request()
    };
    let response = healer.heal(&with_shot).await.unwrap();
    assert!(!response.metadata.vision_used);
    assert!(response.metadata.degradations[0].starts_with("vision"));
    assert!(response.css_candidates.iter().all(|c| c.visual_prominence.is_none()));

    let response = healer.heal(&login_request()).await.unwrap();
    assert!(!response.metadata.vision_used);
    assert!(response.metadata.degradations.is_empty());
}

#[tokio::test]
async fn test_rerank_and_vision_together() {
    let request = HealRequest {
        screenshot_ref: Some("/tmp/login.png".into()),
        ..login_request()
    };
    let healer = Healer::new(LocusConfig::default())
        .with_reranker(FakeReranker::new(Behaviour::Choose("#password")))
        .with_vision(Arc::new(FakeVision { fail: false }));
    let response = healer.heal(&request).await.unwrap();

    assert!(response.metadata.reranked);
    assert!(response.metadata.vision_used);
    assert_eq!(response.auto_selected.css.as_deref(), Some("#password"));
    assert_eq!(response.css_candidates[0].visual_prominence, Some(0.1));
}
