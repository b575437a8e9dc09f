//! Request orchestration: extraction, generation, scoring, ranking, the
//! optional external passes, and auto-selection.

use crate::cache::{CacheKey, HealCache, InMemoryHealCache};
use crate::candidate::{CandidateGenerator, VolatilityDetector};
use crate::config::LocusConfig;
use crate::dom::{ElementModelBuilder, ElementSet};
use crate::history::{HealingHistory, HealingRecord};
use crate::rank::{RankAggregator, RankedCandidate, Ranking};
use crate::rerank::{ContextReranker, LlmReranker, RerankRequest, rerank_with_timeout};
use crate::scoring::{BaseScorer, FeatureScorer};
use crate::vision::{LlmVisionHinter, VisionHinter, VisionRequest, hint_with_timeout};
use futures::future::join_all;
use locus_common::HealError;
use locus_common::LocatorKind;
use locus_common::protocol::{
    BatchHealRequest, BatchHealResponse, BatchItem, CandidateView, HealRequest, HealResponse,
    PipelineStage, RawBatchHealRequest, ResponseMetadata,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

const MSG_HEALED: &str = "Healed";
const MSG_CACHED: &str = "Healed (cached)";
const MSG_NO_ELEMENTS: &str = "No interactive elements found on the page";
const MSG_NO_CANDIDATES: &str = "No replacement locator could be generated for the extracted elements";

/// Everything the heuristic stages produced for one request.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub elements: ElementSet,
    pub ranking: Ranking,
    pub skipped: usize,
}

pub struct Healer {
    config: LocusConfig,
    reranker: Option<Arc<dyn ContextReranker>>,
    vision: Option<Arc<dyn VisionHinter>>,
    cache: Option<Arc<dyn HealCache>>,
    history: Option<Arc<dyn HealingHistory>>,
}

impl Healer {
    /// A heuristic-only healer. External passes, cache and history are
    /// opt-in through the `with_*` methods.
    pub fn new(mut config: LocusConfig) -> Self {
        config.scoring = config.scoring.validated();
        Self {
            config,
            reranker: None,
            vision: None,
            cache: None,
            history: None,
        }
    }

    /// Wire the production collaborators the configuration enables.
    pub fn from_config(config: LocusConfig) -> Self {
        let mut healer = Self::new(config);
        if healer.config.rerank.enabled {
            let reranker = LlmReranker::new(healer.config.rerank.llm.clone());
            healer = healer.with_reranker(Arc::new(reranker));
        }
        if healer.config.vision.enabled {
            let hinter = LlmVisionHinter::new(healer.config.vision.llm.clone());
            healer = healer.with_vision(Arc::new(hinter));
        }
        if healer.config.cache.enabled {
            let cache = InMemoryHealCache::new(
                Duration::from_secs(healer.config.cache.ttl_secs),
                healer.config.cache.capacity,
            );
            healer = healer.with_cache(Arc::new(cache));
        }
        healer
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn ContextReranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_vision(mut self, vision: Arc<dyn VisionHinter>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn HealCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HealingHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn config(&self) -> &LocusConfig {
        &self.config
    }

    /// Run the deterministic stages only: extraction through ranking.
    pub fn resolve(&self, request: &HealRequest) -> Resolution {
        let config = &self.config;
        let elements = ElementModelBuilder::new(&config.extraction).build(request);
        let volatility = VolatilityDetector::new(&config.volatility);

        let candidates = CandidateGenerator::new(
            volatility,
            config.extraction.max_text_locator_len,
            config.scoring.max_candidates,
        )
        .generate(&elements, request.locator_kind_hint);
        tracing::debug!(count = candidates.len(), "Candidates generated");

        let scorer = FeatureScorer::new(
            BaseScorer::new(&request.failed_selector, request.usage()),
            volatility,
        );
        let outcome = scorer.score_all(candidates, &elements);
        tracing::debug!(
            scored = outcome.scored.len(),
            skipped = outcome.skipped,
            "Candidates scored"
        );

        let ranking = RankAggregator::new(config.scoring.weights, config.scoring.bucket_size)
            .rank(outcome.scored);

        Resolution {
            elements,
            ranking,
            skipped: outcome.skipped,
        }
    }

    pub async fn heal(&self, request: &HealRequest) -> Result<HealResponse, HealError> {
        let span = tracing::info_span!(
            "heal",
            failed_selector = %request.failed_selector,
            page_url = request.page_url.as_deref().unwrap_or(""),
        );
        self.heal_inner(request).instrument(span).await
    }

    async fn heal_inner(&self, request: &HealRequest) -> Result<HealResponse, HealError> {
        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.config.request_deadline_ms);

        if let Err(e) = request.validate() {
            tracing::warn!(stage = ?PipelineStage::Failed, error = %e, "Rejected heal request");
            return Err(e);
        }

        let cache_key = self.cache.as_ref().map(|_| CacheKey::for_request(request));
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key)
            && let Some(mut hit) = cache.get(key)
        {
            tracing::debug!("Cache hit");
            hit.message = MSG_CACHED.to_string();
            hit.metadata.cached = true;
            hit.metadata.processing_time_ms = elapsed_ms(started);
            return Ok(hit);
        }

        let Resolution {
            elements,
            mut ranking,
            skipped,
        } = self.resolve(request);

        let mut metadata = ResponseMetadata {
            candidates_considered: ranking.considered,
            total_elements: elements.total_elements,
            skipped_candidates: skipped,
            stages: vec![
                PipelineStage::Extracted,
                PipelineStage::CandidatesGenerated,
                PipelineStage::Scored,
            ],
            ..Default::default()
        };

        self.consult_services(request, &elements, &mut ranking, &mut metadata, deadline)
            .await;

        let auto_selected = ranking.auto_selected();
        metadata.stages.push(PipelineStage::Selected);

        let message = if !ranking.is_empty() {
            MSG_HEALED
        } else if elements.is_empty() {
            MSG_NO_ELEMENTS
        } else {
            MSG_NO_CANDIDATES
        };

        metadata.stages.push(PipelineStage::Returned);
        metadata.processing_time_ms = elapsed_ms(started);

        let response = HealResponse {
            message: message.to_string(),
            css_candidates: views(ranking.bucket(LocatorKind::Css), &elements),
            xpath_candidates: views(ranking.bucket(LocatorKind::Xpath), &elements),
            auto_selected,
            metadata,
        };

        tracing::info!(
            css = response.auto_selected.css.as_deref().unwrap_or("-"),
            xpath = response.auto_selected.xpath.as_deref().unwrap_or("-"),
            considered = response.metadata.candidates_considered,
            reranked = response.metadata.reranked,
            elapsed_ms = response.metadata.processing_time_ms,
            "Heal complete"
        );

        if !ranking.is_empty() {
            if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
                cache.put(key, response.clone());
            }
            self.record_history(request, &ranking, &response).await;
        }

        Ok(response)
    }

    /// Reranking and vision hinting, concurrently and best-effort. Failures
    /// become degradation notes, never errors.
    async fn consult_services(
        &self,
        request: &HealRequest,
        elements: &ElementSet,
        ranking: &mut Ranking,
        metadata: &mut ResponseMetadata,
        deadline: Instant,
    ) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let rerank_config = &self.config.rerank;

        let rerank_job = match (&self.reranker, request.usage()) {
            (Some(reranker), Some(usage)) if ranking.len() >= rerank_config.min_candidates => {
                let rerank_request = RerankRequest::from_ranking(
                    ranking,
                    elements,
                    &request.failed_selector,
                    usage,
                    rerank_config.top_k,
                );
                let timeout = Duration::from_millis(rerank_config.timeout_ms).min(remaining);
                Some((reranker.clone(), rerank_request, timeout))
            }
            (Some(_), Some(_)) => {
                tracing::debug!(
                    candidates = ranking.len(),
                    "Too few candidates to rerank"
                );
                None
            }
            _ => None,
        };

        let vision_job = match (&self.vision, request.screenshot_ref.as_deref()) {
            (Some(hinter), Some(shot)) if !shot.trim().is_empty() && !ranking.is_empty() => {
                let vision_request = VisionRequest::from_ranking(
                    ranking,
                    elements,
                    shot.trim(),
                    &request.failed_selector,
                    request.page_url.as_deref(),
                );
                let timeout = Duration::from_millis(self.config.vision.timeout_ms).min(remaining);
                Some((hinter.clone(), vision_request, timeout))
            }
            _ => None,
        };

        let rerank_fut = async {
            match &rerank_job {
                Some((reranker, req, timeout)) => {
                    Some(rerank_with_timeout(reranker.as_ref(), req, *timeout).await)
                }
                None => None,
            }
        };
        let vision_fut = async {
            match &vision_job {
                Some((hinter, req, timeout)) => {
                    Some(hint_with_timeout(hinter.as_ref(), req, *timeout).await)
                }
                None => None,
            }
        };
        let (rerank_result, vision_result) = tokio::join!(rerank_fut, vision_fut);

        match rerank_result {
            Some(Ok(choice)) => {
                if ranking.promote(choice.kind, &choice.selector, rerank_config.boost) {
                    tracing::info!(
                        selector = %choice.selector,
                        reason = choice.reason.as_deref().unwrap_or(""),
                        "Reranker promoted candidate"
                    );
                    metadata.reranked = true;
                    metadata.stages.push(PipelineStage::Reranked);
                } else {
                    let note = format!("rerank: '{}' is no longer ranked", choice.selector);
                    tracing::warn!("{}", note);
                    metadata.degradations.push(note);
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Reranking degraded to heuristic order");
                metadata.degradations.push(format!("rerank: {}", e));
            }
            None => {}
        }

        match vision_result {
            Some(Ok(hints)) => {
                hints.attach(ranking);
                metadata.vision_used = true;
                if let Some(summary) = &hints.summary {
                    tracing::debug!(summary = %summary, "Vision summary");
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Vision hints unavailable");
                metadata.degradations.push(format!("vision: {}", e));
            }
            None => {}
        }
    }

    async fn record_history(&self, request: &HealRequest, ranking: &Ranking, response: &HealResponse) {
        let Some(history) = &self.history else {
            return;
        };
        let Some(best) = ranking.css.first().or_else(|| ranking.xpath.first()) else {
            return;
        };

        let record = HealingRecord {
            old_selector: request.failed_selector.clone(),
            new_selector: best.candidate.locator.clone(),
            selector_type: best.candidate.kind,
            confidence: best.composite,
            url: request.page_url.clone().unwrap_or_default(),
            processing_time_ms: response.metadata.processing_time_ms,
            reranked: response.metadata.reranked,
            vision_used: response.metadata.vision_used,
            timestamp_ms: HealingRecord::now_ms(),
        };
        match history.store(record).await {
            Ok(id) => tracing::debug!(id, "Stored healing record"),
            Err(e) => tracing::warn!(error = %e, "Failed to store healing record"),
        }
    }

    /// Heal several independent requests. Item failures are reported in
    /// their slot; only an empty or oversized batch fails the whole call.
    pub async fn heal_batch(&self, batch: &BatchHealRequest) -> Result<BatchHealResponse, HealError> {
        self.run_batch(batch.requests.iter().map(Ok).collect()).await
    }

    /// Like [`Healer::heal_batch`], decoding each item on its own. An item
    /// that does not decode fails its slot only.
    pub async fn heal_batch_raw(
        &self,
        batch: &RawBatchHealRequest,
    ) -> Result<BatchHealResponse, HealError> {
        let decoded = batch.decode();
        self.run_batch(decoded.iter().map(|item| item.as_ref().map_err(|e| e.clone())).collect())
            .await
    }

    async fn run_batch(
        &self,
        items: Vec<Result<&HealRequest, HealError>>,
    ) -> Result<BatchHealResponse, HealError> {
        let started = Instant::now();
        let count = items.len();
        if count == 0 {
            return Err(HealError::invalid("batch must contain at least one request"));
        }
        if count > self.config.batch.max_items {
            return Err(HealError::BatchTooLarge {
                max: self.config.batch.max_items,
                actual: count,
            });
        }

        let results: Vec<BatchItem> = join_all(items.into_iter().enumerate().map(
            |(index, item)| async move {
                match item {
                    Ok(request) => match self.heal(request).await {
                        Ok(response) => BatchItem::ok(index, response),
                        Err(e) => BatchItem::failed(index, e.to_string()),
                    },
                    Err(e) => {
                        tracing::warn!(index, error = %e, "Undecodable batch item");
                        BatchItem::failed(index, e.to_string())
                    }
                }
            },
        ))
        .await;

        let total_succeeded = results.iter().filter(|item| item.is_ok()).count();
        tracing::info!(
            total = count,
            succeeded = total_succeeded,
            "Batch complete"
        );

        Ok(BatchHealResponse {
            total_processed: count,
            total_succeeded,
            total_failed: count - total_succeeded,
            results,
            processing_time_ms: elapsed_ms(started),
        })
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn views(bucket: &[RankedCandidate], elements: &ElementSet) -> Vec<CandidateView> {
    bucket
        .iter()
        .map(|ranked| {
            let record = elements.get(ranked.candidate.element);
            CandidateView {
                rank: ranked.rank,
                score: ranked.composite,
                base_score: ranked.scores.base,
                stability_score: ranked.scores.stability,
                semantic_score: ranked.scores.semantic,
                selector: ranked.candidate.locator.clone(),
                strategy: ranked.candidate.strategy().name().to_string(),
                tag: record.map(|r| r.tag.clone()).unwrap_or_default(),
                text: record.and_then(|r| r.text.clone()),
                role: record.and_then(|r| r.role.clone()),
                visual_prominence: ranked.visual_prominence,
            }
        })
        .collect()
}
