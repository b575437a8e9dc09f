use locus_common::locator::LocatorKindHint;
use locus_common::protocol::{ElementInput, HealRequest};
use locus_engine::Healer;
use locus_engine::cache::{CacheKey, HealCache, InMemoryHealCache, page_identity};
use locus_engine::config::LocusConfig;
use locus_engine::history::{HealingHistory, InMemoryHealingHistory};
use std::sync::Arc;
use std::time::Duration;

fn request(url: Option<&str>) -> HealRequest {
    let request = HealRequest::new("#search-old").with_elements(vec![
        ElementInput::new("input")
            .attr("id", "search")
            .attr("placeholder", "Search"),
        ElementInput::new("button").text("Go"),
    ]);
    match url {
        Some(url) => request.with_page_url(url),
        None => request,
    }
}

#[tokio::test]
async fn test_second_identical_request_is_served_from_cache() {
    let cache = Arc::new(InMemoryHealCache::new(Duration::from_secs(60), 8));
    let healer = Healer::new(LocusConfig::default()).with_cache(cache.clone());

    let first = healer.heal(&request(Some("https://shop.test/search"))).await.unwrap();
    assert!(!first.metadata.cached);
    assert_eq!(first.message, "Healed");
    assert_eq!(cache.len(), 1);

    // The fragment does not change page identity.
    let second = healer
        .heal(&request(Some("https://shop.test/search#results")))
        .await
        .unwrap();
    assert!(second.metadata.cached);
    assert_eq!(second.message, "Healed (cached)");
    assert_eq!(second.css_candidates, first.css_candidates);
    assert_eq!(second.auto_selected, first.auto_selected);
}

#[tokio::test]
async fn test_request_options_are_part_of_the_key() {
    let cache = Arc::new(InMemoryHealCache::new(Duration::from_secs(60), 8));
    let healer = Healer::new(LocusConfig::default()).with_cache(cache.clone());
    let url = Some("https://shop.test/search");

    let css_only = HealRequest {
        locator_kind_hint: LocatorKindHint::Css,
        ..request(url)
    };
    let first = healer.heal(&css_only).await.unwrap();
    assert!(!first.css_candidates.is_empty());
    assert!(first.xpath_candidates.is_empty());

    let xpath_only = HealRequest {
        locator_kind_hint: LocatorKindHint::Xpath,
        ..request(url)
    };
    let second = healer.heal(&xpath_only).await.unwrap();
    assert!(!second.metadata.cached);
    assert!(second.css_candidates.is_empty());
    assert!(!second.xpath_candidates.is_empty());

    let with_usage = request(url).with_usage("type a search query");
    assert!(!healer.heal(&with_usage).await.unwrap().metadata.cached);
    assert_eq!(cache.len(), 3);

    // Blank usage is the same as none.
    let blank_usage = HealRequest {
        usage_description: Some("  ".into()),
        ..css_only.clone()
    };
    assert!(healer.heal(&blank_usage).await.unwrap().metadata.cached);
}

#[tokio::test]
async fn test_empty_results_are_not_cached() {
    let cache = Arc::new(InMemoryHealCache::new(Duration::from_secs(60), 8));
    let healer = Healer::new(LocusConfig::default()).with_cache(cache.clone());

    let empty = HealRequest::new("#gone").with_elements(vec![]);
    let response = healer.heal(&empty).await.unwrap();
    assert!(response.css_candidates.is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_zero_ttl_always_misses() {
    let cache = Arc::new(InMemoryHealCache::new(Duration::ZERO, 8));
    let healer = Healer::new(LocusConfig::default()).with_cache(cache);

    healer.heal(&request(None)).await.unwrap();
    let again = healer.heal(&request(None)).await.unwrap();
    assert!(!again.metadata.cached);
}

#[tokio::test]
async fn test_capacity_evicts_oldest_entry() {
    let healer = Healer::new(LocusConfig::default());
    let response = healer.heal(&request(None)).await.unwrap();

    let cache = InMemoryHealCache::new(Duration::from_secs(60), 1);
    let older = CacheKey::for_request(&request(Some("https://shop.test/a")));
    let newer = CacheKey::for_request(&request(Some("https://shop.test/b")));

    cache.put(older.clone(), response.clone());
    cache.put(newer.clone(), response.clone());

    assert_eq!(cache.len(), 1);
    assert!(cache.get(&older).is_none());
    assert_eq!(cache.get(&newer), Some(response));
}

#[test]
fn test_page_identity() {
    assert_eq!(
        page_identity(&request(Some("https://shop.test/p?q=1#top"))),
        "https://shop.test/p?q=1"
    );
    assert_eq!(page_identity(&request(Some("not a url"))), "not a url");

    let by_content = page_identity(&request(None));
    assert!(by_content.starts_with("content:"));
    assert_eq!(by_content, page_identity(&request(None)));

    let other = HealRequest::new("#search-old").with_markup("<button>Go</button>");
    assert_ne!(page_identity(&other), by_content);
}

#[tokio::test]
async fn test_successful_heals_are_recorded() {
    let history = Arc::new(InMemoryHealingHistory::new());
    let healer = Healer::new(LocusConfig::default()).with_history(history.clone());

    healer
        .heal(&request(Some("https://shop.test/search")))
        .await
        .unwrap();
    healer
        .heal(&HealRequest::new("#gone").with_elements(vec![]))
        .await
        .unwrap();

    let page = history.list(1, 10, None).await.unwrap();
    assert_eq!(page.total_count, 1);
    let stored = &page.items[0].record;
    assert_eq!(stored.old_selector, "#search-old");
    assert_eq!(stored.new_selector, "#search");
    assert_eq!(stored.url, "https://shop.test/search");
    assert!(stored.confidence > 0.0 && stored.confidence <= 1.0);

    let filtered = history.list(1, 10, Some("other.test")).await.unwrap();
    assert_eq!(filtered.total_count, 0);
}
