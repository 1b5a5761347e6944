//! Tests for the rate-limited news synchronizer.
//!
//! # Critical Contract Points
//!
//! 1. Instruments are processed one at a time, never concurrently
//! 2. The inter-call pause follows failures too
//! 3. One failing instrument does not stop the batch
//! 4. Only relevant articles are stored; re-ingesting updates in place

#[cfg(test)]
mod tests {
    use crate::errors::{Error, Result};
    use crate::instruments::Instrument;
    use crate::news::{
        NewNewsArticle, NewsArticle, NewsRepositoryTrait, NewsSyncConfig, NewsSyncService,
    };
    use crate::watchlists::{WatchlistItem, WatchlistRepositoryTrait};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use marketsync_market_data::{MarketDataError, NewsItem, NewsProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    fn instrument(symbol: &str, description: &str) -> Instrument {
        Instrument {
            id: format!("id-{}", symbol),
            symbol: symbol.to_string(),
            display_symbol: symbol.to_string(),
            description: description.to_string(),
            instrument_type: "Common Stock".into(),
            exchange: "US".into(),
            image_ref: None,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    fn item(id: i64, headline: &str) -> NewsItem {
        NewsItem {
            id,
            published_epoch: 1_709_640_000,
            headline: headline.to_string(),
            summary: String::new(),
            url: format!("https://news.example.com/{}", id),
            source: "Reuters".into(),
            category: "company".into(),
            image: String::new(),
            related: String::new(),
        }
    }

    // =========================================================================
    // Mocks
    // =========================================================================

    struct MockWatchlists {
        tracked: Vec<Instrument>,
    }

    #[async_trait]
    impl WatchlistRepositoryTrait for MockWatchlists {
        fn find_distinct_tracked_instruments(&self) -> Result<Vec<Instrument>> {
            Ok(self.tracked.clone())
        }

        async fn add_item(&self, _owner_id: String, _instrument_id: String) -> Result<WatchlistItem> {
            unimplemented!("not used by news sync")
        }

        async fn remove_item(&self, _owner_id: String, _instrument_id: String) -> Result<usize> {
            unimplemented!("not used by news sync")
        }
    }

    #[derive(Default)]
    struct MockNewsRepository {
        articles: Mutex<Vec<NewsArticle>>,
        /// Upstream ids whose upsert fails.
        fail_ids: Vec<i64>,
    }

    #[async_trait]
    impl NewsRepositoryTrait for MockNewsRepository {
        fn find_by_upstream_id(&self, upstream_id: i64) -> Result<Option<NewsArticle>> {
            let articles = self.articles.lock().unwrap();
            Ok(articles.iter().find(|a| a.upstream_id == upstream_id).cloned())
        }

        async fn upsert_by_upstream_id(&self, new: NewNewsArticle) -> Result<NewsArticle> {
            if self.fail_ids.contains(&new.upstream_id) {
                return Err(Error::Unexpected("Intentional upsert failure".into()));
            }
            let mut articles = self.articles.lock().unwrap();
            articles.retain(|a| a.upstream_id != new.upstream_id);
            let article = NewsArticle {
                id: format!("news-{}", new.upstream_id),
                upstream_id: new.upstream_id,
                instrument_id: new.instrument_id,
                headline: new.headline,
                summary: new.summary,
                url: new.url,
                source: new.source,
                category: new.category,
                image_url: new.image_url,
                published_at: new.published_at,
                created_at: NaiveDateTime::default(),
                updated_at: NaiveDateTime::default(),
            };
            articles.push(article.clone());
            Ok(article)
        }

        fn list_for_instrument(&self, _symbol: &str, _limit: i64) -> Result<Vec<NewsArticle>> {
            Ok(self.articles.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct MockNewsProvider {
        /// Symbol -> items. Symbols listed in `failing` error instead.
        items: Vec<(String, Vec<NewsItem>)>,
        failing: Vec<String>,
        calls: Mutex<Vec<(String, Instant)>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
        requested_days: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    }

    #[async_trait]
    impl NewsProvider for MockNewsProvider {
        fn id(&self) -> &'static str {
            "MOCK"
        }

        async fn fetch_company_news(
            &self,
            symbol: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> std::result::Result<Vec<NewsItem>, MarketDataError> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            self.calls
                .lock()
                .unwrap()
                .push((symbol.to_string(), Instant::now()));
            self.requested_days.lock().unwrap().push((from, to));

            tokio::time::sleep(Duration::from_millis(2)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.failing.iter().any(|s| s == symbol) {
                return Err(MarketDataError::ProviderError {
                    provider: "MOCK".into(),
                    message: "boom".into(),
                });
            }

            Ok(self
                .items
                .iter()
                .find(|(s, _)| s == symbol)
                .map(|(_, items)| items.clone())
                .unwrap_or_default())
        }
    }

    fn service(
        provider: Arc<MockNewsProvider>,
        news: Arc<MockNewsRepository>,
        tracked: Vec<Instrument>,
        delay: Duration,
    ) -> NewsSyncService {
        NewsSyncService::new(
            provider,
            news,
            Arc::new(MockWatchlists { tracked }),
            NewsSyncConfig {
                inter_call_delay: delay,
            },
        )
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn test_failure_in_middle_still_processes_rest_and_paces() {
        let delay = Duration::from_millis(40);
        let provider = Arc::new(MockNewsProvider {
            items: vec![
                ("AAPL".into(), vec![item(1, "Apple unveils new iPhone")]),
                ("MSFT".into(), vec![item(3, "Microsoft ships update")]),
            ],
            failing: vec!["NVDA".into()],
            ..Default::default()
        });
        let news = Arc::new(MockNewsRepository::default());
        let tracked = vec![
            instrument("AAPL", "Apple Inc"),
            instrument("NVDA", "NVIDIA Corp"),
            instrument("MSFT", "Microsoft Corp"),
        ];
        let service = service(provider.clone(), news.clone(), tracked, delay);

        let start = Instant::now();
        let result = service.sync_news().await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(result.total_stocks, 3);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, 1);
        assert!(!result.success);
        assert_eq!(result.new_articles, 2);
        assert!(elapsed >= delay * 2, "elapsed {:?}", elapsed);

        let calls = provider.calls.lock().unwrap().clone();
        let symbols: Vec<&str> = calls.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "NVDA", "MSFT"]);
        // The pause after the failing call still happened
        assert!(calls[2].1.duration_since(calls[1].1) >= delay);
    }

    #[tokio::test]
    async fn test_instruments_never_fetched_concurrently() {
        let provider = Arc::new(MockNewsProvider::default());
        let tracked = (0..5)
            .map(|i| instrument(&format!("SYM{}", i), ""))
            .collect();
        let service = service(
            provider.clone(),
            Arc::new(MockNewsRepository::default()),
            tracked,
            Duration::from_millis(1),
        );

        let result = service.sync_news().await.unwrap();

        assert!(result.success);
        assert_eq!(provider.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_irrelevant_articles_are_skipped() {
        let provider = Arc::new(MockNewsProvider {
            items: vec![(
                "A".into(),
                vec![
                    item(10, "A great day for markets"),
                    item(11, "Agilent (A) raises guidance"),
                ],
            )],
            ..Default::default()
        });
        let news = Arc::new(MockNewsRepository::default());
        let service = service(
            provider,
            news.clone(),
            vec![instrument("A", "Agilent Technologies Inc")],
            Duration::ZERO,
        );

        let result = service.sync_news().await.unwrap();

        assert_eq!(result.total_articles, 1);
        assert_eq!(result.skipped_articles, 1);
        assert!(news.find_by_upstream_id(10).unwrap().is_none());
        assert!(news.find_by_upstream_id(11).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reingest_counts_as_update() {
        let provider = Arc::new(MockNewsProvider {
            items: vec![("AAPL".into(), vec![item(1, "Apple earnings beat")])],
            ..Default::default()
        });
        let news = Arc::new(MockNewsRepository::default());
        let service = service(
            provider,
            news.clone(),
            vec![instrument("AAPL", "Apple Inc")],
            Duration::ZERO,
        );

        let first = service.sync_news().await.unwrap();
        let second = service.sync_news().await.unwrap();

        assert_eq!(first.new_articles, 1);
        assert_eq!(second.new_articles, 0);
        assert_eq!(second.updated_articles, 1);
        assert_eq!(news.articles.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stored_articles_counted_when_one_upsert_fails() {
        let provider = Arc::new(MockNewsProvider {
            items: vec![(
                "AAPL".into(),
                vec![
                    item(1, "Apple earnings beat"),
                    item(2, "Apple supplier news"),
                    item(3, "Apple opens new store"),
                ],
            )],
            ..Default::default()
        });
        let news = Arc::new(MockNewsRepository {
            fail_ids: vec![2],
            ..Default::default()
        });
        let service = service(
            provider,
            news.clone(),
            vec![
                instrument("AAPL", "Apple Inc"),
                instrument("MSFT", "Microsoft Corp"),
            ],
            Duration::ZERO,
        );

        let result = service.sync_news().await.unwrap();

        assert_eq!(news.articles.lock().unwrap().len(), 2);
        assert_eq!(result.total_articles, 2);
        assert_eq!(result.new_articles, 2);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.success_count, 1);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_requests_a_single_day_window() {
        let provider = Arc::new(MockNewsProvider::default());
        let service = service(
            provider.clone(),
            Arc::new(MockNewsRepository::default()),
            vec![instrument("IBM", "International Business Machines Corp")],
            Duration::ZERO,
        );
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        service.sync_news_for_day(day).await.unwrap();

        assert_eq!(*provider.requested_days.lock().unwrap(), vec![(day, day)]);
    }

    #[tokio::test]
    async fn test_empty_tracked_set() {
        let service = service(
            Arc::new(MockNewsProvider::default()),
            Arc::new(MockNewsRepository::default()),
            Vec::new(),
            Duration::from_secs(5),
        );

        let result = service.sync_news().await.unwrap();

        assert_eq!(result.total_stocks, 0);
        assert!(result.success);
    }
}
