use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use marketsync_browser::{ChromiumConfig, ChromiumLauncher};
use marketsync_core::instruments::{
    CatalogSyncConfig, CatalogSyncService, InstrumentRepositoryTrait, InstrumentSearchConfig,
    InstrumentSearchService,
};
use marketsync_core::logos::{
    LogoAcquisitionService, LogoBackfillService, LogoCache, LogoConfig, SessionConfig,
    SessionManager, Viewport,
};
use marketsync_core::news::{NewsRepositoryTrait, NewsSyncConfig, NewsSyncService};
use marketsync_core::watchlists::{WatchlistRepositoryTrait, WatchlistService};
use marketsync_market_data::FinnhubProvider;
use marketsync_storage_sqlite::{
    db, InstrumentRepository, NewsRepository, WatchlistRepository,
};

use crate::config::Config;

/// Services that talk to the upstream API.
pub struct UpstreamServices {
    pub catalog_sync: Arc<CatalogSyncService>,
    pub search: Arc<InstrumentSearchService>,
    pub news_sync: Arc<NewsSyncService>,
}

pub struct AppState {
    pub session: Arc<SessionManager>,
    pub logo_acquisition: Arc<LogoAcquisitionService>,
    pub logo_backfill: Arc<LogoBackfillService>,
    pub watchlist_service: Arc<WatchlistService>,
    pub news_repository: Arc<dyn NewsRepositoryTrait>,
    /// `None` without an API key.
    pub upstream: Option<UpstreamServices>,
    pub logo_backfill_limit: i64,
}

impl AppState {
    pub fn upstream(&self) -> anyhow::Result<&UpstreamServices> {
        self.upstream
            .as_ref()
            .context("FINNHUB_API_KEY is not set; upstream commands are unavailable")
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("MS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // init() also routes `log` records from the library crates into tracing
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone())?;

    let instrument_repo: Arc<dyn InstrumentRepositoryTrait> =
        Arc::new(InstrumentRepository::new(pool.clone(), writer.clone()));
    let news_repo: Arc<dyn NewsRepositoryTrait> =
        Arc::new(NewsRepository::new(pool.clone(), writer.clone()));
    let watchlist_repo: Arc<dyn WatchlistRepositoryTrait> =
        Arc::new(WatchlistRepository::new(pool.clone(), writer.clone()));

    // Browser session is launched lazily on the first acquisition
    let viewport = Viewport::default();
    let launcher = Arc::new(ChromiumLauncher::new(ChromiumConfig {
        executable: config.chrome_path.clone(),
        request_timeout: config.browser_timeout,
        window: viewport,
    }));
    let session = Arc::new(SessionManager::new(
        launcher,
        SessionConfig {
            launch_timeout: config.browser_timeout,
            viewport,
        },
    ));

    let cache = LogoCache::new(&config.logo_dir, &config.logo_public_prefix);
    cache.ensure_dir().await?;
    tracing::info!("Logo cache directory: {}", config.logo_dir.display());

    let logo_acquisition = Arc::new(LogoAcquisitionService::new(
        session.clone(),
        cache,
        LogoConfig {
            navigation_timeout: config.browser_timeout,
            ..Default::default()
        },
    ));
    let logo_backfill = Arc::new(LogoBackfillService::new(
        instrument_repo.clone(),
        logo_acquisition.clone(),
    ));
    let watchlist_service = Arc::new(WatchlistService::new(
        watchlist_repo.clone(),
        instrument_repo.clone(),
    ));

    let upstream = match &config.finnhub_api_key {
        Some(api_key) => {
            let provider = Arc::new(FinnhubProvider::new(api_key.clone()));

            let catalog_sync = Arc::new(CatalogSyncService::new(
                provider.clone(),
                instrument_repo.clone(),
                CatalogSyncConfig {
                    exchange: config.catalog_exchange.clone(),
                    instrument_type: config.catalog_instrument_type.clone(),
                    ..Default::default()
                },
            ));
            let search = Arc::new(
                InstrumentSearchService::new(
                    provider.clone(),
                    instrument_repo.clone(),
                    InstrumentSearchConfig {
                        instrument_type: config.catalog_instrument_type.clone(),
                        exchange: config.catalog_exchange.clone(),
                        ..Default::default()
                    },
                )
                .with_logo_acquisition(logo_acquisition.clone()),
            );
            let news_sync = Arc::new(NewsSyncService::new(
                provider,
                news_repo.clone(),
                watchlist_repo,
                NewsSyncConfig {
                    inter_call_delay: config.news_delay,
                },
            ));

            Some(UpstreamServices {
                catalog_sync,
                search,
                news_sync,
            })
        }
        None => {
            tracing::warn!("FINNHUB_API_KEY is not set; catalog, search and news are disabled");
            None
        }
    };

    Ok(Arc::new(AppState {
        session,
        logo_acquisition,
        logo_backfill,
        watchlist_service,
        news_repository: news_repo,
        upstream,
        logo_backfill_limit: config.logo_backfill_limit,
    }))
}
