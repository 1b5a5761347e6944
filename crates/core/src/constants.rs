use std::time::Duration;

/// Instrument type kept by catalog sync and upstream search.
pub const DEFAULT_INSTRUMENT_TYPE: &str = "Common Stock";

/// Exchange filter for the bulk catalog listing.
pub const DEFAULT_EXCHANGE: &str = "US";

/// Retries after the first catalog fetch attempt.
pub const CATALOG_FETCH_MAX_RETRIES: u32 = 3;

/// Base delay for catalog fetch backoff (doubles per retry).
pub const CATALOG_FETCH_BASE_DELAY: Duration = Duration::from_secs(2);

/// Pause between per-instrument news requests. Keeps us under 60 calls/minute.
pub const NEWS_INTER_CALL_DELAY: Duration = Duration::from_millis(1100);

/// Maximum results returned by a symbol search.
pub const SEARCH_RESULT_LIMIT: i64 = 20;

/// Search results that get a lazy logo acquisition.
pub const LAZY_LOGO_LIMIT: usize = 3;

/// Default number of instruments a backfill run looks at.
pub const LOGO_BACKFILL_LIMIT: i64 = 50;

/// Extensions probed in the logo cache, in precedence order.
pub const LOGO_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "svg", "gif", "webp"];

/// Extension used when neither content type nor URL tells us anything.
pub const DEFAULT_LOGO_EXTENSION: &str = "png";

/// Minimum rendered width and height for a candidate logo.
pub const MIN_LOGO_DIMENSION: u32 = 80;

/// Redirect hops followed when downloading an image.
pub const MAX_DOWNLOAD_REDIRECTS: usize = 5;

/// Launch and navigation timeout for the browser.
pub const BROWSER_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after navigation so dynamic results can render.
pub const PAGE_SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Fixed viewport for scrape pages.
pub const VIEWPORT_WIDTH: u32 = 1280;
pub const VIEWPORT_HEIGHT: u32 = 800;

/// Image search surface queried with `"<SYMBOL> stock logo"`.
pub const IMAGE_SEARCH_URL: &str = "https://www.google.com/search";

/// Coalescer key prefixes.
pub const ACQUIRE_KEY_PREFIX: &str = "acquire-image-";
pub const SEARCH_KEY_PREFIX: &str = "catalog-search-";
