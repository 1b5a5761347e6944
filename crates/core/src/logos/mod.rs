//! Logos module - browser seams, session lifecycle, cache, scrape-and-download
//! acquisition and backfill.

mod acquisition;
mod backfill;
mod browser;
mod cache;
mod download;
mod extract;
mod session;


pub use acquisition::{AcquisitionState, AcquisitionTrace, LogoAcquisitionService, LogoConfig};
pub use backfill::{BackfillResult, LogoBackfillService};
pub use browser::{BrowserLauncher, BrowserSession, PageHandle, Viewport};
pub use cache::{is_valid_file_stem, LogoCache};
pub use download::{extension_for_content_type, ImageDownloader};
pub use extract::{extraction_script, normalize_source, Candidate};
pub use session::{SessionConfig, SessionManager};
