//! Headless Chromium for logo scraping.
//!
//! Implements the browser traits from `marketsync_core::logos` on top of
//! `chromiumoxide`. One [`ChromiumLauncher::launch`] call starts one browser
//! process; the core's session manager decides when that happens.

mod errors;
mod launcher;
mod page;
mod session;

pub use launcher::{ChromiumConfig, ChromiumLauncher};
pub use page::ChromiumPage;
pub use session::ChromiumSession;
