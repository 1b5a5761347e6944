use chromiumoxide::error::CdpError;
use marketsync_core::Error;

/// Maps a CDP failure onto the core error taxonomy.
pub(crate) fn browser_error(context: &str, err: CdpError) -> Error {
    match err {
        CdpError::Timeout => Error::Timeout(format!("{} timed out", context)),
        other => Error::Browser(format!("{}: {}", context, other)),
    }
}
