//! Local logo cache: one file per symbol, `<SYMBOL>.<ext>`.

use std::path::{Component, Path, PathBuf};

use crate::constants::LOGO_EXTENSIONS;
use crate::errors::{Result, ValidationError};

/// Whether `symbol` can name a file directly inside the cache directory.
pub fn is_valid_file_stem(symbol: &str) -> bool {
    !symbol.is_empty()
        && !symbol.contains("..")
        && !symbol
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
}

#[derive(Debug, Clone)]
pub struct LogoCache {
    dir: PathBuf,
    public_prefix: String,
}

impl LogoCache {
    /// `public_prefix` is what stored image references start with (e.g. `/logos`).
    pub fn new(dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Reference of the first cached file for `symbol`, probing extensions in order.
    pub async fn lookup(&self, symbol: &str) -> Option<String> {
        if !is_valid_file_stem(symbol) {
            return None;
        }
        for ext in LOGO_EXTENSIONS {
            let file_name = file_name(symbol, ext);
            if tokio::fs::try_exists(self.dir.join(&file_name))
                .await
                .unwrap_or(false)
            {
                return Some(self.public_ref(&file_name));
            }
        }
        None
    }

    /// Cache path for `<symbol>.<ext>`. Fails unless the name is a single plain component.
    pub fn path_for(&self, symbol: &str, ext: &str) -> Result<PathBuf> {
        let file_name = file_name(symbol, ext);
        let mut components = Path::new(&file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if is_valid_file_stem(symbol) => {
                Ok(self.dir.join(file_name))
            }
            _ => Err(ValidationError::InvalidInput(format!(
                "'{}' is not a valid logo file name",
                file_name
            ))
            .into()),
        }
    }

    pub fn public_ref(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix, file_name)
    }
}

fn file_name(symbol: &str, ext: &str) -> String {
    format!("{}.{}", symbol, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_miss_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LogoCache::new(dir.path(), "/logos");
        assert_eq!(cache.lookup("AAPL").await, None);
    }

    #[tokio::test]
    async fn test_lookup_finds_any_known_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("MSFT.svg"), b"<svg/>").unwrap();

        let cache = LogoCache::new(dir.path(), "/logos/");
        assert_eq!(cache.lookup("MSFT").await.as_deref(), Some("/logos/MSFT.svg"));
    }

    #[tokio::test]
    async fn test_lookup_prefers_png_over_later_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("IBM.webp"), b"x").unwrap();
        std::fs::write(dir.path().join("IBM.png"), b"x").unwrap();

        let cache = LogoCache::new(dir.path(), "/logos");
        assert_eq!(cache.lookup("IBM").await.as_deref(), Some("/logos/IBM.png"));
    }

    #[tokio::test]
    async fn test_unknown_extension_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("TSLA.bmp"), b"x").unwrap();

        let cache = LogoCache::new(dir.path(), "/logos");
        assert_eq!(cache.lookup("TSLA").await, None);
    }

    #[test]
    fn test_path_for_stays_inside_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LogoCache::new(dir.path().join("logos"), "/logos");

        assert_eq!(
            cache.path_for("BRK.B", "png").unwrap(),
            dir.path().join("logos").join("BRK.B.png")
        );
        for symbol in ["../ESCAPED", "A/B", "..", "/etc/passwd", "A\\B", "A\nB"] {
            let err = cache.path_for(symbol, "png").unwrap_err();
            assert!(err.is_client_error(), "{:?} accepted", symbol);
        }
    }

    #[tokio::test]
    async fn test_lookup_ignores_unsafe_symbol() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("logos")).unwrap();
        std::fs::write(dir.path().join("OUT.png"), b"x").unwrap();

        let cache = LogoCache::new(dir.path().join("logos"), "/logos");
        assert_eq!(cache.lookup("../OUT").await, None);
    }
}
