//! Image download into the logo cache.
//!
//! Handles inline `data:` URLs and regular http(s) URLs. Redirects are
//! followed by hand (301/302 only, bounded) so the final response's
//! content type decides the file extension. Bytes are streamed to disk; if
//! anything fails mid-write the partial file is removed.

use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::StreamExt;
use log::{debug, warn};
use reqwest::{header, redirect, Client, StatusCode};
use tokio::io::AsyncWriteExt;
use url::Url;

use super::cache::LogoCache;
use crate::constants::{DEFAULT_LOGO_EXTENSION, LOGO_EXTENSIONS, MAX_DOWNLOAD_REDIRECTS};
use crate::errors::{Error, Result};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Clone)]
pub struct ImageDownloader {
    client: Client,
}

impl ImageDownloader {
    pub fn new() -> Self {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Download `source` into the cache as `<symbol>.<ext>` and return the file name.
    pub async fn download(&self, source: &str, cache: &LogoCache, symbol: &str) -> Result<String> {
        cache.ensure_dir().await?;

        if source.starts_with("data:") {
            let (ext, bytes) = decode_data_url(source)?;
            let path = cache.path_for(symbol, ext)?;
            write_all_or_remove(&path, &bytes).await?;
            return file_name_of(&path);
        }

        let response = self.follow_redirects(source).await?;
        let final_url = response.url().clone();
        let ext = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(extension_for_content_type)
            .or_else(|| extension_from_url(&final_url))
            .unwrap_or(DEFAULT_LOGO_EXTENSION);

        let path = cache.path_for(symbol, ext)?;
        stream_to_file(response, &path).await?;
        debug!("Downloaded logo for {} from {}", symbol, final_url);

        file_name_of(&path)
    }

    async fn follow_redirects(&self, source: &str) -> Result<reqwest::Response> {
        let mut url = Url::parse(source).map_err(|e| Error::Download(format!("{}: {}", source, e)))?;

        for _ in 0..=MAX_DOWNLOAD_REDIRECTS {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND {
                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| Error::Download(format!("{} redirect without location", status)))?;
                url = url
                    .join(location)
                    .map_err(|e| Error::Download(format!("bad redirect '{}': {}", location, e)))?;
                continue;
            }

            if !status.is_success() {
                return Err(Error::Download(format!("HTTP {} for {}", status, url)));
            }

            return Ok(response);
        }

        Err(Error::Download(format!(
            "more than {} redirects for {}",
            MAX_DOWNLOAD_REDIRECTS, source
        )))
    }
}

impl Default for ImageDownloader {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an image MIME type to a cache extension.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/svg+xml" => Some("svg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Extension from the URL path when it is one the cache knows.
fn extension_from_url(url: &Url) -> Option<&'static str> {
    let (_, ext) = url.path().rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    LOGO_EXTENSIONS.into_iter().find(|known| *known == ext)
}

/// Decode `data:<mime>[;base64],<payload>`.
fn decode_data_url(source: &str) -> Result<(&'static str, Vec<u8>)> {
    let rest = source
        .strip_prefix("data:")
        .ok_or_else(|| Error::Download("not a data URL".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::Download("data URL without payload".to_string()))?;

    let is_base64 = meta.ends_with(";base64");
    let mime = meta.split(';').next().unwrap_or_default();
    let ext = extension_for_content_type(mime).unwrap_or(DEFAULT_LOGO_EXTENSION);

    let bytes = if is_base64 {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::Download(format!("invalid base64 image: {}", e)))?
    } else {
        urlencoding::decode_binary(payload.as_bytes()).into_owned()
    };

    if bytes.is_empty() {
        return Err(Error::Download("empty data URL".to_string()));
    }

    Ok((ext, bytes))
}

async fn write_all_or_remove(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Err(e) = tokio::fs::write(path, bytes).await {
        remove_partial(path).await;
        return Err(e.into());
    }
    Ok(())
}

async fn stream_to_file(response: reqwest::Response, path: &Path) -> Result<()> {
    let result = copy_stream(response, path).await;
    if result.is_err() {
        remove_partial(path).await;
    }
    result
}

async fn copy_stream(response: reqwest::Response, path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        written += chunk.len();
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    if written == 0 {
        return Err(Error::Download("empty response body".to_string()));
    }
    Ok(())
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove partial download {}: {}", path.display(), e);
        }
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Unexpected(format!("bad cache path {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn cache(dir: &tempfile::TempDir) -> LogoCache {
        LogoCache::new(dir.path(), "/logos")
    }

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(extension_for_content_type("image/png"), Some("png"));
        assert_eq!(extension_for_content_type("image/jpeg; charset=binary"), Some("jpg"));
        assert_eq!(extension_for_content_type("IMAGE/SVG+XML"), Some("svg"));
        assert_eq!(extension_for_content_type("text/html"), None);
    }

    #[test]
    fn test_extension_from_url() {
        let url = Url::parse("https://cdn.example.com/logos/aapl.WEBP?v=2").unwrap();
        assert_eq!(extension_from_url(&url), Some("webp"));
        let url = Url::parse("https://cdn.example.com/logo.php").unwrap();
        assert_eq!(extension_from_url(&url), None);
    }

    #[tokio::test]
    async fn test_base64_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let source = format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES));

        let name = ImageDownloader::new()
            .download(&source, &cache(&dir), "AAPL")
            .await
            .unwrap();

        assert_eq!(name, "AAPL.png");
        assert_eq!(std::fs::read(dir.path().join("AAPL.png")).unwrap(), PNG_BYTES);
    }

    #[tokio::test]
    async fn test_percent_encoded_svg_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let source = "data:image/svg+xml,%3Csvg%2F%3E";

        let name = ImageDownloader::new()
            .download(source, &cache(&dir), "MSFT")
            .await
            .unwrap();

        assert_eq!(name, "MSFT.svg");
        assert_eq!(std::fs::read_to_string(dir.path().join("MSFT.svg")).unwrap(), "<svg/>");
    }

    #[tokio::test]
    async fn test_http_download_uses_content_type() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/logo")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(PNG_BYTES)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let name = ImageDownloader::new()
            .download(&format!("{}/logo", server.url()), &cache(&dir), "IBM")
            .await
            .unwrap();

        assert_eq!(name, "IBM.jpg");
    }

    #[tokio::test]
    async fn test_follows_redirect_and_falls_back_to_url_suffix() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/start")
            .with_status(302)
            .with_header("location", "/final/logo.gif")
            .create_async()
            .await;
        server
            .mock("GET", "/final/logo.gif")
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(b"GIF89a")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let name = ImageDownloader::new()
            .download(&format!("{}/start", server.url()), &cache(&dir), "GE")
            .await
            .unwrap();

        assert_eq!(name, "GE.gif");
    }

    #[tokio::test]
    async fn test_defaults_to_png() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/img")
            .with_status(200)
            .with_body(PNG_BYTES)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let name = ImageDownloader::new()
            .download(&format!("{}/img", server.url()), &cache(&dir), "KO")
            .await
            .unwrap();

        assert_eq!(name, "KO.png");
    }

    #[tokio::test]
    async fn test_http_error_leaves_no_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.png")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = ImageDownloader::new()
            .download(&format!("{}/missing.png", server.url()), &cache(&dir), "XOM")
            .await;

        assert!(matches!(result, Err(Error::Download(_))));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_empty_body_removes_partial_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/empty.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = ImageDownloader::new()
            .download(&format!("{}/empty.png", server.url()), &cache(&dir), "T")
            .await;

        assert!(result.is_err());
        assert!(!dir.path().join("T.png").exists());
    }

    #[tokio::test]
    async fn test_redirect_loop_is_bounded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/loop")
            .with_status(301)
            .with_header("location", "/loop")
            .expect_at_least(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = ImageDownloader::new()
            .download(&format!("{}/loop", server.url()), &cache(&dir), "LOOP")
            .await;

        assert!(matches!(result, Err(Error::Download(_))));
    }
}
