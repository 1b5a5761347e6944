//! Locating the logo on a rendered image-search page.
//!
//! The page script picks the first sufficiently large image outside any
//! suggestion-chip region, falling back to the largest image on the page.
//! It reports the raw attributes; source resolution and URL normalization
//! happen here in Rust.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::constants::MIN_LOGO_DIMENSION;

/// Script evaluated in the search page. Returns a [`Candidate`] or `null`.
pub fn extraction_script() -> String {
    EXTRACTION_SCRIPT.replace("__MIN_SIZE__", &MIN_LOGO_DIMENSION.to_string())
}

lazy_static! {
    /// `src`-like attribute values inside the candidate's markup
    static ref MARKUP_SOURCE_REGEX: Regex =
        Regex::new(r#"(?:data-src|data-iurl|src)\s*=\s*["']([^"']+)["']"#)
            .expect("Invalid regex pattern");
}

const EXTRACTION_SCRIPT: &str = r#"
(() => {
  const MIN = __MIN_SIZE__;
  const CHIP = 'g-scrolling-carousel, [data-chip], [role="listitem"] a[href*="chips"], .chip, [aria-label*="uggest"]';
  const size = (img) => {
    const r = img.getBoundingClientRect();
    return { w: Math.round(r.width || img.naturalWidth || 0), h: Math.round(r.height || img.naturalHeight || 0) };
  };
  const usable = (img) => {
    if (img.closest(CHIP)) return false;
    const s = size(img);
    return s.w > MIN && s.h > MIN;
  };
  const describe = (img) => {
    const s = size(img);
    const holder = img.closest('a, div') || img;
    return {
      src: img.getAttribute('src'),
      dataSrc: img.getAttribute('data-src') || img.getAttribute('data-iurl') || img.getAttribute('data-lazy-src'),
      html: (holder.outerHTML || '').slice(0, 8000),
      width: s.w,
      height: s.h,
    };
  };
  const primary = Array.from(document.querySelectorAll('#search img, #islrg img, div[data-ri] img, div[data-id] img'));
  const hit = primary.find(usable);
  if (hit) return describe(hit);
  const ranked = Array.from(document.images)
    .filter(usable)
    .sort((a, b) => { const x = size(a), y = size(b); return y.w * y.h - x.w * x.h; });
  return ranked.length ? describe(ranked[0]) : null;
})()
"#;

/// Attributes of the chosen image as reported by the page.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub src: Option<String>,
    pub data_src: Option<String>,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl Candidate {
    /// Parse the script result. `null` or an unexpected shape means no candidate.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Pick the image source: direct attribute, then lazy-load attribute,
    /// then whatever the surrounding markup carries. Placeholder pixels
    /// (tiny GIF data URLs) are skipped.
    pub fn resolve_source(&self) -> Option<String> {
        [self.src.as_deref(), self.data_src.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| is_usable_source(s))
            .map(str::to_string)
            .or_else(|| source_from_markup(&self.html))
    }
}

fn is_usable_source(source: &str) -> bool {
    !source.is_empty() && !source.starts_with("data:image/gif")
}

fn source_from_markup(html: &str) -> Option<String> {
    MARKUP_SOURCE_REGEX
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
        .find(|s| is_usable_source(s))
}

/// Turn a raw source into something downloadable.
///
/// Data URLs pass through, protocol-relative URLs get `https:`, absolute
/// http(s) URLs are kept and anything else is resolved against `base`.
pub fn normalize_source(raw: &str, base: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("data:") {
        return Some(raw.to_string());
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }

    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url.to_string()),
        Ok(_) => None,
        Err(_) => Url::parse(base)
            .ok()
            .and_then(|base| base.join(raw).ok())
            .map(|url| url.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_embeds_threshold() {
        let script = extraction_script();
        assert!(script.contains("const MIN = 80;"));
        assert!(!script.contains("__MIN_SIZE__"));
    }

    #[test]
    fn test_null_result_is_no_candidate() {
        assert_eq!(Candidate::from_value(serde_json::Value::Null), None);
    }

    #[test]
    fn test_direct_src_wins() {
        let candidate = Candidate::from_value(json!({
            "src": "https://cdn.example.com/aapl.png",
            "dataSrc": "https://cdn.example.com/lazy.png",
            "html": "", "width": 120, "height": 120
        }))
        .unwrap();
        assert_eq!(
            candidate.resolve_source().as_deref(),
            Some("https://cdn.example.com/aapl.png")
        );
    }

    #[test]
    fn test_lazy_attribute_when_src_is_placeholder() {
        let candidate = Candidate {
            src: Some("data:image/gif;base64,R0lGODlhAQABAAAAACw=".into()),
            data_src: Some("//cdn.example.com/lazy.png".into()),
            ..Default::default()
        };
        assert_eq!(
            candidate.resolve_source().as_deref(),
            Some("//cdn.example.com/lazy.png")
        );
    }

    #[test]
    fn test_source_from_markup() {
        let candidate = Candidate {
            html: r#"<a href="/x"><img class="t" data-src="https://img.example.com/a.jpg?x=1&amp;y=2"></a>"#
                .into(),
            ..Default::default()
        };
        assert_eq!(
            candidate.resolve_source().as_deref(),
            Some("https://img.example.com/a.jpg?x=1&y=2")
        );
    }

    #[test]
    fn test_normalize_source() {
        let base = "https://www.google.com/search?q=AAPL";
        assert_eq!(
            normalize_source("//img.example.com/a.png", base).as_deref(),
            Some("https://img.example.com/a.png")
        );
        assert_eq!(
            normalize_source("/images/a.png", base).as_deref(),
            Some("https://www.google.com/images/a.png")
        );
        assert_eq!(
            normalize_source("data:image/png;base64,AAAA", base).as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        assert_eq!(normalize_source("javascript:void(0)", base), None);
        assert_eq!(normalize_source("  ", base), None);
    }
}
