//! Decides whether a news article concerns a given instrument.
//!
//! An article is relevant when its headline or summary mentions the ticker
//! as a whole word, or mentions any significant word of the instrument's
//! name once corporate suffixes are stripped.
//!
//! Single-letter tickers collide with ordinary words ("A", "I"), so they
//! only count in explicit ticker context: `$A`, `(A)` or an exchange prefix
//! such as `NYSE: A`.

use log::warn;
use regex::Regex;

/// Words that name a legal form rather than the company.
const CORPORATE_SUFFIXES: [&str; 8] = [
    "INC",
    "CORP",
    "CORPORATION",
    "LTD",
    "LIMITED",
    "LLC",
    "CO",
    "COMPANY",
];

const EXCHANGE_PREFIXES: &str = "NYSE|NASDAQ|AMEX|NYSEARCA|NYSEAMERICAN|OTC|BATS|CBOE";

/// Tickers at or below this length need explicit context to match.
const SHORT_TICKER_LEN: usize = 1;

/// Significant description tokens are longer than this.
const MIN_KEYWORD_LEN: usize = 2;

#[derive(Debug, Clone)]
pub struct RelevanceClassifier {
    ticker: Option<Regex>,
    keywords: Option<Regex>,
}

impl RelevanceClassifier {
    pub fn new(symbol: &str, description: &str) -> Self {
        Self {
            ticker: ticker_pattern(symbol),
            keywords: keyword_pattern(description),
        }
    }

    pub fn is_relevant(&self, headline: &str, summary: Option<&str>) -> bool {
        std::iter::once(headline)
            .chain(summary)
            .any(|text| self.matches(text))
    }

    fn matches(&self, text: &str) -> bool {
        self.ticker.as_ref().is_some_and(|re| re.is_match(text))
            || self.keywords.as_ref().is_some_and(|re| re.is_match(text))
    }
}

fn ticker_pattern(symbol: &str) -> Option<Regex> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return None;
    }

    let escaped = regex::escape(symbol);
    let pattern = if symbol.chars().count() <= SHORT_TICKER_LEN {
        format!(
            r"(?:\${t}\b|\({t}\)|\b(?i:{x})\s*:\s*{t}\b)",
            t = escaped,
            x = EXCHANGE_PREFIXES
        )
    } else {
        format!(r"(?i)\b{}\b", escaped)
    };

    compile(&pattern)
}

/// Significant words of a description, suffixes removed, in first-seen order.
pub fn significant_tokens(description: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();

    for raw in description.split(|c: char| !c.is_alphanumeric()) {
        if raw.chars().count() <= MIN_KEYWORD_LEN {
            continue;
        }
        let upper = raw.to_uppercase();
        if CORPORATE_SUFFIXES.contains(&upper.as_str()) {
            continue;
        }
        if !tokens.iter().any(|t| t.to_uppercase() == upper) {
            tokens.push(raw.to_string());
        }
    }

    tokens
}

fn keyword_pattern(description: &str) -> Option<Regex> {
    let tokens = significant_tokens(description);
    if tokens.is_empty() {
        return None;
    }

    let alternatives: Vec<String> = tokens.iter().map(|t| regex::escape(t)).collect();
    compile(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Relevance pattern '{}' rejected: {}", pattern, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_word_matches_after_suffix_strip() {
        let classifier = RelevanceClassifier::new("AAPL", "Apple Inc");
        assert!(classifier.is_relevant("Apple unveils new iPhone", None));
    }

    #[test]
    fn test_single_letter_ticker_does_not_match_article_word() {
        let classifier = RelevanceClassifier::new("A", "Agilent Technologies Inc");
        assert!(!classifier.is_relevant("A great day for markets", None));
    }

    #[test]
    fn test_two_letter_ticker_matches_as_word() {
        let ge = RelevanceClassifier::new("GE", "");
        assert!(ge.is_relevant("GE shares jump 5%", None));
        assert!(!ge.is_relevant("Gene therapy stocks rally", None));

        let gm = RelevanceClassifier::new("GM", "");
        assert!(gm.is_relevant("GM recalls 100k trucks", None));
    }

    #[test]
    fn test_single_letter_ticker_in_explicit_context() {
        let classifier = RelevanceClassifier::new("A", "");
        assert!(classifier.is_relevant("Analysts upgrade $A after earnings", None));
        assert!(classifier.is_relevant("Agilent (A) beats estimates", None));
        assert!(classifier.is_relevant("Shares of NYSE: A rose", None));
        assert!(!classifier.is_relevant("A quiet session", Some("a mixed day")));
    }

    #[test]
    fn test_ticker_is_case_insensitive_whole_word() {
        let classifier = RelevanceClassifier::new("MSFT", "");
        assert!(classifier.is_relevant("Why msft is rallying", None));
        assert!(!classifier.is_relevant("MSFTX fund rebalances", None));
    }

    #[test]
    fn test_ticker_with_regex_metacharacters() {
        let classifier = RelevanceClassifier::new("BRK.B", "");
        assert!(classifier.is_relevant("BRK.B hits record", None));
        assert!(!classifier.is_relevant("BRKXB hits record", None));
    }

    #[test]
    fn test_summary_is_checked() {
        let classifier = RelevanceClassifier::new("NVDA", "NVIDIA Corp");
        assert!(classifier.is_relevant("Chip stocks rally", Some("Nvidia led the gains")));
    }

    #[test]
    fn test_significant_tokens() {
        assert_eq!(significant_tokens("Apple Inc."), vec!["Apple"]);
        assert_eq!(
            significant_tokens("The Coca-Cola Company"),
            vec!["The", "Coca", "Cola"]
        );
        assert!(significant_tokens("AB Co LLC").is_empty());
    }

    #[test]
    fn test_unrelated_article() {
        let classifier = RelevanceClassifier::new("AAPL", "Apple Inc");
        assert!(!classifier.is_relevant("Oil prices slide", Some("Crude fell 3%")));
    }
}
