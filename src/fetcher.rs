//! Resolves locators into extracted documents, one `Result` per item.

use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::types::FetchError;

/// A fetched document with extracted text and best-effort metadata.
///
/// Immutable once produced. The locator doubles as the identity under which
/// the document is indexed, so re-fetching the same locator later overwrites
/// rather than duplicates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    /// Stable identity, equal to the locator.
    pub id: String,
    pub url: String,
    pub title: String,
    /// Extracted body text, trimmed length >= the run's minimum.
    pub text: String,
    /// Publish timestamp when the page declares one; never fabricated.
    pub published: Option<DateTime<Utc>>,
    /// Host the document was served from.
    pub source: Option<String>,
}

/// Fetches one locator and extracts its content.
///
/// Main text comes from the page's `<article>` element(s); when that yields
/// nothing the whole `<body>` is used as a fallback. Documents whose trimmed
/// text is shorter than `min_text_len` characters are rejected — this
/// filters paywalled and stub pages.
pub async fn fetch_document(
    client: &Client,
    url: &Url,
    min_text_len: usize,
) -> Result<Document, FetchError> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    let body = response.text().await?;
    extract(url, &body, min_text_len)
}

/// Fetches every locator, returning one outcome per input in input order.
///
/// Per-item failures are collected, not raised; the batch always completes.
pub async fn fetch_all(
    client: &Client,
    locators: &[Url],
    min_text_len: usize,
) -> Vec<Result<Document, FetchError>> {
    let mut outcomes = Vec::with_capacity(locators.len());
    for url in locators {
        debug!(url = %url, "fetching document");
        outcomes.push(fetch_document(client, url, min_text_len).await);
    }
    outcomes
}

fn extract(url: &Url, html: &str, min_text_len: usize) -> Result<Document, FetchError> {
    let page = Html::parse_document(html);

    let mut text = select_text(&page, "article")?;
    if text.trim().is_empty() {
        text = select_text(&page, "body")?;
    }
    if text.trim().is_empty() {
        return Err(FetchError::NoContent);
    }
    let len = text.trim().chars().count();
    if len < min_text_len {
        return Err(FetchError::TooShort { len });
    }

    let title = meta_content(&page, r#"meta[property="og:title"]"#)?
        .or_else(|| first_text(&page, "title"))
        .unwrap_or_default();

    let published = meta_content(&page, r#"meta[property="article:published_time"]"#)?
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(Document {
        id: url.to_string(),
        url: url.to_string(),
        title,
        text,
        published,
        source: url.host_str().map(str::to_owned),
    })
}

/// Concatenated text of every element matching `selector`, whitespace-collapsed.
fn select_text(page: &Html, selector: &str) -> Result<String, FetchError> {
    let selector = parse_selector(selector)?;
    let words: Vec<&str> = page
        .select(&selector)
        .flat_map(|element| element.text())
        .flat_map(str::split_whitespace)
        .collect();
    Ok(words.join(" "))
}

fn first_text(page: &Html, selector: &str) -> Option<String> {
    let selector = parse_selector(selector).ok()?;
    page.select(&selector).next().map(|element| {
        element
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
    })
}

fn meta_content(page: &Html, selector: &str) -> Result<Option<String>, FetchError> {
    let selector = parse_selector(selector)?;
    Ok(page
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(str::to_owned)
        .filter(|content| !content.is_empty()))
}

fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|err| FetchError::Extract(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> String {
        format!("<html><head><title>Page Title</title></head><body>{body}</body></html>")
    }

    fn url() -> Url {
        Url::parse("https://news.example.com/story/1").unwrap()
    }

    #[test]
    fn article_text_preferred_over_body() {
        let filler = "x".repeat(250);
        let html = page(&format!(
            "<nav>site chrome</nav><article>{filler}</article>"
        ));
        let doc = extract(&url(), &html, 200).unwrap();
        assert!(doc.text.contains(&filler));
        assert!(!doc.text.contains("site chrome"));
    }

    #[test]
    fn falls_back_to_body_without_article_element() {
        let filler = "y".repeat(250);
        let html = page(&format!("<p>{filler}</p>"));
        let doc = extract(&url(), &html, 200).unwrap();
        assert!(doc.text.contains(&filler));
    }

    #[test]
    fn min_length_boundary() {
        let html_199 = page(&format!("<article>{}</article>", "a".repeat(199)));
        let html_200 = page(&format!("<article>{}</article>", "a".repeat(200)));

        assert!(matches!(
            extract(&url(), &html_199, 200),
            Err(FetchError::TooShort { len: 199 })
        ));
        assert!(extract(&url(), &html_200, 200).is_ok());
    }

    #[test]
    fn empty_page_is_rejected() {
        let html = page("");
        assert!(matches!(extract(&url(), &html, 200), Err(FetchError::NoContent)));
    }

    #[test]
    fn metadata_is_best_effort() {
        let filler = "z".repeat(250);
        let html = format!(
            r#"<html><head>
                <title>Fallback Title</title>
                <meta property="og:title" content="Preferred Title"/>
                <meta property="article:published_time" content="2026-03-01T12:30:00+00:00"/>
            </head><body><article>{filler}</article></body></html>"#
        );
        let doc = extract(&url(), &html, 200).unwrap();
        assert_eq!(doc.title, "Preferred Title");
        assert_eq!(
            doc.published.unwrap().to_rfc3339(),
            "2026-03-01T12:30:00+00:00"
        );
        assert_eq!(doc.source.as_deref(), Some("news.example.com"));
    }

    #[test]
    fn absent_metadata_stays_none() {
        let filler = "w".repeat(250);
        let html = page(&format!("<article>{filler}</article>"));
        let doc = extract(&url(), &html, 200).unwrap();
        assert_eq!(doc.title, "Page Title");
        assert!(doc.published.is_none());
    }

    #[test]
    fn unparseable_publish_date_stays_none() {
        let filler = "v".repeat(250);
        let html = format!(
            r#"<html><head>
                <meta property="article:published_time" content="last tuesday"/>
            </head><body><article>{filler}</article></body></html>"#
        );
        let doc = extract(&url(), &html, 200).unwrap();
        assert!(doc.published.is_none());
    }
}
