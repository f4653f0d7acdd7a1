//! Gathers candidate document locators from syndication feeds.

use std::collections::HashSet;

use feed_rs::model::Feed;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::types::IndexError;

/// Collects up to `target` unique locators from `feeds`, in feed-list order.
///
/// Entries are accepted first-seen-first-kept: within a feed they are walked
/// in document order, duplicates across feeds are dropped, and collection
/// short-circuits once `target` is reached. There is no recency guarantee.
///
/// An unreachable or malformed feed contributes nothing and is logged; it
/// never fails the run.
pub async fn collect_locators(client: &Client, feeds: &[String], target: usize) -> Vec<Url> {
    let mut locators = Vec::new();
    let mut seen = HashSet::new();

    for feed_url in feeds {
        if locators.len() >= target {
            break;
        }

        let feed = match fetch_feed(client, feed_url).await {
            Ok(feed) => feed,
            Err(err) => {
                warn!(feed = %feed_url, error = %err, "skipping feed");
                continue;
            }
        };

        let before = locators.len();
        for entry in &feed.entries {
            if locators.len() >= target {
                break;
            }
            let Some(link) = entry.links.first() else {
                continue;
            };
            let Ok(url) = Url::parse(&link.href) else {
                continue;
            };
            if seen.insert(url.as_str().to_string()) {
                locators.push(url);
            }
        }
        debug!(feed = %feed_url, entries = locators.len() - before, "collected feed entries");
    }

    locators
}

async fn fetch_feed(client: &Client, feed_url: &str) -> Result<Feed, IndexError> {
    let response = client.get(feed_url).send().await?.error_for_status()?;
    let body = response.bytes().await?;
    feed_rs::parser::parse(body.as_ref())
        .map_err(|err| IndexError::InvalidDocument(err.to_string()))
}
