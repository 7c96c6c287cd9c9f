//! # kinowatch-guide
//!
//! Schedule source backed by a TV-guide search page. Fetches the page over
//! HTTP and extracts listing blocks for the configured movie title.
//!
//! The `fetch` surface is infallible by contract: network, status, and
//! parse failures each map to fixed user-displayable text, so callers
//! always have something to send.

use async_trait::async_trait;
use kinowatch_core::config::GuideConfig;
use kinowatch_core::traits::ScheduleSource;

const FETCH_FAILED: &str = "Could not reach the TV guide. Try again later.";
const READ_FAILED: &str = "Could not read the TV guide response.";
const PARSE_FAILED: &str = "Could not make sense of the TV guide page.";

/// One broadcast slot extracted from the guide page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub time: String,
    pub channel: String,
}

/// HTTP-backed [`ScheduleSource`].
pub struct HttpGuide {
    config: GuideConfig,
    client: reqwest::Client,
}

impl HttpGuide {
    pub fn new(config: GuideConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ScheduleSource for HttpGuide {
    async fn fetch(&self) -> String {
        let response = match self
            .client
            .get(&self.config.search_url)
            .query(&[("text", self.config.movie_title.as_str())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %self.config.search_url, "guide request failed: {e}");
                return FETCH_FAILED.into();
            }
        };

        let status = response.status();
        tracing::debug!(url = %self.config.search_url, %status, "guide response");
        if !status.is_success() {
            return format!("The TV guide returned an error (status {status}).");
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("failed to read guide response body: {e}");
                return READ_FAILED.into();
            }
        };

        match extract_listings(&body, &self.config.movie_title) {
            Some(listings) if listings.is_empty() => {
                format!("No {} on TV today.", self.config.movie_title)
            }
            Some(listings) => format_listings(&self.config.movie_title, &listings),
            None => PARSE_FAILED.into(),
        }
    }
}

/// Pull listing blocks out of the search page. None means the page could
/// not be parsed at all.
///
/// The guide marks each search hit with a `serp-item` block holding a
/// `serp-item__time` and a `serp-item__channel`; hits whose text does not
/// mention the movie title are unrelated results and are dropped.
pub fn extract_listings(html: &str, title: &str) -> Option<Vec<Listing>> {
    let dom = tl::parse(html, tl::ParserOptions::default()).ok()?;
    let parser = dom.parser();

    let Some(items) = dom.query_selector(".serp-item") else {
        return Some(Vec::new());
    };

    let mut listings = Vec::new();
    for handle in items {
        let Some(tag) = handle.get(parser).and_then(|node| node.as_tag()) else {
            continue;
        };
        if !tag.inner_text(parser).contains(title) {
            continue;
        }

        let time = child_text(tag, parser, ".serp-item__time");
        let channel = child_text(tag, parser, ".serp-item__channel");
        listings.push(Listing { time, channel });
    }
    Some(listings)
}

fn child_text(tag: &tl::HTMLTag, parser: &tl::Parser, selector: &str) -> String {
    tag.query_selector(parser, selector)
        .and_then(|mut hits| hits.next())
        .and_then(|handle| handle.get(parser))
        .map(|node| node.inner_text(parser).trim().to_string())
        .unwrap_or_default()
}

fn format_listings(title: &str, listings: &[Listing]) -> String {
    let mut out = String::new();
    for listing in listings {
        out.push_str(&format!(
            "Movie: {title}\nTime: {}\nChannel: {}\n\n",
            listing.time, listing.channel
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serp_item(text: &str, time: &str, channel: &str) -> String {
        format!(
            r#"<div class="serp-item"><span class="serp-item__title">{text}</span><span class="serp-item__time">{time}</span><span class="serp-item__channel">{channel}</span></div>"#
        )
    }

    #[test]
    fn test_extract_matching_listings() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            serp_item("John Wick", "21:30", "TV-3"),
            serp_item("John Wick: Chapter 2", "23:55", "Kino+"),
        );
        let listings = extract_listings(&html, "John Wick").expect("parses");
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].time, "21:30");
        assert_eq!(listings[0].channel, "TV-3");
        assert_eq!(listings[1].channel, "Kino+");
    }

    #[test]
    fn test_unrelated_hits_dropped() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            serp_item("Johnny English", "10:00", "Comedy"),
            serp_item("John Wick", "21:30", "TV-3"),
        );
        let listings = extract_listings(&html, "John Wick").expect("parses");
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].channel, "TV-3");
    }

    #[test]
    fn test_no_items_is_empty() {
        let listings = extract_listings("<html><body><p>nothing</p></body></html>", "John Wick")
            .expect("parses");
        assert!(listings.is_empty());
    }

    #[test]
    fn test_missing_fields_degrade_to_empty_strings() {
        let html = r#"<div class="serp-item">John Wick tonight</div>"#;
        let listings = extract_listings(html, "John Wick").expect("parses");
        assert_eq!(listings.len(), 1);
        assert!(listings[0].time.is_empty());
        assert!(listings[0].channel.is_empty());
    }

    #[test]
    fn test_format_listings() {
        let listings = vec![Listing {
            time: "21:30".into(),
            channel: "TV-3".into(),
        }];
        let text = format_listings("John Wick", &listings);
        assert!(text.contains("Movie: John Wick"));
        assert!(text.contains("Time: 21:30"));
        assert!(text.contains("Channel: TV-3"));
    }
}
