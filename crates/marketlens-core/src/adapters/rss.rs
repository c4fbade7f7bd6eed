use std::sync::Arc;
use std::time::Duration;

use super::Upstream;
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{NewsQuery, Provider, SourceError, SourceFuture};
use crate::{ProviderId, RawNewsEntry, UtcDateTime};

/// Market-news RSS feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RssFeed {
    pub provider: ProviderId,
    pub url: String,
}

impl RssFeed {
    pub fn moneycontrol() -> Self {
        Self {
            provider: ProviderId::Moneycontrol,
            url: String::from("https://www.moneycontrol.com/rss/marketreports.xml"),
        }
    }

    pub fn economictimes() -> Self {
        Self {
            provider: ProviderId::Economictimes,
            url: String::from("https://economictimes.indiatimes.com/markets/rssfeeds/1977021501.cms"),
        }
    }

    pub fn businessstandard() -> Self {
        Self {
            provider: ProviderId::Businessstandard,
            url: String::from("https://www.business-standard.com/rss/markets-106.rss"),
        }
    }

    pub fn for_provider(provider: ProviderId) -> Option<Self> {
        match provider {
            ProviderId::Moneycontrol => Some(Self::moneycontrol()),
            ProviderId::Economictimes => Some(Self::economictimes()),
            ProviderId::Businessstandard => Some(Self::businessstandard()),
            _ => None,
        }
    }
}

/// RSS 2.0 feed adapter. The topic does not change the request: feeds are
/// market-wide and curation filters them per topic.
#[derive(Clone)]
pub struct RssFeedAdapter {
    feed: RssFeed,
    upstream: Upstream,
    timeout: Duration,
}

impl RssFeedAdapter {
    pub fn new(feed: RssFeed, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            upstream: Upstream::new(feed.provider, http_client),
            feed,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.upstream = self.upstream.with_circuit_breaker(circuit_breaker);
        self
    }

    pub fn feed(&self) -> &RssFeed {
        &self.feed
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.upstream.circuit_state()
    }
}

impl Provider<NewsQuery, Vec<RawNewsEntry>> for RssFeedAdapter {
    fn id(&self) -> ProviderId {
        self.feed.provider
    }

    fn fetch<'a>(&'a self, _query: &'a NewsQuery) -> SourceFuture<'a, Vec<RawNewsEntry>> {
        Box::pin(async move {
            let request = HttpRequest::get(&self.feed.url)
                .with_header("accept", "application/rss+xml, application/xml, text/xml")
                .with_timeout(self.timeout);
            let publisher = self.feed.provider.display_name();

            self.upstream
                .fetch(request, |body| {
                    if !body.contains("<rss") && !body.contains("<channel") {
                        return Err(SourceError::malformed(format!(
                            "{} response is not an RSS document",
                            self.feed.provider
                        )));
                    }
                    Ok(parse_rss_items(body, publisher))
                })
                .await
        })
    }
}

/// Extract `<item>` entries from an RSS document.
///
/// Items without a title or link are skipped. `pubDate` is optional and parsed
/// as RFC 2822.
pub fn parse_rss_items(xml: &str, publisher: &str) -> Vec<RawNewsEntry> {
    let mut entries = Vec::new();
    let mut rest = xml;

    while let Some(block) = next_element(rest, "item") {
        rest = block.remainder;
        let title = element_text(block.content, "title").filter(|title| !title.is_empty());
        let link = element_text(block.content, "link").filter(|link| !link.is_empty());
        let (Some(title), Some(link)) = (title, link) else {
            continue;
        };

        let mut entry = RawNewsEntry::new(title, link).with_publisher(publisher);
        if let Some(published_at) =
            element_text(block.content, "pubDate").and_then(|raw| UtcDateTime::parse_feed(&raw))
        {
            entry = entry.with_published_at(published_at);
        }
        entries.push(entry);
    }

    entries
}

struct Element<'a> {
    content: &'a str,
    remainder: &'a str,
}

/// Next `<tag ...>...</tag>` in `xml`. Does not match longer names sharing the
/// prefix, and ignores self-closing tags.
fn next_element<'a>(xml: &'a str, tag: &str) -> Option<Element<'a>> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut offset = 0;

    loop {
        let start = offset + xml[offset..].find(&open)?;
        let after_name = start + open.len();
        let boundary = xml[after_name..].chars().next()?;
        if boundary != '>' && !boundary.is_whitespace() {
            offset = after_name;
            continue;
        }

        let tag_end = after_name + xml[after_name..].find('>')?;
        if xml[..tag_end].ends_with('/') {
            offset = tag_end + 1;
            continue;
        }

        let content_start = tag_end + 1;
        let content_end = content_start + xml[content_start..].find(&close)?;
        return Some(Element {
            content: &xml[content_start..content_end],
            remainder: &xml[content_end + close.len()..],
        });
    }
}

fn element_text(xml: &str, tag: &str) -> Option<String> {
    next_element(xml, tag).map(|element| clean_text(element.content))
}

/// Unwrap CDATA, drop markup, decode entities and collapse whitespace.
fn clean_text(raw: &str) -> String {
    let unwrapped = raw.replace("<![CDATA[", "").replace("]]>", "");

    decode_entities(&strip_tags(&unwrapped))
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop `<tag ...>` markup; a '<' that does not open a tag is kept as text.
fn strip_tags(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        stripped.push_str(&rest[..open]);
        let candidate = &rest[open..];
        match tag_len(candidate) {
            Some(len) => rest = &candidate[len..],
            None => {
                stripped.push('<');
                rest = &candidate[1..];
            }
        }
    }

    stripped.push_str(rest);
    stripped
}

/// Byte length of the tag starting at `text`, which begins with '<'.
fn tag_len(text: &str) -> Option<usize> {
    let first = text[1..].chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '/' || first == '!') {
        return None;
    }
    let close = text.find('>')?;
    if text[1..close].contains('<') {
        return None;
    }
    Some(close + 1)
}

fn decode_entities(text: &str) -> String {
    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let replacement = candidate
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&candidate[1..semi]).map(|ch| (ch, semi)));

        match replacement {
            Some((ch, semi)) => {
                decoded.push(ch);
                rest = &candidate[semi + 1..];
            }
            None => {
                decoded.push('&');
                rest = &candidate[1..];
            }
        }
    }

    decoded.push_str(rest);
    decoded
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::RecordingHttpClient;
    use crate::provider::SourceErrorKind;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Market Reports</title>
    <atom:link href="https://example.test/rss" rel="self"/>
    <item>
      <title><![CDATA[Sensex rises 300 points as <b>RELIANCE</b> gains]]></title>
      <link>https://example.test/a?x=1&amp;y=2</link>
      <pubDate>Fri, 10 May 2024 09:15:00 +0530</pubDate>
    </item>
    <item>
      <title>M&amp;M shares   drop on weak results</title>
      <link><![CDATA[https://example.test/b]]></link>
      <pubDate>Fri, 10 May 2024 04:00:00 GMT</pubDate>
    </item>
    <item>
      <title>No link here</title>
    </item>
    <itemized>not an item</itemized>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_with_cdata_and_entities() {
        let entries = parse_rss_items(FEED, "MoneyControl");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].headline, "Sensex rises 300 points as RELIANCE gains");
        assert_eq!(entries[0].url, "https://example.test/a?x=1&y=2");
        assert_eq!(
            entries[0].published_at.map(UtcDateTime::format_rfc3339),
            Some(String::from("2024-05-10T03:45:00Z"))
        );
        assert_eq!(entries[1].headline, "M&M shares drop on weak results");
        assert_eq!(entries[1].url, "https://example.test/b");
        assert_eq!(
            entries[1].published_at.map(UtcDateTime::format_rfc3339),
            Some(String::from("2024-05-10T04:00:00Z"))
        );
        assert_eq!(entries[1].publisher.as_deref(), Some("MoneyControl"));
    }

    #[test]
    fn keeps_less_than_sign_inside_cdata_headline() {
        let xml = r#"<rss><channel><item>
            <title><![CDATA[Nifty < 22000 as markets fall]]></title>
            <link>https://example.test/nifty</link>
        </item></channel></rss>"#;

        let entries = parse_rss_items(xml, "MoneyControl");

        assert_eq!(entries[0].headline, "Nifty < 22000 as markets fall");
        assert_eq!(clean_text("Sensex <b>up</b> 2% as P/E <20x"), "Sensex up 2% as P/E <20x");
    }

    #[test]
    fn decodes_numeric_entities_and_keeps_stray_ampersands() {
        assert_eq!(decode_entities("Q&#39;4 &#x2013; R&D & more"), "Q'4 \u{2013} R&D & more");
    }

    #[tokio::test]
    async fn non_rss_body_is_malformed() {
        let adapter = RssFeedAdapter::new(
            RssFeed::economictimes(),
            Arc::new(RecordingHttpClient::ok("<html><body>blocked</body></html>")),
        );

        let error = adapter
            .fetch(&NewsQuery::market())
            .await
            .expect_err("not rss");

        assert_eq!(error.kind(), SourceErrorKind::Malformed);
    }

    #[tokio::test]
    async fn adapter_tags_entries_with_feed_publisher() {
        let client = Arc::new(RecordingHttpClient::ok(FEED));
        let adapter = RssFeedAdapter::new(RssFeed::businessstandard(), client.clone());

        let entries = adapter.fetch(&NewsQuery::market()).await.expect("feed");

        assert_eq!(adapter.id(), ProviderId::Businessstandard);
        assert_eq!(entries[0].publisher.as_deref(), Some("Business Standard"));
        assert_eq!(
            client.recorded_requests()[0].url,
            "https://www.business-standard.com/rss/markets-106.rss"
        );
    }
}
