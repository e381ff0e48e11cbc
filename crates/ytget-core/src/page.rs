//! Watch-page and playlist-page retrieval

use crate::error::FetchError;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

/// A fetched page body and where it came from.
#[derive(Debug, Clone)]
pub struct Page {
    pub source: String,
    pub body: String,
}

impl Page {
    pub fn title(&self) -> Option<String> {
        page_title(&self.body)
    }
}

#[derive(Debug, Clone)]
pub struct PageClient {
    client: reqwest::Client,
}

impl PageClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// The underlying HTTP client, shared with stream downloads.
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetch a page over HTTP. Non-success statuses are `NotFound`.
    pub async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        info!("Fetching page: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::NotFound {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Fetched {} bytes from {}", body.len(), url);

        Ok(Page {
            source: url.to_string(),
            body,
        })
    }

    /// Read a saved page from disk.
    pub async fn read_local(path: &Path) -> Result<Page, FetchError> {
        info!("Reading page: {}", path.display());
        let bytes = tokio::fs::read(path).await?;

        Ok(Page {
            source: format!("file://{}", path.display()),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Video ids listed on a playlist page, in page order.
    pub async fn playlist_video_ids(&self, url: &str) -> Result<Vec<String>, FetchError> {
        let page = self.fetch(url).await?;
        Ok(scrape_playlist_ids(&page.body))
    }
}

fn playlist_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"data-video-ids="([^"]+)""#).unwrap())
}

fn title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap())
}

/// Ids from every `data-video-ids="id1,id2"` attribute.
pub fn scrape_playlist_ids(body: &str) -> Vec<String> {
    body.lines()
        .flat_map(|line| playlist_regex().captures_iter(line))
        .filter_map(|caps| caps.get(1))
        .flat_map(|m| m.as_str().split(','))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

/// Page `<title>` without the trailing " - YouTube".
pub fn page_title(body: &str) -> Option<String> {
    let raw = title_regex().captures(body)?.get(1)?.as_str();
    let title = html_escape::decode_html_entities(raw.trim());
    let title = title.strip_suffix(" - YouTube").unwrap_or(&*title).trim();

    if title.is_empty() {
        None
    } else {
        Some(title.replace('/', "_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_playlist_ids() {
        let body = "<li data-video-ids=\"aaa\" class=\"x\">\n\
                    <li class=\"y\">\n\
                    <button data-video-ids=\"bbb,ccc\"></button><b data-video-ids=\"ddd\">\n";
        assert_eq!(scrape_playlist_ids(body), vec!["aaa", "bbb", "ccc", "ddd"]);
        assert!(scrape_playlist_ids("<html></html>").is_empty());
    }

    #[test]
    fn test_page_title() {
        let body = "<html><head><title>Tom &amp; Jerry / Best Of - YouTube</title></head>";
        assert_eq!(page_title(body).as_deref(), Some("Tom & Jerry _ Best Of"));
        assert_eq!(page_title("<title>  </title>"), None);
        assert_eq!(page_title("<html></html>"), None);
    }

    #[test]
    fn test_page_title_numeric_entities() {
        let body = "<title>Don&#8217;t Stop &#x2F; Live - YouTube</title>";
        assert_eq!(page_title(body).as_deref(), Some("Don\u{2019}t Stop _ Live"));
        assert_eq!(
            page_title("<title>Rock &#38; Roll &#x27;77</title>").as_deref(),
            Some("Rock & Roll '77")
        );
    }

    #[tokio::test]
    async fn test_read_local_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.html");
        tokio::fs::write(&path, "<title>Clip - YouTube</title>").await.unwrap();

        let page = PageClient::read_local(&path).await.unwrap();
        assert_eq!(page.title().as_deref(), Some("Clip"));
        assert!(page.source.starts_with("file://"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url() {
        let client = PageClient::new("ytget-test", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            client.fetch("not a url").await,
            Err(FetchError::InvalidUrl(_))
        ));
    }
}
