//! Stream retrieval over HTTP

use crate::error::FetchError;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl Progress {
    pub fn fraction(&self) -> Option<f32> {
        self.total
            .filter(|total| *total > 0)
            .map(|total| self.downloaded as f32 / total as f32)
    }
}

#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Download `url` into `dest`, calling `on_progress` after every chunk.
    /// Returns the number of bytes written.
    pub async fn retrieve(
        &self,
        url: &str,
        dest: &Path,
        mut on_progress: impl FnMut(Progress),
    ) -> Result<u64, FetchError> {
        info!("Downloading to: {}", dest.display());
        debug!("Stream url: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::NotFound {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        on_progress(Progress { downloaded, total });
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            on_progress(Progress { downloaded, total });
        }
        file.flush().await?;

        debug!("Downloaded {} bytes to {}", downloaded, dest.display());
        Ok(downloaded)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response per connection; returns the base URL.
    pub(crate) async fn serve(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_retrieve_writes_body() {
        let base = serve("200 OK", "stream-bytes").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("video.mp4");

        let mut last = None;
        let written = Downloader::new(reqwest::Client::new())
            .retrieve(&format!("{}/videoplayback", base), &dest, |p| last = Some(p))
            .await
            .unwrap();

        assert_eq!(written, 12);
        assert_eq!(tokio::fs::read_to_string(&dest).await.unwrap(), "stream-bytes");
        let last = last.unwrap();
        assert_eq!(last.total, Some(12));
        assert_eq!(last.fraction(), Some(1.0));
    }

    #[tokio::test]
    async fn test_retrieve_not_found() {
        let base = serve("404 Not Found", "").await;
        let dir = tempfile::tempdir().unwrap();

        let result = Downloader::new(reqwest::Client::new())
            .retrieve(&format!("{}/gone", base), &dir.path().join("x"), |_| {})
            .await;

        assert!(matches!(result, Err(FetchError::NotFound { status: 404, .. })));
        assert!(!dir.path().join("x").exists());
    }

    #[tokio::test]
    async fn test_retrieve_connection_refused_is_transport() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let result = Downloader::new(reqwest::Client::new())
            .retrieve(&format!("http://{}/", addr), &dir.path().join("x"), |_| {})
            .await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
