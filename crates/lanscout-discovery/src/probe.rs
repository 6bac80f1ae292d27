//! HTTP liveness probing of candidate addresses

use async_trait::async_trait;
use reqwest::StatusCode;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::trace;

/// Single-candidate liveness check.
///
/// Implementations are stateless from the session's perspective; the
/// orchestrator owns all scan state and treats any probe error as `false`.
#[async_trait]
pub trait Probe: Send + Sync {
    /// True iff the candidate answered with status 200 within the timeout.
    async fn probe(&self, address: Ipv4Addr, port: u16, timeout: Duration) -> bool;
}

/// Probes candidates with a plain GET against `http://<address>:<port>/`.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, address: Ipv4Addr, port: u16, timeout: Duration) -> bool {
        let url = format!("http://{}:{}/", address, port);
        match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) => {
                trace!(url = %url, status = %response.status(), "Probe response");
                response.status() == StatusCode::OK
            }
            Err(e) => {
                trace!(url = %url, error = %e, "Probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on an ephemeral loopback port.
    async fn serve_once(response: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        port
    }

    #[tokio::test]
    async fn status_200_is_success() {
        let port = serve_once("HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n").await;
        let prober = HttpProber::new();
        assert!(
            prober
                .probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(2))
                .await
        );
    }

    #[tokio::test]
    async fn non_200_status_is_failure() {
        let port = serve_once("HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n").await;
        let prober = HttpProber::new();
        assert!(
            !prober
                .probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(2))
                .await
        );
    }

    #[tokio::test]
    async fn connection_refused_is_failure() {
        // Bind then drop to find a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = HttpProber::new();
        assert!(
            !prober
                .probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(2))
                .await
        );
    }
}
