// Time authority over HTTP (worldtimeapi-style JSON)

use arcade_queue_core::error::{AppError, Result};
use arcade_queue_core::port::TimeAuthority;
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct WorldTimeResponse {
    /// RFC 3339 UTC timestamp
    utc_datetime: String,
}

/// Extract the trusted instant (epoch ms) from a response body
pub fn parse_time_response(body: &str) -> Result<i64> {
    let response: WorldTimeResponse = serde_json::from_str(body).map_err(|e| {
        AppError::TimeSourceUnavailable(format!("unexpected time response: {e}"))
    })?;
    DateTime::parse_from_rfc3339(&response.utc_datetime)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| {
            AppError::TimeSourceUnavailable(format!(
                "invalid utc_datetime {}: {e}",
                response.utc_datetime
            ))
        })
}

pub struct WorldTimeAuthority {
    client: reqwest::Client,
    url: String,
}

impl WorldTimeAuthority {
    /// # Arguments
    /// * `url` - Endpoint returning `{"utc_datetime": "..."}`
    /// * `timeout` - Transport-level bound on one request
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TimeAuthority for WorldTimeAuthority {
    async fn fetch_time(&self) -> Result<i64> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AppError::TimeSourceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::TimeSourceUnavailable(format!(
                "time authority returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::TimeSourceUnavailable(e.to_string()))?;
        let millis = parse_time_response(&body)?;
        debug!(millis, "Fetched trusted time");
        Ok(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/api/timezone/America/Sao_Paulo")
    }

    #[test]
    fn test_parse_time_response() {
        let body = r#"{"timezone":"America/Sao_Paulo","utc_datetime":"2024-01-01T15:30:00.000000+00:00"}"#;
        assert_eq!(parse_time_response(body).unwrap(), 1_704_123_000_000);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_time_response("{}"),
            Err(AppError::TimeSourceUnavailable(_))
        ));
        assert!(matches!(
            parse_time_response(r#"{"utc_datetime":"yesterday"}"#),
            Err(AppError::TimeSourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_time_over_http() {
        let url = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"utc_datetime":"2024-01-01T15:30:00+00:00"}"#,
        )
        .await;
        let authority = WorldTimeAuthority::new(url, Duration::from_secs(2)).unwrap();
        assert_eq!(authority.fetch_time().await.unwrap(), 1_704_123_000_000);
    }

    #[tokio::test]
    async fn test_non_success_status_is_unavailable() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable", "{}").await;
        let authority = WorldTimeAuthority::new(url, Duration::from_secs(2)).unwrap();
        let err = authority.fetch_time().await.unwrap_err();
        assert!(matches!(err, AppError::TimeSourceUnavailable(_)));
        assert!(err.to_string().contains("503"));
    }
}
