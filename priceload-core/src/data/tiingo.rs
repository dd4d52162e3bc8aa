//! Tiingo daily prices provider.
//!
//! `GET {base_url}/daily/{ticker}/prices?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD`
//! with `Authorization: Token <token>`. The response is a JSON array of daily
//! records, passed through untouched.

use super::provider::{PriceProvider, RawPayload};
use crate::partition::TimeWindow;
use crate::retry::RemoteError;
use crate::secrets::ApiToken;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.tiingo.com/tiingo";

/// Request timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TiingoProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl TiingoProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("priceload/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Network(format!("failed to build HTTP client: {e}")))?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint for one ticker's daily prices.
    pub fn prices_url(&self, ticker: &str) -> String {
        format!("{}/daily/{ticker}/prices", self.base_url)
    }

    /// `startDate` / `endDate` query parameters for a window.
    pub fn query_params(window: &TimeWindow) -> [(&'static str, String); 2] {
        [
            ("startDate", window.start().format("%Y-%m-%d").to_string()),
            ("endDate", window.end().format("%Y-%m-%d").to_string()),
        ]
    }
}

impl PriceProvider for TiingoProvider {
    fn name(&self) -> &str {
        "tiingo"
    }

    fn fetch_prices(
        &self,
        ticker: &str,
        window: &TimeWindow,
        token: &ApiToken,
    ) -> Result<RawPayload, RemoteError> {
        let url = self.prices_url(ticker);

        let resp = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Token {}", token.expose()))
            .query(&Self::query_params(window))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Network(format!("request to {url} timed out"))
                } else {
                    RemoteError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = resp
            .bytes()
            .map_err(|e| RemoteError::Network(format!("failed to read body from {url}: {e}")))?;
        RawPayload::from_slice(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serve one canned HTTP response on a local port. The handle yields the
    /// request line and the lowercased header lines that were received.
    fn serve_once(status: &str, body: &str) -> (String, JoinHandle<(String, Vec<String>)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end().to_string();
                if line.is_empty() {
                    break;
                }
                headers.push(line.to_ascii_lowercase());
            }

            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            (request_line.trim_end().to_string(), headers)
        });
        (base_url, handle)
    }

    fn fetch_2023(base_url: &str) -> Result<RawPayload, RemoteError> {
        let provider = TiingoProvider::new(base_url, Duration::from_secs(5)).unwrap();
        provider.fetch_prices("AAPL", &TimeWindow::year(2023).unwrap(), &ApiToken::new("tok"))
    }

    #[test]
    fn url_and_params() {
        let provider = TiingoProvider::new("https://api.tiingo.com/tiingo/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            provider.prices_url("AAPL"),
            "https://api.tiingo.com/tiingo/daily/AAPL/prices"
        );

        let window = TimeWindow::year(2023).unwrap();
        let params = TiingoProvider::query_params(&window);
        assert_eq!(params[0], ("startDate", "2023-01-01".to_string()));
        assert_eq!(params[1], ("endDate", "2023-12-31".to_string()));
    }

    #[test]
    fn trailing_window_params() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let window = TimeWindow::trailing(date, 30).unwrap();
        let params = TiingoProvider::query_params(&window);
        assert_eq!(params[0].1, "2024-05-31");
        assert_eq!(params[1].1, "2024-06-30");
    }

    #[test]
    fn unreachable_host_is_a_network_error() {
        // Port 9 on localhost: nothing listens, connection is refused.
        let provider = TiingoProvider::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let window = TimeWindow::year(2024).unwrap();
        let err = provider
            .fetch_prices("AAPL", &window, &ApiToken::new("t"))
            .unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)), "{err:?}");
    }

    #[test]
    fn sends_dates_and_token_and_returns_the_body() {
        let (base_url, server) = serve_once("200 OK", r#"[{"close":1.0},{"close":2.0}]"#);

        let payload = fetch_2023(&base_url).unwrap();
        assert_eq!(payload.record_count(), Some(2));

        let (request_line, headers) = server.join().unwrap();
        assert_eq!(
            request_line,
            "GET /daily/AAPL/prices?startDate=2023-01-01&endDate=2023-12-31 HTTP/1.1"
        );
        assert!(headers.contains(&"authorization: token tok".to_string()), "{headers:?}");
        assert!(headers.contains(&"content-type: application/json".to_string()), "{headers:?}");
    }

    #[test]
    fn non_success_status_is_a_status_error() {
        let (base_url, server) = serve_once("503 Service Unavailable", "{}");

        let err = fetch_2023(&base_url).unwrap_err();
        server.join().unwrap();
        match err {
            RemoteError::Status { status, url } => {
                assert_eq!(status, 503);
                assert!(url.ends_with("/daily/AAPL/prices"), "{url}");
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[test]
    fn non_json_body_is_a_decode_error() {
        let (base_url, server) = serve_once("200 OK", "<html>rate limited</html>");

        let err = fetch_2023(&base_url).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, RemoteError::Decode(_)), "{err:?}");
    }
}
