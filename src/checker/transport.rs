// src/checker/transport.rs
// =============================================================================
// The single place where HTTP requests actually leave the process.
//
// Everything above this layer (the prober, the license resolver, the commit
// lookup) talks to a `Transport` trait object instead of reqwest directly.
// In production that is `ReqwestTransport`; in tests it is a scripted fake
// that counts calls, which is how we check retry bounds and cache hits
// without touching the network.
//
// Rust concepts:
// - Traits: Define shared behavior (like interfaces)
// - async-trait: async fns in an object-safe trait (Arc<dyn Transport>)
// - thiserror: derive Display/Error for our error enum
// =============================================================================

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::HttpConfig;

// The two request kinds we ever need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Head,
    Get,
}

// A response reduced to what callers look at
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Empty for HEAD requests
    pub body: String,
}

impl HttpResponse {
    /// Decodes the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// GitHub signals an exhausted quota with 429, or with 403 and
    /// `x-ratelimit-remaining: 0`
    pub fn is_rate_limited(&self) -> bool {
        if self.status == StatusCode::TOO_MANY_REQUESTS {
            return true;
        }
        self.status == StatusCode::FORBIDDEN
            && self
                .headers
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim() == "0")
                .unwrap_or(false)
    }
}

// Network-level failures. None of these carry a status code: the request
// never produced a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("Could not resolve hostname")]
    Dns,
    #[error("SSL certificate error")]
    Tls,
    #[error("Connection failed")]
    Connect,
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, method: Method, url: &str) -> Result<HttpResponse, TransportError>;
}

// The real transport, one pooled reqwest client for the whole run
//
// Only requests to the GitHub API get the token and the GitHub Accept
// header. Links in the table point at arbitrary hosts and must never see
// the token.
pub struct ReqwestTransport {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);

        // reqwest drops Authorization itself when a redirect leaves the host
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.github_token.clone(),
        })
    }

    /// Whether `url` lives under the configured API base.
    /// "https://api.github.com.evil.test" does not count.
    fn is_api_url(&self, url: &str) -> bool {
        url.strip_prefix(&self.api_base)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, method: Method, url: &str) -> Result<HttpResponse, TransportError> {
        let mut request = match method {
            Method::Head => self.client.head(url),
            Method::Get => self.client.get(url),
        };
        if self.is_api_url(url) {
            request = request.header(ACCEPT, "application/vnd.github+json");
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await.map_err(categorize_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = match method {
            Method::Head => String::new(),
            Method::Get => response.text().await.map_err(categorize_error)?,
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

// Sorts reqwest errors into the failure kinds we report
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
fn categorize_error(error: reqwest::Error) -> TransportError {
    let error_string = error.to_string();

    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_redirect() {
        TransportError::TooManyRedirects
    } else if error.is_connect() {
        // Connection errors often mean DNS issues or host unreachable
        if error_string.contains("dns") {
            TransportError::Dns
        } else {
            TransportError::Connect
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        TransportError::Tls
    } else {
        TransportError::Other(error_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::RetryPolicy;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const TOKEN: &str = "ghp_SECRET";

    // Tiny HTTP server on an ephemeral port. Records the lowercased request
    // head of every request it sees.
    //   /loop  -> redirects to itself forever
    //   /slow  -> never answers
    //   other  -> 200, empty body
    async fn serve() -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = seen.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(answer(stream, log.clone()));
            }
        });
        (origin, seen)
    }

    async fn answer(mut stream: TcpStream, log: Arc<Mutex<Vec<String>>>) {
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => head.extend_from_slice(&buf[..n]),
            }
        }
        let head = String::from_utf8_lossy(&head).to_lowercase();
        let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
        log.lock().unwrap().push(head);

        let reply = match path.as_str() {
            "/loop" => "HTTP/1.1 302 Found\r\nLocation: /loop\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            "/slow" => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                return;
            }
            _ => "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        };
        let _ = stream.write_all(reply.as_bytes()).await;
    }

    fn transport(api_base: &str) -> ReqwestTransport {
        ReqwestTransport::new(&HttpConfig {
            api_base: api_base.to_string(),
            github_token: Some(TOKEN.to_string()),
            timeout: Duration::from_secs(1),
            user_agent: "link-curator/test".to_string(),
            retry: RetryPolicy::default(),
        })
        .unwrap()
    }

    fn last_request(seen: &Mutex<Vec<String>>) -> String {
        seen.lock().unwrap().last().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_token_stays_off_ordinary_links() {
        let (origin, seen) = serve().await;
        let transport = transport(&format!("{origin}/api"));

        let response = transport
            .send(Method::Head, &format!("{origin}/some-blog-post"))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);

        let head = last_request(&seen);
        assert!(head.contains("user-agent: link-curator/test"));
        assert!(!head.contains("authorization"), "{head}");
        assert!(!head.contains(&TOKEN.to_lowercase()));
        assert!(!head.contains("vnd.github"));
    }

    #[tokio::test]
    async fn test_token_stays_off_lookalike_prefix() {
        let (origin, seen) = serve().await;
        let transport = transport(&format!("{origin}/api"));

        transport
            .send(Method::Get, &format!("{origin}/api-mirror/repos/o/r"))
            .await
            .unwrap();
        assert!(!last_request(&seen).contains("authorization"));
    }

    #[tokio::test]
    async fn test_api_requests_are_authenticated() {
        let (origin, seen) = serve().await;
        let transport = transport(&format!("{origin}/api/"));

        transport
            .send(Method::Get, &format!("{origin}/api/repos/o/r/license"))
            .await
            .unwrap();

        let head = last_request(&seen);
        assert!(head.contains(&format!("authorization: bearer {}", TOKEN.to_lowercase())));
        assert!(head.contains("accept: application/vnd.github+json"));
    }

    #[tokio::test]
    async fn test_redirect_loop_is_reported() {
        let (origin, _) = serve().await;
        let error = transport(&format!("{origin}/api"))
            .send(Method::Head, &format!("{origin}/loop"))
            .await
            .unwrap_err();
        assert_eq!(error, TransportError::TooManyRedirects);
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let (origin, _) = serve().await;
        let error = transport(&format!("{origin}/api"))
            .send(Method::Head, &format!("{origin}/slow"))
            .await
            .unwrap_err();
        assert_eq!(error, TransportError::Timeout);
    }

    fn response(status: u16, remaining: Option<&str>) -> HttpResponse {
        let mut headers = HeaderMap::new();
        if let Some(remaining) = remaining {
            headers.insert(
                "x-ratelimit-remaining",
                HeaderValue::from_str(remaining).unwrap(),
            );
        }
        HttpResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            body: String::new(),
        }
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(response(429, None).is_rate_limited());
        assert!(response(403, Some("0")).is_rate_limited());
        assert!(!response(403, Some("12")).is_rate_limited());
        assert!(!response(403, None).is_rate_limited());
        assert!(!response(404, Some("0")).is_rate_limited());
    }

    #[test]
    fn test_json_body() {
        let mut r = response(200, None);
        r.body = r#"{"license": {"spdx_id": "MIT"}}"#.to_string();
        let value: serde_json::Value = r.json().unwrap();
        assert_eq!(value["license"]["spdx_id"], "MIT");
    }
}
