// src/checker/testing.rs
// Scripted `Transport` used by the unit tests across the crate.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::transport::{HttpResponse, Method, Transport, TransportError};

#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Json(u16, String),
    RateLimited403,
    Fail(TransportError),
}

impl Reply {
    fn into_result(self) -> Result<HttpResponse, TransportError> {
        let (status, body, headers) = match self {
            Reply::Status(code) => (code, String::new(), HeaderMap::new()),
            Reply::Json(code, body) => (code, body, HeaderMap::new()),
            Reply::RateLimited403 => {
                let mut headers = HeaderMap::new();
                headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
                (403, String::new(), headers)
            }
            Reply::Fail(error) => return Err(error),
        };
        Ok(HttpResponse {
            status: StatusCode::from_u16(status).expect("valid status"),
            headers,
            body,
        })
    }
}

// Replies are looked up by exact URL. One-shot replies queued with `then`
// are consumed first, after that the `always` reply repeats.
#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    repeated: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<(Method, String)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always(self, url: &str, reply: Reply) -> Self {
        self.repeated.lock().unwrap().insert(url.to_string(), reply);
        self
    }

    pub fn then(self, url: &str, reply: Reply) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, u)| u == url)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn methods_for(&self, url: &str) -> Vec<Method> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, u)| u == url)
            .map(|(m, _)| *m)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, method: Method, url: &str) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push((method, url.to_string()));

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        let reply = match queued {
            Some(reply) => reply,
            None => self
                .repeated
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or_else(|| Reply::Fail(TransportError::Other(format!("unscripted url {url}")))),
        };
        reply.into_result()
    }
}
