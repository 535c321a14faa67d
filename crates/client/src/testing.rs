//! Test doubles shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use souk_core::Error;

use crate::fetch::{FetchResponse, Network, Request};

#[derive(Clone)]
enum Reply {
    Status(u16, String),
    Fail,
}

/// Scriptable network: every URL answers with a configured reply, unknown
/// URLs fail as if offline.
#[derive(Default)]
pub(crate) struct MockNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    body_rules: Mutex<Vec<(String, String, u16)>>,
    calls: Mutex<Vec<(String, String, Option<Bytes>)>>,
}

impl MockNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(&self, url: &str, status: u16, body: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Status(status, body.to_string()));
    }

    pub(crate) fn fail(&self, url: &str) {
        self.replies.lock().unwrap().insert(url.to_string(), Reply::Fail);
    }

    /// Answer requests to `url` whose body contains `needle` with `status`,
    /// ahead of the URL's plain reply.
    pub(crate) fn reply_when_body_contains(&self, url: &str, needle: &str, status: u16) {
        self.body_rules
            .lock()
            .unwrap()
            .push((url.to_string(), needle.to_string(), status));
    }

    /// Number of requests sent to `url`.
    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(_, u, _)| u == url).count()
    }

    /// Bodies of the POST requests sent to `url`, in order.
    pub(crate) fn posted_to(&self, url: &str) -> Vec<serde_json::Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(method, u, _)| method == "POST" && u == url)
            .filter_map(|(_, _, body)| body.as_ref().and_then(|b| serde_json::from_slice(b).ok()))
            .collect()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error> {
        let url = request.url.to_string();
        self.calls
            .lock()
            .unwrap()
            .push((request.method.to_string(), url.clone(), request.body.clone()));

        let body = request
            .body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();
        let rule = self
            .body_rules
            .lock()
            .unwrap()
            .iter()
            .find(|(u, needle, _)| u == &url && body.contains(needle.as_str()))
            .map(|(_, _, status)| Reply::Status(*status, String::new()));
        let reply = rule.or_else(|| self.replies.lock().unwrap().get(&url).cloned());
        match reply {
            Some(Reply::Status(status, body)) => {
                let mut headers = HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                Ok(FetchResponse {
                    url: request.url.clone(),
                    status: StatusCode::from_u16(status).unwrap(),
                    headers,
                    bytes: Bytes::from(body),
                    fetch_ms: 1,
                })
            }
            Some(Reply::Fail) | None => Err(Error::Network(format!("mock offline: {url}"))),
        }
    }
}
