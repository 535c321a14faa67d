//! Outgoing request model.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use souk_core::Error;
use url::Url;

/// What kind of resource a request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    /// Programmatic fetches (API calls and the like).
    #[default]
    Empty,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Image => "image",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Font => "font",
            Destination::Manifest => "manifest",
            Destination::Empty => "empty",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "document" => Ok(Destination::Document),
            "image" => Ok(Destination::Image),
            "script" => Ok(Destination::Script),
            "style" => Ok(Destination::Style),
            "font" => Ok(Destination::Font),
            "manifest" => Ok(Destination::Manifest),
            "" | "empty" => Ok(Destination::Empty),
            other => Err(Error::InvalidInput(format!("unknown destination: {other}"))),
        }
    }
}

/// A request leaving the application.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
    /// Top-level page navigation.
    pub navigate: bool,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    /// A plain GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A HEAD request, used for connectivity probes.
    pub fn head(url: Url) -> Self {
        Self::new(Method::HEAD, url)
    }

    /// A page navigation.
    pub fn navigate(url: Url) -> Self {
        Self { destination: Destination::Document, navigate: true, ..Self::get(url) }
    }

    /// An image load.
    pub fn image(url: Url) -> Self {
        Self { destination: Destination::Image, ..Self::get(url) }
    }

    /// A JSON POST carrying `value` as its body.
    pub fn post_json(url: Url, value: &serde_json::Value) -> Result<Self, Error> {
        Self::new(Method::POST, url).with_json_body(value)
    }

    /// Build a request from a method name such as `"get"` or `"DELETE"`.
    pub fn with_method(method: &str, url: Url) -> Result<Self, Error> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid HTTP method: {method}")))?;
        Ok(Self::new(method, url))
    }

    /// Build a request with an explicit method.
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, destination: Destination::Empty, navigate: false, headers: HeaderMap::new(), body: None }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self.navigate = destination == Destination::Document;
        self
    }

    /// Attach `value` as a JSON body.
    pub fn with_json_body(mut self, value: &serde_json::Value) -> Result<Self, Error> {
        let body = serde_json::to_vec(value)?;
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(body));
        Ok(self)
    }
}
