//! Request classification.
//!
//! Decides, for every outgoing request, whether it is intercepted and with
//! which partition and strategy. Only GET requests to http(s) URLs are
//! intercepted; the first matching rule wins:
//!
//! 1. exact static-asset path -> static, cache-first
//! 2. `/api/` or an API endpoint prefix -> api, network-first
//! 3. image destination -> dynamic, cache-first
//! 4. anything else -> dynamic, network-first

use std::collections::HashSet;

use reqwest::Method;
use serde::Serialize;
use souk_core::AppConfig;

use crate::fetch::{Destination, Request, is_interceptable};
use crate::partition::PartitionKind;

/// Path prefix that always marks an API call.
pub const API_PREFIX: &str = "/api/";

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
}

/// Routing decision for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Route {
    pub partition: PartitionKind,
    pub strategy: Strategy,
}

/// Static-asset and API allow-lists.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    static_assets: HashSet<String>,
    api_endpoints: Vec<String>,
}

impl RouteTable {
    pub fn new<S, A>(static_assets: S, api_endpoints: A) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            static_assets: static_assets.into_iter().map(Into::into).collect(),
            api_endpoints: api_endpoints.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.static_assets.iter().cloned(), config.api_endpoints.iter().cloned())
    }

    /// Classify a request; `None` means pass it through untouched.
    pub fn classify(&self, request: &Request) -> Option<Route> {
        if request.method != Method::GET || !is_interceptable(&request.url) {
            return None;
        }

        let path = request.url.path();

        let route = if self.static_assets.contains(path) {
            Route { partition: PartitionKind::Static, strategy: Strategy::CacheFirst }
        } else if path.starts_with(API_PREFIX) || self.api_endpoints.iter().any(|prefix| path.starts_with(prefix.as_str()))
        {
            Route { partition: PartitionKind::Api, strategy: Strategy::NetworkFirst }
        } else if request.destination == Destination::Image {
            Route { partition: PartitionKind::Dynamic, strategy: Strategy::CacheFirst }
        } else {
            Route { partition: PartitionKind::Dynamic, strategy: Strategy::NetworkFirst }
        };

        Some(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn table() -> RouteTable {
        RouteTable::new(["/", "/index.html", "/icons/icon-192x192.png"], ["/rest/v1/"])
    }

    fn url(path: &str) -> Url {
        Url::parse("https://souk.example").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_static_asset_exact_match() {
        let route = table().classify(&Request::navigate(url("/"))).unwrap();
        assert_eq!(route, Route { partition: PartitionKind::Static, strategy: Strategy::CacheFirst });

        let route = table().classify(&Request::get(url("/index.html/extra"))).unwrap();
        assert_eq!(route.partition, PartitionKind::Dynamic);
    }

    #[test]
    fn test_static_beats_image() {
        let route = table()
            .classify(&Request::image(url("/icons/icon-192x192.png")))
            .unwrap();
        assert_eq!(route.partition, PartitionKind::Static);
    }

    #[test]
    fn test_api_prefix() {
        let route = table().classify(&Request::get(url("/api/products?page=2"))).unwrap();
        assert_eq!(route, Route { partition: PartitionKind::Api, strategy: Strategy::NetworkFirst });
    }

    #[test]
    fn test_api_endpoint_allow_list() {
        let route = table().classify(&Request::get(url("/rest/v1/listings"))).unwrap();
        assert_eq!(route.partition, PartitionKind::Api);
    }

    #[test]
    fn test_api_beats_image() {
        let route = table().classify(&Request::image(url("/api/thumbnails/1"))).unwrap();
        assert_eq!(route.partition, PartitionKind::Api);
    }

    #[test]
    fn test_image_cache_first() {
        let route = table().classify(&Request::image(url("/uploads/lamp.jpg"))).unwrap();
        assert_eq!(route, Route { partition: PartitionKind::Dynamic, strategy: Strategy::CacheFirst });
    }

    #[test]
    fn test_other_network_first() {
        let route = table().classify(&Request::navigate(url("/listings/42"))).unwrap();
        assert_eq!(route, Route { partition: PartitionKind::Dynamic, strategy: Strategy::NetworkFirst });
    }

    #[test]
    fn test_non_get_passes_through() {
        let request = Request::post_json(url("/api/products"), &serde_json::json!({})).unwrap();
        assert!(table().classify(&request).is_none());
    }

    #[test]
    fn test_disallowed_scheme_passes_through() {
        let request = Request::get(Url::parse("chrome-extension://abcdef/popup.html").unwrap());
        assert!(table().classify(&request).is_none());
    }
}
