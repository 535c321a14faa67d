//! Cache-first and network-first fetch strategies.
//!
//! Neither strategy ever fails: cache and storage problems are logged and
//! the request proceeds without caching, and a request neither the cache nor
//! the network can answer gets the synthetic 503 response.

use souk_core::CacheDb;
use url::Url;

use crate::fetch::{Network, Request};
use crate::response::{Response, ResponseSource};

/// Serve from the partition when possible, otherwise fetch and store.
///
/// A cached hit returns without touching the network.
pub async fn cache_first(cache: &CacheDb, network: &dyn Network, request: &Request, partition: &str) -> Response {
    if let Some(hit) = lookup(cache, partition, request).await {
        tracing::debug!(url = %request.url, partition, "cache hit");
        return hit;
    }

    match network.fetch(request).await {
        Ok(fetched) => {
            let response = Response::from_network(fetched);
            store(cache, partition, request, &response).await;
            response
        }
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "cache miss and network unavailable");
            Response::offline()
        }
    }
}

/// Prefer the live network response, falling back to the partition.
///
/// When the network fails and nothing is cached for the request, a
/// navigation falls back to the cached `shell` document from any partition.
pub async fn network_first(
    cache: &CacheDb, network: &dyn Network, request: &Request, partition: &str, shell: Option<&Url>,
) -> Response {
    let error = match network.fetch(request).await {
        Ok(fetched) => {
            let response = Response::from_network(fetched);
            store(cache, partition, request, &response).await;
            return response;
        }
        Err(e) => e,
    };

    tracing::debug!(url = %request.url, error = %error, "network failed, falling back to cache");

    if let Some(hit) = lookup(cache, partition, request).await {
        return hit;
    }

    if request.navigate
        && let Some(shell) = shell
    {
        match cache.match_any("GET", shell.as_str()).await {
            Ok(Some(entry)) => return Response::from_cached(entry, ResponseSource::OfflineShell),
            Ok(None) => tracing::debug!(shell = %shell, "offline shell not cached"),
            Err(e) => tracing::warn!(shell = %shell, error = %e, "offline shell lookup failed"),
        }
    }

    Response::offline()
}

async fn lookup(cache: &CacheDb, partition: &str, request: &Request) -> Option<Response> {
    match cache
        .match_entry(partition, request.method.as_str(), request.url.as_str())
        .await
    {
        Ok(entry) => entry.map(|e| Response::from_cached(e, ResponseSource::Cache)),
        Err(e) => {
            tracing::warn!(url = %request.url, partition, error = %e, "cache lookup failed");
            None
        }
    }
}

/// Store a copy of a successful response; anything else is left alone.
async fn store(cache: &CacheDb, partition: &str, request: &Request, response: &Response) {
    if !response.is_success() {
        return;
    }
    match cache.put_entry(partition, &response.to_cached(request)).await {
        Ok(()) => tracing::debug!(url = %request.url, partition, "stored response"),
        Err(e) => tracing::warn!(url = %request.url, partition, error = %e, "failed to cache response"),
    }
}
