//! Fetches the same URL a few times to show coalescing, reuse, and refresh.
//!
//! ```sh
//! RUST_LOG=reqcache=debug cargo run --example cached_get -- https://httpbin.org/uuid
//! ```
//!
//! Settings come from `reqcache.toml` and `REQCACHE__*` environment variables,
//! e.g. `REQCACHE__TTL_SECS=10`.

use std::time::Duration;

use reqcache::hooks::LoggingHook;
use reqcache::transport::HttpTransport;
use reqcache::{CacheSettings, RequestCache, RequestOptions};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reqcache=debug,info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://httpbin.org/uuid".to_owned());

    let settings = CacheSettings::load()?;
    let transport = HttpTransport::with_timeout(settings.request_timeout())?;
    let cache = RequestCache::<Value>::builder(transport)
        .settings(&settings)?
        .before_hook(LoggingHook)
        .after_hook(LoggingHook)
        .build();

    // Three concurrent callers, one network call.
    let (a, b, c) = tokio::join!(
        cache.get(url.as_str(), RequestOptions::new(), false),
        cache.get(url.as_str(), RequestOptions::new(), false),
        cache.get(url.as_str(), RequestOptions::new(), false),
    );
    let (a, b, c) = (a?, b?, c?);
    info!(shared = a == b && b == c, "coalesced");

    let cached = cache.get(url.as_str(), RequestOptions::new(), false).await?;
    info!(body = %cached, "served from cache");

    let fresh = cache.get(url.as_str(), RequestOptions::new(), true).await?;
    info!(body = %fresh, "forced refresh");

    tokio::time::sleep(settings.ttl() + Duration::from_millis(100)).await;
    let expired = cache.get(url.as_str(), RequestOptions::new(), false).await?;
    info!(body = %expired, "refetched after ttl");

    Ok(())
}
