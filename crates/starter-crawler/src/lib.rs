mod block;
#[cfg(feature = "browser")]
mod browser;
mod config;
mod crawler;
mod dataset;
mod html;
mod http;
mod limiter;
mod navigator;
mod proxy;
mod queue;
mod request;
mod robots;
mod router;

pub use block::{ResourceBlocker, ResourceKind, RouteDecision};
#[cfg(feature = "browser")]
pub use browser::{block_resources, BrowserContext, BrowserNavigator, TabHook};
pub use config::{CrawlerConfig, OnError};
pub use crawler::{CrawlStats, Crawler, PreNavigationHook};
pub use dataset::{read_items, Dataset, DatasetConfig};
pub use html::{HtmlContext, HtmlNavigator};
pub use http::{HttpContext, HttpNavigator};
pub use navigator::{Navigation, Navigator};
pub use proxy::{load_proxies, parse_proxy_list, ProxyConfiguration, ProxyFiles, TieredProxies};
pub use queue::RequestQueue;
pub use request::Request;
pub use router::Router;

pub use anyhow;
pub use serde_json;
