use std::collections::HashMap;
use std::io::prelude::*;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::header::{HeaderMap, CONTENT_TYPE};

use crate::config::CrawlerConfig;
use crate::navigator::{Navigation, Navigator};
use crate::proxy::ProxyConfiguration;
use crate::queue::RequestQueue;
use crate::request::Request;

/// Plain HTTP fetching. One client per proxy, since reqwest binds proxies at
/// client build time.
#[derive(Debug, Clone)]
pub struct HttpNavigator {
    direct: reqwest::Client,
    proxied: HashMap<String, reqwest::Client>,
    blocked_status_codes: Vec<u16>,
}

impl HttpNavigator {
    pub fn new(config: &CrawlerConfig, proxies: Option<&ProxyConfiguration>) -> Result<Self> {
        let mut proxied = HashMap::new();
        if let Some(proxies) = proxies {
            for url in proxies.urls() {
                let proxy = reqwest::Proxy::all(url)?;
                proxied.insert(url.to_string(), client_builder(config).proxy(proxy).build()?);
            }
        }

        Ok(Self {
            direct: client_builder(config).build()?,
            proxied,
            blocked_status_codes: config.blocked_status_codes.clone(),
        })
    }

    pub(crate) async fn fetch(&self, nav: Navigation) -> Result<HttpContext> {
        let client = match &nav.proxy_url {
            Some(proxy_url) => self
                .proxied
                .get(proxy_url)
                .ok_or_else(|| anyhow!("Unknown proxy {proxy_url}"))?,
            None => &self.direct,
        };

        let resp = client.get(&nav.request.url).send().await?;
        let status = resp.status();
        if status.is_server_error() || self.blocked_status_codes.contains(&status.as_u16()) {
            bail!(
                "Request blocked or failed with status code {status}: {}",
                nav.request.url
            );
        }

        let loaded_url = resp.url().to_string();
        let headers = resp.headers().clone();
        let body = match headers.get(CONTENT_TYPE) {
            Some(c) if c == "application/x-gzip" || c == "application/gzip" => {
                let compressed = resp.bytes().await?;
                let mut gz = GzDecoder::new(&compressed[..]);
                let mut body = String::new();
                gz.read_to_string(&mut body)?;
                body
            }
            _ => resp.text().await?,
        };

        Ok(HttpContext {
            request: nav.request,
            loaded_url,
            status: status.as_u16(),
            headers,
            body,
            proxy_url: nav.proxy_url,
            queue: nav.queue,
        })
    }
}

fn client_builder(config: &CrawlerConfig) -> reqwest::ClientBuilder {
    reqwest::ClientBuilder::new()
        .user_agent(&config.user_agent)
        .timeout(config.navigation_timeout())
        .gzip(true)
        .deflate(true)
}

#[async_trait(?Send)]
impl Navigator for HttpNavigator {
    type Context = HttpContext;

    async fn navigate(&self, nav: Navigation) -> Result<HttpContext> {
        self.fetch(nav).await
    }
}

#[derive(Debug, Clone)]
pub struct HttpContext {
    pub request: Request,
    /// The URL after redirects.
    pub loaded_url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    pub proxy_url: Option<String>,
    queue: Arc<RequestQueue>,
}

impl HttpContext {
    pub fn queue(&self) -> &Arc<RequestQueue> {
        &self.queue
    }

    /// Adds a follow-up request, labelled for routing when `label` is set.
    pub fn enqueue(&self, url: &str, label: Option<&str>) -> Result<bool> {
        let mut request = Request::new(url)?;
        if let Some(label) = label {
            request = request.with_label(label);
        }
        Ok(self.queue.add_request(request))
    }
}
