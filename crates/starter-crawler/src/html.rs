use std::cell::OnceCell;
use std::ops::Deref;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::config::CrawlerConfig;
use crate::http::{HttpContext, HttpNavigator};
use crate::navigator::{Navigation, Navigator};
use crate::proxy::ProxyConfiguration;
use crate::request::Request;

/// HTTP fetching plus a lazily parsed DOM queried with CSS selectors.
#[derive(Debug, Clone)]
pub struct HtmlNavigator {
    http: HttpNavigator,
}

impl HtmlNavigator {
    pub fn new(config: &CrawlerConfig, proxies: Option<&ProxyConfiguration>) -> Result<Self> {
        Ok(Self {
            http: HttpNavigator::new(config, proxies)?,
        })
    }
}

#[async_trait(?Send)]
impl Navigator for HtmlNavigator {
    type Context = HtmlContext;

    async fn navigate(&self, nav: Navigation) -> Result<HtmlContext> {
        let http = self.http.fetch(nav).await?;
        Ok(HtmlContext::new(http))
    }
}

pub struct HtmlContext {
    http: HttpContext,
    document: OnceCell<Html>,
}

impl HtmlContext {
    pub fn new(http: HttpContext) -> Self {
        Self {
            http,
            document: OnceCell::new(),
        }
    }

    pub fn document(&self) -> &Html {
        self.document
            .get_or_init(|| Html::parse_document(&self.http.body))
    }

    /// Text of every element matching `selector`, concatenated.
    pub fn text(&self, selector: &str) -> Result<String> {
        let selector = parse_selector(selector)?;
        Ok(self
            .document()
            .select(&selector)
            .flat_map(|elem| elem.text())
            .collect())
    }

    /// Enqueues the `href` of every matching element that stays on the same
    /// host as the loaded page. Returns how many new requests were added.
    pub fn enqueue_links(&self, selector: &str, label: Option<&str>) -> Result<usize> {
        let selector = parse_selector(selector)?;
        let base = Url::parse(&self.http.loaded_url)?;

        let mut added = 0;
        for href in self
            .document()
            .select(&selector)
            .filter_map(|elem| elem.value().attr("href"))
        {
            let Ok(url) = base.join(href) else {
                log::debug!("Skipping invalid link {href:?} on {base}");
                continue;
            };
            if !matches!(url.scheme(), "http" | "https") || url.host_str() != base.host_str() {
                continue;
            }
            let mut request = Request::new(url)?;
            if let Some(label) = label {
                request = request.with_label(label);
            }
            if self.http.queue().add_request(request) {
                added += 1;
            }
        }

        Ok(added)
    }
}

impl Deref for HtmlContext {
    type Target = HttpContext;

    fn deref(&self) -> &HttpContext {
        &self.http
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid selector {selector:?} got: {e}"))
}
