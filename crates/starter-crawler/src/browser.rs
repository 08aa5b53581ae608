use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use headless_chrome::browser::tab::{RequestInterceptor, RequestPausedDecision};
use headless_chrome::browser::transport::{SessionId, Transport};
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Fetch::FailRequest;
use headless_chrome::protocol::cdp::Network::{ErrorReason, ResourceType};
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::block::{ResourceBlocker, ResourceKind, RouteDecision};
use crate::config::CrawlerConfig;
use crate::navigator::{Navigation, Navigator};
use crate::proxy::ProxyConfiguration;
use crate::queue::RequestQueue;
use crate::request::Request;

/// Runs on the fresh tab before it navigates.
pub type TabHook = Box<dyn Fn(&Arc<Tab>, &Request) -> Result<()> + Send + Sync>;

pub struct BrowserNavigator {
    browser: Browser,
    hooks: Arc<Vec<TabHook>>,
    navigation_timeout: Duration,
    proxy_url: Option<String>,
}

impl BrowserNavigator {
    /// The browser binds its proxy at launch, so only the first proxy of the
    /// first tier is used.
    pub fn launch(
        config: &CrawlerConfig,
        proxies: Option<&ProxyConfiguration>,
        headless: bool,
    ) -> Result<Self> {
        let proxy_url = launch_proxy(proxies);
        let options = LaunchOptions::default_builder()
            .headless(headless)
            .proxy_server(proxy_url.as_deref())
            .build()
            .map_err(|e| anyhow!("Invalid browser launch options: {e}"))?;
        let browser = Browser::new(options)?;

        Ok(Self {
            browser,
            hooks: Arc::new(vec![]),
            navigation_timeout: config.navigation_timeout(),
            proxy_url,
        })
    }

    /// The proxy every page goes through, if any.
    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }

    pub fn pre_navigation_hook(mut self, hook: TabHook) -> Self {
        match Arc::get_mut(&mut self.hooks) {
            Some(hooks) => hooks.push(hook),
            None => {
                log::error!("Can't add a pre-navigation hook to a browser already in use");
            }
        }
        self
    }
}

#[async_trait(?Send)]
impl Navigator for BrowserNavigator {
    type Context = BrowserContext;

    async fn navigate(&self, nav: Navigation) -> Result<BrowserContext> {
        let browser = self.browser.clone();
        let hooks = self.hooks.clone();
        let request = nav.request.clone();
        let navigation_timeout = self.navigation_timeout;

        let (loaded_url, title, content) = tokio::task::spawn_blocking(move || {
            let tab = browser.new_tab()?;
            tab.set_default_timeout(navigation_timeout);
            for hook in hooks.iter() {
                hook(&tab, &request)?;
            }
            tab.navigate_to(&request.url)?.wait_until_navigated()?;
            let page = (tab.get_url(), tab.get_title()?, tab.get_content()?);
            if let Err(e) = tab.close(true) {
                log::debug!("Couldn't close tab for {} got: {e}", request.url);
            }
            Ok::<_, anyhow::Error>(page)
        })
        .await??;

        Ok(BrowserContext {
            request: nav.request,
            loaded_url,
            title,
            content,
            proxy_url: self.proxy_url.clone(),
            queue: nav.queue,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BrowserContext {
    pub request: Request,
    pub loaded_url: String,
    pub title: String,
    /// Rendered HTML once navigation settled.
    pub content: String,
    pub proxy_url: Option<String>,
    queue: Arc<RequestQueue>,
}

impl BrowserContext {
    pub fn new(
        request: Request,
        loaded_url: String,
        title: String,
        content: String,
        queue: Arc<RequestQueue>,
    ) -> Self {
        Self {
            request,
            loaded_url,
            title,
            content,
            proxy_url: None,
            queue,
        }
    }

    pub fn queue(&self) -> &Arc<RequestQueue> {
        &self.queue
    }

    pub fn enqueue(&self, url: &str, label: Option<&str>) -> Result<bool> {
        let mut request = Request::new(url)?;
        if let Some(label) = label {
            request = request.with_label(label);
        }
        Ok(self.queue.add_request(request))
    }
}

/// First proxy of the first tier, read without moving the rotation.
fn launch_proxy(proxies: Option<&ProxyConfiguration>) -> Option<String> {
    proxies.and_then(|p| p.urls().next()).map(str::to_string)
}

fn resource_kind(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Media => ResourceKind::Media,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Script => ResourceKind::Script,
        _ => ResourceKind::Other,
    }
}

/// Aborts sub-requests the blocker rejects. Failing to install the
/// interception is logged and the page loads unfiltered.
pub fn block_resources(blocker: ResourceBlocker) -> TabHook {
    let blocker = Arc::new(blocker);
    Box::new(move |tab: &Arc<Tab>, _request: &Request| {
        let blocker = blocker.clone();
        let interceptor: Arc<dyn RequestInterceptor + Send + Sync> = Arc::new(
            move |_transport: Arc<Transport>, _session_id: SessionId, event: RequestPausedEvent| {
                let params = event.params;
                let kind = resource_kind(&params.resource_Type);
                match blocker.decide(&params.request.url, kind) {
                    RouteDecision::Abort => RequestPausedDecision::Fail(FailRequest {
                        request_id: params.request_id,
                        error_reason: ErrorReason::BlockedByClient,
                    }),
                    RouteDecision::Continue => RequestPausedDecision::Continue(None),
                }
            },
        );

        if let Err(e) = tab
            .enable_fetch(None, None)
            .and_then(|tab| tab.enable_request_interception(interceptor))
        {
            log::error!("Error in resource blocking pre-navigation hook: {e}");
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launches_on_first_datacenter_proxy() {
        let proxies = ProxyConfiguration::from_tiers(vec![
            vec!["http://dc-1:8000".into(), "http://dc-2:8000".into()],
            vec!["http://res-1:9000".into()],
        ])
        .unwrap();

        assert_eq!(launch_proxy(Some(&proxies)).as_deref(), Some("http://dc-1:8000"));
        assert_eq!(launch_proxy(Some(&proxies)).as_deref(), Some("http://dc-1:8000"));
        assert_eq!(proxies.new_url(0), "http://dc-1:8000");
        assert_eq!(launch_proxy(None), None);
    }

    #[test]
    fn maps_resource_types() {
        assert_eq!(resource_kind(&ResourceType::Document), ResourceKind::Document);
        assert_eq!(resource_kind(&ResourceType::Stylesheet), ResourceKind::Stylesheet);
        assert_eq!(resource_kind(&ResourceType::Image), ResourceKind::Image);
        assert_eq!(resource_kind(&ResourceType::Media), ResourceKind::Media);
        assert_eq!(resource_kind(&ResourceType::Font), ResourceKind::Font);
        assert_eq!(resource_kind(&ResourceType::Script), ResourceKind::Script);
        assert_eq!(resource_kind(&ResourceType::Xhr), ResourceKind::Other);
        assert_eq!(resource_kind(&ResourceType::Other), ResourceKind::Other);
    }

    #[test]
    fn blocks_by_mapped_kind() {
        let blocker = ResourceBlocker::default();
        let decide = |url: &str, resource_type: ResourceType| {
            blocker.decide(url, resource_kind(&resource_type))
        };
        assert_eq!(
            decide("https://example.com/a.png", ResourceType::Image),
            RouteDecision::Abort
        );
        assert_eq!(
            decide("https://example.com/", ResourceType::Document),
            RouteDecision::Continue
        );
        assert_eq!(
            decide("https://example.com/api", ResourceType::Xhr),
            RouteDecision::Continue
        );
    }
}
