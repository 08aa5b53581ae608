use std::sync::Arc;

use anyhow::{anyhow, bail, Error, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::timeout;

use crate::config::{CrawlerConfig, OnError};
use crate::limiter::RateLimiter;
use crate::navigator::{Navigation, Navigator};
use crate::proxy::ProxyConfiguration;
use crate::queue::RequestQueue;
use crate::request::Request;
use crate::robots::RobotsCache;
use crate::router::Router;

/// Runs before a request is handed to the navigator. An error fails the attempt.
pub type PreNavigationHook = Box<dyn Fn(&Request) -> Result<()>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub finished: usize,
    pub failed: usize,
    pub retries: usize,
    pub skipped: usize,
}

enum Outcome {
    Finished,
    Skipped,
    Failed(Request, Error),
}

pub struct Crawler<N: Navigator> {
    config: CrawlerConfig,
    navigator: N,
    router: Router<N::Context>,
    queue: Arc<RequestQueue>,
    proxies: Option<ProxyConfiguration>,
    hooks: Vec<PreNavigationHook>,
}

impl<N: Navigator> Crawler<N> {
    pub fn new(config: CrawlerConfig, navigator: N, router: Router<N::Context>) -> Self {
        Self {
            config,
            navigator,
            router,
            queue: Arc::new(RequestQueue::default()),
            proxies: None,
            hooks: vec![],
        }
    }

    pub fn with_queue(mut self, queue: Arc<RequestQueue>) -> Self {
        self.queue = queue;
        self
    }

    /// Must match the proxies the navigator was built with.
    pub fn with_proxies(mut self, proxies: Option<ProxyConfiguration>) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn pre_navigation_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request) -> Result<()> + 'static,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<RequestQueue> {
        &self.queue
    }

    pub fn add_requests<I, S>(&self, urls: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requests = urls
            .into_iter()
            .map(Request::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(self.queue.add_requests_batched(requests))
    }

    /// Drains the queue. Returns once nothing is pending or in flight, or once
    /// `max_requests_per_crawl` requests were handled.
    pub async fn run(&self) -> Result<CrawlStats> {
        let robots = if self.config.respect_robots_txt {
            Some(RobotsCache::new(&self.config.user_agent)?)
        } else {
            None
        };
        let limiter = self
            .config
            .max_requests_per_minute
            .map(RateLimiter::per_minute);

        let mut stats = CrawlStats::default();
        let mut started = 0;
        let mut limit_reached = false;
        let mut in_flight = FuturesUnordered::new();
        let mut sigint = Box::pin(tokio::signal::ctrl_c());

        loop {
            while in_flight.len() < self.config.max_concurrency.max(1) {
                if let Some(max) = self.config.max_requests_per_crawl {
                    if started >= max {
                        if !limit_reached {
                            log::info!(
                                "Crawler reached the max requests per crawl limit of {max} requests and will shut down soon"
                            );
                            limit_reached = true;
                        }
                        break;
                    }
                }
                let Some(request) = self.queue.fetch_next() else {
                    break;
                };
                started += 1;
                in_flight.push(self.process(request, robots.as_ref(), limiter.as_ref()));
            }

            if in_flight.is_empty() {
                break;
            }

            let outcome = tokio::select! {
                outcome = in_flight.next() => outcome,
                res = &mut sigint, if self.config.handle_sigint => {
                    res?;
                    bail!("Interrupted");
                }
            };

            match outcome {
                Some(Outcome::Finished) => {
                    self.queue.mark_handled();
                    stats.finished += 1;
                }
                Some(Outcome::Skipped) => {
                    self.queue.mark_handled();
                    stats.skipped += 1;
                }
                Some(Outcome::Failed(mut request, e)) => {
                    if request.retry_count < self.config.max_request_retries {
                        request.retry_count += 1;
                        log::warn!(
                            "Reclaiming failed request {} (retry {}/{}) got: {e:#}",
                            request.url,
                            request.retry_count,
                            self.config.max_request_retries
                        );
                        stats.retries += 1;
                        started -= 1;
                        self.queue.reclaim(request);
                    } else {
                        log::error!(
                            "Request {} failed and reached maximum retries got: {e:#}",
                            request.url
                        );
                        self.queue.mark_handled();
                        stats.failed += 1;
                        if self.config.on_handler_error == OnError::Fail {
                            return Err(e.context(format!("Request {} failed", request.url)));
                        }
                    }
                }
                None => break,
            }
        }

        log::info!(
            "Crawl finished: {} succeeded, {} failed, {} retried, {} skipped",
            stats.finished,
            stats.failed,
            stats.retries,
            stats.skipped
        );

        Ok(stats)
    }

    async fn process(
        &self,
        request: Request,
        robots: Option<&RobotsCache>,
        limiter: Option<&RateLimiter>,
    ) -> Outcome {
        match self.try_process(&request, robots, limiter).await {
            Ok(true) => Outcome::Finished,
            Ok(false) => Outcome::Skipped,
            Err(e) => Outcome::Failed(request, e),
        }
    }

    async fn try_process(
        &self,
        request: &Request,
        robots: Option<&RobotsCache>,
        limiter: Option<&RateLimiter>,
    ) -> Result<bool> {
        if let Some(robots) = robots {
            if !robots.allowed(&request.url).await {
                log::info!("Skipping {} disallowed by robots.txt", request.url);
                return Ok(false);
            }
        }
        if let Some(limiter) = limiter {
            limiter.acquire().await?;
        }

        for hook in &self.hooks {
            hook(request)?;
        }

        let nav = Navigation {
            request: request.clone(),
            proxy_url: self
                .proxies
                .as_ref()
                .map(|p| p.new_url(request.retry_count).to_string()),
            queue: self.queue.clone(),
        };

        let navigation_timeout = self.config.navigation_timeout();
        let ctx = timeout(navigation_timeout, self.navigator.navigate(nav))
            .await
            .map_err(|_| {
                anyhow!(
                    "Navigation timed out after {} seconds",
                    navigation_timeout.as_secs()
                )
            })??;

        let handler_timeout = self.config.request_handler_timeout();
        timeout(
            handler_timeout,
            self.router.route(request.label.as_deref(), ctx),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "Request handler timed out after {} seconds",
                handler_timeout.as_secs()
            )
        })??;

        Ok(true)
    }
}
