//! Plain HTTP crawler: no parsing, handlers get the raw body.

use anyhow::Result;
use starter_crawler::{
    CrawlStats, Crawler, CrawlerConfig, Dataset, HttpContext, HttpNavigator, Router,
};

use super::{finish, setup, RunOptions};
use crate::record::PageRecord;

pub const MAX_CONCURRENCY: usize = 50;
pub const MAX_REQUESTS_PER_CRAWL: usize = 1000;
pub const REQUEST_HANDLER_TIMEOUT_SECS: u64 = 30;
pub const MAX_REQUEST_RETRIES: usize = 3;
pub const QUEUE_NAME: Option<&str> = None;
pub const DATASET_NAME: Option<&str> = None;

pub const INITIAL_URLS: [&str; 3] = [
    "http://example.com",
    "http://example.org",
    "http://example.net",
];

pub const SPECIAL: &str = "SPECIAL";

pub fn crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        max_concurrency: MAX_CONCURRENCY,
        max_requests_per_crawl: Some(MAX_REQUESTS_PER_CRAWL),
        request_handler_timeout_secs: REQUEST_HANDLER_TIMEOUT_SECS,
        max_request_retries: MAX_REQUEST_RETRIES,
        ..Default::default()
    }
}

pub fn router(dataset: &Dataset) -> Router<HttpContext> {
    let mut router = Router::<HttpContext>::new();

    let ds = dataset.clone();
    router.add_default_handler(move |ctx| default_handler(ctx, ds.clone()));

    let ds = dataset.clone();
    router.add_handler(SPECIAL, move |ctx| special_handler(ctx, ds.clone()));

    router
}

async fn default_handler(ctx: HttpContext, dataset: Dataset) -> Result<()> {
    log::info!("Processing request: {}", ctx.request.url);

    // Add your data extraction here
    dataset.push_data(PageRecord::new(&ctx.request.url))
}

async fn special_handler(ctx: HttpContext, dataset: Dataset) -> Result<()> {
    log::info!("Processing {SPECIAL} request: {}", ctx.request.url);

    dataset.push_data(PageRecord::new(&ctx.request.url).kind("special"))
}

pub async fn run(opts: RunOptions) -> Result<CrawlStats> {
    let setup = setup(&opts, QUEUE_NAME, DATASET_NAME, &INITIAL_URLS)?;

    let navigator = HttpNavigator::new(&opts.config, setup.proxies.as_ref())?;
    let crawler = Crawler::new(opts.config.clone(), navigator, router(&setup.dataset))
        .with_queue(setup.queue)
        .with_proxies(setup.proxies);

    let crawl = crawler.run().await;
    finish(&opts, &setup.dataset, crawl)
}
