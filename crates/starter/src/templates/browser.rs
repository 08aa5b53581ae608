//! Headless browser crawler. Images, stylesheets, fonts, media and known ad
//! domains are blocked before each navigation.

use anyhow::Result;
use starter_crawler::{
    block_resources, BrowserContext, BrowserNavigator, CrawlStats, Crawler, CrawlerConfig,
    Dataset, ResourceBlocker, Router,
};

use super::{finish, setup, RunOptions};
use crate::record::PageRecord;

pub const MAX_CONCURRENCY: usize = 10;
pub const MAX_REQUESTS_PER_CRAWL: usize = 1000;
pub const REQUEST_HANDLER_TIMEOUT_SECS: u64 = 60;
pub const MAX_REQUEST_RETRIES: usize = 3;
pub const QUEUE_NAME: Option<&str> = None;
pub const DATASET_NAME: Option<&str> = None;
pub const HEADLESS: bool = true;

pub const INITIAL_URLS: [&str; 3] = [
    "https://example.com",
    "https://example.org",
    "https://example.net",
];

pub const DETAIL: &str = "DETAIL";

pub fn crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        max_concurrency: MAX_CONCURRENCY,
        max_requests_per_crawl: Some(MAX_REQUESTS_PER_CRAWL),
        request_handler_timeout_secs: REQUEST_HANDLER_TIMEOUT_SECS,
        max_request_retries: MAX_REQUEST_RETRIES,
        ..Default::default()
    }
}

pub fn router(dataset: &Dataset) -> Router<BrowserContext> {
    let mut router = Router::<BrowserContext>::new();

    let ds = dataset.clone();
    router.add_default_handler(move |ctx| default_handler(ctx, ds.clone()));

    let ds = dataset.clone();
    router.add_handler(DETAIL, move |ctx| detail_handler(ctx, ds.clone()));

    router
}

async fn default_handler(ctx: BrowserContext, dataset: Dataset) -> Result<()> {
    log::info!("Processing request: {}", ctx.request.url);

    // Add your data extraction here
    dataset.push_data(PageRecord::new(&ctx.loaded_url).title(&ctx.title))
}

async fn detail_handler(ctx: BrowserContext, dataset: Dataset) -> Result<()> {
    log::info!("Processing {DETAIL} request: {}", ctx.request.url);

    dataset.push_data(
        PageRecord::new(&ctx.loaded_url)
            .title(&ctx.title)
            .kind("detail"),
    )
}

pub async fn run(opts: RunOptions, headless: bool) -> Result<CrawlStats> {
    let setup = setup(&opts, QUEUE_NAME, DATASET_NAME, &INITIAL_URLS)?;

    let navigator = BrowserNavigator::launch(&opts.config, setup.proxies.as_ref(), headless)?
        .pre_navigation_hook(block_resources(ResourceBlocker::default()));
    let crawler = Crawler::new(opts.config.clone(), navigator, router(&setup.dataset))
        .with_queue(setup.queue)
        .pre_navigation_hook(|request| {
            log::info!("Navigating to {}", request.url);
            Ok(())
        });

    let crawl = crawler.run().await;
    finish(&opts, &setup.dataset, crawl)
}
