//! HTML crawler: pages are parsed and queried with CSS selectors.

use anyhow::Result;
use starter_crawler::{
    CrawlStats, Crawler, CrawlerConfig, Dataset, HtmlContext, HtmlNavigator, Router,
};

use super::{finish, setup, RunOptions};
use crate::record::PageRecord;

pub const MAX_CONCURRENCY: usize = 30;
pub const MAX_REQUESTS_PER_CRAWL: usize = 1000;
pub const REQUEST_HANDLER_TIMEOUT_SECS: u64 = 30;
pub const MAX_REQUEST_RETRIES: usize = 3;
pub const QUEUE_NAME: Option<&str> = None;
pub const DATASET_NAME: Option<&str> = None;

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

pub fn router(dataset: &Dataset) -> Router<HtmlContext> {
    let mut router = Router::<HtmlContext>::new();

    let ds = dataset.clone();
    router.add_default_handler(move |ctx| default_handler(ctx, ds.clone()));

    let ds = dataset.clone();
    router.add_handler(DETAIL, move |ctx| detail_handler(ctx, ds.clone()));

    router
}

async fn default_handler(ctx: HtmlContext, dataset: Dataset) -> Result<()> {
    log::info!("Processing request: {}", ctx.request.url);

    let title = ctx.text("title")?;

    // Add your data extraction here
    dataset.push_data(PageRecord::new(&ctx.loaded_url).title(title))
}

async fn detail_handler(ctx: HtmlContext, dataset: Dataset) -> Result<()> {
    log::info!("Processing {DETAIL} request: {}", ctx.request.url);

    let title = ctx.text("title")?;
    let heading = ctx.text("h1")?;
    let description = ctx.text(".description")?;

    dataset.push_data(
        PageRecord::new(&ctx.loaded_url)
            .title(title)
            .heading(heading)
            .description(description)
            .kind("detail"),
    )
}

pub async fn run(opts: RunOptions) -> Result<CrawlStats> {
    let setup = setup(&opts, QUEUE_NAME, DATASET_NAME, &INITIAL_URLS)?;

    let navigator = HtmlNavigator::new(&opts.config, setup.proxies.as_ref())?;
    let crawler = Crawler::new(opts.config.clone(), navigator, router(&setup.dataset))
        .with_queue(setup.queue)
        .with_proxies(setup.proxies);

    let crawl = crawler.run().await;
    finish(&opts, &setup.dataset, crawl)
}
