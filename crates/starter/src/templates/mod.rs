#[cfg(feature = "browser")]
pub mod browser;
pub mod html;
pub mod http;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use starter_crawler::{
    load_proxies, CrawlStats, CrawlerConfig, Dataset, DatasetConfig, ProxyConfiguration,
    ProxyFiles, Request, RequestQueue,
};

/// Everything a template needs besides its own handlers.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: CrawlerConfig,
    pub proxy_files: ProxyFiles,
    pub queue_name: Option<String>,
    pub dataset_name: Option<String>,
    pub dataset: DatasetConfig,
    /// Replaces the template's hard-coded start URLs when not empty.
    pub urls: Vec<String>,
    /// Label given to `urls`, to start on a named handler.
    pub label: Option<String>,
    pub export_csv: Option<PathBuf>,
}

impl RunOptions {
    pub fn new(config: CrawlerConfig) -> Self {
        Self {
            config,
            proxy_files: ProxyFiles::from_env(),
            queue_name: None,
            dataset_name: None,
            dataset: DatasetConfig::from_env(),
            urls: vec![],
            label: None,
            export_csv: None,
        }
    }
}

pub(crate) struct Setup {
    pub proxies: Option<ProxyConfiguration>,
    pub queue: Arc<RequestQueue>,
    pub dataset: Dataset,
}

/// Loads proxies, opens the queue and the dataset, and seeds the queue.
pub(crate) fn setup(
    opts: &RunOptions,
    queue_name: Option<&str>,
    dataset_name: Option<&str>,
    initial_urls: &[&str],
) -> Result<Setup> {
    let proxies = load_proxies(&opts.proxy_files).into_configuration();
    if proxies.is_none() {
        log::info!("Running without proxies");
    }

    let queue = Arc::new(RequestQueue::open(
        opts.queue_name.as_deref().or(queue_name),
    ));
    let dataset = Dataset::open(&opts.dataset, opts.dataset_name.as_deref().or(dataset_name))?;

    let seeds: Vec<&str> = if opts.urls.is_empty() {
        initial_urls.to_vec()
    } else {
        opts.urls.iter().map(String::as_str).collect()
    };
    let requests = seeds
        .into_iter()
        .map(|url| -> Result<Request> {
            let request = Request::new(url)?;
            Ok(match &opts.label {
                Some(label) => request.with_label(label.as_str()),
                None => request,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let added = queue.add_requests_batched(requests);
    log::info!("Seeded queue {} with {added} requests", queue.name());

    Ok(Setup {
        proxies,
        queue,
        dataset,
    })
}

/// Flushes the dataset whatever the crawl outcome, then exports it if asked.
pub(crate) fn finish(
    opts: &RunOptions,
    dataset: &Dataset,
    crawl: Result<CrawlStats>,
) -> Result<CrawlStats> {
    let written = dataset.close()?;
    log::info!("Saved {written} items to {}", dataset.path().display());
    let stats = crawl?;

    if let Some(path) = &opts.export_csv {
        let exported = dataset.export_csv(path)?;
        log::info!("Exported {exported} items to {}", path.display());
    }

    Ok(stats)
}
