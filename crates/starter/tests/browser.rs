#![cfg(feature = "browser")]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use starter::templates::browser;
use starter_crawler::{BrowserContext, Dataset, DatasetConfig, Request, RequestQueue};

fn context(url: &str, label: Option<&str>) -> BrowserContext {
    let mut request = Request::new(url).unwrap();
    if let Some(label) = label {
        request = request.with_label(label);
    }
    BrowserContext::new(
        request,
        url.to_string(),
        "Widget".to_string(),
        "<html><head><title>Widget</title></head></html>".to_string(),
        Arc::new(RequestQueue::default()),
    )
}

#[tokio::test]
async fn router_saves_title_and_detail_type() {
    let storage = tempfile::tempdir().unwrap();
    let dataset = Dataset::open(
        &DatasetConfig {
            storage_dir: storage.path().to_path_buf(),
            purge_on_start: true,
        },
        None,
    )
    .unwrap();
    let router = browser::router(&dataset);

    router
        .route(None, context("https://example.com/", None))
        .await
        .unwrap();
    router
        .route(
            Some(browser::DETAIL),
            context("https://example.com/widget", Some(browser::DETAIL)),
        )
        .await
        .unwrap();
    dataset.close().unwrap();

    assert_eq!(
        dataset.items().unwrap(),
        vec![
            json!({"url": "https://example.com/", "title": "Widget"}),
            json!({"url": "https://example.com/widget", "title": "Widget", "type": "detail"}),
        ]
    );
}
