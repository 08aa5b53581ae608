use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use starter_crawler::{
    CrawlStats, Crawler, CrawlerConfig, HtmlContext, HtmlNavigator, HttpContext, HttpNavigator,
    OnError, RequestQueue, Router,
};

fn test_config() -> CrawlerConfig {
    CrawlerConfig {
        max_concurrency: 4,
        max_request_retries: 2,
        request_handler_timeout_secs: 5,
        navigation_timeout_secs: 5,
        handle_sigint: false,
        ..Default::default()
    }
}

fn page(title: &str, body: &str) -> String {
    format!("<html><head><title>{title}</title></head><body>{body}</body></html>")
}

fn title_collector(titles: &Rc<RefCell<Vec<String>>>) -> Router<HtmlContext> {
    let mut router = Router::new();
    let t = titles.clone();
    router.add_default_handler(move |ctx: HtmlContext| {
        let t = t.clone();
        async move {
            t.borrow_mut().push(ctx.text("title")?);
            anyhow::Ok(())
        }
    });
    router
}

#[tokio::test]
async fn extracts_titles_from_seeds() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/one");
            then.status(200)
                .header("content-type", "text/html")
                .body(page("One", ""));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/two");
            then.status(200)
                .header("content-type", "text/html")
                .body(page("Two", ""));
        })
        .await;

    let config = test_config();
    let titles = Rc::new(RefCell::new(vec![]));
    let crawler = Crawler::new(
        config.clone(),
        HtmlNavigator::new(&config, None).unwrap(),
        title_collector(&titles),
    );
    crawler
        .add_requests([server.url("/one"), server.url("/two"), server.url("/one")])
        .unwrap();

    let stats = crawler.run().await.unwrap();

    assert_eq!(
        stats,
        CrawlStats {
            finished: 2,
            ..Default::default()
        }
    );
    let mut titles = titles.borrow().clone();
    titles.sort();
    assert_eq!(titles, vec!["One", "Two"]);
    assert!(crawler.queue().is_finished());
}

#[tokio::test]
async fn retries_server_errors_then_gives_up() {
    let server = MockServer::start_async().await;
    let flaky = server
        .mock_async(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        })
        .await;

    let config = test_config();
    let crawler = Crawler::new(
        config.clone(),
        HttpNavigator::new(&config, None).unwrap(),
        Router::<HttpContext>::new(),
    );
    crawler.add_requests([server.url("/flaky")]).unwrap();

    let stats = crawler.run().await.unwrap();

    assert_eq!(
        stats,
        CrawlStats {
            failed: 1,
            retries: 2,
            ..Default::default()
        }
    );
    flaky.assert_hits_async(3).await;
}

#[tokio::test]
async fn blocked_status_is_a_failure() {
    let server = MockServer::start_async().await;
    let forbidden = server
        .mock_async(|when, then| {
            when.method(GET).path("/forbidden");
            then.status(403);
        })
        .await;

    let config = CrawlerConfig {
        max_request_retries: 0,
        ..test_config()
    };
    let crawler = Crawler::new(
        config.clone(),
        HttpNavigator::new(&config, None).unwrap(),
        Router::<HttpContext>::new(),
    );
    crawler.add_requests([server.url("/forbidden")]).unwrap();

    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.failed, 1);
    forbidden.assert_hits_async(1).await;
}

#[tokio::test]
async fn fail_mode_aborts_the_crawl() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/broken");
            then.status(200).body(page("Broken", ""));
        })
        .await;

    let config = CrawlerConfig {
        max_request_retries: 0,
        on_handler_error: OnError::Fail,
        ..test_config()
    };
    let mut router = Router::<HttpContext>::new();
    router.add_default_handler(|_ctx| async {
        Err::<(), _>(anyhow::anyhow!("extraction failed"))
    });

    let crawler = Crawler::new(
        config.clone(),
        HttpNavigator::new(&config, None).unwrap(),
        router,
    );
    crawler.add_requests([server.url("/broken")]).unwrap();

    let err = crawler.run().await.unwrap_err();
    assert!(format!("{err:#}").contains("extraction failed"));
}

#[tokio::test]
async fn stops_at_max_requests_per_crawl() {
    let server = MockServer::start_async().await;
    let pages = server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).body(page("Any", ""));
        })
        .await;

    let config = CrawlerConfig {
        max_concurrency: 1,
        max_requests_per_crawl: Some(2),
        ..test_config()
    };
    let titles = Rc::new(RefCell::new(vec![]));
    let queue = Arc::new(RequestQueue::open(Some("limited")));
    let crawler = Crawler::new(
        config.clone(),
        HtmlNavigator::new(&config, None).unwrap(),
        title_collector(&titles),
    )
    .with_queue(queue.clone());
    crawler
        .add_requests([server.url("/a"), server.url("/b"), server.url("/c")])
        .unwrap();

    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.finished, 2);
    assert_eq!(queue.pending_count(), 1);
    pages.assert_hits_async(2).await;
}

#[tokio::test]
async fn follows_same_host_links_with_label() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200).body(page(
                "Home",
                r#"<a href="/detail">detail</a>
                   <a href="/detail#again">again</a>
                   <a href="https://elsewhere.invalid/x">elsewhere</a>
                   <a href="mailto:someone@example.com">mail</a>"#,
            ));
        })
        .await;
    let detail = server
        .mock_async(|when, then| {
            when.method(GET).path("/detail");
            then.status(200).body(page(
                "Detail",
                r#"<h1>Heading</h1><p class="description">Words</p>"#,
            ));
        })
        .await;

    let config = test_config();
    let seen = Rc::new(RefCell::new(vec![]));
    let mut router = Router::new();
    router.add_default_handler(|ctx: HtmlContext| async move {
        ctx.enqueue_links("a", Some("DETAIL"))?;
        anyhow::Ok(())
    });
    let s = seen.clone();
    router.add_handler("DETAIL", move |ctx: HtmlContext| {
        let s = s.clone();
        async move {
            s.borrow_mut()
                .push((ctx.text("h1")?, ctx.text(".description")?));
            anyhow::Ok(())
        }
    });

    let crawler = Crawler::new(
        config.clone(),
        HtmlNavigator::new(&config, None).unwrap(),
        router,
    );
    crawler.add_requests([server.url("/")]).unwrap();

    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.finished, 2);
    assert_eq!(
        *seen.borrow(),
        vec![(String::from("Heading"), String::from("Words"))]
    );
    detail.assert_hits_async(1).await;
}

#[tokio::test]
async fn failing_hook_counts_as_failed_attempt() {
    let server = MockServer::start_async().await;
    let never = server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200);
        })
        .await;

    let config = CrawlerConfig {
        max_request_retries: 1,
        ..test_config()
    };
    let crawler = Crawler::new(
        config.clone(),
        HttpNavigator::new(&config, None).unwrap(),
        Router::<HttpContext>::new(),
    )
    .pre_navigation_hook(|request| anyhow::bail!("refusing {}", request.url));
    crawler.add_requests([server.url("/")]).unwrap();

    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.retries, 1);
    never.assert_hits_async(0).await;
}
