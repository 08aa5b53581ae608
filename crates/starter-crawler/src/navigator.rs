use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::queue::RequestQueue;
use crate::request::Request;

/// Everything a navigator needs to load one request.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub request: Request,
    pub proxy_url: Option<String>,
    pub queue: Arc<RequestQueue>,
}

/// Loads a request and turns the result into the context handed to the router.
#[async_trait(?Send)]
pub trait Navigator {
    type Context: 'static;

    async fn navigate(&self, nav: Navigation) -> Result<Self::Context>;
}
