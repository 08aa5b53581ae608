use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use anyhow::{anyhow, Result};
use futures::future::{FutureExt, LocalBoxFuture};

type Handler<C> = Box<dyn Fn(C) -> LocalBoxFuture<'static, Result<()>>>;

/// Dispatches a crawling context to a handler based on its request label.
pub struct Router<C> {
    default: Option<Handler<C>>,
    handlers: HashMap<String, Handler<C>>,
}

impl<C> Default for Router<C> {
    fn default() -> Self {
        Self {
            default: None,
            handlers: HashMap::new(),
        }
    }
}

impl<C> fmt::Debug for Router<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("default", &self.default.is_some())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C: 'static> Router<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_default_handler<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(C) -> Fut + 'static,
        Fut: Future<Output = Result<()>> + 'static,
    {
        self.default = Some(Box::new(move |ctx: C| handler(ctx).boxed_local()));
        self
    }

    pub fn add_handler<S, F, Fut>(&mut self, label: S, handler: F) -> &mut Self
    where
        S: Into<String>,
        F: Fn(C) -> Fut + 'static,
        Fut: Future<Output = Result<()>> + 'static,
    {
        self.handlers
            .insert(label.into(), Box::new(move |ctx: C| handler(ctx).boxed_local()));
        self
    }

    pub fn has_route(&self, label: Option<&str>) -> bool {
        self.find(label).is_some()
    }

    /// Runs the handler registered for `label`, falling back to the default one.
    pub fn route(&self, label: Option<&str>, ctx: C) -> LocalBoxFuture<'static, Result<()>> {
        match self.find(label) {
            Some(handler) => handler(ctx),
            None => {
                let label = label.unwrap_or_default().to_string();
                async move { Err(anyhow!("No handler registered for label {label:?}")) }
                    .boxed_local()
            }
        }
    }

    fn find(&self, label: Option<&str>) -> Option<&Handler<C>> {
        label
            .and_then(|label| self.handlers.get(label))
            .or(self.default.as_ref())
    }
}
