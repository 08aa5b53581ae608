use std::fmt;

/// The kind of sub-resource a page asks for while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Other,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Document => "document",
            Self::Stylesheet => "stylesheet",
            Self::Image => "image",
            Self::Media => "media",
            Self::Font => "font",
            Self::Script => "script",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Abort,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBlocker {
    pub blocked_kinds: Vec<ResourceKind>,
    pub blocked_domains: Vec<String>,
}

impl Default for ResourceBlocker {
    fn default() -> Self {
        Self {
            blocked_kinds: vec![
                ResourceKind::Image,
                ResourceKind::Stylesheet,
                ResourceKind::Font,
                ResourceKind::Media,
            ],
            blocked_domains: [
                "googlesyndication.com",
                "adservice.google.com",
                "doubleclick.net",
                "ad.doubleclick.net",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ResourceBlocker {
    /// Ad domains are matched as plain substrings of the whole URL.
    pub fn decide(&self, url: &str, kind: ResourceKind) -> RouteDecision {
        log::debug!("Blocking resources for: {url}");

        if self
            .blocked_domains
            .iter()
            .any(|domain| url.contains(domain.as_str()))
        {
            return RouteDecision::Abort;
        }
        if self.blocked_kinds.contains(&kind) {
            RouteDecision::Abort
        } else {
            RouteDecision::Continue
        }
    }
}
