use anyhow::Result;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub url: String,
    pub unique_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub retry_count: usize,
    #[serde(default)]
    pub user_data: serde_json::Value,
}

impl Request {
    pub fn new<S: AsRef<str>>(url: S) -> Result<Self> {
        let parsed = Url::parse(url.as_ref())?;
        Ok(Self {
            url: parsed.to_string(),
            unique_key: unique_key(&parsed),
            label: None,
            retry_count: 0,
            user_data: serde_json::Value::Null,
        })
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_user_data(mut self, user_data: serde_json::Value) -> Self {
        self.user_data = user_data;
        self
    }
}

/// Normalized form used for deduplication: no fragment, sorted query pairs,
/// no trailing slash.
pub fn unique_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        pairs.sort();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    url.as_str().trim_end_matches('/').to_string()
}
