use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const PROXIES_PATH: &str = "PROXIES_PATH";
pub const DATACENTER_PROXIES_FILE: &str = "DATACENTER_PROXIES_FILE";
pub const RESIDENTIAL_PROXIES_FILE: &str = "RESIDENTIAL_PROXIES_FILE";

/// Location of the two flat proxy lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyFiles {
    pub dir: PathBuf,
    pub datacenter_file: String,
    pub residential_file: String,
}

impl Default for ProxyFiles {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("proxies"),
            datacenter_file: String::from("proxy-datacenter.txt"),
            residential_file: String::from("proxy-residential.txt"),
        }
    }
}

impl ProxyFiles {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Defaults overridden by `PROXIES_PATH`, `DATACENTER_PROXIES_FILE` and
    /// `RESIDENTIAL_PROXIES_FILE`.
    pub fn from_env() -> Self {
        let mut files = Self::default();
        if let Some(dir) = non_empty_var(PROXIES_PATH) {
            files.dir = PathBuf::from(dir);
        }
        if let Some(file) = non_empty_var(DATACENTER_PROXIES_FILE) {
            files.datacenter_file = file;
        }
        if let Some(file) = non_empty_var(RESIDENTIAL_PROXIES_FILE) {
            files.residential_file = file;
        }
        files
    }

    pub fn datacenter_path(&self) -> PathBuf {
        self.dir.join(&self.datacenter_file)
    }

    pub fn residential_path(&self) -> PathBuf {
        self.dir.join(&self.residential_file)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TieredProxies {
    pub datacenter: Vec<String>,
    pub residential: Vec<String>,
}

impl TieredProxies {
    pub fn is_empty(&self) -> bool {
        self.datacenter.is_empty() && self.residential.is_empty()
    }

    /// Datacenter tier first, residential as the fallback.
    pub fn into_tiers(self) -> Vec<Vec<String>> {
        vec![self.datacenter, self.residential]
    }

    pub fn into_configuration(self) -> Option<ProxyConfiguration> {
        ProxyConfiguration::from_tiers(self.into_tiers())
    }
}

/// Keeps trimmed, non-empty lines starting with `http`, in file order.
pub fn parse_proxy_list(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.starts_with("http"))
        .map(String::from)
        .collect()
}

/// Never fails: if either list can't be read, both tiers come back empty and
/// the crawler runs unproxied.
pub fn load_proxies(files: &ProxyFiles) -> TieredProxies {
    let read = || -> std::io::Result<TieredProxies> {
        let datacenter = fs::read_to_string(files.datacenter_path())?;
        let residential = fs::read_to_string(files.residential_path())?;
        Ok(TieredProxies {
            datacenter: parse_proxy_list(&datacenter),
            residential: parse_proxy_list(&residential),
        })
    };

    match read() {
        Ok(proxies) => {
            log_tier("datacenter", &proxies.datacenter);
            log_tier("residential", &proxies.residential);
            proxies
        }
        Err(e) => {
            log::warn!("Could not load proxies: {e}");
            TieredProxies::default()
        }
    }
}

fn log_tier(name: &str, proxies: &[String]) {
    if proxies.is_empty() {
        log::info!("No {name} proxies loaded. File may be empty.");
    } else {
        log::info!("Loaded {} {name} proxies.", proxies.len());
    }
}

#[derive(Debug)]
struct Tier {
    urls: Vec<String>,
    next: AtomicUsize,
}

/// Ordered proxy tiers. A request starts on the first tier and moves one tier
/// up with each retry; proxies rotate round-robin inside a tier.
#[derive(Debug)]
pub struct ProxyConfiguration {
    tiers: Vec<Tier>,
}

impl ProxyConfiguration {
    /// Returns `None` when every tier is empty.
    pub fn from_tiers(tiers: Vec<Vec<String>>) -> Option<Self> {
        let tiers: Vec<Tier> = tiers
            .into_iter()
            .filter(|urls| !urls.is_empty())
            .map(|urls| Tier {
                urls,
                next: AtomicUsize::new(0),
            })
            .collect();

        if tiers.is_empty() {
            None
        } else {
            Some(Self { tiers })
        }
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    pub fn new_url(&self, retry_count: usize) -> &str {
        let tier = &self.tiers[retry_count.min(self.tiers.len() - 1)];
        let i = tier.next.fetch_add(1, Ordering::Relaxed) % tier.urls.len();
        &tier.urls[i]
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.tiers
            .iter()
            .flat_map(|tier| tier.urls.iter().map(String::as_str))
    }
}
