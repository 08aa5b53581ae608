use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use crossbeam_channel::Sender;
use serde::Serialize;
use serde_json::Value;

pub const STORAGE_DIR: &str = "STORAGE_DIR";
pub const ITEMS_FILE: &str = "items.jsonl";

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub storage_dir: PathBuf,
    pub purge_on_start: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("storage"),
            purge_on_start: true,
        }
    }
}

impl DatasetConfig {
    /// Default storage directory overridden by `STORAGE_DIR`.
    pub fn from_env() -> Self {
        let mut conf = Self::default();
        if let Some(dir) = std::env::var_os(STORAGE_DIR).filter(|d| !d.is_empty()) {
            conf.storage_dir = PathBuf::from(dir);
        }
        conf
    }
}

/// Append-only JSON-lines sink. Clones share the same writer thread.
#[derive(Debug, Clone)]
pub struct Dataset {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    tx_item: Mutex<Option<Sender<Value>>>,
    writer: Mutex<Option<JoinHandle<io::Result<usize>>>>,
}

impl Dataset {
    pub fn open(conf: &DatasetConfig, name: Option<&str>) -> Result<Self> {
        let dir = conf
            .storage_dir
            .join("datasets")
            .join(name.unwrap_or("default"));
        fs::create_dir_all(&dir)?;
        let path = dir.join(ITEMS_FILE);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(!conf.purge_on_start)
            .truncate(conf.purge_on_start)
            .open(&path)?;

        let (tx_item, rx_item) = crossbeam_channel::unbounded::<Value>();
        let writer = thread::Builder::new()
            .name(String::from("dataset-writer"))
            .spawn(move || {
                let mut wtr = BufWriter::new(file);
                let mut written = 0;
                while let Ok(item) = rx_item.recv() {
                    serde_json::to_writer(&mut wtr, &item)?;
                    wtr.write_all(b"\n")?;
                    written += 1;
                }
                wtr.flush()?;
                Ok(written)
            })?;

        log::debug!("Opened dataset at {}", path.display());

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                tx_item: Mutex::new(Some(tx_item)),
                writer: Mutex::new(Some(writer)),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn push_data<T: Serialize>(&self, item: T) -> Result<()> {
        let item = serde_json::to_value(item)?;
        let tx = self.inner.tx_item.lock().unwrap_or_else(|e| e.into_inner());
        match tx.as_ref() {
            Some(tx) => tx
                .send(item)
                .map_err(|e| anyhow!("Dataset writer is gone: {e}")),
            None => Err(anyhow!("Dataset {} is closed", self.inner.path.display())),
        }
    }

    /// Flushes pending items and returns how many were written since opening.
    /// Pushing after `close` fails.
    pub fn close(&self) -> Result<usize> {
        drop(
            self.inner
                .tx_item
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take(),
        );
        let writer = self
            .inner
            .writer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match writer {
            Some(handle) => {
                let written = handle
                    .join()
                    .map_err(|_| anyhow!("Dataset writer panicked"))??;
                Ok(written)
            }
            None => Ok(0),
        }
    }

    /// Reads back every item currently on disk.
    pub fn items(&self) -> Result<Vec<Value>> {
        read_items(&self.inner.path)
    }

    /// Writes the dataset as CSV. Columns are the top-level keys in the order
    /// they first appear.
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let items = self.items()?;

        let mut headers: Vec<String> = vec![];
        for item in &items {
            if let Value::Object(map) = item {
                for key in map.keys() {
                    if !headers.contains(key) {
                        headers.push(key.clone());
                    }
                }
            }
        }

        let mut wtr = csv::WriterBuilder::new().from_path(path.as_ref())?;
        wtr.write_record(&headers)?;
        for item in &items {
            let record = headers.iter().map(|key| match item.get(key) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            });
            wtr.write_record(record)?;
        }
        wtr.flush()?;

        Ok(items.len())
    }
}

pub fn read_items<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
    let reader = BufReader::new(File::open(path)?);
    let mut items = vec![];
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            items.push(serde_json::from_str(&line)?);
        }
    }
    Ok(items)
}
