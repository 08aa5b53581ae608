pub mod record;
pub mod templates;

pub use record::PageRecord;
pub use templates::RunOptions;

pub use anyhow;
