//! ytget-core: watch-page stream extraction, format selection and retrieval

pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod escape;
pub mod input;
pub mod muxer;
pub mod naming;
pub mod page;
pub mod pipeline;
pub mod presenter;
pub mod records;
pub mod selector;

pub use catalog::{build_catalog, BuildOutcome, Catalog, Diagnostic, Format, FormatKind};
pub use config::Config;
pub use error::{Result, YtGetError};
pub use selector::{Selection, SelectionMode, SelectionPolicy, Selector};
