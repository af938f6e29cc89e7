//! Music dataset enrichment library - shared modules for all binaries.

pub mod checkpoint;
pub mod completion;
pub mod context;
pub mod dataset;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod genius;
pub mod http;
pub mod metadata;
pub mod models;
pub mod normalize;
pub mod page;
pub mod playcount;
pub mod progress;
pub mod safety;
pub mod source;
pub mod spotify;
pub mod storage;
pub mod work_unit;
