//! Error taxonomy for the formbox library.
//!
//! Load-time failures for an individual definition or data file are caught
//! and logged by the loader, never surfaced from `Repository::init`.
//! Mutation-time errors propagate to the caller and guarantee that neither
//! the in-memory index nor the backing file was touched.

use thiserror::Error;

/// All errors produced by the formbox library surface.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing from a category definition file.
    #[error("'{field}' is required but missing in form definition file: {source_file}")]
    Validation { field: String, source_file: String },

    /// Two definition files normalize to the same lowercase category id.
    #[error("there is already a form with id={0}")]
    DuplicateCategory(String),

    /// The given category id is not registered.
    #[error("category \"{0}\" is not a valid registered category id")]
    UnknownCategory(String),

    /// An item id was named but no item with that id exists in the category.
    #[error("no item with id \"{item_id}\" in category \"{category_id}\"")]
    UnknownItem {
        item_id: String,
        category_id: String,
    },

    /// A definition file names a hook set that is not registered.
    #[error("unknown hook set \"{name}\" in form definition file: {source_file}")]
    UnknownHookSet { name: String, source_file: String },

    /// A caller-supplied argument has the wrong shape.
    #[error("{0}")]
    InvalidArgument(String),

    /// A category hook returned a value of the wrong shape.
    #[error("{hook} must return {expected}")]
    InvalidHookResult {
        hook: &'static str,
        expected: &'static str,
    },

    /// A category hook did not complete within the configured bound.
    #[error("{hook} did not complete within {timeout_secs}s")]
    HookTimeout {
        hook: &'static str,
        timeout_secs: u64,
    },

    /// A hook implementation failed.
    #[error("{hook} failed: {message}")]
    HookFailed { hook: &'static str, message: String },

    /// A data file parsed to something other than a JSON array.
    #[error("{file} expected to contain an array, contents ignored")]
    MalformedDataFile { file: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
