//! # formbox
//!
//! A small file-backed content repository. Category definitions ("forms")
//! are loaded from a directory of data-only TOML files; each category owns
//! an in-memory item index backed by a per-category JSON array file, with
//! create/update/list/lookup/delete operations and category-supplied
//! derivation hooks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────────┐
//! │ *.form.toml  │──▶│  Registry    │──▶│ Per-category  │
//! │ definitions  │   │ + hook sets │   │ JSON files    │
//! └──────────────┘   └──────┬──────┘   └──────┬────────┘
//!                           │                 │ derived
//!                           ▼                 ▼
//!                    ┌────────────┐    ┌────────────┐
//!                    │ Repository │───▶│   SQLite   │
//!                    │ (mutations)│    │ tag index  │
//!                    └────────────┘    └────────────┘
//! ```
//!
//! The JSON files are the single canonical store; SQLite holds a derived
//! index serving id and metadata-tag lookups.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`hooks`] | Category derivation hooks and their registry |
//! | [`loader`] | Definition discovery and category registration |
//! | [`store`] | Per-category item index and file persistence |
//! | [`transform`] | Internal → external item mapping |
//! | [`search`] | Derived SQLite metadata index |
//! | [`repo`] | The repository: mutation and query orchestration |
//! | [`error`] | Error taxonomy |

pub mod config;
pub mod error;
pub mod hooks;
pub mod loader;
pub mod models;
pub mod repo;
pub mod search;
pub mod store;
pub mod transform;

pub use error::{Error, Result};
pub use repo::{Repository, UpsertRequest};
