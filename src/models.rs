//! Core data types for the formbox content repository.
//!
//! An [`Item`] is the durable record shape written to the per-category JSON
//! files; [`ExternalItem`] is the shape handed to callers after passing
//! through the transformer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::hooks::CategoryHooks;

/// A registered content category, created once at load time from a
/// `*.form.toml` definition file and immutable afterwards.
#[derive(Clone)]
pub struct Category {
    /// Lowercase, globally unique id.
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Opaque to the core; served back verbatim by the schema lookup.
    pub json_schema: Value,
    pub ui_schema: Option<Value>,
    /// Id prefix used for generated item ids (falls back to the category id).
    pub umm_bloc: Option<String>,
    /// Optional per-category derivation behavior.
    pub hooks: Option<Arc<dyn CategoryHooks>>,
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Category")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("description", &self.description)
            .field("umm_bloc", &self.umm_bloc)
            .field("hooks", &self.hooks.as_ref().map(|h| h.name()))
            .finish()
    }
}

/// A single stored content record belonging to one category.
///
/// Field names mirror the on-disk JSON exactly; data files must round-trip
/// through parse → serialize without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(rename = "categoryId", default)]
    pub category_id: String,
    /// Derived, structured payload (output of `compute_form_data`).
    pub data: Value,
    /// Raw submitted payload.
    #[serde(rename = "formData")]
    pub form_data: Value,
    /// Ordered strings used for metadata filtering.
    #[serde(default)]
    pub metadata: Vec<String>,
    #[serde(rename = "previewText", default)]
    pub preview_text: String,
    pub created_by: String,
    pub created_on: DateTime<Utc>,
}

/// The externally visible item shape produced by the transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalItem {
    pub id: String,
    #[serde(rename = "categoryId")]
    pub category_id: String,
    pub data: Value,
    #[serde(rename = "formData")]
    pub form_data: Value,
    pub metadata: Vec<String>,
    #[serde(rename = "previewText")]
    pub preview_text: String,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "createdOn")]
    pub created_on: DateTime<Utc>,
}

/// One row of the category listing.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Current item count for the category.
    pub count: usize,
}

/// Schema bundle returned by the schema lookup.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySchema {
    pub json: Value,
    pub ui: Option<Value>,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "ummBloc")]
    pub umm_bloc: Option<String>,
}
