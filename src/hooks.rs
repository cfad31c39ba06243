//! Derivation hooks for categories.
//!
//! The original content manager loaded hook functions as executable code
//! straight from the form definition files. Here a category instead declares
//! a hook set *by name*, and names resolve against a [`HookRegistry`] of
//! compiled [`CategoryHooks`] implementations built at startup. Definition
//! files stay data-only; no code is ever evaluated from the forms directory.
//!
//! # Lifecycle
//!
//! 1. The application registers hook sets via [`HookRegistry::register`]
//!    (built-ins come from [`HookRegistry::with_builtins`]).
//! 2. The loader resolves the `hooks = "<name>"` key of each definition file
//!    against the registry.
//! 3. On every upsert, the repository invokes the category's hooks in order
//!    (form data, metadata, preview) and validates their output.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use anyhow::Result;
//! use serde_json::Value;
//! use formbox::hooks::{CategoryHooks, HookRegistry};
//! use std::sync::Arc;
//!
//! struct UppercasePreview;
//!
//! #[async_trait]
//! impl CategoryHooks for UppercasePreview {
//!     fn name(&self) -> &str { "uppercase" }
//!
//!     async fn compute_preview_text(&self, form_data: &Value) -> Result<Option<Value>> {
//!         Ok(form_data["title"].as_str().map(|s| Value::from(s.to_uppercase())))
//!     }
//! }
//!
//! let mut registry = HookRegistry::with_builtins();
//! registry.register(Arc::new(UppercasePreview));
//! assert!(registry.resolve("uppercase").is_some());
//! ```

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-category derivation behavior.
///
/// Each method is optional: the default implementations return `Ok(None)`,
/// meaning "not provided", and the repository falls back to the raw form
/// data, an empty metadata list, and the literal `"No preview"` respectively.
///
/// Methods return raw [`Value`]s on purpose — the repository validates the
/// shape of every hook result (object / array / string) and fails the whole
/// mutation when an implementation misbehaves, rather than trusting it.
#[async_trait]
pub trait CategoryHooks: Send + Sync {
    /// Name this hook set is registered under (e.g. `"text"`).
    fn name(&self) -> &str;

    /// Derive the stored `data` payload from the submitted form data.
    async fn compute_form_data(&self, _form_data: &Value) -> Result<Option<Value>> {
        Ok(None)
    }

    /// Derive the metadata strings used for filtering.
    async fn compute_metadata(&self, _form_data: &Value) -> Result<Option<Value>> {
        Ok(None)
    }

    /// Derive the one-line preview text.
    async fn compute_preview_text(&self, _form_data: &Value) -> Result<Option<Value>> {
        Ok(None)
    }
}

/// Named hook sets available to category definitions.
pub struct HookRegistry {
    sets: HashMap<String, Arc<dyn CategoryHooks>>,
}

impl HookRegistry {
    /// An empty registry with no hook sets.
    pub fn new() -> Self {
        Self {
            sets: HashMap::new(),
        }
    }

    /// A registry pre-populated with the built-in hook sets.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TextHooks));
        registry
    }

    /// Register a hook set under its own name. Later registrations replace
    /// earlier ones with the same name.
    pub fn register(&mut self, hooks: Arc<dyn CategoryHooks>) {
        self.sets.insert(hooks.name().to_string(), hooks);
    }

    /// Look up a hook set by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn CategoryHooks>> {
        self.sets.get(name).cloned()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

const PREVIEW_MAX_CHARS: usize = 80;

/// Built-in hook set for plain text content.
///
/// Metadata comes from a `tags` array on the form data; the preview is the
/// `text` field truncated to a display-friendly length. The stored data
/// payload is left as the raw form data.
pub struct TextHooks;

#[async_trait]
impl CategoryHooks for TextHooks {
    fn name(&self) -> &str {
        "text"
    }

    async fn compute_metadata(&self, form_data: &Value) -> Result<Option<Value>> {
        Ok(form_data.get("tags").cloned())
    }

    async fn compute_preview_text(&self, form_data: &Value) -> Result<Option<Value>> {
        let text = match form_data.get("text").and_then(Value::as_str) {
            Some(t) => t,
            None => return Ok(None),
        };
        let preview: String = if text.chars().count() > PREVIEW_MAX_CHARS {
            let truncated: String = text.chars().take(PREVIEW_MAX_CHARS).collect();
            format!("{}...", truncated.trim_end())
        } else {
            text.to_string()
        };
        Ok(Some(Value::from(preview)))
    }
}
