//! Category definition discovery and registration.
//!
//! Definition files are data-only TOML named `<base>.form.toml`, discovered
//! recursively under the configured forms directory:
//!
//! ```toml
//! id = "faq"
//! title = "FAQ"
//! description = "Frequently asked questions"
//! umm_bloc = "#builtin_text"
//! hooks = "text"
//!
//! [json_schema]
//! type = "object"
//!
//! [json_schema.properties.question]
//! type = "string"
//! ```
//!
//! Each successfully loaded category reads its items from a data file with
//! the same base name and a `.json` suffix (`faq.form.toml` → `faq.json`).
//! One bad definition never aborts the load: the failure is logged and the
//! remaining files are processed.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::hooks::HookRegistry;
use crate::models::Category;

const FORM_SUFFIX: &str = ".form.toml";
const DATA_SUFFIX: &str = ".json";

/// Raw definition file contents before validation.
///
/// Everything is optional here so that a missing required field produces a
/// [`Error::Validation`] naming the field and the file, instead of an opaque
/// deserialization failure.
#[derive(Debug, Deserialize)]
pub struct CategoryDef {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub json_schema: Option<toml::Value>,
    #[serde(default)]
    pub ui_schema: Option<toml::Value>,
    #[serde(default)]
    pub umm_bloc: Option<String>,
    /// Name of a hook set in the [`HookRegistry`].
    #[serde(default)]
    pub hooks: Option<String>,
}

/// Ordered category list plus id → category lookup.
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
    by_id: HashMap<String, usize>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a parsed definition.
    ///
    /// Fails if `id`, `title`, or `json_schema` is missing, if the lowercased
    /// id is already registered, or if the named hook set does not resolve.
    /// On success the category is appended to both views.
    pub fn load(
        &mut self,
        def: CategoryDef,
        source_file: &str,
        hooks: &HookRegistry,
    ) -> Result<&Category> {
        let missing = |field: &str| Error::Validation {
            field: field.to_string(),
            source_file: source_file.to_string(),
        };

        let id = def.id.ok_or_else(|| missing("id"))?.to_lowercase();
        let title = def.title.ok_or_else(|| missing("title"))?;
        let json_schema = def.json_schema.ok_or_else(|| missing("json_schema"))?;

        if self.by_id.contains_key(&id) {
            return Err(Error::DuplicateCategory(id));
        }

        let hook_set = match def.hooks {
            Some(name) => Some(hooks.resolve(&name).ok_or_else(|| Error::UnknownHookSet {
                name,
                source_file: source_file.to_string(),
            })?),
            None => None,
        };

        let category = Category {
            id: id.clone(),
            title,
            description: def.description,
            json_schema: toml_to_json(json_schema)?,
            ui_schema: def.ui_schema.map(toml_to_json).transpose()?,
            umm_bloc: def.umm_bloc,
            hooks: hook_set,
        };

        self.by_id.insert(id, self.categories.len());
        self.categories.push(category);
        Ok(self.categories.last().expect("just pushed"))
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.by_id.get(id).map(|&pos| &self.categories[pos])
    }

    /// Categories in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Find all form definition files under `dir`, as paths relative to it,
/// sorted for deterministic load order. A missing directory yields an empty
/// list, not an error — a brand-new project has no forms yet.
pub fn discover_forms(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let include = form_globset()?;
    let mut files = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        if include.is_match(relative) {
            files.push(relative.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Parse a definition file into its raw form.
pub fn parse_definition(path: &Path) -> Result<CategoryDef> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::InvalidArgument(format!(
        "invalid form definition file {}: {e}",
        path.display()
    )))
}

/// Derive the data file name for a form file: same base name, `.json` suffix.
pub fn data_file_name(form_file: &Path) -> PathBuf {
    let s = form_file.to_string_lossy();
    match s.strip_suffix(FORM_SUFFIX) {
        Some(base) => PathBuf::from(format!("{base}{DATA_SUFFIX}")),
        None => form_file.with_extension("json"),
    }
}

fn form_globset() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let glob = Glob::new(&format!("**/*{FORM_SUFFIX}"))
        .map_err(|e| Error::InvalidArgument(e.to_string()))?;
    builder.add(glob);
    builder
        .build()
        .map_err(|e| Error::InvalidArgument(e.to_string()))
}

/// TOML values carry into the registry as JSON, since the schema is served
/// to callers as JSON and stored data files are JSON.
fn toml_to_json(value: toml::Value) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}
