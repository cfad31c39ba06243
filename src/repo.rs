//! The content repository: category registry, per-category stores, and the
//! mutation service tying hooks, validation, persistence, and the derived
//! search index together.
//!
//! A [`Repository`] is constructed once at startup with explicit
//! dependencies (config, hook registry) and passed by reference to all
//! callers. Every mutation of a category runs under that category's lock, so
//! at most one upsert or delete is in flight per category — hook suspension
//! points cannot interleave two mutations.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hooks::HookRegistry;
use crate::loader::{self, CategoryRegistry};
use crate::models::{Category, CategorySchema, CategorySummary, ExternalItem, Item};
use crate::search::SearchIndex;
use crate::store::CategoryData;
use crate::transform::to_external;

/// Arguments to [`Repository::upsert`].
#[derive(Debug, Clone)]
pub struct UpsertRequest {
    /// Present for updates; absent to create a new item.
    pub item_id: Option<String>,
    pub category_id: String,
    /// Raw submitted payload; must be a JSON object.
    pub form_data: Value,
}

/// The content repository.
pub struct Repository {
    registry: CategoryRegistry,
    stores: HashMap<String, Mutex<CategoryData>>,
    search: SearchIndex,
    hook_timeout: Duration,
}

impl Repository {
    /// Load every category definition, hydrate its items, and build the
    /// derived search index.
    ///
    /// A failure loading one definition or data file is logged and skipped;
    /// one bad form never aborts the whole load. A missing forms directory
    /// yields an empty repository.
    pub async fn init(config: &Config, hooks: &HookRegistry) -> Result<Self> {
        let search = SearchIndex::connect(&config.db.path).await?;

        let mut registry = CategoryRegistry::new();
        let mut stores = HashMap::new();

        for form_file in loader::discover_forms(&config.forms.dir)? {
            let source = form_file.display().to_string();
            let def = match loader::parse_definition(&config.forms.dir.join(&form_file)) {
                Ok(def) => def,
                Err(err) => {
                    warn!(file = %source, error = %err, "could not load form");
                    continue;
                }
            };

            let category_id = match registry.load(def, &source, hooks) {
                Ok(category) => category.id.clone(),
                Err(err) => {
                    warn!(file = %source, error = %err, "could not load form");
                    continue;
                }
            };

            let data_file = config.data.dir.join(loader::data_file_name(&form_file));
            let store = CategoryData::hydrate(&category_id, data_file);

            let items: Vec<Item> = store.iter().cloned().collect();
            if let Err(err) = search.rebuild_category(&category_id, &items).await {
                warn!(category = %category_id, error = %err, "could not rebuild search index");
            }

            stores.insert(category_id, Mutex::new(store));
        }

        Ok(Self {
            registry,
            stores,
            search,
            hook_timeout: Duration::from_secs(config.hooks.timeout_secs),
        })
    }

    /// Create or update an item.
    ///
    /// Runs the category's hooks (bounded by the configured timeout),
    /// validates their output, assigns an id on create, applies the change to
    /// both index views, and flushes the category file. Success means "index
    /// updated and file durably rewritten"; any hook or validation failure
    /// leaves index and file untouched.
    pub async fn upsert(&self, request: UpsertRequest) -> Result<ExternalItem> {
        let category_id = request.category_id.to_lowercase();
        let category = self
            .registry
            .get(&category_id)
            .ok_or_else(|| Error::UnknownCategory(category_id.clone()))?;

        if !request.form_data.is_object() {
            return Err(Error::InvalidArgument(
                "\"form_data\" must be a valid object".to_string(),
            ));
        }

        let store = self
            .stores
            .get(&category_id)
            .ok_or_else(|| Error::UnknownCategory(category_id.clone()))?;

        // One in-flight mutation per category: the lock spans hook
        // invocation through flush.
        let mut store = store.lock().await;

        let body = self.build_body(category, &request.form_data).await?;

        let item_id = match request.item_id {
            Some(item_id) => {
                store.merge(&item_id, body)?;
                item_id
            }
            None => {
                let mut body = body;
                body.id = generate_item_id(category);
                let item_id = body.id.clone();
                store.push(body);
                item_id
            }
        };

        store.flush()?;
        self.reindex(&store).await;

        let external = to_external(store.get(&item_id)).expect("item just written");
        Ok(external)
    }

    /// List one category's items in order, in external shape.
    pub async fn list(&self, category_id: &str) -> Result<Vec<ExternalItem>> {
        let category_id = category_id.to_lowercase();
        let store = self
            .stores
            .get(&category_id)
            .ok_or_else(|| Error::UnknownCategory(category_id.clone()))?;

        let store = store.lock().await;
        Ok(store
            .iter()
            .filter_map(|item| to_external(Some(item)))
            .collect())
    }

    /// One summary per registered category, in registration order.
    pub async fn categories(&self) -> Vec<CategorySummary> {
        let mut summaries = Vec::with_capacity(self.registry.len());
        for category in self.registry.iter() {
            let count = match self.stores.get(&category.id) {
                Some(store) => store.lock().await.len(),
                None => 0,
            };
            summaries.push(CategorySummary {
                id: category.id.clone(),
                title: category.title.clone(),
                description: category.description.clone(),
                count,
            });
        }
        summaries
    }

    /// Schema bundle for a category, or `None` when the id is not
    /// registered — callers probe by id.
    pub fn schema(&self, category_id: &str) -> Option<CategorySchema> {
        let category = self.registry.get(&category_id.to_lowercase())?;
        Some(CategorySchema {
            json: category.json_schema.clone(),
            ui: category.ui_schema.clone(),
            title: category.title.clone(),
            description: category.description.clone(),
            umm_bloc: category.umm_bloc.clone(),
        })
    }

    /// Delete items by id, across categories.
    ///
    /// Item ids are not namespaced by category, so each id's owning category
    /// is located by scanning the category indexes. Every id must resolve
    /// before anything is mutated; each affected category is flushed once.
    pub async fn delete(&self, ids: &[String]) -> Result<()> {
        if ids.iter().any(|id| id.is_empty()) {
            return Err(Error::InvalidArgument(
                "expected an array of non-empty item ids to delete".to_string(),
            ));
        }

        // Resolve owners first so an unknown id fails the whole call with
        // no partial removal.
        let mut by_category: HashMap<String, Vec<String>> = HashMap::new();
        for id in ids {
            let mut owner = None;
            for (category_id, store) in &self.stores {
                if store.lock().await.contains(id) {
                    owner = Some(category_id.clone());
                    break;
                }
            }
            let owner = owner.ok_or_else(|| Error::UnknownItem {
                item_id: id.clone(),
                category_id: "<any>".to_string(),
            })?;
            by_category.entry(owner).or_default().push(id.clone());
        }

        for (category_id, item_ids) in &by_category {
            let store = self
                .stores
                .get(category_id)
                .ok_or_else(|| Error::UnknownCategory(category_id.clone()))?;
            let mut store = store.lock().await;
            for id in item_ids {
                store.remove(id);
            }
            store.flush()?;
        }

        self.search.delete_items(ids).await?;
        Ok(())
    }

    /// Fetch one item by id from the derived search index.
    pub async fn get_by_id(&self, item_id: &str) -> Result<Option<ExternalItem>> {
        self.search.get_by_id(item_id).await
    }

    /// Fetch every item carrying the given metadata tag from the derived
    /// search index.
    pub async fn get_by_metadata_tag(&self, tag: &str) -> Result<Vec<ExternalItem>> {
        self.search.get_by_metadata_tag(tag).await
    }

    pub async fn close(&self) {
        self.search.close().await;
    }

    /// Run the category's hooks over the form data and validate their
    /// output, producing the item body (without an id).
    async fn build_body(&self, category: &Category, form_data: &Value) -> Result<Item> {
        let data = self
            .run_hook(category, "compute_form_data", |h| h.compute_form_data(form_data))
            .await?
            .unwrap_or_else(|| form_data.clone());

        let metadata = self
            .run_hook(category, "compute_metadata", |h| h.compute_metadata(form_data))
            .await?;

        let preview = self
            .run_hook(category, "compute_preview_text", |h| {
                h.compute_preview_text(form_data)
            })
            .await?;

        let metadata: Vec<String> = match metadata {
            None => Vec::new(),
            Some(Value::Array(values)) => values
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s),
                    _ => Err(Error::InvalidHookResult {
                        hook: "compute_metadata",
                        expected: "an array of strings",
                    }),
                })
                .collect::<Result<_>>()?,
            Some(_) => {
                return Err(Error::InvalidHookResult {
                    hook: "compute_metadata",
                    expected: "an array of strings",
                })
            }
        };

        let preview_text = match preview {
            None => "No preview".to_string(),
            Some(Value::String(s)) => s,
            Some(_) => {
                return Err(Error::InvalidHookResult {
                    hook: "compute_preview_text",
                    expected: "a string",
                })
            }
        };

        if !data.is_object() {
            return Err(Error::InvalidHookResult {
                hook: "compute_form_data",
                expected: "a valid object",
            });
        }

        Ok(Item {
            id: String::new(),
            category_id: category.id.clone(),
            data,
            form_data: form_data.clone(),
            metadata,
            preview_text,
            created_by: "admin".to_string(),
            created_on: Utc::now(),
        })
    }

    async fn run_hook<'a, F, Fut>(
        &self,
        category: &'a Category,
        name: &'static str,
        invoke: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce(&'a dyn crate::hooks::CategoryHooks) -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<Option<Value>>>,
    {
        let hooks = match &category.hooks {
            Some(hooks) => hooks.as_ref(),
            None => return Ok(None),
        };

        let result = timeout(self.hook_timeout, invoke(hooks))
            .await
            .map_err(|_| Error::HookTimeout {
                hook: name,
                timeout_secs: self.hook_timeout.as_secs(),
            })?;

        result.map_err(|e| Error::HookFailed {
            hook: name,
            message: e.to_string(),
        })
    }

    /// Refresh the derived search index for one category. The files are
    /// canonical, so a reindex failure is logged rather than failing the
    /// mutation.
    async fn reindex(&self, store: &CategoryData) {
        let items: Vec<Item> = store.iter().cloned().collect();
        if let Err(err) = self.search.rebuild_category(store.category_id(), &items).await {
            warn!(
                category = %store.category_id(),
                error = %err,
                "could not refresh search index"
            );
        }
    }
}

/// Mint an item id: the category's `umm_bloc` (or its id) with any leading
/// `#` stripped, a dash, and six characters of a v4 UUID.
fn generate_item_id(category: &Category) -> String {
    let prefix = category
        .umm_bloc
        .as_deref()
        .unwrap_or(&category.id)
        .trim_start_matches('#');
    format!("{prefix}-{}", short_uid())
}

fn short_uid() -> String {
    Uuid::new_v4().simple().to_string().chars().take(6).collect()
}
