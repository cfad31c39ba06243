//! Per-category item index backed by a JSON array file.
//!
//! The in-memory index is the working copy and the file is the durable copy:
//! every mutation is followed by a full [`flush`](CategoryData::flush) before
//! it is reported successful. Two views are kept in step — an ordered item
//! sequence (listing order) and an id → position map (O(1) lookup).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Error, Result};
use crate::models::Item;

/// The in-memory index of one category's items plus its backing file.
#[derive(Debug)]
pub struct CategoryData {
    category_id: String,
    file: PathBuf,
    items: Vec<Item>,
    by_id: HashMap<String, usize>,
}

impl CategoryData {
    /// Build the index from the backing file.
    ///
    /// A missing file is a brand-new category, not an error. A file whose
    /// contents are not a JSON array is logged and ignored, leaving the
    /// category empty rather than failing the load.
    pub fn hydrate(category_id: &str, file: PathBuf) -> Self {
        let items = match read_items(&file) {
            Ok(items) => items,
            Err(err) => {
                warn!(file = %file.display(), error = %err, "error reading category data file");
                Vec::new()
            }
        };

        let mut data = Self {
            category_id: category_id.to_string(),
            file,
            items: Vec::new(),
            by_id: HashMap::new(),
        };
        for mut item in items {
            // Older data files predate the categoryId field.
            if item.category_id.is_empty() {
                item.category_id = data.category_id.clone();
            }
            data.push(item);
        }
        data
    }

    /// Serialize the ordered item sequence to pretty-printed JSON and
    /// atomically replace the backing file. Callers never observe a
    /// partially written file: the content goes to a temp path in the same
    /// directory and is renamed over the target.
    pub fn flush(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.items)?;

        let dir = self.file.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::fs::write(tmp.path(), json)?;
        tmp.persist(&self.file)
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.by_id.get(id).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Append a new item to both views. The caller guarantees id uniqueness
    /// (generated ids carry a random suffix; merges go through
    /// [`merge`](CategoryData::merge)).
    pub fn push(&mut self, item: Item) {
        self.by_id.insert(item.id.clone(), self.items.len());
        self.items.push(item);
    }

    /// Shallow-merge an update body into the existing item at `id`,
    /// preserving the item's id and position. Fails if no such item exists.
    pub fn merge(&mut self, id: &str, body: Item) -> Result<()> {
        let pos = *self.by_id.get(id).ok_or_else(|| Error::UnknownItem {
            item_id: id.to_string(),
            category_id: self.category_id.clone(),
        })?;

        let existing = &mut self.items[pos];
        existing.data = body.data;
        existing.form_data = body.form_data;
        existing.metadata = body.metadata;
        existing.preview_text = body.preview_text;
        existing.created_by = body.created_by;
        existing.created_on = body.created_on;
        Ok(())
    }

    /// Remove an item from both views, re-indexing the positions that
    /// shifted. Returns the removed item, or `None` if the id is unknown.
    pub fn remove(&mut self, id: &str) -> Option<Item> {
        let pos = self.by_id.remove(id)?;
        let item = self.items.remove(pos);
        for (_, p) in self.by_id.iter_mut() {
            if *p > pos {
                *p -= 1;
            }
        }
        Some(item)
    }
}

fn read_items(file: &Path) -> Result<Vec<Item>> {
    if !file.exists() {
        return Ok(Vec::new());
    }

    let json = std::fs::read_to_string(file)?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    if !value.is_array() {
        return Err(Error::MalformedDataFile {
            file: file.display().to_string(),
        });
    }

    Ok(serde_json::from_value(value)?)
}
