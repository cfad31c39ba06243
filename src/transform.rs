//! Internal-to-external item mapping.
//!
//! Pure and total: `None` passes through (the not-found case of lookups),
//! empty metadata strings are dropped as a defense against malformed stored
//! data, and the snake_case storage fields are renamed to the camelCase
//! external shape. The input is never mutated.

use crate::models::{ExternalItem, Item};

/// Map a stored item to its externally visible shape.
pub fn to_external(item: Option<&Item>) -> Option<ExternalItem> {
    let item = item?;

    let metadata: Vec<String> = item
        .metadata
        .iter()
        .filter(|m| !m.is_empty())
        .cloned()
        .collect();

    Some(ExternalItem {
        id: item.id.clone(),
        category_id: item.category_id.clone(),
        data: item.data.clone(),
        form_data: item.form_data.clone(),
        metadata,
        preview_text: item.preview_text.clone(),
        created_by: item.created_by.clone(),
        created_on: item.created_on,
    })
}
