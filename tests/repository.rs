//! Library-level integration tests exercising the repository end to end:
//! definition loading, hydration, mutation, persistence, and lookups.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use formbox::config::Config;
use formbox::hooks::{CategoryHooks, HookRegistry};
use formbox::{Error, Repository, UpsertRequest};

const FAQ_FORM: &str = r#"
id = "faq"
title = "FAQ"
description = "Frequently asked questions"
hooks = "text"

[json_schema]
type = "object"

[json_schema.properties.text]
type = "string"
"#;

const TIP_FORM: &str = r##"
id = "tips"
title = "Tips"
umm_bloc = "#tip"

[json_schema]
type = "object"
"##;

fn setup(forms: &[(&str, &str)]) -> (TempDir, Config) {
    let tmp = TempDir::new().unwrap();
    let forms_dir = tmp.path().join("forms");
    fs::create_dir_all(&forms_dir).unwrap();
    for (name, content) in forms {
        fs::write(forms_dir.join(name), content).unwrap();
    }

    let config = Config {
        forms: forms_section(&forms_dir),
        data: data_section(&tmp.path().join("forms_data")),
        db: formbox::config::DbConfig {
            path: tmp.path().join("data").join("formbox.sqlite"),
        },
        hooks: formbox::config::HooksConfig { timeout_secs: 1 },
    };

    (tmp, config)
}

fn forms_section(dir: &Path) -> formbox::config::FormsConfig {
    formbox::config::FormsConfig {
        dir: dir.to_path_buf(),
    }
}

fn data_section(dir: &Path) -> formbox::config::DataConfig {
    formbox::config::DataConfig {
        dir: dir.to_path_buf(),
    }
}

async fn open(config: &Config) -> Repository {
    Repository::init(config, &HookRegistry::with_builtins())
        .await
        .unwrap()
}

#[tokio::test]
async fn loads_all_valid_definitions() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM), ("tips.form.toml", TIP_FORM)]);
    let repo = open(&config).await;

    let categories = repo.categories().await;
    assert_eq!(categories.len(), 2);
    assert!(repo.schema("faq").is_some());
    assert!(repo.schema("tips").is_some());
}

#[tokio::test]
async fn bad_definition_skipped_without_aborting_load() {
    let no_title = r#"
id = "broken"
[json_schema]
type = "object"
"#;
    let (_tmp, config) = setup(&[
        ("broken.form.toml", no_title),
        ("faq.form.toml", FAQ_FORM),
        ("notoml.form.toml", "= = ="),
    ]);
    let repo = open(&config).await;

    let categories = repo.categories().await;
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].id, "faq");
}

#[tokio::test]
async fn duplicate_lowercase_ids_keep_the_first() {
    let upper = FAQ_FORM.replace("id = \"faq\"", "id = \"FAQ\"");
    let (_tmp, config) = setup(&[("a.form.toml", FAQ_FORM), ("b.form.toml", &upper)]);
    let repo = open(&config).await;

    let categories = repo.categories().await;
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].id, "faq");
}

#[tokio::test]
async fn missing_forms_dir_yields_empty_repository() {
    let tmp = TempDir::new().unwrap();
    let config = Config {
        forms: forms_section(&tmp.path().join("does-not-exist")),
        data: data_section(&tmp.path().join("forms_data")),
        db: formbox::config::DbConfig {
            path: tmp.path().join("formbox.sqlite"),
        },
        hooks: formbox::config::HooksConfig { timeout_secs: 1 },
    };

    let repo = open(&config).await;
    assert!(repo.categories().await.is_empty());
}

#[tokio::test]
async fn create_generates_prefixed_ids() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);
    let repo = open(&config).await;

    let first = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "faq".to_string(),
            form_data: json!({"text": "one"}),
        })
        .await
        .unwrap();
    let second = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "FAQ".to_string(),
            form_data: json!({"text": "two"}),
        })
        .await
        .unwrap();

    assert!(first.id.starts_with("faq-"));
    assert_eq!(first.id.len(), "faq-".len() + 6);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn umm_bloc_prefix_has_hash_stripped() {
    let (_tmp, config) = setup(&[("tips.form.toml", TIP_FORM)]);
    let repo = open(&config).await;

    let item = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "tips".to_string(),
            form_data: json!({"note": "stretch"}),
        })
        .await
        .unwrap();
    assert!(item.id.starts_with("tip-"));
}

#[tokio::test]
async fn created_items_survive_a_reload() {
    let (tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);

    let created = {
        let repo = open(&config).await;
        let created = repo
            .upsert(UpsertRequest {
                item_id: None,
                category_id: "faq".to_string(),
                form_data: json!({"text": "persisted", "tags": ["keep"]}),
            })
            .await
            .unwrap();
        repo.close().await;
        created
    };

    // Data file exists next to the form's base name.
    assert!(tmp.path().join("forms_data").join("faq.json").exists());

    let repo = open(&config).await;
    let items = repo.list("faq").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0], created);
}

#[tokio::test]
async fn non_object_form_data_rejected_without_mutation() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);
    let repo = open(&config).await;

    let err = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "faq".to_string(),
            form_data: json!("not an object"),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(repo.list("faq").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_category_rejected() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);
    let repo = open(&config).await;

    let err = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "nope".to_string(),
            form_data: json!({}),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownCategory(id) if id == "nope"));

    let err = repo.list("nope").await.unwrap_err();
    assert!(matches!(err, Error::UnknownCategory(_)));
}

struct BadMetadataHooks;

#[async_trait]
impl CategoryHooks for BadMetadataHooks {
    fn name(&self) -> &str {
        "bad-metadata"
    }

    async fn compute_metadata(&self, _form_data: &Value) -> AnyResult<Option<Value>> {
        Ok(Some(Value::from("not an array")))
    }
}

#[tokio::test]
async fn string_metadata_hook_fails_with_no_file_write() {
    let form = r#"
id = "bad"
title = "Bad"
hooks = "bad-metadata"

[json_schema]
type = "object"
"#;
    let (tmp, config) = setup(&[("bad.form.toml", form)]);

    let mut hooks = HookRegistry::with_builtins();
    hooks.register(Arc::new(BadMetadataHooks));
    let repo = Repository::init(&config, &hooks).await.unwrap();

    let err = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "bad".to_string(),
            form_data: json!({"x": 1}),
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidHookResult {
            hook: "compute_metadata",
            ..
        }
    ));
    assert!(repo.list("bad").await.unwrap().is_empty());
    assert!(!tmp.path().join("forms_data").join("bad.json").exists());
}

struct SlowHooks;

#[async_trait]
impl CategoryHooks for SlowHooks {
    fn name(&self) -> &str {
        "slow"
    }

    async fn compute_preview_text(&self, _form_data: &Value) -> AnyResult<Option<Value>> {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        Ok(Some(Value::from("too late")))
    }
}

#[tokio::test]
async fn hung_hook_is_bounded_by_timeout() {
    let form = r#"
id = "slow"
title = "Slow"
hooks = "slow"

[json_schema]
type = "object"
"#;
    let (_tmp, config) = setup(&[("slow.form.toml", form)]);

    let mut hooks = HookRegistry::with_builtins();
    hooks.register(Arc::new(SlowHooks));
    let repo = Repository::init(&config, &hooks).await.unwrap();

    let err = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "slow".to_string(),
            form_data: json!({"x": 1}),
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::HookTimeout {
            hook: "compute_preview_text",
            ..
        }
    ));
    assert!(repo.list("slow").await.unwrap().is_empty());
}

#[tokio::test]
async fn update_merges_and_preserves_id() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);
    let repo = open(&config).await;

    let created = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "faq".to_string(),
            form_data: json!({"text": "before"}),
        })
        .await
        .unwrap();

    let updated = repo
        .upsert(UpsertRequest {
            item_id: Some(created.id.clone()),
            category_id: "faq".to_string(),
            form_data: json!({"text": "after"}),
        })
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.preview_text, "after");

    let items = repo.list("faq").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].form_data, json!({"text": "after"}));
}

#[tokio::test]
async fn update_of_missing_item_is_an_error() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);
    let repo = open(&config).await;

    let err = repo
        .upsert(UpsertRequest {
            item_id: Some("faq-missing".to_string()),
            category_id: "faq".to_string(),
            form_data: json!({"text": "x"}),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownItem { .. }));
    assert!(repo.list("faq").await.unwrap().is_empty());
}

#[tokio::test]
async fn list_of_empty_category_is_empty_not_an_error() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);
    let repo = open(&config).await;
    assert!(repo.list("faq").await.unwrap().is_empty());
}

#[tokio::test]
async fn schema_lookup_matches_registration() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM), ("tips.form.toml", TIP_FORM)]);
    let repo = open(&config).await;

    assert!(repo.schema("unknown").is_none());

    let schema = repo.schema("faq").unwrap();
    assert_eq!(schema.title, "FAQ");
    assert_eq!(
        schema.description.as_deref(),
        Some("Frequently asked questions")
    );
    assert_eq!(schema.json["type"], "object");
    assert_eq!(schema.json["properties"]["text"]["type"], "string");
    assert!(schema.ui.is_none());

    let tips = repo.schema("tips").unwrap();
    assert_eq!(tips.umm_bloc.as_deref(), Some("#tip"));
}

#[tokio::test]
async fn categories_report_counts() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM), ("tips.form.toml", TIP_FORM)]);
    let repo = open(&config).await;

    repo.upsert(UpsertRequest {
        item_id: None,
        category_id: "faq".to_string(),
        form_data: json!({"text": "a"}),
    })
    .await
    .unwrap();

    let summaries = repo.categories().await;
    let faq = summaries.iter().find(|s| s.id == "faq").unwrap();
    let tips = summaries.iter().find(|s| s.id == "tips").unwrap();
    assert_eq!(faq.count, 1);
    assert_eq!(tips.count, 0);
}

#[tokio::test]
async fn delete_spans_categories_and_persists() {
    let (tmp, config) = setup(&[("faq.form.toml", FAQ_FORM), ("tips.form.toml", TIP_FORM)]);
    let repo = open(&config).await;

    let faq_item = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "faq".to_string(),
            form_data: json!({"text": "a"}),
        })
        .await
        .unwrap();
    let tip_item = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "tips".to_string(),
            form_data: json!({"note": "b"}),
        })
        .await
        .unwrap();

    repo.delete(&[faq_item.id.clone(), tip_item.id.clone()])
        .await
        .unwrap();

    assert!(repo.list("faq").await.unwrap().is_empty());
    assert!(repo.list("tips").await.unwrap().is_empty());
    assert!(repo.get_by_id(&faq_item.id).await.unwrap().is_none());

    // Both backing files were rewritten as empty arrays.
    let faq_file = fs::read_to_string(tmp.path().join("forms_data").join("faq.json")).unwrap();
    assert_eq!(faq_file.trim(), "[]");
}

#[tokio::test]
async fn delete_of_unknown_id_fails_before_any_removal() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);
    let repo = open(&config).await;

    let item = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "faq".to_string(),
            form_data: json!({"text": "a"}),
        })
        .await
        .unwrap();

    let err = repo
        .delete(&[item.id.clone(), "nope".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownItem { .. }));

    // The known id must still be present.
    assert_eq!(repo.list("faq").await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_rejects_empty_ids() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);
    let repo = open(&config).await;

    let err = repo.delete(&[String::new()]).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn metadata_tag_lookup_uses_hook_tags() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);
    let repo = open(&config).await;

    repo.upsert(UpsertRequest {
        item_id: None,
        category_id: "faq".to_string(),
        form_data: json!({"text": "tagged", "tags": ["billing"]}),
    })
    .await
    .unwrap();
    repo.upsert(UpsertRequest {
        item_id: None,
        category_id: "faq".to_string(),
        form_data: json!({"text": "other", "tags": ["shipping"]}),
    })
    .await
    .unwrap();

    let hits = repo.get_by_metadata_tag("billing").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].preview_text, "tagged");

    assert!(repo.get_by_metadata_tag("nothing").await.unwrap().is_empty());
}

#[tokio::test]
async fn get_by_id_reflects_file_state_after_reload() {
    let (_tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);

    let id = {
        let repo = open(&config).await;
        let item = repo
            .upsert(UpsertRequest {
                item_id: None,
                category_id: "faq".to_string(),
                form_data: json!({"text": "find me"}),
            })
            .await
            .unwrap();
        repo.close().await;
        item.id
    };

    let repo = open(&config).await;
    let found = repo.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(found.preview_text, "find me");
}

#[tokio::test]
async fn malformed_data_file_leaves_category_empty_but_loaded() {
    let (tmp, config) = setup(&[("faq.form.toml", FAQ_FORM)]);
    let data_dir = tmp.path().join("forms_data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("faq.json"), r#"{"not": "an array"}"#).unwrap();

    let repo = open(&config).await;
    assert!(repo.list("faq").await.unwrap().is_empty());
    assert!(repo.schema("faq").is_some());
}

#[tokio::test]
async fn default_hook_results_fill_in() {
    // tips has no hook set: data = raw form data, metadata empty,
    // preview is the literal "No preview".
    let (_tmp, config) = setup(&[("tips.form.toml", TIP_FORM)]);
    let repo = open(&config).await;

    let item = repo
        .upsert(UpsertRequest {
            item_id: None,
            category_id: "tips".to_string(),
            form_data: json!({"note": "hydrate"}),
        })
        .await
        .unwrap();

    assert_eq!(item.data, json!({"note": "hydrate"}));
    assert!(item.metadata.is_empty());
    assert_eq!(item.preview_text, "No preview");
    assert_eq!(item.created_by, "admin");
}
