//! Service-level tests: config lifecycle, template publication and the
//! resolution entry points, driven through an in-memory store.

mod common;

use assert_matches::assert_matches;
use serde_json::{json, Value};

use common::{news_descriptor, seeded_service, MemoryStore, NEWS_SVG};
use lowerthird_core::dto::{CreateConfigInput, PublishTemplateInput, UpdateConfigInput};
use lowerthird_core::preset::TimingRule;
use lowerthird_core::{Caller, CoreError, LowerThirdService};

const OWNER: Caller = Caller {
    user_id: 10,
    is_admin: false,
};
const STRANGER: Caller = Caller {
    user_id: 11,
    is_admin: false,
};
const ADMIN: Caller = Caller {
    user_id: 1,
    is_admin: true,
};

fn create_input(key: &str, params: Value) -> CreateConfigInput {
    CreateConfigInput {
        name: " Evening news ".into(),
        template_key: key.into(),
        template_version: 1,
        params,
        timing_rule: None,
        timing_seconds: None,
    }
}

// ---------------------------------------------------------------------------
// Config creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_config_persists_resolved_params() {
    let (service, store) = seeded_service();

    let dto = service
        .create_config(&create_input("news", json!({ "title": "Ada", "extra": "ignored" })), OWNER)
        .await
        .unwrap();

    assert_eq!(dto.name, "Evening news");
    assert_eq!(dto.timing_rule, TimingRule::FirstOnly);
    assert_eq!(dto.timing_seconds, Some(10));
    assert_eq!(
        store.config(dto.id).unwrap().params_json,
        json!({ "title": "Ada", "accent": "#336699" })
    );
}

#[tokio::test]
async fn create_config_with_entire_rule_drops_seconds() {
    let (service, _) = seeded_service();
    let mut input = create_input("news", Value::Null);
    input.timing_rule = Some("till_end".into());
    input.timing_seconds = Some(15);

    let dto = service.create_config(&input, OWNER).await.unwrap();
    assert_eq!(dto.timing_rule, TimingRule::Entire);
    assert_eq!(dto.timing_seconds, None);
}

#[tokio::test]
async fn create_config_rejects_bad_params_before_writing() {
    let (service, store) = seeded_service();

    let err = service
        .create_config(&create_input("news", json!({ "accent": "red" })), OWNER)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_color");

    let err = service
        .create_config(&create_input("news", json!({ "title": "x".repeat(21) })), OWNER)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_text");

    assert_eq!(store.config_count(), 0);
}

#[tokio::test]
async fn create_config_fails_fast_when_a_selector_matches_nothing() {
    let store = MemoryStore::default();
    // Seeded directly so the broken pairing bypasses publication checks.
    store.seed_template("broken", 1, "<svg><text id=\"other\"/></svg>", news_descriptor());
    let service = LowerThirdService::new(store.clone());

    let err = service
        .create_config(&create_input("broken", Value::Null), OWNER)
        .await
        .unwrap_err();
    assert_matches!(err, CoreError::InvalidDescriptor(msg) if msg.contains("#label"));
    assert_eq!(store.config_count(), 0);
}

#[tokio::test]
async fn create_config_requires_a_live_template() {
    let (service, store) = seeded_service();

    let err = service
        .create_config(&create_input("missing", Value::Null), OWNER)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");

    store.archive_template_now("news", 1);
    let err = service
        .create_config(&create_input("news", Value::Null), OWNER)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn create_config_validates_request_fields() {
    let (service, _) = seeded_service();

    let mut input = create_input("news", Value::Null);
    input.name = "  ".into();
    assert_matches!(
        service.create_config(&input, OWNER).await,
        Err(CoreError::Validation { code: "invalid_name", .. })
    );

    let mut input = create_input("news", Value::Null);
    input.timing_seconds = Some(7);
    assert_matches!(
        service.create_config(&input, OWNER).await,
        Err(CoreError::Validation { code: "invalid_timing_seconds", .. })
    );

    let mut input = create_input("news", Value::Null);
    input.template_version = 0;
    assert_matches!(
        service.create_config(&input, OWNER).await,
        Err(CoreError::Validation { code: "invalid_template_version", .. })
    );

    assert_matches!(
        service.create_config(&create_input("news", json!("x")), OWNER).await,
        Err(CoreError::Validation { code: "invalid_params", .. })
    );
}

#[tokio::test]
async fn anonymous_callers_are_forbidden() {
    let (service, _) = seeded_service();
    let anonymous = Caller::user(0);
    assert_matches!(
        service.create_config(&create_input("news", Value::Null), anonymous).await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        service.list_configs(anonymous, false, None).await,
        Err(CoreError::Forbidden(_))
    );
}

// ---------------------------------------------------------------------------
// Config access, update and archive
// ---------------------------------------------------------------------------

#[tokio::test]
async fn configs_are_private_to_owner_and_admins() {
    let (service, _) = seeded_service();
    let dto = service
        .create_config(&create_input("news", Value::Null), OWNER)
        .await
        .unwrap();

    assert!(service.get_config(dto.id, OWNER).await.is_ok());
    assert!(service.get_config(dto.id, ADMIN).await.is_ok());
    assert_matches!(service.get_config(dto.id, STRANGER).await, Err(CoreError::Forbidden(_)));
    assert_matches!(
        service.get_config(999, OWNER).await,
        Err(CoreError::NotFound { .. })
    );

    assert_eq!(service.list_configs(OWNER, false, None).await.unwrap().len(), 1);
    assert!(service.list_configs(STRANGER, false, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_keeps_unspecified_fields_and_revalidates() {
    let (service, store) = seeded_service();
    let mut input = create_input("news", json!({ "title": "Ada" }));
    input.timing_seconds = Some(20);
    let created = service.create_config(&input, OWNER).await.unwrap();

    let patch = UpdateConfigInput {
        params: Some(json!({ "accent": "#abcdef" })),
        ..Default::default()
    };
    let updated = service.update_config(created.id, &patch, OWNER).await.unwrap();
    assert_eq!(updated.name, "Evening news");
    assert_eq!(updated.timing_seconds, Some(20));
    // Replaced params resolve against defaults again.
    assert_eq!(updated.params["title"], "Name");
    assert_eq!(updated.params["accent"], "#abcdef");

    let bad = UpdateConfigInput {
        params: Some(json!({ "accent": "blue" })),
        ..Default::default()
    };
    assert_matches!(
        service.update_config(created.id, &bad, OWNER).await,
        Err(CoreError::InvalidColor(_))
    );
    assert_eq!(
        store.config(created.id).unwrap().params_json["accent"],
        "#abcdef"
    );
}

#[tokio::test]
async fn update_timing_rule_resets_seconds() {
    let (service, _) = seeded_service();
    let mut input = create_input("news", Value::Null);
    input.timing_seconds = Some(5);
    let created = service.create_config(&input, OWNER).await.unwrap();

    let to_entire = UpdateConfigInput {
        timing_rule: Some("entire".into()),
        ..Default::default()
    };
    let updated = service.update_config(created.id, &to_entire, OWNER).await.unwrap();
    assert_eq!(updated.timing_rule, TimingRule::Entire);
    assert_eq!(updated.timing_seconds, None);

    let back = UpdateConfigInput {
        timing_rule: Some("first".into()),
        ..Default::default()
    };
    let updated = service.update_config(created.id, &back, OWNER).await.unwrap();
    assert_eq!(updated.timing_seconds, Some(10));
}

#[tokio::test]
async fn archived_configs_cannot_be_updated_or_resolved() {
    let (service, _) = seeded_service();
    let created = service
        .create_config(&create_input("news", Value::Null), OWNER)
        .await
        .unwrap();

    assert_matches!(
        service.archive_config(created.id, STRANGER).await,
        Err(CoreError::Forbidden(_))
    );
    service.archive_config(created.id, OWNER).await.unwrap();
    // Idempotent.
    service.archive_config(created.id, OWNER).await.unwrap();

    let patch = UpdateConfigInput {
        name: Some("Renamed".into()),
        ..Default::default()
    };
    assert_matches!(
        service.update_config(created.id, &patch, OWNER).await,
        Err(CoreError::Archived { .. })
    );
    assert_matches!(
        service.resolve_for_saved_config(created.id, OWNER).await,
        Err(CoreError::Archived { .. })
    );

    assert!(service.list_configs(OWNER, false, None).await.unwrap().is_empty());
    assert_eq!(service.list_configs(OWNER, true, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_limit_is_clamped() {
    let (service, _) = seeded_service();
    for _ in 0..3 {
        service
            .create_config(&create_input("news", Value::Null), OWNER)
            .await
            .unwrap();
    }
    assert_eq!(service.list_configs(OWNER, false, Some(0)).await.unwrap().len(), 1);
    assert_eq!(service.list_configs(OWNER, false, Some(2)).await.unwrap().len(), 2);
    assert_eq!(service.list_configs(OWNER, false, None).await.unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn saved_config_resolves_for_owner() {
    let (service, _) = seeded_service();
    let created = service
        .create_config(&create_input("news", json!({ "title": "Ada" })), OWNER)
        .await
        .unwrap();

    let resolved = service.resolve_for_saved_config(created.id, OWNER).await.unwrap();
    assert_eq!(resolved.template_key, "news");
    assert_eq!(resolved.template_version, 1);
    assert!(resolved.svg.contains(r#"<text id="label">Ada</text>"#));
    assert!(resolved.svg.contains(r##"<rect class="bar" fill="#336699"/>"##));

    assert_matches!(
        service.resolve_for_saved_config(created.id, STRANGER).await,
        Err(CoreError::Forbidden(_))
    );
}

#[tokio::test]
async fn saved_config_survives_template_archival() {
    let (service, store) = seeded_service();
    let created = service
        .create_config(&create_input("legacy", json!({ "name": "Grace" })), OWNER)
        .await
        .unwrap();
    store.archive_template_now("legacy", 1);

    let resolved = service.resolve_for_saved_config(created.id, OWNER).await.unwrap();
    assert!(resolved.svg.contains(r#"<text id="name">Grace</text>"#));
    assert!(resolved.svg.contains(r##"<stop id="g1" offset="0" stop-color="#101010"/>"##));

    // Preview of the archived version is refused; snapshots still render.
    assert_matches!(
        service
            .resolve_for_explicit_template("legacy", 1, &Value::Null, OWNER)
            .await,
        Err(CoreError::NotFound { .. })
    );
    let snapshot = service
        .resolve_from_snapshot("legacy", 1, &json!({ "name": "Grace" }))
        .await
        .unwrap();
    assert_eq!(snapshot.svg, resolved.svg);
}

#[tokio::test]
async fn stale_stored_params_are_revalidated_on_resolve() {
    let (service, store) = seeded_service();
    let created = service
        .create_config(&create_input("news", Value::Null), OWNER)
        .await
        .unwrap();
    store.set_config_params(created.id, json!({ "accent": "not-a-color" }));

    assert_matches!(
        service.resolve_for_saved_config(created.id, OWNER).await,
        Err(CoreError::InvalidColor(_))
    );
}

#[tokio::test]
async fn preview_matches_snapshot_render() {
    let (service, _) = seeded_service();
    let params = json!({ "title": "Preview", "accent": "#FFAA00" });

    let preview = service
        .resolve_for_explicit_template(" news ", 1, &params, OWNER)
        .await
        .unwrap();
    let snapshot = service.resolve_from_snapshot("news", 1, &params).await.unwrap();

    assert_eq!(preview, snapshot);
    assert_eq!(preview.params["accent"], "#FFAA00");
    assert_matches!(
        service.resolve_for_explicit_template("news", 2, &params, OWNER).await,
        Err(CoreError::NotFound { .. })
    );
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn publish_input(svg: &str) -> PublishTemplateInput {
    PublishTemplateInput {
        template_key: "news".into(),
        label: "News bar".into(),
        category: Some(" broadcast ".into()),
        svg_markup: svg.into(),
        descriptor: news_descriptor(),
    }
}

#[tokio::test]
async fn publish_mints_next_version_with_cleaned_markup() {
    let (service, store) = seeded_service();
    let raw = format!("<?xml version=\"1.0\"?>\n<!-- editor -->\n{NEWS_SVG}");

    let dto = service.publish_template(&publish_input(&raw), ADMIN).await.unwrap();
    assert_eq!(dto.version, 2);
    assert_eq!(dto.category.as_deref(), Some("broadcast"));

    let stored = store.template_count();
    assert_eq!(stored, 3);
    let resolved = service
        .resolve_from_snapshot("news", 2, &Value::Null)
        .await
        .unwrap();
    assert!(resolved.svg.starts_with("<svg"));
}

#[tokio::test]
async fn publish_is_admin_only_and_validates_the_draft() {
    let (service, store) = seeded_service();

    assert_matches!(
        service.publish_template(&publish_input(NEWS_SVG), OWNER).await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        service
            .publish_template(&publish_input("<svg><script/></svg>"), ADMIN)
            .await,
        Err(CoreError::InvalidSvg(_))
    );
    assert_matches!(
        service
            .publish_template(&publish_input("<svg><rect class=\"bar\"/></svg>"), ADMIN)
            .await,
        Err(CoreError::InvalidDescriptor(_))
    );

    let mut input = publish_input(NEWS_SVG);
    input.label = " ".into();
    assert_matches!(
        service.publish_template(&input, ADMIN).await,
        Err(CoreError::Validation { code: "invalid_label", .. })
    );

    assert_eq!(store.template_count(), 2);
}

#[tokio::test]
async fn archived_templates_are_listed_only_for_admins() {
    let (service, _) = seeded_service();
    service.archive_template("legacy", 1, ADMIN).await.unwrap();

    let visible = service.list_templates(OWNER, true).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].template_key, "news");

    let all = service.list_templates(ADMIN, true).await.unwrap();
    assert_eq!(
        all.iter().map(|t| t.template_key.as_str()).collect::<Vec<_>>(),
        ["legacy", "news"]
    );

    assert_matches!(
        service.archive_template("legacy", 1, OWNER).await,
        Err(CoreError::Forbidden(_))
    );
    assert_matches!(
        service.archive_template("legacy", 9, ADMIN).await,
        Err(CoreError::NotFound { .. })
    );
}
