//! Tests del webhook.

mod helpers;

use axum::http::StatusCode;
use helpers::{COMMIT_B, app, app_with_hook};
use serde_json::{Value, json};

fn push(git_ref: &str, after: &str, added: &[&str], modified: &[&str], removed: &[&str]) -> String {
    json!({
        "ref": git_ref,
        "after": after,
        "repository": {"full_name": "acme/config"},
        "commits": [{"added": added, "modified": modified, "removed": removed}],
    })
    .to_string()
}

#[tokio::test]
async fn ping_answers_pong() {
    let app = app(&[]);

    let response = app.client.hook("/hook", "ping", r#"{"zen":"Keep it simple."}"#).await;

    response.assert_status(StatusCode::OK);
    let json: Value = response.json();
    assert_eq!(json["status"], "pong");
    assert!(json.get("report").is_none());
}

#[tokio::test]
async fn push_applies_changes() {
    let app = app(&[("app/port", "8080"), ("old", "x")]);
    app.client.post("/sync").await.assert_status(StatusCode::OK);
    app.repo
        .add_tree(COMMIT_B, &[("app/port", "9090\n"), ("app/host", "db")]);

    let body = push(
        "refs/heads/master",
        COMMIT_B,
        &["app/host"],
        &["app/port"],
        &["old"],
    );
    let response = app.client.hook("/hook", "push", body).await;

    response.assert_status(StatusCode::OK);
    let json: Value = response.json();
    assert_eq!(json["status"], "synced");
    assert_eq!(json["report"]["kind"], "incremental");
    assert_eq!(json["report"]["deleted"], json!(["old"]));

    assert_eq!(app.store.value("app/port").as_deref(), Some("9090"));
    assert_eq!(app.store.value("app/host").as_deref(), Some("db"));
    assert_eq!(app.store.value("old"), None);
}

#[tokio::test]
async fn push_to_other_branch_is_ignored() {
    let app = app(&[]);
    app.repo.add_tree(COMMIT_B, &[("a", "1")]);

    let body = push("refs/heads/develop", COMMIT_B, &["a"], &[], &[]);
    let response = app.client.hook("/hook", "push", body).await;

    response.assert_status(StatusCode::OK);
    let json: Value = response.json();
    assert_eq!(json["status"], "ignored");
    assert!(json["reason"].is_string());
    assert_eq!(app.store.value("a"), None);
}

#[tokio::test]
async fn unknown_event_is_ignored() {
    let response = app(&[]).client.hook("/hook", "issues", "{}").await;

    response.assert_status(StatusCode::OK);
    let json: Value = response.json();
    assert_eq!(json["status"], "ignored");
}

#[tokio::test]
async fn malformed_push_is_500() {
    let response = app(&[]).client.hook("/hook", "push", "not json").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = response.json();
    assert_eq!(json["error"], "Internal Server Error");
}

#[tokio::test]
async fn push_for_unknown_commit_is_500() {
    let app = app(&[("a", "1")]);

    let body = push("refs/heads/master", COMMIT_B, &["b"], &[], &[]);
    let response = app.client.hook("/hook", "push", body).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.store.value("b"), None);
}

#[tokio::test]
async fn hook_is_served_under_configured_path() {
    let app = app_with_hook(&[], "/github/events");

    app.client
        .hook("/github/events", "ping", "{}")
        .await
        .assert_status(StatusCode::OK);
    app.client
        .hook("/hook", "ping", "{}")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
