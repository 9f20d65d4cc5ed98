use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use susvibes_board::cli::{BoardConfig, SourceConfig};
use susvibes_board::web::{build_router, AppState};

fn write_json(root: &Path, rel: &str, value: Value) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec(&value).unwrap()).unwrap();
}

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write_json(
        root,
        "submissions/manifest.json",
        json!({ "submissions": ["gpt-5_openhands", "o3_custom"] }),
    );
    write_json(
        root,
        "submissions/gpt-5_openhands/submission.json",
        json!({
            "model_name": "GPT-5",
            "trajectories_available": true,
            "results": { "python": { "func_pass_1": 55.0, "sec_pass_1": 14.0 } },
            "methodology": { "agent_framework": "openhands" }
        }),
    );
    write_json(
        root,
        "submissions/o3_custom/submission.json",
        json!({
            "model_name": "o3",
            "submission_type": "custom",
            "is_new": true,
            "results": { "python": { "func_pass_1": 48.0, "sec_pass_1": 20.0 } }
        }),
    );
    write_json(
        root,
        "submissions/gpt-5_openhands/trajectories/gpt-5_openhands.trials.json",
        json!([{
            "instance_id": "requests__requests-7",
            "trajectory": [
                { "type": "assistant", "message": { "content": "a" } },
                { "type": "user", "message": { "content": "b" } },
                { "type": "assistant", "message": { "content": "c" } }
            ]
        }]),
    );
    write_json(
        root,
        "submissions/gpt-5_openhands/trajectories/normalized.json",
        normalized_document(),
    );
    std::fs::create_dir_all(root.join("datasets")).unwrap();
    std::fs::write(
        root.join("datasets/susvibes_dataset.jsonl"),
        r#"{"instance_id": "requests__requests-7", "project": "requests"}"#,
    )
    .unwrap();

    dir
}

fn normalized_document() -> Value {
    json!({
        "simulations": [{
            "id": "x_trial_1",
            "task_id": "x",
            "trial": null,
            "agent_cost": "0.3",
            "messages": [{ "role": "user", "content": "hi" }]
        }],
        "tasks": [{ "id": "x" }]
    })
}

fn app(root: &Path) -> Router {
    let config = BoardConfig {
        source: SourceConfig::Fs {
            root: root.to_path_buf(),
        },
        ..Default::default()
    };
    let source = config.source.clone().into_source();
    build_router(Arc::new(AppState::new(config, source)))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let site = site();
    let (status, body) = get(app(site.path()), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_leaderboard_filters() {
    let site = site();

    let (status, body) = get(app(site.path()), "/api/leaderboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filter_selected"], true);
    assert_eq!(body["rows"].as_array().unwrap().len(), 1);

    let (_, body) = get(
        app(site.path()),
        "/api/leaderboard?include_custom=true&sort=secpass1",
    )
    .await;
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["model_name"], "o3");
    assert_eq!(rows[0]["medal"], "gold");

    let (_, body) = get(
        app(site.path()),
        "/api/leaderboard?include_standard=false&include_custom=false",
    )
    .await;
    assert_eq!(body["filter_selected"], false);
    assert!(body["rows"].as_array().unwrap().is_empty());

    let (status, body) = get(app(site.path()), "/api/leaderboard?sort=nonsense").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_chart() {
    let site = site();
    let (status, body) = get(app(site.path()), "/api/leaderboard/chart?include_custom=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["points"].as_array().unwrap().len(), 2);
    assert_eq!(body["frameworks"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_submissions_and_trajectories() {
    let site = site();

    let (_, body) = get(app(site.path()), "/api/submissions").await;
    let list = body.as_array().unwrap();
    // new submissions first
    assert_eq!(list[0]["submission_dir"], "o3_custom");

    let (status, body) = get(app(site.path()), "/api/submissions/GPT-5::openhands").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["submission_dir"], "gpt-5_openhands");

    let (status, body) = get(app(site.path()), "/api/submissions/nobody::unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nobody"));

    let (_, body) = get(
        app(site.path()),
        "/api/submissions/GPT-5::openhands/trajectories",
    )
    .await;
    assert_eq!(body[0]["file"], "gpt-5_openhands.trials.json");

    let (_, body) = get(app(site.path()), "/api/submissions/o3::unknown/trajectories").await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_trajectory_and_simulation_pages() {
    let site = site();
    let base = "/api/trajectories/gpt-5_openhands/gpt-5_openhands.trials.json";

    let (status, body) = get(app(site.path()), base).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["simulations"][0]["id"], "requests__requests-7_trial_1");

    let (status, body) = get(
        app(site.path()),
        &format!("{}/simulations/requests__requests-7_trial_1?page=2&page_size=2", base),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"]["total"], 3);
    assert_eq!(body["messages"]["total_pages"], 2);
    assert_eq!(body["messages"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["messages"]["items"][0]["content"], "c");
    assert_eq!(body["correct"], false);

    let (status, _) = get(
        app(site.path()),
        &format!("{}/simulations/requests__requests-7_trial_1?page=0", base),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(site.path()), &format!("{}/simulations/nope", base)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(
        app(site.path()),
        "/api/trajectories/gpt-5_openhands/absent.trials.json",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn test_normalized_document_served_verbatim() {
    let site = site();
    let base = "/api/trajectories/gpt-5_openhands/normalized.json";

    let (status, body) = get(app(site.path()), base).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, normalized_document());

    let (status, body) = get(app(site.path()), &format!("{}/simulations/x_trial_1", base)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trial"], 1);
    assert_eq!(body["messages"]["items"][0]["content"], "hi");
}

#[tokio::test]
async fn test_tasks_and_refresh() {
    let site = site();

    let (status, body) = get(app(site.path()), "/api/tasks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let response = app(site.path())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["submissions"], 2);
    assert_eq!(body["dataset_instances"], 1);
}

#[tokio::test]
async fn test_missing_manifest_is_bad_gateway() {
    let empty = tempfile::tempdir().unwrap();
    let (status, body) = get(app(empty.path()), "/api/leaderboard").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["retryable"], true);
}
