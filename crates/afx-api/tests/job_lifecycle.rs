//! Upload → process → worker → status → download, with a scripted transform tool.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use afx_storage::{FileRefs, HistorySink};
use afx_worker::{AudioProcessor, JobExecutor, WorkerConfig, WorkerResult};

use common::*;

struct RunningWorker {
    executor: Arc<JobExecutor>,
    handle: JoinHandle<WorkerResult<()>>,
}

impl RunningWorker {
    async fn stop(self) {
        self.executor.shutdown();
        self.handle.await.unwrap().unwrap();
    }
}

fn start_worker(app: &TestApp, tool: Arc<ScriptedTool>) -> RunningWorker {
    let processor = AudioProcessor::new(
        tool,
        app.blobs.clone(),
        FileRefs::new(app.store.clone()),
        app.history.clone(),
        Duration::from_secs(3600),
    );
    let config = WorkerConfig {
        consume_block: Duration::from_millis(20),
        ..Default::default()
    };
    let executor = Arc::new(JobExecutor::new(config, app.queue.clone(), processor));
    let handle = {
        let executor = executor.clone();
        tokio::spawn(async move { executor.run().await })
    };
    RunningWorker { executor, handle }
}

async fn submit(app: &TestApp, user: &str, effect: Value) -> String {
    let file_id = upload(app, user, "Night Drive.mp3", b"ID3original").await;
    let response = app.send(process_request(user, &file_id, effect)).await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["task_id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Poll `/status` until the job leaves `pending`.
async fn wait_for_status(app: &TestApp, task_id: &str) -> Value {
    for _ in 0..300 {
        let response = app.send(get(&format!("/status/{task_id}"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        if body["status"] != "pending" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} stayed pending");
}

#[tokio::test]
async fn test_successful_job_end_to_end() {
    let app = test_app(Duration::from_secs(3600));
    let tool = Arc::new(ScriptedTool::succeeding());
    let worker = start_worker(&app, tool.clone());

    let task_id = submit(&app, "alice", json!({"effect_type": "slowed", "reverb_amount": 30})).await;
    let status = wait_for_status(&app, &task_id).await;

    assert_eq!(status["status"], "success");
    let filename = status["filename"].as_str().unwrap();
    assert!(filename.starts_with("Night_Drive_"));
    assert!(filename.ends_with("_slowed_reverb.mp3"));
    let token = status["token"].as_str().unwrap();

    let response = app.send(get(&format!("/temp-download/{token}"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/mpeg");
    assert_eq!(
        response.headers()["content-disposition"],
        format!("attachment; filename=\"{filename}\"").as_str()
    );
    assert_eq!(body_bytes(response).await, PROCESSED_BYTES);

    // Tokens are reusable within their lifetime.
    let response = app.send(get(&format!("/temp-download/{token}"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The produced file is registered for its owner only.
    let response = app.send(get(&format!("/download/{filename}"), Some("alice"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.send(get(&format!("/download/{filename}"), Some("bob"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let history = app.history.list("alice").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].processed_filename, filename);
    assert_eq!(history[0].parameters["reverb_amount"], 30.0);

    let response = app
        .send(get(&format!("/history-download-link?filename={filename}"), Some("alice")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    worker.stop().await;
    assert_eq!(tool.calls(), 1);
    assert_eq!(app.queue.pending_len(), 0);
}

#[tokio::test]
async fn test_failed_job_reports_error_and_skips_history() {
    let app = test_app(Duration::from_secs(3600));
    let tool = Arc::new(ScriptedTool::failing("Error while filtering: Invalid argument"));
    let worker = start_worker(&app, tool.clone());

    let task_id = submit(&app, "alice", json!({"effect_type": "alleffects", "flanger_mix": 2})).await;
    let status = wait_for_status(&app, &task_id).await;

    assert_eq!(status["status"], "failed");
    let error = status["error"].as_str().unwrap();
    assert!(error.starts_with("Error processing file: "));
    assert!(error.contains("exit code 1"));
    assert!(error.contains("Invalid argument"));

    // Terminal state does not change on later polls.
    assert_eq!(wait_for_status(&app, &task_id).await, status);

    worker.stop().await;
    assert!(app.history.is_empty());
    assert_eq!(tool.calls(), 1);
}

#[tokio::test]
async fn test_download_token_expires() {
    let app = test_app(Duration::from_millis(150));
    let worker = start_worker(&app, Arc::new(ScriptedTool::succeeding()));

    let task_id = submit(&app, "alice", json!({"effect_type": "speedup", "speed": 1.5})).await;
    let status = wait_for_status(&app, &task_id).await;
    assert_eq!(status["status"], "success");
    let token = status["token"].as_str().unwrap();

    let response = app.send(get(&format!("/temp-download/{token}"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let response = app.send(get(&format!("/temp-download/{token}"), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    worker.stop().await;
}
