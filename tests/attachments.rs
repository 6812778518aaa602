mod common;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "X-BOUNDARY";

fn multipart_body(file_name: &str, content: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n").as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content.as_bytes());
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[tokio::test]
async fn upload_list_and_delete_an_attachment() -> Result<()> {
    let app = common::spawn_app().await?;

    let (lead_token, _) = app.register("Lena", "lena@example.com", "team_lead").await?;
    let project_id = app.create_project(&lead_token, "Rollout", None).await?;
    let task_id = app.create_task(&lead_token, &project_id, "Ship it", "todo").await?;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/tasks/{task_id}/attachments"))
        .header("authorization", format!("Bearer {lead_token}"))
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body("notes.txt", "release checklist")))?;

    let response = app.app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await?;
    let uploaded: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(uploaded["file_name"], "notes.txt");
    let attachment_id = uploaded["id"].as_str().unwrap().to_string();

    // The stored file exists at the returned reference.
    let file_url = uploaded["file_url"].as_str().unwrap();
    let stored = std::fs::read_to_string(file_url)?;
    assert_eq!(stored, "release checklist");

    let (status, body) = app
        .request("GET", &format!("/tasks/{task_id}/attachments"), &lead_token, None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1), "{body}");

    let (status, _) = app
        .request("DELETE", &format!("/attachments/{attachment_id}"), &lead_token, None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request("GET", &format!("/attachments/{attachment_id}"), &lead_token, None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn upload_without_a_file_part_is_rejected() -> Result<()> {
    let app = common::spawn_app().await?;

    let (lead_token, _) = app.register("Lena", "lena@example.com", "team_lead").await?;
    let project_id = app.create_project(&lead_token, "Rollout", None).await?;
    let task_id = app.create_task(&lead_token, &project_id, "Ship it", "todo").await?;

    let empty = format!("--{BOUNDARY}--\r\n");
    let request = Request::builder()
        .method("POST")
        .uri(format!("/tasks/{task_id}/attachments"))
        .header("authorization", format!("Bearer {lead_token}"))
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(empty))?;

    let response = app.app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn attachments_on_team_tasks_are_member_only_reads() -> Result<()> {
    let app = common::spawn_app().await?;

    let (lead_token, _) = app.register("Lena", "lena@example.com", "team_lead").await?;
    let (outsider_token, _) = app.register("Otto", "otto@example.com", "user").await?;

    let team_id = app.create_team(&lead_token, "Platform").await?;
    let project_id = app.create_project(&lead_token, "Rollout", Some(&team_id)).await?;
    let task_id = app.create_task(&lead_token, &project_id, "Ship it", "todo").await?;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/tasks/{task_id}/attachments"))
        .header("authorization", format!("Bearer {lead_token}"))
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body("secret.txt", "internal")))?;
    let response = app.app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await?;
    let uploaded: Value = serde_json::from_slice(&bytes)?;
    let attachment_id = uploaded["id"].as_str().unwrap();

    let (status, _) = app
        .request("GET", &format!("/attachments/{attachment_id}"), &outsider_token, None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}
