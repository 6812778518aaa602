mod common;

use anyhow::Result;
use axum::http::StatusCode;

#[tokio::test]
async fn progress_truncates_toward_zero() -> Result<()> {
    let app = common::spawn_app().await?;

    let (lead_token, _) = app.register("Lena", "lena@example.com", "team_lead").await?;
    let team_id = app.create_team(&lead_token, "Platform").await?;
    let project_id = app.create_project(&lead_token, "Rollout", Some(&team_id)).await?;

    app.create_task(&lead_token, &project_id, "one", "done").await?;
    app.create_task(&lead_token, &project_id, "two", "done").await?;
    app.create_task(&lead_token, &project_id, "three", "todo").await?;

    let (status, body) = app
        .request("GET", &format!("/projects/{project_id}"), &lead_token, None)
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["progress"], 66);

    Ok(())
}

#[tokio::test]
async fn empty_project_reports_zero_progress() -> Result<()> {
    let app = common::spawn_app().await?;

    let (lead_token, _) = app.register("Lena", "lena@example.com", "team_lead").await?;
    let project_id = app.create_project(&lead_token, "Empty", None).await?;

    let (status, body) = app
        .request("GET", &format!("/projects/{project_id}"), &lead_token, None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"], 0);

    Ok(())
}

#[tokio::test]
async fn team_project_listing_carries_progress() -> Result<()> {
    let app = common::spawn_app().await?;

    let (lead_token, _) = app.register("Lena", "lena@example.com", "team_lead").await?;
    let team_id = app.create_team(&lead_token, "Platform").await?;
    let project_id = app.create_project(&lead_token, "Rollout", Some(&team_id)).await?;

    app.create_task(&lead_token, &project_id, "one", "done").await?;
    app.create_task(&lead_token, &project_id, "two", "in_progress").await?;
    app.create_task(&lead_token, &project_id, "three", "in_progress").await?;
    app.create_task(&lead_token, &project_id, "four", "todo").await?;

    let (status, body) = app
        .request("GET", &format!("/teams/{team_id}/projects"), &lead_token, None)
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let listed = &body.as_array().unwrap()[0];
    assert_eq!(listed["id"], project_id.as_str());
    assert_eq!(listed["progress"], 25);

    Ok(())
}

#[tokio::test]
async fn progress_ignores_soft_deleted_tasks() -> Result<()> {
    let app = common::spawn_app().await?;

    let (lead_token, _) = app.register("Lena", "lena@example.com", "team_lead").await?;
    let project_id = app.create_project(&lead_token, "Rollout", None).await?;

    app.create_task(&lead_token, &project_id, "kept", "done").await?;
    let doomed = app.create_task(&lead_token, &project_id, "doomed", "todo").await?;

    let (status, _) = app
        .request("DELETE", &format!("/tasks/{doomed}"), &lead_token, None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app
        .request("GET", &format!("/projects/{project_id}"), &lead_token, None)
        .await?;
    assert_eq!(body["progress"], 100);

    Ok(())
}
