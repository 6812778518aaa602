use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use tasksync::create_app;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    // Held so the sqlite file and upload dir outlive the test.
    _dir: TempDir,
}

pub async fn spawn_app() -> Result<TestApp> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    std::env::set_var("UPLOAD_DIR", dir.path().join("uploads"));

    let app = create_app(pool.clone()).await?;
    Ok(TestApp { app, pool, _dir: dir })
}

impl TestApp {
    /// Send a JSON request, returning the status and parsed body. Pass an
    /// empty token to send the request unauthenticated.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        body_json: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if !token.is_empty() {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let request = match body_json {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok((status, value))
    }

    /// Register a user and return `(token, user_id)`.
    pub async fn register(&self, name: &str, email: &str, role: &str) -> Result<(String, String)> {
        let (status, body) = self
            .request(
                "POST",
                "/auth/register",
                "",
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": "password123",
                    "role": role,
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {body}");

        let token = body["token"].as_str().context("missing token")?.to_string();
        let user_id = body["user"]["id"].as_str().context("missing user id")?.to_string();
        Ok((token, user_id))
    }

    pub async fn create_team(&self, token: &str, name: &str) -> Result<String> {
        let (status, body) = self
            .request("POST", "/teams", token, Some(json!({ "name": name })))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create team failed: {body}");
        Ok(body["id"].as_str().context("missing team id")?.to_string())
    }

    pub async fn add_member(&self, token: &str, team_id: &str, user_id: &str) -> Result<StatusCode> {
        let (status, _) = self
            .request("POST", &format!("/teams/{team_id}/members/{user_id}"), token, None)
            .await?;
        Ok(status)
    }

    pub async fn create_project(&self, token: &str, name: &str, team_id: Option<&str>) -> Result<String> {
        let (status, body) = self
            .request(
                "POST",
                "/projects",
                token,
                Some(json!({ "name": name, "description": "test project", "team_id": team_id })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create project failed: {body}");
        Ok(body["id"].as_str().context("missing project id")?.to_string())
    }

    pub async fn create_task(&self, token: &str, project_id: &str, title: &str, status_str: &str) -> Result<String> {
        let (status, body) = self
            .request(
                "POST",
                &format!("/projects/{project_id}/tasks"),
                token,
                Some(json!({ "title": title, "status": status_str })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create task failed: {body}");
        Ok(body["id"].as_str().context("missing task id")?.to_string())
    }
}
