use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{PolicyEngine, SqlMembershipIndex};
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{attachments, auth, comments, health, projects, tasks, teams};
use crate::storage::FileStorage;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub authz: PolicyEngine,
    pub membership: Arc<SqlMembershipIndex>,
    pub storage: Arc<FileStorage>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        let membership = Arc::new(SqlMembershipIndex::new(pool.clone()));
        let authz = PolicyEngine::new(membership.clone());
        Self {
            pool,
            jwt: Arc::new(jwt),
            authz,
            membership,
            storage: Arc::new(FileStorage::from_env()),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let state = AppState::new(pool, jwt_config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let team_routes = Router::new()
        .route("/", get(teams::list_teams))
        .route("/", post(teams::create_team))
        .route("/:team_id", get(teams::get_team))
        .route("/:team_id", put(teams::update_team))
        .route("/:team_id", delete(teams::delete_team))
        .route("/:team_id/members", get(teams::list_members))
        .route("/:team_id/members/:user_id", post(teams::add_member))
        .route("/:team_id/members/:user_id", delete(teams::remove_member))
        .route("/:team_id/projects", get(projects::list_projects_by_team));

    let project_routes = Router::new()
        .route("/", post(projects::create_project))
        .route("/:project_id", get(projects::get_project))
        .route("/:project_id", put(projects::update_project))
        .route("/:project_id", delete(projects::delete_project))
        .route("/:project_id/members", get(projects::list_project_members))
        .route("/:project_id/tasks", get(tasks::list_tasks))
        .route("/:project_id/tasks", post(tasks::create_task));

    let task_routes = Router::new()
        .route("/:task_id", get(tasks::get_task))
        .route("/:task_id", put(tasks::update_task))
        .route("/:task_id", delete(tasks::delete_task))
        .route("/:task_id/assign/:user_id", post(tasks::assign_task))
        .route("/:task_id/comments", get(comments::list_comments))
        .route("/:task_id/comments", post(comments::create_comment))
        .route("/:task_id/attachments", get(attachments::list_attachments))
        .route("/:task_id/attachments", post(attachments::upload_attachment));

    let comment_routes = Router::new()
        .route("/:comment_id", put(comments::update_comment))
        .route("/:comment_id", delete(comments::delete_comment));

    let attachment_routes = Router::new()
        .route("/:attachment_id", get(attachments::get_attachment))
        .route("/:attachment_id", delete(attachments::delete_attachment));

    let router = Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/teams", team_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .nest("/attachments", attachment_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
