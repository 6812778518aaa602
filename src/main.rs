use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tasksync::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        tasksync::routes::health::health,
        tasksync::routes::auth::register,
        tasksync::routes::auth::login,
        tasksync::routes::auth::me,
        tasksync::routes::auth::logout,
        tasksync::routes::teams::list_teams,
        tasksync::routes::teams::create_team,
        tasksync::routes::teams::get_team,
        tasksync::routes::teams::update_team,
        tasksync::routes::teams::delete_team,
        tasksync::routes::teams::list_members,
        tasksync::routes::teams::add_member,
        tasksync::routes::teams::remove_member,
        tasksync::routes::projects::create_project,
        tasksync::routes::projects::get_project,
        tasksync::routes::projects::list_projects_by_team,
        tasksync::routes::projects::update_project,
        tasksync::routes::projects::delete_project,
        tasksync::routes::projects::list_project_members,
        tasksync::routes::tasks::create_task,
        tasksync::routes::tasks::list_tasks,
        tasksync::routes::tasks::get_task,
        tasksync::routes::tasks::update_task,
        tasksync::routes::tasks::delete_task,
        tasksync::routes::tasks::assign_task,
        tasksync::routes::comments::create_comment,
        tasksync::routes::comments::list_comments,
        tasksync::routes::comments::update_comment,
        tasksync::routes::comments::delete_comment,
        tasksync::routes::attachments::upload_attachment,
        tasksync::routes::attachments::list_attachments,
        tasksync::routes::attachments::get_attachment,
        tasksync::routes::attachments::delete_attachment,
    ),
    components(
        schemas(
            models::user::User,
            models::user::AuthResponse,
            models::user::LoginRequest,
            models::user::RegisterRequest,
            models::team::Team,
            models::team::TeamCreateRequest,
            models::team::TeamUpdateRequest,
            models::project::Project,
            models::project::ProjectCreateRequest,
            models::project::ProjectUpdateRequest,
            models::task::Task,
            models::task::TaskStatus,
            models::task::TaskCreateRequest,
            models::task::TaskUpdateRequest,
            models::comment::Comment,
            models::comment::CommentCreateRequest,
            models::comment::CommentUpdateRequest,
            models::attachment::Attachment,
            tasksync::authz::Role,
            tasksync::routes::health::HealthResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Teams", description = "Team and membership management"),
        (name = "Projects", description = "Project management"),
        (name = "Tasks", description = "Task management and assignment"),
        (name = "Comments", description = "Task comments"),
        (name = "Attachments", description = "Task attachments")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let pool = tasksync::db::init().await?;
    let app = tasksync::app::create_app(pool).await?;

    let app = app.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let port = std::env::var("APP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8000);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
