use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Operation, Resource};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::team::{DbTeam, Team, TeamCreateRequest, TeamUpdateRequest};
use crate::models::user::{DbUser, User};
use crate::routes::auth::fetch_user_by_id;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/teams",
    tag = "Teams",
    responses((status = 200, description = "List teams visible to the caller", body = [Team]))
)]
pub async fn list_teams(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Team>>> {
    let rows = sqlx::query_as::<_, DbTeam>(
        "SELECT id, name, created_at, updated_at, deleted_at FROM teams WHERE deleted_at IS NULL ORDER BY created_at DESC",
    )
    .fetch_all(&state.pool)
    .await?;

    let principal = auth.principal();
    let rows = state
        .authz
        .filter(&principal, rows, |team| Resource::Team { id: team.id })
        .await?;

    let teams: Vec<Team> = rows
        .into_iter()
        .map(Team::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(teams))
}

#[utoipa::path(
    post,
    path = "/teams",
    tag = "Teams",
    request_body = TeamCreateRequest,
    responses((status = 201, description = "Team created", body = Team))
)]
pub async fn create_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<TeamCreateRequest>,
) -> AppResult<(StatusCode, Json<Team>)> {
    let team_id = Uuid::new_v4();
    state
        .authz
        .require(&auth.principal(), Operation::Create, &Resource::Team { id: team_id })
        .await?;

    let now = utc_now();
    sqlx::query("INSERT INTO teams (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(team_id)
        .bind(&payload.name)
        .bind(now)
        .bind(now)
        .execute(&state.pool)
        .await?;

    let team: Team = fetch_team(&state.pool, team_id).await?.try_into()?;
    Ok((StatusCode::CREATED, Json(team)))
}

#[utoipa::path(
    get,
    path = "/teams/{team_id}",
    tag = "Teams",
    params(("team_id" = Uuid, Path, description = "Team id")),
    responses((status = 200, description = "Team detail", body = Team))
)]
pub async fn get_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
) -> AppResult<Json<Team>> {
    let team = fetch_team(&state.pool, team_id).await?;
    state
        .authz
        .require(&auth.principal(), Operation::Read, &Resource::Team { id: team.id })
        .await?;

    Ok(Json(team.try_into()?))
}

#[utoipa::path(
    put,
    path = "/teams/{team_id}",
    tag = "Teams",
    params(("team_id" = Uuid, Path, description = "Team id")),
    request_body = TeamUpdateRequest,
    responses((status = 200, description = "Team updated", body = Team))
)]
pub async fn update_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
    Json(payload): Json<TeamUpdateRequest>,
) -> AppResult<Json<Team>> {
    let mut team = fetch_team(&state.pool, team_id).await?;
    state
        .authz
        .require(&auth.principal(), Operation::Update, &Resource::Team { id: team.id })
        .await?;

    if let Some(name) = payload.name {
        team.name = name;
    }

    let now = utc_now();
    sqlx::query("UPDATE teams SET name = ?, updated_at = ? WHERE id = ?")
        .bind(&team.name)
        .bind(now)
        .bind(team.id)
        .execute(&state.pool)
        .await?;

    team.updated_at = now;
    Ok(Json(team.try_into()?))
}

#[utoipa::path(
    delete,
    path = "/teams/{team_id}",
    tag = "Teams",
    params(("team_id" = Uuid, Path, description = "Team id")),
    responses((status = 204, description = "Team soft deleted"))
)]
pub async fn delete_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let team = fetch_team(&state.pool, team_id).await?;
    state
        .authz
        .require(&auth.principal(), Operation::Delete, &Resource::Team { id: team.id })
        .await?;

    let now = utc_now();
    sqlx::query("UPDATE teams SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(team_id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/teams/{team_id}/members",
    tag = "Teams",
    params(("team_id" = Uuid, Path, description = "Team id")),
    responses((status = 200, description = "Team members", body = [User]))
)]
pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
) -> AppResult<Json<Vec<User>>> {
    let team = fetch_team(&state.pool, team_id).await?;
    state
        .authz
        .require(&auth.principal(), Operation::Read, &Resource::Team { id: team.id })
        .await?;

    let members = fetch_members(&state.pool, team_id).await?;
    Ok(Json(members))
}

#[utoipa::path(
    post,
    path = "/teams/{team_id}/members/{user_id}",
    tag = "Teams",
    params(
        ("team_id" = Uuid, Path, description = "Team id"),
        ("user_id" = Uuid, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Member added", body = [User]),
        (status = 409, description = "User is already a member")
    )
)]
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((team_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<User>>> {
    let team = fetch_team(&state.pool, team_id).await?;
    state
        .authz
        .require(&auth.principal(), Operation::AddMember, &Resource::Team { id: team.id })
        .await?;

    let user = fetch_user_by_id(&state.pool, user_id).await?;

    if membership_exists(&state.pool, team_id, user_id).await? {
        return Err(AppError::conflict("user is already a member of this team"));
    }

    sqlx::query("INSERT INTO team_members (team_id, user_id, created_at) VALUES (?, ?, ?)")
        .bind(team_id)
        .bind(user.id)
        .bind(utc_now())
        .execute(&state.pool)
        .await?;

    let members = fetch_members(&state.pool, team_id).await?;
    Ok(Json(members))
}

#[utoipa::path(
    delete,
    path = "/teams/{team_id}/members/{user_id}",
    tag = "Teams",
    params(
        ("team_id" = Uuid, Path, description = "Team id"),
        ("user_id" = Uuid, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Member removed", body = [User]),
        (status = 409, description = "User is not a member")
    )
)]
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((team_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<User>>> {
    let team = fetch_team(&state.pool, team_id).await?;
    state
        .authz
        .require(&auth.principal(), Operation::RemoveMember, &Resource::Team { id: team.id })
        .await?;

    let user = fetch_user_by_id(&state.pool, user_id).await?;

    if !membership_exists(&state.pool, team_id, user.id).await? {
        return Err(AppError::conflict("user is not a member of this team"));
    }

    sqlx::query("DELETE FROM team_members WHERE team_id = ? AND user_id = ?")
        .bind(team_id)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    let members = fetch_members(&state.pool, team_id).await?;
    Ok(Json(members))
}

pub(crate) async fn fetch_team(pool: &SqlitePool, team_id: Uuid) -> AppResult<DbTeam> {
    sqlx::query_as::<_, DbTeam>(
        "SELECT id, name, created_at, updated_at, deleted_at FROM teams WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(team_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("team not found"))
}

pub(crate) async fn fetch_members(pool: &SqlitePool, team_id: Uuid) -> AppResult<Vec<User>> {
    let rows = sqlx::query_as::<_, DbUser>(
        "SELECT u.id, u.name, u.email, u.password_hash, u.role, u.created_at, u.updated_at, u.deleted_at \
         FROM users u \
         INNER JOIN team_members tm ON tm.user_id = u.id \
         WHERE tm.team_id = ? AND u.deleted_at IS NULL \
         ORDER BY u.name ASC",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(User::try_from).collect()
}

async fn membership_exists(pool: &SqlitePool, team_id: Uuid, user_id: Uuid) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM team_members WHERE team_id = ? AND user_id = ?)",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
