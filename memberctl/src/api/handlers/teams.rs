use crate::api::actor::CurrentActor;
use crate::api::handlers::parse_includes;
use crate::api::models::pagination::{Page, PageQuery};
use crate::api::models::teams::{GetTeamQuery, TeamCreate, TeamResponse, TeamUpdate};
use crate::db::errors::DbError;
use crate::db::models::teams::{TeamCreateDBRequest, TeamDBResponse, TeamUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::listing::{TeamPages, list_page};
use crate::types::TeamId;
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
};

fn team_not_found(id: TeamId) -> Error {
    Error::NotFound {
        resource: "Team".to_string(),
        id: id.to_string(),
    }
}

fn reject_blank_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Team name must not be empty".to_string(),
        });
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/teams",
    tag = "teams",
    summary = "List teams",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of teams", body = Page<TeamResponse>),
        (status = 400, description = "Invalid page, size or sort"),
        (status = 503, description = "Store unavailable, retry later"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_teams(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Json<Page<TeamResponse>>> {
    let query = PageQuery::from_query_string(raw.as_deref());
    let page = list_page(
        &TeamPages(state.store.as_ref()),
        &query,
        &state.config.pagination,
        |team: TeamDBResponse| TeamResponse::from(team),
    )
    .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/teams/{id}",
    tag = "teams",
    summary = "Get team",
    params(
        ("id" = i64, Path, description = "Team ID"),
        GetTeamQuery
    ),
    responses(
        (status = 200, description = "Team details", body = TeamResponse),
        (status = 404, description = "Team not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(team_id = id))]
pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<TeamId>,
    Query(query): Query<GetTeamQuery>,
) -> Result<Json<TeamResponse>> {
    let team = state.store.get_team(id).await?.ok_or_else(|| team_not_found(id))?;
    let mut response = TeamResponse::from(team);

    if parse_includes(query.include.as_deref()).contains(&"members") {
        let member_ids = match state.store.member_ids(id).await {
            Ok(ids) => ids,
            // Deleted between the two reads
            Err(DbError::NotFound) => return Err(team_not_found(id)),
            Err(e) => return Err(e.into()),
        };
        response = response.with_member_ids(member_ids);
    }

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/teams",
    tag = "teams",
    summary = "Create team",
    request_body = TeamCreate,
    responses(
        (status = 201, description = "Team created", body = TeamResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "A team with this name already exists"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(actor = %actor))]
pub async fn create_team(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(create): Json<TeamCreate>,
) -> Result<(StatusCode, Json<TeamResponse>)> {
    reject_blank_name(&create.name)?;

    let team = state.store.create_team(&actor, &TeamCreateDBRequest::from(create)).await?;
    Ok((StatusCode::CREATED, Json(team.into())))
}

#[utoipa::path(
    patch,
    path = "/teams/{id}",
    tag = "teams",
    summary = "Rename team",
    request_body = TeamUpdate,
    params(
        ("id" = i64, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team updated", body = TeamResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Team not found"),
        (status = 409, description = "A team with this name already exists"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(team_id = id, actor = %actor))]
pub async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<TeamId>,
    CurrentActor(actor): CurrentActor,
    Json(update): Json<TeamUpdate>,
) -> Result<Json<TeamResponse>> {
    if let Some(name) = &update.name {
        reject_blank_name(name)?;
    }

    match state.store.update_team(&actor, id, &TeamUpdateDBRequest::from(update)).await {
        Ok(team) => Ok(Json(team.into())),
        Err(DbError::NotFound) => Err(team_not_found(id)),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    delete,
    path = "/teams/{id}",
    tag = "teams",
    summary = "Delete team",
    description = "Members of the team are kept and left without a team.",
    params(
        ("id" = i64, Path, description = "Team ID")
    ),
    responses(
        (status = 204, description = "Team deleted"),
        (status = 404, description = "Team not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(team_id = id))]
pub async fn delete_team(State(state): State<AppState>, Path(id): Path<TeamId>) -> Result<StatusCode> {
    if state.store.delete_team(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(team_not_found(id))
    }
}
