use crate::api::actor::CurrentActor;
use crate::api::handlers::parse_includes;
use crate::api::models::members::{GetMemberQuery, MemberCreate, MemberDetailResponse, MemberResponse, MemberUpdate};
use crate::api::models::pagination::{Page, PageQuery};
use crate::db::errors::DbError;
use crate::db::models::members::{MemberCreateDBRequest, MemberDBResponse, MemberUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::listing::{MemberPages, list_page};
use crate::types::{MemberId, TeamLoading};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
};

fn member_not_found(id: MemberId) -> Error {
    Error::NotFound {
        resource: "Member".to_string(),
        id: id.to_string(),
    }
}

fn reject_blank_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Username must not be empty".to_string(),
        });
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    summary = "List members",
    description = "One page of members, projected to id and username. `sort` may be repeated.",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of members", body = Page<MemberResponse>),
        (status = 400, description = "Invalid page, size or sort"),
        (status = 503, description = "Store unavailable, retry later"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_members(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Json<Page<MemberResponse>>> {
    let query = PageQuery::from_query_string(raw.as_deref());
    let page = list_page(
        &MemberPages(state.store.as_ref()),
        &query,
        &state.config.pagination,
        |member: MemberDBResponse| MemberResponse::from(member),
    )
    .await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    summary = "Get member",
    params(
        ("id" = i64, Path, description = "Member ID"),
        GetMemberQuery
    ),
    responses(
        (status = 200, description = "Member details", body = MemberDetailResponse),
        (status = 404, description = "Member not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(member_id = id))]
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<MemberId>,
    Query(query): Query<GetMemberQuery>,
) -> Result<Json<MemberDetailResponse>> {
    let team_loading = if parse_includes(query.include.as_deref()).contains(&"team") {
        TeamLoading::Eager
    } else {
        TeamLoading::Lazy
    };

    let member = state.store.get_member(id, team_loading).await?.ok_or_else(|| member_not_found(id))?;
    Ok(Json(member.into()))
}

#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    summary = "Create member",
    request_body = MemberCreate,
    responses(
        (status = 201, description = "Member created", body = MemberDetailResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Referenced team not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(actor = %actor))]
pub async fn create_member(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(create): Json<MemberCreate>,
) -> Result<(StatusCode, Json<MemberDetailResponse>)> {
    reject_blank_username(&create.username)?;

    let member = state.store.create_member(&actor, &MemberCreateDBRequest::from(create)).await?;
    Ok((StatusCode::CREATED, Json(member.into())))
}

#[utoipa::path(
    patch,
    path = "/members/{id}",
    tag = "members",
    summary = "Update member",
    request_body = MemberUpdate,
    params(
        ("id" = i64, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member updated", body = MemberDetailResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Member or referenced team not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(member_id = id, actor = %actor))]
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<MemberId>,
    CurrentActor(actor): CurrentActor,
    Json(update): Json<MemberUpdate>,
) -> Result<Json<MemberDetailResponse>> {
    if let Some(username) = &update.username {
        reject_blank_username(username)?;
    }

    let member = match state.store.update_member(&actor, id, &MemberUpdateDBRequest::from(update)).await {
        Ok(member) => member,
        Err(DbError::NotFound) => return Err(member_not_found(id)),
        Err(e) => return Err(e.into()),
    };
    Ok(Json(member.into()))
}

#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    summary = "Delete member",
    params(
        ("id" = i64, Path, description = "Member ID")
    ),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(member_id = id))]
pub async fn delete_member(State(state): State<AppState>, Path(id): Path<MemberId>) -> Result<StatusCode> {
    if state.store.delete_member(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(member_not_found(id))
    }
}
