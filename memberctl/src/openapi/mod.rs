//! OpenAPI document for the member directory API.
//!
//! Served as JSON at `/api-docs/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "memberctl",
        description = "Member directory: paginated, sortable listings of members and teams."
    ),
    paths(
        api::handlers::members::list_members,
        api::handlers::members::get_member,
        api::handlers::members::create_member,
        api::handlers::members::update_member,
        api::handlers::members::delete_member,
        api::handlers::teams::list_teams,
        api::handlers::teams::get_team,
        api::handlers::teams::create_team,
        api::handlers::teams::update_team,
        api::handlers::teams::delete_team,
    ),
    components(schemas(
        api::models::members::MemberCreate,
        api::models::members::MemberUpdate,
        api::models::members::MemberResponse,
        api::models::members::MemberDetailResponse,
        api::models::teams::TeamCreate,
        api::models::teams::TeamUpdate,
        api::models::teams::TeamResponse,
        api::models::pagination::SortOrderResponse,
        api::models::pagination::Direction,
        crate::audit::AuditStamp,
    )),
    tags(
        (name = "members", description = "Member listing and management"),
        (name = "teams", description = "Team listing and management"),
    )
)]
pub struct ApiDoc;
