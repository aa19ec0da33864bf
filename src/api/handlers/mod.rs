use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::models::*;
use crate::roster::{RefreshSummary, RosterEmbed, SyncOutcome};

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
///
/// Validation errors from the store ("not found", "already exists") are safe
/// to expose and come back as BAD_REQUEST.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();

    if msg.contains("not found") || msg.contains("already exists") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}

/// Resolves the branch a nested route points at, or 404.
fn require_branch(state: &AppState, branch_id: Uuid) -> ApiResult<Branch> {
    state
        .db
        .get_branch(branch_id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Branch"))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Branches
// ============================================================

/// A branch with its ranks and sub-branches, used for detailed responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct BranchDetail {
    #[serde(flatten)]
    pub branch: Branch,
    pub ranks: Vec<Rank>,
    pub sub_branches: Vec<SubBranch>,
}

pub async fn list_branches(State(state): State<AppState>) -> ApiResult<Json<Vec<Branch>>> {
    state.db.get_all_branches().map(Json).map_err(internal_error)
}

pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BranchDetail>> {
    let branch = state
        .db
        .get_branch(id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Branch"))?;
    let ranks = state.db.get_ranks_by_branch(id).map_err(internal_error)?;
    let sub_branches = state
        .db
        .get_sub_branches_by_branch(id)
        .map_err(internal_error)?;

    Ok(Json(BranchDetail {
        branch,
        ranks,
        sub_branches,
    }))
}

pub async fn create_branch(
    State(state): State<AppState>,
    Json(input): Json<CreateBranchInput>,
) -> ApiResult<(StatusCode, Json<Branch>)> {
    if input.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Branch name is required".to_string()));
    }
    let branch = state.db.create_branch(input).map_err(internal_error)?;
    state.publisher.refresh_branch(branch.id).await;

    // Re-read so the response carries the message id the refresh stored
    let branch = state
        .db
        .get_branch(branch.id)
        .map_err(internal_error)?
        .unwrap_or(branch);
    Ok((StatusCode::CREATED, Json(branch)))
}

pub async fn update_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateBranchInput>,
) -> ApiResult<Json<Branch>> {
    let branch = state
        .db
        .update_branch(id, input)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Branch"))?;
    state.publisher.refresh_branch(id).await;
    Ok(Json(branch))
}

pub async fn delete_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let branch = state
        .db
        .get_branch(id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Branch"))?;

    if !state.db.delete_branch(id).map_err(internal_error)? {
        return Err(not_found("Branch"));
    }
    if let Some(message_id) = branch.message_id.as_deref() {
        state.publisher.retire_message(message_id).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Ranks
// ============================================================

pub async fn list_ranks(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Rank>>> {
    require_branch(&state, branch_id)?;
    state
        .db
        .get_ranks_by_branch(branch_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_rank(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
    Json(input): Json<CreateRankInput>,
) -> ApiResult<(StatusCode, Json<Rank>)> {
    if input.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Rank name is required".to_string()));
    }
    require_branch(&state, branch_id)?;
    state
        .db
        .create_rank(branch_id, input)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(internal_error)
}

pub async fn update_rank(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateRankInput>,
) -> ApiResult<Json<Rank>> {
    let rank = state
        .db
        .update_rank(id, input)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Rank"))?;
    state.publisher.refresh_branch(rank.branch_id).await;
    Ok(Json(rank))
}

pub async fn delete_rank(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let rank = state
        .db
        .get_rank(id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Rank"))?;

    state.db.delete_rank(id).map_err(internal_error)?;
    state.publisher.refresh_branch(rank.branch_id).await;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Sub-branches
// ============================================================

pub async fn list_sub_branches(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Json<Vec<SubBranch>>> {
    require_branch(&state, branch_id)?;
    state
        .db
        .get_sub_branches_by_branch(branch_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_sub_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
    Json(input): Json<CreateSubBranchInput>,
) -> ApiResult<(StatusCode, Json<SubBranch>)> {
    if input.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Sub-branch name is required".to_string(),
        ));
    }
    require_branch(&state, branch_id)?;
    state
        .db
        .create_sub_branch(branch_id, input)
        .map(|sb| (StatusCode::CREATED, Json(sb)))
        .map_err(internal_error)
}

pub async fn delete_sub_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let sub_branch = state
        .db
        .get_sub_branch(id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Sub-branch"))?;

    state.db.delete_sub_branch(id).map_err(internal_error)?;
    state.publisher.refresh_branch(sub_branch.branch_id).await;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Members
// ============================================================

pub async fn list_members(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberRow>>> {
    require_branch(&state, branch_id)?;
    state
        .db
        .get_members_by_branch(branch_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn create_member(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
    Json(input): Json<CreateMemberInput>,
) -> ApiResult<(StatusCode, Json<Member>)> {
    if input.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Member name is required".to_string()));
    }
    require_branch(&state, branch_id)?;
    let member = state
        .db
        .create_member(branch_id, input)
        .map_err(internal_error)?;
    state.publisher.refresh_branch(branch_id).await;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let member = state
        .db
        .get_member(id)
        .map_err(internal_error)?
        .ok_or_else(|| not_found("Member"))?;

    state.db.delete_member(id).map_err(internal_error)?;
    state.publisher.refresh_branch(member.branch_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for removing members by name.
#[derive(Debug, Deserialize)]
pub struct RemoveMembersQuery {
    pub name: String,
}

pub async fn remove_members_by_name(
    State(state): State<AppState>,
    Query(query): Query<RemoveMembersQuery>,
) -> ApiResult<Json<RemovedMembers>> {
    let (removed, branch_ids) = state
        .db
        .delete_members_by_name(&query.name)
        .map_err(internal_error)?;

    if removed == 0 {
        return Err(not_found("Member"));
    }
    for branch_id in branch_ids {
        state.publisher.refresh_branch(branch_id).await;
    }
    Ok(Json(RemovedMembers { removed }))
}

// ============================================================
// Roster
// ============================================================

pub async fn preview_roster(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Json<RosterEmbed>> {
    state
        .publisher
        .preview(branch_id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found("Branch"))
}

pub async fn refresh_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Json<SyncOutcome>> {
    match state
        .publisher
        .sync_branch(branch_id)
        .await
        .map_err(internal_error)?
    {
        SyncOutcome::Missing => Err(not_found("Branch")),
        outcome => Ok(Json(outcome)),
    }
}

pub async fn refresh_all(State(state): State<AppState>) -> Json<RefreshSummary> {
    Json(state.publisher.refresh_all().await)
}
