//! HTTP endpoint handlers
//!
//! Handlers hold the desk lock for the synchronous core call only; nothing
//! is awaited while it is held.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use hubly_core::{
    ChatbotSettings, ChatbotSettingsUpdate, Message, NewStaff, Overview, Staff, StaffId, Ticket,
    TicketFilter, TicketId, TicketStatus,
};

use crate::auth::CurrentStaff;
use crate::{ApiError, AppState};

type ApiResult<T> = Result<T, ApiError>;

/// Unwrap a JSON body, reporting malformed input as a 400
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// Health check
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ==================== Widget ====================

/// Request to open a chat from the widget
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartChatRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
}

/// A new ticket with its greeting messages
#[derive(Debug, Serialize)]
pub struct StartChatResponse {
    pub ticket: Ticket,
    pub messages: Vec<Message>,
}

/// Open a ticket for a customer
pub async fn start_chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StartChatRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StartChatResponse>)> {
    let request = json_body(payload)?;
    let mut desk = state.desk()?;
    let (ticket, messages) = desk.start_ticket(&request.name, &request.phone, &request.email)?;
    Ok((StatusCode::CREATED, Json(StartChatResponse { ticket, messages })))
}

/// Request carrying message text
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MessageRequest {
    pub text: String,
}

/// Customer message from the widget
pub async fn post_customer_message(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let ticket_id = TicketId::parse(&ticket_id)?;
    let request = json_body(payload)?;
    let mut desk = state.desk()?;
    let message = desk.post_customer_message(&ticket_id, &request.text)?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Conversation history as the widget shows it
pub async fn list_chat_messages(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let ticket_id = TicketId::parse(&ticket_id)?;
    let desk = state.desk()?;
    Ok(Json(desk.list_messages(&ticket_id)?))
}

/// Widget settings
pub async fn get_settings(State(state): State<Arc<AppState>>) -> ApiResult<Json<ChatbotSettings>> {
    let desk = state.desk()?;
    Ok(Json(desk.settings()?))
}

// ==================== Tickets ====================

/// Query string for the ticket list
#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

/// Tickets visible to the caller, with missed flags refreshed
pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Extension(CurrentStaff(viewer)): Extension<CurrentStaff>,
    Query(query): Query<TicketQuery>,
) -> ApiResult<Json<Vec<Ticket>>> {
    let filter = TicketFilter::parse(query.status.as_deref(), query.search.as_deref())?;
    let desk = state.desk()?;

    let mut tickets = desk.query_tickets(&viewer, &filter)?;
    desk.reconcile_missed(&mut tickets)?;
    Ok(Json(tickets))
}

/// Request to reassign a ticket
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssignRequest {
    pub assigned_to_user_id: String,
}

/// Point a ticket at another staff member
pub async fn assign_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    payload: Result<Json<AssignRequest>, JsonRejection>,
) -> ApiResult<Json<Ticket>> {
    let ticket_id = TicketId::parse(&ticket_id)?;
    let request = json_body(payload)?;
    let staff_id = StaffId::parse(request.assigned_to_user_id.trim()).map_err(|_| {
        ApiError::bad_request(format!(
            "Staff {} not found",
            request.assigned_to_user_id
        ))
    })?;

    let mut desk = state.desk()?;
    Ok(Json(desk.assign(&ticket_id, &staff_id)?))
}

/// Request to change a ticket's status
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusRequest {
    pub status: String,
}

/// Move a ticket to a new status
pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<Json<Ticket>> {
    let ticket_id = TicketId::parse(&ticket_id)?;
    let status: TicketStatus = json_body(payload)?.status.trim().parse()?;

    let mut desk = state.desk()?;
    Ok(Json(desk.change_status(&ticket_id, status)?))
}

// ==================== Messages ====================

/// Conversation history for the dashboard
pub async fn list_ticket_messages(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let ticket_id = TicketId::parse(&ticket_id)?;
    let desk = state.desk()?;
    Ok(Json(desk.list_messages(&ticket_id)?))
}

/// Staff reply on a ticket
pub async fn post_staff_message(
    State(state): State<Arc<AppState>>,
    Extension(CurrentStaff(author)): Extension<CurrentStaff>,
    Path(ticket_id): Path<String>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let ticket_id = TicketId::parse(&ticket_id)?;
    let request = json_body(payload)?;
    let mut desk = state.desk()?;
    let message = desk.post_staff_message(&ticket_id, &author.id, &request.text)?;
    Ok((StatusCode::CREATED, Json(message)))
}

// ==================== Analytics ====================

/// Dashboard metrics
pub async fn analytics_overview(State(state): State<Arc<AppState>>) -> ApiResult<Json<Overview>> {
    let desk = state.desk()?;
    Ok(Json(desk.overview()?))
}

// ==================== Roster ====================

/// A newly created staff record, including the token it signs in with
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedStaff {
    #[serde(flatten)]
    pub staff: Staff,
    pub auth_token: String,
}

/// Every staff member
pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Staff>>> {
    let desk = state.desk()?;
    Ok(Json(desk.list_staff()?))
}

/// Add a member (admin only)
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentStaff>,
    payload: Result<Json<NewStaff>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedStaff>)> {
    current.require_admin()?;
    let input = json_body(payload)?;

    let mut desk = state.desk()?;
    let staff = desk.create_staff(input)?;
    let auth_token = staff.auth_token.clone();
    Ok((StatusCode::CREATED, Json(CreatedStaff { staff, auth_token })))
}

/// The caller's own record
pub async fn current_user(Extension(CurrentStaff(staff)): Extension<CurrentStaff>) -> Json<Staff> {
    Json(staff)
}

/// Remove a member (admin only), handing their tickets to the administrator
pub async fn remove_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentStaff>,
    Path(staff_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    current.require_admin()?;
    let staff_id = StaffId::parse(&staff_id)?;

    let mut desk = state.desk()?;
    let moved = desk.remove_staff(&staff_id)?;
    Ok(Json(serde_json::json!({ "reassignedTickets": moved })))
}

// ==================== Settings ====================

/// Partially update the widget settings (admin only)
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentStaff>,
    payload: Result<Json<ChatbotSettingsUpdate>, JsonRejection>,
) -> ApiResult<Json<ChatbotSettings>> {
    current.require_admin()?;
    let update = json_body(payload)?;

    let mut desk = state.desk()?;
    Ok(Json(desk.update_settings(update)?))
}
