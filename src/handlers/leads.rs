// src/handlers/leads.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::AccountContext,
    models::import::ManualImportPayload,
    services::ImportService,
};

#[derive(Debug, Deserialize)]
pub struct ListLeadsQuery {
    pub page: Option<i64>,
    #[serde(rename = "perPage")]
    pub per_page: Option<i64>,
}

// GET /api/leads
// Lista paginada dos leads da conta do cabeçalho X-Account-ID.
pub async fn list_leads(
    State(app_state): State<AppState>,
    account: AccountContext,
    Query(query): Query<ListLeadsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(20);

    let (total, leads) = app_state.lead_service.list(account.0, page, per_page).await?;

    Ok(Json(json!({
        "status": "success",
        "data": {
            "total": total,
            "page": page,
            "perPage": per_page,
            "leads": leads,
        },
    })))
}

// POST /api/leads/import/manual
// Importação manual (linhas de CSV/planilha coladas no dashboard). Cada
// linha aceita variações de nome de campo (nome/name, telefone/phone...).
pub async fn import_manual(
    State(app_state): State<AppState>,
    Json(payload): Json<ManualImportPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mapped = payload
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| ImportService::map_manual_item(index, item))
        .collect();

    let response = app_state
        .import_service
        .process(
            payload.account_id,
            payload.source_type.unwrap_or_else(|| "manual".to_string()),
            json!({}),
            payload.options,
            mapped,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

// GET /api/leads/{id}/events
// Trilha de auditoria do lead: um evento por criação ou merge.
pub async fn list_lead_events(
    State(app_state): State<AppState>,
    account: AccountContext,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let events = app_state.lead_service.events(account.0, lead_id).await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "events": events },
    })))
}
