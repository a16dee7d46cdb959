//! In-memory stand-in for the lemlist API.
//!
//! Serves the campaign, lead, lead-variable, and CSV export endpoints under
//! `/api`, behind the same Basic auth scheme as the real service. Campaigns
//! are seeded up front; leads are created through the API.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_PAGE_LIMIT: usize = 10;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Campaign {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug)]
struct StoredLead {
    id: String,
    email_status: String,
    fields: Map<String, Value>,
}

#[derive(Clone, Debug)]
struct StoredCampaign {
    campaign: Campaign,
    leads: Vec<StoredLead>,
}

impl StoredLead {
    fn email(&self) -> &str {
        self.fields.get("email").and_then(Value::as_str).unwrap_or_default()
    }

    fn to_json(&self) -> Value {
        let mut body = self.fields.clone();
        body.insert("_id".to_string(), json!(self.id));
        Value::Object(body)
    }
}

type Db = Arc<RwLock<Vec<StoredCampaign>>>;

/// Shared server state: the expected API key and the campaign store.
#[derive(Clone)]
pub struct MockState {
    api_key: Arc<str>,
    db: Db,
}

impl MockState {
    pub fn new(api_key: &str) -> Self {
        Self::seeded(api_key, &[])
    }

    /// State with campaigns `(id, name)` in list order. Names need not be
    /// unique.
    pub fn seeded(api_key: &str, campaigns: &[(&str, &str)]) -> Self {
        let campaigns = campaigns
            .iter()
            .map(|(id, name)| StoredCampaign {
                campaign: Campaign {
                    id: id.to_string(),
                    name: name.to_string(),
                },
                leads: Vec::new(),
            })
            .collect();
        Self {
            api_key: Arc::from(api_key),
            db: Arc::new(RwLock::new(campaigns)),
        }
    }

    /// Change the delivery status reported for a lead in the export.
    ///
    /// Blocks on the store lock; call it from outside the server's runtime.
    pub fn set_email_status(&self, campaign_id: &str, email: &str, status: &str) -> bool {
        let mut db = self.db.blocking_write();
        let lead = db
            .iter_mut()
            .filter(|c| c.campaign.id == campaign_id)
            .flat_map(|c| c.leads.iter_mut())
            .find(|l| l.email() == email);
        match lead {
            Some(lead) => {
                lead.email_status = status.to_string();
                true
            }
            None => false,
        }
    }

    fn expected_authorization(&self) -> String {
        let credential = general_purpose::STANDARD.encode(format!(":{}", self.api_key));
        format!("Basic {credential}")
    }
}

pub fn app(state: MockState) -> Router {
    let api = Router::new()
        .route("/campaigns", get(list_campaigns))
        .route("/campaigns/{id}", get(get_campaign).delete(delete_campaign))
        .route("/campaigns/{id}/leads", post(add_lead))
        .route(
            "/campaigns/{id}/leads/{email}",
            patch(update_lead).delete(delete_lead),
        )
        .route("/campaigns/{id}/export/leads", get(export_leads))
        .route(
            "/leads/{lead_id}/variables",
            post(lead_variables).patch(lead_variables).delete(lead_variables),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

async fn require_auth(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == state.expected_authorization());
    if !authorized {
        tracing::warn!(uri = %request.uri(), "rejected request with bad credentials");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(request).await
}

fn not_found(what: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("{what} not found")).into_response()
}

fn query_flag(query: &HashMap<String, String>, key: &str, default: bool) -> bool {
    query.get(key).map(|v| v == "true").unwrap_or(default)
}

fn query_number(query: &HashMap<String, String>, key: &str, default: usize) -> usize {
    query.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Page-based listing; `offset` is accepted and ignored, as `page` wins.
async fn list_campaigns(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let limit = query_number(&query, "limit", DEFAULT_PAGE_LIMIT).max(1);
    let page = query_number(&query, "page", 1).max(1);

    let db = state.db.read().await;
    let total = db.len();
    let total_pages = total.div_ceil(limit);
    let campaigns: Vec<&Campaign> = db
        .iter()
        .skip((page - 1) * limit)
        .take(limit)
        .map(|c| &c.campaign)
        .collect();

    let mut pagination = json!({
        "totalRecords": total,
        "currentPage": page,
        "totalPage": total_pages,
    });
    if page < total_pages {
        pagination["nextPage"] = json!(page + 1);
    }
    Json(json!({ "campaigns": campaigns, "pagination": pagination }))
}

async fn get_campaign(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    let db = state.db.read().await;
    match db.iter().find(|c| c.campaign.id == id) {
        Some(stored) => Json(&stored.campaign).into_response(),
        None => not_found("Campaign"),
    }
}

async fn delete_campaign(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    let mut db = state.db.write().await;
    match db.iter().position(|c| c.campaign.id == id) {
        Some(index) => {
            let removed = db.remove(index);
            Json(json!({ "_id": removed.campaign.id })).into_response()
        }
        None => not_found("Campaign"),
    }
}

async fn add_lead(
    State(state): State<MockState>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let email = match body.get("email").and_then(Value::as_str) {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => return (StatusCode::BAD_REQUEST, "email is required").into_response(),
    };
    let deduplicate = query_flag(&query, "deduplicate", false);

    let mut db = state.db.write().await;
    if deduplicate && db.iter().flat_map(|c| &c.leads).any(|l| l.email() == email) {
        return (StatusCode::CONFLICT, "Lead already exists in another campaign").into_response();
    }
    let Some(stored) = db.iter_mut().find(|c| c.campaign.id == id) else {
        return not_found("Campaign");
    };
    if stored.leads.iter().any(|l| l.email() == email) {
        return (StatusCode::CONFLICT, "Lead already in the campaign").into_response();
    }

    let lead = StoredLead {
        id: format!("lea_{}", Uuid::new_v4().simple()),
        email_status: "pending".to_string(),
        fields: body,
    };
    let mut response = lead.to_json();
    response["campaignId"] = json!(stored.campaign.id);
    stored.leads.push(lead);
    Json(response).into_response()
}

async fn update_lead(
    State(state): State<MockState>,
    Path((id, email)): Path<(String, String)>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "Body is mandatory").into_response();
    }
    let mut db = state.db.write().await;
    let Some(stored) = db.iter_mut().find(|c| c.campaign.id == id) else {
        return not_found("Campaign");
    };
    let campaign = stored.campaign.clone();
    let Some(lead) = stored.leads.iter_mut().find(|l| l.email() == email) else {
        return not_found("Lead");
    };
    for (key, value) in body {
        if key != "email" {
            lead.fields.insert(key, value);
        }
    }
    let mut response = lead.to_json();
    response["campaignId"] = json!(campaign.id);
    response["campaignName"] = json!(campaign.name);
    Json(response).into_response()
}

async fn delete_lead(
    State(state): State<MockState>,
    Path((id, email)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if query.get("action").map(String::as_str) != Some("remove") {
        return (StatusCode::BAD_REQUEST, "action=remove is required").into_response();
    }
    let mut db = state.db.write().await;
    let Some(stored) = db.iter_mut().find(|c| c.campaign.id == id) else {
        return not_found("Campaign");
    };
    match stored.leads.iter().position(|l| l.email() == email) {
        Some(index) => {
            let removed = stored.leads.remove(index);
            Json(json!({ "_id": removed.id, "email": email })).into_response()
        }
        None => not_found("Lead"),
    }
}

/// CSV with every lead field seen in the campaign, then `_id` and
/// `emailStatus`. Records end with CRLF like the real export.
async fn export_leads(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    let db = state.db.read().await;
    let Some(stored) = db.iter().find(|c| c.campaign.id == id) else {
        return not_found("Campaign");
    };

    let mut columns: Vec<String> = vec!["email".to_string()];
    for lead in &stored.leads {
        for key in lead.fields.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    let mut header = columns.clone();
    header.push("_id".to_string());
    header.push("emailStatus".to_string());
    let mut rows = vec![header];
    for lead in &stored.leads {
        let mut row: Vec<String> = columns
            .iter()
            .map(|column| match lead.fields.get(column) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        row.push(lead.id.clone());
        row.push(lead.email_status.clone());
        rows.push(row);
    }
    for row in &rows {
        if let Err(e) = writer.write_record(row) {
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    }
    let body = match writer.into_inner() {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body).into_response()
}

async fn lead_variables(
    State(state): State<MockState>,
    Path(lead_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if query.is_empty() {
        return (StatusCode::BAD_REQUEST, "No variables given").into_response();
    }
    let db = state.db.read().await;
    if db.iter().flat_map(|c| &c.leads).any(|l| l.id == lead_id) {
        Json(json!({ "ok": true })).into_response()
    } else {
        not_found("Lead")
    }
}
