//! HTTP API.
//!
//! Public endpoints:
//! - `GET  /`                 service banner
//! - `GET  /machines`         active machines
//! - `GET  /machines/catalog` static category/product listing
//! - `GET  /machines/{code}`  one active machine
//! - `POST /generate-quote`   price, store and render a quotation
//!
//! Admin endpoints (HTTP basic auth):
//! - `PUT  /machines/{code}`  update a machine price
//! - `GET  /admin/machines`   active machines
//! - `GET  /quotations`       all quotations, newest first
//! - `GET  /quotations/stats` discount statistics

use std::sync::Arc;

use agromaq_core::cpq::catalog::CatalogCategory;
use agromaq_core::domain::{
    client::ClientInfo,
    machine::{Machine, MachineCode},
    quotation::{Quotation, QuotationRequest, QuotationStats},
};
use agromaq_core::errors::{ApplicationError, InterfaceError};
use axum::{
    extract::{FromRef, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::{AdminCredentials, AdminUser};
use crate::quotation::QuotationService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QuotationService>,
    pub admin: Arc<AdminCredentials>,
}

impl FromRef<AppState> for Arc<AdminCredentials> {
    fn from_ref(state: &AppState) -> Self {
        state.admin.clone()
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationCreate {
    pub machine_code: String,
    pub client_cuit: String,
    pub client_name: String,
    pub client_phone: String,
    pub client_address: Option<String>,
    pub client_email: Option<String>,
    pub client_company: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub discount_percent: Decimal,
}

impl QuotationCreate {
    fn into_request(self) -> QuotationRequest {
        let mut client = ClientInfo::new(self.client_cuit, self.client_name, self.client_phone);
        if let Some(address) = self.client_address {
            client = client.with_address(address);
        }
        if let Some(email) = self.client_email {
            client = client.with_email(email);
        }
        if let Some(company) = self.client_company {
            client = client.with_company(company);
        }
        if let Some(notes) = self.notes {
            client = client.with_notes(notes);
        }

        QuotationRequest {
            machine_code: MachineCode(self.machine_code),
            client,
            discount_percent: self.discount_percent,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MachineUpdate {
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ServiceBanner {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotation_id: Option<i64>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_banner))
        .route("/machines", get(list_machines))
        .route("/machines/catalog", get(machine_catalog))
        .route("/machines/{code}", get(get_machine).put(update_machine_price))
        .route("/admin/machines", get(admin_machines))
        .route("/generate-quote", post(generate_quote))
        .route("/quotations", get(list_quotations))
        .route("/quotations/stats", get(quotation_stats))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn service_banner() -> Json<ServiceBanner> {
    Json(ServiceBanner {
        message: "Agromaq Quotation System API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_machines(State(state): State<AppState>) -> Result<Json<Vec<Machine>>, ApiError> {
    let correlation_id = correlation_id();
    state.service.list_machines().await.map(Json).map_err(|e| api_error(e, &correlation_id))
}

async fn admin_machines(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Machine>>, ApiError> {
    let correlation_id = correlation_id();
    info!(event_name = "http.admin.machines", correlation_id = %correlation_id, admin = %admin);
    state.service.list_machines().await.map(Json).map_err(|e| api_error(e, &correlation_id))
}

async fn machine_catalog(State(state): State<AppState>) -> Json<Vec<CatalogCategory>> {
    Json(state.service.catalog().categories().to_vec())
}

async fn get_machine(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Machine>, ApiError> {
    let correlation_id = correlation_id();
    state
        .service
        .get_machine(&MachineCode(code))
        .await
        .map(Json)
        .map_err(|e| api_error(e, &correlation_id))
}

async fn update_machine_price(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(body): Json<MachineUpdate>,
) -> Result<Json<Machine>, ApiError> {
    let correlation_id = correlation_id();
    info!(
        event_name = "http.machine.price_update_requested",
        correlation_id = %correlation_id,
        machine_code = %code,
        admin = %admin,
        "price update requested"
    );
    state
        .service
        .update_price(&MachineCode(code), body.price, &correlation_id)
        .await
        .map(|update| Json(update.machine))
        .map_err(|e| api_error(e, &correlation_id))
}

async fn generate_quote(
    State(state): State<AppState>,
    Json(body): Json<QuotationCreate>,
) -> Result<Response, ApiError> {
    let correlation_id = correlation_id();
    let generated = state
        .service
        .generate(body.into_request(), &correlation_id)
        .await
        .map_err(|e| api_error(e, &correlation_id))?;

    let filename = generated.filename();
    let content_type = generated.document.content_type();
    info!(
        event_name = "http.quotation.generated",
        correlation_id = %correlation_id,
        quotation_id = generated.quotation.id.0,
        filename = %filename,
        content_type,
        "quotation document served"
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_owned()),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        generated.document.into_bytes(),
    )
        .into_response())
}

async fn list_quotations(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Quotation>>, ApiError> {
    let correlation_id = correlation_id();
    state.service.list_quotations().await.map(Json).map_err(|e| api_error(e, &correlation_id))
}

async fn quotation_stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<QuotationStats>, ApiError> {
    let correlation_id = correlation_id();
    state.service.stats().await.map(Json).map_err(|e| api_error(e, &correlation_id))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

/// Header values must be ASCII: a plain fallback plus the RFC 5987 UTF-8 form.
fn content_disposition(filename: &str) -> String {
    let fallback: String =
        filename.chars().map(|c| if c.is_ascii_graphic() && c != '"' { c } else { '_' }).collect();
    let mut encoded = String::with_capacity(filename.len());
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

fn api_error(error: ApplicationError, correlation_id: &str) -> ApiError {
    let quotation_id = match &error {
        ApplicationError::PartialSuccess { quotation_id, .. } => Some(*quotation_id),
        _ => None,
    };
    let interface = error.into_interface(correlation_id);

    let (status, detail) = match &interface {
        InterfaceError::NotFound { .. } => {
            (StatusCode::NOT_FOUND, interface.user_message().to_owned())
        }
        InterfaceError::BadRequest { message, .. } => {
            warn!(correlation_id, error = %message, "request rejected");
            (StatusCode::UNPROCESSABLE_ENTITY, message.clone())
        }
        InterfaceError::ServiceUnavailable { message, .. } => {
            error!(correlation_id, error = %message, "storage unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, interface.user_message().to_owned())
        }
        InterfaceError::Internal { message, .. } => {
            error!(correlation_id, error = %message, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, interface.user_message().to_owned())
        }
    };

    (status, Json(ErrorBody { detail, correlation_id: correlation_id.to_owned(), quotation_id }))
}
