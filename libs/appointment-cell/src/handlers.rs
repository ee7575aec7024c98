use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use patient_cell::services::PatientRepository;
use shared_config::AppConfig;
use shared_models::auth::Principal;
use shared_models::error::AppError;
use staff_cell::models::StaffSummary;
use staff_cell::services::StaffRepository;

use crate::models::{AppointmentError, AppointmentFilterForm, BookAppointmentForm};
use crate::services::{
    AppointmentLifecycleService, AppointmentQuery, AppointmentRepository, DashboardService, Scope,
};

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub staff: Arc<dyn StaffRepository>,
}

impl AppointmentState {
    fn lifecycle(&self) -> AppointmentLifecycleService {
        AppointmentLifecycleService::new(
            self.appointments.clone(),
            self.patients.clone(),
            self.staff.clone(),
            self.config.clinic_offset(),
        )
    }

    fn dashboards(&self) -> DashboardService {
        DashboardService::new(
            self.appointments.clone(),
            self.patients.clone(),
            self.staff.clone(),
            self.config.clinic_offset(),
        )
    }

    async fn staff_directory(&self) -> Result<Vec<StaffSummary>, AppError> {
        let staff = self.staff
            .list()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(staff.iter().map(|s| s.summary()).collect())
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::NotFound | AppointmentError::PatientNotFound => AppError::NotFound(e.to_string()),
            AppointmentError::Forbidden => AppError::Forbidden(e.to_string()),
            AppointmentError::InvalidTransition(msg) => AppError::InvalidTransition(msg),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

/// Validation failures on a submitted form are re-rendered with its values.
fn form_error(e: AppointmentError, input: Value) -> AppError {
    match e {
        AppointmentError::ValidationError(message) => AppError::InvalidForm { message, input },
        other => other.into(),
    }
}

// ==============================================================================
// PATIENT HANDLERS
// ==============================================================================

pub async fn patient_dashboard(
    State(state): State<AppointmentState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let dashboard = state.dashboards()
        .patient_dashboard(principal.profile_id, Utc::now())
        .await?;

    Ok(Json(json!({
        "user": principal.username,
        "dashboard": dashboard,
    })))
}

pub async fn booking_form(State(state): State<AppointmentState>) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "error": null,
        "staff": state.staff_directory().await?,
        "input": BookAppointmentForm::default(),
    })))
}

pub async fn book_appointment(
    State(state): State<AppointmentState>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<BookAppointmentForm>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Patient {} booking with staff {:?}", principal.profile_id, form.staff_id);

    let appointment = state.lifecycle()
        .book(principal.profile_id, &form, Utc::now())
        .await
        .map_err(|e| form_error(e, json!(form)))?;

    Ok((StatusCode::CREATED, Json(json!({ "appointment": appointment }))))
}

pub async fn cancel_as_patient(
    State(state): State<AppointmentState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.lifecycle()
        .cancel(&principal, appointment_id, Utc::now())
        .await?;

    Ok(Json(json!({ "appointment": appointment })))
}

pub async fn patient_search_form(State(state): State<AppointmentState>) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "error": null,
        "results": null,
        "staff": state.staff_directory().await?,
        "input": AppointmentFilterForm::default(),
    })))
}

pub async fn patient_search(
    State(state): State<AppointmentState>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<AppointmentFilterForm>,
) -> Result<Json<Value>, AppError> {
    let query = AppointmentQuery::compose(
        Scope::Patient(principal.profile_id),
        &form,
        state.config.clinic_offset(),
    )
    .map_err(|e| form_error(e, json!(form)))?;

    let results = state.dashboards().list_for_patient(&query).await?;

    Ok(Json(json!({
        "error": null,
        "total": results.len(),
        "results": results,
        "input": form,
    })))
}

// ==============================================================================
// STAFF HANDLERS
// ==============================================================================

pub async fn staff_dashboard(
    State(state): State<AppointmentState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let now = Utc::now();
    state.lifecycle().complete_elapsed(now).await?;

    let dashboard = state.dashboards()
        .staff_dashboard(principal.profile_id, now)
        .await?;

    Ok(Json(json!({
        "user": principal.username,
        "dashboard": dashboard,
    })))
}

pub async fn staff_appointments(
    State(state): State<AppointmentState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    state.lifecycle().complete_elapsed(Utc::now()).await?;

    let query = AppointmentQuery::scoped(Scope::Staff(principal.profile_id));
    let results = state.dashboards().list_for_staff(&query).await?;

    Ok(Json(json!({
        "error": null,
        "total": results.len(),
        "results": results,
        "input": AppointmentFilterForm::default(),
    })))
}

pub async fn staff_search(
    State(state): State<AppointmentState>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<AppointmentFilterForm>,
) -> Result<Json<Value>, AppError> {
    let query = AppointmentQuery::compose(
        Scope::Staff(principal.profile_id),
        &form,
        state.config.clinic_offset(),
    )
    .map_err(|e| form_error(e, json!(form)))?;

    state.lifecycle().complete_elapsed(Utc::now()).await?;
    let results = state.dashboards().list_for_staff(&query).await?;

    Ok(Json(json!({
        "error": null,
        "total": results.len(),
        "results": results,
        "input": form,
    })))
}

pub async fn cancel_as_staff(
    State(state): State<AppointmentState>,
    Extension(principal): Extension<Principal>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.lifecycle()
        .cancel(&principal, appointment_id, Utc::now())
        .await?;

    Ok(Json(json!({ "appointment": appointment })))
}

/// Patient profile plus this staff member's appointments with them.
pub async fn patient_detail(
    State(state): State<AppointmentState>,
    Extension(principal): Extension<Principal>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient = state.patients
        .get(patient_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;

    let query = AppointmentQuery::scoped(Scope::Staff(principal.profile_id)).with_patient(patient_id);
    let appointments = state.dashboards().list_for_staff(&query).await?;

    Ok(Json(json!({
        "patient": patient,
        "appointments": appointments,
    })))
}
