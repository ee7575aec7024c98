use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    Form, Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::Principal;
use shared_models::error::AppError;

use crate::models::{PatientError, PatientSearchForm, UpdateNotesForm};
use crate::services::{PatientRepository, PatientService};

#[derive(Clone)]
pub struct PatientState {
    pub config: Arc<AppConfig>,
    pub patients: Arc<dyn PatientRepository>,
}

impl From<PatientError> for AppError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

pub async fn patient_search_form() -> Json<Value> {
    Json(json!({
        "error": null,
        "results": null,
        "input": PatientSearchForm::default(),
    }))
}

pub async fn search_patients(
    State(state): State<PatientState>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<PatientSearchForm>,
) -> Result<Json<Value>, AppError> {
    debug!("Staff {} searching patients", principal.profile_id);

    let service = PatientService::new(state.patients.clone());
    let patients = service.search_patients(&form).await?;

    Ok(Json(json!({
        "error": null,
        "total": patients.len(),
        "results": patients,
        "input": form,
    })))
}

pub async fn update_patient_notes(
    State(state): State<PatientState>,
    Extension(principal): Extension<Principal>,
    Path(patient_id): Path<Uuid>,
    Form(form): Form<UpdateNotesForm>,
) -> Result<Json<Value>, AppError> {
    debug!("Staff {} updating notes for patient {}", principal.profile_id, patient_id);

    let service = PatientService::new(state.patients.clone());
    let patient = service
        .update_notes(patient_id, &form.notes)
        .await
        .map_err(|e| match e {
            PatientError::ValidationError(message) => AppError::InvalidForm {
                message,
                input: json!({ "notes": form.notes }),
            },
            other => other.into(),
        })?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
    })))
}
