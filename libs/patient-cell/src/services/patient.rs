use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Patient, PatientError, PatientSearchForm, MAX_NOTES_LENGTH};
use crate::services::repository::PatientRepository;
use crate::services::search::PatientSearch;

pub struct PatientService {
    patients: Arc<dyn PatientRepository>,
}

impl PatientService {
    pub fn new(patients: Arc<dyn PatientRepository>) -> Self {
        Self { patients }
    }

    pub async fn search_patients(&self, form: &PatientSearchForm) -> Result<Vec<Patient>, PatientError> {
        let search = PatientSearch::from_form(form);
        debug!("Patient search with {} active filter(s)", search.predicates.len());

        self.patients
            .search(&search)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))
    }

    /// Replaces a patient's clinical notes. Blank input clears them.
    pub async fn update_notes(&self, patient_id: Uuid, notes: &str) -> Result<Patient, PatientError> {
        let notes = notes.trim();
        if notes.chars().count() > MAX_NOTES_LENGTH {
            return Err(PatientError::ValidationError(format!(
                "Notes must be {} characters or fewer.",
                MAX_NOTES_LENGTH
            )));
        }

        let notes = (!notes.is_empty()).then(|| notes.to_string());

        let updated = self.patients
            .update_notes(patient_id, notes)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?
            .ok_or(PatientError::NotFound)?;

        info!("Notes updated for patient {}", patient_id);
        Ok(updated)
    }
}
