use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{eq, SupabaseClient};

use crate::models::{NewPatient, Patient};
use crate::services::search::PatientSearch;

const TABLE: &str = "patients";

#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn create(&self, patient: NewPatient) -> Result<Patient>;

    async fn get(&self, patient_id: Uuid) -> Result<Option<Patient>>;

    /// Every patient whose id is in `patient_ids`, in one round trip. Unknown
    /// ids are skipped.
    async fn get_many(&self, patient_ids: &[Uuid]) -> Result<Vec<Patient>>;

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Patient>>;

    async fn search(&self, search: &PatientSearch) -> Result<Vec<Patient>>;

    /// Returns the updated patient, or `None` when no row has that id.
    async fn update_notes(&self, patient_id: Uuid, notes: Option<String>) -> Result<Option<Patient>>;
}

pub struct SupabasePatientRepository {
    supabase: SupabaseClient,
}

impl SupabasePatientRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn first(&self, column: &str, value: Uuid) -> Result<Option<Patient>> {
        let rows: Vec<Patient> = self.supabase
            .select(TABLE, &[eq(column, value), ("limit".to_string(), "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl PatientRepository for SupabasePatientRepository {
    async fn create(&self, patient: NewPatient) -> Result<Patient> {
        debug!("Creating patient profile for user {}", patient.user_id);

        let rows: Vec<Patient> = self.supabase.insert(TABLE, json!(patient)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Failed to create patient profile"))
    }

    async fn get(&self, patient_id: Uuid) -> Result<Option<Patient>> {
        debug!("Fetching patient profile: {}", patient_id);
        self.first("id", patient_id).await
    }

    async fn get_many(&self, patient_ids: &[Uuid]) -> Result<Vec<Patient>> {
        if patient_ids.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Fetching {} patient profile(s)", patient_ids.len());
        let ids: Vec<String> = patient_ids.iter().map(Uuid::to_string).collect();
        self.supabase
            .select(TABLE, &[("id".to_string(), format!("in.({})", ids.join(",")))])
            .await
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Patient>> {
        debug!("Resolving patient profile for user: {}", user_id);
        self.first("user_id", user_id).await
    }

    async fn search(&self, search: &PatientSearch) -> Result<Vec<Patient>> {
        debug!("Searching patients with {} predicate(s)", search.predicates.len());
        self.supabase.select(TABLE, &search.to_query_params()).await
    }

    async fn update_notes(&self, patient_id: Uuid, notes: Option<String>) -> Result<Option<Patient>> {
        let rows: Vec<Patient> = self.supabase
            .update(TABLE, &[eq("id", patient_id)], json!({ "notes": notes }))
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[derive(Default)]
pub struct InMemoryPatientRepository {
    patients: RwLock<HashMap<Uuid, Patient>>,
}

impl InMemoryPatientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, patient: Patient) {
        self.patients.write().await.insert(patient.id, patient);
    }
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn create(&self, patient: NewPatient) -> Result<Patient> {
        let created = Patient {
            id: Uuid::new_v4(),
            user_id: patient.user_id,
            first_name: patient.first_name,
            last_name: patient.last_name,
            email: patient.email,
            phone: patient.phone,
            notes: None,
        };
        self.patients.write().await.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, patient_id: Uuid) -> Result<Option<Patient>> {
        Ok(self.patients.read().await.get(&patient_id).cloned())
    }

    async fn get_many(&self, patient_ids: &[Uuid]) -> Result<Vec<Patient>> {
        let patients = self.patients.read().await;
        Ok(patient_ids.iter().filter_map(|id| patients.get(id).cloned()).collect())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Patient>> {
        Ok(self.patients.read().await.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn search(&self, search: &PatientSearch) -> Result<Vec<Patient>> {
        let mut found: Vec<Patient> = self.patients
            .read()
            .await
            .values()
            .filter(|p| search.matches(p))
            .cloned()
            .collect();

        found.sort_by(|a, b| {
            a.last_name.cmp(&b.last_name).then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(found)
    }

    async fn update_notes(&self, patient_id: Uuid, notes: Option<String>) -> Result<Option<Patient>> {
        let mut patients = self.patients.write().await;
        Ok(patients.get_mut(&patient_id).map(|patient| {
            patient.notes = notes;
            patient.clone()
        }))
    }
}
