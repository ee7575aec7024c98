use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{eq, SupabaseClient};

use crate::models::{Appointment, AppointmentStatus, NewAppointment};
use crate::services::query::AppointmentQuery;

const TABLE: &str = "appointments";

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment>;

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>>;

    async fn list(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>>;

    /// Single-row status write. `None` when the row is gone.
    async fn set_status(&self, appointment_id: Uuid, status: AppointmentStatus) -> Result<Option<Appointment>>;

    /// Bulk `booked ∧ appointment_date < now → completed`. Returns rows touched.
    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<usize>;
}

pub struct SupabaseAppointmentRepository {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentRepository {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment> {
        debug!("Inserting appointment for patient {} with staff {}", appointment.patient_id, appointment.staff_id);

        let rows: Vec<Appointment> = self.supabase.insert(TABLE, json!(appointment)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create appointment"))
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>> {
        let rows: Vec<Appointment> = self.supabase
            .select(TABLE, &[eq("id", appointment_id), ("limit".to_string(), "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>> {
        self.supabase.select(TABLE, &query.to_query_params()).await
    }

    async fn set_status(&self, appointment_id: Uuid, status: AppointmentStatus) -> Result<Option<Appointment>> {
        let rows: Vec<Appointment> = self.supabase
            .update(TABLE, &[eq("id", appointment_id)], json!({ "status": status }))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<usize> {
        let filter = [
            eq("status", AppointmentStatus::Booked),
            ("appointment_date".to_string(), format!("lt.{}", now.to_rfc3339())),
        ];

        let rows: Vec<Appointment> = self.supabase
            .update(TABLE, &filter, json!({ "status": AppointmentStatus::Completed }))
            .await?;
        Ok(rows.len())
    }
}

#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a row as-is, bypassing booking rules.
    pub async fn seed(&self, appointment: Appointment) {
        self.appointments.write().await.insert(appointment.id, appointment);
    }

    pub async fn count(&self) -> usize {
        self.appointments.read().await.len()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment> {
        let created = Appointment {
            id: Uuid::new_v4(),
            patient_id: appointment.patient_id,
            staff_id: appointment.staff_id,
            appointment_date: appointment.appointment_date,
            reason: appointment.reason,
            status: appointment.status,
        };
        self.appointments.write().await.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }

    async fn list(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>> {
        let mut found: Vec<Appointment> = self.appointments
            .read()
            .await
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();

        query.sort(&mut found);
        Ok(found)
    }

    async fn set_status(&self, appointment_id: Uuid, status: AppointmentStatus) -> Result<Option<Appointment>> {
        let mut appointments = self.appointments.write().await;
        Ok(appointments.get_mut(&appointment_id).map(|a| {
            a.status = status;
            a.clone()
        }))
    }

    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut appointments = self.appointments.write().await;
        let mut touched = 0;

        for appointment in appointments.values_mut() {
            if appointment.status == AppointmentStatus::Booked && appointment.appointment_date < now {
                appointment.status = AppointmentStatus::Completed;
                touched += 1;
            }
        }

        Ok(touched)
    }
}
