use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use patient_cell::services::PatientRepository;
use staff_cell::services::StaffRepository;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, AppointmentView};
use crate::services::query::{start_of_day, AppointmentQuery, Scope};
use crate::services::repository::AppointmentRepository;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientDashboard {
    pub upcoming: Vec<AppointmentView>,
    pub past: Vec<AppointmentView>,
    pub cancelled: Vec<AppointmentView>,
    pub counts: PatientCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatientCounts {
    pub upcoming: usize,
    pub past: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StaffDashboard {
    pub today: Vec<AppointmentView>,
    pub upcoming: Vec<AppointmentView>,
    pub past: Vec<AppointmentView>,
    pub cancelled: Vec<AppointmentView>,
    pub counts: StaffCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StaffCounts {
    pub today: usize,
    pub upcoming: usize,
    pub past: usize,
    pub cancelled: usize,
}

fn ascending(items: &mut [AppointmentView]) {
    items.sort_by_key(|v| v.appointment.appointment_date);
}

fn descending(items: &mut [AppointmentView]) {
    items.sort_by(|a, b| b.appointment.appointment_date.cmp(&a.appointment.appointment_date));
}

/// upcoming: not cancelled and at or after `now`; past: not cancelled and
/// before `now`; cancelled: the rest.
pub fn patient_buckets(items: Vec<AppointmentView>, now: DateTime<Utc>) -> PatientDashboard {
    let mut dashboard = PatientDashboard::default();

    for item in items {
        if item.appointment.status == AppointmentStatus::Cancelled {
            dashboard.cancelled.push(item);
        } else if item.appointment.appointment_date >= now {
            dashboard.upcoming.push(item);
        } else {
            dashboard.past.push(item);
        }
    }

    ascending(&mut dashboard.upcoming);
    descending(&mut dashboard.past);
    descending(&mut dashboard.cancelled);

    dashboard.counts = PatientCounts {
        upcoming: dashboard.upcoming.len(),
        past: dashboard.past.len(),
        cancelled: dashboard.cancelled.len(),
    };
    dashboard
}

/// Like [`patient_buckets`] but with everything on the clinic-local calendar
/// day of `now` pulled into `today`, whether before or after `now`.
pub fn staff_buckets(items: Vec<AppointmentView>, now: DateTime<Utc>, offset: FixedOffset) -> StaffDashboard {
    let today = now.with_timezone(&offset).date_naive();
    let today_start = start_of_day(today, offset).unwrap_or(now);
    let tomorrow_start = today
        .succ_opt()
        .and_then(|d| start_of_day(d, offset))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let mut dashboard = StaffDashboard::default();

    for item in items {
        let date = item.appointment.appointment_date;
        if item.appointment.status == AppointmentStatus::Cancelled {
            dashboard.cancelled.push(item);
        } else if date < today_start {
            dashboard.past.push(item);
        } else if date >= tomorrow_start {
            dashboard.upcoming.push(item);
        } else {
            dashboard.today.push(item);
        }
    }

    ascending(&mut dashboard.today);
    ascending(&mut dashboard.upcoming);
    descending(&mut dashboard.past);
    descending(&mut dashboard.cancelled);

    dashboard.counts = StaffCounts {
        today: dashboard.today.len(),
        upcoming: dashboard.upcoming.len(),
        past: dashboard.past.len(),
        cancelled: dashboard.cancelled.len(),
    };
    dashboard
}

/// Runs listing queries and attaches the counterpart's name to each row.
pub struct DashboardService {
    appointments: Arc<dyn AppointmentRepository>,
    patients: Arc<dyn PatientRepository>,
    staff: Arc<dyn StaffRepository>,
    offset: FixedOffset,
}

impl DashboardService {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        patients: Arc<dyn PatientRepository>,
        staff: Arc<dyn StaffRepository>,
        offset: FixedOffset,
    ) -> Self {
        Self { appointments, patients, staff, offset }
    }

    pub async fn patient_dashboard(&self, patient_id: Uuid, now: DateTime<Utc>) -> Result<PatientDashboard, AppointmentError> {
        let query = AppointmentQuery::scoped(Scope::Patient(patient_id));
        let views = self.list_for_patient(&query).await?;
        Ok(patient_buckets(views, now))
    }

    pub async fn staff_dashboard(&self, staff_id: Uuid, now: DateTime<Utc>) -> Result<StaffDashboard, AppointmentError> {
        let query = AppointmentQuery::scoped(Scope::Staff(staff_id));
        let views = self.list_for_staff(&query).await?;
        Ok(staff_buckets(views, now, self.offset))
    }

    /// Rows for a patient-facing listing, labelled with staff names.
    pub async fn list_for_patient(&self, query: &AppointmentQuery) -> Result<Vec<AppointmentView>, AppointmentError> {
        let appointments = self.fetch(query).await?;

        let directory: HashMap<Uuid, _> = self.staff
            .list()
            .await
            .map_err(AppointmentError::database)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let staff = directory.get(&appointment.staff_id);
                AppointmentView {
                    staff_name: staff.map(|s| s.full_name()),
                    staff_role_title: staff.and_then(|s| s.role_title.clone()),
                    ..AppointmentView::bare(appointment)
                }
            })
            .collect())
    }

    /// Rows for a staff-facing listing, labelled with patient names.
    pub async fn list_for_staff(&self, query: &AppointmentQuery) -> Result<Vec<AppointmentView>, AppointmentError> {
        let appointments = self.fetch(query).await?;

        let mut patient_ids: Vec<Uuid> = appointments.iter().map(|a| a.patient_id).collect();
        patient_ids.sort();
        patient_ids.dedup();

        let names: HashMap<Uuid, String> = self.patients
            .get_many(&patient_ids)
            .await
            .map_err(AppointmentError::database)?
            .into_iter()
            .map(|p| (p.id, p.full_name()))
            .collect();

        Ok(appointments
            .into_iter()
            .map(|appointment| AppointmentView {
                patient_name: names.get(&appointment.patient_id).cloned(),
                ..AppointmentView::bare(appointment)
            })
            .collect())
    }

    async fn fetch(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments
            .list(query)
            .await
            .map_err(AppointmentError::database)?;
        debug!("Listing query returned {} appointment(s)", appointments.len());
        Ok(appointments)
    }
}
