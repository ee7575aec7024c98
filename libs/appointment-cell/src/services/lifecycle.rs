use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use patient_cell::services::PatientRepository;
use shared_models::auth::{Principal, Role};
use staff_cell::services::StaffRepository;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentForm, NewAppointment,
    MAX_REASON_LENGTH,
};
use crate::services::repository::AppointmentRepository;

/// Allowed status moves. `booked → completed` is the sweep's; cancelling is the
/// only manual move and applies to swept appointments too. `cancelled` is terminal.
pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    matches!(
        (from, to),
        (AppointmentStatus::Booked, AppointmentStatus::Completed)
            | (AppointmentStatus::Booked, AppointmentStatus::Cancelled)
            | (AppointmentStatus::Completed, AppointmentStatus::Cancelled)
    )
}

const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Accepts RFC 3339, or a `datetime-local` style value read in the clinic's zone.
pub fn parse_appointment_date(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }

    LOCAL_FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(raw, format).ok()?;
        offset
            .from_local_datetime(&naive)
            .single()
            .map(|t| t.with_timezone(&Utc))
    })
}

pub struct AppointmentLifecycleService {
    appointments: Arc<dyn AppointmentRepository>,
    patients: Arc<dyn PatientRepository>,
    staff: Arc<dyn StaffRepository>,
    offset: FixedOffset,
}

impl AppointmentLifecycleService {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        patients: Arc<dyn PatientRepository>,
        staff: Arc<dyn StaffRepository>,
        offset: FixedOffset,
    ) -> Self {
        Self { appointments, patients, staff, offset }
    }

    /// Validates the form in order, first failure wins, then inserts a
    /// `booked` row. Nothing is written on failure.
    pub async fn book(
        &self,
        patient_id: Uuid,
        form: &BookAppointmentForm,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        self.patients
            .get(patient_id)
            .await
            .map_err(AppointmentError::database)?
            .ok_or(AppointmentError::PatientNotFound)?;

        let staff_id = self.validate_staff(&form.staff_id).await?;

        let appointment_date = parse_appointment_date(&form.appointment_date, self.offset)
            .ok_or_else(|| invalid("Please choose a valid date and time."))?;
        if appointment_date <= now {
            return Err(invalid("Cannot book an appointment in the past."));
        }

        let reason = form.reason.trim();
        if reason.is_empty() {
            return Err(invalid("Please enter a reason for the appointment."));
        }
        if reason.chars().count() > MAX_REASON_LENGTH {
            return Err(invalid("Reason must be 255 characters or fewer."));
        }

        let appointment = self.appointments
            .insert(NewAppointment {
                patient_id,
                staff_id,
                appointment_date,
                reason: reason.to_string(),
                status: AppointmentStatus::Booked,
            })
            .await
            .map_err(AppointmentError::database)?;

        info!("Booked appointment {} for patient {} with staff {}", appointment.id, patient_id, staff_id);
        Ok(appointment)
    }

    async fn validate_staff(&self, raw: &str) -> Result<Uuid, AppointmentError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid("Please select a staff member."));
        }

        let staff_id = Uuid::parse_str(raw)
            .map_err(|_| invalid("Selected staff member does not exist."))?;

        self.staff
            .get(staff_id)
            .await
            .map_err(AppointmentError::database)?
            .ok_or_else(|| invalid("Selected staff member does not exist."))?;

        Ok(staff_id)
    }

    /// Cancels on behalf of `actor`. Ownership is checked before anything
    /// about the appointment's status or date is revealed.
    pub async fn cancel(
        &self,
        actor: &Principal,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.appointments
            .get(appointment_id)
            .await
            .map_err(AppointmentError::database)?
            .ok_or(AppointmentError::NotFound)?;

        let owner = match actor.role {
            Role::Patient => appointment.patient_id,
            Role::Staff => appointment.staff_id,
        };
        if owner != actor.profile_id {
            warn!("{} {} tried to cancel appointment {} they do not own", actor.role, actor.profile_id, appointment_id);
            return Err(AppointmentError::Forbidden);
        }

        if actor.role == Role::Staff && appointment.appointment_date <= now {
            return Err(AppointmentError::InvalidTransition(
                "Past appointments cannot be cancelled.".to_string(),
            ));
        }

        if appointment.status == AppointmentStatus::Cancelled {
            debug!("Appointment {} already cancelled", appointment_id);
            return Ok(appointment);
        }

        if !can_transition(appointment.status, AppointmentStatus::Cancelled) {
            return Err(AppointmentError::InvalidTransition(format!(
                "A {} appointment cannot be cancelled.",
                appointment.status
            )));
        }

        let cancelled = self.appointments
            .set_status(appointment_id, AppointmentStatus::Cancelled)
            .await
            .map_err(AppointmentError::database)?
            .ok_or(AppointmentError::NotFound)?;

        info!("Appointment {} cancelled by {} {}", appointment_id, actor.role, actor.profile_id);
        Ok(cancelled)
    }

    /// Marks every elapsed `booked` appointment `completed`.
    pub async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<usize, AppointmentError> {
        let touched = self.appointments
            .complete_elapsed(now)
            .await
            .map_err(AppointmentError::database)?;

        if touched > 0 {
            info!("Completion sweep marked {} appointment(s) completed", touched);
        }
        Ok(touched)
    }
}

fn invalid(message: &str) -> AppointmentError {
    AppointmentError::ValidationError(message.to_string())
}
