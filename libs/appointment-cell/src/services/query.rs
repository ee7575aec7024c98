use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use shared_database::QueryParams;

use crate::models::{Appointment, AppointmentError, AppointmentFilterForm, AppointmentStatus};

/// Whose appointments a query may ever see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Patient(Uuid),
    Staff(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpperBound {
    Inclusive(DateTime<Utc>),
    Exclusive(DateTime<Utc>),
}

impl UpperBound {
    fn instant(&self) -> DateTime<Utc> {
        match self {
            UpperBound::Inclusive(t) | UpperBound::Exclusive(t) => *t,
        }
    }

    fn admits(&self, t: DateTime<Utc>) -> bool {
        match self {
            UpperBound::Inclusive(bound) => t <= *bound,
            UpperBound::Exclusive(bound) => t < *bound,
        }
    }
}

/// A compiled appointment query. Every populated field is one ANDed predicate;
/// values only ever travel as bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentQuery {
    pub scope: Scope,
    pub patient_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<UpperBound>,
    pub status: Option<AppointmentStatus>,
    pub keyword: Option<String>,
}

impl AppointmentQuery {
    /// Everything visible to `scope`, oldest first.
    pub fn scoped(scope: Scope) -> Self {
        Self {
            scope,
            patient_id: None,
            staff_id: None,
            from: None,
            to: None,
            status: None,
            keyword: None,
        }
    }

    /// Compiles a submitted filter form under `scope`. Date-only bounds are
    /// clinic-local calendar days in `offset`.
    pub fn compose(
        scope: Scope,
        form: &AppointmentFilterForm,
        offset: FixedOffset,
    ) -> Result<Self, AppointmentError> {
        let mut query = Self::scoped(scope);

        if let Some(raw) = present(&form.date_from) {
            query.from = Some(
                parse_lower_bound(raw, offset)
                    .ok_or_else(|| invalid("Invalid from date."))?,
            );
        }

        if let Some(raw) = present(&form.date_to) {
            query.to = Some(
                parse_upper_bound(raw, offset)
                    .ok_or_else(|| invalid("Invalid to date."))?,
            );
        }

        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to.instant() {
                return Err(invalid("From date must be before to date."));
            }
        }

        if let Some(raw) = present(&form.staff_id) {
            query.staff_id = Some(Uuid::parse_str(raw).map_err(|_| invalid("Invalid staff member."))?);
        }

        if let Some(raw) = present(&form.status) {
            query.status = Some(raw.parse()?);
        }

        query.keyword = present(&form.keyword).map(str::to_string);

        Ok(query)
    }

    pub fn with_patient(mut self, patient_id: Uuid) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    pub fn to_query_params(&self) -> QueryParams {
        let mut params: QueryParams = Vec::new();

        match self.scope {
            Scope::Patient(id) => params.push(("patient_id".to_string(), format!("eq.{}", id))),
            Scope::Staff(id) => params.push(("staff_id".to_string(), format!("eq.{}", id))),
        }
        if let Some(id) = self.patient_id {
            params.push(("patient_id".to_string(), format!("eq.{}", id)));
        }
        if let Some(id) = self.staff_id {
            params.push(("staff_id".to_string(), format!("eq.{}", id)));
        }
        if let Some(from) = self.from {
            params.push(("appointment_date".to_string(), format!("gte.{}", from.to_rfc3339())));
        }
        match self.to {
            Some(UpperBound::Inclusive(t)) => {
                params.push(("appointment_date".to_string(), format!("lte.{}", t.to_rfc3339())))
            }
            Some(UpperBound::Exclusive(t)) => {
                params.push(("appointment_date".to_string(), format!("lt.{}", t.to_rfc3339())))
            }
            None => {}
        }
        if let Some(status) = self.status {
            params.push(("status".to_string(), format!("eq.{}", status)));
        }
        if let Some(keyword) = &self.keyword {
            params.push(("reason".to_string(), format!("ilike.*{}*", keyword)));
        }

        params.push(("order".to_string(), "appointment_date.asc".to_string()));

        params
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        let in_scope = match self.scope {
            Scope::Patient(id) => appointment.patient_id == id,
            Scope::Staff(id) => appointment.staff_id == id,
        };

        in_scope
            && self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.staff_id.map_or(true, |id| appointment.staff_id == id)
            && self.from.map_or(true, |from| appointment.appointment_date >= from)
            && self.to.map_or(true, |to| to.admits(appointment.appointment_date))
            && self.status.map_or(true, |status| appointment.status == status)
            && self.keyword.as_ref().map_or(true, |kw| {
                appointment.reason.to_lowercase().contains(&kw.to_lowercase())
            })
    }

    pub fn sort(&self, appointments: &mut [Appointment]) {
        appointments.sort_by_key(|a| a.appointment_date);
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(message: &str) -> AppointmentError {
    AppointmentError::ValidationError(message.to_string())
}

/// Midnight starting `date` in the clinic's zone.
pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    offset
        .from_local_datetime(&midnight)
        .single()
        .map(|t| t.with_timezone(&Utc))
}

fn parse_lower_bound(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return start_of_day(date, offset);
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc))
}

fn parse_upper_bound(raw: &str, offset: FixedOffset) -> Option<UpperBound> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return start_of_day(date.succ_opt()?, offset).map(UpperBound::Exclusive);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| UpperBound::Inclusive(t.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn appointment(patient_id: Uuid, staff_id: Uuid, date: &str, reason: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            staff_id,
            appointment_date: DateTime::parse_from_rfc3339(date).unwrap().with_timezone(&Utc),
            reason: reason.to_string(),
            status: AppointmentStatus::Booked,
        }
    }

    #[test]
    fn test_no_filters_only_scopes_and_orders() {
        let patient_id = Uuid::new_v4();
        let query = AppointmentQuery::compose(
            Scope::Patient(patient_id),
            &AppointmentFilterForm::default(),
            utc(),
        )
        .unwrap();

        assert_eq!(
            query.to_query_params(),
            vec![
                ("patient_id".to_string(), format!("eq.{}", patient_id)),
                ("order".to_string(), "appointment_date.asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_each_filter_adds_one_predicate() {
        let staff_id = Uuid::new_v4();
        let form = AppointmentFilterForm {
            date_from: Some("2025-03-01".to_string()),
            date_to: Some("2025-03-31".to_string()),
            staff_id: Some(staff_id.to_string()),
            status: Some("booked".to_string()),
            keyword: Some("knee".to_string()),
        };

        let params = AppointmentQuery::compose(Scope::Patient(Uuid::new_v4()), &form, utc())
            .unwrap()
            .to_query_params();

        assert_eq!(params.len(), 7);
        assert!(params.contains(&("appointment_date".to_string(), "gte.2025-03-01T00:00:00+00:00".to_string())));
        assert!(params.contains(&("appointment_date".to_string(), "lt.2025-04-01T00:00:00+00:00".to_string())));
        assert!(params.contains(&("staff_id".to_string(), format!("eq.{}", staff_id))));
        assert!(params.contains(&("status".to_string(), "eq.booked".to_string())));
        assert!(params.contains(&("reason".to_string(), "ilike.*knee*".to_string())));
    }

    #[test]
    fn test_blank_fields_are_absent() {
        let form = AppointmentFilterForm {
            date_from: Some("".to_string()),
            staff_id: Some("   ".to_string()),
            keyword: Some("".to_string()),
            ..Default::default()
        };

        let query = AppointmentQuery::compose(Scope::Staff(Uuid::new_v4()), &form, utc()).unwrap();
        assert_eq!(query.to_query_params().len(), 2);
    }

    #[test]
    fn test_rejects_bad_input_before_execution() {
        let scope = Scope::Patient(Uuid::new_v4());
        let compose = |form: AppointmentFilterForm| AppointmentQuery::compose(scope, &form, utc());

        assert_matches!(
            compose(AppointmentFilterForm { status: Some("archived".to_string()), ..Default::default() }),
            Err(AppointmentError::ValidationError(_))
        );
        assert_matches!(
            compose(AppointmentFilterForm { date_from: Some("03/01/2025".to_string()), ..Default::default() }),
            Err(AppointmentError::ValidationError(msg)) if msg == "Invalid from date."
        );
        assert_matches!(
            compose(AppointmentFilterForm { staff_id: Some("dr-who".to_string()), ..Default::default() }),
            Err(AppointmentError::ValidationError(msg)) if msg == "Invalid staff member."
        );
        assert_matches!(
            compose(AppointmentFilterForm {
                date_from: Some("2025-03-10".to_string()),
                date_to: Some("2025-03-01".to_string()),
                ..Default::default()
            }),
            Err(AppointmentError::ValidationError(msg)) if msg == "From date must be before to date."
        );
    }

    #[test]
    fn test_date_only_bounds_follow_clinic_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let form = AppointmentFilterForm {
            date_from: Some("2025-03-01".to_string()),
            date_to: Some("2025-03-01".to_string()),
            ..Default::default()
        };

        let query = AppointmentQuery::compose(Scope::Patient(Uuid::new_v4()), &form, plus_two).unwrap();
        let expected_from = DateTime::parse_from_rfc3339("2025-02-28T22:00:00Z").unwrap().with_timezone(&Utc);

        assert_eq!(query.from, Some(expected_from));
        assert_eq!(query.to, Some(UpperBound::Exclusive(expected_from + Duration::days(1))));
    }

    #[test]
    fn test_matches_agrees_with_predicates() {
        let patient_id = Uuid::new_v4();
        let staff_id = Uuid::new_v4();
        let form = AppointmentFilterForm {
            date_to: Some("2025-03-01".to_string()),
            keyword: Some("KNEE".to_string()),
            ..Default::default()
        };
        let query = AppointmentQuery::compose(Scope::Patient(patient_id), &form, utc()).unwrap();

        assert!(query.matches(&appointment(patient_id, staff_id, "2025-03-01T23:59:00Z", "Knee pain")));
        assert!(!query.matches(&appointment(patient_id, staff_id, "2025-03-02T00:00:00Z", "Knee pain")));
        assert!(!query.matches(&appointment(patient_id, staff_id, "2025-02-01T10:00:00Z", "Flu")));
        assert!(!query.matches(&appointment(Uuid::new_v4(), staff_id, "2025-02-01T10:00:00Z", "Knee")));
    }

    #[test]
    fn test_keyword_is_bound_not_interpolated() {
        let form = AppointmentFilterForm {
            keyword: Some("x&status=eq.cancelled".to_string()),
            ..Default::default()
        };
        let params = AppointmentQuery::compose(Scope::Patient(Uuid::new_v4()), &form, utc())
            .unwrap()
            .to_query_params();

        assert!(params.contains(&("reason".to_string(), "ilike.*x&status=eq.cancelled*".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "status"));
    }
}
