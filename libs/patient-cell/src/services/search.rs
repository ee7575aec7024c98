use shared_database::QueryParams;

use crate::models::{Patient, PatientSearchForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientField {
    FirstName,
    LastName,
    Email,
    Phone,
    Notes,
}

impl PatientField {
    pub fn column(&self) -> &'static str {
        match self {
            PatientField::FirstName => "first_name",
            PatientField::LastName => "last_name",
            PatientField::Email => "email",
            PatientField::Phone => "phone",
            PatientField::Notes => "notes",
        }
    }

    fn value<'a>(&self, patient: &'a Patient) -> Option<&'a str> {
        match self {
            PatientField::FirstName => Some(&patient.first_name),
            PatientField::LastName => Some(&patient.last_name),
            PatientField::Email => Some(&patient.email),
            PatientField::Phone => patient.phone.as_deref(),
            PatientField::Notes => patient.notes.as_deref(),
        }
    }
}

/// Case-insensitive substring match of one patient column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contains {
    pub field: PatientField,
    pub needle: String,
}

/// Compiled patient search: ANDed substring predicates, ordered by
/// (last_name, first_name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientSearch {
    pub predicates: Vec<Contains>,
}

impl PatientSearch {
    pub fn from_form(form: &PatientSearchForm) -> Self {
        let candidates = [
            (PatientField::FirstName, &form.first_name),
            (PatientField::LastName, &form.last_name),
            (PatientField::Email, &form.email),
            (PatientField::Phone, &form.phone),
            (PatientField::Notes, &form.notes),
        ];

        let predicates = candidates
            .into_iter()
            .filter_map(|(field, value)| {
                let needle = value.as_deref()?.trim();
                (!needle.is_empty()).then(|| Contains {
                    field,
                    needle: needle.to_string(),
                })
            })
            .collect();

        Self { predicates }
    }

    pub fn to_query_params(&self) -> QueryParams {
        let mut params: QueryParams = self
            .predicates
            .iter()
            .map(|p| (p.field.column().to_string(), format!("ilike.*{}*", p.needle)))
            .collect();

        params.push(("order".to_string(), "last_name.asc,first_name.asc".to_string()));
        params
    }

    pub fn matches(&self, patient: &Patient) -> bool {
        self.predicates.iter().all(|p| {
            p.field
                .value(patient)
                .map(|v| v.to_lowercase().contains(&p.needle.to_lowercase()))
                .unwrap_or(false)
        })
    }
}
