use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub referral_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on `on`. `None` without a date of birth or when
    /// `on` precedes it.
    pub fn age_on(&self, on: Date) -> Option<i16> {
        let dob = self.date_of_birth?;
        if on < dob {
            return None;
        }
        let mut years = on.year() - dob.year();
        if (on.month(), on.day()) < (dob.month(), dob.day()) {
            years -= 1;
        }
        Some(years)
    }

    /// Apply an update payload, bumping `updated_at`.
    pub fn apply(&mut self, update: PatientFields) -> Result<(), CoreError> {
        update.validate()?;
        self.first_name = update.first_name.trim().to_string();
        self.last_name = update.last_name.trim().to_string();
        self.date_of_birth = update.date_of_birth;
        self.gender = update.gender;
        self.email = update.email;
        self.phone = update.phone;
        self.referral_reason = update.referral_reason;
        self.notes = update.notes;
        self.updated_at = jiff::Timestamp::now();
        Ok(())
    }
}

/// Client-supplied patient fields, used for both create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PatientFields {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<Date>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub referral_reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PatientFields {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.first_name.trim().is_empty() {
            return Err(CoreError::MissingField("first_name".to_string()));
        }
        if self.last_name.trim().is_empty() {
            return Err(CoreError::MissingField("last_name".to_string()));
        }
        Ok(())
    }

    pub fn into_patient(self) -> Result<Patient, CoreError> {
        self.validate()?;
        let now = jiff::Timestamp::now();
        Ok(Patient {
            id: Uuid::new_v4(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            email: self.email,
            phone: self.phone,
            referral_reason: self.referral_reason,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        })
    }
}
