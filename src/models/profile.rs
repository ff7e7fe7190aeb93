// src/models/profile.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One patient profile row. At most one exists per email.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i32,
    pub account_id: Option<i32>,
    pub email: String,
    pub username: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub ethnicity: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub user_group: Option<String>,
    pub appointment: Option<String>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Profile {
    /// Placeholder shown when the stored profile cannot be fetched.
    pub fn fallback() -> Self {
        Profile {
            username: Some("Guest".to_string()),
            user_group: Some("patient".to_string()),
            ..Default::default()
        }
    }
}

/// Editable profile fields. Under `apply_to` a `None` keeps the stored value;
/// under `overwrite` it clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment: Option<String>,
}

impl ProfileUpdate {
    /// Overwrites the fields of `profile` that this update carries.
    pub fn apply_to(&self, profile: &mut Profile) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }
        set(&mut profile.username, &self.username);
        set(&mut profile.diagnosis, &self.diagnosis);
        set(&mut profile.prescription, &self.prescription);
        set(&mut profile.age, &self.age);
        set(&mut profile.gender, &self.gender);
        set(&mut profile.ethnicity, &self.ethnicity);
        set(&mut profile.phone, &self.phone);
        set(&mut profile.notes, &self.notes);
        set(&mut profile.user_group, &self.user_group);
        set(&mut profile.appointment, &self.appointment);
    }

    /// Makes `profile` carry exactly these fields; `None` clears the stored value.
    pub fn overwrite(&self, profile: &mut Profile) {
        profile.username = self.username.clone();
        profile.diagnosis = self.diagnosis.clone();
        profile.prescription = self.prescription.clone();
        profile.age = self.age;
        profile.gender = self.gender.clone();
        profile.ethnicity = self.ethnicity.clone();
        profile.phone = self.phone.clone();
        profile.notes = self.notes.clone();
        profile.user_group = self.user_group.clone();
        profile.appointment = self.appointment.clone();
    }
}

/// Body of `PUT /profile`: the account id plus any subset of profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub id: i32,
    #[serde(flatten)]
    pub fields: ProfileUpdate,
}

/// Body of `POST /api/createDetails` and `POST /api/update-details`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetailsRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub prescription: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, rename = "User_Group")]
    pub user_group: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub appointment: Option<String>,
}

impl From<DetailsRequest> for ProfileUpdate {
    fn from(req: DetailsRequest) -> Self {
        ProfileUpdate {
            username: req.name,
            diagnosis: req.diagnosis,
            prescription: req.prescription,
            age: req.age,
            gender: req.gender,
            ethnicity: req.ethnicity,
            phone: req.phone,
            notes: req.notes,
            user_group: req.user_group,
            appointment: req.appointment,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub id: i32,
}
