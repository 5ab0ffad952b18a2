use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub travel_style: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default)]
    pub favorite_destinations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
}

impl User {
    /// Adds `style` if it is missing, removes it otherwise. Returns whether the
    /// style is selected afterwards.
    pub fn toggle_travel_style(&mut self, style: &str) -> bool {
        let styles = &mut self.preferences.travel_style;
        if let Some(pos) = styles.iter().position(|s| s == style) {
            styles.remove(pos);
            false
        } else {
            styles.push(style.to_string());
            true
        }
    }

    pub fn apply(&mut self, patch: ProfilePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(profile_image) = patch.profile_image {
            self.profile_image = Some(profile_image);
        }
        if let Some(bio) = patch.bio {
            self.bio = Some(bio);
        }
        if let Some(location) = patch.location {
            self.location = Some(location);
        }
        if let Some(preferences) = patch.preferences {
            self.preferences = preferences;
        }
    }
}

/// Stored account. The password hash never leaves the session service.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub preferences: Json<Preferences>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            profile_image: row.profile_image,
            bio: row.bio,
            location: row.location,
            preferences: row.preferences.0,
        }
    }
}

/// Partial profile update; `id` is not editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub preferences: Option<Preferences>,
}
