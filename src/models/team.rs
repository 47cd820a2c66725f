use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use super::user::UserProfile;

/// The scalar, caller-editable part of a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamFields {
    pub name: String,
    pub description: Option<String>,
}

/// A team with its current members.
///
/// Membership is derived from `users.team_id`; there is no separate join table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<UserProfile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn fields(&self) -> TeamFields {
        TeamFields {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    pub fn member_ids(&self) -> Vec<i32> {
        self.members.iter().map(|u| u.id).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTeamInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl From<CreateTeamInput> for TeamFields {
    fn from(input: CreateTeamInput) -> Self {
        Self {
            name: input.name,
            description: input.description,
        }
    }
}

/// Partial update for a team. Absent fields are left untouched.
///
/// `description` distinguishes an absent key (`None`) from an explicit
/// `null` (`Some(None)`), which clears the description.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTeamInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    #[validate(length(max = 2000))]
    pub description: Option<Option<String>>,
}

impl UpdateTeamInput {
    pub fn apply(&self, fields: &mut TeamFields) {
        if let Some(name) = &self.name {
            fields.name = name.clone();
        }
        if let Some(description) = &self.description {
            fields.description = description.clone();
        }
    }
}

/// Wraps whatever was sent, `null` included, so only a missing key stays `None`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Body of `POST /teams/{id}/members`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersInput {
    pub user_ids: Vec<i32>,
}
