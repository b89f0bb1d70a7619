use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database model for users table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserModel {
    pub id: i64,
    pub riot_id: String, // "<game_name>#<tag_line>", unique
    pub game_name: String,
    pub tag_line: String,
    pub puuid: Option<String>, // Unique when present
    pub email: String,
    pub avatar_url: Option<String>,
    pub is_pro: bool,
    pub region: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UserModel {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Insert payload; the store assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewUser {
    pub riot_id: String,
    pub game_name: String,
    pub tag_line: String,
    pub puuid: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
    pub is_pro: bool,
    pub region: String,
}

impl NewUser {
    pub fn into_model(self, id: i64) -> UserModel {
        let now = Utc::now();
        UserModel {
            id,
            riot_id: self.riot_id,
            game_name: self.game_name,
            tag_line: self.tag_line,
            puuid: self.puuid,
            email: self.email,
            avatar_url: self.avatar_url,
            is_pro: self.is_pro,
            region: self.region,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

pub fn riot_id_for(game_name: &str, tag_line: &str) -> String {
    format!("{}#{}", game_name, tag_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_riot_id_joins_name_and_tag() {
        assert_eq!(riot_id_for("Faker", "KR1"), "Faker#KR1");
    }

    #[test]
    fn test_deleted_at_is_not_exposed() {
        let mut user = NewUser {
            riot_id: "Faker#KR1".into(),
            game_name: "Faker".into(),
            tag_line: "KR1".into(),
            puuid: None,
            email: "faker@example.com".into(),
            avatar_url: None,
            is_pro: true,
            region: "KR".into(),
        }
        .into_model(7);
        user.deleted_at = Some(Utc::now());

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("deleted_at").is_none());
        assert_eq!(json["riot_id"], "Faker#KR1");
    }
}
