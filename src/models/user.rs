use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Closed set of roles; every role branch is an exhaustive match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// User document (collection `users`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub name: String,

    /// Always stored lower-cased
    pub email: String,

    /// bcrypt hash
    pub password: String,

    #[serde(default)]
    pub role: Role,

    /// One-way flag set by the first successful submission
    #[serde(default)]
    pub has_submitted: bool,

    /// Either empty or exactly 15 trimmed items
    #[serde(default)]
    pub materials: Vec<String>,

    /// Case-folded copies of `materials`, maintained by the store
    #[serde(default)]
    pub material_keys: Vec<String>,

    /// Unix timestamp of the last edit after the first submission
    #[serde(default)]
    pub materials_updated_at: Option<i64>,

    #[serde(default)]
    pub created_at: i64,

    #[serde(default)]
    pub updated_at: i64,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            name,
            email: email.trim().to_lowercase(),
            password: password_hash,
            role,
            has_submitted: false,
            materials: Vec::new(),
            material_keys: Vec::new(),
            materials_updated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// Write applied by the submission state updater
#[derive(Debug, Clone)]
pub struct MaterialsWrite {
    pub materials: Vec<String>,
    pub has_submitted: bool,
    /// `Some` on every edit path, `None` on the first submission
    pub materials_updated_at: Option<i64>,
    /// Only write if the user has not submitted yet (first-submission lock)
    pub require_unsubmitted: bool,
}

/// User as returned by the API (no password hash)
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub has_submitted: bool,
    pub materials: Vec<String>,
    pub materials_updated_at: Option<i64>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id_hex(),
            name: user.name,
            email: user.email,
            role: user.role,
            has_submitted: user.has_submitted,
            materials: user.materials,
            materials_updated_at: user.materials_updated_at,
        }
    }
}

/// Request body for POST/PUT of a material list
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MaterialsRequest {
    pub materials: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MaterialsResponse {
    pub success: bool,
    pub has_submitted: bool,
    pub materials: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materials_updated_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, Role::Student);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let user: User = serde_json::from_value(serde_json::json!({
            "name": "Student 001",
            "email": "24me001@charusat.edu.in",
            "password": "hash"
        }))
        .unwrap();
        assert_eq!(user.role, Role::Student);
        assert!(!user.has_submitted);
        assert!(user.materials.is_empty());
    }

    #[test]
    fn test_response_hides_password() {
        let user = User::new(
            "Student 001".into(),
            " 24ME001@charusat.edu.in ".into(),
            "hash".into(),
            Role::Student,
        );
        assert_eq!(user.email, "24me001@charusat.edu.in");
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password").is_none());
    }
}
