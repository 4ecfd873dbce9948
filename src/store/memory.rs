use super::UserStore;
use crate::models::{MaterialsWrite, Role, User};
use crate::services::material_validator::{material_key, MaterialHolder};
use crate::utils::AppError;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id_hex() == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.trim().to_lowercase();
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_students(&self) -> Result<Vec<User>, AppError> {
        let users = self.users.read().await;
        let mut students: Vec<User> = users
            .iter()
            .filter(|u| u.role == Role::Student)
            .cloned()
            .collect();
        students.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(students)
    }

    async fn material_holders(
        &self,
        keys: &[String],
        exclude_id: Option<&str>,
    ) -> Result<Vec<MaterialHolder>, AppError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| Some(u.id_hex().as_str()) != exclude_id)
            .filter(|u| u.material_keys.iter().any(|k| keys.contains(k)))
            .map(|u| MaterialHolder {
                user_id: u.id_hex(),
                name: u.name.clone(),
                materials: u.materials.clone(),
            })
            .collect())
    }

    async fn all_materials(&self) -> Result<Vec<String>, AppError> {
        let users = self.users.read().await;
        Ok(users.iter().flat_map(|u| u.materials.iter().cloned()).collect())
    }

    async fn write_materials(&self, id: &str, write: MaterialsWrite) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id_hex() == id)
            .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;

        if write.require_unsubmitted && user.has_submitted {
            return Err(AppError::AlreadySubmitted);
        }

        user.material_keys = write.materials.iter().map(|m| material_key(m)).collect();
        user.materials = write.materials;
        user.has_submitted = write.has_submitted;
        if write.materials_updated_at.is_some() {
            user.materials_updated_at = write.materials_updated_at;
        }
        user.updated_at = chrono::Utc::now().timestamp();

        Ok(user.clone())
    }

    async fn insert_user(&self, mut user: User) -> Result<String, AppError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::InvalidRequest(format!(
                "user {} already exists",
                user.email
            )));
        }
        let id = ObjectId::new();
        user.id = Some(id);
        user.material_keys = user.materials.iter().map(|m| material_key(m)).collect();
        users.push(user);
        Ok(id.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_holders_exclude_self_and_match_keys() {
        let store = MemoryStore::new();
        let a = store
            .insert_user(User::new("A".into(), "a@x.edu".into(), "h".into(), Role::Student))
            .await
            .unwrap();
        let b = store
            .insert_user(User::new("B".into(), "b@x.edu".into(), "h".into(), Role::Student))
            .await
            .unwrap();

        for (id, item) in [(&a, "Copper"), (&b, "Tin")] {
            store
                .write_materials(
                    id,
                    MaterialsWrite {
                        materials: vec![item.to_string()],
                        has_submitted: true,
                        materials_updated_at: None,
                        require_unsubmitted: false,
                    },
                )
                .await
                .unwrap();
        }

        let keys = vec!["copper".to_string(), "tin".to_string()];
        let holders = store.material_holders(&keys, Some(&a)).await.unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].name, "B");
    }

    #[tokio::test]
    async fn test_insert_derives_keys_from_materials() {
        let store = MemoryStore::new();
        let mut user = User::new("A".into(), "a@x.edu".into(), "h".into(), Role::Student);
        user.materials = vec!["  Copper ".to_string()];
        user.material_keys = Vec::new();
        store.insert_user(user).await.unwrap();

        let holders = store
            .material_holders(&["copper".to_string()], None)
            .await
            .unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].name, "A");
    }

    #[tokio::test]
    async fn test_rejects_duplicate_email() {
        let store = MemoryStore::new();
        let user = User::new("A".into(), "a@x.edu".into(), "h".into(), Role::Student);
        store.insert_user(user.clone()).await.unwrap();
        assert!(store.insert_user(user).await.is_err());
    }
}
