use crate::models::{MaterialsWrite, Role, User};
use crate::services::material_validator::{material_key, MaterialHolder};
use crate::store::UserStore;
use crate::utils::AppError;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;

const USERS: &str = "users";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Roster is ~120 users; a small pool is plenty
        client_options.max_pool_size = Some(10);
        client_options.min_pool_size = Some(1);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .rsplit('/')
            .next()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':') && !s.contains('@'))
            .unwrap_or("material-system");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;
        mongodb.backfill_material_keys().await?;

        Ok(mongodb)
    }

    /// Creates necessary indexes for the users collection
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<Document>(USERS);

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(email_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(email) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Conflict lookups go through material_keys instead of scanning every list
        let keys_index = IndexModel::builder()
            .keys(doc! { "material_keys": 1 })
            .build();

        match users.create_index(keys_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(material_keys)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let role_index = IndexModel::builder()
            .keys(doc! { "role": 1, "email": 1 })
            .build();

        match users.create_index(role_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(role, email)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    /// Documents written without `material_keys` would be invisible to the
    /// conflict lookup; derive the keys from `materials` for those.
    async fn backfill_material_keys(&self) -> Result<(), Box<dyn Error>> {
        let pipeline = vec![doc! {
            "$set": {
                "material_keys": {
                    "$map": {
                        "input": { "$ifNull": ["$materials", []] },
                        "as": "m",
                        "in": { "$toLower": { "$trim": { "input": "$$m" } } }
                    }
                }
            }
        }];

        let result = self
            .collection::<Document>(USERS)
            .update_many(doc! { "material_keys": { "$exists": false } }, pipeline)
            .await?;

        if result.modified_count > 0 {
            log::info!("🔧 Backfilled material_keys on {} users", result.modified_count);
        }
        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn users(&self) -> Collection<User> {
        self.collection::<User>(USERS)
    }
}

fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

#[async_trait]
impl UserStore for MongoDB {
    fn backend_tag(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.database().run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let Some(oid) = parse_id(id) else {
            return Ok(None);
        };
        Ok(self.users().find_one(doc! { "_id": oid }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.trim().to_lowercase();
        Ok(self.users().find_one(doc! { "email": email }).await?)
    }

    async fn list_students(&self) -> Result<Vec<User>, AppError> {
        let cursor = self
            .users()
            .find(doc! { "role": Role::Student.to_string() })
            .sort(doc! { "email": 1 })
            .await?;
        let students: Vec<User> = cursor.try_collect().await?;
        Ok(students)
    }

    async fn material_holders(
        &self,
        keys: &[String],
        exclude_id: Option<&str>,
    ) -> Result<Vec<MaterialHolder>, AppError> {
        let mut filter = doc! { "material_keys": { "$in": keys.to_vec() } };
        if let Some(oid) = exclude_id.and_then(parse_id) {
            filter.insert("_id", doc! { "$ne": oid });
        }

        let cursor = self.users().find(filter).await?;
        let users: Vec<User> = cursor.try_collect().await?;

        Ok(users
            .into_iter()
            .map(|u| MaterialHolder {
                user_id: u.id_hex(),
                name: u.name,
                materials: u.materials,
            })
            .collect())
    }

    async fn all_materials(&self) -> Result<Vec<String>, AppError> {
        let cursor = self
            .users()
            .find(doc! { "materials.0": { "$exists": true } })
            .await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users.into_iter().flat_map(|u| u.materials).collect())
    }

    async fn write_materials(&self, id: &str, write: MaterialsWrite) -> Result<User, AppError> {
        let oid = parse_id(id).ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;

        let mut filter = doc! { "_id": oid };
        if write.require_unsubmitted {
            filter.insert("has_submitted", doc! { "$ne": true });
        }

        let keys: Vec<String> = write.materials.iter().map(|m| material_key(m)).collect();
        let mut set = doc! {
            "materials": write.materials.clone(),
            "material_keys": keys,
            "has_submitted": write.has_submitted,
            "updated_at": chrono::Utc::now().timestamp(),
        };
        if let Some(ts) = write.materials_updated_at {
            set.insert("materials_updated_at", ts);
        }

        let updated = self
            .users()
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;

        if let Some(user) = updated {
            return Ok(user);
        }

        // Filter missed: either the user is gone or the lock was already taken
        if write.require_unsubmitted && self.find_by_id(id).await?.is_some() {
            return Err(AppError::AlreadySubmitted);
        }
        Err(AppError::NotFound(format!("user {}", id)))
    }

    async fn insert_user(&self, mut user: User) -> Result<String, AppError> {
        user.material_keys = user.materials.iter().map(|m| material_key(m)).collect();
        let result = self.users().insert_one(&user).await?;
        Ok(result
            .inserted_id
            .as_object_id()
            .map(|oid| oid.to_hex())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/material-system-test".to_string());

        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
        assert!(db.unwrap().ping().await.is_ok());
    }
}
