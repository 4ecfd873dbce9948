// Persistence seam for users. `MongoDB` is the production implementation,
// `MemoryStore` backs tests and local runs without a database.

pub mod memory;

use crate::models::{MaterialsWrite, User};
use crate::services::material_validator::MaterialHolder;
use crate::utils::AppError;
use async_trait::async_trait;

pub use memory::MemoryStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn ping(&self) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    /// `email` is matched after trimming and lower-casing
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Students only, sorted by email
    async fn list_students(&self) -> Result<Vec<User>, AppError>;

    /// Users (other than `exclude_id`) holding at least one of `keys`
    async fn material_holders(
        &self,
        keys: &[String],
        exclude_id: Option<&str>,
    ) -> Result<Vec<MaterialHolder>, AppError>;

    /// Every stored material across all users
    async fn all_materials(&self) -> Result<Vec<String>, AppError>;

    /// Replaces the user's list and recomputes `material_keys`.
    /// Fails with `AlreadySubmitted` when `require_unsubmitted` is set and the
    /// user has already submitted.
    async fn write_materials(&self, id: &str, write: MaterialsWrite) -> Result<User, AppError>;

    /// Returns the new user's id
    async fn insert_user(&self, user: User) -> Result<String, AppError>;
}
