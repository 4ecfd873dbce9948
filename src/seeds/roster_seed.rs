use crate::config::RosterConfig;
use crate::models::{Role, User};
use crate::store::UserStore;
use crate::utils::AppError;

/// Email of the `n`th roster student, e.g. `24me001@charusat.edu.in`
pub fn roster_email(config: &RosterConfig, n: u32) -> String {
    format!("{}{:03}@{}", config.email_prefix, n, config.email_domain).to_lowercase()
}

async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::DatabaseError(format!("Hash task failed: {}", e)))?
        .map_err(|e| AppError::DatabaseError(format!("Password hashing failed: {}", e)))
}

/// Makes sure every roster student and the admin account exist.
/// Existing users are never touched, so the seed is safe to run on every boot.
/// Returns how many users were created.
pub async fn seed_roster(
    store: &dyn UserStore,
    config: &RosterConfig,
    bcrypt_cost: u32,
) -> Result<u32, AppError> {
    log::info!("🌱 Roster: ensuring {} students exist...", config.size);

    let mut created = 0;
    for n in 1..=config.size {
        let email = roster_email(config, n);
        if store.find_by_email(&email).await?.is_some() {
            continue;
        }

        let hash = hash_password(n.to_string(), bcrypt_cost).await?;
        let user = User::new(format!("Student {:03}", n), email, hash, Role::Student);
        store.insert_user(user).await?;
        created += 1;
    }

    if created > 0 {
        log::info!("   ✅ Created {} students", created);
    } else {
        log::info!("   ✅ Roster already complete - nothing to do");
    }

    match (&config.admin_password, store.find_by_email(&config.admin_email).await?) {
        (_, Some(_)) => log::info!("   ✅ Admin {} already exists", config.admin_email),
        (Some(password), None) => {
            let hash = hash_password(password.clone(), bcrypt_cost).await?;
            let admin = User::new(
                "System Admin".to_string(),
                config.admin_email.clone(),
                hash,
                Role::Admin,
            );
            store.insert_user(admin).await?;
            created += 1;
            log::info!("   ✅ Created admin {}", config.admin_email);
        }
        (None, None) => {
            log::warn!(
                "   ⚠️  ADMIN_PASSWORD not set - admin {} was not created",
                config.admin_email
            );
        }
    }

    Ok(created)
}
