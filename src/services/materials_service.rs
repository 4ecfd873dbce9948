// ==================== MATERIAL SUBMISSIONS ====================
// First submission and edits for students; the shared edit path is also
// used by the admin console and the bulk import.

use crate::{
    api::metrics,
    models::{MaterialsResponse, MaterialsWrite, Role, User},
    services::{
        auth_service::AuthContext,
        material_validator::{find_conflicts, material_key, search_key, validate_list, Conflict},
    },
    state::AppState,
    store::UserStore,
    utils::AppError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    /// No stored material has the same normalized form
    pub available: bool,
    /// Stored materials that loosely contain the query
    pub matches: Vec<String>,
}

fn require_student(ctx: &AuthContext) -> Result<(), AppError> {
    match ctx.role {
        Role::Student => Ok(()),
        Role::Admin => Err(AppError::Forbidden(
            "Admins manage material lists through the admin console".to_string(),
        )),
    }
}

/// Students learn which of their items are taken, not who holds them
fn hide_holders(err: AppError) -> AppError {
    match err {
        AppError::Conflict(conflicts) => AppError::Conflict(
            conflicts
                .into_iter()
                .map(|c| Conflict {
                    claimed_by: Vec::new(),
                    ..c
                })
                .collect(),
        ),
        other => other,
    }
}

/// Validates `raw` and checks it against every other user's stored list.
/// `exclude_id` keeps the target's own list out of the comparison pool.
pub async fn validate_against_store(
    store: &dyn UserStore,
    raw: &[String],
    exclude_id: Option<&str>,
) -> Result<Vec<String>, AppError> {
    let materials = validate_list(raw)?;

    let keys: Vec<String> = materials.iter().map(|m| material_key(m)).collect();
    let holders = store.material_holders(&keys, exclude_id).await?;
    let conflicts = find_conflicts(&materials, &holders);

    if !conflicts.is_empty() {
        for holder in &holders {
            log::debug!("   conflicting holder: {} ({})", holder.name, holder.user_id);
        }
        metrics::increment_conflict_count();
        return Err(AppError::Conflict(conflicts));
    }

    Ok(materials)
}

/// Edit path: validate with the target excluded, replace the list and stamp
/// the update time. The caller must hold `submission_lock`.
pub async fn apply_edit(
    store: &dyn UserStore,
    target: &User,
    raw: &[String],
) -> Result<User, AppError> {
    let target_id = target.id_hex();
    let materials = validate_against_store(store, raw, Some(&target_id)).await?;

    store
        .write_materials(
            &target_id,
            MaterialsWrite {
                materials,
                has_submitted: true,
                materials_updated_at: Some(chrono::Utc::now().timestamp()),
                require_unsubmitted: false,
            },
        )
        .await
}

/// GET /api/materials
pub async fn get_my_materials(
    state: &AppState,
    ctx: &AuthContext,
) -> Result<MaterialsResponse, AppError> {
    let user = state
        .store
        .find_by_id(&ctx.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(MaterialsResponse {
        success: true,
        has_submitted: user.has_submitted,
        materials: user.materials,
        materials_updated_at: user.materials_updated_at,
        message: None,
    })
}

/// POST /api/materials - first submission, allowed once
pub async fn submit_materials(
    state: &AppState,
    ctx: &AuthContext,
    raw: &[String],
) -> Result<User, AppError> {
    require_student(ctx)?;
    let store = state.store.as_ref();

    let _guard = state.submission_lock.lock().await;

    let user = store
        .find_by_id(&ctx.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    // Lock first: a repeated first submission fails whatever its content
    if user.has_submitted {
        return Err(AppError::AlreadySubmitted);
    }

    let materials = validate_against_store(store, raw, None)
        .await
        .map_err(hide_holders)?;

    let saved = store
        .write_materials(
            &ctx.user_id,
            MaterialsWrite {
                materials,
                has_submitted: true,
                materials_updated_at: None,
                require_unsubmitted: true,
            },
        )
        .await?;

    metrics::increment_submission_count();
    log::info!("✅ Materials submitted: {}", saved.email);
    Ok(saved)
}

/// PUT /api/materials - student edit after the first submission
pub async fn edit_materials(
    state: &AppState,
    ctx: &AuthContext,
    raw: &[String],
) -> Result<User, AppError> {
    require_student(ctx)?;
    let store = state.store.as_ref();

    let _guard = state.submission_lock.lock().await;

    let user = store
        .find_by_id(&ctx.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !user.has_submitted {
        return Err(AppError::NotSubmitted);
    }

    let saved = apply_edit(store, &user, raw).await.map_err(hide_holders)?;

    metrics::increment_submission_count();
    log::info!("✏️  Materials updated: {}", saved.email);
    Ok(saved)
}

/// GET /api/materials/search - loose, best-effort availability check.
/// Whitespace anywhere and case are ignored; enforcement stays in the validator.
pub async fn search_materials(state: &AppState, query: &str) -> Result<SearchResponse, AppError> {
    let query = query.trim();
    let needle = search_key(query);
    if needle.is_empty() {
        return Err(AppError::InvalidRequest("Search term is empty".to_string()));
    }

    let exact = material_key(query);
    let stored = state.store.all_materials().await?;

    let available = !stored.iter().any(|m| material_key(m) == exact);
    let mut matches: Vec<String> = stored
        .into_iter()
        .filter(|m| search_key(m).contains(&needle))
        .collect();
    matches.sort_by_key(|m| m.to_lowercase());

    Ok(SearchResponse {
        success: true,
        query: query.to_string(),
        available,
        matches,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::services::material_validator::MATERIALS_PER_STUDENT;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    pub(crate) fn list(prefix: &str) -> Vec<String> {
        (1..=MATERIALS_PER_STUDENT)
            .map(|i| format!("{} {}", prefix, i))
            .collect()
    }

    pub(crate) async fn add_user(state: &AppState, email: &str, role: Role) -> AuthContext {
        let user = User::new(
            format!("User {}", email),
            email.to_string(),
            "hash".to_string(),
            role,
        );
        let id = state.store.insert_user(user).await.unwrap();
        AuthContext {
            user_id: id,
            email: email.to_string(),
            role,
        }
    }

    pub(crate) fn test_state() -> AppState {
        AppState::new(Arc::new(MemoryStore::new()), JwtConfig::for_tests())
    }

    #[tokio::test]
    async fn test_first_submission_sets_flag_and_stores_trimmed() {
        let state = test_state();
        let ctx = add_user(&state, "a@x.edu", Role::Student).await;

        let mut raw = list("Alloy");
        raw[0] = "  Copper ".to_string();
        let saved = submit_materials(&state, &ctx, &raw).await.unwrap();

        assert!(saved.has_submitted);
        assert_eq!(saved.materials[0], "Copper");
        assert_eq!(saved.materials_updated_at, None);
        assert_eq!(saved.material_keys[0], "copper");
    }

    #[tokio::test]
    async fn test_second_first_submission_is_locked_regardless_of_content() {
        let state = test_state();
        let ctx = add_user(&state, "a@x.edu", Role::Student).await;
        submit_materials(&state, &ctx, &list("Alloy")).await.unwrap();

        // valid and unused
        let err = submit_materials(&state, &ctx, &list("Ore")).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadySubmitted));

        // invalid content still reports the lock
        let err = submit_materials(&state, &ctx, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadySubmitted));
    }

    #[tokio::test]
    async fn test_cross_user_conflict_names_item() {
        let state = test_state();
        let first = add_user(&state, "a@x.edu", Role::Student).await;
        let second = add_user(&state, "b@x.edu", Role::Student).await;

        let mut raw = list("Alloy");
        raw[0] = "Copper".to_string();
        submit_materials(&state, &first, &raw).await.unwrap();

        let mut candidate = list("Ore");
        candidate[5] = "copper".to_string();
        let err = submit_materials(&state, &second, &candidate).await.unwrap_err();
        assert_eq!(err.duplicates(), vec!["copper".to_string()]);
        match &err {
            AppError::Conflict(conflicts) => assert!(conflicts[0].claimed_by.is_empty()),
            other => panic!("unexpected error: {:?}", other),
        }

        // rejection is all-or-nothing
        let second_user = state.store.find_by_id(&second.user_id).await.unwrap().unwrap();
        assert!(!second_user.has_submitted);
        assert!(second_user.materials.is_empty());
    }

    #[tokio::test]
    async fn test_edit_excludes_self_and_stamps_time() {
        let state = test_state();
        let ctx = add_user(&state, "a@x.edu", Role::Student).await;
        let raw = list("Alloy");
        submit_materials(&state, &ctx, &raw).await.unwrap();

        // same list again: no conflicts with itself
        let saved = edit_materials(&state, &ctx, &raw).await.unwrap();
        assert_eq!(saved.materials, raw);
        assert!(saved.has_submitted);
        assert!(saved.materials_updated_at.is_some());
    }

    #[tokio::test]
    async fn test_edit_still_checks_other_users() {
        let state = test_state();
        let first = add_user(&state, "a@x.edu", Role::Student).await;
        let second = add_user(&state, "b@x.edu", Role::Student).await;
        submit_materials(&state, &first, &list("Alloy")).await.unwrap();
        submit_materials(&state, &second, &list("Ore")).await.unwrap();

        let mut raw = list("Ore");
        raw[14] = "ALLOY 3".to_string();
        let err = edit_materials(&state, &second, &raw).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn test_edit_before_submission_is_rejected() {
        let state = test_state();
        let ctx = add_user(&state, "a@x.edu", Role::Student).await;
        let err = edit_materials(&state, &ctx, &list("Alloy")).await.unwrap_err();
        assert!(matches!(err, AppError::NotSubmitted));
    }

    #[tokio::test]
    async fn test_admin_cannot_use_student_path() {
        let state = test_state();
        let ctx = add_user(&state, "admin@x.edu", Role::Admin).await;
        let err = submit_materials(&state, &ctx, &list("Alloy")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_search_ignores_whitespace_and_case() {
        let state = test_state();
        let ctx = add_user(&state, "a@x.edu", Role::Student).await;
        let mut raw = list("Alloy");
        raw[0] = "Carbon Fibre".to_string();
        submit_materials(&state, &ctx, &raw).await.unwrap();

        let result = search_materials(&state, "carbonfib").await.unwrap();
        assert_eq!(result.matches, vec!["Carbon Fibre".to_string()]);
        assert!(result.available);

        let result = search_materials(&state, " CARBON FIBRE ").await.unwrap();
        assert!(!result.available);

        assert!(search_materials(&state, "   ").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_simultaneous_first_submissions_claim_shared_item_once() {
        let state = test_state();
        let mut tasks = Vec::new();
        for i in 0..8 {
            let ctx = add_user(&state, &format!("s{}@x.edu", i), Role::Student).await;
            let mut raw = list(&format!("Ore{}", i));
            raw[0] = if i % 2 == 0 { "Shared" } else { " shared " }.to_string();

            let state = state.clone();
            tasks.push(tokio::spawn(async move {
                submit_materials(&state, &ctx, &raw).await
            }));
        }

        let mut accepted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(AppError::Conflict(conflicts)) => {
                    assert_eq!(conflicts.len(), 1);
                    assert_eq!(conflicts[0].material.to_lowercase(), "shared");
                }
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(accepted, 1);

        let holders = state
            .store
            .material_holders(&["shared".to_string()], None)
            .await
            .unwrap();
        assert_eq!(holders.len(), 1);
    }
}
