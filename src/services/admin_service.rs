// ==================== ADMIN CONSOLE ====================
// Roster review, admin edits, spreadsheet bulk import and export.

use crate::{
    api::metrics,
    models::{Role, User, UserResponse},
    services::{material_validator::MATERIALS_PER_STUDENT, materials_service},
    state::AppState,
    utils::{spreadsheet, AppError},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListUsersQuery {
    /// Case-insensitive substring of name, email or any material
    pub search: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RosterStats {
    pub total_students: usize,
    pub submitted: usize,
    pub pending: usize,
    pub total_materials: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BulkImportReport {
    pub success: bool,
    pub message: String,
    /// Data rows with an email cell
    pub processed: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

fn matches_search(user: &User, term: &str) -> bool {
    user.name.to_lowercase().contains(term)
        || user.email.to_lowercase().contains(term)
        || user.materials.iter().any(|m| m.to_lowercase().contains(term))
}

/// GET /api/admin/users
pub async fn list_students(
    state: &AppState,
    search: Option<&str>,
) -> Result<Vec<UserResponse>, AppError> {
    let students = state.store.list_students().await?;
    let term = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();

    Ok(students
        .into_iter()
        .filter(|u| term.is_empty() || matches_search(u, &term))
        .map(UserResponse::from)
        .collect())
}

/// GET /api/admin/users/{id}
pub async fn get_user(state: &AppState, id: &str) -> Result<UserResponse, AppError> {
    state
        .store
        .find_by_id(id)
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// GET /api/admin/stats
pub async fn stats(state: &AppState) -> Result<RosterStats, AppError> {
    let students = state.store.list_students().await?;
    let submitted = students.iter().filter(|u| u.has_submitted).count();

    Ok(RosterStats {
        total_students: students.len(),
        submitted,
        pending: students.len() - submitted,
        total_materials: students.iter().map(|u| u.materials.len()).sum(),
    })
}

async fn find_student_by_id(state: &AppState, id: &str) -> Result<User, AppError> {
    let user = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    match user.role {
        Role::Student => Ok(user),
        Role::Admin => Err(AppError::NotFound("Student not found".to_string())),
    }
}

/// PUT /api/admin/users/{id} - admin edit, allowed at any time
pub async fn update_student(
    state: &AppState,
    id: &str,
    raw: &[String],
) -> Result<User, AppError> {
    let _guard = state.submission_lock.lock().await;

    let target = find_student_by_id(state, id).await?;
    let saved = materials_service::apply_edit(state.store.as_ref(), &target, raw).await?;

    metrics::increment_submission_count();
    log::info!("🛠️  Admin updated materials for {}", saved.email);
    Ok(saved)
}

/// Applies one `[email, m1..m15]` row. Each row is all-or-nothing; rows are
/// independent of each other.
async fn import_row(state: &AppState, email: &str, cells: &[String]) -> Result<(), String> {
    let _guard = state.submission_lock.lock().await;

    let target = match state.store.find_by_email(email).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(format!("User with email {} not found.", email)),
        Err(e) => return Err(e.to_string()),
    };

    match target.role {
        Role::Student => {}
        Role::Admin => return Err(format!("{} is not a student.", email)),
    }

    // Missing trailing cells count as empty fields
    let mut raw: Vec<String> = cells.iter().take(MATERIALS_PER_STUDENT).cloned().collect();
    raw.resize(MATERIALS_PER_STUDENT, String::new());

    materials_service::apply_edit(state.store.as_ref(), &target, &raw)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Bulk import of already-parsed sheet rows. The first row is the header.
pub async fn import_rows(
    state: &AppState,
    rows: &[spreadsheet::SheetRow],
) -> Result<BulkImportReport, AppError> {
    if rows.len() < 2 {
        return Err(AppError::InvalidRequest(
            "File appears empty or missing header.".to_string(),
        ));
    }

    let mut processed = 0;
    let mut updated = 0;
    let mut errors = Vec::new();

    for row in &rows[1..] {
        let email = row.cells.first().map(|c| c.trim()).unwrap_or("");
        if email.is_empty() {
            continue;
        }
        processed += 1;
        metrics::increment_bulk_row_count();

        match import_row(state, email, &row.cells[1..]).await {
            Ok(()) => updated += 1,
            Err(e) => {
                log::warn!("⚠️  Bulk import row {} skipped: {}", row.number, e);
                errors.push(format!("Row {}: {}", row.number, e));
            }
        }
    }

    log::info!(
        "📥 Bulk import finished: {} rows, {} updated, {} errors",
        processed,
        updated,
        errors.len()
    );

    Ok(BulkImportReport {
        success: true,
        message: format!("Processed {} rows. Updated {} users.", processed, updated),
        processed,
        updated,
        errors,
    })
}

/// POST /api/admin/upload-materials
pub async fn import_workbook(state: &AppState, bytes: &[u8]) -> Result<BulkImportReport, AppError> {
    let rows = spreadsheet::read_first_sheet(bytes)?;
    import_rows(state, &rows).await
}

/// GET /api/admin/download-excel
pub async fn export_workbook(state: &AppState) -> Result<Vec<u8>, AppError> {
    let students = state.store.list_students().await?;
    let buffer = spreadsheet::write_export(&students)?;
    log::info!(
        "📤 Generated export for {} students ({} bytes)",
        students.len(),
        buffer.len()
    );
    Ok(buffer)
}
