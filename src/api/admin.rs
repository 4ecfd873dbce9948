use crate::models::{MaterialsRequest, MaterialsResponse, UserResponse};
use crate::services::admin_service::{self, BulkImportReport, ListUsersQuery, RosterStats};
use crate::utils::spreadsheet::{EXPORT_FILE_NAME, XLSX_CONTENT_TYPE};
use crate::{state::AppState, utils::AppError};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::stream::StreamExt;

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Students sorted by email", body = Vec<UserResponse>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    state: web::Data<AppState>,
    query: web::Query<ListUsersQuery>,
) -> Result<HttpResponse, AppError> {
    let users = admin_service::list_students(&state, query.search.as_deref()).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = admin_service::get_user(&state, &path).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "Student id")),
    request_body = MaterialsRequest,
    responses(
        (status = 200, description = "Student updated", body = MaterialsResponse),
        (status = 400, description = "Wrong count, empty field or duplicate in the list"),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Materials claimed by other students")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
    request: web::Json<MaterialsRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("🛠️  PUT /admin/users/{}", id);

    let saved = admin_service::update_student(&state, &id, &request.materials).await?;
    Ok(HttpResponse::Ok().json(MaterialsResponse {
        success: true,
        has_submitted: saved.has_submitted,
        materials: saved.materials,
        materials_updated_at: saved.materials_updated_at,
        message: Some("User updated successfully".to_string()),
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "Admin",
    responses((status = 200, description = "Roster statistics", body = RosterStats)),
    security(("bearer_auth" = []))
)]
pub async fn get_stats(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stats = admin_service::stats(&state).await?;
    Ok(HttpResponse::Ok().json(stats))
}

fn is_spreadsheet(content_type: &str) -> bool {
    content_type.contains("excel") || content_type.contains("spreadsheetml")
}

/// Largest workbook accepted by the bulk import
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

fn append_chunk(buffer: &mut Vec<u8>, chunk: &[u8]) -> Result<(), AppError> {
    if buffer.len() + chunk.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::InvalidRequest(format!(
            "File is too large (limit {} MiB).",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    buffer.extend_from_slice(chunk);
    Ok(())
}

/// Reads the `file` field of the multipart upload. Other fields are skipped.
async fn read_upload(mut payload: Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::InvalidRequest(e.to_string()))?;
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(|m| m.to_string()).unwrap_or_default();
        if !is_spreadsheet(&content_type) {
            return Err(AppError::InvalidRequest(
                "Please upload only excel file.".to_string(),
            ));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::InvalidRequest(e.to_string()))?;
            append_chunk(&mut bytes, &chunk)?;
        }
        return Ok(bytes);
    }

    Err(AppError::InvalidRequest("No file uploaded.".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/admin/upload-materials",
    tag = "Admin",
    request_body(content = String, content_type = "multipart/form-data", description = "Workbook in field `file`: email, then 15 materials per row"),
    responses(
        (status = 200, description = "Per-row outcome", body = BulkImportReport),
        (status = 400, description = "Missing, malformed or empty workbook")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_materials(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    log::info!("📥 POST /admin/upload-materials");

    let bytes = read_upload(payload).await?;
    let report = admin_service::import_workbook(&state, &bytes).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    get,
    path = "/api/admin/download-excel",
    tag = "Admin",
    responses((status = 200, description = "Roster workbook (Student_Data_Export.xlsx)")),
    security(("bearer_auth" = []))
)]
pub async fn download_excel(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let buffer = admin_service::export_workbook(&state).await?;
    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
        ))
        .body(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_spreadsheet() {
        assert!(is_spreadsheet(XLSX_CONTENT_TYPE));
        assert!(is_spreadsheet("application/vnd.ms-excel"));
        assert!(!is_spreadsheet("text/csv"));
    }

    #[test]
    fn test_upload_size_is_capped() {
        let mut buffer = vec![0u8; MAX_UPLOAD_BYTES - 10];
        append_chunk(&mut buffer, &[1u8; 10]).unwrap();
        assert_eq!(buffer.len(), MAX_UPLOAD_BYTES);

        let err = append_chunk(&mut buffer, &[1u8]).unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
        assert_eq!(buffer.len(), MAX_UPLOAD_BYTES);
    }
}
