use crate::models::{MaterialsRequest, MaterialsResponse};
use crate::services::auth_service::AuthContext;
use crate::services::materials_service::{self, SearchQuery, SearchResponse};
use crate::{state::AppState, utils::AppError};
use actix_web::{web, HttpResponse};

/// GET /api/materials - current user's list and submission state
#[utoipa::path(
    get,
    path = "/api/materials",
    tag = "Materials",
    responses(
        (status = 200, description = "Current materials", body = MaterialsResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_materials(
    state: web::Data<AppState>,
    ctx: web::ReqData<AuthContext>,
) -> Result<HttpResponse, AppError> {
    let response = materials_service::get_my_materials(&state, &ctx).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/materials - first submission
#[utoipa::path(
    post,
    path = "/api/materials",
    tag = "Materials",
    request_body = MaterialsRequest,
    responses(
        (status = 200, description = "Materials submitted", body = MaterialsResponse),
        (status = 400, description = "Wrong count, empty field or duplicate in the list"),
        (status = 409, description = "Already submitted, or materials claimed by other students")
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_materials(
    state: web::Data<AppState>,
    ctx: web::ReqData<AuthContext>,
    request: web::Json<MaterialsRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /materials - user: {}", ctx.email);

    let saved = materials_service::submit_materials(&state, &ctx, &request.materials).await?;
    Ok(HttpResponse::Ok().json(MaterialsResponse {
        success: true,
        has_submitted: saved.has_submitted,
        materials: saved.materials,
        materials_updated_at: saved.materials_updated_at,
        message: Some("Materials submitted successfully!".to_string()),
    }))
}

/// PUT /api/materials - edit after the first submission
#[utoipa::path(
    put,
    path = "/api/materials",
    tag = "Materials",
    request_body = MaterialsRequest,
    responses(
        (status = 200, description = "Materials updated", body = MaterialsResponse),
        (status = 400, description = "Wrong count, empty field or duplicate in the list"),
        (status = 409, description = "Not submitted yet, or materials claimed by other students")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_materials(
    state: web::Data<AppState>,
    ctx: web::ReqData<AuthContext>,
    request: web::Json<MaterialsRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("✏️  PUT /materials - user: {}", ctx.email);

    let saved = materials_service::edit_materials(&state, &ctx, &request.materials).await?;
    Ok(HttpResponse::Ok().json(MaterialsResponse {
        success: true,
        has_submitted: saved.has_submitted,
        materials: saved.materials,
        materials_updated_at: saved.materials_updated_at,
        message: Some("Materials updated successfully!".to_string()),
    }))
}

/// GET /api/materials/search?q= - informal availability pre-check
#[utoipa::path(
    get,
    path = "/api/materials/search",
    tag = "Materials",
    params(SearchQuery),
    responses(
        (status = 200, description = "Loose matches", body = SearchResponse),
        (status = 400, description = "Empty search term")
    ),
    security(("bearer_auth" = []))
)]
pub async fn search_materials(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let response = materials_service::search_materials(&state, &query.q).await?;
    Ok(HttpResponse::Ok().json(response))
}
