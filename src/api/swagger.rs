use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Materials Registry API",
        version = "1.0.0",
        description = "Students submit exactly 15 materials each; every material is unique across the whole roster.\n\n**Authentication:** all `/api` endpoints except login require a JWT Bearer token. Admin endpoints require the `admin` role."
    ),
    paths(
        // Auth
        crate::api::auth::login,
        crate::api::auth::get_me,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Materials
        crate::api::materials::get_materials,
        crate::api::materials::submit_materials,
        crate::api::materials::update_materials,
        crate::api::materials::search_materials,

        // Admin
        crate::api::admin::list_users,
        crate::api::admin::get_user,
        crate::api::admin::update_user,
        crate::api::admin::get_stats,
        crate::api::admin::upload_materials,
        crate::api::admin::download_excel,
    ),
    components(
        schemas(
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::UserInfo,
            crate::models::Role,
            crate::models::UserResponse,
            crate::models::MaterialsRequest,
            crate::models::MaterialsResponse,
            crate::services::material_validator::Conflict,
            crate::services::materials_service::SearchResponse,
            crate::services::admin_service::RosterStats,
            crate::services::admin_service::BulkImportReport,
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Email/password login and current user."),
        (name = "Materials", description = "Student submission, edit and availability search."),
        (name = "Admin", description = "Roster review, edits, spreadsheet import and export."),
        (name = "Health", description = "Health check and counters."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build(),
                ),
            );
        }
    }
}
