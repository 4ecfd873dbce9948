pub mod admin;
pub mod auth;
pub mod health;
pub mod materials;
pub mod metrics;
pub mod swagger;

use crate::middleware::auth::AuthMiddleware;
use actix_web::web;

/// Registers every route. `web::Data<AppState>` must be added by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Metrics
        .route("/metrics", web::get().to(metrics::get_metrics))
        // Auth endpoints
        .service(
            web::scope("/api/auth")
                .route("/login", web::post().to(auth::login))
                .service(
                    web::resource("/me")
                        .wrap(AuthMiddleware::authenticated())
                        .route(web::get().to(auth::get_me)),
                ),
        )
        // Materials: the caller's own list - Requires JWT
        .service(
            web::scope("/api/materials")
                .wrap(AuthMiddleware::authenticated())
                .route("", web::get().to(materials::get_materials))
                .route("", web::post().to(materials::submit_materials))
                .route("", web::put().to(materials::update_materials))
                .route("/search", web::get().to(materials::search_materials)),
        )
        // Admin console - Requires JWT with the admin role
        .service(
            web::scope("/api/admin")
                .wrap(AuthMiddleware::admin_only())
                .route("/users", web::get().to(admin::list_users))
                .route("/users/{id}", web::get().to(admin::get_user))
                .route("/users/{id}", web::put().to(admin::update_user))
                .route("/stats", web::get().to(admin::get_stats))
                .route("/upload-materials", web::post().to(admin::upload_materials))
                .route("/download-excel", web::get().to(admin::download_excel)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, User};
    use crate::services::auth_service::generate_jwt;
    use crate::services::materials_service::tests::{add_user, list, test_state};
    use crate::state::AppState;
    use actix_http::Request;
    use actix_web::{
        body::MessageBody,
        dev::{Service, ServiceResponse},
        http::StatusCode,
        test, App,
    };
    use serde_json::{json, Value};

    async fn status_of<S, B>(app: &S, req: Request) -> StatusCode
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        match test::try_call_service(app, req).await {
            Ok(res) => res.status(),
            Err(e) => e.as_response_error().status_code(),
        }
    }

    async fn token_for(state: &AppState, email: &str) -> String {
        let user = state.store.find_by_email(email).await.unwrap().unwrap();
        generate_jwt(&user, &state.jwt).unwrap()
    }

    #[actix_web::test]
    async fn test_materials_require_token() {
        let state = test_state();
        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/materials").to_request();
        assert_eq!(status_of(&app, req).await, StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/materials")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        assert_eq!(status_of(&app, req).await, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_students_are_forbidden_from_admin_routes() {
        let state = test_state();
        add_user(&state, "s@x.edu", Role::Student).await;
        add_user(&state, "a@x.edu", Role::Admin).await;
        let student = token_for(&state, "s@x.edu").await;
        let admin = token_for(&state, "a@x.edu").await;

        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/admin/stats")
            .insert_header(("Authorization", format!("Bearer {}", student)))
            .to_request();
        assert_eq!(status_of(&app, req).await, StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/admin/stats")
            .insert_header(("Authorization", format!("Bearer {}", admin)))
            .to_request();
        let stats: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["total_students"], 1);
        assert_eq!(stats["pending"], 1);
    }

    #[actix_web::test]
    async fn test_login_then_submit_then_conflict() {
        let state = test_state();
        let hash = bcrypt::hash("pw", 4).unwrap();
        state
            .store
            .insert_user(User::new("Ann".into(), "ann@x.edu".into(), hash, Role::Student))
            .await
            .unwrap();
        let other = add_user(&state, "bob@x.edu", Role::Student).await;
        crate::services::materials_service::submit_materials(&state, &other, &list("Ore"))
            .await
            .unwrap();

        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": " ANN@x.edu ", "password": "pw" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["user"]["role"], "student");
        let token = body["token"].as_str().unwrap().to_string();
        let auth = ("Authorization", format!("Bearer {}", token));

        // "ore 3" is held by bob
        let mut clashing = list("Alloy");
        clashing[4] = "ore 3".to_string();
        let req = test::TestRequest::post()
            .uri("/api/materials")
            .insert_header(auth.clone())
            .set_json(json!({ "materials": clashing }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["kind"], "conflict");
        assert_eq!(body["conflicts"][0]["material"], "ore 3");

        let req = test::TestRequest::post()
            .uri("/api/materials")
            .insert_header(auth.clone())
            .set_json(json!({ "materials": list("Alloy") }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["has_submitted"], true);

        let req = test::TestRequest::get()
            .uri("/api/materials/search?q=ALLOY%201")
            .insert_header(auth)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["available"], false);
    }
}
