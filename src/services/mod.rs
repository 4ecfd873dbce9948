pub mod admin_service;
pub mod auth_service;
pub mod material_validator;
pub mod materials_service;
