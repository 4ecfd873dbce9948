use std::env;

/// JWT signing parameters shared by login and the auth middleware
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiry_days: i64,
}

/// Roster provisioning parameters (only used when `SEED_ROSTER=true`)
#[derive(Debug, Clone)]
pub struct RosterConfig {
    pub enabled: bool,
    pub size: u32,
    pub email_prefix: String,
    pub email_domain: String,
    pub admin_email: String,
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: String,
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub jwt: JwtConfig,
    pub roster: RosterConfig,
}

impl Config {
    /// Reads configuration from the environment. `dotenv()` must already have run.
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("MONGO_URI"))
            .or_else(|_| env::var("MONGO_URL"))
            .map_err(|_| "DATABASE_URL (or MONGO_URI) must be set".to_string())?;

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) => {
                log::warn!("⚠️  JWT_SECRET not set, using an insecure development secret");
                "default-secret-change-me".to_string()
            }
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT").unwrap_or_else(|_| "5000".to_string()),
            database_url,
            cors_origins,
            jwt: JwtConfig {
                secret: jwt_secret,
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "materials-registry".to_string()),
                audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "materials-api".to_string()),
                expiry_days: parse_var("JWT_EXPIRY_DAYS", 30)?,
            },
            roster: RosterConfig {
                enabled: parse_var("SEED_ROSTER", false)?,
                size: parse_var("ROSTER_SIZE", 120)?,
                email_prefix: env::var("ROSTER_EMAIL_PREFIX").unwrap_or_else(|_| "24me".to_string()),
                email_domain: env::var("ROSTER_EMAIL_DOMAIN")
                    .unwrap_or_else(|_| "charusat.edu.in".to_string()),
                admin_email: env::var("ADMIN_EMAIL")
                    .unwrap_or_else(|_| "admin@charusat.edu.in".to_string()),
                admin_password: env::var("ADMIN_PASSWORD").ok(),
            },
        })
    }
}

impl JwtConfig {
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            secret: "test-secret".to_string(),
            issuer: "materials-registry".to_string(),
            audience: "materials-api".to_string(),
            expiry_days: 1,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}
