use std::env;

use tracing::info;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Public origin used to build verification links in outbound email.
    pub base_url: String,
    pub brevo_api_key: Option<String>,
    pub brevo_sender_email: Option<String>,
    pub brevo_sender_name: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Self {
            port: var_or("PORT", "8080").parse().expect("PORT must be a number"),
            database_url: var_or("DATABASE_URL", "sqlite://vantage.db?mode=rwc"),
            base_url: var_or("BASE_URL", "http://localhost:8080")
                .trim_end_matches('/')
                .to_string(),
            brevo_api_key: var_nonempty("BREVO_API_KEY"),
            brevo_sender_email: var_nonempty("BREVO_SENDER_EMAIL"),
            brevo_sender_name: var_nonempty("BREVO_SENDER_NAME"),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn var_nonempty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
