use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use url::Url;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub posthog_host: Url,
    pub posthog_project_id: String,
    pub posthog_api_key: String,
    pub content_dir: String,
    pub public_rps: u32,
    pub lockdown_warning_seconds: u32,
    pub session_ttl_minutes: u64,
    pub shuffle_options: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let posthog_host = get_env("POSTHOG_HOST")?;
        let posthog_host = Url::parse(&posthog_host)
            .map_err(|e| Error::Config(format!("Invalid value for POSTHOG_HOST: {}", e)))?;

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            llm_api_key: get_env("LLM_API_KEY")?,
            llm_base_url: get_env_or("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
            llm_model: get_env_or("LLM_MODEL", DEFAULT_LLM_MODEL),
            posthog_host,
            posthog_project_id: get_env("POSTHOG_PROJECT_ID")?,
            posthog_api_key: get_env("POSTHOG_API_KEY")?,
            content_dir: get_env_or("CONTENT_DIR", "content/docs"),
            public_rps: get_env_parse_or("PUBLIC_RPS", 20)?,
            lockdown_warning_seconds: get_env_parse_or("LOCKDOWN_WARNING_SECONDS", 5)?,
            session_ttl_minutes: get_env_parse_or("SESSION_TTL_MINUTES", 60)?,
            shuffle_options: get_env_parse_or("SHUFFLE_OPTIONS", false)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
