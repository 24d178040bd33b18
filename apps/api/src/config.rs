use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3.1";

/// Which PDF text backend the extractor uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfBackendKind {
    /// Parses straight from the upload buffer. No filesystem access.
    InMemory,
    /// Shells out to poppler's `pdftotext`, which needs a scoped temp file.
    Pdftotext,
}

impl FromStr for PdfBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-memory" | "inmemory" | "memory" => Ok(PdfBackendKind::InMemory),
            "pdftotext" => Ok(PdfBackendKind::Pdftotext),
            other => Err(anyhow!(
                "Unknown PDF_BACKEND '{other}' (expected 'in-memory' or 'pdftotext')"
            )),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Built once at startup and handed to components by reference; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub openrouter_api_key: String,
    pub openrouter_base_url: String,
    /// Model used when a request does not name one.
    pub default_model: String,
    /// Sent upstream as `HTTP-Referer` for provider attribution.
    pub site_url: String,
    /// Sent upstream as `X-Title`.
    pub site_name: String,
    pub pdf_backend: PdfBackendKind,
    /// Optional JSON file with extra personas keyed by model id.
    pub personas_file: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openrouter_api_key: require_env("OPENROUTER_API_KEY")?,
            openrouter_base_url: env_or("OPENROUTER_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            default_model: env_or("DEFAULT_MODEL", DEFAULT_MODEL),
            site_url: env_or("SITE_URL", "http://localhost:3000"),
            site_name: env_or("SITE_NAME", "JobKyuNahiLagRahi"),
            pdf_backend: env_or("PDF_BACKEND", "in-memory")
                .parse()
                .context("PDF_BACKEND is invalid")?,
            personas_file: std::env::var("PERSONAS_FILE").ok().map(PathBuf::from),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Configuration pointing at an arbitrary provider base URL, for wiring tests
    /// and local stubs without touching the process environment.
    pub fn with_provider(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Config {
            openrouter_api_key: api_key.into(),
            openrouter_base_url: base_url.into(),
            default_model: DEFAULT_MODEL.to_string(),
            site_url: "http://localhost:3000".to_string(),
            site_name: "JobKyuNahiLagRahi".to_string(),
            pdf_backend: PdfBackendKind::InMemory,
            personas_file: None,
            port: 0,
            rust_log: "info".to_string(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
