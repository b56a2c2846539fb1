//! Server Configuration
//!
//! Read once at startup from the environment and never changed afterwards.

use std::fmt;
use std::path::PathBuf;

use paydoc_issuance::IssuancePolicy;
use paydoc_payments::Pricing;
use thiserror::Error;

use crate::logging::parse_size;
use crate::rate_limit::RateLimit;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("Invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    /// Fixed phrase for startup failure output
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Missing(_) => "Required configuration is missing",
            Self::Invalid { .. } => "Configuration value is invalid",
        }
    }
}

/// Which payment processor backs the service
#[derive(Clone, PartialEq, Eq)]
pub enum PaymentBackend {
    Stripe { secret_key: String },
    /// In-process gateway for local demos; nothing is ever charged
    Memory,
}

impl PaymentBackend {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Stripe { .. } => "stripe",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Debug for PaymentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stripe { .. } => f.write_str("Stripe { secret_key: <redacted> }"),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogConfig {
    pub path: PathBuf,
    /// Rotate once the active file would grow past this many bytes
    pub rotation_bytes: u64,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend: PaymentBackend,
    pub pricing: Pricing,
    pub create_intent_limit: RateLimit,
    pub generate_pdf_limit: RateLimit,
    pub log: LogConfig,
    pub artifact_dir: PathBuf,
    pub retain_artifacts: bool,
    pub issuance_policy: IssuancePolicy,
    pub bind_addr: String,
}

impl AppConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key -> value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("PAYMENT_BACKEND").as_deref().map(str::trim) {
            None | Some("stripe") => PaymentBackend::Stripe {
                secret_key: get("STRIPE_SECRET_KEY")
                    .ok_or(ConfigError::Missing("STRIPE_SECRET_KEY"))?,
            },
            Some("memory") => PaymentBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "PAYMENT_BACKEND",
                    reason: format!("'{other}' (expected 'stripe' or 'memory')"),
                });
            }
        };

        let amount = match get("PAYMENT_AMOUNT_CENTS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|a| *a > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    var: "PAYMENT_AMOUNT_CENTS",
                    reason: format!("'{raw}' is not a positive integer"),
                })?,
            None => Pricing::default().amount,
        };

        let currency = match get("PAYMENT_CURRENCY") {
            Some(raw) => {
                let code = raw.trim().to_lowercase();
                if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(ConfigError::Invalid {
                        var: "PAYMENT_CURRENCY",
                        reason: format!("'{raw}' is not a 3-letter currency code"),
                    });
                }
                code
            }
            None => Pricing::default().currency,
        };

        let default_limit = parse_or(&get, "RATE_LIMIT", RateLimit::default())?;
        let create_intent_limit = parse_or(&get, "RATE_LIMIT_CREATE_INTENT", default_limit)?;
        let generate_pdf_limit = parse_or(&get, "RATE_LIMIT_GENERATE_PDF", default_limit)?;

        let rotation_bytes = match get("LOG_ROTATION") {
            Some(raw) => parse_size(&raw).map_err(|reason| ConfigError::Invalid {
                var: "LOG_ROTATION",
                reason,
            })?,
            None => 500 * 1000 * 1000,
        };

        let retain_artifacts = match get("ARTIFACT_RETAIN") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "ARTIFACT_RETAIN",
                reason: format!("'{raw}' is not a boolean"),
            })?,
            None => false,
        };

        Ok(Self {
            backend,
            pricing: Pricing { amount, currency },
            create_intent_limit,
            generate_pdf_limit,
            log: LogConfig {
                path: get("LOG_FILE").map_or_else(|| PathBuf::from("app.log"), PathBuf::from),
                rotation_bytes,
            },
            artifact_dir: get("ARTIFACT_DIR")
                .map_or_else(|| std::env::temp_dir().join("paydoc"), PathBuf::from),
            retain_artifacts,
            issuance_policy: parse_or(&get, "ISSUANCE_POLICY", IssuancePolicy::default())?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = String>,
{
    get(var).map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|reason| ConfigError::Invalid { var, reason })
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
