//! Process settings loaded via OrthoConfig.
//!
//! Every field can be set with a `RECRUIT_`-prefixed environment variable,
//! a command-line flag, or a configuration file.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use recruit_backend::domain::{AdminRecovery, Email};
use recruit_backend::inbound::http::state::StreamSettings;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_LINK_BASE: &str = "http://localhost:8080/";

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid bind address '{value}': {message}")]
    BindAddr { value: String, message: String },
    #[error("invalid link base '{value}': {message}")]
    LinkBase { value: String, message: String },
    #[error("admin email and recovery code must be configured together")]
    PartialAdmin,
    #[error("invalid admin email: {message}")]
    AdminEmail { message: String },
    #[error("stream refresh interval must be at least one second")]
    StreamRefresh,
}

/// Settings for the HTTP server and its adapters.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "RECRUIT")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; without it the process keeps state in memory.
    pub database_url: Option<String>,
    /// Redis URL; without it rate limits are counted per process.
    pub redis_url: Option<String>,
    /// Email of the break-glass admin account.
    pub admin_email: Option<String>,
    /// Recovery code paired with `admin_email`.
    pub admin_recovery_code: Option<String>,
    /// Honour the first `X-Forwarded-For` address when rate limiting.
    #[ortho_config(default = false)]
    pub trust_forwarded_for: bool,
    /// Seconds between unsolicited snapshot frames on the event stream.
    pub stream_refresh_secs: Option<u64>,
    /// Base URL that emailed sign-in links point at.
    pub link_base: Option<String>,
}

impl AppSettings {
    /// Socket address to bind, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: value.to_owned(),
            message: err.to_string(),
        })
    }

    /// Base URL for emailed links. A trailing slash is added when missing.
    pub fn link_base(&self) -> Result<Url, SettingsError> {
        let value = self.link_base.as_deref().unwrap_or(DEFAULT_LINK_BASE);
        let normalised = if value.ends_with('/') {
            value.to_owned()
        } else {
            format!("{value}/")
        };
        Url::parse(&normalised).map_err(|err| SettingsError::LinkBase {
            value: value.to_owned(),
            message: err.to_string(),
        })
    }

    /// Break-glass admin identity, when both halves are configured.
    pub fn admin_recovery(&self) -> Result<Option<AdminRecovery>, SettingsError> {
        match (self.admin_email.as_deref(), self.admin_recovery_code.as_deref()) {
            (None, None) => Ok(None),
            (Some(email), Some(code)) if !code.trim().is_empty() => {
                let email = Email::new(email).map_err(|err| SettingsError::AdminEmail {
                    message: err.to_string(),
                })?;
                Ok(Some(AdminRecovery::new(email, code)))
            }
            _ => Err(SettingsError::PartialAdmin),
        }
    }

    /// Event stream timing with the configured refresh interval.
    pub fn stream_settings(&self) -> Result<StreamSettings, SettingsError> {
        let mut settings = StreamSettings::default();
        if let Some(secs) = self.stream_refresh_secs {
            if secs == 0 {
                return Err(SettingsError::StreamRefresh);
            }
            settings.refresh_interval = Duration::from_secs(secs);
        }
        Ok(settings)
    }
}
