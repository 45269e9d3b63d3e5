//! Connection settings, read once from the environment at startup.
//!
//! Every problem is collected and reported in one error so a user fixing
//! their environment does not have to rerun once per variable.

use std::env::VarError;

use bhmigrate_api_client::Credentials;

use crate::CliError;

pub const ENV_SCHEME: &str = "BHE_SCHEME";
pub const ENV_DOMAIN: &str = "BHE_DOMAIN";
pub const ENV_PORT: &str = "BHE_PORT";
pub const ENV_TOKEN_ID: &str = "BHE_TOKEN_ID";
pub const ENV_TOKEN_KEY: &str = "BHE_TOKEN_KEY";

/// Target server and API token.
#[derive(Debug, Clone)]
pub struct Config {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
}

impl Config {
    pub fn from_env() -> Result<Self, CliError> {
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Build from any key lookup. Values are trimmed; empty means missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Result<String, VarError>) -> Result<Self, CliError> {
        let mut problems = Vec::new();

        let scheme = required(&lookup, ENV_SCHEME, &mut problems).and_then(|s| {
            let lower = s.to_ascii_lowercase();
            if lower == "http" || lower == "https" {
                Some(lower)
            } else {
                problems.push(format!("{} must be http or https, got '{}'", ENV_SCHEME, s));
                None
            }
        });

        let host = required(&lookup, ENV_DOMAIN, &mut problems);

        let port = required(&lookup, ENV_PORT, &mut problems).and_then(|p| match p.parse::<u16>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                problems.push(format!("{} is not a valid port number: '{}'", ENV_PORT, p));
                None
            }
        });

        let token_id = required(&lookup, ENV_TOKEN_ID, &mut problems);
        let token_key = required(&lookup, ENV_TOKEN_KEY, &mut problems);

        match (scheme, host, port, token_id, token_key) {
            (Some(scheme), Some(host), Some(port), Some(token_id), Some(token_key)) => Ok(Self {
                scheme,
                host,
                port,
                credentials: Credentials::new(token_id, token_key),
            }),
            _ => Err(
                CliError::config(format!("invalid configuration: {}", problems.join("; "))).with_hint(
                    format!(
                        "export {}, {}, {}, {} and {} before running",
                        ENV_SCHEME, ENV_DOMAIN, ENV_PORT, ENV_TOKEN_ID, ENV_TOKEN_KEY,
                    ),
                ),
            ),
        }
    }

    /// `scheme://host:port`, for display.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

fn required(
    lookup: &impl Fn(&str) -> Result<String, VarError>,
    key: &str,
    problems: &mut Vec<String>,
) -> Option<String> {
    match lookup(key) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        Ok(_) | Err(VarError::NotPresent) => {
            problems.push(format!("{} is not set", key));
            None
        }
        Err(VarError::NotUnicode(_)) => {
            problems.push(format!("{} is not valid UTF-8", key));
            None
        }
    }
}
