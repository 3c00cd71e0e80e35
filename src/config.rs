use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_CERT_PATH: &str = "/applepay/merchant.pem";
const DEFAULT_REQUEST_PATH: &str = "/applepay/merchant.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct Settings {
    pub listen_addr: String,
    pub merchant_cert_path: String,
    pub merchant_request_path: String,
    pub validation_timeout: Duration,
    pub gateway_url: String,
    pub gateway_merchant_code: String,
    pub gateway_password: String,
    pub submission_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Configuration(format!("missing config: {}", key)))
        };
        let seconds = |key: &str| -> Result<Duration> {
            match lookup(key) {
                None => Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
                Some(raw) => raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    Error::Configuration(format!("invalid {}: {}", key, e))
                }),
            }
        };

        Ok(Settings {
            listen_addr: or_default("LISTEN_ADDR", DEFAULT_LISTEN_ADDR),
            merchant_cert_path: or_default("MERCHANT_CERT_PATH", DEFAULT_CERT_PATH),
            merchant_request_path: or_default("MERCHANT_REQUEST_PATH", DEFAULT_REQUEST_PATH),
            validation_timeout: seconds("VALIDATION_TIMEOUT_SECS")?,
            gateway_url: required("GATEWAY_URL")?,
            gateway_merchant_code: required("GATEWAY_MERCHANT_CODE")?,
            gateway_password: required("GATEWAY_PASSWORD")?,
            submission_timeout: seconds("SUBMISSION_TIMEOUT_SECS")?,
        })
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("listen_addr", &self.listen_addr)
            .field("merchant_cert_path", &self.merchant_cert_path)
            .field("merchant_request_path", &self.merchant_request_path)
            .field("validation_timeout", &self.validation_timeout)
            .field("gateway_url", &self.gateway_url)
            .field("gateway_merchant_code", &self.gateway_merchant_code)
            .field("gateway_password", &"<redacted>")
            .field("submission_timeout", &self.submission_timeout)
            .finish()
    }
}
