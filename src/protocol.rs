use std::time::Duration;

use bytes::Bytes;
use reqwest::header;

use crate::error::{Error, Result};

/// A gateway reply with a success status.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub body: Bytes,
}

/// Submits payment documents to the gateway.
///
/// Holds the process-wide connection pool; build one at startup and share it.
pub struct GatewayClient {
    client: reqwest::Client,
    url: String,
    merchant_code: String,
    password: String,
}

impl GatewayClient {
    pub fn new(
        url: impl Into<String>,
        merchant_code: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Configuration(format!("error building gateway client: {}", e)))?;
        Ok(GatewayClient {
            client,
            url: url.into(),
            merchant_code: merchant_code.into(),
            password: password.into(),
        })
    }

    pub fn merchant_code(&self) -> &str {
        &self.merchant_code
    }

    pub async fn submit(&self, document: Vec<u8>) -> Result<Accepted> {
        submit_with(
            &self.client,
            &self.url,
            &self.merchant_code,
            &self.password,
            document,
        )
        .await
    }
}

async fn submit_with(
    client: &reqwest::Client,
    url: &str,
    merchant_code: &str,
    password: &str,
    document: Vec<u8>,
) -> Result<Accepted> {
    info!("Submitting payment document ({} bytes)", document.len());
    let res = client
        .post(url)
        .basic_auth(merchant_code, Some(password))
        .header(header::CONTENT_TYPE, "text/xml")
        .body(document)
        .send()
        .await
        .map_err(|e| {
            info!("Error placing request: {:?}", e);
            Error::Transport(e)
        })?;

    let status = res.status();
    if status.is_success() {
        let body = res.bytes().await?;
        info!("Gateway accepted submission ({} bytes)", body.len());
        return Ok(Accepted { body });
    }

    // Drain so the pooled connection can be reused.
    let _ = res.bytes().await;
    info!("Received error status from gateway: {}", status);
    Err(Error::RejectedByGateway(status.to_string()))
}
