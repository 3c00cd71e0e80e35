//! Server side of the Apple Pay merchant validation dance.
//!
//! The browser hands us a validation URL; we POST the merchant request
//! payload to it over two-way TLS using the merchant identity certificate and
//! relay the merchant session object back untouched.
//!
//! A single attempt is made per call. Repeating the handshake may have side
//! effects at the wallet provider, so retrying is left to the caller.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, StatusCode, Url};

use crate::error::{Error, Result, Stage};
use crate::identity::{MerchantIdentity, MerchantValidationConfig};

/// Removes insignificant whitespace from a JSON document. Key order, string
/// contents and number spelling are left exactly as they were.
pub fn compact_json(input: &[u8]) -> Result<Vec<u8>> {
    serde_json::from_slice::<serde::de::IgnoredAny>(input)
        .map_err(|e| Error::json(Stage::RequestBody, &e))?;

    let mut out = Vec::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    for &b in input {
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b' ' | b'\t' | b'\n' | b'\r' => {}
            b'"' => {
                in_string = true;
                out.push(b);
            }
            _ => out.push(b),
        }
    }
    Ok(out)
}

fn parse_target(url: &str) -> Result<Url> {
    if url.is_empty() {
        return Err(Error::encoding(Stage::ValidationUrl, "missing url"));
    }
    let parsed = Url::parse(url).map_err(|e| Error::encoding(Stage::ValidationUrl, e))?;
    match parsed.scheme() {
        "https" | "http" => Ok(parsed),
        other => Err(Error::encoding(
            Stage::ValidationUrl,
            format!("unsupported scheme {}", other),
        )),
    }
}

/// Performs one merchant validation call and returns the session document
/// byte for byte.
///
/// The body is compacted before any connection is opened, so malformed JSON
/// never causes network traffic. `timeout` bounds the whole call, from
/// connecting through reading the last byte of the response.
pub async fn validate(
    url: &str,
    identity: &MerchantIdentity,
    request_body: &[u8],
    timeout: Duration,
) -> Result<Bytes> {
    let body = compact_json(request_body)?;
    let target = parse_target(url)?;
    send_with(client_builder(identity, timeout)?, target, body).await
}

/// Client settings for a single validation call. Nothing is pooled, so the
/// TLS session and connection die with the call.
fn client_builder(identity: &MerchantIdentity, timeout: Duration) -> Result<reqwest::ClientBuilder> {
    Ok(reqwest::Client::builder()
        .identity(identity.to_tls_identity()?)
        .timeout(timeout)
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none()))
}

async fn send_with(builder: reqwest::ClientBuilder, target: Url, body: Vec<u8>) -> Result<Bytes> {
    let client = builder
        .build()
        .map_err(|e| Error::Identity(format!("error preparing tls: {}", e)))?;

    info!("Requesting merchant session from: {}", target);
    let res = client
        .post(target)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| {
            info!("Error transporting merchant validation request: {:?}", e);
            Error::Transport(e)
        })?;

    let status = res.status();
    if status != StatusCode::OK {
        // Drain so the connection closes cleanly; the body is not reported.
        let _ = res.bytes().await;
        info!("Received error status from wallet provider: {}", status);
        return Err(Error::RejectedByGateway(status.to_string()));
    }

    let session = res.bytes().await?;
    info!("Merchant session received ({} bytes)", session.len());
    Ok(session)
}

/// Merchant validation with credentials loaded once up front.
///
/// Construction reads, compacts and checks everything, so a bad certificate
/// or request payload is reported at startup rather than on the first
/// shopper's checkout.
pub struct MerchantValidationService {
    request_body: Vec<u8>,
    identity: MerchantIdentity,
    timeout: Duration,
}

impl MerchantValidationService {
    pub fn new<C>(timeout: Duration, config: &C) -> Result<Self>
    where
        C: MerchantValidationConfig + ?Sized,
    {
        let request_body = compact_json(&config.load_request_body()?)?;
        let identity = config.load_cert()?;
        // Surface TLS identity problems now rather than per request.
        identity.to_tls_identity()?;
        Ok(MerchantValidationService {
            request_body,
            identity,
            timeout,
        })
    }

    /// Performs the server side steps of the dance against `url`.
    pub async fn dance(&self, url: &str) -> Result<Bytes> {
        validate(url, &self.identity, &self.request_body, self.timeout).await
    }
}
