use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::{header, StatusCode};

use crate::acknowledgement::GatewayAcknowledgement;
use crate::error::{Error, ErrorKind, Stage};
use crate::model::SessionRequest;
use crate::state::AppState;

type HandlerError = (StatusCode, String);

fn status_for(error: &Error) -> StatusCode {
    match (error.kind(), error.stage()) {
        // Rendering our own document failed; the caller sent nothing wrong.
        (ErrorKind::Encoding, Some(Stage::Document)) => StatusCode::INTERNAL_SERVER_ERROR,
        (ErrorKind::Encoding, _) => StatusCode::BAD_REQUEST,
        (ErrorKind::Rejected, _) => StatusCode::BAD_GATEWAY,
        (ErrorKind::Transport, _) => StatusCode::SERVICE_UNAVAILABLE,
        (ErrorKind::Configuration, _) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Maps a failure to a response without echoing payloads or credentials.
///
/// Encoding failures are logged by stage only, since their reason is
/// derived from caller data.
fn reject(context: &str, error: Error) -> HandlerError {
    let status = status_for(&error);
    match error.stage() {
        Some(stage) => error!("{} failed ({}): {:?} at {}", context, status, error.kind(), stage),
        None => error!("{} failed ({}): {}", context, status, error),
    }
    (status, format!("error {}", context))
}

/// `POST /getApplePaySession`: relays the merchant session for the
/// validation URL supplied by the browser.
pub async fn get_apple_pay_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, HandlerError> {
    let params: SessionRequest = serde_json::from_slice(&body).map_err(|e| {
        info!("Error parsing payload: {}", e);
        (StatusCode::BAD_REQUEST, "error parsing payload".to_string())
    })?;
    if params.url.is_empty() {
        info!("Missing required parameter: url");
        return Err((
            StatusCode::BAD_REQUEST,
            "missing required parameter: url".into(),
        ));
    }

    let session = state
        .validation
        .dance(&params.url)
        .await
        .map_err(|e| reject("requesting merchant session", e))?;

    info!("Returning merchant session ({} bytes)", session.len());
    Ok(([(header::CONTENT_TYPE, "application/json")], session).into_response())
}

/// `POST /processPayment`: decodes the transaction, renders the gateway
/// document and submits it. The gateway reply is logged, not returned.
pub async fn process_payment(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    let decoded =
        crate::data_adapter::decode(&body).map_err(|e| reject("decoding transaction", e))?;
    let order_code = decoded.order_code.clone();
    let request = decoded.into_request(state.gateway.merchant_code());

    let document = state
        .template
        .encode(request)
        .map_err(|e| reject("encoding transaction", e))?;

    let accepted = state
        .gateway
        .submit(document)
        .await
        .map_err(|e| reject("submitting payment", e))?;

    match GatewayAcknowledgement::parse(&accepted.body) {
        Ok(ack) => info!("Gateway acknowledgement for order {}: {:?}", order_code, ack),
        Err(e) => warn!("Unreadable acknowledgement for order {}: {}", order_code, e),
    }

    Ok(StatusCode::OK)
}
