use base64::prelude::*;

use crate::error::{Error, Result, Stage};
use crate::model::{Amount, DecodedTransaction, PaymentToken, TransactionEnvelope};

/// How the checkout page delivered the payment token.
enum TokenSource {
    /// Base64 of the JSON payment data.
    Encoded(String),
    Inline(PaymentToken),
    Absent,
}

impl TokenSource {
    fn from_envelope(encoded: Option<String>, inline: Option<PaymentToken>) -> Self {
        match (encoded, inline) {
            (Some(enc), _) if !enc.is_empty() => TokenSource::Encoded(enc),
            (_, Some(token)) => TokenSource::Inline(token),
            _ => TokenSource::Absent,
        }
    }

    fn resolve(self) -> Result<Option<PaymentToken>> {
        match self {
            TokenSource::Encoded(enc) => {
                let json = BASE64_STANDARD
                    .decode(enc.trim())
                    .map_err(|_| Error::encoding(Stage::PaymentDataEncoding, "invalid base64"))?;
                let token = serde_json::from_slice::<PaymentToken>(&json)
                    .map_err(|e| Error::json(Stage::PaymentData, &e))?;
                Ok(Some(token))
            }
            TokenSource::Inline(token) => Ok(Some(token)),
            TokenSource::Absent => Ok(None),
        }
    }
}

/// Decodes the raw transaction envelope posted by the checkout page.
///
/// Any failing stage aborts the whole decode; nothing is partially recovered.
pub fn decode(raw: &[u8]) -> Result<DecodedTransaction> {
    let envelope: TransactionEnvelope =
        serde_json::from_slice(raw).map_err(|e| Error::json(Stage::Transaction, &e))?;

    let payment_token =
        TokenSource::from_envelope(envelope.payment_data_enc, envelope.payment_data).resolve()?;

    Ok(DecodedTransaction {
        order_code: envelope.order_code,
        description: envelope.order_description,
        language_code: envelope.shopper_language_code,
        shopper_email: envelope.shopper_email_address.filter(|e| !e.is_empty()),
        amount: Amount {
            value: envelope.amount_value,
            currency_code: envelope.amount_currency_code,
            exponent: envelope.amount_exponent,
        },
        payment_token,
    })
}
