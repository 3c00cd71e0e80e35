use serde::{Deserialize, Serialize};

/// Header of the wallet's encrypted payment data.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDataHeader {
    #[serde(default)]
    pub ephemeral_public_key: Option<String>,
    #[serde(default)]
    pub public_key_hash: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// The `paymentData` object of an Apple Pay payment token.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentToken {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub header: PaymentDataHeader,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    pub value: Option<String>,
    pub currency_code: Option<String>,
    /// Number of implied decimal places, `2` for cents.
    pub exponent: Option<String>,
}

/// Transaction envelope posted by the checkout page.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionEnvelope {
    /// Base64 encoded JSON payment data. Takes precedence over `payment_data`.
    #[serde(default)]
    pub payment_data_enc: Option<String>,
    #[serde(default)]
    pub payment_data: Option<PaymentToken>,
    #[serde(default)]
    pub order_code: String,
    #[serde(default)]
    pub order_description: String,
    #[serde(default)]
    pub shopper_language_code: String,
    #[serde(default)]
    pub shopper_email_address: Option<String>,
    #[serde(default)]
    pub amount_value: Option<String>,
    #[serde(default)]
    pub amount_currency_code: Option<String>,
    #[serde(default)]
    pub amount_exponent: Option<String>,
}

/// A decoded transaction still missing the merchant code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub order_code: String,
    pub description: String,
    pub language_code: String,
    pub shopper_email: Option<String>,
    pub amount: Amount,
    pub payment_token: Option<PaymentToken>,
}

impl DecodedTransaction {
    pub fn into_request(self, merchant_code: impl Into<String>) -> TransactionRequest {
        TransactionRequest {
            merchant_code: merchant_code.into(),
            order_code: self.order_code,
            description: self.description,
            language_code: self.language_code,
            shopper_email: self.shopper_email,
            amount: self.amount,
            payment_token: self.payment_token,
        }
    }
}

/// Everything needed to render one gateway submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub merchant_code: String,
    pub order_code: String,
    pub description: String,
    pub language_code: String,
    pub shopper_email: Option<String>,
    pub amount: Amount,
    pub payment_token: Option<PaymentToken>,
}

/// Body of `POST /getApplePaySession`.
#[derive(Deserialize, Debug)]
pub struct SessionRequest {
    #[serde(default)]
    pub url: String,
}
