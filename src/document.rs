//! Renders the WorldPay `paymentService` submission for an Apple Pay order.
//!
//! The document is a set of serde structs written by `quick-xml`, which
//! escapes every attribute and text value. Token fields are opaque strings
//! from the network and must never be spliced into markup by hand.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, Stage};
use crate::model::{PaymentToken, TransactionRequest};

const PAYMENT_SERVICE_VERSION: &str = "1.4";

const PROLOG: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    "\n",
    r#"<!DOCTYPE paymentService PUBLIC "-//WorldPay/DTD WorldPay PaymentService v1//EN" "http://dtd.worldpay.com/paymentService_v1.dtd">"#,
    "\n",
);

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename = "paymentService")]
pub struct PaymentService {
    #[serde(rename = "@version")]
    pub version: String,
    #[serde(rename = "@merchantCode")]
    pub merchant_code: String,
    pub submit: Submit,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Submit {
    pub order: Order,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Order {
    #[serde(rename = "@orderCode")]
    pub order_code: String,
    #[serde(rename = "@shopperLanguageCode")]
    pub shopper_language_code: String,
    pub description: String,
    pub amount: AmountElement,
    #[serde(rename = "orderContent", default)]
    pub order_content: String,
    #[serde(
        rename = "paymentDetails",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub payment_details: Option<PaymentDetails>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shopper: Option<Shopper>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct AmountElement {
    #[serde(rename = "@value", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "@currencyCode", skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(rename = "@exponent", skip_serializing_if = "Option::is_none")]
    pub exponent: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PaymentDetails {
    #[serde(rename = "APPLEPAY-SSL")]
    pub apple_pay: ApplePaySsl,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ApplePaySsl {
    pub header: ApplePayHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplePayHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Shopper {
    #[serde(rename = "shopperEmailAddress")]
    pub shopper_email_address: String,
}

impl From<PaymentToken> for PaymentDetails {
    fn from(token: PaymentToken) -> Self {
        PaymentDetails {
            apple_pay: ApplePaySsl {
                header: ApplePayHeader {
                    ephemeral_public_key: token.header.ephemeral_public_key,
                    public_key_hash: token.header.public_key_hash,
                    transaction_id: token.header.transaction_id,
                },
                signature: token.signature,
                version: token.version,
                data: token.data,
            },
        }
    }
}

impl From<TransactionRequest> for PaymentService {
    fn from(request: TransactionRequest) -> Self {
        PaymentService {
            version: PAYMENT_SERVICE_VERSION.to_string(),
            merchant_code: request.merchant_code,
            submit: Submit {
                order: Order {
                    order_code: request.order_code,
                    shopper_language_code: request.language_code,
                    description: request.description,
                    amount: AmountElement {
                        value: request.amount.value,
                        currency_code: request.amount.currency_code,
                        exponent: request.amount.exponent,
                    },
                    order_content: String::new(),
                    payment_details: request.payment_token.map(PaymentDetails::from),
                    shopper: request.shopper_email.map(|shopper_email_address| Shopper {
                        shopper_email_address,
                    }),
                },
            },
        }
    }
}

/// Characters allowed by the XML 1.0 `Char` production. Escaping cannot
/// represent anything outside it.
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn check_field(name: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else { return Ok(()) };
    match value.chars().position(|c| !is_xml_char(c)) {
        None => Ok(()),
        Some(at) => Err(Error::encoding(
            Stage::DocumentContent,
            format!("{} has a character not allowed in XML at position {}", name, at),
        )),
    }
}

fn check_request(request: &TransactionRequest) -> Result<()> {
    let token = request.payment_token.as_ref();
    let fields = [
        ("merchantCode", Some(request.merchant_code.as_str())),
        ("orderCode", Some(request.order_code.as_str())),
        ("shopperLanguageCode", Some(request.language_code.as_str())),
        ("description", Some(request.description.as_str())),
        ("amount value", request.amount.value.as_deref()),
        ("currencyCode", request.amount.currency_code.as_deref()),
        ("exponent", request.amount.exponent.as_deref()),
        ("shopperEmailAddress", request.shopper_email.as_deref()),
        ("ephemeralPublicKey", token.and_then(|t| t.header.ephemeral_public_key.as_deref())),
        ("publicKeyHash", token.and_then(|t| t.header.public_key_hash.as_deref())),
        ("transactionId", token.and_then(|t| t.header.transaction_id.as_deref())),
        ("signature", token.and_then(|t| t.signature.as_deref())),
        ("version", token.and_then(|t| t.version.as_deref())),
        ("data", token.and_then(|t| t.data.as_deref())),
    ];
    fields
        .into_iter()
        .try_for_each(|(name, value)| check_field(name, value))
}

/// The fixed parts of the submission document.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug)]
pub struct DocumentTemplate {
    prolog: &'static str,
}

impl DocumentTemplate {
    /// Checks the fixed prolog is well formed. A failure here is a defect in
    /// the build and should stop the process.
    pub fn new() -> Result<Self> {
        Self::with_prolog(PROLOG)
    }

    fn with_prolog(prolog: &'static str) -> Result<Self> {
        let mut reader = Reader::from_str(prolog);
        let mut saw_doctype = false;
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::DocType(_)) => saw_doctype = true,
                Ok(Event::Decl(_)) | Ok(Event::Text(_)) => {}
                Ok(other) => {
                    return Err(Error::encoding(
                        Stage::Document,
                        format!("unexpected prolog content: {:?}", other),
                    ))
                }
                Err(e) => return Err(Error::encoding(Stage::Document, e)),
            }
        }
        if !saw_doctype {
            return Err(Error::encoding(Stage::Document, "prolog has no doctype"));
        }
        Ok(DocumentTemplate { prolog })
    }

    /// Renders the submission document for one transaction.
    pub fn encode(&self, request: TransactionRequest) -> Result<Vec<u8>> {
        check_request(&request)?;
        let body = quick_xml::se::to_string(&PaymentService::from(request))
            .map_err(|e| Error::encoding(Stage::Document, e))?;
        let mut document = String::with_capacity(self.prolog.len() + body.len());
        document.push_str(self.prolog);
        document.push_str(&body);
        Ok(document.into_bytes())
    }
}

#[cfg(test)]
mod document_tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Amount, PaymentDataHeader};

    fn request() -> TransactionRequest {
        TransactionRequest {
            merchant_code: "EMPORIUM".into(),
            order_code: "8f3a-11c2-9e0d".into(),
            description: "Donation".into(),
            language_code: "en".into(),
            shopper_email: Some("shopper@example.com".into()),
            amount: Amount {
                value: Some("199".into()),
                currency_code: Some("GBP".into()),
                exponent: Some("2".into()),
            },
            payment_token: Some(PaymentToken {
                version: Some("EC_v1".into()),
                data: Some("3+f4oOTwPa6f1UZ6tG".into()),
                signature: Some("MIAGCSqGSIb3DQEHAqCAMIACAQEx".into()),
                header: PaymentDataHeader {
                    ephemeral_public_key: Some("MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE".into()),
                    public_key_hash: Some("LbsUwAT6w1JV9tFXocU813TCHks=".into()),
                    transaction_id: Some("40d2b4ef6ea8d20d".into()),
                },
            }),
        }
    }

    fn parse(document: &[u8]) -> PaymentService {
        let text = std::str::from_utf8(document).expect("utf-8");
        quick_xml::de::from_str(text).expect("document parses")
    }

    #[test]
    fn test_document_layout() {
        let template = DocumentTemplate::new().expect("template builds");
        let document = template.encode(request()).expect("encodes");
        let text = String::from_utf8(document.clone()).unwrap();

        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE paymentService"));
        assert!(text.contains(r#"<paymentService version="1.4" merchantCode="EMPORIUM">"#));
        assert!(text.contains(r#"<order orderCode="8f3a-11c2-9e0d" shopperLanguageCode="en">"#));
        assert!(text.contains(r#"<amount value="199" currencyCode="GBP" exponent="2""#));
        assert!(text.contains("<APPLEPAY-SSL><header><ephemeralPublicKey>"));
        assert!(text.contains("<version>EC_v1</version>"));
        assert!(text.contains("<shopperEmailAddress>shopper@example.com</shopperEmailAddress>"));

        let parsed = parse(&document);
        let apple_pay = &parsed
            .submit
            .order
            .payment_details
            .as_ref()
            .expect("payment details")
            .apple_pay;
        assert_eq!(apple_pay.header.transaction_id.as_deref(), Some("40d2b4ef6ea8d20d"));
        assert_eq!(apple_pay.data.as_deref(), Some("3+f4oOTwPa6f1UZ6tG"));
    }

    #[test]
    fn test_special_characters_survive_reparse() {
        let mut req = request();
        req.description = "Fish & <Chips> \"large\"".into();
        req.order_code = "a\"b<c>&d".into();
        if let Some(token) = req.payment_token.as_mut() {
            token.signature = Some("</signature><injected>&amp;".into());
        }

        let document = DocumentTemplate::new().unwrap().encode(req).expect("encodes");
        let text = String::from_utf8(document.clone()).unwrap();
        assert!(!text.contains("<injected>"));

        let parsed = parse(&document);
        assert_eq!(parsed.submit.order.description, "Fish & <Chips> \"large\"");
        assert_eq!(parsed.submit.order.order_code, "a\"b<c>&d");
        assert_eq!(
            parsed
                .submit
                .order
                .payment_details
                .and_then(|d| d.apple_pay.signature)
                .as_deref(),
            Some("</signature><injected>&amp;")
        );
    }

    #[test]
    fn test_control_characters_rejected() {
        let mut req = request();
        if let Some(token) = req.payment_token.as_mut() {
            token.signature = Some("ab\u{1}cd\u{0}".into());
        }
        let err = DocumentTemplate::new().unwrap().encode(req).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::DocumentContent));
        assert!(err.to_string().contains("signature"));
        assert!(!err.to_string().contains("ab\u{1}cd"));

        let mut req = request();
        req.description = "line\u{b}feed".into();
        let err = DocumentTemplate::new().unwrap().encode(req).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::DocumentContent));
    }

    #[test]
    fn test_allowed_whitespace_and_unicode_kept() {
        let mut req = request();
        req.description = "Caf\u{e9}\tdonation\r\n\u{1F600}".into();
        let document = DocumentTemplate::new().unwrap().encode(req).expect("encodes");
        assert!(parse(&document).submit.order.description.starts_with("Caf\u{e9}\tdonation"));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let mut req = request();
        req.amount.exponent = None;
        req.shopper_email = None;
        req.payment_token = None;

        let document = DocumentTemplate::new().unwrap().encode(req).expect("encodes");
        let text = String::from_utf8(document).unwrap();
        assert!(text.contains(r#"<amount value="199" currencyCode="GBP""#));
        assert!(!text.contains("exponent="));
        assert!(!text.contains("paymentDetails"));
        assert!(!text.contains("shopper>"));
    }

    #[test]
    fn test_broken_prolog_rejected() {
        let err = DocumentTemplate::with_prolog("<?xml version=\"1.0\"?>\n").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Document));
    }
}
