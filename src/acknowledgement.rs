//! Typed view of the gateway's `paymentService/reply` document.
//!
//! Reading the reply is advisory: the submission outcome is decided by the
//! HTTP status, and the acknowledgement is only logged.

use serde::Deserialize;

use crate::error::{Error, Result, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayAcknowledgement {
    Authorised { order_code: String },
    Refused { order_code: String },
    /// Any other last event, e.g. `SENT_FOR_AUTHORISATION`.
    Pending {
        order_code: String,
        last_event: String,
    },
    Error { code: String, message: String },
}

#[derive(Deserialize)]
struct Reply {
    reply: ReplyBody,
}

#[derive(Deserialize)]
struct ReplyBody {
    #[serde(rename = "orderStatus", default)]
    order_status: Option<OrderStatus>,
    #[serde(default)]
    error: Option<ReplyError>,
}

#[derive(Deserialize)]
struct OrderStatus {
    #[serde(rename = "@orderCode", default)]
    order_code: String,
    #[serde(default)]
    payment: Option<Payment>,
    #[serde(default)]
    error: Option<ReplyError>,
}

#[derive(Deserialize)]
struct Payment {
    #[serde(rename = "lastEvent")]
    last_event: String,
}

#[derive(Deserialize)]
struct ReplyError {
    #[serde(rename = "@code", default)]
    code: String,
    #[serde(rename = "$text", default)]
    message: String,
}

impl From<ReplyError> for GatewayAcknowledgement {
    fn from(e: ReplyError) -> Self {
        GatewayAcknowledgement::Error {
            code: e.code,
            message: e.message.trim().to_string(),
        }
    }
}

impl GatewayAcknowledgement {
    pub fn parse(body: &[u8]) -> Result<Self> {
        let text =
            std::str::from_utf8(body).map_err(|e| Error::encoding(Stage::Acknowledgement, e))?;
        let reply: Reply =
            quick_xml::de::from_str(text).map_err(|e| Error::encoding(Stage::Acknowledgement, e))?;

        if let Some(error) = reply.reply.error {
            return Ok(error.into());
        }
        let Some(status) = reply.reply.order_status else {
            return Err(Error::encoding(
                Stage::Acknowledgement,
                "reply has neither orderStatus nor error",
            ));
        };
        if let Some(error) = status.error {
            return Ok(error.into());
        }
        let Some(payment) = status.payment else {
            return Err(Error::encoding(
                Stage::Acknowledgement,
                "orderStatus has no payment",
            ));
        };

        let order_code = status.order_code;
        Ok(match payment.last_event.trim() {
            "AUTHORISED" => GatewayAcknowledgement::Authorised { order_code },
            "REFUSED" => GatewayAcknowledgement::Refused { order_code },
            other => GatewayAcknowledgement::Pending {
                order_code,
                last_event: other.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod acknowledgement_tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn order_reply(last_event: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE paymentService PUBLIC "-//WorldPay//DTD WorldPay PaymentService v1//EN" "http://dtd.worldpay.com/paymentService_v1.dtd">
<paymentService version="1.4" merchantCode="EMPORIUM">
  <reply>
    <orderStatus orderCode="8f3a-11c2-9e0d">
      <payment>
        <paymentMethod>VISA_CREDIT-SSL</paymentMethod>
        <amount value="199" currencyCode="GBP" exponent="2" debitCreditIndicator="credit"/>
        <lastEvent>{}</lastEvent>
        <CVCResultCode description="NOT SENT TO ACQUIRER"/>
      </payment>
    </orderStatus>
  </reply>
</paymentService>"#,
            last_event
        )
    }

    #[test]
    fn test_authorised() {
        let ack = GatewayAcknowledgement::parse(order_reply("AUTHORISED").as_bytes()).unwrap();
        assert_eq!(
            ack,
            GatewayAcknowledgement::Authorised {
                order_code: "8f3a-11c2-9e0d".into()
            }
        );
    }

    #[test]
    fn test_refused_and_pending() {
        assert!(matches!(
            GatewayAcknowledgement::parse(order_reply("REFUSED").as_bytes()).unwrap(),
            GatewayAcknowledgement::Refused { .. }
        ));
        assert_eq!(
            GatewayAcknowledgement::parse(order_reply("SENT_FOR_AUTHORISATION").as_bytes())
                .unwrap(),
            GatewayAcknowledgement::Pending {
                order_code: "8f3a-11c2-9e0d".into(),
                last_event: "SENT_FOR_AUTHORISATION".into(),
            }
        );
    }

    #[test]
    fn test_reply_error() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<paymentService version="1.4" merchantCode="EMPORIUM">
  <reply>
    <error code="5"><![CDATA[XML failed validation]]></error>
  </reply>
</paymentService>"#;
        assert_eq!(
            GatewayAcknowledgement::parse(body.as_bytes()).unwrap(),
            GatewayAcknowledgement::Error {
                code: "5".into(),
                message: "XML failed validation".into(),
            }
        );
    }

    #[test]
    fn test_unreadable_reply() {
        let err = GatewayAcknowledgement::parse(b"OK").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Acknowledgement));
    }
}
