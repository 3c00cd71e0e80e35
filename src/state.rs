use std::sync::Arc;

use crate::config::Settings;
use crate::document::DocumentTemplate;
use crate::error::Result;
use crate::identity::FileBasedMerchantValidationConfig;
use crate::protocol::GatewayClient;
use crate::validation::MerchantValidationService;

/// Read-only services shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub validation: Arc<MerchantValidationService>,
    pub gateway: Arc<GatewayClient>,
    pub template: Arc<DocumentTemplate>,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let merchant_config = FileBasedMerchantValidationConfig {
            cert_file_path: settings.merchant_cert_path.clone(),
            request_body_file_path: settings.merchant_request_path.clone(),
        };
        let validation =
            MerchantValidationService::new(settings.validation_timeout, &merchant_config)?;
        let gateway = GatewayClient::new(
            settings.gateway_url.as_str(),
            settings.gateway_merchant_code.as_str(),
            settings.gateway_password.as_str(),
            settings.submission_timeout,
        )?;
        Ok(AppState {
            validation: Arc::new(validation),
            gateway: Arc::new(gateway),
            template: Arc::new(DocumentTemplate::new()?),
        })
    }
}
