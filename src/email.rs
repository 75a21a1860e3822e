use crate::models::{InquiryFormData, InquiryType};
use anyhow::Result;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";
const COMPANY_SENDER: &str = "捷瀚液压 JIEHAN HYDRAULIC";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub service_id: String,
    pub template_id: String,
    pub user_id: String,
    pub notify_to: String,
}

/**
 * EmailService
 * 通过 EmailJS REST 接口发送咨询通知与客户确认邮件。
 * 未配置时所有发送都返回错误，由调用方决定是否忽略。
 */
pub struct EmailService {
    client: Client,
    endpoint: String,
    config: Option<EmailConfig>,
}

fn inquiry_type_label(kind: InquiryType) -> &'static str {
    match kind {
        InquiryType::Consultation => "咨询预约",
        InquiryType::General => "一般咨询",
    }
}

/// Template parameters for the internal notification mail.
pub fn notification_params(data: &InquiryFormData, notify_to: &str) -> Value {
    let reply_to = data.email.as_deref().unwrap_or(&data.phone);
    json!({
        "to_email": notify_to,
        "from_name": data.name,
        "from_company": data.company.as_deref().unwrap_or("未提供"),
        "from_phone": data.phone,
        "from_email": data.email.as_deref().unwrap_or("未提供"),
        "message": data.message.as_deref().unwrap_or("无详细描述"),
        "inquiry_type": inquiry_type_label(data.inquiry_type),
        "reply_to": reply_to
    })
}

/// Confirmation mail parameters; `None` when the visitor left no email.
pub fn confirmation_params(data: &InquiryFormData, reply_to: &str) -> Option<Value> {
    let email = data.email.as_deref()?;
    Some(json!({
        "to_email": email,
        "from_name": COMPANY_SENDER,
        "customer_name": data.name,
        "inquiry_type": inquiry_type_label(data.inquiry_type),
        "reply_to": reply_to
    }))
}

impl EmailService {
    pub fn new(config: Option<EmailConfig>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(8))
            .build()?;
        Ok(Self {
            client,
            endpoint: EMAILJS_SEND_URL.to_string(),
            config,
        })
    }

    pub fn from_env() -> Result<Self> {
        let config = match (
            env::var("EMAILJS_SERVICE_ID").ok(),
            env::var("EMAILJS_TEMPLATE_ID").ok(),
            env::var("EMAILJS_USER_ID").ok(),
        ) {
            (Some(service_id), Some(template_id), Some(user_id)) => Some(EmailConfig {
                service_id,
                template_id,
                user_id,
                notify_to: env::var("INQUIRY_NOTIFY_EMAIL").unwrap_or_default(),
            }),
            _ => {
                log::warn!("EMAILJS_* not configured, inquiry mail dispatch is disabled");
                None
            }
        };
        Self::new(config)
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn send(&self, config: &EmailConfig, template_params: Value) -> Result<()> {
        let payload = json!({
            "service_id": config.service_id,
            "template_id": config.template_id,
            "user_id": config.user_id,
            "template_params": template_params
        });

        let resp = self.client.post(&self.endpoint).json(&payload).send().await?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(anyhow::anyhow!("EmailJS error: {} {}", status, body))
    }

    pub async fn send_inquiry_notification(&self, data: &InquiryFormData) -> Result<()> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Email service not configured"))?;
        self.send(config, notification_params(data, &config.notify_to))
            .await?;
        log::info!("Inquiry notification sent for {}", data.name);
        Ok(())
    }

    /// Best effort; failures are logged and never reach the caller.
    pub async fn send_confirmation(&self, data: &InquiryFormData) {
        let Some(config) = self.config.as_ref() else {
            return;
        };
        let Some(params) = confirmation_params(data, &config.notify_to) else {
            return;
        };
        match self.send(config, params).await {
            Ok(()) => log::info!("Confirmation mail sent"),
            Err(e) => log::warn!("Confirmation mail failed: {:?}", e),
        }
    }
}
