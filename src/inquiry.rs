use crate::catalog::Catalog;
use crate::email::EmailService;
use crate::i18n::I18n;
use crate::language::Language;
use crate::models::{CustomerInquiry, InquiryFormData};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionOutcome {
    pub inquiry: CustomerInquiry,
    /// Whether the internal notification mail went out.
    pub notified: bool,
}

/**
 * validate_inquiry
 * 姓名必填；中文页面要求电话，英文页面要求邮箱。返回字段名到提示语的映射。
 */
pub fn validate_inquiry(
    form: &InquiryFormData,
    lang: Language,
    i18n: &I18n,
) -> BTreeMap<&'static str, String> {
    let mut errors = BTreeMap::new();
    if form.name.trim().is_empty() {
        errors.insert("name", i18n.t(lang, "form.nameRequired"));
    }
    match lang {
        Language::Zh if form.phone.trim().is_empty() => {
            errors.insert("phone", i18n.t(lang, "form.phoneRequired"));
        }
        Language::En if form.email.as_deref().map_or(true, |e| e.trim().is_empty()) => {
            errors.insert("email", i18n.t(lang, "form.emailRequired"));
        }
        _ => {}
    }
    errors
}

pub struct InquiryService {
    catalog: Catalog,
    email: Arc<EmailService>,
}

impl InquiryService {
    pub fn new(catalog: Catalog, email: Arc<EmailService>) -> Self {
        Self { catalog, email }
    }

    /**
     * submit
     * 依次执行：通知邮件 → 客户确认邮件 → 写入存储。
     * 三步互相独立，邮件失败只记录日志，咨询仍然保存。
     */
    pub async fn submit(&self, mut form: InquiryFormData) -> Result<SubmissionOutcome> {
        form.normalize();

        let notified = match self.email.send_inquiry_notification(&form).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Inquiry notification not sent: {:?}", e);
                false
            }
        };

        self.email.send_confirmation(&form).await;

        let inquiry = self.catalog.submit_inquiry(&form).await?;
        log::info!("Inquiry {} stored (notified={})", inquiry.id, notified);
        Ok(SubmissionOutcome { inquiry, notified })
    }
}
