//! LogMailer - メール送信の代わりに tracing に記録する Mailer
//!
//! 実際の SMTP 送信はコア外のコラボレーターです。トランスポートが
//! 用意されていないプロセスではこれを使います。

use async_trait::async_trait;
use tracing::info;

use crate::config::MailSettings;
use crate::ports::{MailMessage, Mailer};

#[derive(Debug, Clone, Default)]
pub struct LogMailer {
    from: Option<String>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &MailSettings) -> Self {
        Self {
            from: settings.from.clone(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) {
        info!(
            from = self.from.as_deref().unwrap_or("-"),
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "mail (no transport configured)"
        );
    }
}
