//! Mailer port - email_output_to hook の送信先
//!
//! 実際のメール送信（SMTP など）は外部コラボレーターです。
//! fire-and-forget: 送信エラーは実装側でログに残し、呼び出し元には返しません。

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage);
}
