//! Operator alerts over SNS.

use crate::aws::sdk_error;
use crate::error::{DbError, DbResult};
use crate::models::{NotificationResult, Severity, Status};
use chrono::{DateTime, Utc};
use std::future::Future;
use tracing::{info, warn};

/// Topic name used when only the account id is known.
pub const DEFAULT_TOPIC_NAME: &str = "agentcore-database-alerts";

/// SNS subject length limit, in characters.
pub const MAX_SUBJECT_CHARS: usize = 100;

/// Publishes a message to a topic and returns the message id.
pub trait AlertPublisher: Send + Sync {
    fn publish(
        &self,
        topic_arn: &str,
        subject: &str,
        message: &str,
    ) -> impl Future<Output = DbResult<String>> + Send;
}

#[derive(Debug, Clone)]
pub struct SnsPublisher {
    client: aws_sdk_sns::Client,
}

impl SnsPublisher {
    pub fn new(sdk_config: &aws_types::SdkConfig) -> Self {
        Self {
            client: aws_sdk_sns::Client::new(sdk_config),
        }
    }
}

impl AlertPublisher for SnsPublisher {
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> DbResult<String> {
        let response = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .map_err(|e| sdk_error("SNS", "Publish", e))?;
        Ok(response.message_id().unwrap_or_default().to_string())
    }
}

/// `arn:aws:sns:{region}:{account}:agentcore-database-alerts`
pub fn derive_topic_arn(region: &str, account_id: &str) -> String {
    format!("arn:aws:sns:{region}:{account_id}:{DEFAULT_TOPIC_NAME}")
}

/// `[SEVERITY] Database Alert: subject`, cut to the SNS subject limit.
pub fn format_subject(severity: Severity, subject: &str) -> String {
    // SNS rejects control characters in subjects
    let line: String = subject
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    format!("[{severity}] Database Alert: {}", line.trim())
        .chars()
        .take(MAX_SUBJECT_CHARS)
        .collect()
}

pub fn format_message(
    severity: Severity,
    subject: &str,
    message: &str,
    sent_at: DateTime<Utc>,
) -> String {
    format!(
        "DATABASE OPERATIONS ALERT\n\
         ========================\n\
         Timestamp: {}\n\
         Severity: {}\n\
         Subject: {}\n\
         \n\
         {}\n\
         \n\
         ---\n\
         Sent by {} {}\n",
        sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
        severity,
        subject,
        message,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    )
}

pub struct AlertNotifier<P> {
    publisher: P,
    topic_arn: Option<String>,
}

impl<P: AlertPublisher> AlertNotifier<P> {
    /// `topic_arn` is `None` when neither a topic nor an account id is configured;
    /// every send then fails with a configuration error.
    pub fn new(publisher: P, topic_arn: Option<String>) -> Self {
        Self {
            publisher,
            topic_arn: topic_arn.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn topic_arn(&self) -> Option<&str> {
        self.topic_arn.as_deref()
    }

    pub async fn send_alert(
        &self,
        subject: &str,
        message: &str,
        severity: Severity,
    ) -> NotificationResult {
        let mut result = NotificationResult {
            status: Status::Success,
            message_id: None,
            subject: subject.to_string(),
            severity,
            topic_arn: self.topic_arn.clone(),
            error: None,
            error_kind: None,
        };

        match self.try_send(subject, message, severity).await {
            Ok(message_id) => {
                info!(severity = %severity, message_id = %message_id, "Alert published");
                result.message_id = Some(message_id);
            }
            Err(e) => {
                warn!(severity = %severity, error = %e, "Alert not published");
                result.status = Status::Error;
                result.error = Some(e.to_string());
                result.error_kind = Some(e.kind());
            }
        }
        result
    }

    async fn try_send(&self, subject: &str, message: &str, severity: Severity) -> DbResult<String> {
        let topic_arn = self.topic_arn.as_deref().ok_or_else(|| {
            DbError::config("No SNS topic configured; set --sns-topic-arn or AWS_ACCOUNT_ID")
        })?;
        if subject.trim().is_empty() {
            return Err(DbError::invalid_input("subject must not be empty"));
        }

        let subject_line = format_subject(severity, subject);
        let body = format_message(severity, subject, message, Utc::now());
        self.publisher.publish(topic_arn, &subject_line, &body).await
    }
}
