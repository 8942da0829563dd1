// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transactional mail client (Postmark-style HTTP API).
//!
//! The loyalty subsystem only needs one capability from mail: deliver a
//! short verification-code message. Rendering of rich HTML templates is
//! the mail provider's concern, not ours.

use crate::error::AppError;

/// Transactional mail API client.
#[derive(Clone)]
pub struct MailerService {
    http: Option<reqwest::Client>,
    base_url: String,
    server_token: String,
    from: String,
    /// Mock-mode switch: when offline, whether sends report success.
    mock_delivers: bool,
}

impl MailerService {
    /// Create a new mail client against the configured API.
    pub fn new(base_url: String, server_token: String, from: String) -> Self {
        Self {
            http: Some(reqwest::Client::new()),
            base_url,
            server_token,
            from,
            mock_delivers: true,
        }
    }

    /// Offline mock whose sends always succeed (for tests).
    pub fn new_mock() -> Self {
        Self {
            http: None,
            base_url: String::new(),
            server_token: String::new(),
            from: "test@brewpoints.app".to_string(),
            mock_delivers: true,
        }
    }

    /// Offline mock whose sends always fail (for tests of the
    /// notification-failure path).
    pub fn new_mock_failing() -> Self {
        Self {
            http: None,
            base_url: String::new(),
            server_token: String::new(),
            from: "test@brewpoints.app".to_string(),
            mock_delivers: false,
        }
    }

    /// Send a transactional message. Failure maps to
    /// `AppError::NotificationFailed`; callers decide what to unwind.
    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let http = match &self.http {
            Some(http) => http,
            None => {
                if self.mock_delivers {
                    tracing::debug!(to, subject, "Mock mailer: delivery skipped");
                    return Ok(());
                }
                return Err(AppError::NotificationFailed(
                    "mock mailer configured to fail".to_string(),
                ));
            }
        };

        let body = serde_json::json!({
            "From": self.from,
            "To": to,
            "Subject": subject,
            "TextBody": text_body,
            "HtmlBody": html_body,
        });

        let response = http
            .post(format!("{}/email", self.base_url))
            .header("X-Postmark-Server-Token", &self.server_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::NotificationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::NotificationFailed(format!(
                "mail API returned {}: {}",
                status, body
            )));
        }

        tracing::info!(to, subject, "Transactional mail delivered");
        Ok(())
    }

    /// Deliver a verification code for the given action.
    pub async fn send_verification_code(
        &self,
        to: &str,
        action: &str,
        code: &str,
    ) -> Result<(), AppError> {
        let subject = format!("Your {} code", action);
        let text = format!(
            "Your {} verification code is {}. It expires shortly; if you did not request this, ignore this message.",
            action, code
        );
        let html = format!(
            "<p>Your {} verification code is <strong>{}</strong>.</p><p>It expires shortly; if you did not request this, ignore this message.</p>",
            action, code
        );
        self.send(to, &subject, &text, &html).await
    }
}
