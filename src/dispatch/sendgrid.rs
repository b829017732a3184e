use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Serialize;

use super::{Mailer, Message};
use crate::structures::errors::DeliveryError;

pub const DEFAULT_API_URL: &str = "https://api.sendgrid.com";

/// Sends mail through the SendGrid v3 `mail/send` endpoint.
#[derive(Debug, Clone)]
pub struct SendGridMailer {
    client: Client,
    api_url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct MailSend<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 2],
}

impl<'a> From<&'a Message> for MailSend<'a> {
    fn from(message: &'a Message) -> Self {
        MailSend {
            personalizations: [Personalization {
                to: [Address {
                    email: &message.to,
                    name: None,
                }],
            }],
            from: Address {
                email: &message.from.address,
                name: Some(&message.from.name),
            },
            subject: &message.subject,
            content: [
                Content {
                    kind: "text/plain",
                    value: &message.text,
                },
                Content {
                    kind: "text/html",
                    value: &message.html,
                },
            ],
        }
    }
}

impl SendGridMailer {
    pub fn new(
        client: Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        let url = format!("{}/v3/mail/send", self.api_url);
        debug!("sending report to {} via {}", message.to, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&MailSend::from(message))
            .send()
            .await?;

        let status = response.status();
        match status.is_success() {
            true => Ok(()),
            false => Err(DeliveryError::Rejected {
                status,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}
