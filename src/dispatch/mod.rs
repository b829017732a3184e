//! Fan-out of a rendered report to many recipients.
//!
//! Every recipient gets its own task inside a [`JoinSet`]. A supervisor task
//! owns the set, logs each completion and builds a [`DispatchSummary`].
//! [`Dispatcher::dispatch`] returns as soon as the tasks are spawned, so a
//! request can respond while mail is still in flight. One recipient's failure
//! never affects another's send.

pub mod sendgrid;

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info, warn};
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::{
    report::Report,
    structures::errors::{DeliveryError, StatusBoardError},
};

/// A non-empty, de-duplicated list of recipient addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients(Vec<String>);

impl Recipients {
    /// Collects addresses from form values. Each value may hold several
    /// addresses separated by commas, semicolons or whitespace.
    pub fn parse<'a, I>(values: I) -> Result<Self, StatusBoardError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut addresses: Vec<String> = Vec::new();
        for address in values
            .into_iter()
            .flat_map(|value| value.split(|c: char| c == ',' || c == ';' || c.is_whitespace()))
            .filter(|address| !address.is_empty())
        {
            if !addresses.iter().any(|seen| seen == address) {
                addresses.push(address.to_string());
            }
        }

        match addresses.is_empty() {
            true => Err(StatusBoardError::NoRecipients),
            false => Ok(Self(addresses)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl IntoIterator for Recipients {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Who the mail claims to come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub name: String,
    pub address: String,
}

/// One email addressed to exactly one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: Sender,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivers a single message through some external provider.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), DeliveryError>;
}

/// Outcome of one dispatch, assembled as the sends finish.
#[derive(Debug, Default)]
pub struct DispatchSummary {
    pub delivered: Vec<String>,
    pub failed: Vec<(String, DeliveryError)>,
    /// send tasks that panicked or were cancelled
    pub aborted: usize,
}

/// Handle on a running dispatch. Dropping it detaches the sends, which carry
/// on in the background.
#[derive(Debug)]
pub struct DispatchHandle(JoinHandle<DispatchSummary>);

impl DispatchHandle {
    /// Waits for every send to finish.
    pub async fn wait(self) -> Result<DispatchSummary, JoinError> {
        self.0.await
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    mailer: Arc<dyn Mailer>,
    sender: Sender,
}

impl Dispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, sender: Sender) -> Self {
        Self { mailer, sender }
    }

    /// Starts one send per recipient and returns without waiting for any of
    /// them. Must be called from within a tokio runtime.
    ///
    /// Sends still running when the runtime shuts down are dropped and never
    /// reach the summary; the per-recipient "Sending report" line is the only
    /// trace they leave.
    pub fn dispatch(&self, report: &Report, recipients: Recipients) -> DispatchHandle {
        let mut sends = JoinSet::new();
        for to in recipients {
            let mailer = Arc::clone(&self.mailer);
            let message = Message {
                from: self.sender.clone(),
                to,
                subject: report.subject.clone(),
                text: report.text.clone(),
                html: report.html.clone(),
            };
            sends.spawn(async move {
                info!("Sending report to {}", message.to);
                let outcome = mailer.send(&message).await;
                (message.to, outcome)
            });
        }
        info!("Dispatching report to {} recipient(s)", sends.len());
        DispatchHandle(tokio::spawn(supervise(sends)))
    }
}

async fn supervise(
    mut sends: JoinSet<(String, Result<(), DeliveryError>)>,
) -> DispatchSummary {
    let mut summary = DispatchSummary::default();
    while let Some(joined) = sends.join_next().await {
        match joined {
            Ok((to, Ok(()))) => {
                info!("Report delivered to {}", to);
                summary.delivered.push(to);
            }
            Ok((to, Err(e))) => {
                warn!("Failed to deliver report to {}: {}", to, e);
                summary.failed.push((to, e));
            }
            Err(e) => {
                error!("Report send task did not finish: {}", e);
                summary.aborted += 1;
            }
        }
    }
    info!(
        "Report dispatch finished: {} delivered, {} failed, {} aborted",
        summary.delivered.len(),
        summary.failed.len(),
        summary.aborted
    );
    summary
}
