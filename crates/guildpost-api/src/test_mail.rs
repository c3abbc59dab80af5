//! Mailer doubles shared by the domain-operation tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use guildpost_mail::{MailError, Mailer, Notifier, OutboundEmail};

pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn last(&self) -> OutboundEmail {
        self.sent.lock().unwrap().last().expect("no mail sent").clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Simulates an unreachable transport.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: &OutboundEmail) -> Result<(), MailError> {
        Err(MailError::Rejected(503))
    }
}

pub fn recording() -> (Arc<RecordingMailer>, Notifier) {
    let mailer = RecordingMailer::new();
    let notifier = Notifier::new(mailer.clone());
    (mailer, notifier)
}

pub fn failing() -> Notifier {
    Notifier::new(Arc::new(FailingMailer))
}
