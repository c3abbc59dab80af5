use std::sync::Arc;

use tracing::warn;

use crate::client::{Mailer, OutboundEmail};

/// What happened, with everything the mail body needs. Captured by the
/// caller *before* any deletion, so the message can still reference the
/// announcement and response afterwards.
#[derive(Debug, Clone)]
pub enum Notification {
    ConfirmRegistration {
        code: String,
    },
    NewResponse {
        responder: String,
        title: String,
        text: String,
    },
    ResponseAccepted {
        title: String,
    },
    ResponseRejected {
        title: String,
    },
    ResponseReopened {
        title: String,
    },
    ResponseDeleted {
        title: String,
        text: String,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::ConfirmRegistration { .. } => "confirm_registration",
            Notification::NewResponse { .. } => "new_response",
            Notification::ResponseAccepted { .. } => "response_accepted",
            Notification::ResponseRejected { .. } => "response_rejected",
            Notification::ResponseReopened { .. } => "response_reopened",
            Notification::ResponseDeleted { .. } => "response_deleted",
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::ConfirmRegistration { .. } => "Confirm your registration".to_string(),
            Notification::NewResponse { title, .. } => {
                format!("New response to your announcement \"{title}\"")
            }
            Notification::ResponseAccepted { .. } => "Your response was accepted".to_string(),
            Notification::ResponseRejected { .. } => "Your response was rejected".to_string(),
            Notification::ResponseReopened { .. } => {
                "Your response is under review again".to_string()
            }
            Notification::ResponseDeleted { .. } => "Your response was removed".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::ConfirmRegistration { code } => {
                format!("Your confirmation code: {code}\n\nThe code is valid for 24 hours.")
            }
            Notification::NewResponse {
                responder,
                title,
                text,
            } => {
                format!("{responder} responded to \"{title}\":\n\n{text}")
            }
            Notification::ResponseAccepted { title } => {
                format!("Your response to \"{title}\" was accepted.")
            }
            Notification::ResponseRejected { title } => {
                format!("Your response to \"{title}\" was rejected.")
            }
            Notification::ResponseReopened { title } => {
                format!("Your response to \"{title}\" was moved back to pending.")
            }
            Notification::ResponseDeleted { title, text } => {
                format!("Your response to \"{title}\" was removed by the author:\n\n{text}")
            }
        }
    }
}

/// Best-effort notification sender: one delivery attempt per event, no
/// retries, no queue. A failed send is logged and reported as a warning
/// string; it never becomes an error for the triggering operation.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Attempt one send to a single recipient. Returns a warning message
    /// on transport failure, `None` on success.
    pub async fn notify(&self, recipient: &str, notification: Notification) -> Option<String> {
        let email = OutboundEmail {
            to: vec![recipient.to_string()],
            subject: notification.subject(),
            body: notification.body(),
        };

        match self.mailer.send(&email).await {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    recipient,
                    kind = notification.kind(),
                    error = %e,
                    "notification delivery failed"
                );
                Some(format!(
                    "the {} notification could not be delivered",
                    notification.kind()
                ))
            }
        }
    }

    /// One send addressed to all recipients at once (newsletter path).
    pub async fn broadcast(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Option<String> {
        let email = OutboundEmail {
            to: recipients.to_vec(),
            subject: subject.to_string(),
            body: body.to_string(),
        };

        match self.mailer.send(&email).await {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    recipients = recipients.len(),
                    error = %e,
                    "newsletter delivery failed"
                );
                Some("the newsletter could not be delivered".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MailError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingMailer {
        sent: Mutex<Vec<OutboundEmail>>,
    }

    impl RecordingMailer {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _email: &OutboundEmail) -> Result<(), MailError> {
            Err(MailError::Rejected(503))
        }
    }

    #[tokio::test]
    async fn notify_sends_one_mail_to_the_recipient() {
        let mailer = Arc::new(RecordingMailer::new());
        let notifier = Notifier::new(mailer.clone());

        let warning = notifier
            .notify(
                "alice@guild.test",
                Notification::NewResponse {
                    responder: "bob".into(),
                    title: "Tank needed".into(),
                    text: "I can tank".into(),
                },
            )
            .await;

        assert!(warning.is_none());
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["alice@guild.test"]);
        assert!(sent[0].subject.contains("Tank needed"));
        assert!(sent[0].body.contains("I can tank"));
    }

    #[tokio::test]
    async fn transport_failure_becomes_a_warning() {
        let notifier = Notifier::new(Arc::new(FailingMailer));

        let warning = notifier
            .notify(
                "bob@guild.test",
                Notification::ResponseAccepted {
                    title: "Tank needed".into(),
                },
            )
            .await;

        let warning = warning.expect("failure must surface as a warning");
        assert!(warning.contains("response_accepted"));
    }

    #[tokio::test]
    async fn broadcast_addresses_all_recipients_in_one_send() {
        let mailer = Arc::new(RecordingMailer::new());
        let notifier = Notifier::new(mailer.clone());

        let recipients = vec!["a@guild.test".to_string(), "b@guild.test".to_string()];
        let warning = notifier.broadcast(&recipients, "News", "hello").await;

        assert!(warning.is_none());
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.len(), 2);
    }

    #[test]
    fn every_kind_names_itself_in_subject_or_body() {
        let title = "Tank needed".to_string();
        let cases = [
            Notification::ConfirmRegistration { code: "c0de".into() },
            Notification::ResponseAccepted { title: title.clone() },
            Notification::ResponseRejected { title: title.clone() },
            Notification::ResponseReopened { title: title.clone() },
            Notification::ResponseDeleted {
                title,
                text: "I can tank".into(),
            },
        ];
        for case in cases {
            assert!(!case.subject().is_empty());
            assert!(!case.body().is_empty());
        }
    }
}
