pub mod client;
pub mod notify;

pub use client::{HttpMailClient, MailError, Mailer, OutboundEmail};
pub use notify::{Notification, Notifier};
