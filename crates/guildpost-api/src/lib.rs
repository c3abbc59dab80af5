pub mod announcements;
pub mod auth;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod newsletter;
pub mod responses;
pub mod tokens;
pub mod views;

#[cfg(test)]
pub(crate) mod test_mail;
