use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// How long the contact success notice stays up
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Transient message that dismisses itself
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    shown_at: Instant,
    ttl: Duration,
}

impl Notice {
    pub fn new(message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            message: message.into(),
            shown_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.shown_at.elapsed() < self.ttl
    }

    /// Resolves once the notice should be hidden
    pub async fn dismissed(&self) {
        tokio::time::sleep_until(self.shown_at + self.ttl).await;
    }
}

/// Visitor enquiry form on the contact page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl ContactForm {
    /// Record the enquiry, clear the fields and return the success notice
    pub fn submit(&mut self) -> Notice {
        info!(
            "Contact enquiry from {} <{}> ({} chars)",
            self.name,
            self.email,
            self.message.chars().count()
        );
        *self = Self::default();
        Notice::new("Thank you! Your message has been sent.", NOTICE_TTL)
    }
}
