use crate::backend::{AdminSession, AuthProvider, Credentials};
use tracing::{info, warn};

/// Who is using the admin route
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn(AdminSession),
}

impl AuthState {
    pub fn session(&self) -> Option<&AdminSession> {
        match self {
            AuthState::SignedIn(session) => Some(session),
            AuthState::SignedOut => None,
        }
    }
}

/// Sign-in / sign-up form of the admin route
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub is_sign_up: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
}

impl LoginForm {
    pub fn heading(&self) -> &'static str {
        if self.is_sign_up {
            "Create seller account"
        } else {
            "Sign in to manage cars"
        }
    }

    pub fn toggle_mode(&mut self) {
        self.is_sign_up = !self.is_sign_up;
        self.error = None;
        self.notice = None;
    }

    /// Submit the form. Failures land in `error` for inline display.
    pub async fn submit(&mut self, auth: &dyn AuthProvider) -> AuthState {
        self.error = None;
        self.notice = None;
        let credentials = Credentials::new(self.email.trim(), self.password.as_str());

        let result = if self.is_sign_up {
            auth.sign_up(&credentials).await
        } else {
            auth.sign_in(&credentials).await.map(Some)
        };

        match result {
            Ok(Some(session)) => {
                info!("Admin {} authenticated", credentials.email);
                self.password.clear();
                AuthState::SignedIn(session)
            }
            Ok(None) => {
                self.notice = Some("Check your email to confirm your account".to_string());
                AuthState::SignedOut
            }
            Err(e) => {
                warn!("Authentication failed for {}: {}", credentials.email, e);
                self.error = Some(e.message().to_string());
                AuthState::SignedOut
            }
        }
    }
}
