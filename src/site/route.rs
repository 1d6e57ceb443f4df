use crate::admin::AuthState;
use chrono::{DateTime, Utc};

/// Client-side routes of the site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Catalog,
    Admin,
    About,
    Contact,
    NotFound,
}

impl Route {
    /// Entries of the header navigation; the admin route is not linked
    pub const NAVIGATION: [Route; 3] = [Route::Catalog, Route::About, Route::Contact];

    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("");
        match path.trim_end_matches('/') {
            "" => Route::Catalog,
            "/admin" => Route::Admin,
            "/about" => Route::About,
            "/contact" => Route::Contact,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Catalog => "/",
            Route::Admin => "/admin",
            Route::About => "/about",
            Route::Contact => "/contact",
            Route::NotFound => "/404",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Catalog => "Browse Cars",
            Route::Admin => "Car Management",
            Route::About => "About Us",
            Route::Contact => "Contact",
            Route::NotFound => "Page Not Found",
        }
    }
}

/// Screen to show for a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Catalog,
    AdminLogin,
    AdminPanel,
    About,
    Contact,
    NotFound,
}

/// The admin route shows the login form until a live session exists
pub fn resolve_view(route: Route, auth: &AuthState, now: DateTime<Utc>) -> View {
    let signed_in = auth.session().is_some_and(|session| !session.is_expired(now));
    match route {
        Route::Catalog => View::Catalog,
        Route::Admin if signed_in => View::AdminPanel,
        Route::Admin => View::AdminLogin,
        Route::About => View::About,
        Route::Contact => View::Contact,
        Route::NotFound => View::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AdminSession;
    use chrono::{Duration, TimeZone};

    #[test]
    fn parses_paths() {
        assert_eq!(Route::parse("/"), Route::Catalog);
        assert_eq!(Route::parse(""), Route::Catalog);
        assert_eq!(Route::parse("/admin/"), Route::Admin);
        assert_eq!(Route::parse("/about?ref=nav"), Route::About);
        assert_eq!(Route::parse("/contact#map"), Route::Contact);
        assert_eq!(Route::parse("/cars/12"), Route::NotFound);
        for route in Route::NAVIGATION {
            assert_eq!(Route::parse(route.path()), route);
        }
    }

    fn session(expires_at: Option<DateTime<Utc>>) -> AuthState {
        AuthState::SignedIn(AdminSession {
            user_id: "u1".into(),
            email: None,
            access_token: "t".into(),
            refresh_token: None,
            expires_at,
        })
    }

    #[test]
    fn admin_route_is_gated() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(resolve_view(Route::Admin, &AuthState::SignedOut, now), View::AdminLogin);
        assert_eq!(resolve_view(Route::Admin, &session(None), now), View::AdminPanel);
        assert_eq!(
            resolve_view(Route::Admin, &session(Some(now + Duration::minutes(5))), now),
            View::AdminPanel
        );
        assert_eq!(resolve_view(Route::Catalog, &AuthState::SignedOut, now), View::Catalog);
    }

    #[test]
    fn expired_session_falls_back_to_login() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let expired = session(Some(now - Duration::seconds(1)));
        assert_eq!(resolve_view(Route::Admin, &expired, now), View::AdminLogin);
        assert_eq!(resolve_view(Route::Admin, &session(Some(now)), now), View::AdminLogin);
    }
}
