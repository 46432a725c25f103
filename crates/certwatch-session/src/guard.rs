//! Route guards over session snapshots

use std::fmt;

use certwatch_shared::constants::{ADMIN_ROUTE, DEFAULT_ROUTE, LOGIN_ROUTE, SIGNUP_ROUTE};

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Navigate to `to`; `from` is the location originally requested.
    Redirect { to: &'static str, from: String },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Permits authenticated sessions, otherwise sends the user to log in.
pub fn authenticated_guard(session: &Session, requested: &str) -> GuardDecision {
    if session.is_authenticated() {
        GuardDecision::Allow
    } else {
        GuardDecision::Redirect {
            to: LOGIN_ROUTE,
            from: requested.to_string(),
        }
    }
}

/// Permits admin sessions. Anyone else lands on the default route rather than the login page.
pub fn admin_guard(session: &Session, requested: &str) -> GuardDecision {
    if session.is_authenticated() && session.is_admin() {
        GuardDecision::Allow
    } else {
        GuardDecision::Redirect {
            to: DEFAULT_ROUTE,
            from: requested.to_string(),
        }
    }
}

/// Navigable locations of the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Signup,
    Home,
    SettingDetail(i64),
    FlaggedDetail(i64),
    Admin,
}

impl Route {
    /// Resolve a path; anything unknown falls back to the home route.
    pub fn parse(path: &str) -> Route {
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            ["login"] => Route::Login,
            ["signup"] => Route::Signup,
            ["admin"] => Route::Admin,
            ["settings", "detail", id] => id.parse().map(Route::SettingDetail).unwrap_or(Route::Home),
            ["flagged", id] => id.parse().map(Route::FlaggedDetail).unwrap_or(Route::Home),
            _ => Route::Home,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => LOGIN_ROUTE.to_string(),
            Route::Signup => SIGNUP_ROUTE.to_string(),
            Route::Home => DEFAULT_ROUTE.to_string(),
            Route::SettingDetail(id) => format!("/settings/detail/{}", id),
            Route::FlaggedDetail(id) => format!("/flagged/{}", id),
            Route::Admin => ADMIN_ROUTE.to_string(),
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Login | Route::Signup => Access::Public,
            Route::Home | Route::SettingDetail(_) | Route::FlaggedDetail(_) => Access::Authenticated,
            Route::Admin => Access::Admin,
        }
    }

    pub fn check(&self, session: &Session) -> GuardDecision {
        let path = self.path();
        match self.access() {
            Access::Public => GuardDecision::Allow,
            Access::Authenticated => authenticated_guard(session, &path),
            Access::Admin => admin_guard(session, &path),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
