//! Navigation access guards.
//!
//! # Responsibility
//! - Decide allow/deny for one navigation attempt from identity state.
//! - Translate denials into router redirects.
//!
//! # Invariants
//! - Guards only read the session source; they never mutate a store.
//! - A failure while resolving the current principal counts as "nobody is
//!   logged in", never as an error surfaced to the router.
//! - Authentication denials carry `returnUrl`; admin denials never do.

use crate::model::principal::Principal;
use crate::service::identity_store::{IdentityResult, IdentityStore};
use log::debug;
use url::form_urlencoded;

pub const LOGIN_PATH: &str = "/auth/login";
/// Landing page for authenticated principals.
pub const DEFAULT_LANDING_PATH: &str = "/todos";
pub const RETURN_URL_PARAM: &str = "returnUrl";

/// Read-only view of session state consumed by guards.
pub trait SessionSource {
    fn has_session_token(&self) -> bool;
    fn resolve_current_principal(&self) -> IdentityResult<Option<Principal>>;
}

impl SessionSource for IdentityStore {
    fn has_session_token(&self) -> bool {
        self.is_authenticated()
    }

    fn resolve_current_principal(&self) -> IdentityResult<Option<Principal>> {
        Ok(self.current_principal().cloned())
    }
}

/// Router target for a denied navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    /// Originally attempted path, forwarded as the `returnUrl` query param.
    pub return_url: Option<String>,
}

impl Redirect {
    /// Renders `path` with its query string, e.g. `/auth/login?returnUrl=%2Fadmin`.
    pub fn to_url(&self) -> String {
        match &self.return_url {
            Some(return_url) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(RETURN_URL_PARAM, return_url)
                    .finish();
                format!("{}?{query}", self.path)
            }
            None => self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Deny(Redirect),
}

/// Router side of the guard contract.
pub trait Navigator {
    fn navigate(&mut self, redirect: &Redirect);
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            Self::Allow => None,
            Self::Deny(redirect) => Some(redirect),
        }
    }

    /// Hands any redirect to `navigator` and returns whether to proceed.
    pub fn apply(self, navigator: &mut dyn Navigator) -> bool {
        match self {
            Self::Allow => true,
            Self::Deny(redirect) => {
                navigator.navigate(&redirect);
                false
            }
        }
    }
}

/// Guards attachable to a protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGuard {
    Authenticated,
    Admin,
}

/// Allows navigation iff a session token is held.
pub fn authenticated_guard(session: &dyn SessionSource, attempted_path: &str) -> GuardDecision {
    if session.has_session_token() {
        return GuardDecision::Allow;
    }
    debug!("event=guard module=guard status=deny guard=authenticated");
    GuardDecision::Deny(Redirect {
        path: LOGIN_PATH.to_string(),
        return_url: Some(attempted_path.to_string()),
    })
}

/// Allows navigation iff the current principal is an admin.
pub fn admin_guard(session: &dyn SessionSource) -> GuardDecision {
    let is_admin = session.has_session_token()
        && session
            .resolve_current_principal()
            .ok()
            .flatten()
            .is_some_and(|principal| principal.is_admin());
    if is_admin {
        return GuardDecision::Allow;
    }
    debug!("event=guard module=guard status=deny guard=admin");
    GuardDecision::Deny(Redirect {
        path: DEFAULT_LANDING_PATH.to_string(),
        return_url: None,
    })
}

/// Runs `guards` in order; the first denial wins.
pub fn evaluate_route(
    session: &dyn SessionSource,
    attempted_path: &str,
    guards: &[RouteGuard],
) -> GuardDecision {
    for guard in guards {
        let decision = match guard {
            RouteGuard::Authenticated => authenticated_guard(session, attempted_path),
            RouteGuard::Admin => admin_guard(session),
        };
        if !decision.is_allowed() {
            return decision;
        }
    }
    GuardDecision::Allow
}

/// Where to go after a successful login.
///
/// Only same-origin absolute paths are honored.
pub fn post_login_target(return_url: Option<&str>) -> &str {
    match return_url.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => DEFAULT_LANDING_PATH,
    }
}
