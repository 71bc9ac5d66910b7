//! Identity store: principals, credentials and the single active session.
//!
//! # Responsibility
//! - Own `Principal` records, their credentials and the current session.
//! - Authenticate, register and delete principals at the store boundary.
//!
//! # Invariants
//! - A credential exists iff a principal with the same email exists.
//! - Principals with role `admin` are never deleted.
//! - At most one session (principal + token) is active per instance.
//! - Multi-key writes (session, registration, deletion) either land on every
//!   key or are reverted, so memory and the durable snapshot agree.
//! - Secrets, tokens and emails never reach the log.

use crate::clock::Clock;
use crate::model::principal::{Principal, PrincipalId, Role};
use crate::model::session::SessionToken;
use crate::storage::{keys, load_json, save_json, Storage, StorageError};
use crate::store::entity_store::{Derive, EntityStore, StoreError, StoreEvent, SubscriptionId};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

const MIN_SECRET_CHARS: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug)]
pub enum IdentityError {
    /// Email/secret pair did not match.
    Authentication,
    /// Registration email already belongs to a principal.
    DuplicateEmail(String),
    /// Admin principals cannot be deleted; admin-only operation refused.
    Forbidden,
    NotFound(PrincipalId),
    /// Registration input failed boundary validation.
    InvalidInput(&'static str),
    Storage(StorageError),
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "invalid email or password"),
            Self::DuplicateEmail(email) => write!(f, "email already registered: {email}"),
            Self::Forbidden => write!(f, "operation forbidden for current principal"),
            Self::NotFound(id) => write!(f, "principal not found: {id}"),
            Self::InvalidInput(reason) => write!(f, "invalid registration input: {reason}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IdentityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for IdentityError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<StoreError<Infallible>> for IdentityError {
    fn from(value: StoreError<Infallible>) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::DuplicateId(_) => Self::InvalidInput("principal id already in use"),
            StoreError::Rejected(never) => match never {},
            StoreError::Storage(err) => Self::Storage(err),
        }
    }
}

/// Registration form payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub secret: String,
    pub secret_confirm: String,
}

impl RegisterRequest {
    fn validate(&self) -> IdentityResult<()> {
        if self.name.trim().is_empty() {
            return Err(IdentityError::InvalidInput("name must not be empty"));
        }
        if !EMAIL_RE.is_match(&self.email) {
            return Err(IdentityError::InvalidInput("email is malformed"));
        }
        if self.secret.chars().count() < MIN_SECRET_CHARS {
            return Err(IdentityError::InvalidInput("password is too short"));
        }
        if self.secret != self.secret_confirm {
            return Err(IdentityError::InvalidInput("passwords do not match"));
        }
        Ok(())
    }
}

/// Email index and role counts over the principal collection.
#[derive(Debug, Default)]
pub struct PrincipalDirectory {
    by_email: BTreeMap<String, PrincipalId>,
    admin_count: usize,
}

impl PrincipalDirectory {
    pub fn id_for_email(&self, email: &str) -> Option<PrincipalId> {
        self.by_email.get(email).copied()
    }

    pub fn admin_count(&self) -> usize {
        self.admin_count
    }
}

impl Derive<Principal> for PrincipalDirectory {
    fn derive(records: &[Principal]) -> Self {
        Self {
            by_email: records
                .iter()
                .map(|principal| (principal.email.clone(), principal.id))
                .collect(),
            admin_count: records.iter().filter(|principal| principal.is_admin()).count(),
        }
    }
}

/// Owner of identities and the current session.
pub struct IdentityStore {
    principals: EntityStore<Principal, PrincipalDirectory>,
    credentials: BTreeMap<String, String>,
    current: Option<Principal>,
    token: Option<SessionToken>,
    storage: Rc<dyn Storage>,
    clock: Rc<dyn Clock>,
}

impl IdentityStore {
    /// Restores identities and session from `storage`, seeding on first use.
    pub fn open(storage: Rc<dyn Storage>, clock: Rc<dyn Clock>) -> IdentityResult<Self> {
        let principals: EntityStore<Principal, PrincipalDirectory> =
            EntityStore::open(keys::PRINCIPALS, Rc::clone(&storage), Rc::clone(&clock))?;
        let credentials: Option<BTreeMap<String, String>> =
            load_json(storage.as_ref(), keys::CREDENTIALS)?;
        let needs_seed = !principals.was_restored() || credentials.is_none();

        let mut store = Self {
            principals,
            credentials: credentials.unwrap_or_default(),
            current: load_json(storage.as_ref(), keys::CURRENT_PRINCIPAL)?,
            token: load_json(storage.as_ref(), keys::SESSION_TOKEN)?,
            storage,
            clock,
        };

        if needs_seed {
            store.seed()?;
        }
        store.drop_stale_session()?;
        Ok(store)
    }

    /// Installs the two fixed principals and their credentials.
    pub fn seed(&mut self) -> IdentityResult<()> {
        let seed = vec![
            Principal {
                id: 1,
                name: "Admin User".to_string(),
                email: "admin@example.com".to_string(),
                role: Role::Admin,
            },
            Principal {
                id: 2,
                name: "Normal User".to_string(),
                email: "user@example.com".to_string(),
                role: Role::User,
            },
        ];
        self.credentials = BTreeMap::from([
            ("admin@example.com".to_string(), "admin123".to_string()),
            ("user@example.com".to_string(), "user123".to_string()),
        ]);
        self.persist_credentials()?;
        self.principals.replace_all(seed)?;
        info!(
            "event=identity_seed module=identity status=ok principals={}",
            self.principals.len()
        );
        Ok(())
    }

    /// Authenticates `email`/`secret` and opens a session on success.
    ///
    /// A failed attempt leaves any existing session untouched.
    pub fn login(&mut self, email: &str, secret: &str) -> IdentityResult<Principal> {
        let matched = self
            .find_by_email(email)
            .filter(|_| self.credentials.get(email).is_some_and(|stored| stored == secret))
            .cloned();

        let Some(principal) = matched else {
            warn!("event=login module=identity status=error error_code=bad_credentials");
            return Err(IdentityError::Authentication);
        };

        self.start_session(principal.clone())?;
        info!(
            "event=login module=identity status=ok principal_id={}",
            principal.id
        );
        Ok(principal)
    }

    /// Creates a `user` principal and logs it in.
    pub fn register(&mut self, request: RegisterRequest) -> IdentityResult<Principal> {
        if self.find_by_email(&request.email).is_some() {
            warn!("event=register module=identity status=error error_code=duplicate_email");
            return Err(IdentityError::DuplicateEmail(request.email));
        }
        request.validate()?;

        let RegisterRequest {
            name,
            email,
            secret,
            ..
        } = request;
        let principal = self
            .principals
            .insert(Principal::new(name.trim(), email.clone(), Role::User))?;

        self.credentials.insert(email, secret);
        if let Err(err) = self.commit_registration(&principal) {
            warn!(
                "event=register module=identity status=error error_code=commit_failed principal_id={}",
                principal.id
            );
            self.undo_registration(&principal);
            return Err(err);
        }

        info!(
            "event=register module=identity status=ok principal_id={}",
            principal.id
        );
        Ok(principal)
    }

    /// Ends the session; principals and credentials are kept.
    pub fn logout(&mut self) -> IdentityResult<()> {
        let principal_id = self.current.take().map(|principal| principal.id);
        self.token = None;
        self.storage.remove(keys::CURRENT_PRINCIPAL)?;
        self.storage.remove(keys::SESSION_TOKEN)?;
        info!(
            "event=logout module=identity status=ok principal_id={}",
            principal_id.unwrap_or_default()
        );
        Ok(())
    }

    /// Explicitly assigns the session to `principal`, issuing a fresh token.
    pub fn set_current_principal(&mut self, principal: Principal) -> IdentityResult<()> {
        if self.principals.get(principal.id).is_none() {
            return Err(IdentityError::NotFound(principal.id));
        }
        self.start_session(principal)
    }

    pub fn current_principal(&self) -> Option<&Principal> {
        self.current.as_ref()
    }

    pub fn session_token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    /// Whether a session token is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.is_some()
    }

    /// Returns the current principal when it is an admin.
    pub fn require_admin(&self) -> IdentityResult<&Principal> {
        match &self.current {
            Some(principal) if principal.is_admin() && self.token.is_some() => Ok(principal),
            _ => Err(IdentityError::Forbidden),
        }
    }

    pub fn list_principals(&self) -> &[Principal] {
        self.principals.list()
    }

    pub fn get_principal(&self, id: PrincipalId) -> Option<&Principal> {
        self.principals.get(id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<&Principal> {
        self.principals
            .view()
            .id_for_email(email)
            .and_then(|id| self.principals.get(id))
    }

    pub fn directory(&self) -> &PrincipalDirectory {
        self.principals.view()
    }

    /// Deletes a non-admin principal together with its credential.
    ///
    /// Returns `Ok(false)` when no principal has `id`, and
    /// `Err(IdentityError::Forbidden)` when the target is an admin.
    pub fn delete_principal(&mut self, id: PrincipalId) -> IdentityResult<bool> {
        let Some(target) = self.principals.get(id) else {
            return Ok(false);
        };
        if target.is_admin() {
            warn!(
                "event=principal_delete module=identity status=error error_code=admin_protected principal_id={id}"
            );
            return Err(IdentityError::Forbidden);
        }
        let email = target.email.clone();

        // Credential before principal: a half-done delete leaves no login path.
        let secret = self.credentials.remove(&email);
        if let Err(err) = self.persist_credentials() {
            self.restore_credential(email, secret);
            return Err(err.into());
        }
        if let Err(err) = self.principals.remove(id) {
            self.restore_credential(email, secret);
            if let Err(restore_err) = self.persist_credentials() {
                error!(
                    "event=principal_delete module=identity status=error error_code=rollback_failed principal_id={id} error={restore_err}"
                );
            }
            return Err(err.into());
        }

        if self.current.as_ref().is_some_and(|current| current.id == id) {
            self.logout()?;
        }
        info!("event=principal_delete module=identity status=ok principal_id={id}");
        Ok(true)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.principals.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.principals.unsubscribe(id)
    }

    /// Writes both session keys, then installs the session in memory.
    ///
    /// A failed token write puts the previous `currentPrincipal` back.
    fn start_session(&mut self, principal: Principal) -> IdentityResult<()> {
        let token = SessionToken::issue(&principal.email, self.clock.now_ms());
        let previous_principal = self.storage.get(keys::CURRENT_PRINCIPAL)?;
        save_json(self.storage.as_ref(), keys::CURRENT_PRINCIPAL, &principal)?;
        if let Err(err) = save_json(self.storage.as_ref(), keys::SESSION_TOKEN, &token) {
            self.restore_raw(keys::CURRENT_PRINCIPAL, previous_principal);
            return Err(err.into());
        }
        self.current = Some(principal);
        self.token = Some(token);
        Ok(())
    }

    fn commit_registration(&mut self, principal: &Principal) -> IdentityResult<()> {
        self.persist_credentials()?;
        self.start_session(principal.clone())
    }

    /// Reverts a registration whose credential or session write failed.
    fn undo_registration(&mut self, principal: &Principal) {
        self.credentials.remove(&principal.email);
        if let Err(err) = self.persist_credentials() {
            error!(
                "event=register module=identity status=error error_code=rollback_failed principal_id={} error={err}",
                principal.id
            );
        }
        if let Err(err) = self.principals.remove(principal.id) {
            error!(
                "event=register module=identity status=error error_code=rollback_failed principal_id={} error={err}",
                principal.id
            );
        }
    }

    fn restore_credential(&mut self, email: String, secret: Option<String>) {
        if let Some(secret) = secret {
            self.credentials.insert(email, secret);
        }
    }

    /// Puts back a raw value captured before a failed multi-key write.
    fn restore_raw(&self, key: &str, previous: Option<String>) {
        let restored = match &previous {
            Some(raw) => self.storage.set(key, raw),
            None => self.storage.remove(key),
        };
        if let Err(err) = restored {
            error!("event=session_rollback module=identity status=error key={key} error={err}");
        }
    }

    fn persist_credentials(&self) -> Result<(), StorageError> {
        save_json(self.storage.as_ref(), keys::CREDENTIALS, &self.credentials)
    }

    /// Drops a restored session that is half-written, whose principal no
    /// longer exists, or whose token was issued for another email.
    fn drop_stale_session(&mut self) -> IdentityResult<()> {
        let stale = match (&self.current, &self.token) {
            (None, None) => false,
            (Some(principal), Some(token)) => {
                self.principals.get(principal.id) != Some(principal)
                    || token.email().as_deref() != Some(principal.email.as_str())
            }
            _ => true,
        };
        if stale {
            warn!("event=session_restore module=identity status=error error_code=stale_session");
            self.logout()?;
        }
        Ok(())
    }
}
