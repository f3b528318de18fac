use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};
use sha2::{Digest, Sha512};

use crate::domain::request::MethodRequest;

/// Login that switches token verification to the hourly admin scheme.
pub const ADMIN_LOGIN: &str = "admin";

/// Source of "now" for token and birthday checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
/// Wall clock in the server's local time zone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Debug, Clone, Copy)]
/// Clock pinned to one instant.
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

#[derive(Clone)]
/// Token verification for [`MethodRequest`] credentials.
///
/// Regular callers present `sha512(account + login + salt)`; the admin login
/// presents `sha512(YYYYMMDDHH + admin_salt)` for the current local hour, which
/// is recomputed every time a token is checked.
pub struct Authenticator {
    salt: String,
    admin_salt: String,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(salt: impl Into<String>, admin_salt: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            admin_salt: admin_salt.into(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock, mostly for tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    /// Token a regular (non-admin) caller must present.
    pub fn user_token(&self, account: &str, login: &str) -> String {
        sha512_hex(&format!("{account}{login}{}", self.salt))
    }

    /// Token the admin must present during the hour containing `at`.
    pub fn admin_token(&self, at: DateTime<Local>) -> String {
        sha512_hex(&format!("{}{}", at.format("%Y%m%d%H"), self.admin_salt))
    }

    pub fn is_authenticated(&self, request: &MethodRequest) -> bool {
        let expected = if request.is_admin() {
            self.admin_token(self.clock.now())
        } else {
            self.user_token(request.account().as_str(), request.login().as_str())
        };
        expected == request.token().as_str()
    }
}

fn sha512_hex(input: &str) -> String {
    hex::encode(Sha512::digest(input.as_bytes()))
}
