use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Identity returned by a store once a credential checks out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub subject: String,
    pub username: String,
    pub email_verified: bool,
}

/// Answers whether a credential is valid. Implementations must not reveal
/// which half of the credential was wrong.
pub trait CredentialStore: Send + Sync {
    fn verify(&self, credential: &Credential) -> Option<Account>;
}

struct StoredAccount {
    account: Account,
    password_hash: String,
}

const DECOY_PASSWORD: &str = "decoy-password-never-matches-an-account";

/// In-memory store keyed by username with Argon2 password hashes.
/// Unknown usernames are checked against a decoy hash so both failure paths cost one Argon2 verify.
pub struct StaticCredentialStore {
    accounts: HashMap<String, StoredAccount>,
    decoy_hash: String,
    hash_checks: AtomicU64,
}

impl StaticCredentialStore {
    pub fn new() -> Result<Self> {
        Ok(Self {
            accounts: HashMap::new(),
            decoy_hash: hash_password(DECOY_PASSWORD)?,
            hash_checks: AtomicU64::new(0),
        })
    }

    /// The two demo accounts, `admin` and `user`, both with password `password`.
    pub fn demo() -> Result<Self> {
        Self::new()?
            .with_account("admin", "password")?
            .with_account("user", "password")
    }

    pub fn with_account(mut self, username: &str, password: &str) -> Result<Self> {
        let password_hash = hash_password(password)?;
        let account = Account {
            subject: username.to_string(),
            username: username.to_string(),
            email_verified: true,
        };
        self.accounts.insert(
            username.to_string(),
            StoredAccount {
                account,
                password_hash,
            },
        );
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Number of Argon2 verifications performed so far.
    pub fn hash_checks(&self) -> u64 {
        self.hash_checks.load(Ordering::Relaxed)
    }

    fn password_matches(&self, password_hash: &str, password: &str) -> bool {
        self.hash_checks.fetch_add(1, Ordering::Relaxed);
        PasswordHash::new(password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

impl CredentialStore for StaticCredentialStore {
    fn verify(&self, credential: &Credential) -> Option<Account> {
        match self.accounts.get(&credential.username) {
            Some(stored) => self
                .password_matches(&stored.password_hash, &credential.password)
                .then(|| stored.account.clone()),
            None => {
                self.password_matches(&self.decoy_hash, &credential.password);
                None
            }
        }
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("Failed to hash password: {err}"))
}
