use axum::headers::authorization::Bearer;
use axum::headers::Authorization;
use axum::{Extension, Json, TypedHeader};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::ops::Add;
use std::sync::Arc;

use crate::{breaks, proceeds, Error, Payload};

type HmacSha256 = Hmac<Sha256>;

pub const ADMIN_ROLE: &str = "administrator";
pub const ADMIN_PERMISSIONS: &[&str] = &[
    "manage_registrations",
    "manage_partnerships",
    "manage_gallery",
];

/// Source of administrator password hashes. The default is an in-memory
/// table, swappable for a persisted store without touching the handlers.
pub trait CredentialRepository: Send + Sync {
    fn password_hash(&self, username: &str) -> Option<String>;
}

pub struct CredentialTable {
    entries: HashMap<String, String>,
}

impl CredentialTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Builds the table of portal administrators, hashing each password at
    /// construction so nothing is kept in plaintext.
    pub fn with_defaults() -> anyhow::Result<Self> {
        let mut table = Self::new();
        table.insert("admin", "whibc2025")?;
        table.insert("superadmin", "whibc@admin2025")?;
        Ok(table)
    }

    pub fn insert(&mut self, username: &str, password: &str) -> anyhow::Result<()> {
        let hash = Pbkdf2
            .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
            .map_err(|err| anyhow::anyhow!("Could not hash password: {}", err))?
            .to_string();
        self.entries.insert(username.to_string(), hash);
        Ok(())
    }
}

impl CredentialRepository for CredentialTable {
    fn password_hash(&self, username: &str) -> Option<String> {
        self.entries.get(username).cloned()
    }
}

/// Issues and checks stateless session tokens of the form
/// `hex(subject).expiry_unix.hex(hmac_sha256_tag)`. Validity is fully
/// determined by the signature and the embedded expiry; there is no
/// server-side session store and no revocation path.
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    pub fn issue(&self, subject: &str) -> Result<(String, DateTime<Utc>), Error> {
        let expires_at = Utc::now().add(self.ttl);
        let message = format!("{}.{}", hex::encode(subject), expires_at.timestamp());
        let tag = self.sign(&message)?;
        Ok((format!("{}.{}", message, hex::encode(tag)), expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<String, Error> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(Error::unauthorized("Invalid session token"));
        }

        let message = format!("{}.{}", parts[0], parts[1]);
        let tag = hex::decode(parts[2])
            .map_err(|_| Error::unauthorized("Invalid session token"))?;
        let mut mac = self.mac()?;
        mac.update(message.as_bytes());
        if mac.verify_slice(&tag).is_err() {
            return Err(Error::unauthorized("Invalid session token"));
        }

        let expiry = parts[1]
            .parse::<i64>()
            .map_err(|_| Error::unauthorized("Invalid session token"))?;
        if Utc::now().timestamp() >= expiry {
            return Err(Error::unauthorized("Session token expired"));
        }

        let subject = hex::decode(parts[0])
            .ok()
            .and_then(|raw| String::from_utf8(raw).ok())
            .ok_or_else(|| Error::unauthorized("Invalid session token"))?;
        Ok(subject)
    }

    fn sign(&self, message: &str) -> Result<Vec<u8>, Error> {
        let mut mac = self.mac()?;
        mac.update(message.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn mac(&self) -> Result<HmacSha256, Error> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| Error::InternalError {
            kind: "CryptoError",
            message: "Could not initialize token signer".to_string(),
        })
    }
}

/// Couples the credential repository with the token service; the only way
/// in is `authenticate`, the only way to stay in is `verify`.
pub struct AuthKeeper {
    credentials: Box<dyn CredentialRepository>,
    tokens: TokenService,
}

impl AuthKeeper {
    pub fn new(credentials: Box<dyn CredentialRepository>, tokens: TokenService) -> Self {
        Self {
            credentials,
            tokens,
        }
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<IssuedSession, Error> {
        let stored = match self.credentials.password_hash(username) {
            Some(hash) => hash,
            None => return Err(Error::unauthorized("Invalid username or password")),
        };
        let hash = PasswordHash::new(&stored)
            .map_err(|_| Error::unauthorized("Invalid username or password"))?;
        let matches = Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok();
        if !matches {
            return Err(Error::unauthorized("Invalid username or password"));
        }

        let (access_token, expires_at) = self.tokens.issue(username)?;
        Ok(IssuedSession {
            access_token,
            token_type: "bearer",
            expires_at,
            admin_info: AdminInfo::for_user(username),
        })
    }

    pub fn verify(&self, token: &str) -> Result<String, Error> {
        self.tokens.verify(token)
    }
}

/// Extracts and checks the bearer token on protected routes, yielding the
/// authenticated username.
pub fn require_admin(
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    keeper: &AuthKeeper,
) -> Result<String, Error> {
    if let Some(TypedHeader(Authorization(bearer))) = auth {
        keeper.verify(bearer.token())
    } else {
        Err(Error::unauthorized("Missing bearer token"))
    }
}

pub async fn admin_login(
    Extension(keeper): Extension<Arc<AuthKeeper>>,
    Json(login): Json<AdminLogin>,
) -> Payload<IssuedSession> {
    if login.username.is_empty() || login.password.is_empty() {
        return breaks(Error::validation(
            "`username` and `password` must not be empty",
        ));
    }

    match keeper.authenticate(&login.username, &login.password) {
        Ok(session) => {
            log::info!("Administrator `{}` logged in", session.admin_info.username);
            proceeds(session)
        }
        Err(err) => breaks(err),
    }
}

pub async fn verify_token(
    Extension(keeper): Extension<Arc<AuthKeeper>>,
    Json(body): Json<VerifyToken>,
) -> Payload<VerifiedSession> {
    match keeper.verify(&body.token) {
        Ok(username) => proceeds(VerifiedSession {
            valid: true,
            admin_info: AdminInfo::for_user(&username),
        }),
        Err(err) => breaks(err),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminInfo {
    pub username: String,
    pub role: &'static str,
    pub permissions: &'static [&'static str],
}

impl AdminInfo {
    pub fn for_user(username: &str) -> Self {
        Self {
            username: username.to_string(),
            role: ADMIN_ROLE,
            permissions: ADMIN_PERMISSIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub admin_info: AdminInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminLogin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyToken {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifiedSession {
    pub valid: bool,
    pub admin_info: AdminInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keeper_with_ttl(ttl: Duration) -> AuthKeeper {
        let credentials = CredentialTable::with_defaults().unwrap();
        AuthKeeper::new(Box::new(credentials), TokenService::new("test-secret", ttl))
    }

    #[test]
    fn authenticate_accepts_known_administrator() {
        let keeper = keeper_with_ttl(Duration::hours(24));
        let session = keeper.authenticate("admin", "whibc2025").unwrap();
        assert_eq!(session.token_type, "bearer");
        assert_eq!(session.admin_info.role, "administrator");
        assert_eq!(keeper.verify(&session.access_token).unwrap(), "admin");
    }

    #[test]
    fn authenticate_rejects_wrong_password_and_unknown_user() {
        let keeper = keeper_with_ttl(Duration::hours(24));
        assert!(matches!(
            keeper.authenticate("admin", "wrongpassword"),
            Err(Error::Unauthorized { .. })
        ));
        assert!(matches!(
            keeper.authenticate("nobody", "whibc2025"),
            Err(Error::Unauthorized { .. })
        ));
    }

    #[test]
    fn token_expires_after_ttl() {
        let tokens = TokenService::new("test-secret", Duration::seconds(-5));
        let (token, _) = tokens.issue("admin").unwrap();
        assert!(matches!(
            tokens.verify(&token),
            Err(Error::Unauthorized { .. })
        ));
    }

    #[test]
    fn token_rejects_tampering() {
        let tokens = TokenService::new("test-secret", Duration::hours(1));
        let (token, _) = tokens.issue("admin").unwrap();

        // flip the last hex digit of the signature
        let mut tampered = token.clone();
        let last = if tampered.ends_with('0') { '1' } else { '0' };
        tampered.pop();
        tampered.push(last);
        assert!(tokens.verify(&tampered).is_err());

        // swap in a different subject under the same signature
        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", hex::encode("superadmin"), parts[1], parts[2]);
        assert!(tokens.verify(&forged).is_err());
    }

    #[test]
    fn token_rejects_malformed_input() {
        let tokens = TokenService::new("test-secret", Duration::hours(1));
        for bad in ["", "garbage", "a.b", "xx.notanumber.zz", "a.b.c.d"] {
            assert!(tokens.verify(bad).is_err(), "accepted: {:?}", bad);
        }
    }

    #[test]
    fn token_from_different_secret_is_rejected() {
        let issuer = TokenService::new("secret-one", Duration::hours(1));
        let checker = TokenService::new("secret-two", Duration::hours(1));
        let (token, _) = issuer.issue("admin").unwrap();
        assert!(checker.verify(&token).is_err());
    }

    #[test]
    fn require_admin_gates_on_bearer_header() {
        let keeper = keeper_with_ttl(Duration::hours(1));
        assert!(matches!(
            require_admin(None, &keeper),
            Err(Error::Unauthorized { .. })
        ));

        let session = keeper.authenticate("admin", "whibc2025").unwrap();
        let header = TypedHeader(Authorization::bearer(&session.access_token).unwrap());
        assert_eq!(require_admin(Some(header), &keeper).unwrap(), "admin");
    }
}
