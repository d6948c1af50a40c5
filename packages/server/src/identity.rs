//! Who is making a request.
//!
//! Identity resolution order, first match wins:
//!
//! 1. a valid signed identity cookie
//! 2. the user already recorded on the session
//! 3. the configured default user
//! 4. [`ANONYMOUS`]

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Identity of clients nobody vouched for.
pub const ANONYMOUS: &str = "anonymous";

/// Checks user credentials.
pub trait IdentityProvider: Send + Sync {
    fn validate(&self, user: &str, credential: &str) -> bool;
}

/// Users and hex-encoded SHA-256 digests of their passwords.
#[derive(Clone, Debug, Default)]
pub struct PasswordTable {
    users: HashMap<String, String>,
}

impl PasswordTable {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    /// Digest format stored in the table.
    pub fn digest(password: &str) -> String {
        hex::encode(Sha256::digest(password.as_bytes()))
    }

    pub fn insert(&mut self, user: impl Into<String>, password: &str) {
        self.users.insert(user.into(), Self::digest(password));
    }
}

impl IdentityProvider for PasswordTable {
    fn validate(&self, user: &str, credential: &str) -> bool {
        self.users
            .get(user)
            .is_some_and(|stored| stored.eq_ignore_ascii_case(&Self::digest(credential)))
    }
}

/// Pick the identity for a request. See the module docs for the order.
pub fn resolve_identity(
    cookie_user: Option<&str>,
    session_user: &str,
    default_user: Option<&str>,
) -> String {
    if let Some(user) = cookie_user.filter(|u| !u.is_empty()) {
        return user.to_string();
    }
    if !session_user.is_empty() && session_user != ANONYMOUS {
        return session_user.to_string();
    }
    if let Some(user) = default_user.filter(|u| !u.is_empty()) {
        return user.to_string();
    }
    ANONYMOUS.to_string()
}

/// The signed "current user" cookie:
/// `user|issued|hex(hmac_sha256(key, "user|issued"))`, where `issued` is the
/// signing time in seconds since the Unix epoch.
#[derive(Clone)]
pub struct IdentityCookie {
    name: String,
    key: Vec<u8>,
    max_age: Duration,
}

impl IdentityCookie {
    pub fn new(name: impl Into<String>, key: impl Into<Vec<u8>>, max_age: Duration) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            max_age,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sign(&self, user: &str) -> String {
        self.sign_at(user, unix_now())
    }

    /// Sign `user` as issued at `issued` seconds since the epoch.
    pub fn sign_at(&self, user: &str, issued: u64) -> String {
        let payload = format!("{user}|{issued}");
        let signature = self
            .mac(&payload)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default();
        format!("{payload}|{signature}")
    }

    /// The user of a cookie value, if the signature checks out and the
    /// cookie is not older than its max age.
    pub fn verify<'a>(&self, value: &'a str) -> Option<&'a str> {
        self.verify_at(value, unix_now())
    }

    pub fn verify_at<'a>(&self, value: &'a str, now: u64) -> Option<&'a str> {
        let (payload, signature) = value.rsplit_once('|')?;
        let (user, issued) = payload.rsplit_once('|')?;
        let issued: u64 = issued.parse().ok()?;
        if now.saturating_sub(issued) > self.max_age.as_secs() {
            return None;
        }
        let signature = hex::decode(signature).ok()?;
        self.mac(payload)?.verify_slice(&signature).ok()?;
        Some(user)
    }

    // HMAC takes keys of any length, so this only fails on an hmac bug
    fn mac(&self, payload: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key).ok()?;
        mac.update(payload.as_bytes());
        Some(mac)
    }

    /// `Set-Cookie` value carrying `user`.
    pub fn set_header(&self, user: &str) -> String {
        format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly",
            self.name,
            self.sign(user),
            self.max_age.as_secs()
        )
    }

    /// `Set-Cookie` value that clears the cookie.
    pub fn clear_header(&self) -> String {
        format!("{}=; Path=/; Max-Age=0; HttpOnly", self.name)
    }
}

impl std::fmt::Debug for IdentityCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCookie")
            .field("name", &self.name)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie() -> IdentityCookie {
        IdentityCookie::new("userid", b"secret".to_vec(), Duration::from_secs(60))
    }

    #[test]
    fn signed_cookie_verifies() {
        let c = cookie();
        let value = c.sign("alice");
        assert!(value.starts_with("alice|"));
        assert_eq!(c.verify(&value), Some("alice"));

        // user names may contain the separator
        assert_eq!(c.verify(&c.sign("a|b")), Some("a|b"));
    }

    #[test]
    fn signature_matches_hmac_sha256() {
        // RFC 4231 test case 2, with the payload as the message
        let c = IdentityCookie::new("userid", b"Jefe".to_vec(), Duration::from_secs(60));
        let mut mac = c.mac("what do ya want for nothing?").unwrap();
        assert_eq!(
            hex::encode(mac.clone().finalize().into_bytes()),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
        mac.update(b"!");
        assert!(mac.verify_slice(&[0u8; 32]).is_err());
    }

    #[test]
    fn old_cookie_expires() {
        let c = cookie();
        let value = c.sign_at("alice", 1_000);
        assert_eq!(c.verify_at(&value, 1_000), Some("alice"));
        assert_eq!(c.verify_at(&value, 1_060), Some("alice"));
        assert_eq!(c.verify_at(&value, 1_061), None);
        assert_eq!(c.verify(&value), None);
    }

    #[test]
    fn issue_time_is_signed() {
        let c = cookie();
        let value = c.sign_at("alice", 1_000);
        let moved = value.replacen("|1000|", "|2000|", 1);
        assert_eq!(c.verify_at(&moved, 2_000), None);
    }

    #[test]
    fn tampered_cookie_is_rejected() {
        let c = cookie();
        let value = c.sign("alice").replacen("alice", "mallory", 1);
        assert_eq!(c.verify(&value), None);
        assert_eq!(c.verify("alice"), None);
        assert_eq!(c.verify("alice|zz"), None);
        assert_eq!(c.verify("alice|abcd"), None);
        assert_eq!(c.verify("alice|notatime|abcd"), None);

        let other = IdentityCookie::new("userid", b"other".to_vec(), Duration::ZERO);
        assert_eq!(other.verify(&c.sign("alice")), None);
    }

    #[test]
    fn cookie_headers() {
        let c = cookie();
        let set = c.set_header("bob");
        assert!(set.starts_with("userid=bob|"));
        assert!(set.contains("Max-Age=60"));
        assert_eq!(c.clear_header(), "userid=; Path=/; Max-Age=0; HttpOnly");
    }

    #[test]
    fn identity_order() {
        assert_eq!(resolve_identity(Some("alice"), "bob", Some("guest")), "alice");
        assert_eq!(resolve_identity(None, "bob", Some("guest")), "bob");
        assert_eq!(resolve_identity(None, "", Some("guest")), "guest");
        assert_eq!(resolve_identity(None, ANONYMOUS, Some("guest")), "guest");
        assert_eq!(resolve_identity(Some(""), "", None), ANONYMOUS);
        assert_eq!(resolve_identity(None, "", Some("")), ANONYMOUS);
    }

    #[test]
    fn password_table() {
        let mut t = PasswordTable::default();
        t.insert("alice", "wonderland");
        assert!(t.validate("alice", "wonderland"));
        assert!(!t.validate("alice", "nope"));
        assert!(!t.validate("bob", "wonderland"));

        let upper = PasswordTable::new(HashMap::from([(
            "carol".to_string(),
            PasswordTable::digest("pw").to_uppercase(),
        )]));
        assert!(upper.validate("carol", "pw"));
    }
}
