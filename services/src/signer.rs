//! HMAC-SHA256 signing of QR session payloads with a rotating key ring.
//!
//! The canonical payload is a compact JSON object with a fixed key order and
//! millisecond-precision UTC timestamps. [`canonical_payload`] is the only
//! producer of that string; signing and verification both go through it.

use crate::error::{EngineError, SignerError};
use chrono::{DateTime, SecondsFormat, Utc};
use db::models::qr_session::Model as QrSession;
use db::repositories::VerifierSecretRepository;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Serialize;
use sha2::Sha256;
use std::fmt;
use std::sync::{PoisonError, RwLock};

type HmacSha256 = Hmac<Sha256>;

/// 256-bit floor for signing secrets.
pub const MIN_SECRET_BYTES: usize = 32;

const SIGNATURE_BYTES: usize = 32;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalPayload<'a> {
    session_id: &'a str,
    event_id: i64,
    nonce: &'a str,
    issued_at: String,
    expires_at: String,
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn canonical_payload_parts(
    session_id: &str,
    event_id: i64,
    nonce: &str,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> String {
    let payload = CanonicalPayload {
        session_id,
        event_id,
        nonce,
        issued_at: format_timestamp(issued_at),
        expires_at: format_timestamp(expires_at),
    };
    // Plain strings and integers cannot fail to serialize.
    serde_json::to_string(&payload).unwrap_or_default()
}

/// Payload for a stored session, built from its own authoritative fields.
pub fn canonical_payload(session: &QrSession) -> String {
    canonical_payload_parts(
        &session.session_id,
        session.event_id,
        &session.nonce,
        session.issued_at,
        session.signed_expires_at,
    )
}

/// Fresh secret of [`MIN_SECRET_BYTES`] from the OS RNG.
pub fn random_secret() -> Vec<u8> {
    let mut buf = vec![0u8; MIN_SECRET_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// One versioned HMAC key.
#[derive(Clone)]
pub struct SigningKey {
    version: i32,
    mac: HmacSha256,
}

impl SigningKey {
    pub fn new(version: i32, secret: &[u8]) -> Result<Self, SignerError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(SignerError::KeyTooShort {
                min: MIN_SECRET_BYTES,
                got: secret.len(),
            });
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| SignerError::InvalidKey)?;
        Ok(Self { version, mac })
    }

    pub fn from_hex(version: i32, secret_hex: &str) -> Result<Self, SignerError> {
        let secret = hex::decode(secret_hex.trim()).map_err(|_| SignerError::InvalidHex)?;
        Self::new(version, &secret)
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    fn tag(&self, payload: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Constant-time comparison via `verify_slice`.
    fn matches(&self, payload: &str, signature: &[u8]) -> bool {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(signature).is_ok()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct KeyRing {
    active: SigningKey,
    /// Newest first.
    retired: Vec<SigningKey>,
}

/// Signs with the active key; verifies against the active key and retired
/// keys no more than `retained_versions` behind it.
#[derive(Debug)]
pub struct Signer {
    ring: RwLock<KeyRing>,
    retained_versions: u32,
}

impl Signer {
    pub fn new(active: SigningKey, retained_versions: u32) -> Self {
        Self::with_retired(active, Vec::new(), retained_versions)
    }

    pub fn with_retired(active: SigningKey, mut retired: Vec<SigningKey>, retained_versions: u32) -> Self {
        retired.sort_by(|a, b| b.version.cmp(&a.version));
        let signer = Self {
            ring: RwLock::new(KeyRing { active, retired }),
            retained_versions,
        };
        signer.prune();
        signer
    }

    pub fn active_version(&self) -> i32 {
        self.ring
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .version
    }

    /// Lowercase hex HMAC of `payload` under the active key.
    pub fn sign(&self, payload: &str) -> String {
        let ring = self.ring.read().unwrap_or_else(PoisonError::into_inner);
        hex::encode(ring.active.tag(payload))
    }

    /// True iff `signature` is a valid tag of `payload` under the active key or
    /// a still-honoured retired key. Malformed input is simply not valid.
    pub fn verify(&self, payload: &str, signature: &str) -> bool {
        let Ok(bytes) = hex::decode(signature.trim()) else {
            return false;
        };
        if bytes.len() != SIGNATURE_BYTES {
            return false;
        }

        let ring = self.ring.read().unwrap_or_else(PoisonError::into_inner);
        let floor = self.floor(ring.active.version);
        std::iter::once(&ring.active)
            .chain(ring.retired.iter().filter(|k| k.version >= floor))
            .any(|key| key.matches(payload, &bytes))
    }

    /// Makes `key` the active key. The previous active key is kept for
    /// verification while it stays inside the retained window.
    pub fn install(&self, key: SigningKey) {
        {
            let mut ring = self.ring.write().unwrap_or_else(PoisonError::into_inner);
            let previous = std::mem::replace(&mut ring.active, key);
            ring.retired.insert(0, previous);
        }
        self.prune();
    }

    fn floor(&self, active_version: i32) -> i32 {
        active_version.saturating_sub(i32::try_from(self.retained_versions).unwrap_or(i32::MAX))
    }

    fn prune(&self) {
        let mut ring = self.ring.write().unwrap_or_else(PoisonError::into_inner);
        let floor = self.floor(ring.active.version);
        ring.retired.retain(|k| k.version >= floor);
    }

    /// Builds the ring from `verifier_secrets`, bootstrapping version 1 from
    /// `bootstrap_hex` (or fresh randomness) when the table is empty.
    pub async fn load(
        repo: &VerifierSecretRepository,
        bootstrap_hex: Option<&str>,
        retained_versions: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        let mut rows = repo.list_all().await?;

        if rows.is_empty() {
            let secret_hex = match bootstrap_hex {
                Some(h) => {
                    SigningKey::from_hex(1, h)?;
                    h.trim().to_lowercase()
                }
                None => hex::encode(random_secret()),
            };
            let created = repo.rotate(&secret_hex, now).await?;
            tracing::info!(version = created.rotation_version, "Bootstrapped QR signing key");
            rows.push(created);
        }

        // Rows come back newest first; the newest is the active key.
        let mut keys = rows
            .iter()
            .map(|row| SigningKey::from_hex(row.rotation_version, &row.secret_hex))
            .collect::<Result<Vec<_>, _>>()?;
        let active = keys.remove(0);

        tracing::info!(
            active_version = active.version,
            retained = keys.len(),
            "Loaded QR signing keys"
        );
        Ok(Self::with_retired(active, keys, retained_versions))
    }

    /// Persists a new random key as the next version and activates it.
    pub async fn rotate(
        &self,
        repo: &VerifierSecretRepository,
        now: DateTime<Utc>,
    ) -> Result<i32, EngineError> {
        let secret = random_secret();
        let row = repo.rotate(&hex::encode(&secret), now).await?;
        self.install(SigningKey::new(row.rotation_version, &secret)?);
        tracing::info!(version = row.rotation_version, "Rotated QR signing key");
        Ok(row.rotation_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use db::test_utils::setup_test_db;

    fn key(version: i32, byte: u8) -> SigningKey {
        SigningKey::new(version, &[byte; 32]).unwrap()
    }

    fn payload() -> String {
        let issued = Utc.with_ymd_and_hms(2025, 9, 8, 10, 0, 0).unwrap();
        canonical_payload_parts(
            "3f1c9a52-6d2e-4a51-9a8e-0c7f1b2d4e6a",
            42,
            "00112233445566778899aabbccddeeff",
            issued,
            issued + chrono::Duration::seconds(30),
        )
    }

    #[test]
    fn canonical_payload_has_fixed_shape() {
        assert_eq!(
            payload(),
            "{\"sessionId\":\"3f1c9a52-6d2e-4a51-9a8e-0c7f1b2d4e6a\",\"eventId\":42,\
             \"nonce\":\"00112233445566778899aabbccddeeff\",\
             \"issuedAt\":\"2025-09-08T10:00:00.000Z\",\"expiresAt\":\"2025-09-08T10:00:30.000Z\"}"
        );
    }

    #[test]
    fn short_secrets_are_rejected() {
        let err = SigningKey::new(1, &[7u8; 31]).unwrap_err();
        assert!(matches!(err, SignerError::KeyTooShort { got: 31, .. }));
        assert!(matches!(
            SigningKey::from_hex(1, "not-hex").unwrap_err(),
            SignerError::InvalidHex
        ));
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let signer = Signer::new(key(1, 0xAB), 1);
        let p = payload();
        let sig = signer.sign(&p);
        assert_eq!(sig.len(), 64);
        assert!(signer.verify(&p, &sig));
        assert!(!signer.verify(&format!("{p} "), &sig));
    }

    #[test]
    fn flipping_any_signature_byte_fails() {
        let signer = Signer::new(key(1, 0xAB), 1);
        let p = payload();
        let sig = hex::decode(signer.sign(&p)).unwrap();

        for i in 0..sig.len() {
            let mut tampered = sig.clone();
            tampered[i] ^= 0x01;
            assert!(!signer.verify(&p, &hex::encode(&tampered)), "byte {i}");
        }
    }

    #[test]
    fn malformed_signatures_are_just_invalid() {
        let signer = Signer::new(key(1, 0xAB), 1);
        let p = payload();
        assert!(!signer.verify(&p, ""));
        assert!(!signer.verify(&p, "zz"));
        assert!(!signer.verify(&p, "abcd"));
        assert!(!signer.verify(&p, &"0".repeat(63)));
    }

    #[test]
    fn retired_key_verifies_within_window_only() {
        let signer = Signer::new(key(1, 0x01), 1);
        let p = payload();
        let sig_v1 = signer.sign(&p);

        signer.install(key(2, 0x02));
        assert_eq!(signer.active_version(), 2);
        assert!(signer.verify(&p, &sig_v1));

        let sig_v2 = signer.sign(&p);
        assert_ne!(sig_v1, sig_v2);
        assert!(!Signer::new(key(1, 0x01), 1).verify(&p, &sig_v2));

        signer.install(key(3, 0x03));
        assert!(!signer.verify(&p, &sig_v1));
        assert!(signer.verify(&p, &sig_v2));
    }

    #[test]
    fn huge_retention_keeps_every_retired_key() {
        let signer = Signer::new(key(1, 0x01), u32::MAX);
        let p = payload();
        let sig_v1 = signer.sign(&p);

        signer.install(key(2, 0x02));
        signer.install(key(3, 0x03));
        assert!(signer.verify(&p, &sig_v1));
    }

    #[tokio::test]
    async fn load_bootstraps_then_rotates_persistently() {
        let db = setup_test_db().await;
        let repo = VerifierSecretRepository::new(db.clone());
        let now = Utc::now();

        let bootstrap = "ab".repeat(32);
        let signer = Signer::load(&repo, Some(&bootstrap), 1, now).await.unwrap();
        assert_eq!(signer.active_version(), 1);
        let p = payload();
        let sig_v1 = signer.sign(&p);
        assert!(Signer::new(SigningKey::from_hex(1, &bootstrap).unwrap(), 1).verify(&p, &sig_v1));

        assert_eq!(signer.rotate(&repo, now).await.unwrap(), 2);
        let sig_v2 = signer.sign(&p);

        let reloaded = Signer::load(&repo, None, 1, now).await.unwrap();
        assert_eq!(reloaded.active_version(), 2);
        assert!(reloaded.verify(&p, &sig_v1));
        assert!(reloaded.verify(&p, &sig_v2));
    }
}
