//! Envelope orchestration
//!
//! [`Cwt`] composes claims, headers, a key and optional recipients into a
//! MAC'd, signed or encrypted token, and reverses the process on decode.

use chrono::Utc;
use ciborium::Value;
use cwt_crypto::{Algorithm, AlgorithmClass, CoseKey};
use cwt_protocol::{cbor, enc_structure, label, mac_structure, sig_structure, Header};
use tracing::{debug, warn};

use crate::claims::{self, Claims};
use crate::envelope::{Envelope, EnvelopeKind};
use crate::error::CwtError;
use crate::options::CwtOptions;
use crate::recipient::{self, Recipient};

/// CWT encoder / decoder
#[derive(Debug, Clone, Default)]
pub struct Cwt {
    options: CwtOptions,
}

impl Cwt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CwtOptions) -> Self {
        Cwt { options }
    }

    pub fn options(&self) -> &CwtOptions {
        &self.options
    }

    /// Produce a COSE_Mac0 token, or COSE_Mac when recipients are given
    pub fn encode_and_mac(
        &self,
        claims: &Claims,
        key: &CoseKey,
        recipients: Vec<Recipient>,
    ) -> Result<Vec<u8>, CwtError> {
        require_class(key, AlgorithmClass::Mac)?;
        let payload = self.payload(claims)?;
        let kind = if recipients.is_empty() {
            EnvelopeKind::Mac0
        } else {
            EnvelopeKind::Mac
        };

        let mut envelope = Envelope::new(kind, protected_for(key), unprotected_for(key, &recipients))?;
        let to_be_maced = mac_structure(kind.context(), &envelope.protected_bytes, &[], &payload)?;
        envelope.tag = key.mac(&to_be_maced)?;
        envelope.content = payload;
        envelope.recipients = recipients;
        envelope.to_bytes()
    }

    /// Produce a COSE_Sign1 token
    pub fn encode_and_sign(&self, claims: &Claims, key: &CoseKey) -> Result<Vec<u8>, CwtError> {
        require_class(key, AlgorithmClass::Signature)?;
        let payload = self.payload(claims)?;

        let mut envelope = Envelope::new(
            EnvelopeKind::Sign1,
            protected_for(key),
            unprotected_for(key, &[]),
        )?;
        let to_be_signed = sig_structure(&envelope.protected_bytes, &[], &payload)?;
        envelope.tag = key.sign(&to_be_signed)?;
        envelope.content = payload;
        envelope.to_bytes()
    }

    /// Produce a COSE_Encrypt0 token, or COSE_Encrypt when recipients are given.
    ///
    /// A fresh nonce is generated when `nonce` is `None`. A supplied nonce is
    /// checked for length only; uniqueness is the caller's responsibility.
    pub fn encode_and_encrypt(
        &self,
        claims: &Claims,
        key: &CoseKey,
        nonce: Option<&[u8]>,
        recipients: Vec<Recipient>,
    ) -> Result<Vec<u8>, CwtError> {
        require_class(key, AlgorithmClass::Aead)?;
        let payload = self.payload(claims)?;
        let nonce = match nonce {
            Some(nonce) => nonce.to_vec(),
            None => key.generate_nonce()?,
        };
        let kind = if recipients.is_empty() {
            EnvelopeKind::Encrypt0
        } else {
            EnvelopeKind::Encrypt
        };

        let mut unprotected = unprotected_for(key, &recipients);
        unprotected.insert(label::IV, Value::Bytes(nonce.clone()));
        let mut envelope = Envelope::new(kind, protected_for(key), unprotected)?;
        let aad = enc_structure(kind.context(), &envelope.protected_bytes, &[])?;
        envelope.content = key.seal(&payload, &nonce, Some(&aad))?;
        envelope.recipients = recipients;
        envelope.to_bytes()
    }

    /// Verify or decrypt a token and return its claims
    pub fn decode(&self, token: &[u8], key: &CoseKey) -> Result<Claims, CwtError> {
        let envelope = Envelope::from_bytes(token)?;
        let alg = envelope
            .alg()?
            .ok_or_else(|| CwtError::Malformed("alg(1) not found".to_string()))?;
        debug!(kind = ?envelope.kind, %alg, recipients = envelope.recipients.len(), "decoding token");

        let resolved;
        let key = if envelope.recipients.is_empty() {
            check_key(&envelope, key, alg)?;
            key
        } else {
            resolved = recipient::resolve(
                &envelope.recipients,
                key,
                alg,
                self.options.recipient_policy,
            )?;
            &resolved
        };

        let payload = match envelope.kind {
            EnvelopeKind::Mac0 | EnvelopeKind::Mac => {
                let to_be_maced = mac_structure(
                    envelope.kind.context(),
                    &envelope.protected_bytes,
                    &[],
                    &envelope.content,
                )?;
                key.verify_mac(&to_be_maced, &envelope.tag)?;
                envelope.content
            }
            EnvelopeKind::Sign1 => {
                let to_be_signed = sig_structure(&envelope.protected_bytes, &[], &envelope.content)?;
                key.verify(&to_be_signed, &envelope.tag)?;
                envelope.content
            }
            EnvelopeKind::Encrypt0 | EnvelopeKind::Encrypt => {
                let nonce = envelope
                    .unprotected
                    .iv()?
                    .ok_or_else(|| CwtError::Malformed("iv(5) not found".to_string()))?;
                let aad = enc_structure(envelope.kind.context(), &envelope.protected_bytes, &[])?;
                key.open(&envelope.content, nonce, Some(&aad))?
            }
        };

        let claims = Claims::from_bytes(&payload)?;
        claims.validate()?;
        self.check_time(&claims)?;
        Ok(claims)
    }

    fn payload(&self, claims: &Claims) -> Result<Vec<u8>, CwtError> {
        let mut claims = claims.clone();
        if let Some(expires_in) = self.options.expires_in {
            let now = Utc::now().timestamp();
            if !claims.contains(claims::label::IAT) {
                claims.insert(claims::label::IAT, cbor::int(now));
            }
            if !claims.contains(claims::label::EXP) {
                let expires_in = i64::try_from(expires_in)
                    .map_err(|_| CwtError::InvalidArgument("expires_in is too large.".to_string()))?;
                claims.insert(claims::label::EXP, cbor::int(now.saturating_add(expires_in)));
            }
        }
        claims.validate()?;
        claims.to_bytes()
    }

    fn check_time(&self, claims: &Claims) -> Result<(), CwtError> {
        if !self.options.verify_time {
            return Ok(());
        }
        let now = Utc::now().timestamp();
        let leeway = i64::try_from(self.options.leeway).unwrap_or(i64::MAX);
        if let Some(exp) = claims.expiration() {
            if exp < now.saturating_sub(leeway) {
                warn!(exp, now, "rejected expired token");
                return Err(CwtError::Expired { exp, now });
            }
        }
        if let Some(nbf) = claims.not_before() {
            if nbf > now.saturating_add(leeway) {
                warn!(nbf, now, "rejected token that is not yet valid");
                return Err(CwtError::NotYetValid { nbf, now });
            }
        }
        Ok(())
    }
}

fn require_class(key: &CoseKey, class: AlgorithmClass) -> Result<(), CwtError> {
    if key.spec().class != class {
        return Err(CwtError::InvalidArgument(format!(
            "{} cannot be used for {class:?} tokens.",
            key.alg()
        )));
    }
    Ok(())
}

fn protected_for(key: &CoseKey) -> Header {
    Header::new().with(label::ALG, cbor::int(key.alg().id()))
}

// With recipients the kid belongs to them, not to the message
fn unprotected_for(key: &CoseKey, recipients: &[Recipient]) -> Header {
    let mut header = Header::new();
    if let (Some(kid), true) = (key.kid(), recipients.is_empty()) {
        header.insert(label::KID, Value::Bytes(kid.to_vec()));
    }
    header
}

fn check_key(envelope: &Envelope, key: &CoseKey, alg: Algorithm) -> Result<(), CwtError> {
    if key.alg() != alg {
        return Err(CwtError::Unresolved(format!(
            "key is for {}, token uses {alg}",
            key.alg()
        )));
    }
    if let (Some(expected), Some(actual)) = (envelope.unprotected.kid()?, key.kid()) {
        if expected != actual {
            return Err(CwtError::Unresolved("kid mismatch".to_string()));
        }
    }
    Ok(())
}
