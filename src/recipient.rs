//! Recipient chain
//!
//! A [`Recipient`] is one layer of key delivery. Its wire form is
//! `[protected, unprotected, ciphertext, ? recipients]`, nested to any depth.
//! Three modes exist:
//!
//! - **Direct**: the recipient already holds the content key
//! - **Wrapped**: the content key is AES-KW wrapped under a key-encryption key
//! - **Derived**: the key is derived with HKDF from shared material, using a
//!   KDF context rebuilt from the node's headers
//!
//! On decode, [`resolve`] walks the tree depth first. A node with children
//! obtains its own key from them; a leaf uses the caller's key.

use ciborium::Value;
use cwt_crypto::{Algorithm, AlgorithmClass, CoseError, CoseKey, KdfContext, PartyInfo, SuppPubInfo};
use cwt_protocol::{cbor, label, Header};
use tracing::debug;

use crate::error::CwtError;
use crate::options::RecipientPolicy;

const PARTY_U: [i64; 3] = [
    label::PARTY_U_IDENTITY,
    label::PARTY_U_NONCE,
    label::PARTY_U_OTHER,
];
const PARTY_V: [i64; 3] = [
    label::PARTY_V_IDENTITY,
    label::PARTY_V_NONCE,
    label::PARTY_V_OTHER,
];

/// How a recipient delivers its key
#[derive(Debug, Clone, PartialEq)]
pub enum RecipientMode {
    Direct,
    Wrapped { ciphertext: Vec<u8> },
    Derived {
        context: KdfContext,
        salt: Option<Vec<u8>>,
    },
}

/// One node of the recipient tree
#[derive(Debug, Clone)]
pub struct Recipient {
    protected: Header,
    unprotected: Header,
    alg: Option<Algorithm>,
    mode: RecipientMode,
    recipients: Vec<Recipient>,
    /// Key used to perform the wrap at this layer; never serialized
    key: Option<CoseKey>,
}

impl Recipient {
    /// Build a node from raw parts, checking header types and the direct shape
    pub fn new(
        protected: Header,
        unprotected: Header,
        ciphertext: Vec<u8>,
        recipients: Vec<Recipient>,
    ) -> Result<Self, CwtError> {
        unprotected.kid()?;
        unprotected.iv()?;
        let alg = match protected.alg()? {
            Some(alg) => Some(alg),
            None => unprotected.alg()?,
        }
        .filter(|&alg| alg != 0)
        .map(Algorithm::new);

        let class = alg
            .map(|a| a.spec().map(|s| s.class))
            .transpose()
            .map_err(CoseError::from)?;

        let mode = match class {
            None if ciphertext.is_empty() => RecipientMode::Direct,
            None | Some(AlgorithmClass::KeyWrap) => RecipientMode::Wrapped { ciphertext },
            Some(AlgorithmClass::Direct) => {
                if !protected.is_empty() {
                    return Err(invalid("protected header should be empty."));
                }
                if !ciphertext.is_empty() {
                    return Err(invalid("ciphertext should be zero-length bytes."));
                }
                if !recipients.is_empty() {
                    return Err(invalid("recipients should be absent."));
                }
                RecipientMode::Direct
            }
            Some(AlgorithmClass::KeyDerivation) => {
                if !ciphertext.is_empty() {
                    return Err(invalid("ciphertext should be zero-length bytes."));
                }
                let context = KdfContext {
                    alg: None,
                    party_u: PartyInfo::read_header(&unprotected, PARTY_U)?,
                    party_v: PartyInfo::read_header(&unprotected, PARTY_V)?,
                    supp_pub: SuppPubInfo {
                        key_data_length: None,
                        protected: protected.clone(),
                        other: None,
                    },
                };
                RecipientMode::Derived {
                    context,
                    salt: unprotected.salt()?.map(<[u8]>::to_vec),
                }
            }
            Some(_) => {
                return Err(invalid(&format!(
                    "{} cannot be used by a recipient.",
                    alg.map(|a| a.to_string()).unwrap_or_default()
                )))
            }
        };

        Ok(Recipient {
            protected,
            unprotected,
            alg,
            mode,
            recipients,
            key: None,
        })
    }

    /// Direct recipient: the receiver already holds the content key
    pub fn direct(kid: Option<&[u8]>) -> Result<Self, CwtError> {
        let mut unprotected = Header::new().with(label::ALG, cbor::int(Algorithm::DIRECT.id()));
        if let Some(kid) = kid {
            unprotected.insert(label::KID, Value::Bytes(kid.to_vec()));
        }
        Self::new(Header::new(), unprotected, Vec::new(), Vec::new())
    }

    /// AES key wrap recipient. Call [`Recipient::wrap_key`] before encoding.
    pub fn key_wrap(kek: CoseKey, recipients: Vec<Recipient>) -> Result<Self, CwtError> {
        if kek.spec().class != AlgorithmClass::KeyWrap {
            return Err(invalid(&format!("{} is not a key wrap algorithm.", kek.alg())));
        }
        let mut unprotected = Header::new().with(label::ALG, cbor::int(kek.alg().id()));
        if let Some(kid) = kek.kid() {
            unprotected.insert(label::KID, Value::Bytes(kid.to_vec()));
        }
        let mut node = Self::new(Header::new(), unprotected, Vec::new(), recipients)?;
        node.key = Some(kek);
        Ok(node)
    }

    /// Direct key agreement recipient with HKDF.
    ///
    /// `context.alg` names the algorithm of the key this node produces. Party
    /// information and `salt` travel in the unprotected header.
    pub fn hkdf(
        alg: Algorithm,
        context: KdfContext,
        salt: Option<Vec<u8>>,
        kid: Option<&[u8]>,
    ) -> Result<Self, CwtError> {
        if alg.spec().map_err(CoseError::from)?.class != AlgorithmClass::KeyDerivation {
            return Err(invalid(&format!("{alg} is not a key derivation algorithm.")));
        }
        if context.supp_pub.other.is_some() {
            return Err(invalid("supp_pub.other cannot be carried in a recipient."));
        }

        let mut protected = context.supp_pub.protected.clone();
        protected.insert(label::ALG, cbor::int(alg.id()));

        let mut unprotected = Header::new();
        if let Some(kid) = kid {
            unprotected.insert(label::KID, Value::Bytes(kid.to_vec()));
        }
        if let Some(salt) = salt {
            unprotected.insert(label::SALT, Value::Bytes(salt));
        }
        context.party_u.write_header(&mut unprotected, PARTY_U);
        context.party_v.write_header(&mut unprotected, PARTY_V);

        let mut node = Self::new(protected, unprotected, Vec::new(), Vec::new())?;
        if let RecipientMode::Derived { context: c, .. } = &mut node.mode {
            c.alg = context.alg;
        }
        Ok(node)
    }

    pub fn protected(&self) -> &Header {
        &self.protected
    }

    pub fn unprotected(&self) -> &Header {
        &self.unprotected
    }

    pub fn alg(&self) -> Option<Algorithm> {
        self.alg
    }

    pub fn kid(&self) -> Option<&[u8]> {
        self.unprotected.kid().ok().flatten()
    }

    pub fn mode(&self) -> &RecipientMode {
        &self.mode
    }

    pub fn ciphertext(&self) -> &[u8] {
        match &self.mode {
            RecipientMode::Wrapped { ciphertext } => ciphertext,
            _ => &[],
        }
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Wrap `key_to_wrap` with this node's key and keep it as the ciphertext
    pub fn wrap_key(&mut self, key_to_wrap: &[u8]) -> Result<(), CwtError> {
        let kek = self
            .key
            .as_ref()
            .ok_or_else(|| invalid("recipient has no key to wrap with."))?;
        let wrapped = kek.wrap_key(key_to_wrap)?;
        match &mut self.mode {
            RecipientMode::Wrapped { ciphertext } => {
                *ciphertext = wrapped;
                Ok(())
            }
            _ => Err(invalid("recipient does not wrap keys.")),
        }
    }

    /// Unwrap the ciphertext with this node's own key
    pub fn unwrap_key(&self, alg: Algorithm) -> Result<CoseKey, CwtError> {
        let kek = self
            .key
            .as_ref()
            .ok_or_else(|| invalid("recipient has no key to unwrap with."))?;
        self.unwrap_with(kek, alg)
    }

    fn unwrap_with(&self, kek: &CoseKey, alg: Algorithm) -> Result<CoseKey, CwtError> {
        match &self.mode {
            RecipientMode::Wrapped { ciphertext } if !ciphertext.is_empty() => {
                Ok(kek.unwrap_key(ciphertext, alg)?)
            }
            RecipientMode::Wrapped { .. } => Err(CwtError::Unresolved(
                "recipient ciphertext is empty".to_string(),
            )),
            _ => Err(invalid("recipient does not wrap keys.")),
        }
    }

    /// Derive the key for `context.alg` from shared `material`.
    ///
    /// The node's protected header always stands in for the context's
    /// SuppPubInfo protected field.
    pub fn derive_key(&self, material: &[u8], context: &KdfContext) -> Result<CoseKey, CwtError> {
        let key = self.material_key(material)?;
        self.derive_with(&key, context)
    }

    /// Re-derive from `material` and compare with `expected`
    pub fn verify_key(
        &self,
        material: &[u8],
        expected: &[u8],
        context: &KdfContext,
    ) -> Result<(), CwtError> {
        let key = self.material_key(material)?;
        let context = self.bind_context(context);
        Ok(key.verify_key(self.salt(), expected, &context)?)
    }

    fn material_key(&self, material: &[u8]) -> Result<CoseKey, CwtError> {
        let alg = match (&self.mode, self.alg) {
            (RecipientMode::Derived { .. }, Some(alg)) => alg,
            _ => return Err(invalid("recipient does not derive keys.")),
        };
        Ok(CoseKey::from_symmetric_key(material, alg, self.kid()).map_err(CoseError::from)?)
    }

    fn derive_with(&self, key: &CoseKey, context: &KdfContext) -> Result<CoseKey, CwtError> {
        let context = self.bind_context(context);
        Ok(key.derive_key(self.salt(), &context)?)
    }

    fn bind_context(&self, context: &KdfContext) -> KdfContext {
        let mut context = context.clone();
        context.supp_pub.protected = self.protected.clone();
        context
    }

    fn salt(&self) -> Option<&[u8]> {
        match &self.mode {
            RecipientMode::Derived { salt, .. } => salt.as_deref(),
            _ => None,
        }
    }

    /// Recover the key this node delivers, for use with `target`
    pub fn resolve_key(
        &self,
        key: &CoseKey,
        target: Algorithm,
        policy: RecipientPolicy,
    ) -> Result<CoseKey, CwtError> {
        let own_alg = self.alg.unwrap_or(target);
        let node_key = if self.recipients.is_empty() {
            self.check_leaf(key, own_alg)?;
            key.clone()
        } else {
            resolve(&self.recipients, key, own_alg, policy)?
        };

        match &self.mode {
            RecipientMode::Direct => {
                if node_key.alg() != target {
                    return Err(CwtError::Unresolved(format!(
                        "key is for {}, content uses {target}",
                        node_key.alg()
                    )));
                }
                Ok(node_key)
            }
            RecipientMode::Wrapped { .. } => self.unwrap_with(&node_key, target),
            RecipientMode::Derived { context, .. } => {
                let mut context = context.clone();
                context.alg = Some(target);
                self.derive_with(&node_key, &context)
            }
        }
    }

    fn check_leaf(&self, key: &CoseKey, own_alg: Algorithm) -> Result<(), CwtError> {
        if let (Some(expected), Some(actual)) = (self.kid(), key.kid()) {
            if expected != actual {
                return Err(CwtError::Unresolved("kid mismatch".to_string()));
            }
        }
        if self.mode != RecipientMode::Direct && key.alg() != own_alg {
            return Err(CwtError::Unresolved(format!(
                "key is for {}, recipient uses {own_alg}",
                key.alg()
            )));
        }
        Ok(())
    }

    pub fn to_value(&self) -> Result<Value, CwtError> {
        let mut items = vec![
            Value::Bytes(self.protected.to_protected_bytes()?),
            self.unprotected.to_value(),
            Value::Bytes(self.ciphertext().to_vec()),
        ];
        if !self.recipients.is_empty() {
            items.push(Value::Array(
                self.recipients
                    .iter()
                    .map(Recipient::to_value)
                    .collect::<Result<_, _>>()?,
            ));
        }
        Ok(Value::Array(items))
    }

    /// Parse a decoded node. Every decoded node must name its algorithm.
    pub fn from_value(value: &Value) -> Result<Self, CwtError> {
        let items = cbor::expect_array(value, "recipient", 3..=4)?;
        let protected_bytes = cbor::as_bytes(&items[0])
            .ok_or_else(|| CwtError::Malformed("recipient protected should be bytes".to_string()))?;
        let protected = Header::from_protected_bytes(protected_bytes)?;
        let unprotected = Header::from_value(&items[1])?;
        let ciphertext = match &items[2] {
            Value::Null => Vec::new(),
            Value::Bytes(b) => b.clone(),
            _ => {
                return Err(CwtError::Malformed(
                    "recipient ciphertext should be bytes".to_string(),
                ))
            }
        };
        let recipients = match items.get(3) {
            None => Vec::new(),
            Some(Value::Array(children)) => children
                .iter()
                .map(Recipient::from_value)
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(CwtError::Malformed(
                    "recipients should be an array".to_string(),
                ))
            }
        };
        let node = Self::new(protected, unprotected, ciphertext, recipients)?;
        if node.alg.is_none() {
            return Err(CwtError::Malformed("recipient alg(1) not found".to_string()));
        }
        Ok(node)
    }
}

/// Resolve the content key from a list of sibling recipients
pub fn resolve(
    recipients: &[Recipient],
    key: &CoseKey,
    target: Algorithm,
    policy: RecipientPolicy,
) -> Result<CoseKey, CwtError> {
    let mut found: Option<CoseKey> = None;
    for (index, recipient) in recipients.iter().enumerate() {
        match recipient.resolve_key(key, target, policy) {
            Ok(resolved) => {
                debug!(index, alg = ?recipient.alg(), "recipient resolved");
                match policy {
                    RecipientPolicy::FirstMatch => return Ok(resolved),
                    RecipientPolicy::ExactlyOne if found.is_some() => {
                        return Err(CwtError::Unresolved(
                            "more than one recipient matched".to_string(),
                        ))
                    }
                    RecipientPolicy::ExactlyOne => found = Some(resolved),
                }
            }
            Err(e) => debug!(index, alg = ?recipient.alg(), error = %e, "recipient skipped"),
        }
    }
    found.ok_or_else(|| CwtError::Unresolved("no recipient matched the key".to_string()))
}

fn invalid(msg: &str) -> CwtError {
    CwtError::InvalidArgument(msg.to_string())
}
