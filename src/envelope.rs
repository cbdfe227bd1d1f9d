//! COSE envelope wire format
//!
//! Produced tokens are always `61(<COSE tag>([...]))`. On input both tags are
//! optional; an untagged message is classified by its shape.

use ciborium::Value;
use cwt_crypto::{Algorithm, AlgorithmClass};
use cwt_protocol::{cbor, tag, Header, StructureContext};

use crate::error::CwtError;
use crate::recipient::Recipient;

/// The five message types this crate produces and accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Mac0,
    Mac,
    Sign1,
    Encrypt0,
    Encrypt,
}

impl EnvelopeKind {
    pub fn tag(self) -> u64 {
        match self {
            EnvelopeKind::Mac0 => tag::COSE_MAC0,
            EnvelopeKind::Mac => tag::COSE_MAC,
            EnvelopeKind::Sign1 => tag::COSE_SIGN1,
            EnvelopeKind::Encrypt0 => tag::COSE_ENCRYPT0,
            EnvelopeKind::Encrypt => tag::COSE_ENCRYPT,
        }
    }

    pub fn from_tag(value: u64) -> Option<Self> {
        match value {
            tag::COSE_MAC0 => Some(EnvelopeKind::Mac0),
            tag::COSE_MAC => Some(EnvelopeKind::Mac),
            tag::COSE_SIGN1 => Some(EnvelopeKind::Sign1),
            tag::COSE_ENCRYPT0 => Some(EnvelopeKind::Encrypt0),
            tag::COSE_ENCRYPT => Some(EnvelopeKind::Encrypt),
            _ => None,
        }
    }

    pub fn context(self) -> StructureContext {
        match self {
            EnvelopeKind::Mac0 => StructureContext::Mac0,
            EnvelopeKind::Mac => StructureContext::Mac,
            EnvelopeKind::Sign1 => StructureContext::Signature1,
            EnvelopeKind::Encrypt0 => StructureContext::Encrypt0,
            EnvelopeKind::Encrypt => StructureContext::Encrypt,
        }
    }

    fn array_len(self) -> usize {
        match self {
            EnvelopeKind::Encrypt0 => 3,
            EnvelopeKind::Mac0 | EnvelopeKind::Sign1 | EnvelopeKind::Encrypt => 4,
            EnvelopeKind::Mac => 5,
        }
    }

    fn has_recipients(self) -> bool {
        matches!(self, EnvelopeKind::Mac | EnvelopeKind::Encrypt)
    }

    fn has_tag(self) -> bool {
        matches!(
            self,
            EnvelopeKind::Mac0 | EnvelopeKind::Mac | EnvelopeKind::Sign1
        )
    }
}

/// A parsed or about-to-be-serialized COSE message
#[derive(Debug, Clone)]
pub struct Envelope {
    pub kind: EnvelopeKind,
    pub protected: Header,
    /// Exact protected bytes as received; MACs and signatures cover these
    pub protected_bytes: Vec<u8>,
    pub unprotected: Header,
    /// Payload for MAC and signature messages, ciphertext for encryption
    pub content: Vec<u8>,
    /// MAC tag or signature, empty for encryption
    pub tag: Vec<u8>,
    pub recipients: Vec<Recipient>,
}

impl Envelope {
    pub fn new(kind: EnvelopeKind, protected: Header, unprotected: Header) -> Result<Self, CwtError> {
        Ok(Envelope {
            kind,
            protected_bytes: protected.to_protected_bytes()?,
            protected,
            unprotected,
            content: Vec::new(),
            tag: Vec::new(),
            recipients: Vec::new(),
        })
    }

    /// Algorithm from the protected header, falling back to the unprotected one
    pub fn alg(&self) -> Result<Option<Algorithm>, CwtError> {
        let alg = match self.protected.alg()? {
            Some(alg) => Some(alg),
            None => self.unprotected.alg()?,
        };
        Ok(alg.map(Algorithm::new))
    }

    pub fn to_value(&self) -> Result<Value, CwtError> {
        let mut items = vec![
            Value::Bytes(self.protected_bytes.clone()),
            self.unprotected.to_value(),
            Value::Bytes(self.content.clone()),
        ];
        if self.kind.has_tag() {
            items.push(Value::Bytes(self.tag.clone()));
        }
        if self.kind.has_recipients() {
            items.push(Value::Array(
                self.recipients
                    .iter()
                    .map(Recipient::to_value)
                    .collect::<Result<_, _>>()?,
            ));
        }
        Ok(Value::Array(items))
    }

    /// Serialize with the COSE tag inside the CWT tag
    pub fn to_bytes(&self) -> Result<Vec<u8>, CwtError> {
        let message = Value::Tag(self.kind.tag(), Box::new(self.to_value()?));
        Ok(cbor::to_vec(&Value::Tag(tag::CWT, Box::new(message)))?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CwtError> {
        let value = match cbor::from_slice(bytes)? {
            Value::Tag(tag::CWT, inner) => *inner,
            other => other,
        };
        let (kind, value) = match value {
            Value::Tag(t, inner) => {
                let kind = EnvelopeKind::from_tag(t)
                    .ok_or_else(|| CwtError::Malformed(format!("unsupported CBOR tag {t}")))?;
                (Some(kind), *inner)
            }
            other => (None, other),
        };

        let items = cbor::expect_array(&value, "COSE message", 3..=5)?;
        let protected_bytes = cbor::as_bytes(&items[0])
            .ok_or_else(|| CwtError::Malformed("protected header should be bytes".to_string()))?
            .to_vec();
        let protected = Header::from_protected_bytes(&protected_bytes)?;
        let unprotected = Header::from_value(&items[1])?;

        let mut envelope = Envelope {
            kind: EnvelopeKind::Encrypt0,
            protected,
            protected_bytes,
            unprotected,
            content: Vec::new(),
            tag: Vec::new(),
            recipients: Vec::new(),
        };
        envelope.kind = match kind {
            Some(kind) => kind,
            None => envelope.classify(items)?,
        };
        if items.len() != envelope.kind.array_len() {
            return Err(CwtError::Malformed(format!(
                "{:?} should have {} elements, got {}",
                envelope.kind,
                envelope.kind.array_len(),
                items.len()
            )));
        }

        envelope.content = cbor::as_bytes(&items[2])
            .ok_or_else(|| CwtError::Malformed("payload should be bytes".to_string()))?
            .to_vec();
        if envelope.kind.has_tag() {
            envelope.tag = cbor::as_bytes(&items[3])
                .ok_or_else(|| CwtError::Malformed("tag should be bytes".to_string()))?
                .to_vec();
        }
        if envelope.kind.has_recipients() {
            let children = items[items.len() - 1]
                .as_array()
                .ok_or_else(|| CwtError::Malformed("recipients should be an array".to_string()))?;
            envelope.recipients = children
                .iter()
                .map(Recipient::from_value)
                .collect::<Result<_, _>>()?;
        }
        Ok(envelope)
    }

    fn classify(&self, items: &[Value]) -> Result<EnvelopeKind, CwtError> {
        match items.len() {
            3 => return Ok(EnvelopeKind::Encrypt0),
            5 => return Ok(EnvelopeKind::Mac),
            _ => {}
        }
        if items[3].is_array() {
            return Ok(EnvelopeKind::Encrypt);
        }
        let alg = self
            .alg()?
            .ok_or_else(|| CwtError::Malformed("alg(1) not found".to_string()))?;
        let class = alg
            .spec()
            .map_err(|e| CwtError::Malformed(e.to_string()))?
            .class;
        match class {
            AlgorithmClass::Mac => Ok(EnvelopeKind::Mac0),
            AlgorithmClass::Signature => Ok(EnvelopeKind::Sign1),
            _ => Err(CwtError::Malformed(format!(
                "cannot tell the message type of an untagged {alg} message"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cwt_protocol::label;

    fn mac0() -> Envelope {
        let protected = Header::new().with(label::ALG, cbor::int(5));
        let mut envelope = Envelope::new(EnvelopeKind::Mac0, protected, Header::new()).unwrap();
        envelope.content = b"payload".to_vec();
        envelope.tag = vec![0u8; 32];
        envelope
    }

    #[test]
    fn test_tagged_roundtrip() {
        let bytes = mac0().to_bytes().unwrap();
        // 61(17([...]))
        assert_eq!(&bytes[..3], &[0xd8, 0x3d, 0xd1]);
        let decoded = Envelope::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.kind, EnvelopeKind::Mac0);
        assert_eq!(decoded.content, b"payload");
        assert_eq!(decoded.protected_bytes, vec![0xa1, 0x01, 0x05]);
    }

    #[test]
    fn test_untagged_is_classified_by_shape() {
        let envelope = mac0();
        let bytes = cbor::to_vec(&envelope.to_value().unwrap()).unwrap();
        assert_eq!(Envelope::from_bytes(&bytes).unwrap().kind, EnvelopeKind::Mac0);

        let mut sign1 = mac0();
        sign1.protected = Header::new().with(label::ALG, cbor::int(-7));
        sign1.protected_bytes = sign1.protected.to_protected_bytes().unwrap();
        let bytes = cbor::to_vec(&sign1.to_value().unwrap()).unwrap();
        assert_eq!(Envelope::from_bytes(&bytes).unwrap().kind, EnvelopeKind::Sign1);

        let encrypt0 = Value::Array(vec![
            Value::Bytes(vec![]),
            Value::Map(vec![]),
            Value::Bytes(b"ct".to_vec()),
        ]);
        let bytes = cbor::to_vec(&encrypt0).unwrap();
        assert_eq!(Envelope::from_bytes(&bytes).unwrap().kind, EnvelopeKind::Encrypt0);
    }

    #[test]
    fn test_malformed_inputs() {
        let bad_tag = cbor::to_vec(&Value::Tag(99, Box::new(Value::Array(vec![])))).unwrap();
        assert!(Envelope::from_bytes(&bad_tag).unwrap_err().is_decode_error());

        let not_array = cbor::to_vec(&Value::Text("token".to_string())).unwrap();
        assert!(Envelope::from_bytes(&not_array).unwrap_err().is_decode_error());

        // Mac0 tag on a three element array
        let short = Value::Tag(
            tag::COSE_MAC0,
            Box::new(Value::Array(vec![
                Value::Bytes(vec![]),
                Value::Map(vec![]),
                Value::Bytes(vec![]),
            ])),
        );
        let bytes = cbor::to_vec(&short).unwrap();
        assert!(Envelope::from_bytes(&bytes).unwrap_err().is_decode_error());

        assert!(Envelope::from_bytes(&[0xff, 0x00]).unwrap_err().is_decode_error());
    }
}
