//! CWT Protocol Types
//!
//! This crate contains the wire-level building blocks of COSE / CWT envelopes:
//! - Integer-labelled header maps and the registered header labels
//! - The CBOR codec used for headers, claims and whole envelopes
//! - COSE message tags and the MAC / signature / encryption structures
//!
//! This crate contains NO cryptographic operations and NO I/O.
//! It is purely focused on data structures and serialization.

pub mod cbor;
pub mod header;
pub mod structure;

// Re-export commonly used types
pub use cbor::CodecError;
pub use header::{label, Header};
pub use structure::{enc_structure, mac_structure, sig_structure, tag, StructureContext};

pub use ciborium::Value;
