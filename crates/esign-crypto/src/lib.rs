//! e-Signature payload library
//!
//! Builds the `KEY:VALUE` text embedded in signature QR codes, hashes the
//! signed fields and checks scanned payloads against a recomputed digest.
//!
//! The digest is a plain SHA-256 over public fields. Anyone holding the
//! fields can produce a matching hash, so a `valid` result only means the
//! payload was not altered by accident after it was issued.

pub mod digest;
pub mod payload;
pub mod qr;
pub mod verify;

pub use payload::{ParsedPayload, PayloadError, SignedFields};
pub use verify::{Verification, verify_image, verify_text};
