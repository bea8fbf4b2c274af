use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::digest::sha256_hex;

pub const KEY_SIGNER: &str = "SIGNER";
pub const KEY_ID: &str = "ID";
pub const KEY_POS: &str = "POS";
pub const KEY_DOC_NO: &str = "DOC_NO";
pub const KEY_DOC_NAME: &str = "DOC_NAME";
pub const KEY_TIME: &str = "TIME";
pub const KEY_HASH: &str = "HASH";

/// Separator between fields in the hashed string.
const FIELD_DELIMITER: &str = "|";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("field {field} must not contain line breaks or '|'")]
    ForbiddenCharacter { field: &'static str },
    #[error("line {line} has no ':' separator")]
    MissingSeparator { line: usize },
    #[error("payload is missing the {0} key")]
    MissingKey(&'static str),
}

/// Reject a value that cannot be embedded as a signed field.
pub fn check_field(field: &'static str, value: &str) -> Result<(), PayloadError> {
    if value.contains(['\n', '\r']) || value.contains(FIELD_DELIMITER) {
        return Err(PayloadError::ForbiddenCharacter { field });
    }
    Ok(())
}

/// The fields covered by the digest, in hashing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedFields {
    pub signer: String,
    pub emp_id: String,
    pub position: String,
    pub doc_no: String,
    pub doc_name: String,
}

impl SignedFields {
    /// Build a field set for issuing a new payload.
    ///
    /// Rejects values that would break the line format or make the joined
    /// string ambiguous.
    pub fn new(
        signer: impl Into<String>,
        emp_id: impl Into<String>,
        position: impl Into<String>,
        doc_no: impl Into<String>,
        doc_name: impl Into<String>,
    ) -> Result<Self, PayloadError> {
        let fields = Self {
            signer: signer.into(),
            emp_id: emp_id.into(),
            position: position.into(),
            doc_no: doc_no.into(),
            doc_name: doc_name.into(),
        };

        for (field, value) in fields.labelled() {
            check_field(field, value)?;
        }

        Ok(fields)
    }

    fn labelled(&self) -> [(&'static str, &str); 5] {
        [
            (KEY_SIGNER, &self.signer),
            (KEY_ID, &self.emp_id),
            (KEY_POS, &self.position),
            (KEY_DOC_NO, &self.doc_no),
            (KEY_DOC_NAME, &self.doc_name),
        ]
    }

    /// `signer|emp_id|position|doc_no|doc_name`
    pub fn canonical(&self) -> String {
        self.labelled()
            .iter()
            .map(|(_, value)| *value)
            .collect::<Vec<_>>()
            .join(FIELD_DELIMITER)
    }

    pub fn digest(&self) -> String {
        sha256_hex(self.canonical().as_bytes())
    }
}

/// A freshly issued payload, ready to be encoded into a QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedPayload {
    pub fields: SignedFields,
    pub time: String,
    pub hash: String,
}

impl IssuedPayload {
    pub fn issue(fields: SignedFields, time: impl Into<String>) -> Self {
        let hash = fields.digest();
        Self {
            fields,
            time: time.into(),
            hash,
        }
    }

    /// Newline-separated `KEY:VALUE` text.
    pub fn to_text(&self) -> String {
        let mut lines: Vec<String> = self
            .fields
            .labelled()
            .iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect();
        lines.push(format!("{KEY_TIME}:{}", self.time));
        lines.push(format!("{KEY_HASH}:{}", self.hash));
        lines.join("\n")
    }
}

/// Fields recovered from a scanned payload. Nothing is validated beyond the
/// presence of the required keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPayload {
    pub fields: SignedFields,
    pub time: Option<String>,
    pub hash: String,
}

impl ParsedPayload {
    pub fn parse(text: &str) -> Result<Self, PayloadError> {
        let mut map = parse_lines(text)?;

        let mut take = |key: &'static str| map.remove(key).ok_or(PayloadError::MissingKey(key));
        let fields = SignedFields {
            signer: take(KEY_SIGNER)?,
            emp_id: take(KEY_ID)?,
            position: take(KEY_POS)?,
            doc_no: take(KEY_DOC_NO)?,
            doc_name: take(KEY_DOC_NAME)?,
        };
        let hash = take(KEY_HASH)?;

        Ok(Self {
            fields,
            time: map.remove(KEY_TIME),
            hash,
        })
    }

    /// Digest recomputed from the embedded fields.
    pub fn recomputed_digest(&self) -> String {
        self.fields.digest()
    }
}

/// Split every non-blank line once on the first `:`. Later keys win.
fn parse_lines(text: &str) -> Result<HashMap<String, String>, PayloadError> {
    let mut map = HashMap::new();

    for (idx, raw) in text.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or(PayloadError::MissingSeparator { line: idx + 1 })?;
        map.insert(key.trim().to_string(), value.to_string());
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SignedFields {
        SignedFields::new("Jane Doe", "E-001", "Manager", "DOC/2024/7", "Purchase Order").unwrap()
    }

    #[test]
    fn canonical_joins_five_fields_in_order() {
        assert_eq!(
            sample().canonical(),
            "Jane Doe|E-001|Manager|DOC/2024/7|Purchase Order"
        );
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(sample().digest(), sample().digest());
        assert_eq!(sample().digest(), sha256_hex(sample().canonical().as_bytes()));
    }

    #[test]
    fn every_field_changes_the_digest() {
        let base = sample().digest();
        let mut variants = Vec::new();
        for i in 0..5 {
            let mut f = sample();
            match i {
                0 => f.signer.push('x'),
                1 => f.emp_id.push('x'),
                2 => f.position.push('x'),
                3 => f.doc_no.push('x'),
                _ => f.doc_name.push('x'),
            }
            variants.push(f.digest());
        }
        assert!(variants.iter().all(|d| *d != base));
    }

    #[test]
    fn rejects_delimiter_and_newlines() {
        assert_eq!(
            SignedFields::new("a|b", "1", "p", "n", "d").unwrap_err(),
            PayloadError::ForbiddenCharacter { field: KEY_SIGNER }
        );
        assert!(SignedFields::new("a", "1", "p\nq", "n", "d").is_err());
        assert!(SignedFields::new("a", "1", "p", "n", "d\r").is_err());
    }

    #[test]
    fn issued_text_layout() {
        let issued = IssuedPayload::issue(sample(), "09:15:00 02/01/2024");
        let text = issued.to_text();
        let keys: Vec<&str> = text.lines().map(|l| l.split(':').next().unwrap()).collect();
        assert_eq!(keys, ["SIGNER", "ID", "POS", "DOC_NO", "DOC_NAME", "TIME", "HASH"]);
        assert!(text.ends_with(&format!("HASH:{}", sample().digest())));
    }

    #[test]
    fn parse_splits_on_first_colon_only() {
        let issued = IssuedPayload::issue(sample(), "09:15:00 02/01/2024");
        let parsed = ParsedPayload::parse(&issued.to_text()).unwrap();
        assert_eq!(parsed.time.as_deref(), Some("09:15:00 02/01/2024"));
        assert_eq!(parsed.fields, sample());
        assert_eq!(parsed.hash, issued.hash);
    }

    #[test]
    fn parse_tolerates_crlf_and_blank_lines() {
        let issued = IssuedPayload::issue(sample(), "t");
        let text = format!("\n{}\r\n\r\n", issued.to_text().replace('\n', "\r\n"));
        let parsed = ParsedPayload::parse(&text).unwrap();
        assert_eq!(parsed.fields, sample());
    }

    #[test]
    fn parse_reports_missing_separator_and_keys() {
        assert_eq!(
            ParsedPayload::parse("SIGNER:a\nnot a pair").unwrap_err(),
            PayloadError::MissingSeparator { line: 2 }
        );
        assert_eq!(
            ParsedPayload::parse("SIGNER:a\nID:1\nPOS:p\nDOC_NO:n\nHASH:h").unwrap_err(),
            PayloadError::MissingKey(KEY_DOC_NAME)
        );
    }

    #[test]
    fn time_is_optional_for_parsing() {
        let text = "SIGNER:a\nID:1\nPOS:p\nDOC_NO:n\nDOC_NAME:d\nHASH:h";
        assert_eq!(ParsedPayload::parse(text).unwrap().time, None);
    }
}
