use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::digest::digests_match;
use crate::payload::{ParsedPayload, SignedFields};
use crate::qr;

/// Result of checking a scanned payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Verification {
    /// Embedded hash matches the one recomputed from the fields.
    Valid {
        fields: SignedFields,
        time: Option<String>,
    },
    /// Fields or hash were changed after issue.
    Manipulated,
    /// Text was read but is not a signature payload.
    Malformed { reason: String },
    /// No QR code could be read from the image.
    Unreadable { reason: String },
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Valid { .. } => "valid",
            Self::Manipulated => "manipulated",
            Self::Malformed { .. } => "malformed",
            Self::Unreadable { .. } => "unreadable",
        }
    }
}

pub fn verify_text(text: &str) -> Verification {
    let parsed = match ParsedPayload::parse(text) {
        Ok(p) => p,
        Err(e) => {
            debug!("Payload rejected: {}", e);
            return Verification::Malformed {
                reason: e.to_string(),
            };
        }
    };

    if digests_match(&parsed.hash, &parsed.recomputed_digest()) {
        Verification::Valid {
            fields: parsed.fields,
            time: parsed.time,
        }
    } else {
        Verification::Manipulated
    }
}

pub fn verify_image(bytes: &[u8]) -> Verification {
    match qr::decode(bytes) {
        Ok(text) => verify_text(&text),
        Err(e) => {
            debug!("QR decode failed: {}", e);
            Verification::Unreadable {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::IssuedPayload;

    fn issued() -> IssuedPayload {
        let fields =
            SignedFields::new("Budi Santoso", "EMP-42", "Supervisor", "PO-0099", "Invoice").unwrap();
        IssuedPayload::issue(fields, "14:03:22 17/05/2024")
    }

    #[test]
    fn issued_text_is_valid() {
        let issued = issued();
        match verify_text(&issued.to_text()) {
            Verification::Valid { fields, time } => {
                assert_eq!(fields, issued.fields);
                assert_eq!(time.as_deref(), Some("14:03:22 17/05/2024"));
            }
            other => panic!("expected valid, got {:?}", other),
        }
    }

    #[test]
    fn edited_field_is_manipulated() {
        let text = issued().to_text().replace("DOC_NAME:Invoice", "DOC_NAME:Invoice (paid)");
        assert_eq!(verify_text(&text), Verification::Manipulated);
    }

    #[test]
    fn edited_hash_is_manipulated() {
        let issued = issued();
        let forged = issued.to_text().replace(&issued.hash, &"0".repeat(64));
        assert_eq!(verify_text(&forged), Verification::Manipulated);
    }

    #[test]
    fn time_is_not_covered_by_the_hash() {
        let text = issued().to_text().replace("TIME:14:03:22", "TIME:15:00:00");
        assert!(verify_text(&text).is_valid());
    }

    #[test]
    fn uppercase_hash_still_matches() {
        let issued = issued();
        let text = issued.to_text().replace(&issued.hash, &issued.hash.to_uppercase());
        assert!(verify_text(&text).is_valid());
    }

    #[test]
    fn free_text_is_malformed() {
        let v = verify_text("https://example.com/some-link");
        assert_eq!(v.label(), "malformed");
    }

    #[test]
    fn image_round_trip() {
        let issued = issued();
        let png = qr::render_png(&issued.to_text(), None).unwrap();
        assert!(verify_image(&png).is_valid());
    }

    fn logo_png(draw: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
        let img = image::RgbImage::from_fn(128, 128, |x, y| image::Rgb(draw(x, y)));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn image_with_logo_round_trip() {
        let issued = issued();
        let logos = [
            logo_png(|_, _| [200, 0, 0]),
            logo_png(|_, _| [255, 255, 255]),
            // Dark frame around a light badge
            logo_png(|x, y| {
                if x < 16 || y < 16 || x >= 112 || y >= 112 {
                    [20, 40, 120]
                } else {
                    [240, 200, 40]
                }
            }),
        ];

        for logo in &logos {
            let png = qr::render_png(&issued.to_text(), Some(logo)).unwrap();
            match verify_image(&png) {
                Verification::Valid { fields, .. } => assert_eq!(fields, issued.fields),
                other => panic!("expected valid, got {:?}", other),
            }
        }
    }

    #[test]
    fn non_image_is_unreadable() {
        assert_eq!(verify_image(b"plain text").label(), "unreadable");
    }

    #[test]
    fn serialized_with_status_tag() {
        let json = serde_json::to_value(Verification::Manipulated).unwrap();
        assert_eq!(json["status"], "manipulated");

        let json = serde_json::to_value(verify_text(&issued().to_text())).unwrap();
        assert_eq!(json["status"], "valid");
        assert_eq!(json["fields"]["doc_no"], "PO-0099");
    }
}
