//! Perceptual fingerprinting for audit photos.
//!
//! Computes a fixed 64-bit Blockhash fingerprint from raw image bytes so that
//! visually similar resubmissions land within a small Hamming distance of the
//! original, even after re-encoding or mild editing.
//!
//! Decoding failure is a normal, recoverable condition: callers treat it as
//! "no fingerprint available" and skip duplicate detection for that item.

use crate::error::{AuditError, Result};
use blockhash::{blockhash64, Blockhash64};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Fixed fingerprint size in bytes (64 bits).
pub const FINGERPRINT_SIZE: usize = 8;

/// A perceptual fingerprint of an image's visual content.
///
/// Semantically a bit vector; only meaningfully compared via Hamming
/// distance against another fingerprint of the same width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    bits: Vec<u8>,
}

impl Fingerprint {
    /// Create a fingerprint from raw hash bytes.
    pub fn from_bytes(bits: Vec<u8>) -> Self {
        Self { bits }
    }

    /// The underlying hash bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Fingerprint width in bits.
    pub fn bit_width(&self) -> u32 {
        (self.bits.len() * 8) as u32
    }

    /// Hamming distance (count of differing bits) to another fingerprint.
    ///
    /// Fingerprints of different widths are not comparable; that is an
    /// explicit error, never a silent approximation.
    pub fn hamming_distance(&self, other: &Self) -> Result<u32> {
        if self.bits.is_empty() || other.bits.is_empty() {
            return Err(AuditError::Fingerprint(
                "Cannot compare empty fingerprints".into(),
            ));
        }
        if self.bits.len() != other.bits.len() {
            return Err(AuditError::Fingerprint(format!(
                "Fingerprint width mismatch: {} vs {} bits",
                self.bit_width(),
                other.bit_width()
            )));
        }

        Ok(self
            .bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }

    /// Hex encoding used for storage columns.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bits)
    }

    /// Parse a fingerprint from its hex storage form.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bits = hex::decode(hex_str)
            .map_err(|e| AuditError::Fingerprint(format!("Invalid hex fingerprint: {}", e)))?;
        if bits.is_empty() {
            return Err(AuditError::Fingerprint("Empty fingerprint".into()));
        }
        Ok(Self { bits })
    }
}

/// Fingerprint computation over raw image bytes.
///
/// Deterministic: the same bytes always produce the same fingerprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fingerprinter;

impl Fingerprinter {
    pub fn new() -> Self {
        Self
    }

    /// Compute a fingerprint from raw image bytes.
    ///
    /// Supports JPEG, PNG, GIF, and WebP. Returns `AuditError::Fingerprint`
    /// when the bytes cannot be decoded as an image.
    pub fn hash_bytes(&self, image_data: &[u8]) -> Result<Fingerprint> {
        let image = image::load_from_memory(image_data)
            .map_err(|e| AuditError::Fingerprint(format!("Failed to decode image: {}", e)))?;
        Ok(self.hash_image(&image))
    }

    /// Compute a fingerprint from an already-decoded image.
    pub fn hash_image(&self, image: &DynamicImage) -> Fingerprint {
        let hash: Blockhash64 = blockhash64(image);
        let bytes: [u8; FINGERPRINT_SIZE] = hash.into();
        Fingerprint::from_bytes(bytes.to_vec())
    }

    /// Check whether the bytes look like a supported image format.
    pub fn is_supported_format(data: &[u8]) -> bool {
        image::guess_format(data).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    fn encode_png(pixel: [u8; 3]) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(32, 32, Rgb(pixel));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn identical_bytes_produce_identical_fingerprints() {
        let png = encode_png([120, 40, 200]);
        let hasher = Fingerprinter::new();

        let a = hasher.hash_bytes(&png).unwrap();
        let b = hasher.hash_bytes(&png).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.bit_width(), 64);
    }

    #[test]
    fn distance_to_self_is_zero_and_symmetric() {
        let a = Fingerprint::from_bytes(vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11, 0x22, 0x33]);
        let b = Fingerprint::from_bytes(vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x11, 0x22, 0x34]);

        assert_eq!(a.hamming_distance(&a).unwrap(), 0);
        assert_eq!(
            a.hamming_distance(&b).unwrap(),
            b.hamming_distance(&a).unwrap()
        );
    }

    #[test]
    fn distance_counts_differing_bits() {
        let a = Fingerprint::from_bytes(vec![0x00; 8]);
        let b = Fingerprint::from_bytes(vec![0xFF; 8]);
        let c = Fingerprint::from_bytes(vec![0x01, 0, 0, 0, 0, 0, 0, 0]);

        assert_eq!(a.hamming_distance(&b).unwrap(), 64);
        assert_eq!(a.hamming_distance(&c).unwrap(), 1);
    }

    #[test]
    fn mismatched_widths_fail_explicitly() {
        let a = Fingerprint::from_bytes(vec![0x00; 8]);
        let b = Fingerprint::from_bytes(vec![0x00; 5]);

        assert!(matches!(
            a.hamming_distance(&b),
            Err(AuditError::Fingerprint(_))
        ));
    }

    #[test]
    fn empty_fingerprint_comparison_fails() {
        let a = Fingerprint::from_bytes(vec![]);
        let b = Fingerprint::from_bytes(vec![0x00; 8]);
        assert!(a.hamming_distance(&b).is_err());
    }

    #[test]
    fn hex_roundtrip() {
        let original = Fingerprint::from_bytes(vec![0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE, 0xBA, 0xBE]);
        let hex = original.to_hex();
        assert_eq!(hex, "deadbeefcafebabe");

        let restored = Fingerprint::from_hex(&hex).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(Fingerprint::from_hex("not hex").is_err());
        assert!(Fingerprint::from_hex("").is_err());
    }

    #[test]
    fn undecodable_bytes_are_a_fingerprint_error() {
        let hasher = Fingerprinter::new();
        let err = hasher.hash_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AuditError::Fingerprint(_)));
    }

    #[test]
    fn similar_images_are_close() {
        let hasher = Fingerprinter::new();
        let a = hasher.hash_bytes(&encode_png([120, 40, 200])).unwrap();
        let b = hasher.hash_bytes(&encode_png([122, 42, 202])).unwrap();

        // Near-identical flat images should land well under any sane threshold.
        assert!(a.hamming_distance(&b).unwrap() <= 10);
    }

    #[test]
    fn format_sniffing() {
        assert!(Fingerprinter::is_supported_format(&[
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A
        ]));
        assert!(Fingerprinter::is_supported_format(&[0xFF, 0xD8, 0xFF]));
        assert!(!Fingerprinter::is_supported_format(&[0x00, 0x00, 0x00]));
    }
}
