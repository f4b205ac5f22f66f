//! Perceptual fingerprints for evidence-frame deduplication.
//!
//! Uses a DoubleGradient hash (16×16) so near-identical frames (a static
//! screen captured twice, a cursor moving a few pixels) collapse to
//! similar fingerprints, while genuine scene changes do not.

use std::path::Path;

use image_hasher::{HashAlg, HasherConfig, ImageHash};

use docuflow_core::{Error, Result};

/// Compute the perceptual fingerprint of an image file, base64-encoded.
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let img = image::open(path)
        .map_err(|e| Error::Media(format!("cannot decode frame {}: {}", path.display(), e)))?;
    Ok(fingerprint_image(&img))
}

/// Compute the perceptual fingerprint of a decoded image.
pub fn fingerprint_image(img: &image::DynamicImage) -> String {
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::DoubleGradient)
        .hash_size(16, 16)
        .to_hasher();
    hasher.hash_image(img).to_base64()
}

/// Similarity of two fingerprints in [0, 1]; 1.0 means identical.
/// Returns None when either fingerprint fails to parse or the two hashes
/// are not the same length (e.g. an empty string, which is valid base64).
pub fn similarity(a: &str, b: &str) -> Option<f64> {
    let a = ImageHash::<Vec<u8>>::from_base64(a).ok()?;
    let b = ImageHash::<Vec<u8>>::from_base64(b).ok()?;
    if a.as_bytes().is_empty() || a.as_bytes().len() != b.as_bytes().len() {
        return None;
    }

    let distance = a.dist(&b);
    let max_bits = (a.as_bytes().len() * 8).max(1) as f64;
    Some(1.0 - (distance as f64 / max_bits))
}

/// Deterministic synthetic frame used by the mock processor and tests.
/// Frames with equal `scene` values are pixel-identical; different scenes
/// produce unrelated noise (expected similarity around 0.5).
pub fn synthetic_frame(scene: u64) -> image::DynamicImage {
    // Small LCG keyed by the scene id; the exact constants are arbitrary.
    let mut state = scene.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) as u8
    };
    let img = image::RgbImage::from_fn(64, 64, |_, _| image::Rgb([next(), next(), next()]));
    image::DynamicImage::ImageRgb8(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let img = synthetic_frame(7);
        let h1 = fingerprint_image(&img);
        let h2 = fingerprint_image(&img);
        assert_eq!(h1, h2);
        assert!(!h1.is_empty());
    }

    #[test]
    fn test_identical_frames_have_perfect_similarity() {
        let h = fingerprint_image(&synthetic_frame(42));
        let sim = similarity(&h, &h).unwrap();
        assert!((sim - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_distinct_scenes_are_not_near_duplicates() {
        let a = fingerprint_image(&synthetic_frame(1));
        let b = fingerprint_image(&synthetic_frame(2));
        let sim = similarity(&a, &b).unwrap();
        assert!(sim < 0.9, "independent noise frames scored {sim}");
    }

    #[test]
    fn test_similarity_rejects_malformed_fingerprints() {
        let h = fingerprint_image(&synthetic_frame(1));
        assert!(similarity(&h, "!!not base64!!").is_none());
        // The empty string is valid base64 but decodes to zero hash bytes.
        assert!(similarity("", &h).is_none());
        assert!(similarity("", "").is_none());
        // A truncated fingerprint still parses but has the wrong length.
        let truncated = &h[..h.len() - 4];
        assert!(similarity(&h, truncated).is_none());
    }

    #[test]
    fn test_fingerprint_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        synthetic_frame(3).save(&path).unwrap();

        let from_file = fingerprint_file(&path).unwrap();
        let from_image = fingerprint_image(&synthetic_frame(3));
        assert_eq!(from_file, from_image);
    }

    #[test]
    fn test_fingerprint_file_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_an_image.jpg");
        std::fs::write(&path, b"garbage").unwrap();
        assert!(fingerprint_file(&path).is_err());
    }
}
