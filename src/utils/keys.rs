//! Object key generation.
//!
//! Key format: `{aspect}/{id}{ext}` where `id` is 32 random bytes encoded as
//! unpadded URL-safe base64 (43 characters).

use crate::services::probe::AspectClass;
use crate::utils::validation::media_type_to_extension;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

pub const RANDOM_KEY_BYTES: usize = 32;

/// 43-character URL-safe identifier drawn from the OS CSPRNG.
pub fn random_key() -> String {
    let mut bytes = [0u8; RANDOM_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Builds the object key for a processed video.
pub fn object_key(aspect: AspectClass, media_type: &str) -> String {
    format!(
        "{}/{}{}",
        aspect,
        random_key(),
        media_type_to_extension(media_type)
    )
}
