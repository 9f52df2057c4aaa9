use thiserror::Error;

/// Extension used when a media type has no usable subtype
pub const FALLBACK_EXTENSION: &str = ".bin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing Content-Type for video")]
    MissingContentType,

    #[error("malformed Content-Type '{0}'")]
    MalformedContentType(String),

    #[error("media type '{0}' is not an accepted video type")]
    UnsupportedContentType(String),

    #[error("upload exceeds maximum allowed size of {limit} bytes ({} MB)", limit / 1024 / 1024)]
    TooLarge { limit: usize },
}

/// Parses a declared content type and checks it against the allowlist.
///
/// Parameters such as `; codecs=...` are dropped; the returned value is the
/// lowercase `type/subtype` essence.
pub fn validate_video_content_type(
    content_type: Option<&str>,
    allowed: &[String],
) -> Result<String, ValidationError> {
    let raw = content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .ok_or(ValidationError::MissingContentType)?;

    let parsed: mime::Mime = raw
        .parse()
        .map_err(|_| ValidationError::MalformedContentType(raw.to_string()))?;
    let media_type = parsed.essence_str().to_lowercase();

    if allowed
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&media_type))
    {
        return Ok(media_type);
    }

    Err(ValidationError::UnsupportedContentType(media_type))
}

/// Validates upload size against maximum limit
pub fn validate_upload_size(size: usize, max_size: usize) -> Result<(), ValidationError> {
    if size > max_size {
        return Err(ValidationError::TooLarge { limit: max_size });
    }
    Ok(())
}

/// Maps `type/subtype` to `.subtype`, anything else to `.bin`.
pub fn media_type_to_extension(media_type: &str) -> String {
    let mut parts = media_type.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(kind), Some(subtype), None) if !kind.is_empty() && !subtype.is_empty() => {
            format!(".{}", subtype)
        }
        _ => FALLBACK_EXTENSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp4_only() -> Vec<String> {
        vec!["video/mp4".to_string()]
    }

    #[test]
    fn test_validate_video_content_type() {
        assert_eq!(
            validate_video_content_type(Some("video/mp4"), &mp4_only()).unwrap(),
            "video/mp4"
        );
        assert_eq!(
            validate_video_content_type(Some("Video/MP4; codecs=\"avc1\""), &mp4_only()).unwrap(),
            "video/mp4"
        );
    }

    #[test]
    fn test_rejects_missing_and_disallowed_types() {
        assert_eq!(
            validate_video_content_type(None, &mp4_only()),
            Err(ValidationError::MissingContentType)
        );
        assert_eq!(
            validate_video_content_type(Some("  "), &mp4_only()),
            Err(ValidationError::MissingContentType)
        );
        assert_eq!(
            validate_video_content_type(Some("image/png"), &mp4_only()),
            Err(ValidationError::UnsupportedContentType("image/png".to_string()))
        );
        assert!(matches!(
            validate_video_content_type(Some("not a mime"), &mp4_only()),
            Err(ValidationError::MalformedContentType(_))
        ));
    }

    #[test]
    fn test_whitelist_extension() {
        let allowed = vec!["video/mp4".to_string(), "video/quicktime".to_string()];
        assert_eq!(
            validate_video_content_type(Some("video/quicktime"), &allowed).unwrap(),
            "video/quicktime"
        );
    }

    #[test]
    fn test_validate_upload_size() {
        assert!(validate_upload_size(1024, 2048).is_ok());
        assert!(validate_upload_size(2048, 2048).is_ok());
        assert_eq!(
            validate_upload_size(2049, 2048),
            Err(ValidationError::TooLarge { limit: 2048 })
        );
    }

    #[test]
    fn test_media_type_to_extension() {
        assert_eq!(media_type_to_extension("video/mp4"), ".mp4");
        assert_eq!(media_type_to_extension("video/quicktime"), ".quicktime");
        assert_eq!(media_type_to_extension("video"), ".bin");
        assert_eq!(media_type_to_extension("a/b/c"), ".bin");
        assert_eq!(media_type_to_extension("/mp4"), ".bin");
    }
}
