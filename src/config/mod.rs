use crate::services::reference::validate_bucket;
use anyhow::{Context, bail};
use std::env;
use std::path::PathBuf;

/// Runtime configuration for the video upload service
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database connection string (default: "sqlite://videos.db?mode=rwc")
    pub database_url: String,

    /// Bucket receiving processed videos
    pub s3_bucket: String,

    /// Region used for signing (default: "us-east-1")
    pub s3_region: String,

    /// Custom endpoint for S3-compatible stores such as MinIO
    pub s3_endpoint: Option<String>,

    /// Static credentials; when unset the default AWS provider chain is used
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,

    /// JWT signing secret; `from_env` refuses to start without one
    pub jwt_secret: String,

    /// Maximum upload size in bytes (default: 1 GB)
    pub max_upload_size: usize,

    /// Accepted video media types (default: "video/mp4")
    pub allowed_video_types: Vec<String>,

    /// Media inspection binary (default: "ffprobe")
    pub ffprobe_path: String,

    /// Media rewrite binary (default: "ffmpeg")
    pub ffmpeg_path: String,

    /// Directory for staged and processed files; system temp dir when unset
    pub upload_temp_dir: Option<PathBuf>,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://videos.db?mode=rwc".to_string(),
            s3_bucket: "videos".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
            jwt_secret: "secret".to_string(),
            max_upload_size: 1024 * 1024 * 1024, // 1 GB
            allowed_video_types: vec!["video/mp4".to_string()],
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            upload_temp_dir: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails when `JWT_SECRET` is unset or the bucket name can't be encoded
    /// into a stored reference.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let default = Self::default();

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) if !secret.trim().is_empty() => secret,
            _ => bail!("CRITICAL: JWT_SECRET must be set"),
        };

        let s3_bucket = var("S3_BUCKET").unwrap_or(default.s3_bucket);
        validate_bucket(&s3_bucket).with_context(|| format!("invalid S3_BUCKET '{}'", s3_bucket))?;

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or(default.database_url),

            s3_bucket,

            s3_region: var("S3_REGION")
                .or_else(|| var("AWS_REGION"))
                .unwrap_or(default.s3_region),

            s3_endpoint: var("S3_ENDPOINT").filter(|v| !v.is_empty()),

            s3_access_key: var("S3_ACCESS_KEY"),
            s3_secret_key: var("S3_SECRET_KEY"),

            jwt_secret,

            max_upload_size: var("MAX_UPLOAD_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            allowed_video_types: var("ALLOWED_VIDEO_TYPES")
                .map(|v| split_list(&v))
                .filter(|types| !types.is_empty())
                .unwrap_or(default.allowed_video_types),

            ffprobe_path: var("FFPROBE_PATH").unwrap_or(default.ffprobe_path),

            ffmpeg_path: var("FFMPEG_PATH").unwrap_or(default.ffmpeg_path),

            upload_temp_dir: var("UPLOAD_TEMP_DIR").map(PathBuf::from),

            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or(default.allowed_origins),
        })
    }

    /// Create config for development (local MinIO, in-memory database)
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            s3_endpoint: Some("http://127.0.0.1:9000".to_string()),
            s3_access_key: Some("minioadmin".to_string()),
            s3_secret_key: Some("minioadmin".to_string()),
            ..Self::default()
        }
    }

    /// Directory staged uploads are written to
    pub fn temp_dir(&self) -> PathBuf {
        self.upload_temp_dir.clone().unwrap_or_else(env::temp_dir)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.max_upload_size, 1024 * 1024 * 1024);
        assert_eq!(config.allowed_video_types, vec!["video/mp4".to_string()]);
        assert_eq!(config.ffprobe_path, "ffprobe");
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert!(config.s3_endpoint.is_none());
    }

    #[test]
    fn test_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.s3_endpoint.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.s3_bucket, "videos");
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_env_requires_jwt_secret() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"), "{err}");

        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "  ")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"), "{err}");
    }

    #[test]
    fn test_production_config() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "prod_secret"),
            ("S3_BUCKET", "media"),
            ("MAX_UPLOAD_SIZE", "1048576"),
            ("ALLOWED_VIDEO_TYPES", "video/mp4, video/quicktime"),
        ]))
        .unwrap();

        assert_eq!(config.jwt_secret, "prod_secret");
        assert_eq!(config.s3_bucket, "media");
        assert_eq!(config.max_upload_size, 1024 * 1024);
        assert_eq!(config.allowed_video_types.len(), 2);
        assert_eq!(config.s3_region, "us-east-1");
    }

    #[test]
    fn test_from_env_rejects_bucket_with_delimiter() {
        let err = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "prod_secret"),
            ("S3_BUCKET", "bad,bucket"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("S3_BUCKET"), "{err}");
    }

    #[test]
    fn test_temp_dir_override() {
        let mut config = AppConfig::default();
        assert_eq!(config.temp_dir(), env::temp_dir());

        config.upload_temp_dir = Some(PathBuf::from("/var/tmp/uploads"));
        assert_eq!(config.temp_dir(), PathBuf::from("/var/tmp/uploads"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("video/mp4, video/quicktime,,"),
            vec!["video/mp4".to_string(), "video/quicktime".to_string()]
        );
        assert!(split_list(" , ").is_empty());
    }
}
