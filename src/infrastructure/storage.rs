use crate::config::AppConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use tracing::info;

/// Builds the S3 client from config; a custom endpoint switches to path-style
/// addressing for MinIO and other S3-compatible stores.
pub async fn setup_storage(config: &AppConfig) -> anyhow::Result<Client> {
    let endpoint = config.s3_endpoint.as_deref().unwrap_or("AWS");
    info!("☁️  S3 Storage: {} (Bucket: {})", endpoint, config.s3_bucket);

    let mut loader = aws_config::from_env().region(Region::new(config.s3_region.clone()));

    if let Some(endpoint_url) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint_url);
    }

    if let (Some(access_key), Some(secret_key)) = (&config.s3_access_key, &config.s3_secret_key) {
        loader = loader.credentials_provider(Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "static",
        ));
    }

    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.s3_endpoint.is_some())
        .build();

    let client = Client::from_conf(s3_config);
    ensure_bucket(&client, &config.s3_bucket).await?;

    Ok(client)
}

async fn ensure_bucket(client: &Client, bucket: &str) -> anyhow::Result<()> {
    if client.head_bucket().bucket(bucket).send().await.is_ok() {
        info!("✅ Bucket '{}' is available", bucket);
        return Ok(());
    }

    info!("🪣 Bucket '{}' not found, creating it", bucket);
    client
        .create_bucket()
        .bucket(bucket)
        .send()
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "failed to create bucket '{}': {}",
                bucket,
                aws_sdk_s3::error::DisplayErrorContext(&e)
            )
        })?;
    info!("✅ Bucket '{}' created", bucket);

    Ok(())
}
