//! Runs against a hosted backend: PostgREST tables, S3-compatible buckets and the
//! external thumbnail service. Configure through `FOLIO_*` variables or a `.env` file.

use folio::prelude::*;
use opendal::{Operator, services::S3};
use std::env;

fn bucket(config: &FolioConfig, name: &str) -> anyhow::Result<OpendalStorage> {
    let builder = S3::default()
        .endpoint(&format!("{}/storage/v1/s3", config.project_url))
        .region(&env::var("FOLIO_S3_REGION").unwrap_or_else(|_| "us-east-1".into()))
        .access_key_id(&env::var("FOLIO_S3_ACCESS_KEY_ID")?)
        .secret_access_key(&env::var("FOLIO_S3_SECRET_ACCESS_KEY")?)
        .bucket(name);
    let op = Operator::new(builder)?.finish();
    Ok(OpendalStorage::new(op, config.bucket_url(name)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = FolioConfig::from_env()?;
    let service_key = config
        .service_role_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("FOLIO_SERVICE_ROLE_KEY is required"))?;
    let thumbnail_url = config
        .thumbnail_service_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("FOLIO_THUMBNAIL_SERVICE_URL is required"))?;

    // Providers
    let originals = bucket(&config, &config.originals_bucket)?;
    let derived = bucket(&config, &config.derived_bucket)?;
    let records = RestRecordStore::new(config.rest_url(), service_key.clone(), config.http_timeout);
    let thumbnails = ThumbnailServiceClient::new(thumbnail_url, Some(service_key), config.http_timeout);
    let probe = HttpProbe::new(config.http_timeout);

    let library = AssetLibrary::new(
        originals,
        derived,
        records,
        thumbnails,
        probe,
        config.originals_bucket.clone(),
        config.placeholder.clone(),
    )
    .with_derived_bucket(config.derived_bucket.clone());
    let auth = AdminCredentialsAuth::from_config(&config);

    // Build
    let app = FolioServer::new(FolioServerConfig::from_folio_config(&config)).build(library, auth);

    // Serve
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");
    println!("Server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
