use folio::memory::{MemoryRecordStore, PassthroughThumbnails};
use folio::prelude::*;
use std::env;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let public = format!("http://localhost:{port}/media");

    // Providers
    let originals = FileSystemStorage::new("./folio_data/photos-original", format!("{public}/photos-original"));
    let derived = FileSystemStorage::new("./folio_data/photos-derived", format!("{public}/photos-derived"));
    let records = MemoryRecordStore::default();
    let thumbnails = PassthroughThumbnails::new(originals.clone(), derived.clone());

    let library = AssetLibrary::new(
        originals,
        derived.clone(),
        records,
        thumbnails,
        StorageProbe(derived),
        DEFAULT_ORIGINALS_BUCKET,
        DEFAULT_PLACEHOLDER,
    );

    // Don't use this in production! This is just for demonstration/testing purposes
    let auth = AllowAllAuth;

    // Build App
    let app = FolioServer::default().build(library, auth);

    // Serve
    let addr = format!("0.0.0.0:{port}");
    println!("Server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
