use axum::{
    Json, Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use folio_client::*;
use folio_core::prelude::*;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn thumbnail_client_reads_structured_answers() {
    let router = Router::new().route(
        "/generate-thumbnails",
        post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(headers["authorization"], "Bearer secret");
            assert_eq!(body["bucket"], "photos-original");
            assert_eq!(body["category"], "cars");
            Json(json!({
                "ok": true,
                "generatedPaths": {
                    "small": {"webp": format!("small/{}.webp", body["file"].as_str().unwrap())}
                }
            }))
        }),
    );
    let base = serve(router).await;
    let client = ThumbnailServiceClient::new(base, Some("secret".into()), Duration::from_secs(5));

    let generated = client
        .generate("photos-original", "car", Some("cars"))
        .await
        .unwrap();
    let manifest = generated.into_manifest();
    assert_eq!(manifest.get(SizeTier::Small, ImageFormat::Webp), Some("small/car.webp"));
}

#[tokio::test]
async fn thumbnail_client_surfaces_html_errors() {
    let router = Router::new().route(
        "/generate-thumbnails",
        post(|| async { (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") }),
    );
    let base = serve(router).await;
    let client = ThumbnailServiceClient::new(base, None, Duration::from_secs(5));

    let err = client.generate("b", "a.jpg", None).await.unwrap_err();
    assert!(matches!(err, ThumbnailError::MalformedResponse(502)));
}

#[tokio::test]
async fn delete_job_reports_rejection() {
    let router = Router::new().route(
        "/delete-job",
        post(|Json(body): Json<Value>| async move {
            if body["derived_paths"].as_array().is_some_and(|p| p.is_empty()) {
                (StatusCode::BAD_REQUEST, Json(json!({"ok": false, "error": "nothing to delete"})))
            } else {
                (StatusCode::OK, Json(json!({"ok": true})))
            }
        }),
    );
    let base = serve(router).await;
    let client = ThumbnailServiceClient::new(base, None, Duration::from_secs(5));

    client
        .delete_job("a.jpg", &["small/a.webp".to_string()])
        .await
        .unwrap();
    let err = client.delete_job("a.jpg", &[]).await.unwrap_err();
    assert!(matches!(err, ThumbnailError::Rejected(msg) if msg == "nothing to delete"));
}

#[tokio::test]
async fn http_probe_follows_status_codes() {
    let router = Router::new()
        .route("/small/a.webp", get(|| async { "image" }))
        .route("/small/b.webp", get(|| async { StatusCode::NOT_FOUND }));
    let base = serve(router).await;
    let probe = HttpProbe::new(Duration::from_secs(5));

    let found = Candidate {
        key: "small/a.webp".into(),
        url: format!("{base}/small/a.webp"),
    };
    let missing = Candidate {
        key: "small/b.webp".into(),
        url: format!("{base}/small/b.webp"),
    };
    assert!(probe.probe(&found).await.unwrap());
    assert!(!probe.probe(&missing).await.unwrap());
}

#[tokio::test]
async fn video_catalog_round_trip() {
    let router = Router::new()
        .route("/videos", get(|| async { Json(json!(["music", "travel"])) }))
        .route(
            "/videos/{category}",
            get(|Path(category): Path<String>| async move {
                assert_eq!(category, "music");
                Json(json!([{"title": "Live", "url": "https://www.youtube.com/embed/a"}]))
            })
            .post(|Json(video): Json<Video>| async move {
                Json(json!({"videos": [video]}))
            }),
        )
        .route(
            "/videos/{category}/{index}",
            axum::routing::delete(|Path((_, index)): Path<(String, usize)>| async move {
                assert_eq!(index, 0);
                Json(json!({"videos": []}))
            }),
        );
    let base = serve(router).await;
    let client = VideoCatalogClient::new(format!("{base}/videos/"));

    assert_eq!(client.categories().await.unwrap(), vec!["music", "travel"]);
    assert_eq!(client.list("music").await.unwrap().len(), 1);

    let videos = client
        .add("music", " Encore ", "https://youtu.be/xyz")
        .await
        .unwrap();
    assert_eq!(videos[0].title, "Encore");
    assert_eq!(videos[0].url, "https://www.youtube.com/embed/xyz");

    assert!(matches!(
        client.add("music", "Encore", "https://vimeo.com/1").await,
        Err(FolioClientError::Validation(_))
    ));
    assert!(client.delete("music", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn rest_store_speaks_postgrest() {
    let router = Router::new().route(
        "/rest/v1/images",
        get(
            |headers: HeaderMap, Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(headers["apikey"], "service");
                assert_eq!(headers["authorization"], "Bearer service");
                if query.get("path").map(String::as_str) == Some("eq.missing.jpg") {
                    return Json(json!([]));
                }
                assert_eq!(query["is_home_hero"], "eq.true");
                Json(json!([{
                    "id": 7,
                    "path": "a.jpg",
                    "title": "A",
                    "category_id": null,
                    "is_home_hero": true,
                    "derived": {"small": {"webp": "small/a.webp"}},
                    "created_at": "2024-05-01T10:00:00Z",
                    "uploaded_by": null
                }]))
            },
        )
        .post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(headers["prefer"], "return=representation");
            if body["path"] == "dupe.jpg" {
                return (StatusCode::CONFLICT, Json(json!({"message": "duplicate key"})));
            }
            (
                StatusCode::CREATED,
                Json(json!([{
                    "id": 8,
                    "path": body["path"],
                    "title": body["title"],
                    "category_id": null,
                    "derived": null,
                    "created_at": "2024-05-02T10:00:00Z",
                    "uploaded_by": null
                }])),
            )
        }),
    );
    let base = serve(router).await;
    let store = RestRecordStore::new(format!("{base}/rest/v1"), "service", Duration::from_secs(5));

    let heroes = store
        .list_assets(AssetFilter::role(Role::HomeHero, None))
        .await
        .unwrap();
    assert_eq!(heroes.len(), 1);
    assert!(heroes[0].roles.get(Role::HomeHero));
    assert_eq!(
        heroes[0].derived.as_ref().unwrap().get(SizeTier::Small, ImageFormat::Webp),
        Some("small/a.webp")
    );

    assert!(store.find_asset_by_path("missing.jpg").await.unwrap().is_none());

    let inserted = store
        .insert_asset(NewAsset::placeholder("b.jpg", None))
        .await
        .unwrap();
    assert_eq!(inserted.id, 8);
    assert!(!inserted.roles.any());

    assert!(matches!(
        store.insert_asset(NewAsset::placeholder("dupe.jpg", None)).await,
        Err(StoreError::Conflict(_))
    ));
}

#[tokio::test]
async fn rest_store_orders_and_patches_catalog_rows() {
    let router = Router::new()
        .route(
            "/rest/v1/pricing_plans",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(query["order"], "display_order.asc,price.asc,id.asc");
                assert_eq!(query["category_id"], "eq.3");
                Json(json!([{
                    "id": 1,
                    "category_id": 3,
                    "title": "Basic",
                    "price": 150.0,
                    "deliverables": ["10 photos"]
                }]))
            }),
        )
        .route(
            "/rest/v1/reviews",
            axum::routing::patch(
                |Query(query): Query<HashMap<String, String>>, Json(body): Json<Value>| async move {
                    assert_eq!(query["id"], "eq.4");
                    assert_eq!(body, json!({"company": null, "content": "Lovely"}));
                    Json(json!([{"id": 4, "name": "Sam", "company": null, "content": "Lovely"}]))
                },
            ),
        );
    let base = serve(router).await;
    let store = RestRecordStore::new(format!("{base}/rest/v1"), "service", Duration::from_secs(5));

    let plans = store.list_pricing_plans(Some(3)).await.unwrap();
    assert_eq!(plans[0].deliverables, ["10 photos"]);
    assert_eq!(plans[0].display_order, 0);

    let review = store
        .update_review(
            4,
            ReviewPatch {
                company: Some(" ".into()),
                content: Some("Lovely".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(review.company, None);
}
