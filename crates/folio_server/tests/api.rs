//! Router tests over in-memory backends.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use folio_auth_mock::AllowAllAuth;
use folio_core::memory::{MemoryRecordStore, MemoryStorage, PassthroughThumbnails};
use folio_core::prelude::*;
use folio_server::prelude::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const PUBLIC: &str = "https://cdn.test/storage/v1/object/public";

type Library =
    AssetLibrary<MemoryStorage, MemoryRecordStore, PassthroughThumbnails<MemoryStorage>, StorageProbe<MemoryStorage>>;

fn library() -> Library {
    let originals = MemoryStorage::new(format!("{PUBLIC}/photos-original"));
    let derived = MemoryStorage::new(format!("{PUBLIC}/photos-derived"));
    AssetLibrary::new(
        originals.clone(),
        derived.clone(),
        MemoryRecordStore::default(),
        PassthroughThumbnails::new(originals, derived.clone()),
        StorageProbe(derived),
        "photos-original",
        "/photoAssets/home-hero.avif",
    )
}

fn config() -> FolioServerConfig {
    FolioServerConfig {
        jwt_secret: "test-secret".into(),
        ..Default::default()
    }
}

fn open_app() -> Router {
    FolioServer::new(config()).build(library(), AllowAllAuth)
}

fn locked_app() -> Router {
    let auth = AdminCredentialsAuth::new(
        Some("service-key".into()),
        Some("admin@example.com".into()),
        Some("hunter2".into()),
    );
    FolioServer::new(config()).build(library(), auth)
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Body) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(request.header("content-type", "application/json").body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, Body::empty()).await
}

async fn upload(app: &Router, name: &str, category: Option<i64>) -> Value {
    let uri = match category {
        Some(id) => format!("/admin/assets?name={name}&category={id}"),
        None => format!("/admin/assets?name={name}"),
    };
    let (status, body) = send(app, Method::POST, &uri, Some("t"), Body::from("jpeg bytes")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn health_is_public() {
    let response = open_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn upload_then_resolve_by_width() {
    let app = open_app();
    let report = upload(&app, "sunset.jpg", None).await;
    assert!(report["thumbnail_error"].is_null());
    let id = report["asset"]["id"].as_i64().unwrap();

    let (status, url) = get(&app, &format!("/assets/{id}/url?width=500")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(url["url"].as_str().unwrap().contains("/photos-derived/small/"));
    assert_eq!(url["source"]["kind"], "manifest");

    let (_, url) = get(&app, &format!("/assets/{id}/url?width=500&hero=true")).await;
    assert!(url["url"].as_str().unwrap().contains("/medium/"));

    let (_, url) = get(&app, "/assets/999/url").await;
    assert_eq!(url["url"], "/photoAssets/home-hero.avif");
    assert_eq!(url["source"]["kind"], "placeholder");
}

#[tokio::test]
async fn home_hero_hands_over() {
    let app = open_app();
    let a = upload(&app, "a.jpg", None).await["asset"]["id"].as_i64().unwrap();
    let b = upload(&app, "b.jpg", None).await["asset"]["id"].as_i64().unwrap();

    for id in [a, b] {
        let (status, _) = send(
            &app,
            Method::PUT,
            "/admin/roles/home-hero",
            Some("t"),
            Body::from(json!({"asset_id": id}).to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, holder) = get(&app, "/roles/home_hero?width=1200").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(holder["asset"]["id"], b);
    assert!(holder["url"]["url"].as_str().unwrap().contains("/large/"));

    let (_, heroes) = send(&app, Method::GET, "/admin/assets?role=home_hero", Some("t"), Body::empty()).await;
    assert_eq!(heroes.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn scoped_roles_need_a_category() {
    let app = open_app();
    let (status, _) = get(&app, "/roles/category_thumbnail").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/roles/banner").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn categories_hub_and_gallery() {
    let app = open_app();
    let (status, cars) = send(
        &app,
        Method::POST,
        "/admin/categories",
        Some("t"),
        Body::from(json!({"name": "Classic Cars"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cars["slug"], "classic-cars");
    let cars_id = cars["id"].as_i64().unwrap();

    let asset = upload(&app, "mustang.jpg", Some(cars_id)).await["asset"]["id"]
        .as_i64()
        .unwrap();
    let (status, _) = send(
        &app,
        Method::PUT,
        "/admin/roles/category_thumbnail",
        Some("t"),
        Body::from(json!({"asset_id": asset, "category": cars_id}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, hub) = get(&app, "/categories?width=800").await;
    assert_eq!(hub.as_array().unwrap().len(), 1);
    assert!(hub[0]["thumbnail_url"].as_str().unwrap().contains("/medium/"));

    let (_, gallery) = get(&app, "/categories/classic-cars/assets").await;
    assert_eq!(gallery.as_array().unwrap().len(), 1);

    let (status, _) = get(&app, "/categories/boats/assets").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/admin/categories/{cars_id}"),
        Some("t"),
        Body::from(json!({"visible_on_hub": false}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, hub) = get(&app, "/categories").await;
    assert!(hub.as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::DELETE, "/admin/categories/42", Some("t"), Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_record() {
    let app = open_app();
    let id = upload(&app, "gone.jpg", None).await["asset"]["id"].as_i64().unwrap();

    let (status, report) = send(&app, Method::DELETE, &format!("/admin/assets/{id}"), Some("t"), Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["derived_removed"].as_array().unwrap().len(), 3);

    let (status, _) = send(&app, Method::DELETE, &format!("/admin/assets/{id}"), Some("t"), Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn backfill_is_idempotent_over_http() {
    let app = open_app();
    upload(&app, "a.jpg", None).await;

    let (status, report) = send(&app, Method::POST, "/admin/backfill", Some("t"), Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["inserted"], 0);
    assert_eq!(report["skipped"], 1);
}

#[tokio::test]
async fn admin_routes_require_credentials() {
    let app = locked_app();
    let (status, _) = send(&app, Method::GET, "/admin/assets", None, Body::empty()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/admin/assets", Some("service-key"), Body::empty()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Body::from(json!({"email": "admin@example.com", "password": "nope"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Body::from(json!({"email": "admin@example.com", "password": "hunter2"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["expires_in"], 30 * 24 * 60 * 60);
    let token = login["token"].as_str().unwrap();

    let (status, _) = send(&app, Method::GET, "/admin/categories", Some(token), Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn media_serves_stored_objects() {
    let app = open_app();
    let path = upload(&app, "dune.jpg", None).await["asset"]["path"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/media/photos-original/{path}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"jpeg bytes");

    let (_, url) = get(&app, "/assets/1/url?width=500").await;
    let derived = url["url"].as_str().unwrap().strip_prefix(PUBLIC).unwrap().to_string();
    let response = app
        .clone()
        .oneshot(Request::builder().uri(format!("/media{derived}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/webp");

    let (status, _) = get(&app, "/media/photos-original/nothing.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&app, &format!("/media/elsewhere/{path}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pricing_pages_and_reviews() {
    let app = open_app();
    let post = |uri: &'static str, body: Value| {
        let app = app.clone();
        async move { send(&app, Method::POST, uri, Some("t"), Body::from(body.to_string())).await }
    };

    let (status, weddings) = post("/admin/pricing/categories", json!({"name": "Weddings", "display_order": 2})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(weddings["slug"], "weddings");
    let (_, cars) = post("/admin/pricing/categories", json!({"name": "Cars", "display_order": 1})).await;
    let (status, _) = post("/admin/pricing/categories", json!({"name": "Cars again", "slug": "cars"})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let cars_id = cars["id"].as_i64().unwrap();
    for (title, price) in [("Full", 450.0), ("Basic", 150.0)] {
        let (status, _) = post(
            "/admin/pricing/plans",
            json!({"category_id": cars_id, "title": title, "price": price, "deliverables": ["photos", " "]}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = post("/admin/pricing/plans", json!({"category_id": cars_id, "title": "Free?", "price": -5.0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listing) = get(&app, "/pricing").await;
    let names: Vec<_> = listing.as_array().unwrap().iter().map(|c| c["name"].clone()).collect();
    assert_eq!(names, [json!("Cars"), json!("Weddings")]);

    let (status, page) = get(&app, "/pricing/cars").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["plans"][0]["title"], "Basic");
    assert_eq!(page["plans"][0]["deliverables"], json!(["photos"]));
    let (status, _) = get(&app, "/pricing/boats").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, review) = post("/admin/reviews", json!({"name": "Sam", "company": "Acme", "content": "Great"})).await;
    assert_eq!(status, StatusCode::CREATED);
    let review_id = review["id"].as_i64().unwrap();
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/admin/reviews/{review_id}"),
        Some("t"),
        Body::from(json!({"content": "Superb"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, reviews) = get(&app, "/reviews").await;
    assert_eq!(reviews[0]["content"], "Superb");

    let (status, _) = send(&app, Method::DELETE, &format!("/admin/reviews/{review_id}"), Some("t"), Body::empty()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, "/admin/pricing/plans/99", Some("t"), Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_writes_need_credentials() {
    let app = locked_app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/admin/reviews",
        None,
        Body::from(json!({"name": "Sam", "content": "Great"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = get(&app, "/reviews").await;
    assert_eq!(status, StatusCode::OK);
}
