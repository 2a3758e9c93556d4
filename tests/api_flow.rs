use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use booking_app_backend::config::Config;
use booking_app_backend::controller::{build_app, AppState};
use booking_app_backend::repositories::memory_repo::InMemoryRepo;
use booking_app_backend::services::media_service::MediaService;
use booking_app_backend::services::object_storage::LocalObjectStorage;
use booking_app_backend::services::session_service::{SessionClaims, SessionManager};
use clap::Parser;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

const JWT_SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");
        let config = test_config(&upload_dir);

        let storage = Arc::new(LocalObjectStorage::new(&upload_dir, "http://localhost:3000"));
        let media = MediaService::new(storage, dir.path().join("tmp"));
        let state = AppState::new(
            Arc::new(InMemoryRepo::new()),
            SessionManager::new(JWT_SECRET),
            media,
        );

        Self {
            router: build_app(state, &config),
            dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, headers, body)
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> (StatusCode, Value) {
        let (status, _, body) = self
            .json(
                Method::POST,
                "/api/register",
                None,
                Some(json!({ "name": name, "email": email, "password": password })),
            )
            .await;
        (status, body)
    }

    /// Registers and logs in, returning the `token=...` cookie pair.
    async fn sign_up(&self, name: &str, email: &str) -> String {
        let (status, _) = self.register(name, email, "pw").await;
        assert_eq!(status, StatusCode::OK);

        let (status, headers, _) = self
            .json(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "email": email, "password": "pw" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        session_cookie(&headers).expect("login should set the token cookie")
    }

    async fn create_place(&self, cookie: &str, title: &str) -> Value {
        let (status, _, place) = self
            .json(
                Method::POST,
                "/api/place",
                Some(cookie),
                Some(json!({
                    "title": title,
                    "address": "1 Main St",
                    "addedPhotos": ["https://cdn.test/a.jpg"],
                    "description": "Bright and quiet",
                    "perks": ["wifi", "parking"],
                    "extraInfo": "No pets",
                    "price": 100,
                    "checkIn": 14,
                    "checkOut": 11,
                    "maxGuests": 2,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        place
    }

    async fn create_booking(&self, cookie: &str, place_id: &str) -> Value {
        let (status, _, booking) = self
            .json(
                Method::POST,
                "/api/booking",
                Some(cookie),
                Some(json!({
                    "place": place_id,
                    "checkIn": "2024-05-01",
                    "checkOut": "2024-05-03",
                    "numberOfGuests": 2,
                    "name": "Ada",
                    "phone": "555-0100",
                    "price": 200,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        booking
    }
}

fn test_config(upload_dir: &Path) -> Config {
    Config::try_parse_from([
        "booking-app-backend".to_string(),
        "--jwt-secret".to_string(),
        JWT_SECRET.to_string(),
        "--upload-dir".to_string(),
        upload_dir.display().to_string(),
    ])
    .unwrap()
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("token="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

#[tokio::test]
async fn test_endpoint_says_hello() {
    let app = TestApp::new();

    let (status, _, body) = app.json(Method::GET, "/api/test", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "hello world" }));

    let (status, _, _) = app.json(Method::GET, "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_email_registration_is_unprocessable() {
    let app = TestApp::new();

    let (status, user) = app.register("A", "a@x.com", "pw").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "a@x.com");
    assert!(user.get("_id").is_some());
    assert!(user.get("password").is_none());

    let (status, err) = app.register("A again", "a@x.com", "other").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"], "ValidationError");
}

#[tokio::test]
async fn login_cookie_resolves_to_the_same_identity() {
    let app = TestApp::new();
    let (_, user) = app.register("A", "a@x.com", "pw").await;

    let (status, headers, body) = app
        .json(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("password").is_none());
    let cookie = session_cookie(&headers).unwrap();

    let (status, _, profile) = app.json(Method::GET, "/api/profile", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["id"], user["_id"]);
    assert_eq!(profile["email"], "a@x.com");
    assert_eq!(profile["name"], "A");
}

#[tokio::test]
async fn bad_credentials_are_unprocessable_and_set_no_cookie() {
    let app = TestApp::new();
    app.register("A", "a@x.com", "pw").await;

    let (status, headers, body) = app
        .json(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "password is incorrect");
    assert!(session_cookie(&headers).is_none());

    let (status, headers, body) = app
        .json(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "b@x.com", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "email is incorrect");
    assert!(session_cookie(&headers).is_none());
}

#[tokio::test]
async fn authenticated_routes_reject_missing_or_forged_tokens() {
    let app = TestApp::new();
    let forged = format!(
        "token={}",
        SessionManager::new("someone-else")
            .issue(&SessionClaims {
                name: "M".into(),
                email: "m@x.com".into(),
                id: Uuid::new_v4(),
                iat: 0,
            })
            .unwrap()
    );

    for (method, uri) in [
        (Method::GET, "/api/profile"),
        (Method::GET, "/api/user-places"),
        (Method::GET, "/api/bookings"),
        (Method::DELETE, "/api/booking/00000000-0000-0000-0000-000000000000"),
        (Method::DELETE, "/api/place/00000000-0000-0000-0000-000000000000"),
    ] {
        let (status, _, _) = app.json(method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {} without cookie", method, uri);

        let (status, _, _) = app.json(method.clone(), uri, Some(&forged), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {} with forged cookie", method, uri);
    }

    let (status, _, _) = app
        .json(Method::POST, "/api/place", Some("token=garbage"), Some(json!({ "title": "x" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let app = TestApp::new();
    let cookie = app.sign_up("A", "a@x.com").await;

    let (status, headers, body) = app.json(Method::POST, "/api/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(true));
    let cleared = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with("token=;") || value.starts_with("token=\"\""));
    assert!(cleared, "logout should expire the token cookie");
}

#[tokio::test]
async fn logout_without_a_session_still_expires_the_cookie() {
    let app = TestApp::new();

    let (status, headers, body) = app.json(Method::POST, "/api/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(true));
    let expired = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with("token=") && value.contains("Max-Age=0"));
    assert!(expired, "logout should always send an expired token cookie");
}

#[tokio::test]
async fn numeric_form_strings_are_accepted() {
    let app = TestApp::new();
    let alice = app.sign_up("A", "a@x.com").await;

    let (status, _, place) = app
        .json(
            Method::POST,
            "/api/place",
            Some(&alice),
            Some(json!({ "title": "t", "checkIn": "14", "price": "100", "maxGuests": "2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(place["checkIn"], json!(14));
    assert_eq!(place["price"], json!(100.0));
    assert_eq!(place["maxGuests"], json!(2));
    let id = place["_id"].as_str().unwrap().to_string();

    let (status, _, updated) = app
        .json(
            Method::PUT,
            "/api/place",
            Some(&alice),
            Some(json!({ "id": id, "checkOut": "11" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["checkOut"], json!(11));
    assert_eq!(updated["checkIn"], json!(14));

    let (status, _, booking) = app
        .json(
            Method::POST,
            "/api/booking",
            Some(&alice),
            Some(json!({
                "place": id,
                "checkIn": "2024-05-01",
                "checkOut": "2024-05-03",
                "numberOfGuests": "2",
                "name": "Ada",
                "phone": "555-0100",
                "price": "200",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["numberOfGuests"], json!(2));
    assert_eq!(booking["price"], json!(200.0));
}

#[tokio::test]
async fn places_cannot_be_changed_by_another_user() {
    let app = TestApp::new();
    let alice = app.sign_up("A", "a@x.com").await;
    let bob = app.sign_up("B", "b@x.com").await;

    let place = app.create_place(&alice, "Loft").await;
    let id = place["_id"].as_str().unwrap().to_string();
    assert_eq!(place["photos"], json!(["https://cdn.test/a.jpg"]));

    let (status, _, updated) = app
        .json(
            Method::PUT,
            "/api/place",
            Some(&bob),
            Some(json!({ "id": id, "title": "Stolen" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated, Value::Null);

    let (status, _, deleted) = app
        .json(Method::DELETE, &format!("/api/place/{}", id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({ "acknowledged": true, "deletedCount": 0 }));

    let (_, _, fetched) = app.json(Method::GET, &format!("/api/places/{}", id), None, None).await;
    assert_eq!(fetched, place);

    let (_, _, bobs) = app.json(Method::GET, "/api/user-places", Some(&bob), None).await;
    assert_eq!(bobs, json!([]));

    let (_, _, updated) = app
        .json(
            Method::PUT,
            "/api/place",
            Some(&alice),
            Some(json!({ "id": id, "title": "Attic", "addedPhotos": [] })),
        )
        .await;
    assert_eq!(updated["title"], "Attic");
    assert_eq!(updated["owner"], place["owner"]);
    assert_eq!(updated["photos"], json!([]));
    assert_eq!(updated["address"], "1 Main St");
    assert_eq!(updated["price"], json!(100.0));
    assert_eq!(updated["maxGuests"], json!(2));

    let (_, _, deleted) = app
        .json(Method::DELETE, &format!("/api/place/{}", id), Some(&alice), None)
        .await;
    assert_eq!(deleted["deletedCount"], 1);

    let (status, _, missing) = app.json(Method::GET, &format!("/api/places/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(missing, Value::Null);
}

#[tokio::test]
async fn listings_are_public() {
    let app = TestApp::new();
    let alice = app.sign_up("A", "a@x.com").await;
    app.create_place(&alice, "Loft").await;
    app.create_place(&alice, "Cabin").await;

    let (status, _, places) = app.json(Method::GET, "/api/places", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(places.as_array().unwrap().len(), 2);

    let (_, _, mine) = app.json(Method::GET, "/api/user-places", Some(&alice), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn bookings_are_listed_per_user_with_place_expanded() {
    let app = TestApp::new();
    let host = app.sign_up("H", "h@x.com").await;
    let alice = app.sign_up("A", "a@x.com").await;
    let bob = app.sign_up("B", "b@x.com").await;

    let place = app.create_place(&host, "Loft").await;
    let place_id = place["_id"].as_str().unwrap();
    let alices = app.create_booking(&alice, place_id).await;
    app.create_booking(&bob, place_id).await;

    let (status, _, listed) = app.json(Method::GET, "/api/bookings", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["_id"], alices["_id"]);
    assert_eq!(listed[0]["place"], place);

    let booking_id = alices["_id"].as_str().unwrap();
    let (status, _, deleted) = app
        .json(Method::DELETE, &format!("/api/booking/{}", booking_id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deletedCount"], 0);

    let (_, _, still_there) = app.json(Method::GET, "/api/bookings", Some(&alice), None).await;
    assert_eq!(still_there.as_array().unwrap().len(), 1);

    let (_, _, deleted) = app
        .json(Method::DELETE, &format!("/api/booking/{}", booking_id), Some(&alice), None)
        .await;
    assert_eq!(deleted["deletedCount"], 1);
}

#[tokio::test]
async fn register_login_place_booking_then_room_view() {
    let app = TestApp::new();
    let cookie = app.sign_up("A", "a@x.com").await;

    let place = app.create_place(&cookie, "Loft").await;
    let place_id = place["_id"].as_str().unwrap();
    let booking = app.create_booking(&cookie, place_id).await;
    assert_eq!(booking["price"], json!(200.0));

    let (status, _, room) = app
        .json(Method::GET, &format!("/api/room/{}", place_id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(room[0], place);
    assert_eq!(
        room[1],
        json!([{ "checkIn": booking["checkIn"], "checkOut": booking["checkOut"] }])
    );
    assert_eq!(room[1][0]["checkIn"], "2024-05-01T00:00:00Z");
}

#[tokio::test]
async fn multipart_uploads_are_relayed_in_order() {
    let app = TestApp::new();
    let boundary = "XBOUNDARYX";
    let mut body = Vec::new();
    for (name, bytes) in [("one.png", &b"first"[..]), ("two.jpg", &b"second"[..])] {
        body.extend_from_slice(format!(
            "--{}\r\nContent-Disposition: form-data; name=\"pictures\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
            boundary, name
        ).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, _, urls) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let urls = urls.as_array().unwrap();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].as_str().unwrap().ends_with(".png"));
    assert!(urls[1].as_str().unwrap().ends_with(".jpg"));

    let key = urls[1].as_str().unwrap().rsplit('/').next().unwrap();
    let (status, _, served) = app
        .json(Method::GET, &format!("/uploads/{}", key), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, Value::String("second".to_string()));
}

#[tokio::test]
async fn linked_images_are_downloaded_and_relayed_as_jpeg() {
    let app = TestApp::new();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    let remote = Router::new().route("/cat", get(|| async { "meow-bytes" }));
    let server = tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(remote.into_make_service())
            .await
            .unwrap();
    });

    let (status, _, url) = app
        .json(
            Method::POST,
            "/api/upload-with-link",
            None,
            Some(json!({ "link": format!("http://{}/cat", address) })),
        )
        .await;
    server.abort();

    assert_eq!(status, StatusCode::OK);
    let url = url.as_str().unwrap();
    assert!(url.starts_with("http://localhost:3000/uploads/"));
    assert!(url.ends_with(".jpeg"));

    let key = url.rsplit('/').next().unwrap();
    let stored = std::fs::read(app.dir.path().join("uploads").join(key)).unwrap();
    assert_eq!(stored, b"meow-bytes");
}
