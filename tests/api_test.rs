use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use tipstream::cache::icon_hash;
use tipstream::config::Config;
use tipstream::db;
use tipstream::state::AppState;
use tipstream::views::FallbackIcon;

const FALLBACK: &[u8] = b"fallback-image";

struct TestApp {
    router: Router,
    _dir: TempDir,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

fn setup() -> TestApp {
    let dir = TempDir::new().unwrap();
    let pool =
        db::create_pool(&dir.path().join("test.db"), 4).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let fallback = FallbackIcon::new(Some(Bytes::from_static(FALLBACK)));
    let state = AppState::new(pool, Config::default(), fallback);
    TestApp {
        router: tipstream::build_router(state),
        _dir: dir,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
        extra: &[(header::HeaderName, &str)],
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        for (name, value) in extra {
            builder = builder.header(name.clone(), *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, uri: &str, cookie: &str) -> Reply {
        self.send(Method::GET, uri, Some(cookie), None, &[]).await
    }

    async fn post(&self, uri: &str, cookie: &str, body: Value) -> Reply {
        self.send(Method::POST, uri, Some(cookie), Some(body), &[]).await
    }

    /// Registers `name` and returns a session cookie for it.
    async fn signup(&self, name: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/api/register",
                None,
                Some(json!({
                    "name": name,
                    "display_name": name.to_uppercase(),
                    "password": "s3cret",
                    "theme": { "dark_mode": true },
                })),
                &[],
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);

        let reply = self
            .send(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "username": name, "password": "s3cret" })),
                &[],
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        let cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
        cookie.split(';').next().unwrap().to_string()
    }

    async fn create_livestream(&self, cookie: &str, title: &str) -> i64 {
        let reply = self
            .post(
                "/api/livestream",
                cookie,
                json!({ "title": title, "description": "", "start_at": 0, "end_at": 3600 }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        reply.json()["id"].as_i64().unwrap()
    }

    async fn comment(&self, cookie: &str, livestream: i64, text: &str, tip: i64) -> Reply {
        self.post(
            &format!("/api/livestream/{}/livecomment", livestream),
            cookie,
            json!({ "comment": text, "tip": tip }),
        )
        .await
    }
}

#[tokio::test]
async fn register_login_and_fetch_self() {
    let app = setup();
    let cookie = app.signup("alice").await;

    let me = app.get("/api/user/me", &cookie).await;
    assert_eq!(me.status, StatusCode::OK);
    let me = me.json();
    assert_eq!(me["name"], "alice");
    assert_eq!(me["display_name"], "ALICE");
    assert_eq!(me["theme"]["dark_mode"], true);
    assert_eq!(me["icon_hash"], icon_hash(FALLBACK));
    assert!(me.get("password").is_none());
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn reserved_name_and_bad_password_are_refused() {
    let app = setup();
    let reply = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "name": "pipe", "password": "x" })),
            &[],
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    app.signup("bob").await;
    let reply = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": "bob", "password": "wrong" })),
            &[],
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn requests_without_session_are_unauthorized() {
    let app = setup();
    let reply = app
        .send(Method::GET, "/api/user/me", None, None, &[])
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.json()["error"].is_string());

    let reply = app.get("/api/user/me", "tipstream_session=bogus").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tags_are_listed_without_a_session() {
    let app = setup();
    let reply = app.send(Method::GET, "/api/tag", None, None, &[]).await;
    assert_eq!(reply.status, StatusCode::OK);

    let body = reply.json();
    let tags = body["tags"].as_array().unwrap();
    assert!(!tags.is_empty());
    assert!(tags[0]["id"].is_i64());
    assert!(tags[0]["name"].is_string());
}

#[tokio::test]
async fn moderation_hides_matches_and_blocks_new_ones() {
    let app = setup();
    let streamer = app.signup("streamer").await;
    let viewer = app.signup("viewer").await;
    let stream = app.create_livestream(&streamer, "launch").await;

    for text in ["hello world", "spam here", "clean"] {
        assert_eq!(
            app.comment(&viewer, stream, text, 0).await.status,
            StatusCode::CREATED
        );
    }

    let reply = app
        .post(
            &format!("/api/livestream/{}/moderate", stream),
            &streamer,
            json!({ "ng_word": "spam" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert!(reply.json()["word_id"].as_i64().unwrap() > 0);

    let list = app
        .get(&format!("/api/livestream/{}/livecomment", stream), &viewer)
        .await
        .json();
    let texts: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["comment"].as_str().unwrap())
        .collect();
    assert_eq!(texts.len(), 2);
    assert!(!texts.contains(&"spam here"));

    let rejected = app.comment(&viewer, stream, "more spam", 10).await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);

    let words = app
        .get(&format!("/api/livestream/{}/ngwords", stream), &streamer)
        .await
        .json();
    assert_eq!(words[0]["word"], "spam");
}

#[tokio::test]
async fn moderate_distinguishes_forbidden_missing_and_malformed() {
    let app = setup();
    let streamer = app.signup("streamer").await;
    let intruder = app.signup("intruder").await;
    let stream = app.create_livestream(&streamer, "launch").await;

    let forbidden = app
        .post(
            &format!("/api/livestream/{}/moderate", stream),
            &intruder,
            json!({ "word": "x" }),
        )
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let missing = app
        .post("/api/livestream/9999/moderate", &streamer, json!({ "word": "x" }))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let malformed = app
        .post("/api/livestream/abc/moderate", &streamer, json!({ "word": "x" }))
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        malformed.json()["error"],
        "livestream_id in path must be integer"
    );
}

#[tokio::test]
async fn statistics_reflect_hidden_tips() {
    let app = setup();
    let streamer = app.signup("streamer").await;
    let viewer = app.signup("viewer").await;
    let stream = app.create_livestream(&streamer, "launch").await;

    let enter = app
        .post(&format!("/api/livestream/{}/enter", stream), &viewer, json!({}))
        .await;
    assert_eq!(enter.status, StatusCode::OK);
    for emoji in ["😂", "😂", "👍"] {
        let reply = app
            .post(
                &format!("/api/livestream/{}/reaction", stream),
                &viewer,
                json!({ "emoji_name": emoji }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }
    app.comment(&viewer, stream, "thanks", 100).await;
    app.comment(&viewer, stream, "buy followers", 50).await;

    app.post(
        &format!("/api/livestream/{}/moderate", stream),
        &streamer,
        json!({ "word": "followers" }),
    )
    .await;

    let stats = app
        .get(&format!("/api/statistics/livestream/{}", stream), &viewer)
        .await;
    assert_eq!(stats.status, StatusCode::OK);
    let stats = stats.json();
    assert_eq!(stats["rank"], 1);
    assert_eq!(stats["viewers_count"], 1);
    assert_eq!(stats["max_tip"], 100);
    assert_eq!(stats["total_reactions"], 3);
    assert_eq!(stats["total_reports"], 0);

    let stats = app.get("/api/statistics/user/streamer", &viewer).await.json();
    assert_eq!(stats["rank"], 1);
    assert_eq!(stats["total_livecomments"], 1);
    assert_eq!(stats["total_tip"], 100);
    assert_eq!(stats["favorite_emoji"], "😂");

    let missing = app.get("/api/statistics/user/ghost", &viewer).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    // Payment totals count hidden comments too
    let payment = app.get("/api/payment", &viewer).await.json();
    assert_eq!(payment["total_tip"], 150);
}

#[tokio::test]
async fn reports_are_visible_to_the_owner_only() {
    let app = setup();
    let streamer = app.signup("streamer").await;
    let viewer = app.signup("viewer").await;
    let stream = app.create_livestream(&streamer, "launch").await;
    let comment = app.comment(&viewer, stream, "rude", 0).await.json();
    let comment_id = comment["id"].as_i64().unwrap();

    let report = app
        .post(
            &format!("/api/livestream/{}/livecomment/{}/report", stream, comment_id),
            &viewer,
            json!({}),
        )
        .await;
    assert_eq!(report.status, StatusCode::CREATED);
    assert_eq!(report.json()["livecomment"]["comment"], "rude");

    let forbidden = app
        .get(&format!("/api/livestream/{}/report", stream), &viewer)
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let reports = app
        .get(&format!("/api/livestream/{}/report", stream), &streamer)
        .await
        .json();
    assert_eq!(reports.as_array().unwrap().len(), 1);
    assert_eq!(reports[0]["reporter"]["name"], "viewer");
}

#[tokio::test]
async fn icon_etag_short_circuits_with_304() {
    let app = setup();
    let cookie = app.signup("alice").await;

    // No upload yet: fallback image under the fallback digest
    let fallback = app.get("/api/user/alice/icon", &cookie).await;
    assert_eq!(fallback.status, StatusCode::OK);
    assert_eq!(&fallback.body[..], FALLBACK);

    let image = b"\x89PNG fake image bytes";
    let encoded = base64::engine::general_purpose::STANDARD.encode(image);
    let upload = app
        .post("/api/icon", &cookie, json!({ "image": encoded }))
        .await;
    assert_eq!(upload.status, StatusCode::CREATED);

    let served = app.get("/api/user/alice/icon", &cookie).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(&served.body[..], &image[..]);
    let etag = served.headers[header::ETAG].to_str().unwrap().to_string();
    assert_eq!(etag, format!("\"{}\"", icon_hash(image)));

    let cached = app
        .send(
            Method::GET,
            "/api/user/alice/icon",
            Some(&cookie),
            None,
            &[(header::IF_NONE_MATCH, etag.as_str())],
        )
        .await;
    assert_eq!(cached.status, StatusCode::NOT_MODIFIED);
    assert!(cached.body.is_empty());

    let stale = app
        .send(
            Method::GET,
            "/api/user/alice/icon",
            Some(&cookie),
            None,
            &[(header::IF_NONE_MATCH, "\"deadbeef\"")],
        )
        .await;
    assert_eq!(stale.status, StatusCode::OK);

    let me = app.get("/api/user/me", &cookie).await.json();
    assert_eq!(me["icon_hash"], icon_hash(image));
}

#[tokio::test]
async fn list_limit_must_be_a_non_negative_integer() {
    let app = setup();
    let cookie = app.signup("alice").await;
    let stream = app.create_livestream(&cookie, "launch").await;
    for i in 0..3 {
        app.comment(&cookie, stream, &format!("comment {}", i), 0).await;
    }

    let limited = app
        .get(&format!("/api/livestream/{}/livecomment?limit=2", stream), &cookie)
        .await;
    assert_eq!(limited.json().as_array().unwrap().len(), 2);

    let negative = app
        .get(&format!("/api/livestream/{}/reaction?limit=-1", stream), &cookie)
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);
}
