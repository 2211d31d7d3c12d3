#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use quill_api::{
    config::Settings,
    server::{self, ServerState},
};
use quill_common::model::{
    auth::{AuthToken, Authentication, TokenLifetime},
    group::{CreateGroup, Group, GroupSlug, GroupTitle},
    post::{CreatePost, Post, PostContent, PostText},
    user::{CreateUser, User, Username},
};
use quill_db::{PostFilter, Store, memory::MemoryStore};
use serde_json::Value;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

const JSON: &str = "application/json";
const URLENCODED: &str = "application/x-www-form-urlencoded";

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    router: Router,
}

pub struct Reply {
    pub status: StatusCode,
    pub location: Option<String>,
    pub json: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn Store> = store.clone();
        let router = server::app(ServerState::new(shared, Settings::default()));

        Self { store, router }
    }

    pub async fn user(&self, username: &str) -> User {
        let username = Username::new(username.to_owned()).expect("valid username");
        self.store
            .create_user(&CreateUser { username })
            .await
            .expect("user should be created")
    }

    /// Bearer token that authenticates as `user`.
    pub async fn login(&self, user: &User) -> String {
        let token = AuthToken::generate_random(user.id);
        let authentication = Authentication::for_token(&token, OffsetDateTime::now_utc(), None)
            .expect("token should hash");
        self.store
            .create_authentication(&authentication)
            .await
            .expect("authentication should be stored");

        token.as_token_str()
    }

    /// Bearer token whose authentication lapsed an hour ago.
    pub async fn login_expired(&self, user: &User) -> String {
        let token = AuthToken::generate_random(user.id);
        let lifetime = TokenLifetime::new(Duration::hours(1));
        let created_at = OffsetDateTime::now_utc() - Duration::hours(2);
        let authentication = Authentication::for_token(&token, created_at, lifetime)
            .expect("token should hash");
        self.store
            .create_authentication(&authentication)
            .await
            .expect("authentication should be stored");

        token.as_token_str()
    }

    pub async fn group(&self, slug: &str) -> Group {
        let group = CreateGroup {
            title: GroupTitle::new(format!("Group {slug}")).expect("valid title"),
            slug: GroupSlug::new(slug.to_owned()).expect("valid slug"),
            description: format!("All about {slug}"),
        };
        self.store
            .create_group(&group)
            .await
            .expect("group should be created")
    }

    pub async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        let post = CreatePost {
            author: author.id,
            content: PostContent {
                text: PostText::new(text).expect("non-blank text"),
                group: group.map(|group| group.id),
            },
        };
        self.store
            .create_post(&post)
            .await
            .expect("post should be created")
    }

    pub async fn stored_post(&self, post: &Post) -> Post {
        self.store
            .fetch_post(post.id)
            .await
            .expect("lookup should succeed")
            .expect("post should still exist")
    }

    pub async fn post_count(&self) -> u64 {
        self.store
            .count_posts(PostFilter::All)
            .await
            .expect("count should succeed")
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
        self.send(Method::GET, uri, token, JSON, Body::empty()).await
    }

    pub async fn submit(&self, uri: &str, token: Option<&str>, form: &Value) -> Reply {
        let body = Body::from(serde_json::to_vec(form).expect("form serializes"));
        self.send(Method::POST, uri, token, JSON, body).await
    }

    /// Post `body` the way an HTML form does.
    pub async fn submit_urlencoded(&self, uri: &str, token: Option<&str>, body: &str) -> Reply {
        let body = Body::from(body.to_owned());
        self.send(Method::POST, uri, token, URLENCODED, body).await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        content_type: &str,
        body: Body,
    ) -> Reply {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = request.body(body).expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        Reply::read(response).await
    }
}

impl Reply {
    async fn read(response: Response) -> Self {
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should be readable")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };

        Self {
            status,
            location,
            json,
        }
    }

    pub fn view(&self) -> &str {
        self.json["view"].as_str().unwrap_or_default()
    }

    pub fn context(&self) -> &Value {
        &self.json["context"]
    }

    /// Texts of the posts on the rendered page, in order.
    pub fn page_texts(&self) -> Vec<String> {
        self.context()["page_obj"]["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["text"].as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }
}
