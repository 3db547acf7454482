//! Post fixtures and mock media servers

use chrono::TimeZone;
use feed_archiver::Post;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A tiny body served as `image/png`
pub const PNG_BODY: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";

/// A tiny body served as `image/jpeg`
pub const JPEG_BODY: &[u8] = b"\xff\xd8\xff\xe0not really a jpeg";

/// The canonical example post: `abc` by `alice` in `pics`, dated 1970-01-01
pub fn example_post(url: impl Into<String>) -> Post {
    PostBuilder::new("abc", url)
        .author("alice")
        .title("hello")
        .category("pics")
        .epoch()
        .build()
}

/// Builder for feed posts
pub struct PostBuilder {
    post: Post,
}

impl PostBuilder {
    /// Post with an id and a link, authored by `alice`
    pub fn new(id: &str, url: impl Into<String>) -> Self {
        Self {
            post: Post {
                id: id.to_string(),
                author: "alice".to_string(),
                created_at: None,
                title: None,
                category: None,
                url: url.into(),
                permalink: Some(format!("https://www.reddit.com/comments/{id}")),
                is_sticky: false,
                is_text_only: false,
                is_nsfw: false,
                score: 1,
            },
        }
    }

    pub fn author(mut self, author: &str) -> Self {
        self.post.author = author.to_string();
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.post.title = Some(title.to_string());
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.post.category = Some(category.to_string());
        self
    }

    /// Date the post 1970-01-01
    pub fn epoch(mut self) -> Self {
        self.post.created_at = chrono::Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).single();
        self
    }

    pub fn sticky(mut self) -> Self {
        self.post.is_sticky = true;
        self
    }

    pub fn nsfw(mut self) -> Self {
        self.post.is_nsfw = true;
        self
    }

    pub fn score(mut self, score: i64) -> Self {
        self.post.score = score;
        self
    }

    pub fn build(self) -> Post {
        self.post
    }
}

/// Serve `body` with `content_type` at `route`
pub async fn serve(server: &MockServer, route: &str, body: &[u8], content_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), content_type))
        .mount(server)
        .await;
}

/// Serve `body` with `content_type` at `route`, expecting exactly `hits` requests
pub async fn serve_expecting(
    server: &MockServer,
    route: &str,
    body: &[u8],
    content_type: &str,
    hits: u64,
) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), content_type))
        .expect(hits)
        .mount(server)
        .await;
}

/// Serve `body` with `content_type` at `route` for the first request only;
/// later requests fall through to whatever is mounted after
pub async fn serve_once(server: &MockServer, route: &str, body: &[u8], content_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), content_type))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

/// Answer `route` with a bare status code
pub async fn respond_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Redirect `route` to `location` (which may be relative)
pub async fn redirect(server: &MockServer, route: &str, location: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", location))
        .mount(server)
        .await;
}

/// Absolute URL of `route` on `server`
pub fn url_of(server: &MockServer, route: &str) -> String {
    format!("{}{}", server.uri(), route)
}
