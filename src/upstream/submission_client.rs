//! HTTP lookups against the submission service's internal item endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{FetchOutcome, UpstreamFailure, UpstreamSource};
use crate::domain::item_event::{parse_timestamp, require_text};
use crate::domain::{CatalogEntry, EntryId};

/// Path prefix of the submission service's item lookup endpoint.
pub const ITEM_LOOKUP_PATH: &str = "/api/internal/papers";

/// Item payload returned by the submission service.
#[derive(Debug, Deserialize)]
struct SubmissionItem {
    id: uuid::Uuid,
    title: String,
    author: String,
    #[serde(default, rename = "abstractText", alias = "abstract_text")]
    abstract_text: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "createdAt", alias = "created_at")]
    created_at: Option<String>,
}

impl SubmissionItem {
    /// Validates the payload answered for `requested` and converts it.
    ///
    /// The payload must describe the requested item and carry a non-blank
    /// title and author, the same rule events are held to.
    fn into_entry(self, requested: EntryId) -> Result<CatalogEntry, UpstreamFailure> {
        let id = EntryId::from_uuid(self.id);
        if id != requested {
            return Err(UpstreamFailure::Decode(format!(
                "payload id {id} does not match requested id {requested}"
            )));
        }
        require_text(&self.title, &self.author)
            .map_err(|e| UpstreamFailure::Decode(e.to_string()))?;

        Ok(CatalogEntry {
            id,
            title: self.title,
            author: self.author,
            abstract_text: self.abstract_text,
            status: self.status,
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
            synced_at: None,
        })
    }
}

/// [`UpstreamSource`] backed by `reqwest`.
///
/// `GET {base_url}/api/internal/papers/{id}`: 2xx decodes to
/// [`FetchOutcome::Found`], 404 is [`FetchOutcome::Absent`], everything else
/// (other statuses, transport errors, bad bodies) is a
/// [`FetchOutcome::Failure`].
#[derive(Debug, Clone)]
pub struct HttpSubmissionSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSubmissionSource {
    /// Creates a source for the given base URL with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`reqwest::Error`] if the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Creates a source that reuses an existing client.
    #[must_use]
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Returns the lookup URL for `id`.
    #[must_use]
    pub fn item_url(&self, id: EntryId) -> String {
        format!("{}{ITEM_LOOKUP_PATH}/{id}", self.base_url)
    }
}

#[async_trait]
impl UpstreamSource for HttpSubmissionSource {
    async fn fetch(&self, id: EntryId) -> FetchOutcome {
        let response = match self.client.get(self.item_url(id)).send().await {
            Ok(response) => response,
            Err(err) => return FetchOutcome::Failure(UpstreamFailure::Transport(err.to_string())),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return FetchOutcome::Absent;
        }
        if !status.is_success() {
            return FetchOutcome::Failure(UpstreamFailure::Status(status.as_u16()));
        }

        let decoded = match response.json::<SubmissionItem>().await {
            Ok(item) => item.into_entry(id),
            Err(err) => Err(UpstreamFailure::Decode(err.to_string())),
        };
        match decoded {
            Ok(entry) => FetchOutcome::Found(entry),
            Err(failure) => {
                tracing::warn!(%id, error = %failure, "rejected upstream payload");
                FetchOutcome::Failure(failure)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use serde_json::json;

    const KNOWN: &str = "11111111-1111-1111-1111-111111111111";
    const BROKEN: &str = "22222222-2222-2222-2222-222222222222";
    const GARBLED: &str = "33333333-3333-3333-3333-333333333333";
    const MISMATCHED: &str = "44444444-4444-4444-4444-444444444444";
    const UNTITLED: &str = "55555555-5555-5555-5555-555555555555";
    const ANONYMOUS: &str = "66666666-6666-6666-6666-666666666666";

    async fn item(Path(id): Path<String>) -> axum::response::Response {
        match id.as_str() {
            KNOWN => axum::Json(json!({
                "id": KNOWN,
                "title": "A",
                "author": "B",
                "abstractText": "about",
                "status": "SUBMITTED",
                "createdAt": "2024-03-05T10:00:00Z",
            }))
            .into_response(),
            BROKEN => AxumStatus::INTERNAL_SERVER_ERROR.into_response(),
            GARBLED => axum::Json(json!({"unexpected": true})).into_response(),
            MISMATCHED => axum::Json(json!({"id": KNOWN, "title": "A", "author": "B"}))
                .into_response(),
            UNTITLED => axum::Json(json!({"id": UNTITLED, "title": "", "author": "B"}))
                .into_response(),
            ANONYMOUS => axum::Json(json!({"id": ANONYMOUS, "title": "A", "author": "  "}))
                .into_response(),
            _ => AxumStatus::NOT_FOUND.into_response(),
        }
    }

    async fn start_upstream() -> String {
        let app = Router::new().route("/api/internal/papers/{id}", get(item));
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}/")
    }

    fn source(base: &str) -> HttpSubmissionSource {
        let Ok(source) = HttpSubmissionSource::new(base, Duration::from_secs(2)) else {
            panic!("client build failed");
        };
        source
    }

    fn id(raw: &str) -> EntryId {
        let Ok(id) = EntryId::parse(raw) else {
            panic!("valid id");
        };
        id
    }

    #[test]
    fn item_url_strips_trailing_slash() {
        let source = source("http://submission:8081/");
        assert_eq!(
            source.item_url(id(KNOWN)),
            format!("http://submission:8081/api/internal/papers/{KNOWN}")
        );
    }

    #[tokio::test]
    async fn found_item_is_decoded() {
        let base = start_upstream().await;
        let FetchOutcome::Found(entry) = source(&base).fetch(id(KNOWN)).await else {
            panic!("expected found");
        };
        assert_eq!(entry.title, "A");
        assert_eq!(entry.abstract_text.as_deref(), Some("about"));
        assert!(entry.created_at.is_some());
        assert!(entry.synced_at.is_none());
    }

    #[tokio::test]
    async fn not_found_is_absent() {
        let base = start_upstream().await;
        let outcome = source(&base).fetch(EntryId::random()).await;
        assert_eq!(outcome, FetchOutcome::Absent);
    }

    #[tokio::test]
    async fn server_error_is_failure() {
        let base = start_upstream().await;
        let outcome = source(&base).fetch(id(BROKEN)).await;
        assert_eq!(outcome, FetchOutcome::Failure(UpstreamFailure::Status(500)));
    }

    #[tokio::test]
    async fn undecodable_body_is_failure() {
        let base = start_upstream().await;
        let outcome = source(&base).fetch(id(GARBLED)).await;
        assert!(matches!(
            outcome,
            FetchOutcome::Failure(UpstreamFailure::Decode(_))
        ));
    }

    #[tokio::test]
    async fn payload_for_another_item_is_decode_failure() {
        let base = start_upstream().await;
        let outcome = source(&base).fetch(id(MISMATCHED)).await;
        let FetchOutcome::Failure(UpstreamFailure::Decode(reason)) = outcome else {
            panic!("expected decode failure");
        };
        assert!(reason.contains(MISMATCHED));
    }

    #[tokio::test]
    async fn blank_title_or_author_is_decode_failure() {
        let base = start_upstream().await;
        let source = source(&base);
        for raw in [UNTITLED, ANONYMOUS] {
            let outcome = source.fetch(id(raw)).await;
            assert!(
                matches!(outcome, FetchOutcome::Failure(UpstreamFailure::Decode(_))),
                "{raw}: {outcome:?}"
            );
        }
    }

    #[tokio::test]
    async fn unreachable_upstream_is_transport_failure() {
        // Bind then drop to get a port nothing listens on.
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        drop(listener);

        let outcome = source(&format!("http://{addr}")).fetch(EntryId::random()).await;
        assert!(matches!(
            outcome,
            FetchOutcome::Failure(UpstreamFailure::Transport(_))
        ));
    }
}
