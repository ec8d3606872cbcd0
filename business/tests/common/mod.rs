//! Shared helpers for the business integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use flume::Receiver;
use takedown_business::{
    Action, BusinessConfig, Dmca, FileEntity, FileId, MockTransport, Payload, TakedownCtx,
    TakedownNotice, build_http_state_ctx, build_state_ctx,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

pub const TEST_TOKEN: &str = "test_token";

/// A mock server plus a context whose transport talks to it.
pub struct TestContext {
    pub mock_server: MockServer,
    pub ctx: TakedownCtx,
    pub events: Receiver<Action>,
}

impl TestContext {
    pub async fn new() -> Self {
        let mock_server = MockServer::start().await;
        let config = BusinessConfig::new(mock_server.uri()).with_token(TEST_TOKEN);
        let mut ctx = build_http_state_ctx(&config);
        let events = ctx.subscribe();

        Self {
            mock_server,
            ctx,
            events,
        }
    }

    /// Routes everything queued and waits for every spawned request.
    pub async fn flush_and_wait(&mut self) {
        self.ctx
            .run_until_idle()
            .await
            .expect("pipelines should settle");
    }

    pub fn drain_events(&self) -> Vec<Action> {
        self.events.try_iter().collect()
    }

    pub async fn mock_upload(&self, name: &str, content_type: &str, id: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/api/file/{name}")))
            .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
            .and(header("Content-Type", content_type))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": id,
                "name": name,
                "type": content_type,
            })))
            .expect(1)
            .mount(&self.mock_server)
            .await;
    }

    pub async fn mock_upload_error(&self, name: &str, status: u16) {
        Mock::given(method("POST"))
            .and(path(format!("/api/file/{name}")))
            .respond_with(ResponseTemplate::new(status).set_body_string("rejected"))
            .expect(1)
            .mount(&self.mock_server)
            .await;
    }

    pub async fn mock_delete(&self, id: u64, status: u16) {
        Mock::given(method("DELETE"))
            .and(path(format!("/api/file/{id}")))
            .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&self.mock_server)
            .await;
    }

    pub async fn mock_metadata(&self, id: u64, name: &str, content_type: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/file/{id}")))
            .and(query_param("metadata", ""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": id,
                "name": name,
                "type": content_type,
                "size": 1024,
            })))
            .expect(1)
            .mount(&self.mock_server)
            .await;
    }

    pub async fn mock_metadata_error(&self, id: u64, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/api/file/{id}")))
            .and(query_param("metadata", ""))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&self.mock_server)
            .await;
    }
}

/// A context over a scripted transport, with `token` as the session token.
pub fn mock_ctx(transport: &Arc<MockTransport>, token: Option<&str>) -> TakedownCtx {
    let mut config = BusinessConfig::default();
    config.token = token.map(str::to_owned);
    build_state_ctx(transport.clone(), &config)
}

pub fn local_file(name: &str, len: usize) -> FileEntity {
    FileEntity::local(name, Payload::new(vec![b'x'; len], "text/plain"))
}

pub fn notice_referencing(ids: &[FileId]) -> TakedownNotice {
    TakedownNotice::default().with_dmca(Dmca {
        subject: Some("Unauthorised copy".to_owned()),
        file_ids: ids.iter().copied().collect(),
        ..Dmca::default()
    })
}

/// Progress values emitted for `id`, in order.
pub fn progress_of(events: &[Action], id: FileId) -> Vec<u8> {
    events
        .iter()
        .filter_map(|action| match action {
            Action::FileUpdated(file) if file.id == id => file.progress(),
            _ => None,
        })
        .collect()
}

/// Whether `action` carries anything about file `id`.
pub fn mentions(action: &Action, id: FileId) -> bool {
    match action {
        Action::AddFile(file)
        | Action::DeleteFile(file)
        | Action::FileUpdated(file)
        | Action::FileAdded(file)
        | Action::DeleteComplete(file)
        | Action::DeleteError { file, .. } => file.id == id,
        Action::AddFiles(files) => files.iter().any(|file| file.id == id),
        Action::FileSwapped { previous, next } => previous.id == id || next.id == id,
        Action::DocumentUpdated(notice) => notice.references(&id),
        Action::NoticeAdded(_) | Action::NoticesAdded(_) | Action::TokenSet(_) => false,
    }
}
