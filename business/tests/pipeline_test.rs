//! Pipeline behaviour against the scripted transport: ordering, progress,
//! correlation and cancellation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{local_file, mentions, mock_ctx, notice_referencing, progress_of};
use takedown_business::{
    Action, Call, FileEntity, FileId, FileRecord, FileStatus, MockTransport, ScriptedUpload,
    TakedownCtx, TakedownNotice, TransportError, metadata_path,
};
use tokio::sync::Notify;

/// Yields to spawned tasks until `done` holds for the current snapshot.
async fn settle_until(ctx: &TakedownCtx, done: impl Fn(&TakedownCtx) -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !done(ctx) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition never reached");
}

#[tokio::test]
async fn test_batch_marks_every_file_uploading_before_responses() {
    let (gate_a, gate_b) = (Arc::new(Notify::new()), Arc::new(Notify::new()));
    let transport = Arc::new(
        MockTransport::new()
            .with_upload("a.txt", ScriptedUpload::succeeds(1).gated(gate_a.clone()))
            .with_upload("b.txt", ScriptedUpload::succeeds(2).gated(gate_b.clone())),
    );
    let mut ctx = mock_ctx(&transport, Some("t0k"));
    let (a, b) = (local_file("a.txt", 8), local_file("b.txt", 8));

    ctx.dispatch(Action::AddFiles(vec![a.clone(), b.clone()]));

    let state = ctx.snapshot();
    assert_eq!(state.file(&a.id).and_then(FileEntity::progress), Some(0));
    assert_eq!(state.file(&b.id).and_then(FileEntity::progress), Some(0));
    assert!(transport.calls().is_empty());

    // complete in reverse order
    gate_b.notify_one();
    gate_a.notify_one();
    ctx.run_until_idle().await.unwrap();

    let state = ctx.snapshot();
    assert_eq!(
        state.draft.file_ids(),
        &[FileId::Server(1), FileId::Server(2)]
    );
    assert!(
        state
            .files
            .values()
            .all(|file| file.status == FileStatus::Uploaded)
    );
    for call in transport.calls() {
        match call {
            Call::Upload {
                token,
                content_type,
                len,
                ..
            } => {
                assert_eq!(token, "t0k");
                assert_eq!(content_type, "text/plain");
                assert_eq!(len, 8);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_progress_is_truncated_and_monotonic() {
    let transport = Arc::new(MockTransport::new().with_upload(
        "a.txt",
        ScriptedUpload::succeeds(5).with_progress(&[
            (1, 3),
            (2, 3),
            (2, 3),
            (0, 0),
            (1, 3),
            (3, 3),
        ]),
    ));
    let mut ctx = mock_ctx(&transport, Some("t0k"));
    let events = ctx.subscribe();
    let a = local_file("a.txt", 3);

    ctx.dispatch(Action::AddFile(a.clone()));
    ctx.run_until_idle().await.unwrap();

    let events: Vec<_> = events.try_iter().collect();
    assert_eq!(progress_of(&events, a.id), vec![0, 33, 66, 66, 66, 100]);
}

#[tokio::test]
async fn test_every_progress_report_is_emitted() {
    let transport = Arc::new(MockTransport::new().with_upload(
        "d.txt",
        ScriptedUpload::succeeds(6).with_progress(&[(1, 4), (1, 4), (2, 4)]),
    ));
    let mut ctx = mock_ctx(&transport, None);
    let events = ctx.subscribe();
    let d = local_file("d.txt", 4);

    ctx.dispatch(Action::AddFile(d.clone()));
    ctx.run_until_idle().await.unwrap();

    let events: Vec<_> = events.try_iter().collect();
    assert_eq!(progress_of(&events, d.id), vec![0, 25, 25, 50]);
}

#[tokio::test]
async fn test_correlation_keeps_document_order() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(
        MockTransport::new()
            .with_upload("b.txt", ScriptedUpload::succeeds(20).gated(gate.clone()))
            .with_upload("c.txt", ScriptedUpload::fails(500)),
    );
    let mut ctx = mock_ctx(&transport, None);
    let (a, b, c) = (
        local_file("a.txt", 1),
        local_file("b.txt", 1),
        local_file("c.txt", 1),
    );

    // `a` has no script, so the transport answers 404
    ctx.dispatch(Action::AddFiles(vec![a.clone(), b.clone(), c.clone()]));
    gate.notify_one();
    ctx.run_until_idle().await.unwrap();

    let state = ctx.snapshot();
    assert_eq!(
        state.draft.file_ids(),
        &[a.id, FileId::Server(20), c.id]
    );
    assert_eq!(
        state.file(&a.id).map(|f| f.status),
        Some(FileStatus::Error { error: 404 })
    );
    assert_eq!(
        state.file(&c.id).map(|f| f.status),
        Some(FileStatus::Error { error: 500 })
    );
}

#[tokio::test]
async fn test_correlation_miss_leaves_document_alone() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(
        MockTransport::new().with_upload("a.txt", ScriptedUpload::succeeds(3).gated(gate.clone())),
    );
    let mut ctx = mock_ctx(&transport, Some("t0k"));
    let events = ctx.subscribe();
    let a = local_file("a.txt", 1);

    ctx.dispatch(Action::AddFile(a.clone()));
    // the draft drops the reference while the upload is still running
    let detached = ctx
        .snapshot()
        .draft
        .with_file_detached(&a.id)
        .expect("draft references a");
    ctx.dispatch(Action::DocumentUpdated(detached.clone()));
    gate.notify_one();
    ctx.run_until_idle().await.unwrap();

    let state = ctx.snapshot();
    assert_eq!(state.draft, detached);
    assert!(state.file(&FileId::Server(3)).is_some());

    let events: Vec<_> = events.try_iter().collect();
    let swap = events
        .iter()
        .position(|e| matches!(e, Action::FileSwapped { .. }))
        .expect("swap emitted");
    assert!(
        !events[swap..]
            .iter()
            .any(|e| matches!(e, Action::DocumentUpdated(_)))
    );
}

#[tokio::test]
async fn test_cancel_mid_upload_leaves_sibling_running() {
    let (gate_a, gate_b) = (Arc::new(Notify::new()), Arc::new(Notify::new()));
    let transport = Arc::new(
        MockTransport::new()
            .with_upload(
                "a.txt",
                ScriptedUpload::succeeds(1)
                    .with_progress(&[(1, 4)])
                    .gated(gate_a.clone()),
            )
            .with_upload(
                "b.txt",
                ScriptedUpload::succeeds(2)
                    .with_progress(&[(1, 2)])
                    .gated(gate_b.clone()),
            ),
    );
    let mut ctx = mock_ctx(&transport, Some("t0k"));
    let events = ctx.subscribe();
    let (a, b) = (local_file("a.txt", 4), local_file("b.txt", 2));

    ctx.dispatch(Action::AddFiles(vec![a.clone(), b.clone()]));
    settle_until(&ctx, |ctx| {
        ctx.snapshot().file(&a.id).and_then(FileEntity::progress) == Some(25)
    })
    .await;

    let in_flight = ctx.snapshot().file(&a.id).cloned().expect("a is uploading");
    ctx.dispatch(Action::DeleteFile(in_flight));
    gate_a.notify_one();
    gate_b.notify_one();
    ctx.run_until_idle().await.unwrap();

    let state = ctx.snapshot();
    assert!(state.file(&a.id).is_none());
    assert!(state.file(&FileId::Server(1)).is_none());
    assert_eq!(state.draft.file_ids(), &[FileId::Server(2)]);

    let events: Vec<_> = events.try_iter().collect();
    let deleted = events
        .iter()
        .position(|e| matches!(e, Action::DeleteFile(_)))
        .expect("delete routed");
    assert!(
        !events[deleted + 1..].iter().any(|e| mentions(e, a.id)),
        "events for a after its delete"
    );
    assert_eq!(progress_of(&events, b.id), vec![0, 50]);
    // a temporary id never reaches the delete endpoint
    assert!(
        transport
            .calls()
            .iter()
            .all(|call| matches!(call, Call::Upload { .. }))
    );
}

#[tokio::test]
async fn test_delete_before_upload_starts_sends_nothing() {
    let transport = Arc::new(MockTransport::new().with_upload("a.txt", ScriptedUpload::succeeds(1)));
    let mut ctx = mock_ctx(&transport, Some("t0k"));
    let a = local_file("a.txt", 1);

    ctx.dispatch(Action::AddFile(a.clone()));
    ctx.dispatch(Action::DeleteFile(a.clone()));
    ctx.run_until_idle().await.unwrap();

    assert!(transport.calls().is_empty());
    let state = ctx.snapshot();
    assert!(state.files.is_empty());
    assert!(state.draft.file_ids().is_empty());
}

#[tokio::test]
async fn test_file_without_payload_fails_locally() {
    let transport = Arc::new(MockTransport::new());
    let mut ctx = mock_ctx(&transport, Some("t0k"));
    let mut a = local_file("a.txt", 1);
    a.payload = None;

    ctx.dispatch(Action::AddFile(a.clone()));
    ctx.run_until_idle().await.unwrap();

    assert!(transport.calls().is_empty());
    assert_eq!(
        ctx.snapshot().file(&a.id).map(|f| f.status),
        Some(FileStatus::Error { error: 0 })
    );
}

#[tokio::test]
async fn test_missing_token_is_sent_empty() {
    let transport = Arc::new(MockTransport::new().with_upload("a.txt", ScriptedUpload::succeeds(1)));
    let mut ctx = mock_ctx(&transport, None);

    ctx.dispatch(Action::AddFile(local_file("a.txt", 1)));
    ctx.run_until_idle().await.unwrap();

    assert!(matches!(
        transport.calls().as_slice(),
        [Call::Upload { token, .. }] if token.is_empty()
    ));
}

#[tokio::test]
async fn test_server_delete_reports_error() {
    let transport = Arc::new(MockTransport::new().with_delete(
        9,
        Err(TransportError::Network("connection reset".to_owned())),
    ));
    let mut ctx = mock_ctx(&transport, Some("t0k"));
    let stored = FileEntity::failed_placeholder(FileId::Server(9), 0);

    ctx.dispatch(Action::FileAdded(stored.clone()));
    ctx.dispatch(Action::DeleteFile(stored.clone()));
    ctx.run_until_idle().await.unwrap();

    assert_eq!(
        transport.calls(),
        vec![Call::Delete {
            path: "/file/9".to_owned(),
            token: "t0k".to_owned(),
        }]
    );
    let state = ctx.snapshot();
    assert!(state.file(&stored.id).is_some());
    assert_eq!(
        state.last_delete_error.as_ref().map(|f| f.error.status()),
        Some(0)
    );
}

#[tokio::test]
async fn test_fetch_skips_temporary_ids_and_deduplicates() {
    let transport = Arc::new(MockTransport::new().with_fetch(
        42,
        Ok(FileRecord {
            id: 42,
            name: "evidence.png".to_owned(),
            content_type: Some("image/png".to_owned()),
            size: Some(10),
        }),
    ));
    let mut ctx = mock_ctx(&transport, Some("t0k"));
    let temporary = FileId::temporary();

    ctx.dispatch(Action::NoticesAdded(vec![
        notice_referencing(&[FileId::Server(42), temporary]),
        notice_referencing(&[FileId::Server(7), FileId::Server(42)]),
    ]));
    ctx.run_until_idle().await.unwrap();

    assert_eq!(transport.call_count(&metadata_path(42)), 1);
    assert_eq!(transport.call_count(&metadata_path(7)), 1);
    assert_eq!(transport.calls().len(), 2);

    let state = ctx.snapshot();
    assert!(state.file(&temporary).is_none());
    assert_eq!(
        state.file(&FileId::Server(7)).map(|f| f.status),
        Some(FileStatus::Error { error: 404 })
    );
    assert_eq!(
        state.file(&FileId::Server(42)).map(|f| f.status),
        Some(FileStatus::Uploaded)
    );
}

#[tokio::test]
async fn test_single_notice_without_dmca_fetches_nothing() {
    let transport = Arc::new(MockTransport::new());
    let mut ctx = mock_ctx(&transport, Some("t0k"));

    ctx.dispatch(Action::NoticeAdded(TakedownNotice::default()));
    ctx.run_until_idle().await.unwrap();

    assert!(transport.calls().is_empty());
    assert_eq!(ctx.snapshot().notices.len(), 1);
}
