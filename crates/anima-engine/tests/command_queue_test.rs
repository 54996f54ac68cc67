// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anima_core::{
    ArtboardHandle, CommandSink, FileHandle, NativeAddress, NativeBridge, RequestId,
};
use anima_engine::{CommandQueue, QueueError, QueueScope};

const RENDER_CONTEXT: NativeAddress = NativeAddress(0xC0DE);
const QUEUE_ADDRESS: NativeAddress = NativeAddress(0xAB1E);
const LISTENERS_ADDRESS: NativeAddress = NativeAddress(0x11F7);

/// Everything the queue hands to the native side, observable by the test.
#[derive(Debug)]
enum IssuedCommand {
    LoadFile {
        request: RequestId,
        bytes: Vec<u8>,
    },
    DeleteFile {
        request: RequestId,
        file: FileHandle,
    },
    LoadArtboard {
        request: RequestId,
        file: FileHandle,
        name: String,
    },
    DeleteArtboard {
        request: RequestId,
        artboard: ArtboardHandle,
    },
    Destroy {
        queue: NativeAddress,
    },
}

/// Test double for the native runtime: records every outbound command on a
/// channel and captures the registered callback sink so tests can play the
/// runtime's worker threads.
struct MockBridge {
    issued: flume::Sender<IssuedCommand>,
    sink: Mutex<Option<Arc<dyn CommandSink>>>,
    destroy_count: AtomicUsize,
}

impl MockBridge {
    fn new() -> (Arc<Self>, flume::Receiver<IssuedCommand>) {
        let (issued, commands) = flume::unbounded();
        (
            Arc::new(Self {
                issued,
                sink: Mutex::new(None),
                destroy_count: AtomicUsize::new(0),
            }),
            commands,
        )
    }

    fn sink(&self) -> Arc<dyn CommandSink> {
        self.sink
            .lock()
            .unwrap()
            .clone()
            .expect("create_listeners was never called")
    }

    fn destroy_count(&self) -> usize {
        self.destroy_count.load(Ordering::SeqCst)
    }
}

impl NativeBridge for MockBridge {
    fn construct(&self, render_context: NativeAddress) -> NativeAddress {
        assert_eq!(render_context, RENDER_CONTEXT);
        QUEUE_ADDRESS
    }

    fn destroy(&self, queue: NativeAddress) {
        self.destroy_count.fetch_add(1, Ordering::SeqCst);
        let _ = self.issued.send(IssuedCommand::Destroy { queue });
    }

    fn create_listeners(
        &self,
        queue: NativeAddress,
        sink: Arc<dyn CommandSink>,
    ) -> NativeAddress {
        assert_eq!(queue, QUEUE_ADDRESS);
        *self.sink.lock().unwrap() = Some(sink);
        LISTENERS_ADDRESS
    }

    fn load_file(&self, queue: NativeAddress, request: RequestId, bytes: Vec<u8>) {
        assert_eq!(queue, QUEUE_ADDRESS);
        let _ = self.issued.send(IssuedCommand::LoadFile { request, bytes });
    }

    fn delete_file(&self, queue: NativeAddress, request: RequestId, file: FileHandle) {
        assert_eq!(queue, QUEUE_ADDRESS);
        let _ = self.issued.send(IssuedCommand::DeleteFile { request, file });
    }

    fn load_artboard(
        &self,
        queue: NativeAddress,
        request: RequestId,
        file: FileHandle,
        name: &str,
    ) {
        assert_eq!(queue, QUEUE_ADDRESS);
        let _ = self.issued.send(IssuedCommand::LoadArtboard {
            request,
            file,
            name: name.to_string(),
        });
    }

    fn delete_artboard(&self, queue: NativeAddress, request: RequestId, artboard: ArtboardHandle) {
        assert_eq!(queue, QUEUE_ADDRESS);
        let _ = self
            .issued
            .send(IssuedCommand::DeleteArtboard { request, artboard });
    }
}

fn new_queue() -> (Arc<MockBridge>, flume::Receiver<IssuedCommand>, CommandQueue) {
    let (bridge, commands) = MockBridge::new();
    let queue = CommandQueue::new(bridge.clone(), RENDER_CONTEXT);
    (bridge, commands, queue)
}

#[test]
fn construction_starts_with_one_reference() {
    let (bridge, _commands, queue) = new_queue();
    assert_eq!(queue.ref_count(), 1);
    assert!(!queue.is_disposed());
    assert_eq!(bridge.destroy_count(), 0);
}

#[test]
fn clone_does_not_touch_the_reference_count() {
    let (_bridge, _commands, queue) = new_queue();
    let other = queue.clone();
    assert_eq!(queue.ref_count(), 1);
    drop(other);
    assert_eq!(queue.ref_count(), 1);
    assert!(!queue.is_disposed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn load_file_resolves_with_the_loaded_handle() -> Result<()> {
    let (bridge, commands, queue) = new_queue();

    let loader = tokio::spawn({
        let queue = queue.clone();
        async move { queue.load_file(vec![1, 2, 3]).await }
    });

    let IssuedCommand::LoadFile { request, bytes } = commands.recv_async().await? else {
        panic!("expected a load-file command");
    };
    assert_eq!(bytes, vec![1, 2, 3]);

    bridge.sink().on_file_loaded(request, FileHandle(0xF11E));

    assert_eq!(loader.await??, FileHandle(0xF11E));
    assert_eq!(queue.pending_requests(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn load_file_failure_carries_the_native_message() -> Result<()> {
    let (bridge, commands, queue) = new_queue();

    let loader = tokio::spawn({
        let queue = queue.clone();
        async move { queue.load_file(vec![0xFF]).await }
    });

    let IssuedCommand::LoadFile { request, .. } = commands.recv_async().await? else {
        panic!("expected a load-file command");
    };
    bridge
        .sink()
        .on_file_error(request, "malformed animation data".to_string());

    let err = loader.await?.expect_err("load must fail");
    match &err {
        QueueError::FileLoad { message } => assert!(message.contains("malformed animation data")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("malformed animation data"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequential_loads_get_strictly_increasing_ids() -> Result<()> {
    let (bridge, commands, queue) = new_queue();

    let first = tokio::spawn({
        let queue = queue.clone();
        async move { queue.load_file(vec![1]).await }
    });
    let IssuedCommand::LoadFile { request: id_one, .. } = commands.recv_async().await? else {
        panic!("expected a load-file command");
    };
    bridge.sink().on_file_loaded(id_one, FileHandle(1));
    first.await??;

    let second = tokio::spawn({
        let queue = queue.clone();
        async move { queue.load_file(vec![2]).await }
    });
    let IssuedCommand::LoadFile { request: id_two, .. } = commands.recv_async().await? else {
        panic!("expected a load-file command");
    };
    bridge.sink().on_file_loaded(id_two, FileHandle(2));
    second.await??;

    assert!(id_one < id_two);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interleaved_loads_resolve_only_their_own_outcome() -> Result<()> {
    let (bridge, commands, queue) = new_queue();

    let first = tokio::spawn({
        let queue = queue.clone();
        async move { queue.load_file(vec![1]).await }
    });
    let IssuedCommand::LoadFile { request: id_one, .. } = commands.recv_async().await? else {
        panic!("expected a load-file command");
    };

    let second = tokio::spawn({
        let queue = queue.clone();
        async move { queue.load_file(vec![2]).await }
    });
    let IssuedCommand::LoadFile { request: id_two, .. } = commands.recv_async().await? else {
        panic!("expected a load-file command");
    };
    assert!(id_one < id_two);

    // The runtime's workers answer out of issuance order, on their own
    // threads: the second request succeeds before the first one fails.
    let error_sink = bridge.sink();
    let success_sink = bridge.sink();
    let fail_first = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        error_sink.on_file_error(id_one, "not an animation file".to_string());
    });
    let complete_second = thread::spawn(move || {
        success_sink.on_file_loaded(id_two, FileHandle(22));
    });
    fail_first.join().expect("worker panicked");
    complete_second.join().expect("worker panicked");

    let err = first.await?.expect_err("first load must fail");
    assert!(matches!(err, QueueError::FileLoad { ref message } if message.contains("not an animation file")));
    assert_eq!(second.await??, FileHandle(22));
    Ok(())
}

#[test]
fn single_release_tears_down_exactly_once() {
    let (bridge, commands, queue) = new_queue();

    queue.release("creator", "done").expect("release");
    assert!(queue.is_disposed());
    assert_eq!(queue.ref_count(), 0);
    assert_eq!(bridge.destroy_count(), 1);
    assert!(matches!(
        commands.try_recv(),
        Ok(IssuedCommand::Destroy { queue: QUEUE_ADDRESS })
    ));

    // Everything after the teardown is an ownership error, and none of it
    // re-runs the teardown.
    assert!(queue.delete_file(FileHandle(1)).is_err());
    assert!(queue.acquire("late comer").is_err());
    let err = queue
        .release("creator", "again")
        .expect_err("double release must fail");
    assert!(err.to_string().contains("CommandQueue"));
    assert_eq!(bridge.destroy_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disposed_queue_rejects_new_loads() -> Result<()> {
    let (_bridge, _commands, queue) = new_queue();
    queue.release("creator", "done").expect("release");

    let err = queue.load_file(vec![1]).await.expect_err("must fail");
    assert!(matches!(err, QueueError::Ownership(_)));
    Ok(())
}

#[test]
fn scope_attach_detach_restores_the_reference_count() {
    let (bridge, _commands, queue) = new_queue();

    {
        let scope = QueueScope::bind(&queue, "preview panel").expect("bind");
        assert_eq!(scope.queue().ref_count(), 2);
        assert_eq!(bridge.destroy_count(), 0);
    }
    assert_eq!(queue.ref_count(), 1);
    assert!(!queue.is_disposed());

    queue.release("creator", "done").expect("release");
    assert_eq!(bridge.destroy_count(), 1);
}

#[test]
fn scope_as_last_owner_disposes_on_detach() {
    let (bridge, _commands, queue) = new_queue();

    let scope = QueueScope::bind(&queue, "preview panel").expect("bind");
    queue.release("creator", "handed off to the panel").expect("release");
    assert_eq!(queue.ref_count(), 1);
    assert_eq!(bridge.destroy_count(), 0);

    drop(scope);
    assert!(queue.is_disposed());
    assert_eq!(bridge.destroy_count(), 1);
}

#[test]
fn scope_cannot_bind_a_disposed_queue() {
    let (_bridge, _commands, queue) = new_queue();
    queue.release("creator", "done").expect("release");
    assert!(QueueScope::bind(&queue, "late panel").is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn outstanding_requests_fail_at_disposal() -> Result<()> {
    let (bridge, commands, queue) = new_queue();

    let loader = tokio::spawn({
        let queue = queue.clone();
        async move { queue.load_file(vec![9]).await }
    });
    let IssuedCommand::LoadFile { request, .. } = commands.recv_async().await? else {
        panic!("expected a load-file command");
    };
    assert_eq!(queue.pending_requests(), 1);

    queue.release("creator", "shutting down").expect("release");

    let err = loader.await?.expect_err("suspended load must fail");
    assert!(matches!(err, QueueError::FileLoad { ref message } if message.contains("disposed")));
    assert_eq!(queue.pending_requests(), 0);

    // The runtime's worker may still deliver the real completion afterwards;
    // it must be dropped, not resolved against the torn-down table.
    bridge.sink().on_file_loaded(request, FileHandle(1));
    assert_eq!(bridge.destroy_count(), 1);
    Ok(())
}

#[test]
fn callbacks_after_disposal_are_dropped() {
    let (bridge, _commands, queue) = new_queue();
    let sink = bridge.sink();
    queue.release("creator", "done").expect("release");

    // None of these may panic or resurrect state.
    sink.on_file_loaded(RequestId(1), FileHandle(1));
    sink.on_file_error(RequestId(2), "late".to_string());
    sink.on_artboard_loaded(RequestId(3), ArtboardHandle(3));
    sink.on_artboard_error(RequestId(4), "late".to_string());
    sink.on_file_deleted(RequestId(5));
    assert_eq!(queue.pending_requests(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delete_file_is_fire_and_forget_with_a_fresh_id() -> Result<()> {
    let (bridge, commands, queue) = new_queue();

    let loader = tokio::spawn({
        let queue = queue.clone();
        async move { queue.load_file(vec![1]).await }
    });
    let IssuedCommand::LoadFile { request: load_id, .. } = commands.recv_async().await? else {
        panic!("expected a load-file command");
    };
    bridge.sink().on_file_loaded(load_id, FileHandle(8));
    let file = loader.await??;

    // Returns before any runtime response exists.
    queue.delete_file(file)?;
    let IssuedCommand::DeleteFile { request: delete_id, file: deleted } =
        commands.recv_async().await?
    else {
        panic!("expected a delete-file command");
    };
    assert_eq!(deleted, file);
    assert!(load_id < delete_id);

    // The optional confirmation is diagnostic only.
    bridge.sink().on_file_deleted(delete_id);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn artboard_loads_follow_the_same_correlation_rules() -> Result<()> {
    let (bridge, commands, queue) = new_queue();

    let good = tokio::spawn({
        let queue = queue.clone();
        async move { queue.load_artboard(FileHandle(8), "intro").await }
    });
    let IssuedCommand::LoadArtboard { request: id_one, file, name } =
        commands.recv_async().await?
    else {
        panic!("expected a load-artboard command");
    };
    assert_eq!(file, FileHandle(8));
    assert_eq!(name, "intro");

    let bad = tokio::spawn({
        let queue = queue.clone();
        async move { queue.load_artboard(FileHandle(8), "missing").await }
    });
    let IssuedCommand::LoadArtboard { request: id_two, .. } = commands.recv_async().await? else {
        panic!("expected a load-artboard command");
    };
    assert!(id_one < id_two);

    bridge
        .sink()
        .on_artboard_error(id_two, "no artboard named 'missing'".to_string());
    bridge.sink().on_artboard_loaded(id_one, ArtboardHandle(81));

    assert_eq!(good.await??, ArtboardHandle(81));
    let err = bad.await?.expect_err("missing artboard must fail");
    assert!(
        matches!(err, QueueError::ArtboardLoad { ref message } if message.contains("missing"))
    );

    queue.delete_artboard(ArtboardHandle(81))?;
    assert!(matches!(
        commands.recv_async().await?,
        IssuedCommand::DeleteArtboard { artboard: ArtboardHandle(81), .. }
    ));
    Ok(())
}

#[test]
fn concurrent_scopes_share_the_queue_without_a_privileged_owner() {
    const SCOPES: usize = 6;
    let (bridge, _commands, queue) = new_queue();

    let attach_detach: Vec<_> = (0..SCOPES)
        .map(|index| {
            let queue = queue.clone();
            thread::spawn(move || {
                let scope = QueueScope::bind(&queue, format!("subtree-{index}"))
                    .expect("bind while queue is alive");
                thread::sleep(Duration::from_millis(5));
                drop(scope);
            })
        })
        .collect();
    for worker in attach_detach {
        worker.join().expect("scope worker panicked");
    }

    assert_eq!(queue.ref_count(), 1);
    assert_eq!(bridge.destroy_count(), 0);
    queue.release("creator", "done").expect("release");
    assert_eq!(bridge.destroy_count(), 1);
}
