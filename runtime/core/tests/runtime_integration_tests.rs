// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the run coordination core
//!
//! These tests drive the public surface end to end:
//! 1. Session-ordered execution through the queue
//! 2. Cross-process cancellation over a shared broadcast channel
//! 3. Full cancel-command orchestration
//! 4. Durable suspend/resume surviving a "process restart"

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aegis_runtime_core::application::cancel_broadcaster::DistributedCancelBroadcaster;
use aegis_runtime_core::application::cancel_orchestrator::{CancelOrchestrator, CancelRunCommand};
use aegis_runtime_core::application::config::RuntimeConfig;
use aegis_runtime_core::application::execution_queue::ExecutionQueue;
use aegis_runtime_core::application::execution_runtime::ExecutionRuntime;
use aegis_runtime_core::application::interrupt_resume::{
    AfterModelOutcome, InterruptResumeMiddleware, JumpTarget,
};
use aegis_runtime_core::application::run_registry::RunRegistry;
use aegis_runtime_core::domain::checkpoint::CheckpointConfig;
use aegis_runtime_core::domain::error::RuntimeError;
use aegis_runtime_core::domain::message::{
    AgentMessage, AgentState, AssistantMessage, ClientToolMessagePayload, ClientToolResponse,
    ToolCall,
};
use aegis_runtime_core::domain::run::{RunId, RunSpec};
use aegis_runtime_core::infrastructure::cancel_channel::InProcessCancelChannel;
use aegis_runtime_core::infrastructure::checkpoint::{CheckpointSuspension, InMemoryCheckpointer};
use tokio::sync::oneshot;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn runtime_on(channel: Arc<InProcessCancelChannel>) -> Arc<ExecutionRuntime> {
    init_tracing();
    let config = RuntimeConfig::default();
    let registry = Arc::new(RunRegistry::new(&config));
    let queue = Arc::new(ExecutionQueue::new(registry.clone(), config));
    let broadcaster = Arc::new(DistributedCancelBroadcaster::new(channel));
    Arc::new(ExecutionRuntime::new(registry, queue, broadcaster))
}

fn runtime() -> Arc<ExecutionRuntime> {
    runtime_on(Arc::new(InProcessCancelChannel::with_default_capacity()))
}

#[tokio::test]
async fn session_ordering_holds_while_other_sessions_proceed() {
    let runtime = runtime();
    let (gate_tx, gate_rx) = oneshot::channel::<()>();

    let first = {
        let runtime = runtime.clone();
        tokio::spawn(async move {
            runtime
                .run(
                    RunSpec::new(RunId::new(), "chat:conversation:c1", "c1"),
                    async move {
                        let _ = gate_rx.await;
                        Ok::<_, RuntimeError>("first")
                    },
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let second_ran = Arc::new(AtomicBool::new(false));
    let second = {
        let runtime = runtime.clone();
        let flag = second_ran.clone();
        tokio::spawn(async move {
            runtime
                .run(
                    RunSpec::new(RunId::new(), "chat:conversation:c1", "c1"),
                    async move {
                        flag.store(true, Ordering::SeqCst);
                        Ok::<_, RuntimeError>("second")
                    },
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // A different session completes while c1 is still blocked.
    runtime
        .run(
            RunSpec::new(RunId::new(), "chat:conversation:c2", "c2"),
            async { Ok::<_, RuntimeError>("other") },
        )
        .await
        .unwrap();
    assert!(!second_ran.load(Ordering::SeqCst));
    assert_eq!(runtime.session_queue_depth("chat:conversation:c1"), 1);
    assert_eq!(runtime.run_count(), 2);

    let _ = gate_tx.send(());
    assert_eq!(first.await.unwrap().unwrap(), "first");
    assert_eq!(second.await.unwrap().unwrap(), "second");
    assert!(second_ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancellation_crosses_process_boundaries() {
    // Two runtimes on one channel stand in for two fleet processes.
    let channel = Arc::new(InProcessCancelChannel::with_default_capacity());
    let local = runtime_on(channel.clone());
    let remote = runtime_on(channel);

    let subscriber = remote.broadcaster().start();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let token = tokio_util::sync::CancellationToken::new();
    remote.broadcaster().register("e-remote", token.clone());

    // The local process knows only the execution id.
    let aborted = local
        .broadcaster()
        .cancel_executions(&["e-remote".into()], Some("User canceled"))
        .await;
    // Not held locally, so nothing aborts here...
    assert!(aborted.is_empty());

    // ...but the remote process picks it up off the channel.
    tokio::time::timeout(Duration::from_secs(1), token.cancelled())
        .await
        .expect("remote handle should be cancelled");

    remote.broadcaster().shutdown_token().cancel();
    subscriber.await.unwrap();
}

#[tokio::test]
async fn cancel_command_stops_running_and_queued_work() {
    let runtime = runtime();
    let (started_tx, started_rx) = oneshot::channel::<()>();

    let running = {
        let runtime = runtime.clone();
        let spec = RunSpec::new(RunId::new(), "chat:conversation:c1", "c1")
            .with_execution_id("e1")
            .with_tenant("t1", "u1");
        let token = spec.token.clone();
        runtime.broadcaster().register("e1", token.clone());
        tokio::spawn(async move {
            runtime
                .run(spec, async move {
                    let _ = started_tx.send(());
                    // Cooperative task: stop when the signal is raised.
                    token.cancelled().await;
                    Err::<(), _>(RuntimeError::aborted("User canceled"))
                })
                .await
        })
    };
    started_rx.await.unwrap();

    let queued_ran = Arc::new(AtomicBool::new(false));
    let queued = {
        let runtime = runtime.clone();
        let flag = queued_ran.clone();
        tokio::spawn(async move {
            runtime
                .run(
                    RunSpec::new(RunId::new(), "chat:conversation:c1", "c1"),
                    async move {
                        flag.store(true, Ordering::SeqCst);
                        Ok::<_, RuntimeError>(())
                    },
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let orchestrator = CancelOrchestrator::new(runtime.clone());
    let outcome = orchestrator
        .cancel(&CancelRunCommand {
            conversation_id: "c1".into(),
            run_id: None,
            tenant_id: "t1".into(),
            organization_id: None,
            user_id: "u1".into(),
        })
        .await;

    assert_eq!(outcome.aborted_run_ids.len(), 2);
    assert_eq!(outcome.aborted_execution_ids, vec!["e1".to_string()]);

    let running_result = running.await.unwrap();
    assert!(matches!(running_result, Err(RuntimeError::Aborted { .. })));
    let queued_result = queued.await.unwrap();
    assert!(matches!(queued_result, Err(RuntimeError::Aborted { .. })));
    assert!(!queued_ran.load(Ordering::SeqCst));

    assert_eq!(runtime.run_count(), 0);
}

#[tokio::test]
async fn suspended_run_resumes_in_a_fresh_process() {
    // The checkpoint store is the only thing both "processes" share.
    let checkpointer = Arc::new(InMemoryCheckpointer::new());
    let config = CheckpointConfig::new("thread-1");

    let token = {
        let middleware = InterruptResumeMiddleware::new(
            ["openFile".to_string()],
            Arc::new(CheckpointSuspension::new(checkpointer.clone())),
        );
        let state = AgentState {
            messages: vec![AgentMessage::Assistant(AssistantMessage {
                content: String::new(),
                tool_calls: vec![ToolCall::new("t1", "openFile")],
            })],
            summary: None,
        };
        match middleware.after_model(&state, &config).await.unwrap() {
            AfterModelOutcome::Suspended(token) => token,
            AfterModelOutcome::Pass => panic!("expected suspension"),
        }
        // The suspending middleware (and its process) is gone now.
    };

    let middleware = InterruptResumeMiddleware::new(
        ["openFile".to_string()],
        Arc::new(CheckpointSuspension::new(checkpointer)),
    );
    let response = ClientToolResponse {
        tool_messages: vec![ClientToolMessagePayload {
            content: serde_json::Value::from("file contents"),
            ..Default::default()
        }],
    };
    let update = middleware.resume(&token, response).await.unwrap();

    assert_eq!(update.jump_to, Some(JumpTarget::Model));
    let AgentMessage::Tool(tool) = &update.messages[1] else {
        panic!("expected tool result message");
    };
    assert_eq!(tool.tool_call_id, "t1");
    assert_eq!(tool.content, "file contents");
}

#[tokio::test]
async fn shutdown_aborts_in_flight_runs() {
    let runtime = runtime();
    let (started_tx, started_rx) = oneshot::channel::<()>();

    let spec = RunSpec::new(RunId::new(), "chat:conversation:c1", "c1");
    let token = spec.token.clone();
    let running = {
        let runtime = runtime.clone();
        tokio::spawn(async move {
            runtime
                .run(spec, async move {
                    let _ = started_tx.send(());
                    token.cancelled().await;
                    Err::<(), _>(RuntimeError::aborted("Runtime shutdown"))
                })
                .await
        })
    };
    started_rx.await.unwrap();

    assert_eq!(runtime.shutdown("Runtime shutdown"), 1);
    let result = running.await.unwrap();
    assert!(matches!(result, Err(RuntimeError::Aborted { .. })));
    assert_eq!(runtime.run_count(), 0);
}
