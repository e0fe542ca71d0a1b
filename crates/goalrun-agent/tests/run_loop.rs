//! End-to-end behaviour of the run loop against scripted backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use goalrun_agent::{
    AgentConfig, AgentError, ChannelSink, EventSink, MemorySink, Message, MessageKind, Mode, Run,
    RunControl, RunEvent, RunStatus, StopReason, TaskStatus,
};
use goalrun_core::{replay, TaskId};
use goalrun_llm::{BackendError, LanguageBackend, ModelSettings, ScriptedBackend};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;

const WAIT: Duration = Duration::from_secs(5);

fn task_messages(messages: &[Message]) -> Vec<(TaskId, TaskStatus)> {
    messages
        .iter()
        .filter_map(|m| match m.kind {
            MessageKind::Task { task_id, status } => Some((task_id, status)),
            _ => None,
        })
        .collect()
}

fn errors_for(messages: &[Message], id: TaskId) -> usize {
    messages
        .iter()
        .filter(|m| m.kind == MessageKind::Error { task_id: Some(id) })
        .count()
}

/// Read events until the run publishes `target`, returning the messages seen.
async fn until_status(rx: &mut UnboundedReceiver<RunEvent>, target: RunStatus) -> Vec<Message> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for status")
            .expect("event stream closed");
        match event {
            RunEvent::Status(status) if status == target => return seen,
            RunEvent::Status(_) => {}
            RunEvent::Message(message) => seen.push(message),
        }
    }
}

fn kinds_of(messages: &[Message], kind: MessageKind) -> Vec<&Message> {
    messages.iter().filter(|m| m.kind == kind).collect()
}

fn task_event(id: u64, status: TaskStatus) -> MessageKind {
    MessageKind::Task {
        task_id: TaskId::new(id),
        status,
    }
}

/// Read events until a message matching `done` arrives, returning the
/// messages seen including that one.
async fn until_message(
    rx: &mut UnboundedReceiver<RunEvent>,
    done: impl Fn(&Message) -> bool,
) -> Vec<Message> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for message")
            .expect("event stream closed");
        if let RunEvent::Message(message) = event {
            let matched = done(&message);
            seen.push(message);
            if matched {
                return seen;
            }
        }
    }
}

/// Drain the remaining events once the run has finished.
async fn drain(rx: &mut UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
    let mut rest = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(WAIT, rx.recv()).await {
        rest.push(event);
    }
    rest
}

/// Plans instantly, then holds every execution until released.
struct GatedBackend {
    release: Notify,
    executions: AtomicUsize,
}

impl GatedBackend {
    fn new() -> Self {
        Self {
            release: Notify::new(),
            executions: AtomicUsize::new(0),
        }
    }

    fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageBackend for GatedBackend {
    fn name(&self) -> &str {
        "gated"
    }

    async fn generate(&self, prompt: &str, _: &ModelSettings) -> Result<String, BackendError> {
        if prompt.contains("task planning agent") {
            return Ok(r#"["one", "two"]"#.to_string());
        }
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok("done".to_string())
    }
}

/// Records events and requests a stop as soon as a task result is emitted.
#[derive(Default)]
struct StopOnFirstResult {
    control: Mutex<Option<RunControl>>,
    events: MemorySink,
}

impl EventSink for StopOnFirstResult {
    fn on_message(&self, message: Message) {
        if matches!(
            message.kind,
            MessageKind::Task {
                status: TaskStatus::Completed,
                ..
            }
        ) {
            if let Some(control) = self.control.lock().unwrap().as_ref() {
                control.stop();
            }
        }
        self.events.on_message(message);
    }

    fn on_status_change(&self, status: RunStatus) {
        self.events.on_status_change(status);
    }
}

/// Plans instantly, then never answers an execution request.
struct HangingBackend;

#[async_trait]
impl LanguageBackend for HangingBackend {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn generate(&self, prompt: &str, _: &ModelSettings) -> Result<String, BackendError> {
        if prompt.contains("task planning agent") {
            return Ok(r#"["Slow task", "Never started"]"#.to_string());
        }
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_birthday_party_runs_to_completion() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply("1. Pick a date\n2. Book a venue\n3. Send invitations")
            .reply("Saturday the 14th.")
            .reply("The community hall is booked.")
            .reply("Invitations sent to 20 guests."),
    );
    let sink = Arc::new(MemorySink::new());

    let handle = Run::new("party", "Plan a birthday party")
        .unwrap()
        .start(backend.clone(), sink.clone());
    let report = tokio::time::timeout(WAIT, handle.join()).await.unwrap().unwrap();

    let messages = sink.messages();
    let goals: Vec<&Message> = messages.iter().filter(|m| m.kind == MessageKind::Goal).collect();
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].value, "Plan a birthday party");
    assert_eq!(messages[0].kind, MessageKind::Goal);

    let ids: Vec<TaskId> = (1..=3).map(TaskId::new).collect();
    assert_eq!(
        task_messages(&messages),
        vec![
            (ids[0], TaskStatus::Executing),
            (ids[0], TaskStatus::Completed),
            (ids[1], TaskStatus::Executing),
            (ids[1], TaskStatus::Completed),
            (ids[2], TaskStatus::Executing),
            (ids[2], TaskStatus::Completed),
        ]
    );

    let last = messages.last().unwrap();
    assert_eq!(last.kind, MessageKind::SystemNotice);
    assert!(last.value.to_lowercase().contains("goal complete"));
    assert!(messages.windows(2).all(|w| w[0].seq + 1 == w[1].seq));

    assert_eq!(sink.statuses(), vec![RunStatus::Running, RunStatus::Stopped]);
    assert_eq!(report.status, RunStatus::Stopped);
    assert_eq!(report.reason, StopReason::Completed);
    assert_eq!(report.loops, 3);
    assert_eq!(backend.calls(), 4);

    let snapshot = report.snapshot().unwrap();
    assert_eq!(snapshot.name, "party");
    assert_eq!(snapshot.tasks.len(), 3);
    assert_eq!(snapshot.tasks[1].description, "Book a venue");
    assert_eq!(
        snapshot.tasks[1].result.as_deref(),
        Some("The community hall is booked.")
    );
}

#[tokio::test]
async fn test_two_consecutive_failures_stop_the_run() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["Pick a date", "Book a venue"]"#)
            .fail(BackendError::Transient("rate limited".to_string()))
            .fail(BackendError::Transient("rate limited".to_string()))
            .with_default_reply("should never be used"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = Run::new("party", "Plan a birthday party")
        .unwrap()
        .start(backend.clone(), sink.clone())
        .join()
        .await
        .unwrap();

    let messages = sink.messages();
    let first = TaskId::new(1);
    assert_eq!(errors_for(&messages, first), 2);
    assert_eq!(
        task_messages(&messages),
        vec![
            (first, TaskStatus::Executing),
            (first, TaskStatus::Executing),
        ]
    );
    assert!(messages.last().unwrap().is_error());
    assert!(messages.last().unwrap().value.contains("Stopping the agent"));

    assert_eq!(report.reason, StopReason::BackendFailure);
    assert_eq!(report.status, RunStatus::Stopped);
    assert_eq!(report.pending.len(), 1);
    assert_eq!(report.pending[0].description, "Book a venue");
    assert_eq!(report.completed[0].attempts, 2);
    assert!(report.completed[0].error.is_some());
    assert!(report.snapshot().is_none());
    assert_eq!(backend.calls(), 3);

    let records = replay(&messages);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, TaskStatus::Completed);
    assert!(records[0].error.is_some());
}

#[tokio::test]
async fn test_transient_failure_retried_once() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["Pick a date"]"#)
            .fail(BackendError::Transient("timeout".to_string()))
            .reply("Sunday."),
    );
    let sink = Arc::new(MemorySink::new());

    let report = Run::new("party", "Plan a birthday party")
        .unwrap()
        .start(backend, sink.clone())
        .join()
        .await
        .unwrap();

    let messages = sink.messages();
    let id = TaskId::new(1);
    assert_eq!(errors_for(&messages, id), 1);
    assert_eq!(
        task_messages(&messages),
        vec![
            (id, TaskStatus::Executing),
            (id, TaskStatus::Executing),
            (id, TaskStatus::Completed),
        ]
    );
    assert_eq!(report.reason, StopReason::Completed);
    assert_eq!(report.completed[0].result.as_deref(), Some("Sunday."));
}

#[tokio::test]
async fn test_fatal_failure_aborts_without_retry() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["Pick a date", "Book a venue"]"#)
            .fail(BackendError::Fatal("invalid api key".to_string()))
            .with_default_reply("unused"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = Run::new("party", "Plan a birthday party")
        .unwrap()
        .start(backend.clone(), sink.clone())
        .join()
        .await
        .unwrap();

    assert_eq!(errors_for(&sink.messages(), TaskId::new(1)), 1);
    assert_eq!(report.reason, StopReason::BackendFailure);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_planning_failure_reports_error() {
    let backend = Arc::new(ScriptedBackend::new().fail(BackendError::Fatal("bad key".to_string())));
    let sink = Arc::new(MemorySink::new());

    let report = Run::new("party", "Plan a birthday party")
        .unwrap()
        .start(backend, sink.clone())
        .join()
        .await
        .unwrap();

    let messages = sink.messages();
    assert!(messages
        .iter()
        .any(|m| m.kind == MessageKind::Error { task_id: None }));
    assert!(task_messages(&messages).is_empty());
    assert_eq!(report.reason, StopReason::BackendFailure);
    assert_eq!(sink.statuses().last(), Some(&RunStatus::Stopped));
}

#[tokio::test]
async fn test_unparsable_plan_executes_goal_itself() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply("Sounds fun!")
            .reply("Party planned."),
    );
    let sink = Arc::new(MemorySink::new());

    let report = Run::new("party", "Plan a birthday party")
        .unwrap()
        .start(backend, sink)
        .join()
        .await
        .unwrap();

    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].description, "Plan a birthday party");
    assert_eq!(report.reason, StopReason::Completed);
}

#[tokio::test]
async fn test_follow_on_tasks_are_appended_and_deduplicated() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["Pick a date", "Book a venue"]"#)
            .reply("Saturday.\nNEW TASKS: [\"Book a venue\", \"Order a cake\", \"Pick a date\"]")
            .reply("Booked.")
            .reply("Chocolate cake ordered.\nNEW TASKS: [\"Order a cake\"]"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = Run::new("party", "Plan a birthday party")
        .unwrap()
        .start(backend.clone(), sink.clone())
        .join()
        .await
        .unwrap();

    let executed: Vec<&str> = report
        .completed
        .iter()
        .map(|t| t.description.as_str())
        .collect();
    assert_eq!(executed, vec!["Pick a date", "Book a venue", "Order a cake"]);
    assert_eq!(report.completed[2].id, TaskId::new(3));
    assert_eq!(report.reason, StopReason::Completed);
    assert_eq!(backend.calls(), 4);

    let records = replay(&sink.messages());
    let replayed: Vec<&str> = records.iter().map(|r| r.description.as_str()).collect();
    assert_eq!(replayed, executed);
    assert!(records
        .iter()
        .zip(&report.completed)
        .all(|(r, t)| r.result == t.result && r.status == t.status));
}

#[tokio::test]
async fn test_loop_limit_stops_with_notice() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["one", "two", "three"]"#)
            .with_default_reply("ok"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = Run::new("limits", "Count to three")
        .unwrap()
        .with_config(AgentConfig::default().with_max_loops(2))
        .start(backend.clone(), sink.clone())
        .join()
        .await
        .unwrap();

    assert_eq!(report.reason, StopReason::LoopLimitReached);
    assert_eq!(report.loops, 2);
    assert_eq!(report.pending.len(), 1);
    assert!(report.snapshot().is_none());
    let last = sink.messages().pop().unwrap();
    assert_eq!(last.kind, MessageKind::SystemNotice);
    assert!(last.value.contains("run out of loops"));
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn test_pause_executes_exactly_one_task_per_step() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["one", "two", "three"]"#)
            .with_default_reply("ok"),
    );
    let (sink, mut rx) = ChannelSink::new();

    let handle = Run::new("stepper", "Count to three")
        .unwrap()
        .with_mode(Mode::Pause)
        .start(backend.clone(), Arc::new(sink));
    assert_eq!(handle.status(), RunStatus::Running);

    let before = until_status(&mut rx, RunStatus::Paused).await;
    assert!(task_messages(&before).is_empty());
    assert_eq!(backend.calls(), 1);
    assert_eq!(handle.status(), RunStatus::Paused);

    assert!(handle.request_step().unwrap());
    until_status(&mut rx, RunStatus::Running).await;
    let stepped = until_status(&mut rx, RunStatus::Paused).await;
    assert_eq!(
        task_messages(&stepped),
        vec![
            (TaskId::new(1), TaskStatus::Executing),
            (TaskId::new(1), TaskStatus::Completed),
        ]
    );
    assert_eq!(backend.calls(), 2);

    handle.set_mode(Mode::Automatic).unwrap();
    let report = tokio::time::timeout(WAIT, handle.join()).await.unwrap().unwrap();
    assert_eq!(report.reason, StopReason::Completed);
    assert_eq!(report.loops, 3);
}

#[tokio::test]
async fn test_step_requests_collapse_into_one_task() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["one", "two"]"#)
            .with_default_reply("ok"),
    );
    let (sink, mut rx) = ChannelSink::new();

    let handle = Run::new("stepper", "Count to two")
        .unwrap()
        .with_mode(Mode::Pause)
        .start(backend.clone(), Arc::new(sink));
    until_status(&mut rx, RunStatus::Paused).await;

    // Re-entering Pause while paused changes nothing.
    handle.set_mode(Mode::Pause).unwrap();
    assert_eq!(handle.status(), RunStatus::Paused);

    assert!(handle.request_step().unwrap());
    assert!(handle.request_step().unwrap());
    until_status(&mut rx, RunStatus::Running).await;
    let stepped = until_status(&mut rx, RunStatus::Paused).await;
    assert_eq!(task_messages(&stepped).len(), 2);
    assert_eq!(backend.calls(), 2);

    handle.stop();
    let report = tokio::time::timeout(WAIT, handle.join()).await.unwrap().unwrap();
    assert_eq!(report.reason, StopReason::StopRequested);
    assert_eq!(report.loops, 1);
}

#[tokio::test]
async fn test_stop_while_paused() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["one", "two"]"#)
            .with_default_reply("ok"),
    );
    let sink = Arc::new(MemorySink::new());

    let handle = Run::new("stopper", "Count to two")
        .unwrap()
        .with_mode(Mode::Pause)
        .start(backend.clone(), sink.clone());
    assert_eq!(
        handle.wait_for_status(RunStatus::Paused).await,
        RunStatus::Paused
    );

    let control = handle.control();
    handle.stop();
    let report = tokio::time::timeout(WAIT, handle.join()).await.unwrap().unwrap();

    assert_eq!(report.reason, StopReason::StopRequested);
    assert_eq!(report.loops, 0);
    assert_eq!(report.pending.len(), 2);
    assert_eq!(backend.calls(), 1);
    assert_eq!(
        sink.statuses(),
        vec![RunStatus::Running, RunStatus::Paused, RunStatus::Stopped]
    );
    assert_eq!(control.status(), RunStatus::Stopped);
    assert!(matches!(
        control.set_mode(Mode::Automatic),
        Err(AgentError::RunStopped)
    ));
    assert!(matches!(control.request_step(), Err(AgentError::RunStopped)));
}

#[tokio::test]
async fn test_stop_abandons_pending_backend_call() {
    let (sink, mut rx) = ChannelSink::new();
    let handle = Run::new("slow", "Do slow things")
        .unwrap()
        .start(Arc::new(HangingBackend), Arc::new(sink));

    // Wait until the first task is executing.
    loop {
        let event = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        if let RunEvent::Message(message) = event {
            if message.kind
                == (MessageKind::Task {
                    task_id: TaskId::new(1),
                    status: TaskStatus::Executing,
                })
            {
                break;
            }
        }
    }

    handle.stop();
    let report = tokio::time::timeout(WAIT, handle.join()).await.unwrap().unwrap();
    assert_eq!(report.reason, StopReason::StopRequested);
    assert_eq!(report.status, RunStatus::Stopped);
    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].status, TaskStatus::Completed);
    assert!(report.completed[0].error.is_some());
    assert_eq!(report.pending[0].description, "Never started");

    let rest = drain(&mut rx).await;
    assert!(rest.iter().all(|event| !matches!(
        event,
        RunEvent::Message(Message {
            kind: MessageKind::Task {
                status: TaskStatus::Executing,
                ..
            },
            ..
        })
    )));
    assert_eq!(rest.last(), Some(&RunEvent::Status(RunStatus::Stopped)));
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let backend = Arc::new(ScriptedBackend::new().with_default_reply("Done."));
    let first_sink = Arc::new(MemorySink::new());
    let second_sink = Arc::new(MemorySink::new());

    let first = Run::new("first", "Water the plants")
        .unwrap()
        .start(backend.clone(), first_sink.clone());
    let second = Run::new("second", "Feed the cat")
        .unwrap()
        .start(backend.clone(), second_sink.clone());

    let (first, second) = tokio::join!(first.join(), second.join());
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.completed[0].description, "Water the plants");
    assert_eq!(second.completed[0].description, "Feed the cat");
    assert_eq!(first.completed[0].id, TaskId::new(1));
    assert_eq!(second.completed[0].id, TaskId::new(1));
    assert_eq!(backend.calls(), 4);
    assert_eq!(first_sink.messages()[0].value, "Water the plants");
    assert_eq!(second_sink.messages()[0].value, "Feed the cat");
}

#[tokio::test]
async fn test_transient_planning_failure_is_reported_and_retried() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .fail(BackendError::Transient("rate limited".to_string()))
            .reply(r#"["one"]"#)
            .with_default_reply("ok"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = Run::new("planner", "Count to one")
        .unwrap()
        .start(backend.clone(), sink.clone())
        .join()
        .await
        .unwrap();

    let messages = sink.messages();
    let errors = kinds_of(&messages, MessageKind::Error { task_id: None });
    assert_eq!(errors.len(), 1);
    assert!(errors[0].value.contains("rate limited"));
    assert!(errors[0].value.ends_with("Retrying."));
    assert_eq!(report.reason, StopReason::Completed);
    assert_eq!(report.completed[0].description, "one");
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn test_repeated_planning_failure_stops_the_run() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .fail(BackendError::Transient("timeout".to_string()))
            .fail(BackendError::Transient("timeout".to_string()))
            .with_default_reply("unused"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = Run::new("planner", "Count to one")
        .unwrap()
        .start(backend.clone(), sink.clone())
        .join()
        .await
        .unwrap();

    let messages = sink.messages();
    assert_eq!(
        kinds_of(&messages, MessageKind::Error { task_id: None }).len(),
        2
    );
    assert!(messages.last().unwrap().value.contains("Stopping the agent"));
    assert_eq!(report.reason, StopReason::BackendFailure);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_thinking_precedes_every_backend_call() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["one", "two"]"#)
            .fail(BackendError::Transient("busy".to_string()))
            .with_default_reply("done"),
    );
    let sink = Arc::new(MemorySink::new());

    let report = Run::new("thinker", "Count to two")
        .unwrap()
        .start(backend.clone(), sink.clone())
        .join()
        .await
        .unwrap();
    assert_eq!(report.reason, StopReason::Completed);

    let messages = sink.messages();
    assert_eq!(backend.calls(), 4);
    assert_eq!(kinds_of(&messages, MessageKind::Thinking).len(), 4);
    assert_eq!(messages[1].kind, MessageKind::Thinking);
    for (i, message) in messages.iter().enumerate() {
        if let MessageKind::Task {
            status: TaskStatus::Executing,
            ..
        } = message.kind
        {
            assert_eq!(messages[i + 1].kind, MessageKind::Thinking);
        }
    }
}

#[tokio::test]
async fn test_queued_tasks_are_announced() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["Pick a date", "Book a venue"]"#)
            .reply("Saturday.\nNEW TASKS: [\"Book a venue\", \"Order a cake\"]")
            .with_default_reply("Done."),
    );
    let sink = Arc::new(MemorySink::new());

    Run::new("party", "Plan a birthday party")
        .unwrap()
        .start(backend, sink.clone())
        .join()
        .await
        .unwrap();

    let messages = sink.messages();
    let notices: Vec<&str> = kinds_of(&messages, MessageKind::SystemNotice)
        .into_iter()
        .map(|m| m.value.as_str())
        .collect();
    assert_eq!(notices[0], r#"Added 2 task(s): "Pick a date", "Book a venue""#);
    assert_eq!(notices[1], r#"Added 1 task(s): "Order a cake""#);

    let first_notice = messages
        .iter()
        .position(|m| m.kind == MessageKind::SystemNotice)
        .unwrap();
    let first_task = messages.iter().position(Message::is_task).unwrap();
    assert!(first_notice < first_task);
}

#[tokio::test]
async fn test_pause_while_task_in_flight_holds_after_it() {
    let backend = Arc::new(GatedBackend::new());
    let (sink, mut rx) = ChannelSink::new();

    let handle = Run::new("pauser", "Count to two")
        .unwrap()
        .start(backend.clone(), Arc::new(sink));

    until_message(&mut rx, |m| m.kind == task_event(1, TaskStatus::Executing)).await;
    handle.set_mode(Mode::Pause).unwrap();
    backend.release.notify_one();

    let held = until_status(&mut rx, RunStatus::Paused).await;
    assert_eq!(
        task_messages(&held),
        vec![(TaskId::new(1), TaskStatus::Completed)]
    );
    assert_eq!(handle.status(), RunStatus::Paused);
    assert_eq!(backend.executions(), 1);

    backend.release.notify_one();
    handle.set_mode(Mode::Automatic).unwrap();
    let report = tokio::time::timeout(WAIT, handle.join()).await.unwrap().unwrap();
    assert_eq!(report.reason, StopReason::Completed);
    assert_eq!(report.loops, 2);
    assert_eq!(backend.executions(), 2);
}

#[tokio::test]
async fn test_stop_during_planning() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_latency(Duration::from_secs(3600))
            .with_default_reply(r#"["never planned"]"#),
    );
    let (sink, mut rx) = ChannelSink::new();

    let handle = Run::new("stopper", "Plan forever")
        .unwrap()
        .start(backend.clone(), Arc::new(sink));

    until_message(&mut rx, |m| m.kind == MessageKind::Thinking).await;
    handle.stop();
    let report = tokio::time::timeout(WAIT, handle.join()).await.unwrap().unwrap();

    assert_eq!(report.reason, StopReason::StopRequested);
    assert_eq!(report.loops, 0);
    assert!(report.completed.is_empty());
    assert!(report.pending.is_empty());
    assert_eq!(backend.calls(), 1);

    let rest = drain(&mut rx).await;
    assert!(rest.iter().all(|event| match event {
        RunEvent::Message(message) => message.kind == MessageKind::SystemNotice,
        RunEvent::Status(status) => *status == RunStatus::Stopped,
    }));
    assert_eq!(rest.last(), Some(&RunEvent::Status(RunStatus::Stopped)));
}

#[tokio::test]
async fn test_stop_after_result_ends_run_before_next_task() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["one", "two"]"#)
            .with_default_reply("done"),
    );
    let sink = Arc::new(StopOnFirstResult::default());

    let handle = Run::new("stopper", "Count to two")
        .unwrap()
        .start(backend.clone(), sink.clone());
    sink.control.lock().unwrap().replace(handle.control());
    let report = tokio::time::timeout(WAIT, handle.join()).await.unwrap().unwrap();

    assert_eq!(report.reason, StopReason::StopRequested);
    assert_eq!(report.loops, 1);
    assert!(report.completed[0].succeeded());
    assert_eq!(report.pending[0].description, "two");
    assert_eq!(backend.calls(), 2);

    let messages = sink.events.messages();
    assert!(messages.iter().all(|m| !m.is_error()));
    assert_eq!(
        task_messages(&messages),
        vec![
            (TaskId::new(1), TaskStatus::Executing),
            (TaskId::new(1), TaskStatus::Completed),
        ]
    );
    assert!(messages.last().unwrap().value.contains("stopped by request"));
}

#[tokio::test]
async fn test_stop_interrupts_step_delay() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(r#"["one", "two"]"#)
            .with_default_reply("done"),
    );
    let (sink, mut rx) = ChannelSink::new();

    let handle = Run::new("sleeper", "Count to two")
        .unwrap()
        .with_config(AgentConfig::default().with_step_delay(Duration::from_secs(3600)))
        .start(backend.clone(), Arc::new(sink));

    until_message(&mut rx, |m| m.kind == task_event(1, TaskStatus::Completed)).await;
    handle.stop();
    let report = tokio::time::timeout(WAIT, handle.join()).await.unwrap().unwrap();

    assert_eq!(report.reason, StopReason::StopRequested);
    assert_eq!(report.loops, 1);
    assert_eq!(report.pending.len(), 1);
    assert_eq!(backend.calls(), 2);
}

#[test]
fn test_invalid_input_creates_no_run() {
    assert!(matches!(
        Run::new("", "goal"),
        Err(AgentError::InvalidInput(_))
    ));
    assert!(matches!(
        Run::new("name", "   "),
        Err(AgentError::InvalidInput(_))
    ));
}
