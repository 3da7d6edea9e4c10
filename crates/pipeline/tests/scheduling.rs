//! End-to-end scheduling behavior: per-session admission, the global
//! concurrency bound, FIFO eligibility, and slot round-trips.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    anyhow::Result,
    async_trait::async_trait,
    palaver_common::{LauncherType, MessageChain},
    palaver_config::{PalaverConfig, PipelineRecord},
    palaver_pipeline::{
        Controller, PipelineManager, PipelineStage, Query, QueryPool, StageDeps, StageOutput,
        StageProcessResult, StageRegistry, default_pipeline_record, register_default_stages,
    },
    palaver_platform::{Bot, MessageEvent, PlatformAdapter, PlatformManager},
    palaver_plugins::PluginRouter,
    palaver_providers::{EchoRequester, ModelInfo, ProviderManager},
    palaver_sessions::SessionManager,
    palaver_tasks::{LifecycleScope, TaskClass, TaskManager},
    tokio::sync::Semaphore,
};

// ── Test fixtures ───────────────────────────────────────────────────────────

struct RecordingAdapter {
    sent: Mutex<Vec<String>>,
}

impl RecordingAdapter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PlatformAdapter for RecordingAdapter {
    fn id(&self) -> &str {
        "recording"
    }

    fn account_id(&self) -> &str {
        "bot-account"
    }

    async fn reply_message(
        &self,
        _source: &MessageEvent,
        message: &MessageChain,
        _quote_origin: bool,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.text());
        Ok(())
    }

    async fn send_message(
        &self,
        _target_type: LauncherType,
        _target_id: &str,
        message: &MessageChain,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.text());
        Ok(())
    }
}

/// Stage that records each query it sees, then parks until the test hands it
/// a release permit. Tracks the peak number of concurrent executions.
struct GateStage {
    started: Arc<Mutex<Vec<u64>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl PipelineStage for GateStage {
    async fn process(
        &self,
        query: Query,
        _stage_name: &str,
    ) -> palaver_pipeline::Result<StageOutput> {
        self.started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.query_id);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| palaver_pipeline::Error::Other(anyhow::anyhow!(e)))?;
        permit.forget();

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(StageOutput::Single(StageProcessResult::continue_with(query)))
    }
}

struct World {
    pool: Arc<QueryPool>,
    tasks: Arc<TaskManager>,
    adapter: Arc<RecordingAdapter>,
    started: Arc<Mutex<Vec<u64>>>,
    max_active: Arc<AtomicUsize>,
    gate: Arc<Semaphore>,
}

impl World {
    fn started(&self) -> Vec<u64> {
        self.started.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    async fn add(&self, launcher_type: LauncherType, launcher_id: &str, sender: &str) -> Query {
        let chain = MessageChain::plain("hi");
        let event = match launcher_type {
            LauncherType::Person => MessageEvent::Person {
                sender_id: sender.into(),
                message_chain: chain.clone(),
            },
            LauncherType::Group => MessageEvent::Group {
                group_id: launcher_id.into(),
                sender_id: sender.into(),
                message_chain: chain.clone(),
            },
        };
        self.pool
            .add_query(
                launcher_type,
                launcher_id,
                sender,
                event,
                chain,
                Arc::clone(&self.adapter) as Arc<dyn PlatformAdapter>,
                "bot-1",
            )
            .await
    }

    /// Poll until `cond` holds or the deadline passes.
    async fn wait_until(&self, cond: impl Fn(&World) -> bool) {
        for _ in 0..200 {
            if cond(self) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached before deadline");
    }
}

async fn gated_world(global_limit: usize) -> World {
    let started: Arc<Mutex<Vec<u64>>> = Arc::default();
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(0));

    let sessions = Arc::new(SessionManager::new());
    let deps = Arc::new(StageDeps {
        app_config: Arc::new(PalaverConfig::default()),
        sessions: Arc::clone(&sessions),
        plugins: Arc::new(PluginRouter::new()),
        providers: Arc::new(ProviderManager::new(Arc::new(EchoRequester))),
    });

    let mut registry = StageRegistry::new();
    {
        let started = Arc::clone(&started);
        let active = Arc::clone(&active);
        let max_active = Arc::clone(&max_active);
        let gate = Arc::clone(&gate);
        registry.register("gate", move |_| {
            Box::new(GateStage {
                started: Arc::clone(&started),
                active: Arc::clone(&active),
                max_active: Arc::clone(&max_active),
                gate: Arc::clone(&gate),
            })
        });
    }

    let pipelines = Arc::new(PipelineManager::new(registry, deps));
    pipelines
        .load_pipeline(PipelineRecord {
            id: "p-1".into(),
            name: "gated".into(),
            description: String::new(),
            stages: vec!["gate".into()],
            config: serde_json::json!({}),
        })
        .await
        .unwrap();

    let adapter = RecordingAdapter::new();
    let platforms = Arc::new(PlatformManager::new());
    platforms
        .register_bot(Bot {
            id: "bot-1".into(),
            name: "test bot".into(),
            adapter: Arc::clone(&adapter) as Arc<dyn PlatformAdapter>,
            use_pipeline_id: "p-1".into(),
        })
        .await;

    let pool = Arc::new(QueryPool::new());
    let tasks = Arc::new(TaskManager::new());
    let controller = Controller::new(
        Arc::clone(&pool),
        sessions,
        platforms,
        pipelines,
        Arc::clone(&tasks),
        global_limit,
    );
    tasks.create_task(
        async move {
            controller.run().await;
            Ok(serde_json::Value::Null)
        },
        TaskClass::System,
        "controller",
        "query-controller",
        "",
        vec![LifecycleScope::Application],
    );

    World {
        pool,
        tasks,
        adapter,
        started,
        max_active,
        gate,
    }
}

// ── Scheduling properties ───────────────────────────────────────────────────

#[tokio::test]
async fn session_admission_is_mutually_exclusive() {
    let world = gated_world(8).await;
    for _ in 0..3 {
        world.add(LauncherType::Person, "alice", "alice").await;
    }

    world.wait_until(|w| w.started().len() == 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    // All three queries share one session; only one may be inside the chain.
    assert_eq!(world.started().len(), 1);
    assert_eq!(world.max_active.load(Ordering::SeqCst), 1);

    world.release(3);
    world.wait_until(|w| w.started().len() == 3).await;
    assert_eq!(world.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn global_limit_bounds_concurrent_executions() {
    let world = gated_world(2).await;
    for id in ["a", "b", "c", "d"] {
        world.add(LauncherType::Person, id, id).await;
    }

    world.wait_until(|w| w.started().len() == 2).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    // Four distinct free sessions, but only two global permits.
    assert_eq!(world.started().len(), 2);

    world.release(4);
    world.wait_until(|w| w.started().len() == 4).await;
    assert!(world.max_active.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn fifo_selection_across_free_sessions() {
    let world = gated_world(1).await;
    let q1 = world.add(LauncherType::Person, "older", "older").await;
    let q2 = world.add(LauncherType::Person, "newer", "newer").await;

    world.wait_until(|w| w.started().len() == 1).await;
    assert_eq!(world.started(), vec![q1.query_id]);

    world.release(1);
    world.wait_until(|w| w.started().len() == 2).await;
    assert_eq!(world.started(), vec![q1.query_id, q2.query_id]);
    world.release(1);
}

#[tokio::test]
async fn busy_session_does_not_starve_later_sessions() {
    let world = gated_world(8).await;
    let q1 = world.add(LauncherType::Person, "alice", "alice").await;
    world.wait_until(|w| w.started() == vec![q1.query_id]).await;

    // Q2 shares the busy session; Q3 sits behind it in the pool but its
    // session is free.
    let _q2 = world.add(LauncherType::Person, "alice", "alice").await;
    let q3 = world.add(LauncherType::Person, "bob", "bob").await;

    world
        .wait_until(|w| w.started() == vec![q1.query_id, q3.query_id])
        .await;
    world.release(3);
}

#[tokio::test]
async fn released_slot_makes_queued_query_eligible() {
    // The §-example shape: Q1 (A), Q2 (B), Q3 (A) with a global limit of 2.
    let world = gated_world(2).await;
    let q1 = world.add(LauncherType::Group, "a", "u1").await;
    let q2 = world.add(LauncherType::Group, "b", "u2").await;
    let q3 = world.add(LauncherType::Group, "a", "u3").await;

    world.wait_until(|w| w.started().len() == 2).await;
    assert_eq!(world.started(), vec![q1.query_id, q2.query_id]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    // Q3 waits on session A regardless of the free global permit.
    assert_eq!(world.started().len(), 2);

    // Finishing the in-flight runs releases both session slots; Q3 becomes
    // eligible on the next scan.
    world.release(2);
    world
        .wait_until(|w| w.started() == vec![q1.query_id, q2.query_id, q3.query_id])
        .await;
    world.release(1);

    // Every dispatch ran as a tracked task.
    let snapshots = world.tasks.snapshots(None);
    assert_eq!(snapshots.iter().filter(|t| t.kind == "query").count(), 3);
}

#[tokio::test]
async fn unresolvable_bot_drops_the_query_and_frees_the_slot() {
    let world = gated_world(8).await;
    // A query for a bot id nobody registered: silently dropped.
    let chain = MessageChain::plain("hi");
    world
        .pool
        .add_query(
            LauncherType::Person,
            "alice",
            "alice",
            MessageEvent::Person {
                sender_id: "alice".into(),
                message_chain: chain.clone(),
            },
            chain,
            Arc::clone(&world.adapter) as Arc<dyn PlatformAdapter>,
            "ghost-bot",
        )
        .await;

    // The slot must come back: a follow-up query for the same session (and a
    // real bot) still dispatches.
    let q2 = world.add(LauncherType::Person, "alice", "alice").await;
    world.wait_until(|w| w.started() == vec![q2.query_id]).await;
    world.release(1);
}

// ── Full pipeline round trip ────────────────────────────────────────────────

#[tokio::test]
async fn default_pipeline_echoes_a_person_message() {
    let sessions = Arc::new(SessionManager::new());
    let mut providers = ProviderManager::new(Arc::new(EchoRequester));
    providers.register_model(ModelInfo {
        name: "echo".into(),
        provider: "builtin".into(),
        supports_functions: false,
    });
    let deps = Arc::new(StageDeps {
        app_config: Arc::new(PalaverConfig::default()),
        sessions: Arc::clone(&sessions),
        plugins: Arc::new(PluginRouter::new()),
        providers: Arc::new(providers),
    });

    let mut registry = StageRegistry::new();
    register_default_stages(&mut registry);
    let pipelines = Arc::new(PipelineManager::new(registry, deps));
    pipelines
        .load_pipeline(default_pipeline_record("p-default"))
        .await
        .unwrap();

    let adapter = RecordingAdapter::new();
    let platforms = Arc::new(PlatformManager::new());
    platforms
        .register_bot(Bot {
            id: "bot-1".into(),
            name: "echo bot".into(),
            adapter: Arc::clone(&adapter) as Arc<dyn PlatformAdapter>,
            use_pipeline_id: "p-default".into(),
        })
        .await;

    let pool = Arc::new(QueryPool::new());
    let tasks = Arc::new(TaskManager::new());
    let controller = Controller::new(
        Arc::clone(&pool),
        sessions,
        platforms,
        pipelines,
        Arc::clone(&tasks),
        4,
    );
    tasks.create_task(
        async move {
            controller.run().await;
            Ok(serde_json::Value::Null)
        },
        TaskClass::System,
        "controller",
        "query-controller",
        "",
        vec![LifecycleScope::Application],
    );

    let chain = MessageChain::plain("hello palaver");
    pool.add_query(
        LauncherType::Person,
        "alice",
        "alice",
        MessageEvent::Person {
            sender_id: "alice".into(),
            message_chain: chain.clone(),
        },
        chain,
        Arc::clone(&adapter) as Arc<dyn PlatformAdapter>,
        "bot-1",
    )
    .await;

    for _ in 0..200 {
        if !adapter.texts().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(adapter.texts(), vec!["hello palaver"]);
}
