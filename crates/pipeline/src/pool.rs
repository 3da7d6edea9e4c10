use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    palaver_common::{LauncherType, MessageChain},
    palaver_platform::{MessageEvent, PlatformAdapter},
    tokio::sync::{Mutex, MutexGuard, Notify, futures::Notified},
    tracing::debug,
};

use crate::entities::Query;

/// Holding area of admitted-but-not-yet-dispatched queries.
///
/// The queue is FIFO by arrival and guarded by one mutex the scheduler also
/// holds while scanning; the notify handle is its condition signal, fired
/// when a query arrives or a session slot frees up.
#[derive(Default)]
pub struct QueryPool {
    queries: Mutex<VecDeque<Query>>,
    notify: Notify,
    next_query_id: AtomicU64,
}

impl QueryPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit an inbound event: allocate the next query id, append the query,
    /// and wake the scheduler. Returns a clone of the queued query.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_query(
        &self,
        launcher_type: LauncherType,
        launcher_id: impl Into<String>,
        sender_id: impl Into<String>,
        message_event: MessageEvent,
        message_chain: MessageChain,
        adapter: Arc<dyn PlatformAdapter>,
        bot_id: impl Into<String>,
    ) -> Query {
        let query = Query::new(
            self.next_query_id.fetch_add(1, Ordering::Relaxed),
            launcher_type,
            launcher_id,
            sender_id,
            message_event,
            message_chain,
            adapter,
            bot_id,
        );
        self.queries.lock().await.push_back(query.clone());
        debug!(query_id = query.query_id, "query admitted to pool");
        self.notify.notify_one();
        query
    }

    /// The pool's mutual exclusion over the queue.
    pub async fn lock(&self) -> MutexGuard<'_, VecDeque<Query>> {
        self.queries.lock().await
    }

    /// Signal that capacity may have changed (query added or slot released).
    pub fn signal(&self) {
        self.notify.notify_one();
    }

    /// Future that resolves on the next signal. Callers pin and `enable` it
    /// before releasing the pool lock so no signal is lost in between.
    pub fn wait_signal(&self) -> Notified<'_> {
        self.notify.notified()
    }

    pub async fn len(&self) -> usize {
        self.queries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queries.lock().await.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        anyhow::Result,
        async_trait::async_trait,
    };

    use super::*;

    struct NullAdapter;

    #[async_trait]
    impl PlatformAdapter for NullAdapter {
        fn id(&self) -> &str {
            "null"
        }

        fn account_id(&self) -> &str {
            "null-bot"
        }

        async fn reply_message(
            &self,
            _source: &MessageEvent,
            _message: &MessageChain,
            _quote_origin: bool,
        ) -> Result<()> {
            Ok(())
        }

        async fn send_message(
            &self,
            _target_type: LauncherType,
            _target_id: &str,
            _message: &MessageChain,
        ) -> Result<()> {
            Ok(())
        }
    }

    async fn add(pool: &QueryPool, sender: &str) -> Query {
        pool.add_query(
            LauncherType::Person,
            sender,
            sender,
            MessageEvent::Person {
                sender_id: sender.into(),
                message_chain: MessageChain::plain("hi"),
            },
            MessageChain::plain("hi"),
            Arc::new(NullAdapter),
            "bot-1",
        )
        .await
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_order_is_fifo() {
        let pool = QueryPool::new();
        let a = add(&pool, "u1").await;
        let b = add(&pool, "u2").await;
        let c = add(&pool, "u3").await;
        assert!(a.query_id < b.query_id && b.query_id < c.query_id);

        let queue = pool.lock().await;
        let order: Vec<u64> = queue.iter().map(|q| q.query_id).collect();
        assert_eq!(order, vec![a.query_id, b.query_id, c.query_id]);
    }

    #[tokio::test]
    async fn add_query_signals_a_waiting_scanner() {
        let pool = Arc::new(QueryPool::new());

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                pool.wait_signal().await;
                pool.len().await
            })
        };

        // Give the waiter a chance to park before signaling.
        tokio::task::yield_now().await;
        add(&pool, "u1").await;
        assert_eq!(waiter.await.unwrap(), 1);
    }
}
