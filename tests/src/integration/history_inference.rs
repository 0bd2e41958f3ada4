//! # History Inference Against a Live Network
//!
//! The network never says "caught up", so a history query is complete once
//! the log has been quiet for the idle window. These flows write while a
//! query is in flight.

#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use podium_ledger::domain::document;
    use podium_ledger::{
        address_for, Address, History, Identity, InMemoryLedger, LedgerConfig, LedgerError,
        LogKind, WriteBatch, Writer, HISTORY_IDLE_WINDOW,
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    const HARD: Option<Duration> = Some(Duration::from_secs(10));

    fn setup() -> (Arc<InMemoryLedger>, History, Writer) {
        let network = Arc::new(InMemoryLedger::new());
        let config = LedgerConfig::for_testing();
        let history = History::new(network.clone(), &config);
        let writer = Writer::new(network.clone(), config.network_id);
        (network, history, writer)
    }

    fn log(key: &str) -> Address {
        address_for(LogKind::TopicWithId, key)
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_inside_idle_window_extend_the_query() {
        let (_network, history, writer) = setup();
        let address = log("busy");
        let identity = Identity::generate();

        let producer = tokio::spawn(async move {
            for n in 0..3 {
                tokio::time::sleep(Duration::from_millis(500)).await;
                writer
                    .write(&identity, &[address], &document(json!({"n": n})))
                    .await
                    .unwrap();
            }
        });

        let started = Instant::now();
        let records = history.fetch_history(address, HARD).await.unwrap();
        let elapsed = started.elapsed();
        producer.await.unwrap();

        let ns: Vec<_> = records.iter().filter_map(|r| r.get_i64("n")).collect();
        assert_eq!(ns, vec![0, 1, 2]);
        assert!(elapsed >= Duration::from_millis(1500) + HISTORY_IDLE_WINDOW);
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_after_resolution_are_not_included() {
        let (_network, history, writer) = setup();
        let address = log("late");
        let identity = Identity::generate();
        writer
            .write(&identity, &[address], &document(json!({"n": 0})))
            .await
            .unwrap();

        let late_writer = tokio::spawn(async move {
            tokio::time::sleep(HISTORY_IDLE_WINDOW + Duration::from_millis(500)).await;
            writer
                .write(&identity, &[address], &document(json!({"n": 1})))
                .await
                .unwrap();
        });

        let first = history.fetch_history(address, HARD).await.unwrap();
        assert_eq!(first.len(), 1);
        late_writer.await.unwrap();

        let second = history.fetch_history(address, HARD).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(history.fetch_latest(address, HARD).await.unwrap().get_i64("n"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_atomic_write_lands_on_every_target() {
        let (network, history, writer) = setup();
        let targets = [log("a"), log("b"), log("c")];
        let identity = Identity::generate();

        writer
            .write(&identity, &targets, &document(json!({"shared": true})))
            .await
            .unwrap();
        assert_eq!(network.submission_count(), 1);

        let results = join_all(targets.iter().map(|t| history.fetch_history(*t, HARD))).await;
        for records in results {
            let records = records.unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].get_bool("shared"), Some(true));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_writes_are_independent_logs() {
        let (_network, history, writer) = setup();
        let identity = Identity::generate();
        let batch = WriteBatch::new()
            .with(vec![log("x")], document(json!({"v": "x"})))
            .with(vec![log("y")], document(json!({"v": "y"})));
        writer.write_batch(&identity, batch).await.unwrap();

        let x = history.fetch_history(log("x"), HARD).await.unwrap();
        let y = history.fetch_history(log("y"), HARD).await.unwrap();
        assert_eq!(x[0].get_str("v"), Some("x"));
        assert_eq!(y[0].get_str("v"), Some("y"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_and_busy_logs_resolve_independently() {
        let (network, history, _writer) = setup();
        network.inject(log("busy"), &document(json!({"n": 1})), 10).unwrap();

        let started = Instant::now();
        let (busy, quiet) = tokio::join!(
            async {
                let out = history.fetch_history(log("busy"), HARD).await;
                (out, started.elapsed())
            },
            async {
                let out = history.fetch_history(log("quiet"), HARD).await;
                (out, started.elapsed())
            },
        );

        assert_eq!(busy.0.unwrap().len(), 1);
        assert!(busy.1 < Duration::from_secs(2));
        assert!(matches!(quiet.0, Err(LedgerError::HistoryTimeout { .. })));
        assert!(quiet.1 >= Duration::from_secs(10));
    }
}
