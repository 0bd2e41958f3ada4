//! # Node Flows
//!
//! A launched node serving client sessions through the RPC dispatcher.

#[cfg(test)]
mod tests {
    use podium_ledger::rpc::{RpcDispatcher, Session};
    use podium_node::{Node, NodeConfig, RunningNode};
    use serde_json::{json, Value};
    use std::time::Duration;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn launch() -> RunningNode {
        Node::in_memory(NodeConfig::for_testing())
            .launch(false)
            .await
            .unwrap()
    }

    async fn call(rpc: &RpcDispatcher, session: &mut Session, method: &str, args: Value) -> Value {
        rpc.dispatch(method, args, session)
            .await
            .unwrap_or_else(|e| panic!("`{method}` failed: {e}"))
    }

    async fn signed_up(rpc: &RpcDispatcher, id: &str) -> (Session, Value) {
        let mut session = Session::new();
        call(rpc, &mut session, "create user", json!({"identity": id, "passphrase": "pw"})).await;
        let credentials = call(
            rpc,
            &mut session,
            "sign in",
            json!({"identity": id, "passphrase": "pw"}),
        )
        .await;
        (session, credentials)
    }

    // =============================================================================
    // RPC SESSIONS ON A LAUNCHED NODE
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_new_user_follows_root_and_reads_first_post() {
        let node = launch().await;
        let rpc = node.dispatcher();
        let root = node.root().address().to_hex();

        let (mut session, _) = signed_up(rpc, "carol").await;
        call(rpc, &mut session, "follow", json!({"address": root})).await;

        let posts = call(rpc, &mut session, "index posts", json!({"address": root})).await;
        let first = posts[0].clone();
        let loaded = call(rpc, &mut session, "load post", json!({"address": first})).await;
        assert_eq!(loaded["content"]["text"], json!("Welcome to Podium"));

        let followers = call(rpc, &mut session, "index followers", json!({"address": root})).await;
        assert_eq!(followers.as_array().map(Vec::len), Some(1));

        let profile = call(rpc, &mut session, "load profile", json!({"address": root})).await;
        assert_eq!(profile["profile"]["name"], json!("Podium"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_delivers_across_sessions() {
        let node = launch().await;
        let rpc = node.dispatcher();
        let mut events = rpc.feed_events();

        let (mut reader, _) = signed_up(rpc, "reader").await;
        let (mut author, author_credentials) = signed_up(rpc, "author").await;
        call(rpc, &mut reader, "follow", json!({"address": author_credentials["address"]})).await;
        let feed = call(rpc, &mut reader, "feed", json!({})).await;
        assert_eq!(feed.as_array().map(Vec::len), Some(2));

        let post = call(rpc, &mut author, "create post", json!({"text": "fresh"})).await;
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(json!(event.post.to_hex()), post["address"]);
        assert_eq!(json!(event.author.to_hex()), author_credentials["address"]);

        let closed = call(rpc, &mut reader, "close feed", json!({})).await;
        assert_eq!(closed["closed"], json!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_root_pays_new_user() {
        let node = launch().await;
        let rpc = node.dispatcher();
        let (mut session, credentials) = signed_up(rpc, "dave").await;

        node.root()
            .create_transaction(credentials["address"].as_str().unwrap().parse().unwrap(), 500)
            .await
            .unwrap();
        let balance = call(
            rpc,
            &mut session,
            "load balance",
            json!({"address": credentials["address"]}),
        )
        .await;
        assert_eq!(balance["balance"], json!(1500));

        let sent = call(
            rpc,
            &mut session,
            "create transaction",
            json!({"to": node.root().address().to_hex(), "value": 100}),
        )
        .await;
        assert_eq!(sent["value"], json!(-100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_root_id_is_taken() {
        let node = launch().await;
        let mut session = Session::new();
        let err = node
            .dispatcher()
            .dispatch(
                "create user",
                json!({"identity": "podium", "passphrase": "x"}),
                &mut session,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_feeds() {
        let node = launch().await;
        let rpc = node.dispatcher();
        let (mut session, _) = signed_up(rpc, "erin").await;
        call(rpc, &mut session, "feed", json!({})).await;
        assert!(!node.ledger().subscriptions().is_empty());

        node.shutdown();
        assert!(node.ledger().subscriptions().is_empty());
        assert!(node.is_shutting_down());
    }
}
