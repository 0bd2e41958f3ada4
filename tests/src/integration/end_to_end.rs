//! # End-to-End Flows
//!
//! Two independent `Ledger` clients over one network: everything one of them
//! writes must be reconstructable by the other from the logs alone.

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use podium_ledger::domain::document;
    use podium_ledger::{
        Address, InMemoryLedger, InMemoryObjectStore, InMemoryUserDirectory, Ledger, LedgerConfig,
        LedgerError,
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Two clients sharing one ledger network but nothing else.
    fn two_clients() -> (Arc<InMemoryLedger>, Ledger, Ledger) {
        let network = Arc::new(InMemoryLedger::new());
        let client = |network: Arc<InMemoryLedger>| {
            Ledger::new(
                LedgerConfig::for_testing(),
                network,
                Arc::new(InMemoryObjectStore::new()),
                Arc::new(InMemoryUserDirectory::new()),
            )
        };
        (network.clone(), client(network.clone()), client(network))
    }

    // =============================================================================
    // USERS, PROFILES AND POSTS
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_user_profile_and_long_post_seen_by_second_client() {
        let (_network, writer, reader) = two_clients();

        let alice = writer.create_user("alice", "correct horse").await.unwrap();
        alice
            .update_profile(document(json!({"name": "Alice", "bio": "first"})))
            .await
            .unwrap();
        alice
            .update_profile(document(json!({"bio": "second"})))
            .await
            .unwrap();
        let text: String = (0..300).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let post = alice.create_post(&text, &[], None).await.unwrap();

        // The reader has never seen alice; it only knows her id.
        let address = reader.is_user("alice").await.unwrap().unwrap();
        assert_eq!(address, alice.address());
        let view = reader.user(address);

        let profile = view.profile().await.unwrap();
        assert_eq!(profile["id"], json!("alice"));
        assert_eq!(profile["name"], json!("Alice"));
        assert_eq!(profile["bio"], json!("second"));

        assert_eq!(view.balance().await.unwrap(), 1000 - 318);
        let posts = view.post_index().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts.contains(&post.address()));

        let content = reader.post(post.address()).content().await.unwrap();
        assert_eq!(content.text.as_deref(), Some(text.as_str()));
        assert_eq!(content.entries, 3);
        assert!(!content.incomplete);
        assert_eq!(content.author(), Some(address));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_client_signs_in_with_passphrase() {
        let (_network, writer, reader) = two_clients();
        let alice = writer.create_user("alice", "pw").await.unwrap();

        let again = reader.sign_in("alice", "pw").await.unwrap();
        assert_eq!(again.address(), alice.address());
        again.create_post("from the other client", &[], None).await.unwrap();
        assert_eq!(alice.post_index().await.unwrap().len(), 1);

        assert_eq!(
            reader.sign_in("alice", "nope").await.unwrap_err(),
            LedgerError::InvalidCredentials
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_conversation_thread() {
        let (_network, writer, reader) = two_clients();
        let alice = writer.create_user("alice", "pw").await.unwrap();
        let bob = reader.create_user("bob", "pw").await.unwrap();

        bob.follow(alice.address()).await.unwrap();
        let root = alice.create_post("what do you think?", &[], None).await.unwrap();
        let reply = bob
            .create_post("looks good", &[alice.address()], Some(root.address()))
            .await
            .unwrap();
        let nested = alice
            .create_post("thanks", &[], Some(reply.address()))
            .await
            .unwrap();

        let nested = reader.post(nested.address()).content().await.unwrap();
        assert_eq!(nested.depth(), 2);
        assert_eq!(nested.origin(), Some(root.address()));
        assert!(writer
            .post(root.address())
            .reply_index()
            .await
            .unwrap()
            .contains(&reply.address()));

        // Alice: one follow alert and one reply alert, newest first.
        let alerts = alice.alerts().await.unwrap();
        let kinds: Vec<_> = alerts.iter().filter_map(|a| a.get_str("type")).collect();
        assert_eq!(kinds, vec!["reply", "follow"]);
        // Bob: one reply alert from alice.
        assert_eq!(bob.alerts().await.unwrap().len(), 1);

        assert!(alice.followers().await.unwrap().contains(&bob.address()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_payments_between_clients() {
        let (_network, writer, reader) = two_clients();
        let alice = writer.create_user("alice", "pw").await.unwrap();
        let bob = reader.create_user("bob", "pw").await.unwrap();

        alice.create_transaction(bob.address(), 250).await.unwrap();
        bob.create_transaction(alice.address(), 50).await.unwrap();

        assert_eq!(reader.user(alice.address()).balance().await.unwrap(), 800);
        assert_eq!(writer.user(bob.address()).balance().await.unwrap(), 1200);
        let history = bob.transactions().await.unwrap();
        let values: Vec<_> = history.iter().filter_map(|r| r.get_i64("value")).collect();
        assert_eq!(values, vec![1000, 250, -50]);
    }

    // =============================================================================
    // LIVE WATCHES
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_watch_sees_posts_from_other_client() {
        let (_network, writer, reader) = two_clients();
        let alice = writer.create_user("alice", "pw").await.unwrap();

        let seen: Arc<Mutex<Vec<Address>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = reader
            .user(alice.address())
            .on_post(move |post| sink.lock().push(post))
            .await
            .unwrap();

        let first = alice.create_post("one", &[], None).await.unwrap();
        let second = alice.create_post("two", &[], None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*seen.lock(), vec![first.address(), second.address()]);
        assert!(reader.subscriptions().is_open(&handle.address()));

        reader.clean_up();
        assert!(reader.subscriptions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_watch_on_post() {
        let (_network, writer, reader) = two_clients();
        let alice = writer.create_user("alice", "pw").await.unwrap();
        let bob = reader.create_user("bob", "pw").await.unwrap();
        let root = alice.create_post("thread", &[], None).await.unwrap();

        let replies: Arc<Mutex<Vec<Address>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = replies.clone();
        writer
            .post(root.address())
            .on_reply(move |reply| sink.lock().push(reply))
            .await
            .unwrap();

        let reply = bob
            .create_post("me too", &[], Some(root.address()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*replies.lock(), vec![reply.address()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_watch_expires() {
        let (_network, writer, reader) = two_clients();
        let alice = writer.create_user("alice", "pw").await.unwrap();
        let handle = reader
            .user(alice.address())
            .on_transaction(|_| {})
            .await
            .unwrap();
        assert!(reader.subscriptions().is_open(&handle.address()));

        // Activity keeps it alive.
        tokio::time::sleep(Duration::from_secs(4)).await;
        alice.mint(1).await.unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(reader.subscriptions().is_open(&handle.address()));

        // Quiet for the whole lifetime closes it.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!reader.subscriptions().is_open(&handle.address()));
        assert!(reader.timers().is_empty());
    }
}
