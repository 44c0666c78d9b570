use super::*;

const NEXT_HASH: &str = "00000000000000000000000000000000000000000000000000000000000a11ce";

#[track_caller]
fn assert_rejected(result: Result<(), ClientError>, code: i32) {
    match result {
        Err(ClientError::Rejected { error, .. }) => assert_eq!(error.error_code, code, "{error}"),
        other => panic!("expected rejection with code {code}, got {other:?}"),
    }
}

/// Subscribes and authorizes `username`, returning the first job's notify params.
async fn ready(pool: &TestPool, username: &str) -> (Client, Value) {
    let mut client = pool.connect(username).await;

    client.subscribe("test-miner/1.0").await.unwrap();
    client.authorize().await.unwrap();

    notification(&mut client, "mining.set_target").await;
    let notify = notification(&mut client, "mining.notify").await;

    (client, notify)
}

struct Reject;

#[async_trait]
impl Authorizer for Reject {
    async fn authorize(&self, worker: &StratumWorker) -> anyhow::Result<()> {
        anyhow::bail!("{} is banned", worker.name())
    }
}

#[tokio::test]
#[timeout(30000)]
async fn startup_publishes_first_job() {
    let mut pool = TestPool::start(MockVerifier::block()).await;

    let Event::NewBlock { height, .. } = pool.event(|event| matches!(event, Event::NewBlock { .. })).await
    else {
        unreachable!()
    };
    assert_eq!(height, 163_245);

    let Event::Started { address } = pool.event(|event| matches!(event, Event::Started { .. })).await
    else {
        unreachable!()
    };
    assert_eq!(address, pool.handle.local_addr());

    assert!(!pool.daemon.calls("getblocktemplate").is_empty());

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn unreachable_daemon() {
    let err = Pool::new(mock::config(), Arc::new(MockDaemon::unreachable()))
        .start(CancellationToken::new())
        .await
        .err()
        .unwrap();

    assert_eq!(err.to_string(), "Daemon not ready.");
}

#[tokio::test]
#[timeout(30000)]
async fn invalid_coinbase_address() {
    for address in ["not-an-address", "TSomethingTheDaemonRejects"] {
        let daemon = Arc::new(MockDaemon::new());

        let err = Pool::new(
            PoolConfig {
                address: Some(address.into()),
                ..mock::config()
            },
            daemon.clone(),
        )
        .start(CancellationToken::new())
        .await
        .err()
        .unwrap();

        assert_eq!(err.to_string(), "Invalid coinbase address");
    }
}

#[tokio::test]
#[timeout(30000)]
async fn non_positive_start_difficulty() {
    assert!(
        Pool::new(
            PoolConfig {
                start_difficulty: 0.0,
                ..mock::config()
            },
            Arc::new(MockDaemon::new()),
        )
        .start(CancellationToken::new())
        .await
        .is_err()
    );
}

#[tokio::test]
#[timeout(30000)]
async fn subscribe_assigns_extranonce() {
    let mut pool = TestPool::start(MockVerifier::block()).await;

    let mut client = pool.connect("miner.rig1").await;
    let subscription = client.subscribe("test-miner/1.0").await.unwrap();

    assert_eq!(subscription.extranonce1.as_bytes().len(), 8);
    assert_eq!(subscription.subscription_id.as_bytes().len(), 16);

    let mut other = pool.connect("miner.rig2").await;
    let second = other.subscribe("test-miner/1.0").await.unwrap();

    assert_ne!(subscription.extranonce1, second.extranonce1);

    pool.event(|event| matches!(event, Event::ClientConnected { .. }))
        .await;

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn block_is_submitted_and_confirmed() {
    let mut pool = TestPool::start(MockVerifier::block()).await;

    let (mut client, notify) = ready(&pool, "miner.rig1").await;

    pretty_assert_eq!(notify[8], json!(true));

    client
        .submit(&submission("miner.rig1", &notify, 1))
        .await
        .unwrap();

    let Event::ShareSubmitted {
        share,
        valid_share,
        valid_block,
        tx_hash,
        block_accept_error,
    } = pool
        .event(|event| matches!(event, Event::ShareSubmitted { .. }))
        .await
    else {
        unreachable!()
    };

    assert!(valid_share);
    assert!(valid_block);
    pretty_assert_eq!(tx_hash, Some(mock::COINBASE_TXID.to_string()));
    pretty_assert_eq!(block_accept_error, None);
    assert_eq!(share.worker.name(), "miner.rig1");
    assert_eq!(share.worker.short_name(), "rig1");
    assert_eq!(share.height, Some(163_245));

    let submitted = pool.daemon.calls("submitblock");
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0][0].as_str(), share.block_hex.as_deref());

    let confirmed = pool.daemon.calls("getblock");
    assert_eq!(confirmed[0][0].as_str(), share.block_hash.as_deref());

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn daemon_rejects_block() {
    let mut pool = TestPool::start(MockVerifier::block()).await;
    pool.daemon.reject_blocks("high-hash");

    let (mut client, notify) = ready(&pool, "miner.rig1").await;

    client
        .submit(&submission("miner.rig1", &notify, 1))
        .await
        .unwrap();

    let Event::ShareSubmitted {
        valid_share,
        valid_block,
        tx_hash,
        block_accept_error,
        ..
    } = pool
        .event(|event| matches!(event, Event::ShareSubmitted { .. }))
        .await
    else {
        unreachable!()
    };

    assert!(valid_share);
    assert!(!valid_block);
    assert_eq!(tx_hash, None);
    assert_eq!(block_accept_error.as_deref(), Some("high-hash"));
    assert!(pool.daemon.calls("getblock").is_empty());

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn low_difficulty_and_duplicate_shares() {
    let mut pool = TestPool::start(MockVerifier::worthless()).await;

    let (mut client, notify) = ready(&pool, "miner.rig1").await;

    let share = submission("miner.rig1", &notify, 7);

    assert_rejected(client.submit(&share).await, 23);

    let Event::ShareSubmitted {
        valid_share,
        valid_block,
        share: rejected,
        ..
    } = pool
        .event(|event| matches!(event, Event::ShareSubmitted { .. }))
        .await
    else {
        unreachable!()
    };

    assert!(!valid_share);
    assert!(!valid_block);
    assert_eq!(rejected.error, Some(stratum::StratumError::LowDifficulty));

    assert_rejected(client.submit(&share).await, 22);

    assert!(pool.daemon.calls("submitblock").is_empty());

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn unknown_job_is_stale() {
    let pool = TestPool::start(MockVerifier::block()).await;

    let (mut client, notify) = ready(&pool, "miner.rig1").await;

    let share = Submit {
        job_id: "ffffff7f".parse().unwrap(),
        ..submission("miner.rig1", &notify, 1)
    };

    assert_rejected(client.submit(&share).await, 21);

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn submit_before_authorize() {
    let pool = TestPool::start(MockVerifier::block()).await;

    let mut client = pool.connect("miner.rig1").await;
    client.subscribe("test-miner/1.0").await.unwrap();

    let notify = json!([
        "01000000",
        "",
        "",
        "",
        [],
        "",
        "",
        hex::encode(mock::now().to_le_bytes()),
    ]);

    assert_rejected(
        client.submit(&submission("miner.rig1", &notify, 1)).await,
        24,
    );

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn rejected_worker_is_disconnected() {
    let mut pool = TestPool::start_with(MockVerifier::block(), Some(Arc::new(Reject))).await;

    let mut client = pool.connect("miner.rig1").await;
    client.subscribe("test-miner/1.0").await.unwrap();

    match client.authorize().await {
        Err(ClientError::Rejected { error, .. }) => {
            assert_eq!(error.error_code, 24);
            assert_eq!(error.message, "miner.rig1 is banned");
        }
        other => panic!("unexpected authorize result: {other:?}"),
    }

    let Event::ClientDisconnected { reason, .. } = pool
        .event(|event| matches!(event, Event::ClientDisconnected { .. }))
        .await
    else {
        unreachable!()
    };

    assert_eq!(reason, "Unauthorized");

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn new_block_sends_clean_job() {
    let mut pool = TestPool::start(MockVerifier::block()).await;

    let (mut client, first) = ready(&pool, "miner.rig1").await;

    pool.daemon.set_template(mock::template(NEXT_HASH, 163_246));

    let Event::NewBlock { height, .. } = pool
        .event(|event| matches!(event, Event::NewBlock { height: 163_246, .. }))
        .await
    else {
        unreachable!()
    };
    assert_eq!(height, 163_246);

    let next = notification(&mut client, "mining.notify").await;

    assert_ne!(next[0], first[0]);
    assert_ne!(next[1], first[1]);
    pretty_assert_eq!(next[8], json!(true));

    assert_rejected(
        client.submit(&submission("miner.rig1", &first, 1)).await,
        21,
    );

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn idle_job_is_rebroadcast() {
    let mut pool = TestPool::start_with_config(
        PoolConfig {
            rebroadcast_interval: Duration::from_millis(300),
            ..mock::config()
        },
        MockVerifier::block(),
        None,
    )
    .await;

    let (mut client, first) = ready(&pool, "miner.rig1").await;

    let Event::BroadcastJobs { clean_jobs, .. } = pool
        .event(|event| matches!(event, Event::BroadcastJobs { clean_jobs: false, .. }))
        .await
    else {
        unreachable!()
    };
    assert!(!clean_jobs);

    let next = notification(&mut client, "mining.notify").await;

    pretty_assert_eq!(next[8], json!(false));
    assert_eq!(next[1], first[1]);
    assert_ne!(next[0], first[0]);

    client
        .submit(&submission("miner.rig1", &first, 1))
        .await
        .unwrap();

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn difficulty_change_rides_along_with_next_job() {
    let mut pool = TestPool::start(MockVerifier::block()).await;

    let (mut client, _) = ready(&pool, "miner.rig1").await;

    let Event::ClientConnected {
        subscription_id, ..
    } = pool
        .event(|event| matches!(event, Event::ClientConnected { .. }))
        .await
    else {
        unreachable!()
    };

    assert_eq!(pool.handle.client_count(), 1);
    assert!(!pool.handle.set_difficulty("deadbeefcafebabe", 4.0));
    assert!(pool.handle.set_difficulty(&subscription_id, 4.0));

    pool.daemon.set_template(mock::template(NEXT_HASH, 163_246));

    let Message::Notification { method, .. } = client.incoming.recv().await.unwrap() else {
        panic!("expected a notification");
    };
    assert_eq!(method, "mining.set_target");

    let next = notification(&mut client, "mining.notify").await;
    pretty_assert_eq!(next[8], json!(true));

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn same_block_polls_do_not_rebroadcast() {
    let pool = TestPool::start(MockVerifier::block()).await;

    let (mut client, _) = ready(&pool, "miner.rig1").await;

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(pool.daemon.calls("getblocktemplate").len() > 2);

    assert!(
        tokio::time::timeout(
            Duration::from_millis(500),
            notification(&mut client, "mining.notify")
        )
        .await
        .is_err()
    );

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn malformed_message_disconnects() {
    let mut pool = TestPool::start(MockVerifier::block()).await;

    let mut client = pool.connect("miner.rig1").await;
    client.send_raw("{not json").await.unwrap();

    let Event::MalformedMessage { message, .. } = pool
        .event(|event| matches!(event, Event::MalformedMessage { .. }))
        .await
    else {
        unreachable!()
    };
    assert_eq!(message, "{not json");

    let Event::ClientDisconnected { reason, .. } = pool
        .event(|event| matches!(event, Event::ClientDisconnected { .. }))
        .await
    else {
        unreachable!()
    };
    assert_eq!(reason, "Malformed message");

    assert!(client.incoming.recv().await.is_none());

    pool.stop().await;
}

#[tokio::test]
#[timeout(30000)]
async fn stopping_disconnects_clients() {
    let mut pool = TestPool::start(MockVerifier::block()).await;

    let (mut client, _) = ready(&pool, "miner.rig1").await;

    pool.cancel.cancel();

    let Event::ClientDisconnected { reason, .. } = pool
        .event(|event| matches!(event, Event::ClientDisconnected { .. }))
        .await
    else {
        unreachable!()
    };
    assert_eq!(reason, "Server stopping");

    while client.incoming.recv().await.is_some() {}

    pool.handle.join().await.unwrap();
}
