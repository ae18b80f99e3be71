//! Integration tests for `ConnectionPool`: reuse, capacity, validation and
//! shutdown, against in-process TCP echo servers.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use framelink::{ConnectionPool, Payload, PoolConfig, PoolKey, TransportError};
use tokio::net::TcpListener;
use tokio::sync::Barrier;
use tokio::time::{sleep, timeout};

/// Helper to start a raw byte echo server; every accepted connection has its
/// input copied straight back to its output.
async fn start_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
    addr
}

/// Helper to find a local port with nothing listening on it.
async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn pool_with_capacity(max_per_key: usize) -> ConnectionPool {
    ConnectionPool::new(PoolConfig {
        max_per_key,
        ..Default::default()
    })
}

#[tokio::test]
async fn test_borrow_release_reuses_connection() {
    let addr = start_echo_server().await;
    let host = "127.0.0.1";
    let port = addr.port();
    let pool = ConnectionPool::new(PoolConfig::default());

    let first = pool.borrow(host, port).await.unwrap();
    let first_id = first.id();
    assert_eq!(pool.idle_count(host, port), 0);
    assert_eq!(pool.live_count(host, port), 1);

    pool.release(host, port, first).await;
    assert_eq!(pool.idle_count(host, port), 1);
    assert_eq!(pool.live_count(host, port), 1);

    let second = pool.borrow(host, port).await.unwrap();
    assert_eq!(second.id(), first_id);
    assert_eq!(pool.idle_count(host, port), 0);

    pool.release(host, port, second).await;
    pool.close().await;
}

#[tokio::test]
async fn test_concurrent_borrows_get_distinct_connections() {
    let addr = start_echo_server().await;
    let host = "127.0.0.1";
    let port = addr.port();
    let pool = ConnectionPool::new(PoolConfig::default());

    let first = pool.borrow(host, port).await.unwrap();
    let second = pool.borrow(host, port).await.unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(pool.live_count(host, port), 2);

    // Both borrows are independently usable.
    for connection in [&first, &second] {
        connection
            .write_frame(&Payload::Text("ping".to_owned()), true)
            .await
            .unwrap();
        let frame = timeout(Duration::from_secs(5), connection.read_frame())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&frame[..], b"ping");
    }

    pool.release(host, port, first).await;
    pool.release(host, port, second).await;
    assert_eq!(pool.idle_count(host, port), 2);

    pool.close().await;
}

#[tokio::test]
async fn test_concurrent_tasks_hold_distinct_connections_up_to_cap() {
    let addr = start_echo_server().await;
    let host = "127.0.0.1";
    let port = addr.port();
    let pool = Arc::new(pool_with_capacity(4));
    let barrier = Arc::new(Barrier::new(4));

    // Four tasks borrow in parallel; the barrier only opens once every one
    // of them holds a connection at the same time.
    let mut tasks = Vec::new();
    for _ in 0..4 {
        let pool = pool.clone();
        let barrier = barrier.clone();
        tasks.push(tokio::spawn(async move {
            let connection = pool
                .borrow_with_timeout(host, port, Duration::from_secs(5))
                .await
                .unwrap();
            barrier.wait().await;
            connection
        }));
    }

    let mut held = Vec::new();
    for task in tasks {
        held.push(task.await.unwrap());
    }
    let ids: HashSet<u64> = held.iter().map(|connection| connection.id()).collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(pool.live_count(host, port), 4);

    // At capacity, a fifth borrow waits out its timeout.
    let result = pool
        .borrow_with_timeout(host, port, Duration::from_millis(100))
        .await;
    assert!(matches!(result, Err(TransportError::PoolExhausted(_, _))));

    for connection in held {
        pool.release(host, port, connection).await;
    }
    assert_eq!(pool.idle_count(host, port), 4);

    pool.close().await;
}

#[tokio::test]
async fn test_separate_destinations_get_separate_connections() {
    let addr_a = start_echo_server().await;
    let addr_b = start_echo_server().await;
    let host = "127.0.0.1";
    let pool = ConnectionPool::new(PoolConfig::default());

    let from_a = pool.borrow(host, addr_a.port()).await.unwrap();
    let from_b = pool.borrow(host, addr_b.port()).await.unwrap();
    assert_ne!(from_a.id(), from_b.id());
    assert_eq!(from_a.pool_key(), PoolKey::new(host, addr_a.port()));
    assert_eq!(from_b.pool_key(), PoolKey::new(host, addr_b.port()));
    assert_eq!(pool.live_count(host, addr_a.port()), 1);
    assert_eq!(pool.live_count(host, addr_b.port()), 1);

    pool.release(host, addr_a.port(), from_a).await;
    pool.release(host, addr_b.port(), from_b).await;
    assert_eq!(pool.idle_count(host, addr_a.port()), 1);
    assert_eq!(pool.idle_count(host, addr_b.port()), 1);

    pool.close().await;
}

#[tokio::test]
async fn test_borrow_times_out_when_capacity_is_exhausted() {
    let addr = start_echo_server().await;
    let host = "127.0.0.1";
    let port = addr.port();
    let pool = pool_with_capacity(1);

    let held = pool.borrow(host, port).await.unwrap();

    let borrow_timeout = Duration::from_millis(150);
    let result = pool.borrow_with_timeout(host, port, borrow_timeout).await;
    assert!(matches!(
        result,
        Err(TransportError::PoolExhausted(ref key, waited))
            if *key == PoolKey::new(host, port) && waited == borrow_timeout
    ));

    pool.release(host, port, held).await;
    pool.close().await;
}

#[tokio::test]
async fn test_release_unblocks_waiting_borrow() {
    let addr = start_echo_server().await;
    let host = "127.0.0.1";
    let port = addr.port();
    let pool = Arc::new(pool_with_capacity(1));

    let held = pool.borrow(host, port).await.unwrap();
    let held_id = held.id();

    let releaser = pool.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        releaser.release(host, port, held).await;
    });

    // The waiter parks on capacity until the release above frees it.
    let reused = pool
        .borrow_with_timeout(host, port, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(reused.id(), held_id);

    pool.release(host, port, reused).await;
    pool.close().await;
}

#[tokio::test]
async fn test_invalidate_destroys_connection() {
    let addr = start_echo_server().await;
    let host = "127.0.0.1";
    let port = addr.port();
    let pool = pool_with_capacity(1);

    let first = pool.borrow(host, port).await.unwrap();
    let first_id = first.id();
    pool.invalidate(host, port, first.clone()).await;

    assert!(first.is_closed());
    assert_eq!(pool.live_count(host, port), 0);
    assert_eq!(pool.idle_count(host, port), 0);

    // The freed capacity admits a replacement, never the dead connection.
    let replacement = pool
        .borrow_with_timeout(host, port, Duration::from_secs(2))
        .await
        .unwrap();
    assert_ne!(replacement.id(), first_id);
    assert!(!replacement.is_closed());

    pool.release(host, port, replacement).await;
    pool.close().await;
}

#[tokio::test]
async fn test_borrow_replaces_dead_idle_connection() {
    let addr = start_echo_server().await;
    let host = "127.0.0.1";
    let port = addr.port();
    let pool = ConnectionPool::new(PoolConfig::default());

    let first = pool.borrow(host, port).await.unwrap();
    let first_id = first.id();
    let kept = first.clone();
    pool.release(host, port, first).await;

    // The idle connection dies while pooled.
    kept.close().await;

    let second = pool.borrow(host, port).await.unwrap();
    assert_ne!(second.id(), first_id);
    assert!(!second.is_closed());
    assert_eq!(pool.live_count(host, port), 1);

    pool.release(host, port, second).await;
    pool.close().await;
}

#[tokio::test]
async fn test_release_under_wrong_key_destroys_connection() {
    let addr_a = start_echo_server().await;
    let addr_b = start_echo_server().await;
    let host = "127.0.0.1";
    let pool = pool_with_capacity(1);

    let from_a = pool.borrow(host, addr_a.port()).await.unwrap();
    let kept = from_a.clone();

    // Returned under the wrong destination: never pooled there, destroyed.
    pool.release(host, addr_b.port(), from_a).await;
    assert!(kept.is_closed());
    assert_eq!(pool.idle_count(host, addr_a.port()), 0);
    assert_eq!(pool.idle_count(host, addr_b.port()), 0);
    assert_eq!(pool.live_count(host, addr_a.port()), 0);

    // The capacity under the true key was repaired.
    let replacement = pool
        .borrow_with_timeout(host, addr_a.port(), Duration::from_secs(2))
        .await
        .unwrap();
    pool.release(host, addr_a.port(), replacement).await;

    pool.close().await;
}

#[tokio::test]
async fn test_prewarm_fills_idle_connections() {
    let addr = start_echo_server().await;
    let host = "127.0.0.1";
    let port = addr.port();
    let pool = ConnectionPool::new(PoolConfig {
        min_idle_per_key: 3,
        ..Default::default()
    });

    pool.prewarm(host, port).await.unwrap();
    assert_eq!(pool.idle_count(host, port), 3);
    assert_eq!(pool.live_count(host, port), 3);

    // Prewarming again is a no-op at the target.
    pool.prewarm(host, port).await.unwrap();
    assert_eq!(pool.idle_count(host, port), 3);

    let borrowed = pool.borrow(host, port).await.unwrap();
    assert_eq!(pool.idle_count(host, port), 2);
    assert_eq!(pool.live_count(host, port), 3);

    pool.release(host, port, borrowed).await;
    pool.close().await;
}

#[tokio::test]
async fn test_prewarm_respects_per_key_cap() {
    let addr = start_echo_server().await;
    let host = "127.0.0.1";
    let port = addr.port();
    let pool = ConnectionPool::new(PoolConfig {
        max_per_key: 2,
        min_idle_per_key: 2,
        ..Default::default()
    });

    let held = pool.borrow(host, port).await.unwrap();

    // With one borrow outstanding there is room for a single idle
    // connection; the idle target must not push the total past the cap.
    pool.prewarm(host, port).await.unwrap();
    assert_eq!(pool.idle_count(host, port), 1);
    assert_eq!(pool.live_count(host, port), 2);

    pool.release(host, port, held).await;
    pool.close().await;
}

#[tokio::test]
async fn test_failed_open_returns_capacity() {
    let port = unused_port().await;
    let host = "127.0.0.1";
    let pool = pool_with_capacity(1);

    let first = pool
        .borrow_with_timeout(host, port, Duration::from_millis(500))
        .await;
    assert!(matches!(
        first,
        Err(TransportError::CannotEstablishConnection(_))
    ));

    // A leaked permit would turn this into PoolExhausted.
    let second = pool
        .borrow_with_timeout(host, port, Duration::from_millis(500))
        .await;
    assert!(matches!(
        second,
        Err(TransportError::CannotEstablishConnection(_))
    ));

    pool.close().await;
}

#[tokio::test]
async fn test_close_destroys_borrowed_and_idle_connections() {
    let addr = start_echo_server().await;
    let host = "127.0.0.1";
    let port = addr.port();
    let pool = ConnectionPool::new(PoolConfig::default());

    let borrowed = pool.borrow(host, port).await.unwrap();
    let idle = pool.borrow(host, port).await.unwrap();
    let idle_kept = idle.clone();
    pool.release(host, port, idle).await;
    assert_eq!(pool.idle_count(host, port), 1);

    pool.close().await;
    assert!(pool.is_closed());
    assert!(borrowed.is_closed());
    assert!(idle_kept.is_closed());
    assert_eq!(pool.idle_count(host, port), 0);
    assert_eq!(pool.live_count(host, port), 0);

    let result = pool.borrow(host, port).await;
    assert!(matches!(result, Err(TransportError::PoolClosed)));

    // Returning a borrow after close destroys it quietly.
    pool.release(host, port, borrowed).await;
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let addr = start_echo_server().await;
    let pool = ConnectionPool::new(PoolConfig::default());

    let connection = pool.borrow("127.0.0.1", addr.port()).await.unwrap();
    pool.release("127.0.0.1", addr.port(), connection).await;

    pool.close().await;
    pool.close().await;
    assert!(pool.is_closed());
}

#[tokio::test]
async fn test_waiting_borrow_fails_fast_on_close() {
    let addr = start_echo_server().await;
    let host = "127.0.0.1";
    let port = addr.port();
    let pool = Arc::new(pool_with_capacity(1));

    let held = pool.borrow(host, port).await.unwrap();

    let closer = pool.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        closer.close().await;
    });

    // The waiter must not sit out its full timeout once the pool closes.
    let started = tokio::time::Instant::now();
    let result = pool
        .borrow_with_timeout(host, port, Duration::from_secs(30))
        .await;
    assert!(matches!(result, Err(TransportError::PoolClosed)));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(held.is_closed());
}
