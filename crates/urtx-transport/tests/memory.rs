use std::net::SocketAddr;

use urtx_transport::{ConnectionError, ConnectionTransport, MemoryTransport};

fn host() -> SocketAddr {
    "127.0.0.1:4000".parse().unwrap()
}

async fn established() -> (MemoryTransport, MemoryTransport) {
    let (a, b) = MemoryTransport::pair();
    a.establish(host()).await.unwrap();
    b.establish(host()).await.unwrap();
    (a, b)
}

#[tokio::test]
async fn test_memory_pair_moves_bytes() {
    let (a, b) = established().await;

    a.write_all(&[0xA5, 0x01, 0xFF, 0xFE]).await.unwrap();
    assert_eq!(b.read_exact(2).await.unwrap().unwrap(), vec![0xA5, 0x01]);
    assert_eq!(b.read_exact(2).await.unwrap().unwrap(), vec![0xFF, 0xFE]);

    b.write_all(b"ok").await.unwrap();
    assert_eq!(a.read_exact(2).await.unwrap().unwrap(), b"ok");
}

#[tokio::test]
async fn test_memory_establish_echoes_host() {
    let (a, _b) = MemoryTransport::pair();
    let peer = a.establish(host()).await.unwrap();
    assert_eq!(peer.addr, host());
}

#[tokio::test]
async fn test_memory_second_establish_is_refused() {
    let (a, _b) = MemoryTransport::pair();
    a.establish(host()).await.unwrap();

    let err = a.establish(host()).await.unwrap_err();
    assert!(matches!(err, ConnectionError::Refused(_)));
}

#[tokio::test]
async fn test_memory_close_ends_peer_stream() {
    let (a, b) = established().await;

    a.close().await;

    assert!(b.read_exact(1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_concurrent_writes_do_not_interleave() {
    let (a, b) = established().await;
    let a = std::sync::Arc::new(a);

    let mut tasks = Vec::new();
    for byte in 0u8..8 {
        let a = std::sync::Arc::clone(&a);
        tasks.push(tokio::spawn(async move {
            a.write_all(&[byte; 64]).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for _ in 0..8 {
        let chunk = b.read_exact(64).await.unwrap().unwrap();
        assert!(chunk.iter().all(|&x| x == chunk[0]), "interleaved write: {chunk:?}");
    }
}
