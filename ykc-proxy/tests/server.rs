//! End-to-end tests against a real listener

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use ykc_proxy::ykc_proto::{
    DeviceLogin, Header, Heartbeat, Message, RemoteRebootRequest, RemoteRebootResponse,
    Verification, VerificationResponse, LOGIN_ACK,
};
use ykc_proxy::{ChannelForwarder, Options, OutboundCommand, ProxyConfig, ProxyServer, Registry};

const PILE: &str = "32010200000001";

async fn start(
    options: Options,
    read_timeout: Option<Duration>,
) -> (ProxyServer, std::net::SocketAddr) {
    let config = ProxyConfig::new("127.0.0.1:0".parse().unwrap())
        .with_read_timeout(read_timeout)
        .with_options(options);
    let server = ProxyServer::from_config(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    (server, addr)
}

fn verification() -> Verification {
    Verification {
        header: Header::new(1, false),
        id: PILE.into(),
        elc_type: 0,
        guns: 1,
        protocol_version: 0x0A,
        software_version: "V1".into(),
        network: 0,
        sim: "00000000000000000000".into(),
        operator: 0,
    }
}

async fn read_exact(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    tokio::time::timeout(Duration::from_secs(2), stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for reply")
        .unwrap();
    buf
}

async fn wait_until(registry: &Registry, pred: impl Fn(&Registry) -> bool) {
    for _ in 0..100 {
        if pred(registry) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_verification_roundtrip_over_tcp() {
    let (server, addr) = start(Options::new().with_auto_verification(true), None).await;
    let registry = server.registry();
    let handle = server.shutdown_handle();
    let task = tokio::spawn(server.run());

    let mut pile = TcpStream::connect(addr).await.unwrap();
    pile.write_all(&verification().encode().unwrap()).await.unwrap();

    let expected = VerificationResponse {
        header: Header::auto_response(),
        id: PILE.into(),
        result: true,
    }
    .encode()
    .unwrap();
    assert_eq!(read_exact(&mut pile, expected.len()).await, expected);
    assert!(registry.get(PILE).is_ok());

    handle.shutdown();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_garbage_and_split_frames() {
    let (server, addr) = start(Options::new(), None).await;
    tokio::spawn(server.run());

    let mut station = TcpStream::connect(addr).await.unwrap();
    let heartbeat = Heartbeat {
        header: Header::default(),
        signal_value: 10,
        temperature: 20,
        port_status: vec![0],
    }
    .encode()
    .unwrap();

    // noise, then the frame in two writes
    station.write_all(&[0x00, 0xFF, 0x13]).await.unwrap();
    station.write_all(&heartbeat[..3]).await.unwrap();
    station.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    station.write_all(&heartbeat[3..]).await.unwrap();

    assert_eq!(
        read_exact(&mut station, 7).await,
        vec![0x5A, 0xA5, 0x04, 0x00, 0x82, 0x00, 0x86]
    );
}

#[tokio::test]
async fn test_login_forwarded_and_acked() {
    let (forwarder, mut forwarded) = ChannelForwarder::new();
    let (server, addr) = start(Options::new().with_forwarder(Arc::new(forwarder)), None).await;
    tokio::spawn(server.run());

    let login = DeviceLogin {
        header: Header::default(),
        imei: "860123456789012".into(),
        device_port_count: 2,
        hardware_version: "HW".into(),
        software_version: "SW".into(),
        ccid: "89860000000000000000".into(),
        signal_value: 18,
        login_reason: 1,
    };

    let mut station = TcpStream::connect(addr).await.unwrap();
    station.write_all(&login.encode().unwrap()).await.unwrap();

    assert_eq!(read_exact(&mut station, LOGIN_ACK.len()).await, LOGIN_ACK.to_vec());
    let (topic, payload) = forwarded.recv().await.unwrap();
    assert_eq!(topic, "81");
    assert_eq!(payload["ccid"], "89860000000000000000");
}

#[tokio::test]
async fn test_admin_command_reaches_pile_and_reply_is_forwarded() {
    let (forwarder, mut forwarded) = ChannelForwarder::new();
    let (server, addr) = start(Options::new().with_forwarder(Arc::new(forwarder)), None).await;
    let outbound = server.dispatcher().outbound().clone();
    tokio::spawn(server.run());

    let mut pile = TcpStream::connect(addr).await.unwrap();
    pile.write_all(&verification().encode().unwrap()).await.unwrap();
    let (topic, _) = forwarded.recv().await.unwrap();
    assert_eq!(topic, "01");

    let command = OutboundCommand::from_json(
        br#"{"command": "remote_reboot", "header": {"sequence": 77, "encrypted": false}, "id": "32010200000001", "control": 1}"#,
    )
    .unwrap();
    outbound.execute(&command).await.unwrap();

    let expected = RemoteRebootRequest {
        header: Header::new(77, false),
        id: PILE.into(),
        control: 1,
    }
    .encode()
    .unwrap();
    assert_eq!(read_exact(&mut pile, expected.len()).await, expected);

    let reply = RemoteRebootResponse {
        header: Header::new(77, false),
        id: PILE.into(),
        result: 1,
    };
    pile.write_all(&reply.encode().unwrap()).await.unwrap();
    let (topic, payload) = forwarded.recv().await.unwrap();
    assert_eq!(topic, "91");
    assert_eq!(payload["result"], 1);
}

#[tokio::test]
async fn test_disconnect_evicts_registration() {
    let (server, addr) = start(Options::new().with_auto_verification(true), None).await;
    let registry = server.registry();
    tokio::spawn(server.run());

    let mut pile = TcpStream::connect(addr).await.unwrap();
    pile.write_all(&verification().encode().unwrap()).await.unwrap();
    wait_until(&registry, |r| r.get(PILE).is_ok()).await;

    drop(pile);
    wait_until(&registry, |r| r.is_empty()).await;
}

#[tokio::test]
async fn test_reconnect_keeps_newest_connection() {
    let (server, addr) = start(Options::new().with_auto_verification(true), None).await;
    let registry = server.registry();
    tokio::spawn(server.run());

    let mut first = TcpStream::connect(addr).await.unwrap();
    first.write_all(&verification().encode().unwrap()).await.unwrap();
    wait_until(&registry, |r| r.get(PILE).is_ok()).await;
    let first_id = registry.get(PILE).unwrap().id();

    let mut second = TcpStream::connect(addr).await.unwrap();
    second.write_all(&verification().encode().unwrap()).await.unwrap();
    wait_until(&registry, |r| r.get(PILE).map(|c| c.id() != first_id).unwrap_or(false)).await;
    let second_id = registry.get(PILE).unwrap().id();

    // the superseded socket closing must not unregister the pile
    drop(first);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.get(PILE).unwrap().id(), second_id);
    drop(second);
}

#[tokio::test]
async fn test_idle_connection_times_out() {
    let (server, addr) = start(
        Options::new().with_auto_verification(true),
        Some(Duration::from_millis(100)),
    )
    .await;
    let registry = server.registry();
    tokio::spawn(server.run());

    let mut pile = TcpStream::connect(addr).await.unwrap();
    pile.write_all(&verification().encode().unwrap()).await.unwrap();
    wait_until(&registry, |r| r.get(PILE).is_ok()).await;

    // proxy closes its side once idle
    wait_until(&registry, |r| r.is_empty()).await;
    let mut rest = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(2), pile.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap();
    // only the auto-response was ever written
    assert_eq!(n, 18);
}
