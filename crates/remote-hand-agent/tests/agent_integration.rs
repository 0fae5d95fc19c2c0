//! Integration tests exercising the full agent loop on loopback.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use remote_hand_agent::{Agent, AgentError, AgentState, AgentStatus, Config};
use remote_hand_input::mock::{Injected, MockCapture, MockPlatform, MockPlatformHandle};
use remote_hand_input::{InputEngine, KeyTarget};
use remote_hand_protocol::wire::{self, MAX_RESPONSE_SIZE};
use remote_hand_protocol::{AgentClient, FrameReader, ProtocolError};
use remote_hand_types::{MouseMotion, MousePosition, RawEvent, Request, Response};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to drive one running agent.
#[allow(dead_code)]
struct TestAgent {
    addr: SocketAddr,
    feed: mpsc::Sender<RawEvent>,
    platform: MockPlatformHandle,
    engine: InputEngine,
    status: watch::Receiver<AgentStatus>,
    shutdown: mpsc::Sender<()>,
    handle: JoinHandle<Result<(), AgentError>>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Start an agent on loopback whose mock platform echoes every injection
/// back through the mock capture, like a real host does.
async fn start_agent(release_on_disconnect: bool) -> TestAgent {
    init_tracing();

    let mut config = Config::default();
    config.server.address = "127.0.0.1".to_string();
    config.server.port = 0;
    config.input.release_on_disconnect = release_on_disconnect;

    let (capture, feed) = MockCapture::new();
    let platform = MockPlatform::new().with_echo(feed.clone());
    let platform_handle = platform.handle();

    let agent = Agent::bind(config, Arc::new(platform), Box::new(capture))
        .await
        .unwrap();
    let addr = agent.local_addr().unwrap();
    let engine = agent.engine().clone();
    let status = agent.status_receiver();
    let shutdown = agent.shutdown_sender();
    let handle = tokio::spawn(agent.run());

    TestAgent {
        addr,
        feed,
        platform: platform_handle,
        engine,
        status,
        shutdown,
        handle,
    }
}

/// Wait for a condition on a status receiver with timeout.
async fn wait_for_status(
    rx: &mut watch::Receiver<AgentStatus>,
    pred: impl Fn(&AgentStatus) -> bool,
) -> Result<AgentStatus, &'static str> {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            {
                let status = rx.borrow_and_update().clone();
                if pred(&status) {
                    return Ok(status);
                }
            }
            if rx.changed().await.is_err() {
                return Err("watch closed");
            }
        }
    })
    .await
    .map_err(|_| "timeout")?
}

/// Poll a condition until it holds or the timeout expires.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(TIMEOUT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn finish<F: Future>(handle: F) -> F::Output {
    tokio::time::timeout(TIMEOUT, handle)
        .await
        .expect("agent did not stop in time")
}

fn press(keys: &[&str]) -> Request {
    Request {
        press_keys: keys.iter().map(|k| (*k).to_string()).collect(),
        ..Request::default()
    }
}

fn get_keys() -> Request {
    Request {
        get_keys: true,
        ..Request::default()
    }
}

#[tokio::test]
async fn echoed_press_then_genuine_release_reports_no_keys() {
    let mut agent = start_agent(true).await;
    let mut client = AgentClient::connect(agent.addr).await.unwrap();

    client.request(&press(&["a"])).await.unwrap();
    // The echo comes back through capture and is consumed.
    wait_until(|| agent.engine.state().expected_key_downs("a") == 0).await;

    agent.feed.send(RawEvent::key_up("a")).await.unwrap();
    wait_until(|| agent.engine.state().pending_releases() == 1).await;

    let resp = client.request(&get_keys()).await.unwrap();
    assert_eq!(resp.pressed_keys, Some(Vec::new()));
    assert!(resp.image.is_none());
    assert!(resp.mouse.is_none());

    let status = wait_for_status(&mut agent.status, |s| s.requests_served == 2)
        .await
        .unwrap();
    assert_eq!(status.state, AgentState::Serving);

    agent.shutdown.send(()).await.unwrap();
    finish(agent.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn genuine_input_is_reported_and_echoes_are_not() {
    let agent = start_agent(true).await;
    let mut client = AgentClient::connect(agent.addr).await.unwrap();

    let mut req = press(&["b"]);
    req.mouse = MouseMotion::new(10, -5);
    client.request(&req).await.unwrap();
    wait_until(|| {
        agent.engine.state().expected_key_downs("b") == 0
            && agent.engine.state().pending_motions() == 0
    })
    .await;

    agent.feed.send(RawEvent::key_down("left shift")).await.unwrap();
    agent.feed.send(RawEvent::motion(3, 4)).await.unwrap();
    wait_until(|| agent.engine.is_user_active()).await;

    // The motion may still be in the capture channel; poll until it lands.
    let mut resp = Response::default();
    for _ in 0..50 {
        resp = client
            .request(&Request {
                get_keys: true,
                get_mouse: true,
                ..Request::default()
            })
            .await
            .unwrap();
        if resp.mouse != Some(MousePosition { x: 0, y: 0 }) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(resp.pressed_keys, Some(vec!["left shift".to_string()]));
    assert_eq!(resp.mouse, Some(MousePosition { x: 3, y: 4 }));

    agent.shutdown.send(()).await.unwrap();
    finish(agent.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn genuine_press_force_releases_synthetic_keys() {
    let agent = start_agent(true).await;
    let mut client = AgentClient::connect(agent.addr).await.unwrap();

    client.request(&press(&["shift", "mouse left"])).await.unwrap();
    wait_until(|| agent.engine.state().fake_keys().len() == 2).await;
    agent.platform.clear();

    agent.feed.send(RawEvent::key_down("q")).await.unwrap();
    wait_until(|| agent.engine.state().fake_keys().is_empty()).await;

    let releases = agent
        .platform
        .injected()
        .into_iter()
        .filter(|i| matches!(i, Injected::Key { down: false, .. }))
        .count();
    assert_eq!(releases, 2);

    agent.shutdown.send(()).await.unwrap();
    finish(agent.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn wheel_press_and_release_in_separate_requests_keep_override_usable() {
    let agent = start_agent(true).await;
    let mut client = AgentClient::connect(agent.addr).await.unwrap();

    client.request(&press(&["mouse up"])).await.unwrap();
    wait_until(|| {
        agent.engine.state().expected_key_downs("mouse up") == 0
            && agent.engine.state().expected_key_ups("mouse up") == 0
    })
    .await;
    client
        .request(&Request {
            release_keys: vec!["mouse up".to_string()],
            ..Request::default()
        })
        .await
        .unwrap();
    assert_eq!(agent.engine.state().expected_key_ups("mouse up"), 0);

    // The user scrolls once.
    agent.feed.send(RawEvent::key_down("mouse up")).await.unwrap();
    agent.feed.send(RawEvent::key_up("mouse up")).await.unwrap();
    wait_until(|| agent.engine.state().pending_releases() == 1).await;

    let resp = client.request(&get_keys()).await.unwrap();
    assert_eq!(resp.pressed_keys, Some(vec!["mouse up".to_string()]));
    assert!(!agent.engine.is_user_active());

    agent.platform.clear();
    let mut req = press(&["d"]);
    req.allow_user_override = true;
    client.request(&req).await.unwrap();
    assert_eq!(agent.platform.injected().len(), 1);

    agent.shutdown.send(()).await.unwrap();
    finish(agent.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn user_override_skips_injection_while_user_is_active() {
    let agent = start_agent(true).await;
    let mut client = AgentClient::connect(agent.addr).await.unwrap();

    agent.feed.send(RawEvent::key_down("left ctrl")).await.unwrap();
    wait_until(|| agent.engine.is_user_active()).await;

    let mut req = press(&["c"]);
    req.allow_user_override = true;
    client.request(&req).await.unwrap();
    assert!(agent.platform.injected().is_empty());

    // Without the flag the key goes through.
    client.request(&press(&["c"])).await.unwrap();
    assert_eq!(agent.platform.injected().len(), 1);

    agent.shutdown.send(()).await.unwrap();
    finish(agent.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn malformed_request_is_skipped_without_response() {
    let mut agent = start_agent(true).await;
    let stream = TcpStream::connect(agent.addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half, MAX_RESPONSE_SIZE);

    // A well-framed payload that is not a request.
    write_half.write_all(&[0, 0, 0, 3, 0xff, 0xff, 0xff]).await.unwrap();
    // A nine-byte payload claiming 2^34 press keys.
    let mut huge_claim = vec![0, 0, 0, 9, 0xFD];
    huge_claim.extend_from_slice(&(1u64 << 34).to_le_bytes());
    write_half.write_all(&huge_claim).await.unwrap();
    let frame = wire::encode_message(&get_keys()).unwrap();
    write_half.write_all(&frame).await.unwrap();

    // The only response is the one for the well-formed request.
    let resp: Response = tokio::time::timeout(TIMEOUT, reader.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resp.pressed_keys, Some(Vec::new()));

    let status = wait_for_status(&mut agent.status, |s| s.requests_served == 1)
        .await
        .unwrap();
    assert_eq!(status.malformed_requests, 2);

    agent.shutdown.send(()).await.unwrap();
    finish(agent.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn image_is_omitted_for_unknown_target() {
    let agent = start_agent(true).await;
    agent.platform.set_image("editor", vec![0xFF, 0xD8, 0x01, 0xFF, 0xD9]);
    let mut client = AgentClient::connect(agent.addr).await.unwrap();

    let image_of = |target: &str| Request {
        get_image: true,
        process_name: target.to_string(),
        quality: 80,
        ..Request::default()
    };

    let resp = client.request(&image_of("editor")).await.unwrap();
    assert_eq!(resp.image, Some(vec![0xFF, 0xD8, 0x01, 0xFF, 0xD9]));

    let resp = client.request(&image_of("no such window")).await.unwrap();
    assert!(resp.image.is_none());

    let resp = client.request(&image_of("")).await.unwrap();
    assert!(resp.image.is_some());

    agent.shutdown.send(()).await.unwrap();
    finish(agent.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn disconnect_closes_agent_and_releases_held_keys() {
    let mut agent = start_agent(true).await;
    let mut client = AgentClient::connect(agent.addr).await.unwrap();

    client.request(&press(&["space"])).await.unwrap();
    wait_until(|| agent.engine.state().fake_keys() == vec!["space".to_string()]).await;
    agent.platform.clear();
    drop(client);

    let err = finish(agent.handle).await.unwrap().unwrap_err();
    assert!(matches!(err, AgentError::Transport(ProtocolError::Closed)));

    let status = wait_for_status(&mut agent.status, |s| s.state == AgentState::Closed)
        .await
        .unwrap();
    assert!(status.peer.is_some());
    assert!(agent.platform.is_shutdown());
    assert!(matches!(
        agent.platform.injected().as_slice(),
        [Injected::Key {
            target: KeyTarget::Key(_),
            down: false
        }]
    ));
}

#[tokio::test]
async fn disconnect_keeps_holds_when_release_is_disabled() {
    let agent = start_agent(false).await;
    let mut client = AgentClient::connect(agent.addr).await.unwrap();

    client.request(&press(&["space"])).await.unwrap();
    agent.platform.clear();
    drop(client);

    assert!(finish(agent.handle).await.unwrap().is_err());
    assert!(agent.platform.injected().is_empty());
    assert!(agent.platform.is_shutdown());
}

#[tokio::test]
async fn only_one_client_is_ever_accepted() {
    let mut agent = start_agent(true).await;
    let _client = AgentClient::connect(agent.addr).await.unwrap();
    wait_for_status(&mut agent.status, |s| s.state == AgentState::Connected)
        .await
        .unwrap();

    // The listening socket is gone once the first client is in.
    assert!(TcpStream::connect(agent.addr).await.is_err());

    agent.shutdown.send(()).await.unwrap();
    finish(agent.handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_before_any_client() {
    let mut agent = start_agent(true).await;
    agent.shutdown.send(()).await.unwrap();
    finish(agent.handle).await.unwrap().unwrap();

    let status = wait_for_status(&mut agent.status, |s| s.state == AgentState::Closed)
        .await
        .unwrap();
    assert!(status.peer.is_none());
    assert!(agent.platform.is_shutdown());
}
