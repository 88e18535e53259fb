//! End-to-end tests over real sockets.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::{Error as WsError, Message, http::StatusCode};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use chat_relay::{
    ChatServer, InMemoryUserStore, MessageRouter, RoomId, ServerConfig, ServerMessage, UserId,
    endpoints,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    server: Arc<ChatServer>,
    router: Arc<MessageRouter>,
    config: ServerConfig,
}

impl Harness {
    async fn start() -> Result<Self> {
        let config = ServerConfig::builder().port(0).build()?;
        let router = Arc::new(MessageRouter::new());
        let dispatcher = endpoints::mount(
            &config,
            Arc::clone(&router),
            Arc::new(InMemoryUserStore::new()),
        );
        let server = ChatServer::start(&config, dispatcher).await?;

        Ok(Self {
            server,
            router,
            config,
        })
    }

    async fn connect(&self, path: &str) -> Result<Client> {
        let (client, _) = connect_async(self.server.ws_url(path)).await?;
        Ok(client)
    }

    async fn chat(&self) -> Result<Client> {
        self.connect(self.config.chat_path()).await
    }

    /// Connects and registers, consuming the ack.
    async fn user(&self, name: &str) -> Result<Client> {
        let mut client = self.chat().await?;
        send(&mut client, json!({"type": "register", "userId": name})).await?;
        let ack = recv(&mut client).await?;
        if ack != ServerMessage::system(format!("Registered as {name}")) {
            bail!("unexpected register ack: {ack:?}");
        }
        Ok(client)
    }

    async fn wait_offline(&self, name: &str) -> Result<()> {
        let user_id = UserId::from(name);
        for _ in 0..200 {
            if !self.router.is_online(&user_id) {
                return Ok(());
            }
            sleep(Duration::from_millis(10)).await;
        }
        bail!("{name} still online")
    }
}

async fn send(client: &mut Client, frame: Value) -> Result<()> {
    client.send(Message::Text(frame.to_string().into())).await?;
    Ok(())
}

async fn recv(client: &mut Client) -> Result<ServerMessage> {
    loop {
        let frame = timeout(RECV_TIMEOUT, client.next())
            .await
            .context("timed out waiting for frame")?
            .context("stream ended")??;

        if let Message::Text(text) = frame {
            return Ok(serde_json::from_str(text.as_str())?);
        }
    }
}

async fn assert_silent(client: &mut Client) {
    let next = timeout(Duration::from_millis(150), client.next()).await;
    assert!(next.is_err(), "expected no frame, got {next:?}");
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
async fn test_unregistered_join_is_refused() -> Result<()> {
    let h = Harness::start().await?;
    let mut client = h.chat().await?;

    send(&mut client, json!({"type": "join_room", "roomId": "r1"})).await?;

    assert_eq!(
        recv(&mut client).await?,
        ServerMessage::error("Please register first")
    );
    assert_eq!(h.router.room_count(), 0);

    h.server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_group_message_reaches_other_members_only() -> Result<()> {
    let h = Harness::start().await?;
    let mut a = h.user("a").await?;
    let mut b = h.user("b").await?;
    let mut c = h.user("c").await?;

    for client in [&mut a, &mut b] {
        send(client, json!({"type": "join_room", "roomId": "r1"})).await?;
        assert_eq!(recv(client).await?, ServerMessage::system("Joined room r1"));
    }

    send(
        &mut a,
        json!({"type": "group_message", "roomId": "r1", "content": "hi"}),
    )
    .await?;

    assert_eq!(
        recv(&mut b).await?,
        ServerMessage::GroupMessage {
            room_id: RoomId::from("r1"),
            from_user_id: UserId::from("a"),
            content: "hi".into(),
        }
    );
    assert_silent(&mut a).await;
    assert_silent(&mut c).await;

    h.server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_broadcast_and_private() -> Result<()> {
    let h = Harness::start().await?;
    let mut a = h.user("a").await?;
    let mut b = h.user("b").await?;

    send(&mut a, json!({"type": "broadcast_message", "content": "all"})).await?;
    assert_eq!(
        recv(&mut b).await?,
        ServerMessage::BroadcastMessage {
            from_user_id: UserId::from("a"),
            content: "all".into(),
        }
    );

    send(
        &mut b,
        json!({"type": "private_message", "toUserId": "a", "content": "psst"}),
    )
    .await?;
    assert_eq!(
        recv(&mut a).await?,
        ServerMessage::PrivateMessage {
            from_user_id: UserId::from("b"),
            to_user_id: UserId::from("a"),
            content: "psst".into(),
        }
    );

    h.server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_private_to_disconnected_user_is_offline() -> Result<()> {
    let h = Harness::start().await?;
    let mut a = h.user("a").await?;
    let mut b = h.user("b").await?;

    send(&mut b, json!({"type": "join_room", "roomId": "r1"})).await?;
    recv(&mut b).await?;

    b.close(None).await?;
    h.wait_offline("b").await?;
    assert_eq!(h.router.room_count(), 0);

    send(
        &mut a,
        json!({"type": "private_message", "toUserId": "b", "content": "hey"}),
    )
    .await?;
    assert_eq!(
        recv(&mut a).await?,
        ServerMessage::system("User b is offline")
    );

    send(
        &mut a,
        json!({"type": "group_message", "roomId": "r1", "content": "x"}),
    )
    .await?;
    assert_eq!(
        recv(&mut a).await?,
        ServerMessage::error("Room r1 does not exist")
    );

    h.server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_bad_frames_do_not_close_connection() -> Result<()> {
    let h = Harness::start().await?;
    let mut client = h.chat().await?;

    client.send(Message::Text("not json".into())).await?;
    assert_eq!(
        recv(&mut client).await?,
        ServerMessage::error("Invalid JSON format")
    );

    send(&mut client, json!({"type": "teleport"})).await?;
    assert_eq!(
        recv(&mut client).await?,
        ServerMessage::error("Unknown message type")
    );

    send(&mut client, json!({"type": "register", "userId": "a"})).await?;
    assert_eq!(
        recv(&mut client).await?,
        ServerMessage::system("Registered as a")
    );

    h.server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_binary_frames_are_chat_frames() -> Result<()> {
    let h = Harness::start().await?;
    let mut client = h.chat().await?;

    client
        .send(Message::Binary(
            br#"{"type":"register","userId":"a"}"#.to_vec().into(),
        ))
        .await?;
    assert_eq!(
        recv(&mut client).await?,
        ServerMessage::system("Registered as a")
    );

    client.send(Message::Binary(vec![0xff, 0xfe].into())).await?;
    assert_eq!(
        recv(&mut client).await?,
        ServerMessage::error("Invalid JSON format")
    );

    client.send(Message::Text("[1,2]".into())).await?;
    assert_eq!(
        recv(&mut client).await?,
        ServerMessage::error("Unknown message type")
    );
    assert!(h.router.is_online(&UserId::from("a")));

    h.server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_reregister_routes_to_newest_connection() -> Result<()> {
    let h = Harness::start().await?;
    let mut old = h.user("a").await?;
    let mut new = h.user("a").await?;
    let mut b = h.user("b").await?;

    send(
        &mut b,
        json!({"type": "private_message", "toUserId": "a", "content": "hey"}),
    )
    .await?;
    assert!(matches!(
        recv(&mut new).await?,
        ServerMessage::PrivateMessage { .. }
    ));
    assert_silent(&mut old).await;

    // Closing the evicted socket keeps the newer binding.
    old.close(None).await?;
    sleep(Duration::from_millis(100)).await;
    assert!(h.router.is_online(&UserId::from("a")));

    h.server.shutdown().await;
    Ok(())
}

// ============================================================================
// Presence
// ============================================================================

#[tokio::test]
async fn test_presence_snapshot() -> Result<()> {
    let h = Harness::start().await?;
    let _a = h.user("a").await?;

    let mut watcher = h.connect(h.config.presence_path()).await?;
    let data = match recv(&mut watcher).await? {
        ServerMessage::OnlineUsers { data } => data,
        other => bail!("expected online_users, got {other:?}"),
    };
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].id, UserId::from("a"));
    assert_eq!(data[0].status, "online");

    let _b = h.user("b").await?;
    watcher.send(Message::Text("refresh".into())).await?;
    let ServerMessage::OnlineUsers { data } = recv(&mut watcher).await? else {
        bail!("expected online_users");
    };
    assert_eq!(data.len(), 2);

    h.server.shutdown().await;
    Ok(())
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_user_records_crud() -> Result<()> {
    let h = Harness::start().await?;
    let mut client = h.connect(h.config.users_path()).await?;

    send(
        &mut client,
        json!({"type": "create_user", "name": "Ann", "email": "ann@x.io"}),
    )
    .await?;
    let ServerMessage::UserCreated { data: ann } = recv(&mut client).await? else {
        bail!("expected user_created");
    };

    send(
        &mut client,
        json!({"type": "update_user", "id": ann.id, "email": "a@x.io"}),
    )
    .await?;
    let ServerMessage::UserUpdated { data } = recv(&mut client).await? else {
        bail!("expected user_updated");
    };
    assert_eq!(data.name, "Ann");
    assert_eq!(data.email, "a@x.io");

    send(&mut client, json!({"type": "delete_user", "id": ann.id})).await?;
    assert_eq!(
        recv(&mut client).await?,
        ServerMessage::UserDeleted { id: ann.id }
    );

    send(&mut client, json!({"type": "get_users"})).await?;
    assert_eq!(
        recv(&mut client).await?,
        ServerMessage::UsersList { data: vec![] }
    );

    send(&mut client, json!({"type": "register", "userId": "a"})).await?;
    assert_eq!(recv(&mut client).await?, ServerMessage::error("Unknown type"));

    h.server.shutdown().await;
    Ok(())
}

// ============================================================================
// Server
// ============================================================================

#[tokio::test]
async fn test_unknown_path_gets_404() -> Result<()> {
    let h = Harness::start().await?;

    match connect_async(h.server.ws_url("/elsewhere")).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::NOT_FOUND),
        Err(e) => bail!("unexpected error: {e}"),
        Ok(_) => bail!("upgrade on unknown path succeeded"),
    }

    h.server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_shutdown_closes_clients_and_cleans_up() -> Result<()> {
    let h = Harness::start().await?;
    let mut a = h.user("a").await?;

    h.server.shutdown().await;
    assert_eq!(h.server.connection_count(), 0);
    assert!(!h.router.is_online(&UserId::from("a")));

    let next = timeout(RECV_TIMEOUT, a.next()).await?;
    assert!(matches!(next, Some(Ok(Message::Close(_))) | None | Some(Err(_))));
    Ok(())
}
