//! End-to-end scenarios from spec §8, run against real broker/store/app-server
//! tasks talking over loopback TCP, exercising the documented wire schemas
//! rather than any in-process API.

mod common;

use common::*;
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpStream;

#[tokio::test]
async fn signup_collision() {
    let store_addr = spawn_store().await;
    let broker_cfg = spawn_broker(fast_broker_config()).await;
    spawn_app_server(&broker_cfg, &store_addr).await;

    let mut alice = TcpStream::connect(&broker_cfg.frontend_addr).await.unwrap();
    send_frame(&mut alice, &json!({"action": "add_user", "username": "alice"}))
        .await
        .unwrap();
    let reply = recv_frame(&mut alice).await.unwrap();
    assert_eq!(reply["ret"], 0);
    assert_eq!(reply["id"], 1);
    assert_eq!(reply["topic"], "notificacao_user_1");

    let mut bob = TcpStream::connect(&broker_cfg.frontend_addr).await.unwrap();
    send_frame(&mut bob, &json!({"action": "add_user", "username": "alice"}))
        .await
        .unwrap();
    let collision = recv_frame(&mut bob).await.unwrap();
    assert_eq!(collision["ret"], 1); // ERROR_USERNAME_TAKEN

    send_frame(&mut bob, &json!({"action": "add_user", "username": "bob"}))
        .await
        .unwrap();
    let retry = recv_frame(&mut bob).await.unwrap();
    assert_eq!(retry["ret"], 0);
    assert_eq!(retry["id"], 2);
    assert_eq!(retry["topic"], "notificacao_user_2");
}

#[tokio::test]
async fn follow_and_notify() {
    let store_addr = spawn_store().await;
    let broker_cfg = spawn_broker(fast_broker_config()).await;
    spawn_app_server(&broker_cfg, &store_addr).await;

    let mut alice = TcpStream::connect(&broker_cfg.frontend_addr).await.unwrap();
    send_frame(&mut alice, &json!({"action": "add_user", "username": "alice"}))
        .await
        .unwrap();
    let alice_reply = recv_frame(&mut alice).await.unwrap();
    assert_eq!(alice_reply["id"], 1);

    let mut bob = TcpStream::connect(&broker_cfg.frontend_addr).await.unwrap();
    send_frame(&mut bob, &json!({"action": "add_user", "username": "bob"}))
        .await
        .unwrap();
    let bob_reply = recv_frame(&mut bob).await.unwrap();
    assert_eq!(bob_reply["id"], 2);

    let mut bob_notify = TcpStream::connect(&broker_cfg.notify_addr).await.unwrap();
    send_string(&mut bob_notify, "notificacao_user_2").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_frame(
        &mut bob,
        &json!({"action": "add_follower", "id": 2, "to_follow": "alice"}),
    )
    .await
    .unwrap();
    let follow_reply = recv_frame(&mut bob).await.unwrap();
    assert_eq!(follow_reply["ret"], 0);

    send_frame(
        &mut alice,
        &json!({
            "action": "post_text",
            "username": "alice",
            "id": 1,
            "texto": "hello",
            "tempoEnvioMensagem": "2024-01-01T10:00:00",
        }),
    )
    .await
    .unwrap();
    let post_reply = recv_frame(&mut alice).await.unwrap();
    assert_eq!(post_reply["ret"], 0);
    assert_eq!(post_reply["msg"], "Postagem recebida!");

    let notification = tokio::time::timeout(Duration::from_millis(500), recv_string(&mut bob_notify))
        .await
        .expect("notification arrived within 500ms")
        .unwrap();
    assert!(notification.starts_with("notificacao_user_2 "));
    assert!(notification.ends_with("Novo post do alice disponível!"));
}

#[tokio::test]
async fn timeline_ordering() {
    let store_addr = spawn_store().await;
    let broker_cfg = spawn_broker(fast_broker_config()).await;
    spawn_app_server(&broker_cfg, &store_addr).await;

    let mut client = TcpStream::connect(&broker_cfg.frontend_addr).await.unwrap();
    send_frame(&mut client, &json!({"action": "add_user", "username": "alice"}))
        .await
        .unwrap();
    recv_frame(&mut client).await.unwrap();

    send_frame(
        &mut client,
        &json!({
            "action": "post_text",
            "username": "alice",
            "id": 1,
            "texto": "second",
            "tempoEnvioMensagem": "2024-01-01T10:00:02",
        }),
    )
    .await
    .unwrap();
    recv_frame(&mut client).await.unwrap();

    send_frame(
        &mut client,
        &json!({
            "action": "post_text",
            "username": "alice",
            "id": 1,
            "texto": "first",
            "tempoEnvioMensagem": "2024-01-01T10:00:01",
        }),
    )
    .await
    .unwrap();
    recv_frame(&mut client).await.unwrap();

    send_frame(&mut client, &json!({"action": "get_timeline"})).await.unwrap();
    let timeline = recv_frame(&mut client).await.unwrap();
    let posts = timeline.as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["tempoEnvioMensagem"], "2024-01-01T10:00:01");
    assert_eq!(posts[1]["tempoEnvioMensagem"], "2024-01-01T10:00:02");
}

#[tokio::test]
async fn self_follow_rejection() {
    let store_addr = spawn_store().await;
    let broker_cfg = spawn_broker(fast_broker_config()).await;
    spawn_app_server(&broker_cfg, &store_addr).await;

    let mut alice = TcpStream::connect(&broker_cfg.frontend_addr).await.unwrap();
    send_frame(&mut alice, &json!({"action": "add_user", "username": "alice"}))
        .await
        .unwrap();
    recv_frame(&mut alice).await.unwrap();

    send_frame(
        &mut alice,
        &json!({"action": "add_follower", "id": 1, "to_follow": "alice"}),
    )
    .await
    .unwrap();
    let reply = recv_frame(&mut alice).await.unwrap();
    assert_eq!(reply["ret"], 2); // ERROR_INVALID_PARAMETER
}

#[tokio::test]
async fn private_message_round_trip() {
    let store_addr = spawn_store().await;
    let broker_cfg = spawn_broker(fast_broker_config()).await;
    spawn_app_server(&broker_cfg, &store_addr).await;

    let mut client = TcpStream::connect(&broker_cfg.frontend_addr).await.unwrap();
    send_frame(&mut client, &json!({"action": "add_user", "username": "alice"}))
        .await
        .unwrap();
    recv_frame(&mut client).await.unwrap();
    send_frame(&mut client, &json!({"action": "add_user", "username": "bob"}))
        .await
        .unwrap();
    recv_frame(&mut client).await.unwrap();

    send_frame(
        &mut client,
        &json!({
            "action": "add_private_message",
            "remetente": "alice",
            "destinatario": "bob",
            "mensagem": "hi",
            "timestamp": "1000",
        }),
    )
    .await
    .unwrap();
    let ack = recv_frame(&mut client).await.unwrap();
    assert_eq!(ack["ret"], 0);

    send_frame(
        &mut client,
        &json!({"action": "get_private_messages", "remetente": "alice", "destinatario": "bob"}),
    )
    .await
    .unwrap();
    let from_alice = recv_frame(&mut client).await.unwrap();
    assert_eq!(from_alice["mensagens"], json!([["hi", 1000, "alice"]]));

    send_frame(
        &mut client,
        &json!({"action": "get_private_messages", "remetente": "bob", "destinatario": "alice"}),
    )
    .await
    .unwrap();
    let from_bob = recv_frame(&mut client).await.unwrap();
    assert_eq!(from_bob["mensagens"], json!([["hi", 1000, "alice"]]));
}

#[tokio::test]
async fn leader_election_after_failure() {
    let broker_cfg = spawn_broker(fast_broker_config()).await;

    async fn get_server_id(control_addr: &str) -> u32 {
        let mut conn = TcpStream::connect(control_addr).await.unwrap();
        send_frame(&mut conn, &json!({"action": "get_server_id"})).await.unwrap();
        let reply = recv_frame(&mut conn).await.unwrap();
        reply["server_id"].as_u64().unwrap() as u32
    }

    async fn who_is_leader(control_addr: &str) -> Option<u32> {
        let mut conn = TcpStream::connect(control_addr).await.unwrap();
        send_frame(&mut conn, &json!({"action": "who_is_leader"})).await.unwrap();
        let reply = recv_frame(&mut conn).await.unwrap();
        reply["leader_id"].as_u64().map(|v| v as u32)
    }

    fn spawn_heartbeats(heartbeat_addr: String, id: u32) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Ok(mut conn) = TcpStream::connect(&heartbeat_addr).await {
                    let _ = send_string(&mut conn, &format!("HEARTBEAT {id}")).await;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        })
    }

    let id1 = get_server_id(&broker_cfg.control_addr).await;
    let id2 = get_server_id(&broker_cfg.control_addr).await;
    let id3 = get_server_id(&broker_cfg.control_addr).await;
    assert_eq!((id1, id2, id3), (1, 2, 3));

    let hb1 = spawn_heartbeats(broker_cfg.heartbeat_addr.clone(), id1);
    let hb2 = spawn_heartbeats(broker_cfg.heartbeat_addr.clone(), id2);
    let hb3 = spawn_heartbeats(broker_cfg.heartbeat_addr.clone(), id3);
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(who_is_leader(&broker_cfg.control_addr).await, Some(3));

    // Kill server 3: stop its heartbeats. Broker's 1s timeout / 1s sweep
    // (see `fast_broker_config`) evicts it well inside spec's 5s bound.
    hb3.abort();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(who_is_leader(&broker_cfg.control_addr).await, Some(2));

    // The new leader (server 2) broadcasts a clock sync; every subscriber
    // on the `clock_sync` topic observes the same timestamp.
    let mut subscriber = TcpStream::connect(&broker_cfg.notify_addr).await.unwrap();
    send_string(&mut subscriber, "clock_sync").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut leader_conn = TcpStream::connect(&broker_cfg.control_addr).await.unwrap();
    send_frame(
        &mut leader_conn,
        &json!({"action": "sync_clock", "timestamp": 1_700_000_000.5}),
    )
    .await
    .unwrap();
    let ack = recv_frame(&mut leader_conn).await.unwrap();
    assert_eq!(ack["status"], "ok");

    let published = tokio::time::timeout(Duration::from_millis(500), recv_string(&mut subscriber))
        .await
        .expect("clock_sync published within 500ms")
        .unwrap();
    assert_eq!(published, "clock_sync 1700000000.5");

    hb1.abort();
    hb2.abort();
}

#[tokio::test]
async fn unknown_action_gets_a_reply_instead_of_a_dropped_connection() {
    let store_addr = spawn_store().await;
    let broker_cfg = spawn_broker(fast_broker_config()).await;
    spawn_app_server(&broker_cfg, &store_addr).await;

    // Frontend -> backend -> app server: a malformed action must not tear
    // down the client's connection, and the same connection must still
    // work for a subsequent, valid request.
    let mut client = TcpStream::connect(&broker_cfg.frontend_addr).await.unwrap();
    send_frame(&mut client, &json!({"action": "do_a_backflip"})).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_millis(500), recv_frame(&mut client))
        .await
        .expect("unknown action reply arrives instead of a dropped connection")
        .unwrap();
    assert_eq!(reply["ret"], -99);

    send_frame(&mut client, &json!({"action": "add_user", "username": "alice"}))
        .await
        .unwrap();
    let signup = recv_frame(&mut client).await.unwrap();
    assert_eq!(signup["ret"], 0);
}

#[tokio::test]
async fn store_unknown_action_gets_a_reply() {
    let store_addr = spawn_store().await;
    let mut conn = TcpStream::connect(&store_addr).await.unwrap();

    send_frame(&mut conn, &json!({"action": "do_a_backflip"})).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_millis(500), recv_frame(&mut conn))
        .await
        .expect("unknown action reply arrives instead of a dropped connection")
        .unwrap();
    assert_eq!(reply["ret"], -99);

    send_frame(&mut conn, &json!({"action": "add_user", "username": "alice"}))
        .await
        .unwrap();
    let signup = recv_frame(&mut conn).await.unwrap();
    assert_eq!(signup["ret"], 0);
}

#[tokio::test]
async fn control_channel_unknown_action_gets_a_reply() {
    let broker_cfg = spawn_broker(fast_broker_config()).await;
    let mut conn = TcpStream::connect(&broker_cfg.control_addr).await.unwrap();

    send_frame(&mut conn, &json!({"action": "do_a_backflip"})).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_millis(500), recv_frame(&mut conn))
        .await
        .expect("unknown action reply arrives instead of a dropped connection")
        .unwrap();
    assert_eq!(reply["ret"], -99);

    send_frame(&mut conn, &json!({"action": "get_server_id"})).await.unwrap();
    let registered = recv_frame(&mut conn).await.unwrap();
    assert_eq!(registered["server_id"], 1);
}
