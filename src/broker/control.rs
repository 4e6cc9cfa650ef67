//! # Broker Control Channel
//!
//! Registration, membership, election, and clock/notification broadcast —
//! everything an app server asks of the broker outside the plain
//! request-forwarding path.

use crate::broker::notify::NotifyBus;
use crate::broker::state::ClusterState;
use crate::common::framing::{read_frame, write_json};
use crate::common::messages::{
    codes, ControlRequest, LeaderReply, NotifyAckReply, ServerIdReply, ServersReply, SyncAckReply,
};
use anyhow::Result;
use log::{debug, error, info, warn};
use serde_json::json;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

pub async fn run(addr: &str, state: Arc<ClusterState>, notify: NotifyBus) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("control channel listening on {addr}");

    loop {
        let (socket, peer) = listener.accept().await?;
        let state = state.clone();
        let notify = notify.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, state, notify).await {
                error!("control connection from {peer} ended: {e:#}");
            }
        });
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    state: Arc<ClusterState>,
    notify: NotifyBus,
) -> Result<()> {
    loop {
        let body = match read_frame(&mut socket).await? {
            Some(b) => b,
            None => return Ok(()),
        };
        match serde_json::from_slice::<ControlRequest>(&body) {
            Ok(request) => {
                debug!("control request: {request:?}");
                dispatch(&mut socket, &state, &notify, request).await?;
            }
            Err(e) => {
                warn!("unrecognized control action: {e:#}");
                write_json(
                    &mut socket,
                    &json!({ "ret": codes::ERROR_UNKNOWN_ACTION, "msg": "Ação desconhecida" }),
                )
                .await?;
            }
        }
    }
}

async fn dispatch(
    socket: &mut TcpStream,
    state: &Arc<ClusterState>,
    notify: &NotifyBus,
    req: ControlRequest,
) -> Result<()> {
    match req {
        ControlRequest::GetServerId => {
            let server_id = state.register();
            info!("registered new server with id {server_id}");
            write_json(socket, &ServerIdReply { server_id }).await
        }
        ControlRequest::ListServers => {
            let servers = state.list_servers();
            write_json(socket, &ServersReply { servers }).await
        }
        ControlRequest::WhoIsLeader => {
            let leader_id = state.who_is_leader();
            write_json(socket, &LeaderReply { leader_id }).await
        }
        ControlRequest::SyncClock { timestamp } => {
            // The broker performs no check that the caller is the leader;
            // correctness relies on only the leader calling this.
            notify.publish("clock_sync", &timestamp.to_string());
            write_json(
                socket,
                &SyncAckReply {
                    status: "ok".into(),
                    timestamp,
                },
            )
            .await
        }
        ControlRequest::NotifyUsers {
            post_owner,
            users_to_notify,
            msg,
        } => {
            let mut notified_users = Vec::with_capacity(users_to_notify.len());
            for (id, topic) in users_to_notify {
                notify.publish(&topic, &msg);
                notified_users.push(id);
            }
            debug!("post by {post_owner} notified {} followers", notified_users.len());
            write_json(
                socket,
                &NotifyAckReply {
                    status: "ok".into(),
                    notified_users,
                },
            )
            .await
        }
    }
}
