//! # Request Handlers
//!
//! One function per action in [`ClientRequest`], each forwarding to the
//! data store and — for `post_text` — additionally to the broker's control
//! channel for follower fan-out. Every external call is wrapped by
//! [`crate::server::rpc::call`]; a failure there is caught here, logged,
//! and turned into `{"ret": -1, "msg": "Erro: <detail>"}` rather than
//! propagated, so one bad request never takes down the request loop.

use crate::common::messages::{
    codes, AckReply, AddUserReply, ClientRequest, ControlRequest, FollowersReply, NotifyAckReply,
    Post, PostTextReply, PostsReply, PrivateMessagesReply, StoreRequest, TopicReply,
};
use crate::server::rpc;
use log::error;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone)]
pub struct ServerContext {
    pub store_addr: String,
    pub control_addr: String,
    pub rpc_timeout: Duration,
}

/// Dispatch one client request to its handler, returning the raw JSON
/// reply body the broker should forward back to the client unchanged.
pub async fn handle(request: ClientRequest, ctx: &ServerContext) -> Value {
    match request {
        ClientRequest::AddUser { username } => add_user(ctx, username).await,
        ClientRequest::AddFollower { id, to_follow } => add_follower(ctx, id, to_follow).await,
        ClientRequest::PostText {
            username,
            id,
            texto,
            tempo_envio_mensagem,
        } => post_text(ctx, username, id, texto, tempo_envio_mensagem).await,
        ClientRequest::GetTimeline => get_timeline(ctx).await,
        ClientRequest::AddPrivateMessage {
            remetente,
            destinatario,
            mensagem,
            timestamp,
        } => add_private_message(ctx, remetente, destinatario, mensagem, timestamp).await,
        ClientRequest::GetPrivateMessages {
            remetente,
            destinatario,
        } => get_private_messages(ctx, remetente, destinatario).await,
    }
}

fn transport_error(action: &str, err: anyhow::Error) -> Value {
    error!("{action} failed: {err:#}");
    json!({ "ret": codes::ERROR_RUNTIME, "msg": format!("Erro: {err:#}") })
}

async fn add_user(ctx: &ServerContext, username: String) -> Value {
    let result: anyhow::Result<AddUserReply> = rpc::call(
        &ctx.store_addr,
        &StoreRequest::AddUser { username },
        ctx.rpc_timeout,
    )
    .await;

    match result {
        Ok(reply) if reply.ret == codes::SUCCESS => {
            json!({ "ret": reply.ret, "id": reply.id, "topic": reply.topic })
        }
        Ok(reply) => json!({ "ret": reply.ret }),
        Err(e) => transport_error("add_user", e),
    }
}

async fn add_follower(ctx: &ServerContext, id: u32, to_follow: String) -> Value {
    let result: anyhow::Result<AckReply> = rpc::call(
        &ctx.store_addr,
        &StoreRequest::AddFollower { id, to_follow },
        ctx.rpc_timeout,
    )
    .await;

    match result {
        Ok(reply) => json!({ "ret": reply.ret }),
        Err(e) => transport_error("add_follower", e),
    }
}

async fn post_text(
    ctx: &ServerContext,
    username: String,
    id: u32,
    texto: String,
    tempo_envio_mensagem: String,
) -> Value {
    let post = Post {
        username: username.clone(),
        user_id: id,
        text: texto,
        sent_at: tempo_envio_mensagem,
    };

    let add_result: anyhow::Result<AckReply> = rpc::call(
        &ctx.store_addr,
        &StoreRequest::AddPost { post },
        ctx.rpc_timeout,
    )
    .await;

    if let Err(e) = add_result {
        return transport_error("post_text", e);
    }

    // Synchronous, pre-reply fan-out: the client learns of the post only
    // after followers have at least been offered the notification.
    if let Err(e) = notify_followers(ctx, &username, id).await {
        return transport_error("post_text", e);
    }

    let reply = PostTextReply {
        ret: codes::SUCCESS,
        msg: "Postagem recebida!".to_string(),
    };
    json!({ "ret": reply.ret, "msg": reply.msg })
}

async fn notify_followers(ctx: &ServerContext, post_owner: &str, id: u32) -> anyhow::Result<()> {
    let followers: FollowersReply =
        rpc::call(&ctx.store_addr, &StoreRequest::GetFollowers { id }, ctx.rpc_timeout).await?;

    if followers.followers.is_empty() {
        return Ok(());
    }

    let mut users_to_notify = HashMap::with_capacity(followers.followers.len());
    for follower_id in followers.followers {
        let topic: TopicReply = rpc::call(
            &ctx.store_addr,
            &StoreRequest::GetUserTopic { id: follower_id },
            ctx.rpc_timeout,
        )
        .await?;
        users_to_notify.insert(follower_id, topic.topic);
    }

    let msg = format!("Novo post do {post_owner} disponível!");
    let _: NotifyAckReply = rpc::call(
        &ctx.control_addr,
        &ControlRequest::NotifyUsers {
            post_owner: post_owner.to_string(),
            users_to_notify,
            msg,
        },
        ctx.rpc_timeout,
    )
    .await?;

    Ok(())
}

async fn get_timeline(ctx: &ServerContext) -> Value {
    let result: anyhow::Result<PostsReply> =
        rpc::call(&ctx.store_addr, &StoreRequest::GetPosts, ctx.rpc_timeout).await;

    match result {
        Ok(reply) => serde_json::to_value(reply.posts).unwrap_or(Value::Array(Vec::new())),
        Err(e) => transport_error("get_timeline", e),
    }
}

async fn add_private_message(
    ctx: &ServerContext,
    remetente: String,
    destinatario: String,
    mensagem: String,
    timestamp: String,
) -> Value {
    let result: anyhow::Result<AckReply> = rpc::call(
        &ctx.store_addr,
        &StoreRequest::AddPrivateMessage {
            remetente,
            destinatario,
            mensagem,
            timestamp,
        },
        ctx.rpc_timeout,
    )
    .await;

    match result {
        Ok(reply) => json!({ "ret": reply.ret }),
        Err(e) => transport_error("add_private_message", e),
    }
}

async fn get_private_messages(ctx: &ServerContext, remetente: String, destinatario: String) -> Value {
    let result: anyhow::Result<PrivateMessagesReply> = rpc::call(
        &ctx.store_addr,
        &StoreRequest::GetPrivateMessages {
            remetente,
            destinatario,
        },
        ctx.rpc_timeout,
    )
    .await;

    match result {
        Ok(reply) => json!({ "ret": reply.ret, "mensagens": reply.mensagens }),
        Err(e) => transport_error("get_private_messages", e),
    }
}
