//! # Data Store Service
//!
//! Binds the request/reply listener (default port 6011) and dispatches each
//! [`StoreRequest`] against a single mutex-guarded [`Database`]. One task
//! per connection, but the dispatch itself never holds the lock across an
//! await — every `Database` method is synchronous and returns immediately.

use crate::common::framing::{read_frame, write_json};
use crate::common::messages::{
    codes, AckReply, AddUserReply, FollowersReply, IdReply, Post, PostsReply,
    PrivateMessagesReply, StoreRequest, TopicReply,
};
use crate::store::db::Database;
use anyhow::Result;
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

pub struct Store {
    db: Arc<Mutex<Database>>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            db: Arc::new(Mutex::new(Database::new())),
        }
    }

    pub async fn run(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("data store listening on {addr}");

        loop {
            let (socket, peer) = listener.accept().await?;
            debug!("accepted connection from {peer}");
            let db = self.db.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(socket, db).await {
                    error!("data store connection from {peer} ended: {e:#}");
                }
            });
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

async fn handle_connection(mut socket: TcpStream, db: Arc<Mutex<Database>>) -> Result<()> {
    loop {
        let body = match read_frame(&mut socket).await? {
            Some(b) => b,
            None => return Ok(()),
        };
        match serde_json::from_slice::<StoreRequest>(&body) {
            Ok(request) => {
                info!("data store request: {request:?}");
                dispatch(&mut socket, &db, request).await?;
            }
            Err(e) => {
                warn!("unrecognized data store action: {e:#}");
                reply(
                    &mut socket,
                    &json!({ "ret": codes::ERROR_UNKNOWN_ACTION, "msg": "Ação não reconhecida" }),
                )
                .await?;
            }
        }
    }
}

async fn dispatch(socket: &mut TcpStream, db: &Arc<Mutex<Database>>, req: StoreRequest) -> Result<()> {
    match req {
        StoreRequest::AddUser { username } => {
            let (ret, id, topic) = db.lock().await.add_user(&username);
            reply(socket, &AddUserReply { ret, id, topic }).await
        }
        StoreRequest::GetUserId { username } => {
            let id = db.lock().await.get_user_id(&username);
            reply(socket, &IdReply { id }).await
        }
        StoreRequest::AddPost { post } => {
            db.lock().await.add_post(post);
            reply(socket, &AckReply { ret: codes::SUCCESS }).await
        }
        StoreRequest::GetPosts => {
            let posts: Vec<Post> = db.lock().await.get_posts();
            reply(socket, &PostsReply { posts }).await
        }
        StoreRequest::GetUserTopic { id } => {
            let topic = db.lock().await.get_user_topic(id);
            reply(socket, &TopicReply { topic }).await
        }
        StoreRequest::AddFollower { id, to_follow } => {
            let ret = db.lock().await.add_follower(id, &to_follow);
            reply(socket, &AckReply { ret }).await
        }
        StoreRequest::GetFollowers { id } => {
            let followers = db.lock().await.get_followers(id);
            reply(socket, &FollowersReply { followers }).await
        }
        StoreRequest::AddPrivateMessage {
            remetente,
            destinatario,
            mensagem,
            timestamp,
        } => {
            let ts: i64 = timestamp.parse().unwrap_or(0);
            let ret = db
                .lock()
                .await
                .add_private_message(&remetente, &destinatario, &mensagem, ts);
            reply(socket, &AckReply { ret }).await
        }
        StoreRequest::GetPrivateMessages {
            remetente,
            destinatario,
        } => {
            let mensagens = db.lock().await.get_private_messages(&remetente, &destinatario);
            reply(
                socket,
                &PrivateMessagesReply {
                    ret: codes::SUCCESS,
                    mensagens,
                },
            )
            .await
        }
    }
}

async fn reply<T: Serialize>(socket: &mut TcpStream, value: &T) -> Result<()> {
    debug!("data store reply");
    write_json(socket, value).await
}
