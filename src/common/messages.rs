//! # Wire Message Types
//!
//! Every request/reply channel in the cluster (data-store, broker
//! frontend/backend, broker control) exchanges UTF-8 JSON objects framed by
//! [`crate::common::framing`]. Rather than dispatching on a raw `action`
//! string at every hop, each channel gets a tagged-variant request enum —
//! the parser boundary is the only place an unrecognized action can occur,
//! and an exhaustive `match` on the variant replaces the rest.
//!
//! The heartbeat and notify channels are not JSON; they carry plain strings
//! of the form `"HEARTBEAT <id>"` and `"<topic> <payload>"` respectively,
//! built and parsed directly in [`crate::broker::heartbeat`] and
//! [`crate::broker::notify`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Return codes shared by every handler in the cluster. `SUCCESS` is the
/// only non-negative value that means "the request was valid and applied";
/// everything else is an explicit failure mode a caller can branch on.
pub mod codes {
    pub const SUCCESS: i32 = 0;
    pub const ERROR_USERNAME_TAKEN: i32 = 1;
    pub const ERROR_INVALID_PARAMETER: i32 = 2;
    pub const ERROR_USER_NOT_FOUND: i32 = 3;
    pub const ERROR_RUNTIME: i32 = -1;
    pub const ERROR_UNKNOWN_ACTION: i32 = -99;
}

/// A single timeline post. Field names on the wire follow the original
/// Portuguese request schema (`texto`, `tempoEnvioMensagem`) so a post read
/// back from `get_timeline` has the same shape a client used to submit it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub username: String,
    #[serde(rename = "id")]
    pub user_id: u32,
    #[serde(rename = "texto")]
    pub text: String,
    #[serde(rename = "tempoEnvioMensagem")]
    pub sent_at: String,
}

/// `(text, unix_timestamp_seconds, sender_username)`, stored under both
/// endpoints of a conversation. Serializes as a plain 3-element JSON array.
pub type PrivateMessageEntry = (String, i64, String);

// ============================================================================
// DATA STORE CHANNEL
// ============================================================================

/// Requests understood by the data store (port 6011). Issued only by app
/// servers, never directly by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StoreRequest {
    AddUser {
        username: String,
    },
    GetUserId {
        username: String,
    },
    AddPost {
        post: Post,
    },
    GetPosts,
    GetUserTopic {
        id: u32,
    },
    AddFollower {
        id: u32,
        to_follow: String,
    },
    GetFollowers {
        id: u32,
    },
    AddPrivateMessage {
        remetente: String,
        destinatario: String,
        mensagem: String,
        timestamp: String,
    },
    GetPrivateMessages {
        remetente: String,
        destinatario: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddUserReply {
    pub ret: i32,
    pub id: i64,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdReply {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AckReply {
    pub ret: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostsReply {
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicReply {
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowersReply {
    pub followers: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrivateMessagesReply {
    pub ret: i32,
    pub mensagens: Vec<PrivateMessageEntry>,
}

// ============================================================================
// CLIENT-FACING CHANNEL (broker frontend <-> backend <-> app server)
// ============================================================================

/// Requests a client may submit through the broker frontend. Anything that
/// fails to parse into one of these variants never reaches a handler — it
/// is rejected at the frontend with [`codes::ERROR_UNKNOWN_ACTION`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientRequest {
    AddUser {
        username: String,
    },
    AddFollower {
        id: u32,
        to_follow: String,
    },
    PostText {
        username: String,
        id: u32,
        texto: String,
        #[serde(rename = "tempoEnvioMensagem")]
        tempo_envio_mensagem: String,
    },
    GetTimeline,
    AddPrivateMessage {
        remetente: String,
        destinatario: String,
        mensagem: String,
        timestamp: String,
    },
    GetPrivateMessages {
        remetente: String,
        destinatario: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostTextReply {
    pub ret: i32,
    pub msg: String,
}

// ============================================================================
// BROKER CONTROL CHANNEL
// ============================================================================

/// Requests an app server issues on the control channel (port 6001):
/// registration, membership, election, and clock/notification broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlRequest {
    GetServerId,
    ListServers,
    WhoIsLeader,
    SyncClock {
        timestamp: f64,
    },
    NotifyUsers {
        post_owner: String,
        users_to_notify: HashMap<u32, String>,
        msg: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerIdReply {
    pub server_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServersReply {
    pub servers: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderReply {
    pub leader_id: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncAckReply {
    pub status: String,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifyAckReply {
    pub status: String,
    pub notified_users: Vec<u32>,
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn now_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_request_tags_on_action() {
        let json = r#"{"action":"add_user","username":"alice"}"#;
        let req: StoreRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(req, StoreRequest::AddUser { username } if username == "alice"));
    }

    #[test]
    fn post_serializes_with_original_field_names() {
        let post = Post {
            username: "alice".into(),
            user_id: 1,
            text: "hello".into(),
            sent_at: "2024-01-01T10:00:00".into(),
        };
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["texto"], "hello");
        assert_eq!(value["tempoEnvioMensagem"], "2024-01-01T10:00:00");
    }

    #[test]
    fn unknown_action_fails_to_parse() {
        let json = r#"{"action":"do_a_backflip"}"#;
        let result: Result<ClientRequest, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
