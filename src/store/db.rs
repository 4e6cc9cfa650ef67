//! # In-Memory Data Store
//!
//! Authoritative state for users, the follow graph, posts, and private
//! messages. A single [`Database`] instance is shared behind one
//! `tokio::sync::Mutex` by [`crate::store::service`] — every operation here
//! runs to completion without suspending, so the lock is never held across
//! an await point.

use crate::common::messages::{codes, Post, PrivateMessageEntry};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Database {
    /// username -> id
    usernames: HashMap<String, u32>,
    /// id -> username
    ids: HashMap<u32, String>,
    /// id -> notify topic
    topics: HashMap<u32, String>,
    /// id -> follower ids
    followers: HashMap<u32, Vec<u32>>,
    next_id: u32,
    posts: Vec<Post>,
    /// (sender_id, recipient_id) -> mirrored message list, sender's perspective
    private_messages: HashMap<(u32, u32), Vec<PrivateMessageEntry>>,
}

impl Database {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Returns `(ret, id, topic)`. `id` and `topic` are only meaningful when
    /// `ret == codes::SUCCESS`.
    pub fn add_user(&mut self, username: &str) -> (i32, i64, String) {
        if self.usernames.contains_key(username) {
            return (codes::ERROR_USERNAME_TAKEN, -1, String::new());
        }
        let id = self.next_id;
        self.next_id += 1;
        let topic = format!("notificacao_user_{id}");
        self.usernames.insert(username.to_string(), id);
        self.ids.insert(id, username.to_string());
        self.topics.insert(id, topic.clone());
        self.followers.insert(id, Vec::new());
        (codes::SUCCESS, id as i64, topic)
    }

    pub fn get_user_id(&self, username: &str) -> i64 {
        self.usernames
            .get(username)
            .map(|&id| id as i64)
            .unwrap_or(-1)
    }

    pub fn add_post(&mut self, post: Post) {
        self.posts.push(post);
        self.posts.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
    }

    pub fn get_posts(&self) -> Vec<Post> {
        self.posts.clone()
    }

    pub fn get_user_topic(&self, id: u32) -> String {
        self.topics.get(&id).cloned().unwrap_or_default()
    }

    /// Appends `follower_id` to `to_follow`'s follower list. No dedup: a
    /// follower already present is appended again. Pins the data store's
    /// original behavior; see the design notes on duplicate follows.
    pub fn add_follower(&mut self, follower_id: u32, to_follow: &str) -> i32 {
        let Some(&followee_id) = self.usernames.get(to_follow) else {
            return codes::ERROR_USER_NOT_FOUND;
        };
        if follower_id == followee_id {
            return codes::ERROR_INVALID_PARAMETER;
        }
        self.followers.entry(followee_id).or_default().push(follower_id);
        codes::SUCCESS
    }

    pub fn get_followers(&self, id: u32) -> Vec<u32> {
        self.followers.get(&id).cloned().unwrap_or_default()
    }

    /// Returns `ERROR_INVALID_PARAMETER` if sender == recipient or either is
    /// unknown, else `SUCCESS` after appending to both mirrored lists.
    pub fn add_private_message(
        &mut self,
        sender: &str,
        recipient: &str,
        text: &str,
        timestamp: i64,
    ) -> i32 {
        let (Some(&sender_id), Some(&recipient_id)) =
            (self.usernames.get(sender), self.usernames.get(recipient))
        else {
            return codes::ERROR_INVALID_PARAMETER;
        };
        if sender_id == recipient_id {
            return codes::ERROR_INVALID_PARAMETER;
        }

        let entry = (text.to_string(), timestamp, sender.to_string());

        let list = self
            .private_messages
            .entry((sender_id, recipient_id))
            .or_default();
        list.push(entry.clone());
        list.sort_by_key(|m| m.1);

        let mirror = self
            .private_messages
            .entry((recipient_id, sender_id))
            .or_default();
        mirror.push(entry);
        mirror.sort_by_key(|m| m.1);

        codes::SUCCESS
    }

    pub fn get_private_messages(&self, sender: &str, recipient: &str) -> Vec<PrivateMessageEntry> {
        let (Some(&sender_id), Some(&recipient_id)) =
            (self.usernames.get(sender), self.usernames.get(recipient))
        else {
            return Vec::new();
        };
        self.private_messages
            .get(&(sender_id, recipient_id))
            .cloned()
            .unwrap_or_default()
    }

}
