//! # Interactive Menu
//!
//! The 7-option text menu from spec §6: post, follow, send PM, view
//! notifications, view timeline, set forced delay, quit.

use crate::client::session::{prompt_line, Session};
use crate::common::messages::ClientRequest;
use anyhow::Result;
use log::{error, warn};

pub async fn run(session: Session) -> Result<()> {
    loop {
        print_menu();
        let choice = prompt_line("> ")?;
        match choice.as_str() {
            "1" => post_text(&session).await,
            "2" => follow_user(&session).await,
            "3" => send_private_message(&session).await,
            "4" => view_notifications(&session).await,
            "5" => view_timeline(&session).await,
            "6" => set_forced_delay(&session).await,
            "7" => {
                println!("Goodbye, {}.", session.username);
                return Ok(());
            }
            _ => println!("Unrecognized option."),
        }
    }
}

fn print_menu() {
    println!();
    println!("1) Post text");
    println!("2) Follow a user");
    println!("3) Send private message");
    println!("4) View notifications");
    println!("5) View timeline");
    println!("6) Set forced delay");
    println!("7) Quit");
}

async fn post_text(session: &Session) {
    let texto = prompt_line("Text: ").unwrap_or_default();
    let timestamp = session.post_timestamp().await;
    let request = ClientRequest::PostText {
        username: session.username.clone(),
        id: session.user_id,
        texto,
        tempo_envio_mensagem: timestamp,
    };
    report(session.request(&request).await);
}

async fn follow_user(session: &Session) {
    let to_follow = prompt_line("Username to follow: ").unwrap_or_default();
    if to_follow == session.username {
        println!("You can't follow yourself.");
        warn!("{} tried to follow themselves", session.username);
        return;
    }
    let request = ClientRequest::AddFollower {
        id: session.user_id,
        to_follow,
    };
    report(session.request(&request).await);
}

async fn send_private_message(session: &Session) {
    let destinatario = prompt_line("Send to username: ").unwrap_or_default();
    if destinatario == session.username {
        println!("You can't send a private message to yourself.");
        warn!("{} tried to message themselves", session.username);
        return;
    }
    let mensagem = prompt_line("Message: ").unwrap_or_default();
    let timestamp = session.message_timestamp().await.to_string();
    let request = ClientRequest::AddPrivateMessage {
        remetente: session.username.clone(),
        destinatario,
        mensagem,
        timestamp,
    };
    report(session.request(&request).await);
}

async fn view_notifications(session: &Session) {
    let pending = session.drain_notifications().await;
    if pending.is_empty() {
        println!("No new notifications.");
    }
    for line in pending {
        println!("[notification] {line}");
    }
}

async fn view_timeline(session: &Session) {
    report(session.request(&ClientRequest::GetTimeline).await);
}

async fn set_forced_delay(session: &Session) {
    let raw = prompt_line("Forced delay in seconds (0 to disable): ").unwrap_or_default();
    match raw.parse::<i64>() {
        Ok(secs) => {
            session.set_forced_delay(secs).await;
            println!("Forced delay set to {secs}s.");
        }
        Err(_) => println!("Not a valid number of seconds."),
    }
}

fn report(result: anyhow::Result<serde_json::Value>) {
    match result {
        Ok(value) => println!("{value}"),
        Err(e) => error!("request failed: {e:#}"),
    }
}
