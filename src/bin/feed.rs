use std::sync::Arc;

use chrono::{DateTime, Local};
use env_logger::Env;
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use guestbook::client::GuestbookClient;
use guestbook::config::ClientConfig;
use guestbook::feed::{merge, FeedEvent, FeedView, Filter, LoadState};
use guestbook::message::{Message, NewMessage};
use guestbook::Result;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let client = Arc::new(GuestbookClient::new(&config));

    let (mut view, mut feed) = match client.open_feed().await {
        Ok(opened) => opened,
        Err(e) => {
            error!("Failed to subscribe: {}", e);
            std::process::exit(1);
        }
    };
    let mut mine_only = false;
    render(&view, &config.name, mine_only);
    if matches!(view.state(), LoadState::Failed(_)) {
        std::process::exit(1);
    }

    let (results_tx, mut results_rx) = mpsc::unbounded_channel::<(String, Result<Message>)>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("Posting as {}. Type a message, /mine or /all to filter, Ctrl-D to quit", config.name);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match line.trim() {
                    "/mine" => mine_only = true,
                    "/all" => mine_only = false,
                    text => {
                        let draft = match NewMessage::new(&config.name, text) {
                            Ok(draft) => draft,
                            Err(e) => {
                                warn!("{}", e);
                                continue;
                            }
                        };
                        let placeholder = Message::placeholder(&draft);
                        let placeholder_id = placeholder.id.clone();
                        view = merge(view, FeedEvent::Optimistic(placeholder));

                        let client = Arc::clone(&client);
                        let results_tx = results_tx.clone();
                        tokio::spawn(async move {
                            let result = client.add_message(&draft).await;
                            let _ = results_tx.send((placeholder_id, result));
                        });
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },
            Some((placeholder_id, result)) = results_rx.recv() => {
                view = match result {
                    Ok(message) => merge(view, FeedEvent::Confirmed(message)),
                    Err(e) => {
                        error!("Failed to send message: {}", e);
                        merge(view, FeedEvent::Rejected { placeholder_id })
                    }
                };
            }
            event = feed.recv() => match event {
                Some(Ok(message)) => view = merge(view, FeedEvent::Confirmed(message)),
                Some(Err(e)) => {
                    error!("Subscription failed: {}", e);
                    break;
                }
                None => {
                    warn!("Subscription closed by server");
                    break;
                }
            },
        }
        render(&view, &config.name, mine_only);
    }
}

fn render(view: &FeedView, name: &str, mine_only: bool) {
    let filter = if mine_only { Filter::Mine(name) } else { Filter::All };
    let visible = view.visible(filter);

    println!("──── guestbook ({}) ────", if mine_only { "mine" } else { "all" });
    if let LoadState::Failed(reason) = view.state() {
        println!("  could not load messages: {reason}");
        return;
    }
    if visible.is_empty() {
        println!("  No messages yet ✨");
    }
    for message in visible.into_iter().rev() {
        let pending = if message.is_placeholder() { " (sending…)" } else { "" };
        println!(
            "  [{}] {}: {}{}",
            local_time(&message.created_at),
            message.name,
            message.text,
            pending
        );
    }
}

fn local_time(created_at: &str) -> String {
    DateTime::parse_from_rfc3339(created_at).map_or_else(
        |_| created_at.to_string(),
        |t| t.with_timezone(&Local).format("%H:%M:%S").to_string(),
    )
}
