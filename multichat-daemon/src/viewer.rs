//! Terminal rendering for the `watch` subcommand

use multichat_display::{DisplayClient, DisplayEntry};
use tracing::info;

/// One terminal line per entry
pub fn format_entry(entry: &DisplayEntry) -> String {
    format!(
        "{} {}",
        entry.event.timestamp().format("%H:%M:%S"),
        entry.event
    )
}

/// Print each new entry until Ctrl+C. After a reconnect the server's
/// catch-up window is printed again.
pub async fn watch(url: &str) -> anyhow::Result<()> {
    let (client, mut rx) = DisplayClient::new(url);
    let task = tokio::spawn(client.run());
    info!("Watching {}", url);

    let mut seen = 0;
    let mut connected = false;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                if snapshot.connected != connected {
                    connected = snapshot.connected;
                    info!("Viewer {}", if connected { "connected" } else { "disconnected" });
                }
                for entry in snapshot.new_since(seen) {
                    println!("{}", format_entry(entry));
                }
                seen = snapshot.received;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Received shutdown signal");
                break;
            }
        }
    }

    task.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use multichat_broadcaster::{ChatEvent, EventKind, MessageContent, Platform, UserIdentity};
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_format_entry() {
        let timestamp = (UNIX_EPOCH + Duration::from_secs(3600 + 2 * 60 + 3)).into();
        let mut message = MessageContent::plain("waves");
        message.action = true;
        let entry = DisplayEntry::render(ChatEvent::new(
            Platform::Twitch,
            EventKind::Chat,
            UserIdentity::named("alice"),
            message,
            timestamp,
        ));

        assert_eq!(format_entry(&entry), "01:02:03 [Twitch] * alice waves");
    }
}
