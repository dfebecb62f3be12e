//! Client execution logic: WebSocket session with reconnection, terminal
//! input, and the render tick loop.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use kodou_shared::protocol::{DanmakuEntry, DanmakuStatus, Event, Mode};
use kodou_shared::time::epoch_millis;

use crate::bridge::{BridgeError, HostBridge, Identity, UserInfo, VibratePattern};
use crate::danmaku::RendererConfig;
use crate::effects::NullSoundEffects;
use crate::error::ClientError;
use crate::formatter::{MessageFormatter, redisplay_prompt};
use crate::session::{ClientCore, QUICK_PHRASES, TICK_INTERVAL_MS};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;
/// Cooldown between chat submissions, same as the mobile shell enforces.
const SEND_COOLDOWN_MS: i64 = 3000;

/// Options for the viewer client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// WebSocket URL of the relay (e.g., "ws://127.0.0.1:2026/ws")
    pub url: String,
    /// Display name used for registration and chat
    pub name: String,
}

/// Terminal stand-in for the mobile shell's host bridge.
struct CliBridge {
    user_id: String,
    name: String,
}

#[async_trait::async_trait]
impl HostBridge for CliBridge {
    async fn user_info(&self) -> Result<UserInfo, BridgeError> {
        Ok(UserInfo {
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            avatar: None,
        })
    }

    fn vibrate(&self, pattern: VibratePattern) {
        tracing::debug!("Vibrate ({:?}) requested; terminal has no haptics", pattern);
    }
}

/// Parsed terminal input.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Say(String),
    Quick(usize),
    SwitchMode(Mode),
    List,
    Delete(String),
    Status,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }
    if !trimmed.starts_with('/') {
        return Command::Say(trimmed.to_string());
    }

    let mut parts = trimmed.splitn(2, ' ');
    let head = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    match head {
        "/quit" | "/exit" => Command::Quit,
        "/status" => Command::Status,
        "/list" => Command::List,
        "/mode" => match rest.parse::<Mode>() {
            Ok(mode) => Command::SwitchMode(mode),
            Err(_) => Command::Unknown(trimmed.to_string()),
        },
        "/delete" if !rest.is_empty() => Command::Delete(rest.to_string()),
        "/q" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 && n <= QUICK_PHRASES.len() => Command::Quick(n - 1),
            _ => Command::Unknown(trimmed.to_string()),
        },
        _ => Command::Unknown(trimmed.to_string()),
    }
}

/// Run the viewer with reconnection logic
pub async fn run_client(options: ClientOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Connecting to {} as '{}' (attempt {}/{})",
            options.url,
            options.name,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_session(&options).await {
            Ok(_) => {
                tracing::info!("Viewer session ended normally");
                break;
            }
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);
                reconnect_count += 1;

                if reconnect_count >= MAX_RECONNECT_ATTEMPTS {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    std::process::exit(1);
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );
                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }

    Ok(())
}

async fn run_session(options: &ClientOptions) -> Result<(), Box<dyn std::error::Error>> {
    let (ws_stream, _response) = connect_async(&options.url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    tracing::info!("Connected to relay");
    println!(
        "\nYou are '{}'. Type a message to send danmaku; /mode <normal|excited|death|music>, /q <1-{}>, /list, /delete <id>, /status, /quit.\n",
        options.name,
        QUICK_PHRASES.len()
    );

    let (mut write, mut read) = ws_stream.split();

    // Resolve identity through the bridge; without it, submission stays off
    let bridge = CliBridge {
        user_id: format!("cli-{}", options.name.to_lowercase()),
        name: options.name.clone(),
    };
    let mut identity = Identity::new();
    if let Err(e) = identity.resolve(&bridge).await {
        tracing::warn!("Identity resolution failed: {}; chat is disabled", e);
    }

    // Register and rehydrate the danmaku list
    if let Some(user) = identity.resolved() {
        let register = Event::register(&user.user_id, &user.name, epoch_millis());
        write.send(Message::Text(register.to_json().into())).await?;
    }
    write
        .send(Message::Text(Event::danmaku_list(epoch_millis()).to_json().into()))
        .await?;

    let mut core = ClientCore::new(Box::new(NullSoundEffects), RendererConfig::default());

    // Blocking thread for rustyline (synchronous readline)
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let prompt_name = options.name.clone();
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize line editor: {}", e);
                return;
            }
        };
        loop {
            match rl.readline(&format!("{}> ", prompt_name)) {
                Ok(line) => {
                    if input_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    let _ = input_tx.send("/quit".to_string());
                    break;
                }
                Err(e) => {
                    tracing::error!("Readline error: {}", e);
                    break;
                }
            }
        }
    });

    let mut tick = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS as u64));
    let mut last_sent_at: i64 = 0;

    loop {
        tokio::select! {
            message = read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match Event::parse(&text) {
                            Ok(event) => {
                                let applied = core.handle_event(&event);
                                if let Some(line) = MessageFormatter::format_applied(&applied) {
                                    println!("{line}");
                                    redisplay_prompt(&options.name);
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Unparseable broadcast: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        return Err(ClientError::ConnectionError("Server closed the connection".to_string()).into());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(ClientError::ConnectionError(e.to_string()).into());
                    }
                    None => {
                        return Err(ClientError::ConnectionError("Stream ended".to_string()).into());
                    }
                }
            }
            line = input_rx.recv() => {
                let Some(line) = line else {
                    return Ok(());
                };
                match parse_command(&line) {
                    Command::Quit => return Ok(()),
                    Command::Empty => {}
                    Command::Status => {
                        println!(
                            "{}",
                            MessageFormatter::format_status(
                                core.mode.current().as_str(),
                                core.bpm.value(),
                                core.stats.online_count,
                                core.renderer.pending_count(),
                            )
                        );
                    }
                    Command::List => {
                        write
                            .send(Message::Text(Event::danmaku_list(epoch_millis()).to_json().into()))
                            .await?;
                    }
                    Command::SwitchMode(mode) => {
                        write
                            .send(Message::Text(Event::mode_change(mode, epoch_millis()).to_json().into()))
                            .await?;
                    }
                    Command::Delete(id) => {
                        write
                            .send(Message::Text(Event::danmaku_delete(&id, epoch_millis()).to_json().into()))
                            .await?;
                    }
                    Command::Say(content) => {
                        match submit_danmaku(&identity, &content, false, &mut last_sent_at) {
                            Ok(event) => {
                                write.send(Message::Text(event.to_json().into())).await?;
                                bridge.vibrate(VibratePattern::Short);
                            }
                            Err(reason) => println!("{reason}"),
                        }
                    }
                    Command::Quick(index) => {
                        match submit_danmaku(&identity, QUICK_PHRASES[index], true, &mut last_sent_at) {
                            Ok(event) => {
                                write.send(Message::Text(event.to_json().into())).await?;
                                bridge.vibrate(VibratePattern::Short);
                            }
                            Err(reason) => println!("{reason}"),
                        }
                    }
                    Command::Unknown(input) => {
                        println!("Unrecognized command: {input}");
                    }
                }
            }
            _ = tick.tick() => {
                // Keep the animation state machines live; the terminal
                // viewer has no canvas, so frames are simply dropped.
                core.tick(epoch_millis());
            }
        }
    }
}

/// Build a danmaku submission, enforcing the send cooldown.
fn submit_danmaku(
    identity: &Identity,
    content: &str,
    is_quick_phrase: bool,
    last_sent_at: &mut i64,
) -> Result<Event, String> {
    let user = identity
        .require()
        .map_err(|e| e.to_string())?;

    let now = epoch_millis();
    if now - *last_sent_at < SEND_COOLDOWN_MS {
        return Err(format!(
            "Slow down: one message per {} seconds",
            SEND_COOLDOWN_MS / 1000
        ));
    }
    *last_sent_at = now;

    let entry = DanmakuEntry {
        id: String::new(),
        user_id: user.user_id.clone(),
        name: user.name.clone(),
        avatar: user.avatar.clone().unwrap_or_default(),
        content: content.to_string(),
        timestamp: now,
        is_quick_phrase,
        status: DanmakuStatus::Queued,
    };
    Ok(Event::danmaku(&entry, now))
}
