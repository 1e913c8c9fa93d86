//! Command-line interface and REPL
//!
//! The REPL drives every mounted peer of the demo session: each command acts
//! on the currently selected peer, the way a user would click on one view.

use crate::controller::{ControllerError, ControllerHandle};
use crate::view::ControllerView;
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::debug;

/// One parsed REPL line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// "set" button with the raw input text
    Set(String),
    Toggle,
    Start,
    Stop,
    /// Select the peer (1-based) subsequent commands act on
    Peer(usize),
    Status,
    /// Dump the selected peer's view as JSON
    Json,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => ReplCommand::Empty,
            "set" | "bpm" => ReplCommand::Set(rest.to_string()),
            "toggle" | "t" => ReplCommand::Toggle,
            "start" | "play" => ReplCommand::Start,
            "stop" => ReplCommand::Stop,
            "peer" | "p" => match rest.parse() {
                Ok(n) if n > 0 => ReplCommand::Peer(n),
                _ => ReplCommand::Unknown(line.to_string()),
            },
            "status" | "s" => ReplCommand::Status,
            "json" => ReplCommand::Json,
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            _ => ReplCommand::Unknown(line.to_string()),
        }
    }
}

/// Read lines on the calling (blocking) thread and forward them
///
/// Ends on EOF, Ctrl-C/Ctrl-D or when the receiver is gone.
pub fn run_repl(tx: mpsc::Sender<String>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("metronome> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                let _ = tx.blocking_send("quit".to_string());
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// What the main loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// REPL state: the mounted peers and which one is selected
#[derive(Debug)]
pub struct ReplSession {
    peers: Vec<ControllerHandle>,
    active: usize,
}

impl ReplSession {
    pub fn new(peers: Vec<ControllerHandle>) -> Self {
        Self { peers, active: 0 }
    }

    pub fn peers(&self) -> &[ControllerHandle] {
        &self.peers
    }

    pub fn active_peer(&self) -> Option<&ControllerHandle> {
        self.peers.get(self.active)
    }

    pub async fn execute(&mut self, cmd: ReplCommand) -> Flow {
        debug!(?cmd, "REPL command");

        let Some(peer) = self.peers.get(self.active).cloned() else {
            return Flow::Quit;
        };

        let result = match cmd {
            ReplCommand::Empty => Ok(()),
            ReplCommand::Quit => return Flow::Quit,
            ReplCommand::Help => {
                print_help();
                Ok(())
            }
            ReplCommand::Unknown(line) => {
                println!("{} {}", "Unknown command:".red(), line);
                Ok(())
            }
            ReplCommand::Peer(n) => {
                if n <= self.peers.len() {
                    self.active = n - 1;
                    println!("Now acting as {}", self.peers[self.active].peer().cyan());
                } else {
                    println!("{} only {} peers mounted", "No such peer:".red(), self.peers.len());
                }
                Ok(())
            }
            ReplCommand::Set(input) => match peer.set_bpm(input).await {
                Ok(bpm) => {
                    println!("{} {} bpm", "Set".green(), bpm);
                    Ok(())
                }
                Err(ControllerError::InvalidBpm(e)) => {
                    debug!(error = %e, "Invalid bpm entry");
                    self.print_peer(&peer).await
                }
                Err(e) => Err(e),
            },
            ReplCommand::Toggle => peer.toggle_play().await.map(print_playing),
            ReplCommand::Start | ReplCommand::Stop => {
                let want_playing = cmd == ReplCommand::Start;
                match peer.view().await {
                    Ok(view) if view.is_playing == want_playing => {
                        println!("Already {}", if want_playing { "playing" } else { "stopped" });
                        Ok(())
                    }
                    Ok(_) => peer.toggle_play().await.map(print_playing),
                    Err(e) => Err(e),
                }
            }
            ReplCommand::Status => self.print_status().await,
            ReplCommand::Json => match peer.view().await {
                Ok(view) => {
                    match serde_json::to_string_pretty(&view) {
                        Ok(json) => println!("{}", json),
                        Err(e) => println!("{} {}", "Error:".red(), e),
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            },
        };

        if let Err(e) = result {
            println!("{} {}", "Error:".red(), e);
        }

        Flow::Continue
    }

    async fn print_peer(&self, peer: &ControllerHandle) -> Result<(), ControllerError> {
        let view = peer.view().await?;
        println!("{}", render_view(&view, true));
        Ok(())
    }

    async fn print_status(&self) -> Result<(), ControllerError> {
        for (index, peer) in self.peers.iter().enumerate() {
            let view = peer.view().await?;
            println!("{}", render_view(&view, index == self.active));
        }
        Ok(())
    }
}

fn print_playing(playing: bool) {
    if playing {
        println!("{}", "Playing".green());
    } else {
        println!("{}", "Stopped".yellow());
    }
}

/// Colored one-line rendering of a peer's widget
pub fn render_view(view: &ControllerView, active: bool) -> String {
    let marker = if active { ">" } else { " " };
    let line = view.to_string();
    let line = if view.validation_message.is_some() {
        line.red().to_string()
    } else if view.is_playing {
        line.green().to_string()
    } else {
        line
    };
    format!("{} {}", marker, line)
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  set <bpm>   validate and share a new tempo");
    println!("  toggle      start/stop button");
    println!("  start|stop  start or stop if not already");
    println!("  peer <n>    act as peer n");
    println!("  status      show every peer");
    println!("  json        dump this peer's view as JSON");
    println!("  quit        unmount all peers and exit");
}
