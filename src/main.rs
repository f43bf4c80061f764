//! deckctl binary - wires a MIDI input and the interactive console onto the
//! dispatch engine.
//!
//! The engine itself is synchronous; events from the midir callback thread
//! and commands from the REPL are serialized onto one tokio task before any
//! dispatch happens.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use midir::{MidiInput, MidiInputConnection};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deckctl::binding::{Binding, Source};
use deckctl::cli::{self, Command};
use deckctl::codec;
use deckctl::config::AppConfig;
use deckctl::controls::{Controls, Learner};
use deckctl::midi::{format_hex, MidiMessage};
use deckctl::paths::AppPaths;
use deckctl::prefs;
use deckctl::session::ConsoleSession;
use deckctl::watcher::BindingsWatcher;

/// deckctl - drive a live broadcast console from MIDI surfaces and keyboard
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to the detected location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the bindings file (overrides config and detection)
    #[arg(short, long)]
    bindings: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI input ports
    #[arg(long)]
    list_ports: bool,

    /// Print decoded MIDI traffic without dispatching
    #[arg(long)]
    monitor: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        list_ports()?;
        return Ok(());
    }

    let detected = AppPaths::detect();
    let config_path = args.config.clone().unwrap_or_else(|| detected.config.clone());
    let config = AppConfig::load_or_default(&config_path).await?;
    let paths = AppPaths::at(
        config_path,
        args.bindings
            .clone()
            .or_else(|| config.bindings_file.clone())
            .unwrap_or(detected.bindings),
    );
    let bindings_path = paths.bindings;

    if args.monitor {
        return run_monitor(&config.midi.input_port).await;
    }

    info!("Starting deckctl");
    info!("Bindings file: {}", bindings_path.display());

    let bindings = if bindings_path.exists() {
        prefs::load_bindings(&bindings_path).await?
    } else {
        info!("No bindings file, installing defaults");
        prefs::default_bindings()
    };

    let mut controls =
        Controls::with_repeat_ttl(ConsoleSession::default(), config.repeat_ttl());
    controls.set_bindings(bindings);

    let (midi_tx, midi_rx) = mpsc::unbounded_channel();
    let _connection = connect_midi(&config.midi.input_port, midi_tx)?;

    let watcher = if bindings_path.exists() {
        match BindingsWatcher::new(&bindings_path) {
            Ok(watcher) => Some(watcher),
            Err(err) => {
                warn!("Bindings hot reload unavailable: {}", err);
                None
            }
        }
    } else {
        None
    };

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let engine = tokio::spawn(run_engine(
        controls,
        midi_rx,
        cmd_rx,
        watcher,
        bindings_path,
    ));

    // rustyline blocks; keep it off the runtime worker threads
    let repl = tokio::task::spawn_blocking(move || cli::run_repl(cmd_tx));
    repl.await??;
    engine.await?;

    info!("deckctl shutdown complete");
    Ok(())
}

/// Prints raw signatures while attached; normal dispatch is suspended.
struct ConsoleLearner;

impl Learner for ConsoleLearner {
    fn learn(&self, signature: deckctl::Signature) {
        println!(
            "{} {}  ({})",
            "learn:".cyan().bold(),
            signature,
            describe_signature(&signature)
        );
    }
}

async fn run_engine(
    mut controls: Controls<ConsoleSession>,
    mut midi_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    mut watcher: Option<BindingsWatcher>,
    bindings_path: PathBuf,
) {
    // kept alive while learning so the engine's weak reference stays valid
    let mut learner: Option<Arc<dyn Learner>> = None;

    loop {
        tokio::select! {
            Some(bytes) = midi_rx.recv() => {
                if let Some(message) = MidiMessage::parse(&bytes) {
                    let (signature, raw) = message.to_input();
                    controls.input(signature, raw);
                }
            }
            command = cmd_rx.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::Show => {
                        for (index, binding) in controls.bindings().iter().enumerate() {
                            println!(
                                "{:3}  {}  {}",
                                index,
                                binding.to_string().green(),
                                describe_binding(binding).dimmed()
                            );
                        }
                    }
                    Command::State => println!("{:#?}", controls.handler()),
                    Command::Learn => {
                        let attached: Arc<dyn Learner> = Arc::new(ConsoleLearner);
                        controls.attach_learner(&attached);
                        learner = Some(attached);
                        println!("Learning; move a control or press a key. 'done' to stop.");
                    }
                    Command::Done => {
                        controls.detach_learner();
                        learner = None;
                        println!("Dispatch resumed.");
                    }
                    Command::Save => {
                        if let Err(err) =
                            prefs::save_bindings(&bindings_path, controls.bindings()).await
                        {
                            warn!("Save failed: {}", err);
                        }
                    }
                    Command::Reload => match prefs::load_bindings(&bindings_path).await {
                        Ok(bindings) => controls.set_bindings(bindings),
                        Err(err) => warn!("Reload failed, keeping current bindings: {}", err),
                    },
                    Command::Quit => break,
                }
            }
            Some(bindings) = next_reload(&mut watcher) => {
                controls.set_bindings(bindings);
            }
        }
    }
    drop(learner);
}

async fn next_reload(watcher: &mut Option<BindingsWatcher>) -> Option<Vec<Binding>> {
    match watcher {
        Some(watcher) => watcher.next_bindings().await,
        None => std::future::pending().await,
    }
}

/// Human-readable rendering of a binding's input side.
fn describe_binding(binding: &Binding) -> String {
    format!("{} -> {}", describe_signature(&binding.signature()), binding.method)
}

fn describe_signature(signature: &deckctl::Signature) -> String {
    match signature.source {
        Source::Keyboard => format!(
            "key {}{}",
            codec::modifier_glyphs(signature.channel),
            codec::key_name(signature.control)
        ),
        Source::Note => format!(
            "note {} ch{}",
            codec::note_name((signature.control & 0x7f) as u8),
            signature.channel + 1
        ),
        Source::ControlChange => {
            format!("CC {} ch{}", signature.control, signature.channel + 1)
        }
        Source::PitchWheel => format!("pitch wheel ch{}", signature.channel + 1),
    }
}

fn connect_midi(
    pattern: &str,
    tx: mpsc::UnboundedSender<Vec<u8>>,
) -> Result<Option<MidiInputConnection<()>>> {
    let midi_in = MidiInput::new("deckctl")?;
    let ports = midi_in.ports();

    let port = if pattern.is_empty() {
        ports.first().cloned()
    } else {
        ports.iter().find(|port| {
            midi_in
                .port_name(port)
                .map(|name| name.contains(pattern))
                .unwrap_or(false)
        }).cloned()
    };

    let Some(port) = port else {
        warn!("No MIDI input port matching '{}'; keyboard/REPL only", pattern);
        return Ok(None);
    };

    let name = midi_in.port_name(&port).unwrap_or_default();
    let connection = midi_in
        .connect(
            &port,
            "deckctl-in",
            move |_timestamp, bytes, _| {
                let _ = tx.send(bytes.to_vec());
            },
            (),
        )
        .map_err(|err| anyhow::anyhow!("Failed to connect MIDI input '{}': {}", name, err))?;

    info!("Connected MIDI input: {}", name);
    Ok(Some(connection))
}

fn list_ports() -> Result<()> {
    let midi_in = MidiInput::new("deckctl-discovery")?;
    println!("{}", "MIDI input ports:".bold());
    let ports = midi_in.ports();
    if ports.is_empty() {
        println!("  (none)");
    }
    for (index, port) in ports.iter().enumerate() {
        if let Ok(name) = midi_in.port_name(port) {
            println!("  [{index}] {name}");
        }
    }
    Ok(())
}

async fn run_monitor(pattern: &str) -> Result<()> {
    println!("{}", "=== MIDI monitor ===".bold().cyan());
    println!("Press Ctrl+C to exit\n");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _connection = connect_midi(pattern, tx)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(bytes) = rx.recv() => {
                match MidiMessage::parse(&bytes) {
                    Some(message) => {
                        let (signature, raw) = message.to_input();
                        println!(
                            "{} | {} => {} raw {}",
                            format_hex(&bytes).dimmed(),
                            message,
                            signature.to_string().green(),
                            raw
                        );
                    }
                    None => println!("{} | (ignored)", format_hex(&bytes).dimmed()),
                }
            }
        }
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
