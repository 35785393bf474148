pub mod audio;
pub mod auth;
pub mod error;
pub mod persistence;
pub mod session;
pub mod state;
pub mod synth;
pub mod viz;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::audio::playback::PlaybackEngine;
use crate::audio::CpalOutputDevice;
use crate::auth::UserDirectory;
use crate::error::SessionError;
use crate::state::AppState;
use crate::synth::gemini::GeminiTts;
use crate::synth::{prompt, Synthesizer, TtsMode, VoiceName};
use crate::viz::term::TerminalCanvas;

const WAVE_WIDTH: u32 = 72;
const WAVE_HEIGHT: u32 = 9;
const WAVE_REFRESH: Duration = Duration::from_millis(33);

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("Starting Zotpot TTS v{}", env!("CARGO_PKG_VERSION"));

    let device = CpalOutputDevice::open()?;
    let engine = PlaybackEngine::new(Box::new(device));
    let state = Arc::new(AppState::new(engine));
    *state.settings.lock().unwrap() = persistence::load_settings();
    tracing::info!("Settings loaded");

    let users = UserDirectory::open_default()?;
    let synthesizer = GeminiTts::from_env()?;

    println!("Zotpot TTS — type 'help' for commands.");
    print_settings(&state);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "help" => print_help(),
            "gen" => handle_generate(&state, &synthesizer, rest).await,
            "play" => match entry_id_at(&state, rest) {
                Some(id) => match session::play_entry(&state, &id) {
                    Ok(()) => attach_wave(&state),
                    Err(e) => println!("Error: {e}"),
                },
                None => println!("Usage: play <n>  (see 'list')"),
            },
            "stop" => session::stop_playback(&state),
            "del" => match entry_id_at(&state, rest) {
                Some(id) => session::delete_entry(&state, &id),
                None => println!("Usage: del <n>  (see 'list')"),
            },
            "export" => handle_export(&state, rest),
            "list" => print_history(&state),
            "login" => handle_login(&state, &users, rest),
            "logout" => {
                *state.session_user.lock().unwrap() = None;
                println!("Logged out.");
            }
            "voice" => set_voice(&state, rest),
            "mode" => set_mode(&state, rest),
            "lang" => set_language(&state, rest),
            "pitch" => set_step(&state, rest, "pitch"),
            "speed" => set_step(&state, rest, "speed"),
            "quit" | "exit" => break,
            other => println!("Unknown command: {other} (try 'help')"),
        }
    }

    session::stop_playback(&state);
    persistence::save_settings(&state.settings.lock().unwrap());
    state.playback.lock().unwrap().close();
    tracing::info!("Goodbye");
    Ok(())
}

async fn handle_generate(state: &Arc<AppState>, synthesizer: &dyn Synthesizer, text: &str) {
    let text = if text.is_empty() {
        // Fall back to the sample text for the selected language.
        let code = state.settings.lock().unwrap().language.clone();
        prompt::language(&code)
            .map(|l| l.default_text.to_string())
            .unwrap_or_default()
    } else {
        text.to_string()
    };

    match session::generate(state, synthesizer, &text).await {
        Ok(entry) => {
            println!("Generated clip {} — playing.", entry.id);
            attach_wave(state);
        }
        Err(e) => println!("Error: {e}"),
    }
}

fn handle_export(state: &Arc<AppState>, rest: &str) {
    let (index, dir) = match rest.split_once(char::is_whitespace) {
        Some((index, dir)) => (index, PathBuf::from(dir.trim())),
        None => (rest, PathBuf::from(".")),
    };
    let Some(id) = entry_id_at(state, index) else {
        println!("Usage: export <n> [dir]");
        return;
    };
    match session::export_entry(state, &id, &dir) {
        Ok(path) => println!("Saved {}", path.display()),
        Err(SessionError::Unauthorized) => {
            println!("Downloads require login: login <username> <password>")
        }
        Err(e) => println!("Error: {e}"),
    }
}

fn handle_login(state: &Arc<AppState>, users: &UserDirectory, rest: &str) {
    let mut parts = rest.split_whitespace();
    let (Some(username), Some(password)) = (parts.next(), parts.next()) else {
        println!("Usage: login <username> <password>");
        return;
    };
    match users.authenticate(username, password) {
        Ok(Some(user)) => {
            println!("Welcome, {} ({:?}).", user.username, user.role);
            *state.session_user.lock().unwrap() = Some(user);
        }
        Ok(None) => println!("Invalid username or password."),
        Err(e) => println!("Error: {e}"),
    }
}

fn attach_wave(state: &Arc<AppState>) {
    let canvas = TerminalCanvas::new(WAVE_WIDTH, WAVE_HEIGHT);
    session::start_render_loop(state, canvas, WAVE_REFRESH);
}

/// Resolve a 1-based history index (most recent first) to an entry id.
fn entry_id_at(state: &Arc<AppState>, index: &str) -> Option<String> {
    let n: usize = index.parse().ok()?;
    state
        .history
        .lock()
        .unwrap()
        .get(n.checked_sub(1)?)
        .map(|e| e.id.clone())
}

fn set_voice(state: &Arc<AppState>, rest: &str) {
    match rest.parse::<VoiceName>() {
        Ok(voice) => {
            state.settings.lock().unwrap().voice = voice;
            persistence::save_settings(&state.settings.lock().unwrap());
            println!("Voice: {}", voice.display_name());
        }
        Err(e) => {
            println!("{e}");
            let names: Vec<_> = VoiceName::ALL.iter().map(|v| v.display_name()).collect();
            println!("Voices: {}", names.join(", "));
        }
    }
}

fn set_mode(state: &Arc<AppState>, rest: &str) {
    match rest.parse::<TtsMode>() {
        Ok(mode) => {
            state.settings.lock().unwrap().mode = mode;
            persistence::save_settings(&state.settings.lock().unwrap());
            println!("Mode: {}", mode.label());
        }
        Err(e) => {
            println!("{e}");
            let labels: Vec<_> = TtsMode::ALL.iter().map(|m| m.label()).collect();
            println!("Modes: {}", labels.join(", "));
        }
    }
}

fn set_language(state: &Arc<AppState>, rest: &str) {
    match prompt::language(rest) {
        Some(language) => {
            state.settings.lock().unwrap().language = language.code.to_string();
            persistence::save_settings(&state.settings.lock().unwrap());
            println!("Language: {}", language.name);
        }
        None => {
            let codes: Vec<_> = prompt::LANGUAGES.iter().map(|l| l.code).collect();
            println!("Languages: {}", codes.join(", "));
        }
    }
}

fn set_step(state: &Arc<AppState>, rest: &str, which: &str) {
    match rest.parse::<i8>() {
        Ok(step) if (-2..=2).contains(&step) => {
            {
                let mut settings = state.settings.lock().unwrap();
                if which == "pitch" {
                    settings.pitch = step;
                } else {
                    settings.speed = step;
                }
            }
            persistence::save_settings(&state.settings.lock().unwrap());
            println!("{which}: {step}");
        }
        _ => println!("Usage: {which} <-2..=2>"),
    }
}

fn print_history(state: &Arc<AppState>) {
    let playing = state
        .playback
        .lock()
        .unwrap()
        .playing_entry_id()
        .map(str::to_string);
    let history = state.history.lock().unwrap();
    if history.is_empty() {
        println!("No clips yet. Try: gen <text>");
        return;
    }
    for (i, entry) in history.iter().enumerate() {
        let marker = if playing.as_deref() == Some(entry.id.as_str()) {
            "▶"
        } else {
            " "
        };
        let duration = entry
            .audio
            .as_ref()
            .map(|a| a.duration_secs())
            .unwrap_or(0.0);
        println!(
            "{marker} {}. [{}] {:.1}s @{}  {}",
            i + 1,
            entry.voice.display_name(),
            duration,
            entry.created_at / 1000,
            entry.source_text
        );
    }
}

fn print_settings(state: &Arc<AppState>) {
    let settings = state.settings.lock().unwrap();
    println!(
        "Voice {} | mode {} | lang {} | pitch {} | speed {}",
        settings.voice.display_name(),
        settings.mode.label(),
        settings.language,
        settings.pitch,
        settings.speed
    );
}

fn print_help() {
    println!(
        "\
Commands:
  gen [text]        generate speech (defaults to the language sample)
  play <n>          play history entry n (1 = newest)
  stop              stop playback
  del <n>           delete history entry n
  export <n> [dir]  save entry n as WAV (requires login)
  list              show the session history
  login <u> <p> / logout
  voice|mode|lang|pitch|speed <value>
  quit"
    );
}
