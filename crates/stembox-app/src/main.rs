//! StemBox - rehearsal playback from the command line.
//!
//! Loads a separation job result, then drives the engine from a small
//! stdin command loop.

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use stembox_audio::{AudioBackend, DeviceBackend};
use stembox_core::{CustomTrackDescriptor, JobResult, MixerTrack};
use stembox_engine::{Engine, EngineConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const HELP: &str = "\
commands:
  load <job.json> [base-url]    load stems + auxiliaries from a job result
  custom <tracks.json>          reconcile custom tracks from a descriptor list
  mix <snapshot.json>           apply a mixer-state snapshot
  play | pause | stop           transport
  seek <seconds>                move the timeline
  click|guide|pad on|off        toggle an auxiliary track
  padpitch <semitones>          pitch-shift the pad
  padvol <gain>                 pad gain, clamped to [0, 1.5]
  status                        print transport state and position
  quit";

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("StemBox starting");

    let backend = Arc::new(DeviceBackend::new()?);
    let mut engine = Engine::new(backend as Arc<dyn AudioBackend>, EngineConfig::default());

    if let Some(path) = std::env::args().nth(1) {
        load_job(&mut engine, &path, None).await?;
    }

    println!("{HELP}");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        let args: Vec<&str> = parts.collect();

        let result = run_command(&mut engine, command, &args).await;
        match result {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("error: {e:#}"),
        }
    }

    engine.shutdown();
    Ok(())
}

/// Returns `Ok(false)` when the loop should exit.
async fn run_command(engine: &mut Engine, command: &str, args: &[&str]) -> Result<bool> {
    match command {
        "load" => {
            let path = args.first().context("usage: load <job.json> [base-url]")?;
            load_job(engine, path, args.get(1).copied()).await?;
        }
        "custom" => {
            let path = args.first().context("usage: custom <tracks.json>")?;
            let descriptors: Vec<CustomTrackDescriptor> = read_json(path)?;
            engine.load_custom_tracks(&descriptors).await;
            println!("reconciled {} custom track(s)", descriptors.len());
        }
        "mix" => {
            let path = args.first().context("usage: mix <snapshot.json>")?;
            let snapshot: Vec<MixerTrack> = read_json(path)?;
            engine.set_mixer_state(&snapshot);
        }
        "play" => engine.play(),
        "pause" => engine.pause(),
        "stop" => engine.stop(),
        "seek" => {
            let seconds: f64 = args
                .first()
                .context("usage: seek <seconds>")?
                .parse()
                .context("seconds must be a number")?;
            engine.seek(seconds);
        }
        "click" | "guide" | "pad" => {
            let enabled = parse_on_off(args.first().copied())?;
            match command {
                "click" => engine.set_click_enabled(enabled),
                "guide" => engine.set_guide_enabled(enabled),
                _ => engine.set_pad_enabled(enabled),
            }
        }
        "padpitch" => {
            let semitones: f32 = args
                .first()
                .context("usage: padpitch <semitones>")?
                .parse()
                .context("semitones must be a number")?;
            engine.set_pad_pitch(semitones);
        }
        "padvol" => {
            let gain: f32 = args
                .first()
                .context("usage: padvol <gain>")?
                .parse()
                .context("gain must be a number")?;
            engine.set_pad_volume(gain);
        }
        "status" => {
            println!(
                "{:?} at {:.3}s of {:.3}s, {} track(s), {} pending fx start(s)",
                engine.state(),
                engine.position_ms() as f64 / 1000.0,
                engine.duration_ms() as f64 / 1000.0,
                engine.registry().len(),
                engine.pending_fx_starts(),
            );
        }
        "help" => println!("{HELP}"),
        "quit" | "exit" => return Ok(false),
        other => eprintln!("unknown command: {other} (try 'help')"),
    }
    Ok(true)
}

async fn load_job(engine: &mut Engine, path: &str, base_url: Option<&str>) -> Result<()> {
    let job: JobResult = read_json(path)?;
    engine.load_from_backend(&job, base_url).await;
    println!(
        "loaded {} track(s), longest {:.3}s",
        engine.registry().len(),
        engine.duration_ms() as f64 / 1000.0
    );
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let text = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {path}"))
}

fn parse_on_off(arg: Option<&str>) -> Result<bool> {
    match arg {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => anyhow::bail!("expected 'on' or 'off'"),
    }
}
