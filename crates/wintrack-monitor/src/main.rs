/*!
wintrack-monitor - print the tracked state of the current X11 session and
then every change, one JSON object per line.

```text
wintrack-monitor [--config <PATH>] [--once]
```

`RUST_LOG` controls diagnostics on stderr (default `info`).
*/

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use async_broadcast::TryRecvError;
use clap::Parser;
use serde_json::json;
use wintrack::{ApplicationDatabase, Tracker, TrackerConfig, X11WindowSystem};

const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Print the tracked state of the current X11 session, then every change.
#[derive(Parser, Debug)]
#[command(name = "wintrack-monitor")]
#[command(version, about, long_about = None)]
struct Args {
  /// JSON tracker configuration file.
  #[arg(long, value_name = "PATH")]
  config: Option<PathBuf>,

  /// Print the snapshot and exit.
  #[arg(long)]
  once: bool,
}

fn print_line(out: &mut impl Write, value: &serde_json::Value) -> io::Result<()> {
  writeln!(out, "{value}")?;
  out.flush()
}

fn main() -> Result<(), Box<dyn Error>> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let args = Args::parse();

  let config = match &args.config {
    Some(path) => TrackerConfig::load(path)?,
    None => TrackerConfig::default(),
  };
  let database = if config.application_dirs.is_empty() {
    ApplicationDatabase::system()
  } else {
    ApplicationDatabase::new(config.application_dirs.iter().cloned())
  };
  let poll_interval_ms = config.poll_interval_ms;

  let system = X11WindowSystem::connect(None).map_err(|e| {
    log::error!("{e}");
    e
  })?;
  let tracker = Tracker::builder(system)
    .application_database(database)
    .config(config)
    .build()?;
  log::info!(
    "Tracking {} windows, {} applications installed",
    tracker.get_windows().len(),
    tracker.application_database().len()
  );

  let mut events = tracker.subscribe();
  let mut out = io::stdout().lock();
  print_line(
    &mut out,
    &json!({
      "event": "snapshot",
      "data": {
        "windows": tracker.get_windows(),
        "active_window": tracker.get_active_window().map(|w| w.id),
        "workspaces": tracker.get_workspaces(),
        "active_workspace": tracker.get_active_workspace().map(|ws| ws.number),
        "monitors": tracker.get_monitors(),
        "running_applications": tracker.get_running_applications(),
      },
    }),
  )?;
  if args.once {
    tracker.shutdown();
    return Ok(());
  }

  loop {
    if poll_interval_ms == 0 {
      if let Err(e) = tracker.dispatch_pending() {
        log::warn!("Refresh failed: {e}");
      }
    }
    loop {
      match events.try_recv() {
        Ok(event) => print_line(&mut out, &serde_json::to_value(&event)?)?,
        Err(TryRecvError::Overflowed(missed)) => log::warn!("Output fell behind, {missed} events lost"),
        Err(TryRecvError::Empty | TryRecvError::Closed) => break,
      }
    }
    thread::sleep(DRAIN_INTERVAL);
  }
}
