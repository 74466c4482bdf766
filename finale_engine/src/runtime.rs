use std::{fs, path::Path, rc::Rc};

use anyhow::{Context, Result};
use finale_script::{page::Pages, FinaleHost, InputEvent, Interpreter};
use log::{debug, info};
use serde::Serialize;

use crate::cli::RunArgs;
use crate::host_bridge::{HostEvent, LoggedHostEvent, RecordingHost};
use crate::manifest::ResourceManifest;

#[derive(Debug, Serialize)]
struct HostEventLog {
    finale: u32,
    script: String,
    ended_at: Option<u32>,
    ticks_run: u32,
    events: Vec<LoggedHostEvent>,
    /// Widget state at the moment a script that never ended was cut off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<Pages>,
}

pub fn execute(args: RunArgs) -> Result<()> {
    let RunArgs {
        script,
        resources,
        max_ticks,
        presses,
        skip_at,
        client,
        event_log_json,
        finale_id,
    } = args;

    let source = fs::read_to_string(&script)
        .with_context(|| format!("reading finale script {}", script.display()))?;
    let manifest = ResourceManifest::load(resources.as_deref())?;
    if let Some(path) = event_log_json.as_ref() {
        eprintln!(
            "[finale_engine] info: capturing host calls to {}",
            path.display()
        );
    }

    let host = Rc::new(RecordingHost::new(manifest, client));
    let mut interpreter = Interpreter::load(
        finale_id,
        &source,
        host.clone() as Rc<dyn FinaleHost>,
    )
    .with_context(|| format!("loading finale script {}", script.display()))?;
    info!(
        "finale {finale_id} loaded from {} ({max_ticks} tick budget)",
        script.display()
    );

    let mut ended_at = None;
    let mut ticks_run = 0;
    for tick in 1..=max_ticks {
        host.set_tick(tick);
        ticks_run = tick;

        // A demo started by the script is treated as finishing right away.
        if interpreter.is_suspended() {
            interpreter.resume();
            host.record(HostEvent::Resumed);
        }
        for press in presses.iter().filter(|press| press.tick == tick) {
            let consumed = interpreter.handle_event(&InputEvent::key_down(press.key));
            debug!("tick {tick}: key {} consumed={consumed}", press.name);
            host.record(HostEvent::KeyPress {
                key: press.name.clone(),
                consumed,
            });
            if !consumed && interpreter.is_menu_trigger() {
                host.record(HostEvent::OpenMenu);
            }
        }
        if skip_at.contains(&tick) {
            let consumed = interpreter.skip();
            host.record(HostEvent::SkipRequest { consumed });
        }

        let finished = interpreter
            .run_ticks(true)
            .with_context(|| format!("running {} at tick {tick}", script.display()))?;
        if finished {
            ended_at = Some(tick);
            break;
        }
    }

    let mut pages = None;
    if ended_at.is_none() {
        eprintln!(
            "[finale_engine] warning: {} still running after {max_ticks} ticks",
            script.display()
        );
        pages = Some(interpreter.pages().clone());
        interpreter.stop();
    }

    let events = host.events();
    print_summary(finale_id, &script, ended_at, &events);

    if let Some(path) = event_log_json.as_ref() {
        let log = HostEventLog {
            finale: finale_id,
            script: script.display().to_string(),
            ended_at,
            ticks_run,
            events,
            pages,
        };
        let json =
            serde_json::to_string_pretty(&log).context("serializing host event log to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("writing host event log to {}", path.display()))?;
        println!("Saved host event log to {}", path.display());
    }

    Ok(())
}

fn print_summary(finale: u32, script: &Path, ended_at: Option<u32>, events: &[LoggedHostEvent]) {
    match ended_at {
        Some(tick) => println!("Finale {finale} ({}) ended at tick {tick}", script.display()),
        None => println!("Finale {finale} ({}) did not end", script.display()),
    }
    if events.is_empty() {
        return;
    }
    println!("\nHost calls:");
    for entry in events {
        println!("  {:>5}  {}", entry.tick, describe_event(&entry.event));
    }
}

fn describe_event(event: &HostEvent) -> String {
    match event {
        HostEvent::PlaySound { name, volume } => format!("sound {name} (volume {volume:.2})"),
        HostEvent::PlayMusic { name, looped } => {
            if *looped {
                format!("music {name} (looped)")
            } else {
                format!("music {name}")
            }
        }
        HostEvent::StopMusic => "music stopped".to_string(),
        HostEvent::ExecuteCommand { command } => format!("console: {command}"),
        HostEvent::PlayDemo { path } => format!("demo {path}"),
        HostEvent::BroadcastSkip { finale } => format!("skip broadcast for finale {finale}"),
        HostEvent::RequestSkip { finale } => {
            format!("skip requested from server for finale {finale}")
        }
        HostEvent::FinaleStopped { finale } => format!("finale {finale} stopped"),
        HostEvent::KeyPress { key, consumed } => {
            format!("key {key} ({})", if *consumed { "eaten" } else { "passed on" })
        }
        HostEvent::SkipRequest { consumed } => {
            format!("skip ({})", if *consumed { "taken" } else { "refused" })
        }
        HostEvent::OpenMenu => "menu opened".to_string(),
        HostEvent::Resumed => "resumed after demo".to_string(),
    }
}
