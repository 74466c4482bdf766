use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use finale_script::key_code;

/// Plays finale scripts outside the game against a recording host.
#[derive(Parser, Debug)]
#[command(about = "Runs and checks finale cutscene scripts", version)]
pub struct Args {
    #[command(subcommand)]
    command: Subcommands,
}

#[derive(Subcommand, Debug)]
enum Subcommands {
    /// Play a script tick by tick and report every host call it makes
    Run {
        /// Script file to play
        script: PathBuf,

        /// JSON resource manifest naming the sounds, music, images and
        /// conditions the host knows about
        #[arg(long)]
        resources: Option<PathBuf>,

        /// Give up after this many ticks (default: one minute of game time)
        #[arg(long, default_value_t = 35 * 60)]
        max_ticks: u32,

        /// Deliver a key press before the given tick, e.g. `40:escape`
        #[arg(long, value_name = "TICK:KEY")]
        press: Vec<String>,

        /// Issue a skip request before the given tick
        #[arg(long, value_name = "TICK")]
        skip_at: Vec<u32>,

        /// Behave like a network client: skips are forwarded, not applied
        #[arg(long)]
        client: bool,

        /// Path to write the recorded host call log as JSON
        #[arg(long)]
        event_log_json: Option<PathBuf>,

        /// Identifier reported to the host for this finale
        #[arg(long, default_value_t = 0)]
        finale_id: u32,
    },
    /// Check every script under a directory for malformed commands
    Lint {
        /// Directory to scan recursively
        dir: PathBuf,

        /// File extension of finale scripts
        #[arg(long, default_value = "fin")]
        extension: String,
    },
}

#[derive(Debug)]
pub enum Command {
    Run(RunArgs),
    Lint(LintArgs),
}

#[derive(Debug)]
pub struct RunArgs {
    pub script: PathBuf,
    pub resources: Option<PathBuf>,
    pub max_ticks: u32,
    pub presses: Vec<KeyPress>,
    pub skip_at: Vec<u32>,
    pub client: bool,
    pub event_log_json: Option<PathBuf>,
    pub finale_id: u32,
}

#[derive(Debug)]
pub struct LintArgs {
    pub dir: PathBuf,
    pub extension: String,
}

/// Scheduled key press from `--press TICK:KEY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub tick: u32,
    pub key: i32,
    pub name: String,
}

impl KeyPress {
    fn parse(text: &str) -> Result<Self> {
        let (tick, name) = text
            .split_once(':')
            .ok_or_else(|| anyhow!("--press expects TICK:KEY, got {text:?}"))?;
        let tick = tick
            .parse()
            .with_context(|| format!("parsing tick in --press {text:?}"))?;
        let key = key_code(name).ok_or_else(|| anyhow!("unknown key name {name:?} in --press"))?;
        Ok(KeyPress {
            tick,
            key,
            name: name.to_string(),
        })
    }
}

pub fn parse() -> Result<Command> {
    let args = Args::parse();
    args.into_command()
}

impl Args {
    fn into_command(self) -> Result<Command> {
        match self.command {
            Subcommands::Run {
                script,
                resources,
                max_ticks,
                press,
                skip_at,
                client,
                event_log_json,
                finale_id,
            } => {
                if max_ticks == 0 {
                    bail!("--max-ticks must be at least 1");
                }
                let presses = press
                    .iter()
                    .map(|text| KeyPress::parse(text))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Command::Run(RunArgs {
                    script,
                    resources,
                    max_ticks,
                    presses,
                    skip_at,
                    client,
                    event_log_json,
                    finale_id,
                }))
            }
            Subcommands::Lint { dir, extension } => Ok(Command::Lint(LintArgs {
                dir,
                extension: extension.trim_start_matches('.').to_string(),
            })),
        }
    }
}
