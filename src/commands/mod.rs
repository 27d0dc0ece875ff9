use std::{fmt::Display, path::PathBuf};

use clap::{Parser, Subcommand};
use log::LevelFilter;

use ulog::{build_config, logging, Engine, JsonFile, OverrideSource};

mod info;
mod read;
mod send;

#[derive(Subcommand, Debug)]
pub enum UlogCmd {
    Send(send::Cmd),

    Read(read::Cmd),

    Info(info::Cmd),
}

impl Display for UlogCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UlogCmd::Send(cmd) => write!(f, "send {}", cmd.level),
            UlogCmd::Read(_cmd) => write!(f, "read"),
            UlogCmd::Info(_cmd) => write!(f, "info"),
        }
    }
}

#[derive(Parser)]
#[command(version, long_version = "")]
#[command(about = "Send and inspect device log messages.", long_about = None, disable_help_subcommand = true)]
pub struct Ulog {
    #[arg(
        global = true,
        long,
        short = 'c',
        help = "JSON file whose top-level keys (name, levels, sinks) replace the built-in defaults.",
        display_order = 0
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        help = "Write the logger's own diagnostics to stderr.",
        display_order = 999
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: UlogCmd,
}

impl Ulog {
    fn log_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            5_u8..=u8::MAX => LevelFilter::Trace,
        }
    }

    fn setup_logging(&self) -> eyre::Result<()> {
        logging::Builder::new()
            .with_level(self.log_filter())
            .with_stderr_sink()
            .build()?
            .init()
    }

    pub fn run(self) -> eyre::Result<()> {
        self.setup_logging()?;

        log::info!(target: "ulog", "running command {}", &self.cmd);

        let source = self.config.as_ref().map(JsonFile::new);
        let config = build_config(source.as_ref().map(|s| s as &dyn OverrideSource));
        let mut engine = Engine::new(config);

        let result = match &self.cmd {
            UlogCmd::Send(send) => send.run(&mut engine),
            UlogCmd::Read(read) => read.run(&engine),
            UlogCmd::Info(info) => info.run(&engine),
        };

        if let Err(msg) = &result {
            log::error!(target: "ulog", "failed running command {}, error={} cause={}", &self.cmd, msg, msg.root_cause());
        }

        engine.flush();
        result
    }
}
