use clap::Args;
use eyre::Context;

use ulog::{Engine, Level};

#[derive(Args, Debug)]
pub struct Cmd {
    #[arg(index = 1, value_parser = parse_level, help = "debug, info, warning or error")]
    pub level: Level,

    #[arg(index = 2, required = true, num_args = 1..)]
    pub message: Vec<String>,

    #[arg(
        long,
        value_name = "SINK=THRESHOLD",
        help = "Change a sink's threshold before sending. 0 adds a free-memory record."
    )]
    pub threshold: Vec<String>,

    #[arg(
        long,
        value_name = "HOST",
        help = "Point the network sink at HOST before sending."
    )]
    pub host: Option<String>,

    #[arg(
        long,
        requires = "host",
        help = "Source name to log under, used together with --host."
    )]
    pub name: Option<String>,
}

impl Cmd {
    pub fn run(&self, engine: &mut Engine) -> eyre::Result<()> {
        for setting in &self.threshold {
            let (sink, threshold) = parse_threshold(setting)?;
            engine.change_level(sink, threshold);
        }

        if let Some(host) = &self.host {
            let name = self
                .name
                .clone()
                .unwrap_or_else(|| engine.name().to_string());
            engine.change_host(name, host);
        }

        let message = self.message.join(" ");
        let report = engine.log(self.level, format_args!("{}", message))?;

        if !report.is_accepted() {
            println!("level {} is disabled, nothing sent", self.level);
            return Ok(());
        }

        for failure in report.failures() {
            eprintln!("{}", failure);
        }

        let attempted = report.deliveries().len();
        let failed = report.deliveries().iter().filter(|d| !d.is_ok()).count();
        if attempted > 0 && attempted == failed {
            return Err(eyre::eyre!("every sink failed to take the message"));
        }

        Ok(())
    }
}

fn parse_level(level: &str) -> eyre::Result<Level> {
    level.parse()
}

fn parse_threshold(setting: &str) -> eyre::Result<(&str, i64)> {
    let (sink, threshold) = setting
        .split_once('=')
        .ok_or_else(|| eyre::eyre!("Expected SINK=THRESHOLD, got {}", setting))?;

    let threshold = threshold
        .trim()
        .parse()
        .with_context(|| format!("Invalid threshold for sink {}", sink))?;

    Ok((sink.trim(), threshold))
}
