use clap::{Args, CommandFactory};

use ulog::Engine;

use crate::commands::Ulog;

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cmd {}

impl Cmd {
    pub fn run(&self, engine: &Engine) -> eyre::Result<()> {
        let config = engine.config();
        let levels: Vec<String> = config.levels.iter().map(|l| l.to_string()).collect();

        println!(
            "Version:        {}",
            Ulog::command().get_version().unwrap_or("")
        );
        println!("Name:           {}", config.name);
        println!("Levels:         {}", levels.join(", "));
        println!("Sinks:");

        for (name, sink) in &config.sinks {
            let state = if engine.is_loaded(name) {
                "loaded"
            } else {
                "failed"
            };
            println!(
                "  {:<12} kind={:<8} threshold={:<3} {}",
                name,
                sink.kind_or(name),
                sink.threshold,
                state
            );
        }

        Ok(())
    }
}
