use clap::Args;

use ulog::Engine;

#[derive(Args, Debug)]
pub struct Cmd {
    #[arg(short = 'n', long, help = "Only print the last N records.")]
    pub tail: Option<usize>,
}

impl Cmd {
    pub fn run(&self, engine: &Engine) -> eyre::Result<()> {
        let records = engine
            .read_log()
            .ok_or_else(|| eyre::eyre!("No readable \"log\" sink is loaded"))?;

        let skip = match self.tail {
            Some(n) => records.len().saturating_sub(n),
            None => 0,
        };

        for record in records.iter().skip(skip) {
            println!(
                "{} {} {}: {}",
                record.timestamp, record.name, record.level, record.message
            );
        }

        Ok(())
    }
}
