// Proof-of-work hash chain - CLI

use clap::Parser;
use powchain::{Cli, CliHandler};

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let config = match cli.chain_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            std::process::exit(1);
        }
    };

    let mut handler = CliHandler::new(config, std::io::stdout());
    if let Err(e) = handler.handle(cli.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
