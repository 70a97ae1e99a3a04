mod commands;
mod terminal;

use commands::{CommandLine, Commands, deident, inspect, synth};
use terminal::{logging, print};

fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init(commands.verbose, commands.quiet);
    print::banner(commands.no_banner, commands.quiet);

    match &commands.command {
        Commands::Deident(args) => {
            let cfg = args.to_config(&commands);
            print::header("deidentifying slides", cfg.quiet);
            deident::deident(&cfg)
        }
        Commands::Inspect { slide } => {
            print::header("slide layout", commands.quiet);
            inspect::inspect(slide)
        }
        Commands::Synth(args) => {
            let cfg = args.to_config(&commands);
            print::header("synthetic phi", cfg.quiet);
            synth::synth(&cfg)
        }
    }
}
