use anyhow::Result;
use clap::Parser;
use datamap::cli::{Cli, Commands};
use datamap::infra::config::load_config;
use datamap::infra::logging::init_logging;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = cli.context();
    init_logging(ctx.verbose, ctx.no_color)?;

    // Config is only read by commands that touch listings or outputs
    let config = || load_config(cli.config.as_deref());

    match cli.command {
        Commands::Map(args) => datamap::map_run(args, &ctx, &config()?),
        Commands::Keys(args) => datamap::keys_run(args, &ctx, &config()?),
        Commands::Consolidate(args) => datamap::consolidate_run(args, &ctx, &config()?),
        Commands::Layouts(args) => datamap::layouts_run(args, &ctx),
        Commands::Init(args) => datamap::infra::config::init(args, &ctx),
        Commands::Completions(args) => datamap::completion::run(args, &ctx),
    }
}
