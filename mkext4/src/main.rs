use anyhow::Result;
use clap::Parser;
use mkext4::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .format_timestamp(None)
        .format_target(false)
        .init();

    mkext4::run(&args)
}
