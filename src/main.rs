use anyhow::Result;
use autoapply_dashboard::{cli, logging};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless();
    logging::initialize(args.log_destination(), args.verbose);

    match cli::run(args).await {
        Ok(()) => {
            // Exit right away so lingering request tasks don't hold the process open.
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            log::error!("{e:#}");
            Err(e)
        }
    }
}
