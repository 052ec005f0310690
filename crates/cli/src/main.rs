use clap::Parser;
use stac_search_cli::StacSearch;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = StacSearch::parse();
    match args.run(true).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}
