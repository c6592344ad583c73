use clap::Parser;
use git_agent::Cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match git_agent::run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("git-agent: {error}");
            ExitCode::FAILURE
        }
    }
}
