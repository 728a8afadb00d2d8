use clap::Parser;
use rideplus_api::cli::Cli;

#[tokio::main]
async fn main() {
    // Load .env if present so DATABASE_URL, JWT_SECRET etc. apply
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = rideplus_api::cli::run(cli).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}
