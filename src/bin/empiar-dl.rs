//! empiar-dl CLI - downloads the movies of an EMPIAR entry.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = empiar_dl::cli::run().await {
        eprintln!("Error: {e}");
        if matches!(e, empiar_dl::Error::Config(_)) {
            eprintln!();
            empiar_dl::cli::print_usage();
        }
        std::process::exit(1);
    }
}
