use clap::Parser;
use payoff::api::{Cli, Command, build_engine_config, run_compare_command, run_http_server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port, engine } => {
            let config = match build_engine_config(engine) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = run_http_server(port, config).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Compare {
            input,
            pretty,
            engine,
        } => match run_compare_command(&input, pretty, engine) {
            Ok(report) => println!("{report}"),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
    }
}
