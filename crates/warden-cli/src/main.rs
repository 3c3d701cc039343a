mod config;
mod daemon;
mod simulate;

use clap::{Parser, Subcommand};
use warden_guard::RconClient;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Log-driven moderation watchdog for Quake3-family game servers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail the server log and moderate the server.
    Run {
        #[arg(short = 'f', long, default_value = "warden.toml", help = "Path to config file")]
        config: String,
    },
    /// Replay archived log files offline and print verdicts.
    Simulate {
        #[arg(required = true, help = "Log files to replay")]
        files: Vec<String>,
        #[arg(short = 'f', long, help = "Optional config file for tuned constants")]
        config: Option<String>,
    },
    /// Send a single rcon command and print the reply.
    Rcon {
        #[arg(short = 'f', long, default_value = "warden.toml", help = "Path to config file")]
        config: String,
        #[arg(required = true, trailing_var_arg = true, help = "Command to send")]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config: config_path } => match config::WardenConfig::from_file(&config_path)
        {
            Ok(cfg) => daemon::run_daemon(cfg).await,
            Err(e) => Err(format!("failed to load config {}: {}", config_path, e).into()),
        },
        Commands::Simulate { files, config } => {
            let cfg = match config {
                Some(path) => match config::WardenConfig::from_file(&path) {
                    Ok(cfg) => Some(cfg),
                    Err(e) => {
                        eprintln!("error: failed to load config {}: {}", path, e);
                        std::process::exit(1);
                    }
                },
                None => None,
            };
            simulate::run_simulation(files, cfg).await
        }
        Commands::Rcon {
            config: config_path,
            command,
        } => match config::WardenConfig::from_file(&config_path) {
            Ok(cfg) => run_rcon(cfg, command.join(" ")).await,
            Err(e) => Err(format!("failed to load config {}: {}", config_path, e).into()),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run_rcon(
    config: config::WardenConfig,
    command: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let rcon = RconClient::new(config.server.address, config.server.rcon_password);
    let reply = rcon.command(&command).await?;
    println!("{reply}");
    Ok(())
}
