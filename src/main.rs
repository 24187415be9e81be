//! Binary entrypoint for the mobwatch CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml` and the data directory
//! - `start --group <id> [--channel <id>]` - run the board refresher and read
//!   commands from stdin as that group/channel
//! - `exec --group <id> [--channel <id>] <command...>` - run one command and print the reply
//! - `status --group <id>` - print a group's rendered status board
//! - `import <legacy.json>` - split a legacy combined data file into per-group records
//!
//! See the library crate docs for module‑level details: `mobwatch::`.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use mobwatch::bot::{BoardRefresher, CommandContext, CommandProcessor, ConsoleSink};
use mobwatch::config::Config;
use mobwatch::storage::Storage;
use mobwatch::tracker::{now_in, render_board};

#[derive(Parser)]
#[command(name = "mobwatch")]
#[command(about = "Respawn window tracker for contested mob spawns")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file and data directory
    Init,
    /// Run the status board refresher and read commands from stdin
    Start {
        /// Group the console speaks for
        #[arg(short, long)]
        group: String,
        /// Channel id the console speaks in
        #[arg(long, default_value_t = 1)]
        channel: u64,
    },
    /// Run a single command and print the reply
    Exec {
        #[arg(short, long)]
        group: String,
        #[arg(long, default_value_t = 1)]
        channel: u64,
        /// Command text, with or without the prefix (e.g. `tod Pumpkinhead 0200`)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Print a group's status board
    Status {
        #[arg(short, long)]
        group: String,
    },
    /// Split a legacy combined data file into per-group records
    Import {
        /// Path to the legacy JSON file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init writes the config; everything else needs it.
    let config = match cli.command {
        Commands::Init => None,
        _ => Some(Config::load(&cli.config).await.map_err(|e| {
            anyhow!("{} (run `mobwatch init` to create a default configuration)", e)
        })?),
    };
    init_logging(&config, cli.verbose);

    let Some(config) = config else {
        return init(&cli.config).await;
    };

    let tz = config.timezone()?;
    let storage = Arc::new(
        Storage::new(&config.storage.data_dir)
            .await?
            .with_save_retries(config.storage.save_retries),
    );

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Start { group, channel } => {
            info!(
                "Starting {} v{} for group {}",
                config.bot.name,
                env!("CARGO_PKG_VERSION"),
                group
            );
            let refresher = Arc::new(
                BoardRefresher::new(
                    storage.clone(),
                    Arc::new(ConsoleSink::new()),
                    config.board_format(),
                    tz,
                )
                .with_interval(config.board.refresh_interval())
                .with_send_timeout(config.board.send_timeout()),
            );
            let board_task = {
                let refresher = refresher.clone();
                tokio::spawn(async move { refresher.run().await })
            };

            let processor = CommandProcessor::new(storage, tz, config.board_format());
            // The console operator owns the group.
            let ctx = CommandContext::new(&group, channel).with_manage_channels(true);
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            println!(
                "mobwatch ready. Type `{}help` for commands, ctrl-d to quit.",
                config.bot.command_prefix
            );
            loop {
                tokio::select! {
                    line = lines.next_line() => {
                        match line {
                            Ok(Some(line)) => {
                                if let Some(reply) = processor.handle(&ctx, &line).await {
                                    println!("{}", reply);
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                warn!("stdin read failed: {}", e);
                                break;
                            }
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Received shutdown signal");
                        break;
                    }
                }
            }
            board_task.abort();
            info!("mobwatch stopped");
            Ok(())
        }
        Commands::Exec {
            group,
            channel,
            command,
        } => {
            let processor = CommandProcessor::new(storage, tz, config.board_format());
            let ctx = CommandContext::new(&group, channel).with_manage_channels(true);
            let mut text = command.join(" ");
            if !text.starts_with(config.bot.command_prefix.as_str()) {
                text = format!("{}{}", config.bot.command_prefix, text);
            }
            match processor.handle(&ctx, &text).await {
                Some(reply) => println!("{}", reply),
                None => println!(
                    "Not a command. Try `{}help`.",
                    config.bot.command_prefix
                ),
            }
            Ok(())
        }
        Commands::Status { group } => {
            let record = storage.load_group(&group).await?;
            let now = now_in(&tz).fixed_offset();
            println!("{}", render_board(&record, now, &config.board_format()));
            Ok(())
        }
        Commands::Import { path } => {
            let imported = storage.import_legacy(&path).await?;
            println!("Imported {} group(s) from {}", imported, path.display());
            Ok(())
        }
    }
}

async fn init(config_path: &str) -> Result<()> {
    info!("Initializing new mobwatch configuration");
    if tokio::fs::try_exists(config_path).await.unwrap_or(false) {
        return Err(anyhow!(
            "{} already exists; remove it first to regenerate",
            config_path
        ));
    }
    Config::create_default(config_path).await?;
    let config = Config::default();
    Storage::new(&config.storage.data_dir).await?;
    println!("Created {} and data directory {}", config_path, config.storage.data_dir);
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });
    let security_path = config.as_ref().and_then(|c| c.logging.security_file.clone());

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);

        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());

            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }

            if record.target() == "security" {
                if let Some(ref sec_path) = security_path {
                    if let Ok(mut sf) = std::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(sec_path)
                    {
                        let _ = writeln!(sf, "{}", line);
                    }
                }
            }

            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
