use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;
use playdirector::{
    AppResult, LogSink,
    cli::{Cli, Commands},
    config::Config,
    director::{DirectorRestClient, MockDirectorServer, mock::demo_script},
    init_logging,
    session::SessionManager,
    ui,
};

const DEMO_PROMPT: &str = "A duel at dawn";

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse_args();

    // Configuration decides where logs go, so load it first
    let loaded = Config::load_from_file(&cli.config_file);
    let config = loaded.as_ref().cloned().unwrap_or_else(|_| Config::from_env());

    let sink = if cli.uses_tui() {
        LogSink::File(PathBuf::from(&config.log.file_path))
    } else {
        LogSink::Stderr
    };
    let _log_guard = init_logging(&cli.effective_log_level(), sink)?;

    tracing::info!("PlayDirector starting...");
    tracing::debug!("CLI arguments: {:?}", cli);
    if let Err(e) = &loaded {
        tracing::warn!("Failed to load config: {}, using defaults", e);
    }

    if !config.ui.enable_colors {
        colored::control::set_override(false);
    }

    match cli.command() {
        Commands::Config { action } => {
            Config::handle_command(&cli.config_file, &action)?;
        }
        _ if cli.is_dry_run_mode() => {
            let mut session_manager = SessionManager::new(&cli, config)?;
            session_manager.start().await?;
        }
        Commands::Ping => ping(&config).await?,
        Commands::Run { prompt, idle_secs } => {
            let mut session_manager = SessionManager::new(&cli, config)?;
            let scene = session_manager
                .run_prompt(&prompt, idle_secs.map(Duration::from_secs))
                .await?;
            println!(
                "{}",
                format!("Scene finished with {} lines", scene.scene_log().len()).dimmed()
            );
        }
        Commands::Demo => run_demo(&cli, config).await?,
        Commands::Interactive { .. } => {
            let mut session_manager = SessionManager::new(&cli, config)?;
            session_manager.start().await?;
        }
    }

    Ok(())
}

async fn ping(config: &Config) -> AppResult<()> {
    let client = DirectorRestClient::new(
        config.director.http_url.clone(),
        Duration::from_secs(config.director.timeout_seconds),
    );

    match client.health().await {
        Ok(health) => {
            println!("{} {}", "✓ Director is up:".green().bold(), health.message);
            Ok(())
        }
        Err(e) => {
            ui::cli::display_error(&format!("Director is not reachable: {}", e));
            Err(e.into())
        }
    }
}

async fn run_demo(cli: &Cli, config: Config) -> AppResult<()> {
    let mut server = MockDirectorServer::start(demo_script(Duration::from_millis(600))).await?;
    tracing::info!("Demo director listening on {}", server.endpoint());

    let mut demo_cli = cli.clone();
    demo_cli.endpoint = Some(server.endpoint());

    let mut session_manager = SessionManager::new(&demo_cli, config)?;
    let scene = session_manager
        .run_prompt(DEMO_PROMPT, Some(Duration::from_secs(10)))
        .await?;

    println!();
    ui::cli::display_scene(&scene)?;
    server.shutdown();

    Ok(())
}
