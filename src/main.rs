use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tracker_assistant::utils::locale::Msg;
use tracker_assistant::{
    AppError, ConfigService, ConversationSession, DomainSnapshot, InMemoryGateway, Orchestrator,
    OrchestratorResponse, RateGuard, TurnOutcome, TurnRequest,
};

#[derive(Parser)]
#[command(name = "tracker-assistant")]
#[command(about = "Conversational assistant for an issue tracker")]
struct Cli {
    /// Path to config.json (defaults to the per-user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file with projects, issues and milestones to load
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Run changes without asking for confirmation
    #[arg(long)]
    auto_approve: bool,
}

/// Logs go to stderr so replies on stdout stay clean
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("TRACKER_ASSISTANT_LOG").unwrap_or_else(|_| "info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_snapshot(path: Option<&PathBuf>) -> anyhow::Result<DomainSnapshot> {
    let Some(path) = path else {
        return Ok(DomainSnapshot::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let snapshot = serde_json::from_str(&content)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    Ok(snapshot)
}

fn print_response(response: &OrchestratorResponse) {
    println!("{}", response.text());
    for warning in &response.warnings {
        println!("! {}", warning);
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> anyhow::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config_service = match &cli.config {
        Some(path) => ConfigService::open(path)?,
        None => ConfigService::new()?,
    };
    let config = config_service.get_config().clone();
    tracing::info!(path = %config_service.path().display(), "Configuration loaded");

    let gateway = Arc::new(InMemoryGateway::from_snapshot(load_snapshot(
        cli.snapshot.as_ref(),
    )?));
    let provider = tracker_assistant_llm::create_provider(config.provider.clone())?;
    if let Err(e) = provider.health_check().await {
        tracing::warn!(provider = provider.name(), error = %e, "Provider health check failed");
    }

    let guard = Arc::new(RateGuard::new(config.guard.clone()));
    let orchestrator = Orchestrator::new(provider, gateway.clone(), guard, &config);
    let locale = orchestrator.locale();
    let mut session = ConversationSession::new();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = prompt(&mut lines, "> ").await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                orchestrator.reset_session(&mut session);
                println!("(new conversation)");
                continue;
            }
            _ => {}
        }

        let request = TurnRequest::new(line, gateway.snapshot().await);
        let response = match orchestrator.handle_turn(&mut session, request).await {
            Ok(response) => response,
            Err(AppError::RateLimitExceeded { retry_after_ms }) => {
                let secs = retry_after_ms.div_ceil(1000).to_string();
                println!("{}", locale.format(Msg::RateLimited, &[secs.as_str()]));
                continue;
            }
            Err(AppError::BudgetExceeded { .. }) => {
                println!("{}", locale.text(Msg::BudgetExhausted));
                continue;
            }
            Err(AppError::Validation(message)) => {
                println!("({})", message);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        print_response(&response);

        let TurnOutcome::PendingApproval { pending, .. } = &response.outcome else {
            continue;
        };
        let answer = if cli.auto_approve {
            "y".to_string()
        } else {
            prompt(&mut lines, "Apply? [y]es / [n]o / [a]lways: ")
                .await?
                .unwrap_or_default()
        };
        let follow_up = match answer.trim().to_lowercase().as_str() {
            "y" | "yes" | "s" | "si" | "sí" => {
                let snapshot = gateway.snapshot().await;
                orchestrator
                    .execute_approved(&mut session, pending, &snapshot)
                    .await
            }
            "a" | "always" => {
                for item in pending {
                    orchestrator
                        .approval()
                        .allow_always(&session.id, &item.skill_name);
                }
                let snapshot = gateway.snapshot().await;
                orchestrator
                    .execute_approved(&mut session, pending, &snapshot)
                    .await
            }
            _ => orchestrator.decline_pending(&mut session),
        };
        print_response(&follow_up);
    }

    Ok(())
}
