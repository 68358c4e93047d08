//! Outreach runner CLI.
//!
//! Drives the engine end to end from JSON fixtures: mine hooks for a
//! prospect, compose a variant, or run a whole campaign (create schedules,
//! start, sweep, report stats). Transports are console-backed unless a relay
//! is configured, so a local run is always safe.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use outreach_engine::{
    Channel, DraftBackend, EngineConfig, EscalationScheduler, Evidence, EvidenceStore,
    GenerateOptions, HookRanker, HookStatus, InMemoryEvidenceStore, MessageComposer, Prospect,
    ResponseEvent, SuppressionReason, TransportRegistry, VoiceProfile,
};
use outreach_runner::{ConsoleTransport, HttpDraftBackend, HttpRelayTransport, RunnerConfig};

#[derive(Parser)]
#[command(name = "outreach-runner", about = "Drive the outreach escalation engine")]
struct Cli {
    /// Optional TOML config file (env vars fill the gaps)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mine scored hooks for one prospect
    Mine {
        /// JSON file with an array of evidence records
        #[arg(long)]
        evidence_file: PathBuf,
        #[arg(long)]
        prospect: String,
        /// Evidence window in days
        #[arg(long)]
        max_days: Option<i64>,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Compose a message variant from the best hook for a prospect
    Compose {
        #[arg(long)]
        evidence_file: PathBuf,
        #[arg(long)]
        prospect: String,
        #[arg(long, default_value = "email")]
        channel: String,
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long)]
        recipient: Option<String>,
        #[arg(long)]
        industry: Option<String>,
    },

    /// Run a campaign: mine, compose, schedule, sweep, report
    Campaign {
        #[arg(long)]
        evidence_file: PathBuf,
        /// JSON file with an array of prospects
        #[arg(long)]
        prospects_file: PathBuf,
        #[arg(long, default_value = "campaign-1")]
        campaign: String,
        /// Evaluate gates and report intended sends without dispatching
        #[arg(long)]
        dry_run: bool,
        /// Mark the first sent message opened and replied, to exercise the
        /// feedback path locally
        #[arg(long)]
        simulate_responses: bool,
        /// Domains or addresses to suppress before scheduling
        #[arg(long)]
        suppress: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    outreach_runner::telemetry::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::from_env(),
    };

    match cli.command {
        Command::Mine {
            evidence_file,
            prospect,
            max_days,
            limit,
        } => {
            let store = load_evidence(&evidence_file)?;
            let ranker = HookRanker::with_config(store, EngineConfig::default().ranker);
            let hooks = ranker.mine(&prospect, max_days, limit).await?;
            println!("{}", serde_json::to_string_pretty(&hooks)?);
        }

        Command::Compose {
            evidence_file,
            prospect,
            channel,
            language,
            recipient,
            industry,
        } => {
            let store = load_evidence(&evidence_file)?;
            let channel = parse_channel(&channel)?;
            let ranker = HookRanker::new(store.clone());
            let hooks = ranker.mine(&prospect, None, 5).await?;
            let Some(hook) = hooks.iter().find(|h| h.status != HookStatus::Rejected) else {
                bail!("no usable hook for prospect {prospect}");
            };

            let composer = build_composer(store, &config);
            let opts = GenerateOptions {
                recipient_name: recipient,
                industry,
                language,
            };
            let variant = composer
                .generate(hook, channel, VoiceProfile::default(), &opts)
                .await?;
            println!("{}", serde_json::to_string_pretty(&variant)?);
        }

        Command::Campaign {
            evidence_file,
            prospects_file,
            campaign,
            dry_run,
            simulate_responses,
            suppress,
        } => {
            let store = load_evidence(&evidence_file)?;
            let prospects: Vec<Prospect> = read_json(&prospects_file)?;
            run_campaign(
                store,
                &config,
                prospects,
                &campaign,
                dry_run,
                simulate_responses,
                &suppress,
            )
            .await?;
        }
    }
    Ok(())
}

async fn run_campaign(
    store: Arc<InMemoryEvidenceStore>,
    config: &RunnerConfig,
    prospects: Vec<Prospect>,
    campaign: &str,
    dry_run: bool,
    simulate_responses: bool,
    suppress: &[String],
) -> Result<()> {
    let ranker = HookRanker::new(store.clone());
    let composer = build_composer(store, config);
    let scheduler = build_scheduler(config)?;

    for value in suppress {
        scheduler.suppress(value, SuppressionReason::Manual);
    }

    for prospect in prospects {
        let hooks = ranker.mine(&prospect.id, None, 3).await?;
        let Some(hook) = hooks.iter().find(|h| h.status != HookStatus::Rejected) else {
            warn!(prospect_id = %prospect.id, "No usable hook, skipping prospect");
            continue;
        };

        let opts = GenerateOptions {
            recipient_name: Some(prospect.name.clone()),
            industry: prospect.industry.clone(),
            language: prospect.language.clone(),
        };
        let mut variants = vec![
            composer
                .generate(hook, Channel::Email, VoiceProfile::default(), &opts)
                .await?,
        ];
        if prospect.linkedin.is_some() {
            variants.push(
                composer
                    .generate(hook, Channel::Linkedin, VoiceProfile::default(), &opts)
                    .await?,
            );
        }

        match scheduler.create_schedule(prospect, campaign, variants).await {
            Ok(schedule) => info!(summary = %schedule.summary(), "Scheduled"),
            Err(e) => warn!("Schedule refused: {e}"),
        }
    }

    let activated = scheduler.start_campaign(campaign).await;
    info!(activated, "Campaign activated");

    let report = scheduler.execute_sends(dry_run).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if simulate_responses && !dry_run {
        if let Some(message_id) = first_sent_message(&scheduler, campaign).await {
            scheduler
                .handle_response(&message_id, ResponseEvent::Opened, HashMap::new())
                .await?;
            scheduler
                .handle_response(&message_id, ResponseEvent::Replied, HashMap::new())
                .await?;
            info!(message_id = %message_id, "Simulated open + reply");
        }
    }

    let stats = scheduler.campaign_stats(campaign).await;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn first_sent_message(scheduler: &EscalationScheduler, campaign: &str) -> Option<String> {
    scheduler
        .campaign_schedules(campaign)
        .await
        .iter()
        .flat_map(|s| s.steps.iter())
        .find_map(|step| step.message_id.clone())
}

fn build_composer(store: Arc<InMemoryEvidenceStore>, config: &RunnerConfig) -> MessageComposer {
    let evidence: Arc<dyn EvidenceStore> = store;
    let composer = MessageComposer::new(evidence).with_config(EngineConfig::default().compose);
    match &config.drafter {
        Some(endpoint) => match HttpDraftBackend::new(endpoint.clone()) {
            Ok(backend) => {
                info!(model = backend.model(), "Drafting backend enabled");
                composer.with_backend(Arc::new(backend))
            }
            Err(e) => {
                warn!("Drafting backend unusable, using templates: {e}");
                composer
            }
        },
        None => composer,
    }
}

fn build_scheduler(config: &RunnerConfig) -> Result<EscalationScheduler> {
    let channels = [Channel::Email, Channel::Sms, Channel::Whatsapp, Channel::Linkedin];
    let mut registry = TransportRegistry::new();
    for channel in channels {
        registry = match &config.relay_url {
            Some(url) => registry.register(Arc::new(HttpRelayTransport::new(channel, url)?)),
            None => registry.register(Arc::new(ConsoleTransport::new(channel))),
        };
    }

    let mut scheduler_config = EngineConfig::default().scheduler;
    if !config.supported_languages.is_empty() {
        scheduler_config.supported_languages = config.supported_languages.clone();
    }
    Ok(EscalationScheduler::new(registry, scheduler_config))
}

fn load_evidence(path: &PathBuf) -> Result<Arc<InMemoryEvidenceStore>> {
    let evidence: Vec<Evidence> = read_json(path)?;
    let store = Arc::new(InMemoryEvidenceStore::new());
    store.seed(evidence);
    Ok(store)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn parse_channel(value: &str) -> Result<Channel> {
    match value.to_lowercase().as_str() {
        "email" => Ok(Channel::Email),
        "sms" => Ok(Channel::Sms),
        "whatsapp" => Ok(Channel::Whatsapp),
        "linkedin" => Ok(Channel::Linkedin),
        other => bail!("unknown channel: {other} (expected email, sms, whatsapp, linkedin)"),
    }
}
