//! freight-ai CLI: operator interface to the AI batching core.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use freight_ai::config::Config;
use freight_ai::engine::BatchService;
use freight_ai::llm::{AnthropicUpstream, anthropic_client};
use freight_ai::model::negotiation::{
    Complexity, CustomerTier, NegotiationContext, RiskLevel, Timeline,
};
use freight_ai::model::{Priority, TaskKind};
use freight_ai::negotiation::escalation::{risk_factors, urgency};
use freight_ai::negotiation::{LogNotifier, assess};
use freight_ai::platform::{PlatformOrchestrator, RequestContext};
use freight_ai::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "freight-ai", about = "AI batching and negotiation core for the freight platform")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a negotiation without calling the model
    Assess {
        #[command(flatten)]
        negotiation: NegotiationArgs,
    },
    /// Run one request through the orchestrator and print the envelope
    Request {
        /// Task kind (email_analysis, lead_qualification, contract_review,
        /// scheduling, sales_call, negotiation, customer_support)
        kind: TaskKind,
        /// Request content
        content: String,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        company: Option<String>,
        /// Negotiation details; required when kind is negotiation
        #[command(flatten)]
        negotiation: OptionalNegotiationArgs,
    },
}

#[derive(Args)]
struct NegotiationArgs {
    #[arg(long)]
    deal_value: f64,
    #[arg(long, default_value = "medium")]
    complexity: Complexity,
    #[arg(long, default_value_t = 1)]
    stakeholders: u32,
    #[arg(long, default_value = "days")]
    timeline: Timeline,
    #[arg(long, default_value = "medium")]
    risk: RiskLevel,
    #[arg(long, default_value = "silver")]
    tier: CustomerTier,
}

impl NegotiationArgs {
    fn context(&self) -> NegotiationContext {
        NegotiationContext::new(
            self.deal_value,
            self.complexity,
            self.timeline,
            self.risk,
            self.tier,
        )
        .stakeholders(self.stakeholders)
    }
}

#[derive(Args)]
struct OptionalNegotiationArgs {
    #[arg(long)]
    deal_value: Option<f64>,
    #[arg(long, default_value = "medium")]
    complexity: Complexity,
    #[arg(long, default_value_t = 1)]
    stakeholders: u32,
    #[arg(long, default_value = "days")]
    timeline: Timeline,
    #[arg(long, default_value = "medium")]
    risk: RiskLevel,
    #[arg(long, default_value = "silver")]
    tier: CustomerTier,
}

impl OptionalNegotiationArgs {
    fn context(&self) -> Option<NegotiationContext> {
        self.deal_value.map(|deal_value| {
            NegotiationArgs {
                deal_value,
                complexity: self.complexity,
                stakeholders: self.stakeholders,
                timeline: self.timeline,
                risk: self.risk,
                tier: self.tier,
            }
            .context()
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Assess { negotiation } => cmd_assess(&negotiation),
        Command::Request {
            kind,
            content,
            priority,
            customer,
            company,
            negotiation,
        } => {
            let context = RequestContext {
                customer_name: customer,
                company_name: company,
                negotiation: negotiation.context(),
            };
            if kind == TaskKind::Negotiation && context.negotiation.is_none() {
                anyhow::bail!("negotiation requests need --deal-value");
            }
            cmd_request(kind, &content, &context, priority).await
        }
    }
}

fn cmd_assess(args: &NegotiationArgs) -> anyhow::Result<()> {
    let ctx = args.context();
    let strategy = assess(&ctx);

    println!("AI eligible:     {}", strategy.ai_eligible);
    println!("Approach:        {}", strategy.approach);
    println!("Confidence:      {}/100", strategy.confidence_score);
    println!("Max concession:  {}%", strategy.max_concession_pct);
    for reason in &strategy.reasons {
        println!("  - {reason}");
    }
    if !strategy.ai_eligible {
        println!("---");
        println!("Urgency:         {}", urgency(&ctx));
        for factor in risk_factors(&ctx) {
            println!("  ! {factor}");
        }
    }
    Ok(())
}

async fn cmd_request(
    kind: TaskKind,
    content: &str,
    context: &RequestContext,
    priority: Priority,
) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "freight-ai".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let mut batch_config = config.batch_config()?;
    // One-shot: don't sit on the request for a full batch interval.
    batch_config.batch_interval_secs = 1;

    let client = anthropic_client(&config.anthropic_api_key)?;
    let upstream = AnthropicUpstream::new(
        client,
        &config.model,
        batch_config.max_tokens,
        batch_config.cost_per_1k_tokens,
    );

    let batch = Arc::new(BatchService::new(batch_config, Arc::new(upstream)));
    batch.start();

    let orchestrator = PlatformOrchestrator::new(Arc::clone(&batch), Arc::new(LogNotifier));
    let envelope = orchestrator
        .process_request(kind, content, context, priority)
        .await;

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    println!("{}", serde_json::to_string_pretty(&batch.usage_stats())?);

    batch.stop().await;
    guard.force_flush();
    Ok(())
}
