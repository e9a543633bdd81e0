use anyhow::{Context, Result};
use satpipe::cli::commands::{load_pipeline, CheckCommand, DiscoverCommand, RunCommand};
use satpipe::cli::output::*;
use satpipe::cli::{Cli, Command};
use satpipe::core::schema;
use satpipe::execution::{EngineError, ExecutionEngine, PaymentMode};
use satpipe::report;
use satpipe::transport::{HttpTransport, ServiceTransport};
use satpipe::{build_market_report, Pipeline, ServiceRegistry};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, &cli).await?,
        Command::Discover(cmd) => discover(cmd, &cli).await?,
        Command::Check(cmd) => check(cmd, &cli).await?,
    }

    Ok(())
}

/// Discovery is fatal when it fails; a missing capability is not.
async fn discover_registry(transport: &HttpTransport) -> ServiceRegistry {
    match ServiceRegistry::discover(transport).await {
        Ok(registry) => {
            println!(
                "{} Discovered {} services",
                CHECK,
                style(registry.len()).cyan()
            );
            registry
        }
        Err(e) => {
            println!("{} Cannot reach the d3p manifest: {}", CROSS, style(&e).red());
            error!("discovery failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print per-step availability, with a discovery query for each missing
/// capability.
async fn print_availability(
    pipeline: &Pipeline,
    registry: &ServiceRegistry,
    transport: &HttpTransport,
) {
    for step in &pipeline.steps {
        if registry.lookup(&step.id).is_some() {
            println!(
                "  {} {:25} {} {}",
                CHECK,
                style(&step.display_name).bold(),
                style(format!("({})", step.id)).dim(),
                style("available").green()
            );
        } else {
            println!(
                "  {} {:25} {} {}",
                CROSS,
                style(&step.display_name).bold(),
                style(format!("({})", step.id)).dim(),
                style("not found").red()
            );
            match transport.query_capability(&step.capability).await {
                Ok(matches) if matches.match_count > 0 => println!(
                    "      found {} {} services elsewhere on the network",
                    style(matches.match_count).cyan(),
                    style(&step.capability).yellow()
                ),
                Ok(_) => println!(
                    "      no services with capability: {}",
                    style(&step.capability).yellow()
                ),
                Err(e) => println!("      capability query failed: {}", style(e).dim()),
            }
        }
    }
}

async fn run_pipeline(cmd: &RunCommand, cli: &Cli) -> Result<()> {
    let pipeline = load_pipeline(&cmd.pipeline, cmd.file.as_deref(), &cmd.query)?;
    let transport = HttpTransport::new(cli.transport_config());

    println!(
        "{} Pipeline: {} ({})",
        BOLT,
        style(&pipeline.name).bold(),
        pipeline
            .steps
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    );

    // Phase 1: discovery and diagnostics
    let registry = discover_registry(&transport).await;
    print_availability(&pipeline, &registry, &transport).await;
    for (source, target) in pipeline.adjacent_pairs() {
        print_schema_compat(&source.id, &target.id, &schema::check(source, target, &registry));
    }
    print_price_quote(&pipeline, &registry);

    // Phase 2: execution
    let mode = if cmd.live {
        PaymentMode::Live
    } else {
        PaymentMode::Mock
    };
    let mut engine = ExecutionEngine::new(transport, registry, mode);

    let progress = create_progress_bar(pipeline.steps.len());
    let bar = progress.clone();
    engine.add_event_handler(move |event| {
        bar.println(format_execution_event(event));
        if matches!(
            event,
            satpipe::ExecutionEvent::StepSucceeded { .. }
                | satpipe::ExecutionEvent::StepFailed { .. }
                | satpipe::ExecutionEvent::StepBlocked { .. }
        ) {
            bar.inc(1);
        }
    });

    println!();
    let run = match engine.run(&pipeline).await {
        Ok(run) => {
            progress.finish_and_clear();
            run
        }
        Err(EngineError::PaymentRequired { step_id, invoice }) => {
            progress.finish_and_clear();
            println!(
                "\n{} Step {} requires payment before it will run.",
                LOCK,
                style(&step_id).bold()
            );
            if let Some(invoice) = invoice {
                println!(
                    "  amount:  {}",
                    style(format!("{} sats", invoice.amount_units)).yellow()
                );
                println!("  invoice: {}", style(&invoice.invoice).dim());
            }
            println!("  Settle the invoice and re-run, or use mock mode.");
            std::process::exit(1);
        }
    };

    // Phase 3: reporting
    let stats = report::summarize(&run.outcomes);
    print_stats(&stats);

    for gap in &run.gaps {
        print_gap_report(gap);
    }

    if pipeline.name == "market-intel" {
        let market = build_market_report(&run.outputs);
        if cmd.json {
            println!("\n{}", serde_json::to_string_pretty(&market.to_value())?);
        } else {
            println!("\n{} Market report:", INFO);
            println!(
                "  BTC: {} ({:+.1}% 24h)",
                style(format!("${}", market.price.btc_usd)).bold(),
                market.price.change_24h
            );
            println!(
                "  Sentiment: {} ({}/10, {})",
                style(&market.sentiment.analysis).bold(),
                market.sentiment.vibe_score,
                market.sentiment.energy
            );
            println!(
                "  Verified: {} risk, confidence {}",
                style(&market.verified.hallucination_risk).bold(),
                market.verified.confidence
            );
        }
    } else if cmd.json {
        println!("\n{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}

async fn discover(cmd: &DiscoverCommand, cli: &Cli) -> Result<()> {
    let transport = HttpTransport::new(cli.transport_config());
    let registry = discover_registry(&transport).await;

    if cmd.json {
        let services: Vec<_> = registry
            .services()
            .into_iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.capability_id,
                    "category": s.category,
                    "price_units": s.price_units,
                    "input_schema": s.input_schema,
                    "output_schema": s.output_schema,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&services)?);
    } else {
        for service in registry.services() {
            print_service(service);
        }
    }

    if let Some(capability) = &cmd.capability {
        let matches = transport
            .query_capability(capability)
            .await
            .context("Capability query failed")?;
        println!(
            "\n{} {} services offer capability '{}'",
            INFO,
            style(matches.match_count).cyan(),
            style(capability).yellow()
        );
    }

    Ok(())
}

async fn check(cmd: &CheckCommand, cli: &Cli) -> Result<()> {
    let pipeline = load_pipeline(&cmd.pipeline, cmd.file.as_deref(), &cmd.query)?;
    let transport = HttpTransport::new(cli.transport_config());
    let registry = discover_registry(&transport).await;

    println!("\n{} Availability:", INFO);
    print_availability(&pipeline, &registry, &transport).await;

    println!("\n{} Schema compatibility:", INFO);
    for (source, target) in pipeline.adjacent_pairs() {
        print_schema_compat(&source.id, &target.id, &schema::check(source, target, &registry));
    }

    print_price_quote(&pipeline, &registry);

    Ok(())
}
