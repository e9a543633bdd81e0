//! CLI output formatting

use crate::analysis::GapReport;
use crate::core::{Pipeline, SchemaCompat, ServiceDescriptor, ServiceRegistry};
use crate::execution::{ExecutionEvent, OutcomeState};
use crate::report::RunStats;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static BOLT: Emoji<'_, '_> = Emoji("⚡ ", "~ ");
pub static LOCK: Emoji<'_, '_> = Emoji("🔒 ", "$ ");

/// Create a progress bar over the pipeline's steps
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format an outcome state for display
pub fn format_outcome_state(state: OutcomeState) -> String {
    match state {
        OutcomeState::Succeeded => style("SUCCEEDED").green().to_string(),
        OutcomeState::Failed => style("FAILED").red().to_string(),
        OutcomeState::Blocked => style("BLOCKED").yellow().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            pipeline_name,
            total_steps,
            ..
        } => format!(
            "{} Running {} ({} steps)",
            BOLT,
            style(pipeline_name).bold(),
            total_steps
        ),
        ExecutionEvent::StepStarted {
            display_name,
            step_id,
            index,
            total,
            price_units,
        } => format!(
            "[{}/{}] {} {} {}",
            index,
            total,
            style(display_name).bold(),
            style(format!("({})", step_id)).dim(),
            style(format!("{} sats", price_units)).yellow()
        ),
        ExecutionEvent::StepSucceeded {
            cost_units,
            latency_ms,
            ..
        } => format!(
            "      {} {} {}",
            CHECK,
            style(format!("{} sats", cost_units)).yellow(),
            style(format!("{}ms", latency_ms)).dim()
        ),
        ExecutionEvent::StepFailed {
            error, latency_ms, ..
        } => format!(
            "      {} {} {}",
            CROSS,
            style(error).red(),
            style(format!("{}ms", latency_ms)).dim()
        ),
        ExecutionEvent::StepBlocked { capability, .. } => format!(
            "      {} No service for capability: {}",
            CROSS,
            style(capability).yellow()
        ),
        ExecutionEvent::PaymentChallengeSettled { step_id } => format!(
            "      {} 402 challenge on {}, settled with test cert",
            LOCK,
            style(step_id).bold()
        ),
        ExecutionEvent::PipelineAborted { step_id, .. } => format!(
            "{} Run aborted: step {} requires payment",
            CROSS,
            style(step_id).bold()
        ),
        ExecutionEvent::PipelineCompleted {
            total_cost,
            total_latency_ms,
            ..
        } => format!(
            "{} Pipeline complete: {} total, {}",
            CHECK,
            style(format!("{} sats", total_cost)).yellow(),
            style(format!("{}ms", total_latency_ms)).dim()
        ),
    }
}

/// Print one discovered service
pub fn print_service(service: &ServiceDescriptor) {
    println!(
        "  {} {} {} {}",
        style(&service.capability_id).bold(),
        style(format!("[{}]", service.category)).cyan(),
        style(format!("{} sats", service.price_units)).yellow(),
        if service.input_schema.is_empty() && service.output_schema.is_empty() {
            style("no declared schema").dim().to_string()
        } else {
            style(format!(
                "in: {{{}}} out: {{{}}}",
                service.input_schema.join(", "),
                service.output_schema.join(", ")
            ))
            .dim()
            .to_string()
        }
    );
}

/// Print a schema compatibility verdict for one step pair
pub fn print_schema_compat(source_id: &str, target_id: &str, compat: &SchemaCompat) {
    match compat {
        SchemaCompat::Compatible { shared } if shared.is_empty() => println!(
            "  {} {} {} {}",
            CHECK,
            style(source_id).bold(),
            style("→").dim(),
            style(target_id).bold()
        ),
        SchemaCompat::Compatible { shared } => println!(
            "  {} {} {} {} {}",
            CHECK,
            style(source_id).bold(),
            style("→").dim(),
            style(target_id).bold(),
            style(format!("shares {{{}}}", shared.join(", "))).dim()
        ),
        SchemaCompat::CustomMapping => println!(
            "  {} {} {} {} {}",
            INFO,
            style(source_id).bold(),
            style("→").dim(),
            style(target_id).bold(),
            style("custom input mapping").dim()
        ),
    }
}

/// Print a gap report for a blocked step
pub fn print_gap_report(gap: &GapReport) {
    println!(
        "\n{} Capability gap: {}",
        WARN,
        style(&gap.capability_id).bold()
    );
    println!(
        "  capability: {}",
        style(&gap.category).yellow()
    );
    if gap.related_providers.is_empty() {
        println!("  {} no providers on the network", style("✗").red());
    } else {
        println!(
            "  nearby providers: {}",
            style(gap.related_providers.join(", ")).cyan()
        );
    }
    println!(
        "  would send: {}",
        style(truncate(&gap.attempted_payload.to_string(), 60)).dim()
    );
    if !gap.wanted_input.is_empty() {
        println!("  needs input:  {{{}}}", gap.wanted_input.join(", "));
    }
    if !gap.wanted_output.is_empty() {
        println!("  needs output: {{{}}}", gap.wanted_output.join(", "));
    }
    println!(
        "  estimated price: {}-{} sats",
        gap.price_band.low_units, gap.price_band.high_units
    );
}

/// Print the per-step price quote and the pipeline total, before any
/// request is issued. Undeclared services quote their fallback price.
pub fn print_price_quote(pipeline: &Pipeline, registry: &ServiceRegistry) {
    println!("\n{} Price quote:", INFO);
    let mut total = 0u64;
    for step in &pipeline.steps {
        let declared = registry.price_of(&step.id);
        let price = declared.unwrap_or(step.fallback_price);
        total += price;
        println!(
            "  {:24} {:>8} {}",
            style(&step.id).bold(),
            style(format!("{} sats", price)).yellow(),
            if declared.is_some() {
                style("declared").dim()
            } else {
                style("fallback").yellow()
            }
        );
    }
    println!(
        "  {:24} {:>8}",
        style("total").bold(),
        style(format!("{} sats", total)).yellow()
    );
}

/// Print the cost/latency summary table
pub fn print_stats(stats: &RunStats) {
    println!("\n{} Run summary:", INFO);
    for step in &stats.per_step {
        println!(
            "  {:24} {:18} {:>8} {:>8}",
            style(&step.step_id).bold(),
            format_outcome_state(step.state),
            style(format!("{} sats", step.cost_units)).yellow(),
            style(format!("{}ms", step.latency_ms)).dim()
        );
    }
    println!(
        "  {:24} {:18} {:>8} {:>8}",
        style("total").bold(),
        format!(
            "{}/{}/{}",
            style(stats.succeeded).green(),
            style(stats.failed).red(),
            style(stats.blocked).yellow()
        ),
        style(format!("{} sats", stats.total_cost)).yellow(),
        style(format!("{}ms", stats.total_latency_ms)).dim()
    );
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_event_formatting_mentions_the_step() {
        let event = ExecutionEvent::StepStarted {
            step_id: "btc-price".to_string(),
            display_name: "Bitcoin Price Oracle".to_string(),
            index: 1,
            total: 4,
            price_units: 5,
        };
        let line = format_execution_event(&event);
        assert!(line.contains("Bitcoin Price Oracle"));
        assert!(line.contains("btc-price"));
        assert!(line.contains("5 sats"));
    }

    #[test]
    fn test_completed_event_carries_totals() {
        let event = ExecutionEvent::PipelineCompleted {
            run_id: Uuid::new_v4(),
            total_cost: 30,
            total_latency_ms: 1234,
        };
        let line = format_execution_event(&event);
        assert!(line.contains("30 sats"));
        assert!(line.contains("1234ms"));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 60), "short");
        let long = "x".repeat(100);
        assert_eq!(truncate(&long, 60).len(), 63);
    }
}
