use anyhow::Context;
use clap::Parser;
use rebate_engine::core::progress::format_units;
use rebate_engine::utils::error::{ErrorSeverity, RebateError};
use rebate_engine::utils::{logger, validation::Validate};
use rebate_engine::{
    normalize_tiers, AgreementFile, CliConfig, OutputFormat, RebateAgreement, RebateEngine,
    RebateReport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting rebate-engine");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    match run(&config).await {
        Ok(Some(report)) => print_report(&report, config.format)?,
        Ok(None) => {}
        Err(e) => {
            tracing::error!(
                "❌ Rebate evaluation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 依嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2, // 可重試
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

/// Returns `None` for a dry run.
async fn run(config: &CliConfig) -> Result<Option<RebateReport>, RebateError> {
    config.validate()?;

    tracing::info!("📁 Loading agreement from: {}", config.agreement);
    let file = AgreementFile::from_file(&config.agreement)?;
    file.validate()?;

    for note in file.advisories() {
        tracing::warn!("⚠️ {}", note);
    }

    let agreement = file.into_agreement()?;

    if config.dry_run {
        print_dry_run(&agreement);
        return Ok(None);
    }

    let period = config.resolve_period(file.period()?)?;
    let source = match config.source_override() {
        Some(source) => source.build()?,
        None => file.build_source()?,
    };

    let engine = RebateEngine::new(source);
    let report = engine.evaluate(&agreement, period).await?;

    tracing::info!("✅ Rebate evaluation completed");
    Ok(Some(report))
}

fn print_report(report: &RebateReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
            println!("{}", json);
        }
        OutputFormat::Summary => {
            println!("📋 {} ({})", report.agreement, report.method);
            if let Some(period) = &report.period {
                println!("  Period: {}", period);
            }
            println!("  Eligible tier units: {}", format_units(report.eligible_tier_units));
            match report.current_tier {
                Some(index) => println!("  Current tier: {}", index + 1),
                None => println!("  Current tier: none"),
            }
            println!("  Rebate total: {:.2}", report.rebate_total);
            println!(
                "  ({} would pay {:.2})",
                report.method.alternative(),
                report.alternative_total
            );
            println!("  Progress: {} [{}%]", report.progress.label, report.progress.percent);
        }
    }
    Ok(())
}

fn print_dry_run(agreement: &RebateAgreement) {
    println!("🔍 Dry run: {} ({})", agreement.name, agreement.method);
    println!();
    println!("Articles:");
    for article in &agreement.articles {
        println!("  {} ({} units per tier unit)", article.id, format_units(article.units_per_tier_unit));
    }
    println!();
    println!("Normalized tiers:");
    for (i, tier) in normalize_tiers(&agreement.tiers).iter().enumerate() {
        let upper = tier.to.map(format_units).unwrap_or_else(|| "∞".to_string());
        println!(
            "  Tier {}: [{}, {}) @ {}",
            i + 1,
            format_units(tier.from),
            upper,
            tier.rebate
        );
    }
}
