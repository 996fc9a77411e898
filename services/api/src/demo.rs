use crate::infra::{demo_service, QuoteRequest};
use clap::Args;
use package_scoping::config::AppConfig;
use package_scoping::error::AppError;
use package_scoping::scoping::{
    AnswerValue, Scalar, ScopingCalculationResult, ScopingEngine, ScopingInputs,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Team size answered in the demo questionnaire.
    #[arg(long, default_value_t = 75)]
    pub(crate) team_size: i64,
    /// Compliance regimes to select (repeatable): soc2, hipaa, pci.
    #[arg(long = "compliance")]
    pub(crate) compliance: Vec<String>,
    /// Answer "yes" to the returning customer question.
    #[arg(long)]
    pub(crate) returning_customer: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            team_size: 75,
            compliance: Vec::new(),
            returning_customer: false,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// JSON file holding `baseline`, `rules` and `answers`.
    #[arg(long)]
    pub(crate) file: PathBuf,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let (service, audit, package_id) = demo_service(config.engine)?;

    println!("Package scoping demo");
    println!("Questionnaire for {package_id}:");
    for factor in service.questionnaire(&package_id)? {
        let required = if factor.is_required { " (required)" } else { "" };
        println!(
            "  - [{}] {}{}",
            factor.input_type.label(),
            factor.question,
            required
        );
        if !factor.options.is_empty() {
            let options: Vec<&str> = factor
                .options
                .iter()
                .map(|option| option.label.as_str())
                .collect();
            println!("      options: {}", options.join(", "));
        }
    }
    println!(
        "{} catalog changes audited while seeding",
        audit.entries()?.len()
    );

    let inputs = demo_inputs(&args);
    let result = service.calculate(&package_id, &inputs)?;
    println!();
    render_quote(&result);
    Ok(())
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let raw = std::fs::read_to_string(&args.file)?;
    let request: QuoteRequest = serde_json::from_str(&raw)?;

    let rules = request.build_rules()?;
    let engine = ScopingEngine::new(config.engine);
    let result = engine.calculate(&request.baseline, &rules, &request.answers)?;

    println!("Quote for {} ({})", request.baseline.name, result.package_id);
    render_quote(&result);
    Ok(())
}

fn demo_inputs(args: &DemoArgs) -> ScopingInputs {
    let mut inputs = ScopingInputs::new().with("team_size", args.team_size);
    if !args.compliance.is_empty() {
        let selected = args
            .compliance
            .iter()
            .map(|value| Scalar::Text(value.trim().to_ascii_lowercase()))
            .collect();
        inputs.insert("compliance", AnswerValue::List(selected));
    }
    inputs.insert("returning_customer", args.returning_customer);
    inputs
}

pub(crate) fn render_quote(result: &ScopingCalculationResult) {
    println!(
        "Base:     {} over {} week(s)",
        result.base_price, result.base_timeline_weeks
    );
    if result.applied_rules.is_empty() {
        println!("No scoping adjustments matched.");
    } else {
        println!("Adjustments:");
        for applied in &result.applied_rules {
            println!(
                "  - {:<40} {:>12} {:>+4} wk",
                applied.display_label(),
                applied.price_delta,
                applied.timeline_delta_weeks
            );
        }
    }
    println!(
        "Adjusted: {} over {} week(s) (change {})",
        result.adjusted_price,
        result.adjusted_timeline_weeks,
        price_change_label(result)
    );
}

fn price_change_label(result: &ScopingCalculationResult) -> String {
    result
        .price_change()
        .map_or_else(|| "n/a".to_string(), |change| change.to_string())
}
