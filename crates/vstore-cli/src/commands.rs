use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use vstore_engine::VStoreConfig;
use vstore_types::{AuthorInfo, TemplateDescriptor};
use vstore_validation::{TemplateChecker, TemplateValidationError};

use crate::cli::*;
use crate::script::{load_script, Outcome, Session, StepReport};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::CheckTemplate(args) => cmd_check_template(&args, &config, cli.format),
        Command::Apply(args) => cmd_apply(&args, config, cli.format).await,
        Command::Config => cmd_config(&config, cli.format),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<VStoreConfig> {
    match path {
        Some(path) => VStoreConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(VStoreConfig::default()),
    }
}

fn check_template_file(
    path: &Path,
    config: &VStoreConfig,
) -> anyhow::Result<Vec<TemplateValidationError>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading template {}", path.display()))?;
    let descriptor: TemplateDescriptor = serde_json::from_str(&data)
        .with_context(|| format!("parsing template {}", path.display()))?;
    Ok(TemplateChecker::new(config.max_binary_size).check(&descriptor.elements))
}

fn cmd_check_template(
    args: &CheckTemplateArgs,
    config: &VStoreConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let errors = check_template_file(&args.file, config)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&errors)?),
        OutputFormat::Text if errors.is_empty() => {
            println!("{} {} is valid", "✓".green().bold(), args.file.display());
        }
        OutputFormat::Text => {
            for error in &errors {
                println!(
                    "  {} element {}: {:?}",
                    "✗".red(),
                    error.template_code.to_string().yellow(),
                    error.kind
                );
            }
        }
    }
    if !errors.is_empty() {
        anyhow::bail!("{} template element(s) rejected", errors.len());
    }
    Ok(())
}

async fn cmd_apply(
    args: &ApplyArgs,
    config: VStoreConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let script = load_script(&args.script)?;
    let base_dir = args
        .script
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let author = script
        .author
        .unwrap_or_else(|| AuthorInfo::new("vstore-cli"));
    let session = Session::new(config, base_dir, author);
    let reports = session.run(script.steps, args.keep_going).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            for report in &reports {
                print_report(report);
            }
            let metrics = session.store().metrics();
            println!(
                "{} template version(s), {} object version(s), {} binary reference(s)",
                metrics.template_versions_committed.to_string().bold(),
                metrics.object_versions_committed.to_string().bold(),
                metrics.referenced_binaries.to_string().bold()
            );
        }
    }

    let rejected = reports.iter().filter(|r| r.outcome.is_rejected()).count();
    if rejected > 0 {
        anyhow::bail!("{rejected} step(s) rejected");
    }
    Ok(())
}

fn print_report(report: &StepReport) {
    let label = format!("#{} {}", report.index, report.op);
    match &report.outcome {
        Outcome::Registered { key, size } => {
            println!("{} {} {} ({size} bytes)", "✓".green(), label, key.cyan());
        }
        Outcome::Committed { version_id } => {
            println!(
                "{} {} version {}",
                "✓".green(),
                label,
                version_id.short_id().yellow()
            );
        }
        Outcome::Loaded { value } => {
            println!("{} {}", "✓".green(), label);
            match serde_json::to_string_pretty(value) {
                Ok(json) => println!("{json}"),
                Err(err) => println!("  {}", err.to_string().red()),
            }
        }
        Outcome::Rejected {
            error,
            retryable,
            details,
        } => {
            let hint = if *retryable { " (retry with the latest version)" } else { "" };
            println!("{} {} {}{}", "✗".red().bold(), label, error.red(), hint.dimmed());
            if let Some(details) = details {
                println!("  {details}");
            }
        }
    }
}

fn cmd_config(config: &VStoreConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => print!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}
