use crate::cli::{BrowserArgs, ExecuteArgs, PlanArgs, RunArgs};
use crate::utils::check_prompt;
use anyhow::{Context, Result};
use colored::*;
use flowcapture::config::default_config_dir;
use flowcapture::{execute_plan, ActionPlan, Planner, Settings, StepOutcome, StepResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const PROMPT_FILE: &str = "prompt.txt";

pub fn load_settings(config_dir: Option<&Path>, browser: Option<&BrowserArgs>) -> Result<Settings> {
    let dir = config_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_dir);
    let mut settings = Settings::load(&dir)
        .with_context(|| format!("Failed to load configuration from {}", dir.display()))?;

    if let Some(browser) = browser {
        if browser.headless {
            settings.runtime.browser.headless = true;
        }
        if let Some(endpoint) = &browser.endpoint {
            settings.runtime.browser.endpoint = Some(endpoint.clone());
        }
    }
    Ok(settings)
}

pub fn handle_plan(args: PlanArgs, config_dir: Option<&Path>) -> Result<()> {
    let prompt = check_prompt(&args.prompt)?;
    let planner = Planner::new(Arc::new(load_settings(config_dir, None)?));

    match args.run_dir {
        Some(run_dir) => {
            let (planned, path) = planner
                .plan_into(&prompt, &run_dir)
                .context("Failed to write plan")?;
            print_plan(&planned.plan);
            println!("{} {}", "✓ Plan written to".green(), path.display());
        }
        None => {
            let planned = planner.plan(&prompt)?;
            println!("{}", planned.request.to_string().dimmed());
            print!("{}", planned.plan.to_yaml()?);
        }
    }
    Ok(())
}

pub async fn handle_execute(args: ExecuteArgs, config_dir: Option<&Path>) -> Result<()> {
    let settings = load_settings(config_dir, Some(&args.browser))?;
    let results = execute_plan(&args.run_dir, &settings)
        .await
        .with_context(|| format!("Failed to execute {}", args.run_dir.display()))?;
    report(&results, args.json)
}

/// Plan into `run_dir` (already created), then execute it
pub async fn handle_run(args: RunArgs, run_dir: PathBuf, config_dir: Option<&Path>) -> Result<()> {
    let prompt = check_prompt(&args.prompt)?;
    let settings = Arc::new(load_settings(config_dir, Some(&args.browser))?);

    std::fs::write(run_dir.join(PROMPT_FILE), &prompt)
        .with_context(|| format!("Failed to write {PROMPT_FILE}"))?;

    let (planned, _) = Planner::new(settings.clone())
        .plan_into(&prompt, &run_dir)
        .context("Failed to plan prompt")?;
    print_plan(&planned.plan);

    info!("Executing plan in {}", run_dir.display());
    let results = execute_plan(&run_dir, &settings)
        .await
        .context("Failed to execute plan")?;
    report(&results, args.json)?;

    println!("{} {}", "📁 Run folder:".bold(), run_dir.display());
    Ok(())
}

fn print_plan(plan: &ActionPlan) {
    println!("{}", format!("📋 Plan ({} steps)", plan.len()).bold().cyan());
    for (i, step) in plan.steps().iter().enumerate() {
        match &step.state_label {
            Some(label) => println!("  {:>2}. {} {}", i + 1, step.action, format!("[{label}]").dimmed()),
            None => println!("  {:>2}. {}", i + 1, step.action),
        }
    }
}

fn report(results: &[StepResult], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    for result in results {
        let mark = if result.outcome.is_success() {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "  {mark} {:>2}. {:<8} {}",
            result.index,
            result.action,
            describe(&result.outcome)
        );
    }
    let passed = results.iter().filter(|r| r.outcome.is_success()).count();
    let summary = format!("{passed}/{} steps succeeded", results.len());
    if passed == results.len() {
        println!("{}", summary.bold().green());
    } else {
        println!("{}", summary.bold().yellow());
    }
    Ok(())
}

fn describe(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Applied { strategy } => format!("via {strategy}"),
        StepOutcome::Navigated { url } => url.clone(),
        StepOutcome::AssertPassed { token } => format!("found {token:?}"),
        StepOutcome::AssertFailed { token } => format!("{token:?} not on page").red().to_string(),
        StepOutcome::NotFound { attempts } => {
            format!("no match after {attempts} strategies").red().to_string()
        }
        StepOutcome::HandlerError { reason } => reason.red().to_string(),
        StepOutcome::Skipped { reason } => format!("skipped: {reason}").dimmed().to_string(),
    }
}
