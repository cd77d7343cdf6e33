//! Doctor command - verify system requirements and configuration.

use crate::api::{GaiaApiClient, ScoringApi};
use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(config_path: &Path, settings: &Settings) -> anyhow::Result<()> {
    Output::header("GAIA Runner Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("Model Access").bold());
    let key_check = match &settings.agent.api_base {
        Some(base) => CheckResult::ok("API base", &format!("custom endpoint {}", base)),
        None => check_openai_api_key(),
    };
    key_check.print();
    checks.push(key_check);
    println!();

    println!("{}", style("Tools").bold());
    let tool_checks = check_tools(settings);
    for check in &tool_checks {
        check.print();
    }
    checks.extend(tool_checks);
    println!();

    println!("{}", style("Scoring API").bold());
    let api_check = check_scoring_api(settings).await;
    api_check.print();
    checks.push(api_check);
    let space_check = check_space_id(settings);
    space_check.print();
    checks.push(space_check);
    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);
    let temp_check = check_temp_dir(settings);
    temp_check.print();
    checks.push(temp_check);
    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before running an evaluation.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Ready to run the evaluation.");
    }

    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Report the enabled tools and the OCR executable.
fn check_tools(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    if settings.tools.enabled.is_empty() {
        results.push(CheckResult::warning(
            "Enabled tools",
            "none",
            "The agent can only answer from the question text",
        ));
    } else {
        results.push(CheckResult::ok(
            "Enabled tools",
            &settings.tools.enabled.join(", "),
        ));
    }

    if settings.tools.enabled.iter().any(|t| t == "text_from_image") {
        results.push(check_ocr(&settings.tools.ocr_command));
    }

    results
}

/// Check that the OCR executable runs.
fn check_ocr(command: &str) -> CheckResult {
    match Command::new(command).arg("--version").output() {
        Ok(output) if output.status.success() => {
            // tesseract prints its version on stdout or stderr depending on build
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).into_owned()
            } else {
                String::from_utf8_lossy(&output.stdout).into_owned()
            };
            let version = text.lines().next().unwrap_or("installed").trim().to_string();
            CheckResult::ok(command, &version)
        }
        Ok(_) => CheckResult::warning(command, "installed but not working", install_hint_ocr()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::warning(command, "not found", install_hint_ocr())
        }
        Err(e) => CheckResult::warning(command, &format!("error: {}", e), install_hint_ocr()),
    }
}

/// Check that the scoring API answers.
async fn check_scoring_api(settings: &Settings) -> CheckResult {
    let client = match GaiaApiClient::from_settings(&settings.api) {
        Ok(c) => c,
        Err(e) => {
            return CheckResult::error(
                "Scoring API",
                &e.to_string(),
                "Set api.base_url in the config file",
            )
        }
    };

    match client.get_questions().await {
        Ok(questions) => CheckResult::ok(
            "Scoring API",
            &format!("{} ({} questions)", client.base_url(), questions.len()),
        ),
        Err(e) => CheckResult::error(
            "Scoring API",
            &format!("{} unreachable: {}", client.base_url(), e),
            "Check your network connection and api.base_url",
        ),
    }
}

/// Check the space id used for the agent code link.
fn check_space_id(settings: &Settings) -> CheckResult {
    match settings.space_id() {
        Some(_) => CheckResult::ok("Agent code", &settings.agent_code()),
        None => CheckResult::warning(
            "Agent code",
            "unknown",
            "Set submission.space_id or the SPACE_ID environment variable",
        ),
    }
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create one at {}", config_path.display()),
        )
    }
}

/// Check the parent directory for task files.
fn check_temp_dir(settings: &Settings) -> CheckResult {
    let temp_dir = settings.temp_dir();
    if temp_dir.is_dir() {
        CheckResult::ok("Temp directory", &format!("{}", temp_dir.display()))
    } else {
        CheckResult::warning(
            "Temp directory",
            &format!("{} (will be created)", temp_dir.display()),
            "Directory will be created on first run",
        )
    }
}

/// Platform-specific install hint for tesseract.
fn install_hint_ocr() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install tesseract"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install tesseract-ocr (or your package manager)"
    } else {
        "Install from: https://github.com/tesseract-ocr/tesseract"
    }
}
