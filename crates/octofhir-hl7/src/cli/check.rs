//! Check-templates command implementation

use super::output;
use crate::builtin;
use anyhow::{Result, bail};
use colored::Colorize;
use octofhir_hl7_eval::{EvalResult, TemplateRegistry};
use std::path::{Path, PathBuf};

/// Configuration for check-templates command
pub struct CheckConfig {
    pub dirs: Vec<PathBuf>,
    /// Resolve references against the built-in templates too
    pub with_builtins: bool,
}

/// Load and validate template directories
pub fn check(config: CheckConfig) -> Result<()> {
    if config.dirs.is_empty() {
        bail!("No template directories specified");
    }

    let mut failed = 0;
    for dir in &config.dirs {
        match check_dir(dir, config.with_builtins) {
            Ok(count) => println!(
                "{} {} ({} templates)",
                "✓".green().bold(),
                dir.display().to_string().cyan(),
                count
            ),
            Err(e) => {
                failed += 1;
                println!("{} {}", "✗".red().bold(), dir.display().to_string().cyan());
                println!("  {}: {}", "error".red().bold(), e);
            }
        }
    }

    println!();
    if failed > 0 {
        bail!("{} of {} template directories failed", failed, config.dirs.len());
    }
    println!(
        "{}",
        output::format_success(&format!(
            "All {} template directories are valid",
            config.dirs.len()
        ))
    );
    Ok(())
}

fn check_dir(dir: &Path, with_builtins: bool) -> EvalResult<usize> {
    let mut registry = if with_builtins {
        builtin::templates()?
    } else {
        TemplateRegistry::new()
    };
    let count = registry.extend_from_dir(dir)?;
    registry.validate()?;
    Ok(count)
}
