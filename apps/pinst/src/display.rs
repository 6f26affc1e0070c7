//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use pinst_ops::{FormulaInfo, InstallReport, OperationResult};
use pinst_types::{ColorChoice, ResolvedRelease, SmokeTestOutcome, Verification};
use std::io;
use std::path::Path;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            self.render_json(result)
        } else {
            match result {
                OperationResult::InstallReport(report) => self.render_install_report(report),
                OperationResult::Resolved(release) => self.render_resolved(release),
                OperationResult::FormulaInfo(info) => self.render_formula_info(info),
            }
        }
    }

    /// Render as JSON
    fn render_json(&self, result: &OperationResult) -> io::Result<()> {
        let json = result.to_json().map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    /// Render installation report
    fn render_install_report(&self, report: &InstallReport) -> io::Result<()> {
        let result = &report.result;
        println!(
            "{} {} {}",
            self.style(&Style::new().green().bold(), "Installed"),
            self.style(&Style::new().bold(), &result.package),
            result.version
        );
        println!("  Path:       {}", result.path.display());
        let verification = match &result.verification {
            Verification::Verified(checksum) => format!("verified ({checksum})"),
            Verification::Unverified(digest) => format!("unverified (observed {digest})"),
        };
        println!("  Checksum:   {verification}");
        let smoke = match &result.smoke_test {
            SmokeTestOutcome::Passed => "passed".to_string(),
            SmokeTestOutcome::Failed { reason } => format!("failed: {reason}"),
            SmokeTestOutcome::Skipped => "skipped".to_string(),
        };
        println!("  Smoke test: {smoke}");
        println!("  Took:       {} ms", report.duration_ms);

        if !report.warnings.is_empty() {
            println!();
            for warning in &report.warnings {
                println!("{} {warning}", self.style(&Style::new().yellow().bold(), "warning:"));
            }
        }

        if let Some(caveats) = &report.caveats {
            println!();
            println!("{}", self.style(&Style::new().bold(), "Caveats"));
            for line in caveats.lines() {
                println!("  {line}");
            }
        }

        if !report.on_path {
            if let Some(dir) = result.path.parent() {
                render_path_reminder(dir);
            }
        }
        Ok(())
    }

    fn render_resolved(&self, release: &ResolvedRelease) -> io::Result<()> {
        println!(
            "{} {} ({})",
            self.style(&Style::new().bold(), &release.identifier),
            release.version,
            release.tag
        );
        println!("  URL:      {}", release.url);
        match &release.checksum {
            Some(checksum) => println!("  Checksum: {checksum}"),
            None => println!("  Checksum: not pinned"),
        }
        Ok(())
    }

    /// Render formula information
    fn render_formula_info(&self, info: &FormulaInfo) -> io::Result<()> {
        println!("{}", self.style(&Style::new().bold(), &info.name));
        if let Some(desc) = &info.desc {
            println!("{desc}");
        }
        println!();

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        let mut row = |key: &str, value: String| {
            table.add_row(vec![Cell::new(key).add_attribute(Attribute::Bold), Cell::new(value)]);
        };
        row("Version", info.version.clone().unwrap_or_else(|| "latest".to_string()));
        row("URL", info.url.clone());
        row("Checksum", if info.pinned { "pinned" } else { "not pinned" }.to_string());
        row("Executable", info.bin.clone());
        if let Some(entry) = &info.entry {
            row("Archive entry", entry.clone());
        }
        row("Destination", info.destination.display().to_string());
        row("Installed", if info.installed { "yes" } else { "no" }.to_string());
        if let Some(license) = &info.license {
            row("License", license.clone());
        }
        if let Some(homepage) = &info.homepage {
            row("Homepage", homepage.clone());
        }
        row("Formula", info.source.display().to_string());
        println!("{table}");

        if !info.requirements.is_empty() {
            let mut requirements = Table::new();
            requirements
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            requirements.set_header(vec![
                Cell::new("Requires").add_attribute(Attribute::Bold),
                Cell::new("Found").add_attribute(Attribute::Bold),
            ]);
            for requirement in &info.requirements {
                let found = match &requirement.found {
                    Some(path) => Cell::new(path.display()).fg(Color::Green),
                    None => Cell::new("missing").fg(Color::Red),
                };
                requirements.add_row(vec![Cell::new(&requirement.name), found]);
            }
            println!();
            println!("{requirements}");
        }

        if let Some(caveats) = &info.caveats {
            println!();
            println!("{}", self.style(&Style::new().bold(), "Caveats"));
            for line in caveats.lines() {
                println!("  {line}");
            }
        }
        Ok(())
    }

    fn style(&self, style: &Style, text: &str) -> String {
        if self.supports_color() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

/// Tell the user how to reach the destination; shell profiles are left alone
fn render_path_reminder(dir: &Path) {
    eprintln!();
    eprintln!("{} is not on your PATH. Add it with:", dir.display());
    eprintln!("   export PATH=\"{}:$PATH\"", dir.display());
}

/// Format byte size in human readable format
#[allow(clippy::cast_precision_loss)]
pub(crate) fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{size:.0} {}", UNITS[unit_index])
    } else {
        format!("{size:.1} {}", UNITS[unit_index])
    }
}
