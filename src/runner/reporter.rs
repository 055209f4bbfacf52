use std::fs;
use std::path::Path;

use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, Table};

use crate::Result;
use crate::runner::types::{RunReport, ScenarioReport, ScenarioStatus, Totals};

pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// 打印运行开始
    pub fn print_header(&self, base_url: Option<&str>, total: usize) {
        match base_url {
            Some(url) => println!("\nRunning {} scenarios against {}...\n", total, url.bold()),
            None => println!("\nRunning {} scenarios...\n", total),
        }
    }

    /// 打印单个场景
    pub fn print_scenario(&self, report: &ScenarioReport) {
        let (symbol, label) = match report.status {
            ScenarioStatus::Passed => ("✓".green(), "passed".green()),
            ScenarioStatus::Failed => ("✗".red(), "failed".red()),
            ScenarioStatus::Errored => ("!".red().bold(), "errored".red().bold()),
            ScenarioStatus::Skipped => ("⊘".dimmed(), "skipped".dimmed()),
        };

        println!(
            " {} {} {} ({}ms)",
            symbol,
            report.name.bold(),
            label,
            report.duration_ms
        );

        if report.status == ScenarioStatus::Skipped {
            return;
        }

        // 逐步骤显示，verbose 模式下包含通过的断言
        for step in &report.steps {
            let status = step
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let step_symbol = if step.passed { "✓".green() } else { "✗".red() };
            println!(
                "   {} [{}] {} {} → {} ({}ms)",
                step_symbol,
                step.index,
                step.method.cyan(),
                step.url,
                status,
                step.duration_ms
            );

            for result in report
                .step_results
                .iter()
                .filter(|r| r.step_index == step.index)
            {
                if result.passed {
                    if self.verbose {
                        println!("       {} {}", "✓".green(), result.description);
                    }
                } else {
                    println!("       {} {}", "✗".red(), result.description);
                    if let Some(msg) = &result.message {
                        println!("         {}", msg.red());
                    }
                    println!(
                        "         expected: {}  actual: {}",
                        result.expected, result.actual
                    );
                }
            }
        }

        if let Some(error) = &report.error {
            let location = match (error.step_index, &error.step_name) {
                (Some(index), Some(name)) => format!(" at step {} ({})", index, name),
                (Some(index), None) => format!(" at step {}", index),
                _ => String::new(),
            };
            println!(
                "   {}{}: {}",
                format!("{:?}", error.kind).red().bold(),
                location,
                error.message
            );
        }
        println!();
    }

    /// 打印汇总表
    pub fn print_summary(&self, report: &RunReport) {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["Scenario", "Status", "Assertions", "Steps", "Duration"]);

        for scenario in &report.scenarios {
            let status_color = match scenario.status {
                ScenarioStatus::Passed => Color::Green,
                ScenarioStatus::Skipped => Color::DarkGrey,
                ScenarioStatus::Failed | ScenarioStatus::Errored => Color::Red,
            };

            table.add_row(vec![
                Cell::new(&scenario.name),
                Cell::new(format!("{:?}", scenario.status)).fg(status_color),
                Cell::new(format!(
                    "{}/{}",
                    scenario.passed_assertions(),
                    scenario.step_results.len()
                )),
                Cell::new(scenario.steps.len()),
                Cell::new(format!("{}ms", scenario.duration_ms)).add_attribute(Attribute::Dim),
            ]);
        }

        println!("{}", table);
        println!("{}", summary_line(&report.totals));
        println!(
            "  {}: {:.3}s  {}: {}",
            "Duration".bold(),
            report.duration_ms as f64 / 1000.0,
            "Run".bold(),
            report.run_id
        );
        println!();
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

fn summary_line(totals: &Totals) -> String {
    let mut parts = vec![format!("{} passed", totals.passed.to_string().green())];
    if totals.failed > 0 {
        parts.push(format!("{} failed", totals.failed.to_string().red()));
    }
    if totals.errored > 0 {
        parts.push(format!("{} errored", totals.errored.to_string().red().bold()));
    }
    if totals.skipped > 0 {
        parts.push(format!("{} skipped", totals.skipped.to_string().dimmed()));
    }

    format!(
        "  {}: {}, {} total\n  {}: {} passed, {} failed",
        "Scenarios".bold(),
        parts.join(", "),
        totals.scenarios,
        "Assertions".bold(),
        totals.assertions_passed.to_string().green(),
        totals.assertions_failed.to_string().red()
    )
}

/// 以 JSON 文档写出报告
pub fn write_json_report<P: AsRef<Path>>(report: &RunReport, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}
