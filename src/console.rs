//! Colorful console output for model and solve metrics.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::time::Duration;

use crate::cp::{CpSolution, SolveStatus};

/// Banner printed once at server startup.
pub fn print_banner() {
    let banner = r#"
   ___      _ _   ___      _
  / __|__ _| | | | _ \___ | |_ ___ _ _
 | (__/ _` | | | |   / _ \|  _/ -_) '_|
  \___\__,_|_|_| |_|_\___/ \__\___|_|
"#;
    println!("{}", banner.cyan().bold());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black(),
        "Surgeon Call Scheduling".bright_cyan()
    );
}

/// Prints the size of a freshly built call model.
pub fn print_model(days: usize, surgeons: usize, variables: usize, constraints: usize) {
    println!(
        "{} {} {} Model: days ({}), surgeons ({}), variables ({}), constraints ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Model]".bright_cyan(),
        days.to_formatted_string(&Locale::en).bright_yellow(),
        surgeons.to_formatted_string(&Locale::en).bright_yellow(),
        variables.to_formatted_string(&Locale::en).bright_yellow(),
        constraints.to_formatted_string(&Locale::en).bright_yellow()
    );
}

/// Prints a solve summary box.
pub fn print_solve_result(solution: &CpSolution) {
    let stats = solution.stats;

    println!(
        "{} {} {} Solving ended: time spent ({}), objective ({}), MILP columns ({}), rows ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Solver]".bright_cyan(),
        format_duration(stats.elapsed).yellow(),
        format_objective(solution.objective_value()),
        stats.columns.to_formatted_string(&Locale::en).bright_magenta().bold(),
        stats.rows.to_formatted_string(&Locale::en).white()
    );

    println!();
    println!("{}", "╔══════════════════════════════════════════════════════════╗".bright_cyan());

    let status_text = match solution.status {
        SolveStatus::Optimal => "✓ OPTIMAL SCHEDULE FOUND",
        SolveStatus::Feasible => "✓ FEASIBLE SCHEDULE FOUND",
        SolveStatus::Infeasible => "✗ NO FEASIBLE SCHEDULE (proven)",
        SolveStatus::Unknown => "✗ NO FEASIBLE SCHEDULE (time limit)",
    };
    let status_colored = if solution.is_solution_found() {
        status_text.bright_green().bold().to_string()
    } else {
        status_text.bright_red().bold().to_string()
    };
    let status_padding = 56 - status_text.chars().count();
    let left_pad = status_padding / 2;
    let right_pad = status_padding - left_pad;
    println!(
        "{}{}{}{}{}",
        "║".bright_cyan(),
        " ".repeat(left_pad),
        status_colored,
        " ".repeat(right_pad),
        "║".bright_cyan()
    );

    println!("{}", "╠══════════════════════════════════════════════════════════╣".bright_cyan());

    let rows = [
        (
            "Objective:",
            solution
                .objective_value()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Solving Time:", format!("{:.2}s", stats.elapsed.as_secs_f64())),
        ("MILP Columns:", stats.columns.to_formatted_string(&Locale::en)),
        ("MILP Rows:", stats.rows.to_formatted_string(&Locale::en)),
    ];
    for (label, value) in rows {
        println!(
            "{}  {:<18}{:>36}  {}",
            "║".bright_cyan(),
            label,
            value,
            "║".bright_cyan()
        );
    }

    println!("{}", "╚══════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}

/// Formats a duration nicely.
fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        let mins = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

/// Lower is better: non-positive costs are green.
fn format_objective(objective: Option<i64>) -> String {
    match objective {
        Some(value) if value <= 0 => value.to_string().bright_green().to_string(),
        Some(value) => value.to_formatted_string(&Locale::en).yellow().to_string(),
        None => "-".bright_red().to_string(),
    }
}

/// Returns a timestamp string.
fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| format!("{}.{:03}", d.as_secs(), d.subsec_millis()))
        .unwrap_or_else(|_| "0.000".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
