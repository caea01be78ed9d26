//! Colorful console output for encoding and verification results.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;

use crate::domain::{Problem, Schedule};
use crate::solver::SolvedSchedule;
use crate::verify::{ConstraintCheck, HARD_TOLERANCE};

/// ASCII art banner for service startup.
pub fn print_banner() {
    let banner = r#"
   ___  _   _ ____   ___
  / _ \| | | | __ ) / _ \
 | | | | | | |  _ \| | | |
 | |_| | |_| | |_) | |_| |
  \__\_\\___/|____/ \___/
"#;
    println!("{}", banner.cyan().bold());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black(),
        "QUBO Scheduling".bright_cyan()
    );
}

/// Prints the problem shape before encoding starts.
pub fn print_problem(problem: &Problem) {
    println!(
        "{} {} {} Problem: entities ({}), slots ({}), variables ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Encoder]".bright_cyan(),
        problem
            .n_entities()
            .to_formatted_string(&Locale::en)
            .bright_yellow(),
        problem
            .n_slots()
            .to_formatted_string(&Locale::en)
            .bright_yellow(),
        problem
            .n_variables()
            .to_formatted_string(&Locale::en)
            .bright_yellow()
    );
}

/// Prints the full report for a solved schedule: energy, assignment grid,
/// per-constraint check lines, duty counts and the summary box.
pub fn print_report(problem: &Problem, result: &SolvedSchedule) {
    println!(
        "{} {} {} Energy ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Sampler]".bright_cyan(),
        format_energy(result.energy)
    );

    println!();
    print_schedule(problem, &result.schedule);
    println!();

    let name_width = result
        .checks
        .iter()
        .map(|check| check.name.chars().count())
        .max()
        .unwrap_or(0);
    for check in &result.checks {
        print_check_line(check, name_width);
    }

    println!();
    let label_width = problem
        .entity_labels()
        .iter()
        .map(|label| label.chars().count())
        .max()
        .unwrap_or(0);
    for (label, count) in problem
        .entity_labels()
        .iter()
        .zip(result.schedule.assignment_counts())
    {
        println!("{:<width$}  {:>3} slots", label, count, width = label_width);
    }

    print_summary_box(result);
}

/// Prints the assignment grid: slot indices across the top, one row of
/// `X`/`.` marks per entity.
pub fn print_schedule(problem: &Problem, schedule: &Schedule) {
    let labels = problem.entity_labels();
    let label_width = labels
        .iter()
        .map(|label| label.chars().count())
        .max()
        .unwrap_or(0);
    let col_width = problem.n_slots().saturating_sub(1).to_string().len() + 1;

    let mut header = " ".repeat(label_width);
    for slot in 0..problem.n_slots() {
        header.push_str(&format!("{:>width$}", slot, width = col_width));
    }
    println!("{}", header.bright_black());

    for (entity, label) in labels.iter().enumerate() {
        let mut row = format!("{:<width$}", label, width = label_width);
        for slot in 0..problem.n_slots() {
            let mark = if schedule.is_assigned(entity, slot) {
                "X"
            } else {
                "."
            };
            row.push_str(&format!("{:>width$}", mark, width = col_width));
        }
        println!("{}", row);
    }
}

fn print_check_line(check: &ConstraintCheck, name_width: usize) {
    let value = if check.hard && check.residual.abs() > HARD_TOLERANCE {
        check.residual.to_string().bright_red().bold().to_string()
    } else if check.hard {
        check.residual.to_string().bright_green().to_string()
    } else if check.residual.abs() > HARD_TOLERANCE {
        check.residual.to_string().yellow().to_string()
    } else {
        check.residual.to_string().white().to_string()
    };
    println!(
        "Checking {:<width$} {}",
        check.name,
        value,
        width = name_width
    );
}

fn print_summary_box(result: &SolvedSchedule) {
    let hard_residual: f64 = result
        .checks
        .iter()
        .filter(|check| check.hard)
        .map(|check| check.residual)
        .sum();
    let soft_residual: f64 = result
        .checks
        .iter()
        .filter(|check| !check.hard)
        .map(|check| check.residual)
        .sum();
    let assigned: usize = result.schedule.assignment_counts().iter().sum();

    // Summary box (60 chars wide, 56 char content area)
    println!();
    println!(
        "{}",
        "╔══════════════════════════════════════════════════════════╗".bright_cyan()
    );

    let status_text = if result.feasible {
        "✓ FEASIBLE SCHEDULE FOUND"
    } else {
        "✗ INFEASIBLE (hard constraints violated)"
    };
    let status_colored = if result.feasible {
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

    println!(
        "{}",
        "╠══════════════════════════════════════════════════════════╣".bright_cyan()
    );

    println!(
        "{}  {:<18}{:>36}  {}",
        "║".bright_cyan(),
        "Energy:",
        result.energy.to_string(),
        "║".bright_cyan()
    );
    println!(
        "{}  {:<18}{:>36}  {}",
        "║".bright_cyan(),
        "Hard residual:",
        hard_residual.to_string(),
        "║".bright_cyan()
    );
    println!(
        "{}  {:<18}{:>36}  {}",
        "║".bright_cyan(),
        "Soft residual:",
        soft_residual.to_string(),
        "║".bright_cyan()
    );
    println!(
        "{}  {:<18}{:>36}  {}",
        "║".bright_cyan(),
        "Assigned cells:",
        assigned.to_formatted_string(&Locale::en),
        "║".bright_cyan()
    );

    println!(
        "{}",
        "╚══════════════════════════════════════════════════════════╝".bright_cyan()
    );
    println!();
}

fn format_energy(energy: f64) -> String {
    if energy.abs() <= HARD_TOLERANCE {
        energy.to_string().bright_green().to_string()
    } else if energy < 0.0 {
        energy.to_string().bright_green().bold().to_string()
    } else {
        energy.to_string().yellow().to_string()
    }
}

/// Wall-clock `HH:MM:SS.mmm` prefix for report lines.
fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}
