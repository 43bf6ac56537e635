//! Terminal output for the fwd-scrub binary

use crate::config::ScrubConfig;
use crate::scrub::ScrubStatsSnapshot;
use console::style;
use std::time::Duration;

/// Print the startup banner
pub fn print_header(config: &ScrubConfig, duration: Option<Duration>) {
    println!(
        "{} Forward scrubbing cluster {}",
        style("[fwd-scrub]").cyan().bold(),
        style(&config.cluster).green()
    );
    println!(
        "  Scrub timeout: {}s ({} polls every {}s)",
        style(config.scrub_timeout).yellow(),
        style(config.poll_attempt_budget()).yellow(),
        config.poll_interval
    );
    println!(
        "  Sleep between iterations: {}s",
        style(config.sleep_between_iterations).dim()
    );
    match duration {
        Some(d) => println!("  Run time: {}s", style(d.as_secs()).yellow()),
        None => println!("  Run time: {}", style("until Ctrl+C").yellow()),
    }
    println!();
}

/// Print per-filesystem and total counters
pub fn print_summary(per_fs: &[(String, ScrubStatsSnapshot)], elapsed: Duration, failed: bool) {
    println!();
    if failed {
        println!("{}", style("Scrub Thrashing Failed").red().bold());
    } else {
        println!("{}", style("Scrub Thrashing Complete").green().bold());
    }
    println!("{}", style("─".repeat(50)).dim());

    let mut total = ScrubStatsSnapshot::default();
    for (fs, stats) in per_fs {
        total.merge(stats);
        println!(
            "  {} {} iterations, {} scrubs",
            style(format!("{fs}:")).bold(),
            stats.iterations,
            stats.scrubs_started
        );
    }

    println!("  {} {}", style("Completed:").bold(), total.scrubs_completed);
    println!("  {} {}", style("Timed out:").bold(), total.scrubs_timed_out);
    println!("  {} {}", style("Cancelled:").bold(), total.scrubs_cancelled);
    if total.scrubs_failed > 0 {
        println!("  {} {}", style("Failed:").red().bold(), total.scrubs_failed);
    }
    if total.poll_errors > 0 {
        println!("  {} {}", style("Poll errors:").yellow().bold(), total.poll_errors);
    }
    println!("  {} {:.1}s", style("Duration:").bold(), elapsed.as_secs_f64());
}
