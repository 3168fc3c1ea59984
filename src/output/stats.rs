//! Statistics reporting.

use console::style;

use crate::download::QueueStats;

/// Print the final queue statistics.
pub fn print_queue_stats(stats: &QueueStats, fingerprints: usize) {
    eprintln!();
    eprintln!("{}", style("═".repeat(50)).dim());
    eprintln!("{}", style("Session Statistics:").bold());
    eprintln!("  Downloaded:   {}", style(stats.done).green());
    if stats.failed > 0 {
        eprintln!("  Failed:       {}", style(stats.failed).red());
    } else {
        eprintln!("  Failed:       {}", stats.failed);
    }
    eprintln!("  Fingerprints: {}", fingerprints);
    eprintln!("{}", style("═".repeat(50)).dim());
}

/// One-line summary of the queue.
pub fn summary_line(stats: &QueueStats) -> String {
    format!("Downloaded: {} files ({} failed)", stats.done, stats.failed)
}
