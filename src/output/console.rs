//! Console output utilities.
//!
//! Everything goes to stderr: stdout belongs to the bridge protocol.

use console::style;

use crate::download::Notifier;

/// Print an info message.
pub fn print_info(message: &str) {
    eprintln!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    eprintln!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    eprintln!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     fansly-grabber                                    ║
║     Full-quality media from the Fansly web client     ║
╚═══════════════════════════════════════════════════════╝
"#;
    eprintln!("{}", style(banner).cyan());
}

/// Print configuration summary.
pub fn print_config_summary(quality: &str, organize: bool, download_dir: &str, store_capacity: usize) {
    eprintln!();
    eprintln!("{}", style("Configuration:").bold());
    eprintln!("  Quality:   {}", quality);
    eprintln!("  Folders:   {}", if organize { "per creator" } else { "flat" });
    eprintln!("  Directory: {}", download_dir);
    eprintln!("  Store:     {} entries", store_capacity);
    eprintln!();
}

/// Shows host notifications as console warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, message: &str) {
        print_warning(&format!("{}: {}", style(title).bold(), message));
    }
}
