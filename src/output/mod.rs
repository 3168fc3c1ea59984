//! Output module for console output and progress.
//!
//! Provides:
//! - Colored console output and notifications
//! - Progress bars
//! - Statistics reporting

pub mod console;
pub mod progress;
pub mod stats;

pub use self::console::{
    print_banner, print_config_summary, print_error, print_info, print_success, print_warning,
    ConsoleNotifier,
};
pub use progress::{create_download_bar, create_spinner};
pub use stats::{print_queue_stats, summary_line};
