//! Terminal rendering of orchestrator [`Event`]s: one colored line per
//! event, written to stdout as it arrives. `gotya` runs its operations
//! sequentially (no parallel installation), so there's no concurrent
//! progress to reconcile into a single frame.

use crossterm::style::Stylize;
use gotya_core::reporter::{Event, EventSink};

/// Prints each event to stdout, colored by kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalReporter;

impl EventSink for TerminalReporter {
    fn emit(&self, event: Event) {
        let step = event.step().map(|s| format!("{s} ").bold().to_string()).unwrap_or_default();
        let message = event.message();
        match &event {
            Event::Planning { .. } => println!("{} {step}{message}", "==>".blue().bold()),
            Event::Resolving { .. } => println!("{} {step}{message}", " -".dim()),
            Event::Downloading { .. } => println!("{} {step}{message}", "download".cyan()),
            Event::Installing { .. } => println!("{} {step}{message}", "install".green()),
            Event::Updating { .. } => println!("{} {step}{message}", "update".green()),
            Event::Uninstalling { .. } => println!("{} {step}{message}", "remove".yellow()),
            Event::Skipping { .. } => println!("{} {step}{message}", "skip".dim()),
            Event::Cleanup { .. } => println!("{} {message}", "cleanup".cyan()),
            Event::Error { .. } => eprintln!("{} {step}{message}", "error".red().bold()),
            Event::Done { .. } => println!("{} {message}", "done".green().bold()),
        }
    }
}
