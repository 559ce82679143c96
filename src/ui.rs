use crate::types::ReleaseDetails;
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};

/// The views an update moves through. Implementations only render; every
/// decision is made by the orchestrator.
pub trait UpdateView: Send {
    /// Persistent "update available" affordance.
    fn show_update_available(&mut self, label: &str);
    fn hide_update_available(&mut self);
    fn show_details(&mut self, details: &ReleaseDetails);
    fn show_downloading(&mut self);
    fn show_installing(&mut self);
    fn show_install_progress(&mut self, percent: u8);
    /// Completion view; the host dismisses it through the orchestrator.
    fn show_done(&mut self);
}

pub const UPDATE_ACTION_TEXT: &str = "Update Available";

/// Renders views on stderr.
pub struct TerminalView {
    term: Term,
    progress: Option<ProgressBar>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            progress: None,
        }
    }

    fn line(&self, text: &str) {
        if let Err(e) = self.term.write_line(text) {
            tracing::debug!("Could not write to terminal: {}", e);
        }
    }

    fn finish_progress(&mut self) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateView for TerminalView {
    fn show_update_available(&mut self, label: &str) {
        self.line(&format!(
            "{} {}",
            style(UPDATE_ACTION_TEXT).yellow().bold(),
            label
        ));
    }

    fn hide_update_available(&mut self) {}

    fn show_details(&mut self, details: &ReleaseDetails) {
        self.finish_progress();
        self.line("");
        self.line(&style(&details.title).bold().to_string());
        self.line(&style(&details.version_label).cyan().to_string());
        if !details.changelog.trim().is_empty() {
            self.line("");
            for changelog_line in details.changelog.lines() {
                self.line(&format!("  {}", changelog_line));
            }
        }
        self.line("");
    }

    fn show_downloading(&mut self) {
        self.line("Downloading update...");
    }

    fn show_installing(&mut self) {
        let pb = ProgressBar::new(100);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}%")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Installing");
        self.progress = Some(pb);
    }

    fn show_install_progress(&mut self, percent: u8) {
        if let Some(pb) = &self.progress {
            pb.set_position(u64::from(percent));
        }
    }

    fn show_done(&mut self) {
        self.finish_progress();
        self.line(&format!("{}", style("Update installed.").green().bold()));
    }
}

/// Renders nothing. For hosts that only need the check result.
pub struct HeadlessView;

impl UpdateView for HeadlessView {
    fn show_update_available(&mut self, _label: &str) {}
    fn hide_update_available(&mut self) {}
    fn show_details(&mut self, _details: &ReleaseDetails) {}
    fn show_downloading(&mut self) {}
    fn show_installing(&mut self) {}
    fn show_install_progress(&mut self, _percent: u8) {}
    fn show_done(&mut self) {}
}
