use std::time::Duration;

use chrono::Local;

use crate::{autosave::SaveStatus, draft::DraftToken};

const BAR_WIDTH: usize = 10;

/// Renders [`SaveStatus`] as a single console line.
#[derive(Debug, Default)]
pub struct StatusBar {
    shown: Option<Shown>,
}

/// What the line shows, minus the progress bar which moves too often to
/// reprint on.
#[derive(Debug, Clone, PartialEq)]
struct Shown {
    seconds_left: Option<u64>,
    is_saving: bool,
    enabled: bool,
    last_saved_at: Option<chrono::DateTime<chrono::Utc>>,
    token: Option<DraftToken>,
}

impl From<&SaveStatus> for Shown {
    fn from(status: &SaveStatus) -> Self {
        Self {
            seconds_left: status
                .autosave_pending
                .then(|| seconds_left(status.ms_until_next_attempt)),
            is_saving: status.is_saving,
            enabled: status.enabled,
            last_saved_at: status.last_saved_at,
            token: status.identity.token().cloned(),
        }
    }
}

impl StatusBar {
    /// Returns the line to print if anything but the progress moved.
    pub fn update(&mut self, status: &SaveStatus) -> Option<String> {
        let shown = Shown::from(status);
        if self.shown.as_ref() == Some(&shown) {
            return None;
        }
        self.shown = Some(shown);
        Some(Self::render(status))
    }

    pub fn render(status: &SaveStatus) -> String {
        let state = if status.is_saving {
            "saving...".to_owned()
        } else if status.autosave_pending {
            let countdown = Duration::from_secs(seconds_left(status.ms_until_next_attempt));
            format!(
                "{} autosave in {}",
                progress_bar(status.progress),
                humantime::format_duration(countdown)
            )
        } else if !status.enabled {
            "autosave off".to_owned()
        } else {
            "up to date".to_owned()
        };

        let mut parts = vec![state];
        if let Some(at) = status.last_saved_at {
            parts.push(format!("saved {}", at.with_timezone(&Local).format("%H:%M:%S")));
        }
        parts.push(match status.identity.token() {
            Some(token) => token.to_string(),
            None => "new draft".to_owned(),
        });
        parts.join(" | ")
    }
}

fn seconds_left(ms: u64) -> u64 {
    ms.div_ceil(1000)
}

fn progress_bar(progress: f64) -> String {
    let filled = (progress.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}
