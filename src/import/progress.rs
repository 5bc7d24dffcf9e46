// src/import/progress.rs
// =============================================================================
// Progress events for long-running imports.
//
// A streamed import produces a sequence of ImportEvent values on a channel:
// any number of Progress events, then exactly one Complete or Error. The
// serialized form is the wire protocol, one JSON object per message:
//
//   {"type":"progress","progress":60,"text":"Saved SKILL.md (1/3)"}
//   {"type":"complete","result":{ ...skill... }}
//   {"type":"error","message":"GitHub API error (404): Not Found"}
//
// Rust concepts:
// - #[serde(tag = "type")]: Internally tagged enum, the variant name becomes
//   a "type" field next to the variant's own fields
// - mpsc::UnboundedSender: Sending never waits, so a slow reader can't stall
//   the import
// =============================================================================

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::skill::Skill;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEvent {
    Progress { progress: u8, text: String },
    Complete { result: Box<Skill> },
    Error { message: String },
}

impl ImportEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ImportEvent::Progress { .. })
    }
}

// Where an import reports its progress
//
// A silent reporter (one-shot import) only logs. Send errors are ignored:
// a consumer that went away does not stop the import.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ImportEvent>>,
}

impl ProgressReporter {
    pub fn silent() -> Self {
        Self { sender: None }
    }

    pub fn channel(sender: UnboundedSender<ImportEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn report(&self, progress: u8, text: impl Into<String>) {
        let text = text.into();
        debug!(progress, %text, "import progress");
        self.send(ImportEvent::Progress {
            progress: progress.min(100),
            text,
        });
    }

    pub fn complete(&self, skill: Skill) {
        self.send(ImportEvent::Complete {
            result: Box::new(skill),
        });
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.send(ImportEvent::Error {
            message: message.into(),
        });
    }

    fn send(&self, event: ImportEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}

// Percentage for the i-th (0-based) of `total` stored files: 60 up to 80
pub fn file_progress(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 80;
    }
    let share = 20 * (index + 1).min(total) / total;
    (60 + share) as u8
}
