//! Notices shown next to the control panel.
//!
//! Two kinds exist.  The autoplay affordance is actionable: activating it
//! asks the coordinator to resume.  Every other failure is a transient,
//! dismissible notice that expires on its own.

use crate::message::{ErrorCategory, Message};

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Playback is waiting for a user gesture.
    Autoplay,
    Failure {
        title: String,
        message: String,
        expires_at_ms: i64,
    },
}

/// Holds at most one notice.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    current: Option<Notice>,
    ttl_ms: i64,
}

impl NoticeBoard {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            current: None,
            ttl_ms: ttl_ms as i64,
        }
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref()
    }

    pub fn post_autoplay(&mut self) -> &Notice {
        self.current.insert(Notice::Autoplay)
    }

    pub fn post_failure(&mut self, category: ErrorCategory, message: &str, now_ms: i64) -> &Notice {
        self.current.insert(Notice::Failure {
            title: category.title().to_string(),
            message: message.to_string(),
            expires_at_ms: now_ms + self.ttl_ms,
        })
    }

    /// User clicked the notice.  The autoplay affordance yields the intent
    /// to send; a failure notice is simply dismissed.
    pub fn activate(&mut self) -> Option<Message> {
        match self.current.take()? {
            Notice::Autoplay => Some(Message::ControlResume),
            Notice::Failure { .. } => None,
        }
    }

    /// Remove whatever is shown.  Returns whether anything was removed.
    pub fn dismiss(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// Remove the autoplay affordance once playback is running.
    pub fn clear_autoplay(&mut self) -> bool {
        if self.current == Some(Notice::Autoplay) {
            self.current = None;
            return true;
        }
        false
    }

    /// Drop an expired failure notice.  Returns whether it was removed.
    pub fn expire(&mut self, now_ms: i64) -> bool {
        match &self.current {
            Some(Notice::Failure { expires_at_ms, .. }) if now_ms >= *expires_at_ms => {
                self.current = None;
                true
            }
            _ => false,
        }
    }
}
