//! Transient success and error messages, one board per concern.

use std::sync::Mutex;
use std::time::Duration;

use telephony_core::{ApiError, Outcome};
use tokio::time::Instant;

/// How long a notice stays visible by default.
pub const DEFAULT_NOTICE_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    posted_at: Instant,
}

impl Notice {
    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

/// Holds the latest notice for one concern. A notice disappears once the
/// display window has passed; posting a new one replaces the old.
#[derive(Debug)]
pub struct NoticeBoard {
    window: Duration,
    current: Mutex<Option<Notice>>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_WINDOW)
    }
}

impl NoticeBoard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            current: Mutex::new(None),
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.post(NoticeKind::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.post(NoticeKind::Error, message.into());
    }

    /// Post the display message of a failed operation.
    pub fn failure(&self, err: &ApiError) {
        self.error(err.user_message());
    }

    /// Post a boundary outcome.
    pub fn outcome(&self, outcome: &Outcome) {
        let message = outcome.message.clone().unwrap_or_default();
        if outcome.success {
            self.success(message);
        } else {
            self.error(message);
        }
    }

    /// The visible notice, if it has not expired.
    pub fn current(&self) -> Option<Notice> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if current
            .as_ref()
            .is_some_and(|n| n.posted_at.elapsed() >= self.window)
        {
            *current = None;
        }
        current.clone()
    }

    pub fn clear(&self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn post(&self, kind: NoticeKind, message: String) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(Notice {
            kind,
            message,
            posted_at: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_notice_expires_after_window() {
        let board = NoticeBoard::default();
        board.success("Trunk created successfully");
        assert_eq!(
            board.current().map(|n| n.message),
            Some("Trunk created successfully".to_string())
        );

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(board.current().is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(board.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_notice_replaces_and_restarts_window() {
        let board = NoticeBoard::new(Duration::from_secs(5));
        board.success("first");
        tokio::time::advance(Duration::from_secs(3)).await;
        board.failure(&ApiError::Network("timeout".to_string()));
        tokio::time::advance(Duration::from_secs(3)).await;

        let notice = board.current().unwrap();
        assert!(notice.is_error());
        assert_eq!(notice.message, "Network error: timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_posting() {
        let board = NoticeBoard::default();
        board.outcome(&Outcome::ok("done"));
        assert_eq!(board.current().unwrap().kind, NoticeKind::Success);
        board.clear();
        assert!(board.current().is_none());
    }
}
