use std::sync::Arc;

use {axum::http::StatusCode, tracing::warn};

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests. Please try again later.";

/// Receives user-facing notifications raised by the engine.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// Emits notifications as `warn` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        warn!(notification = message, "User notification");
    }
}

/// Hooks applied to the engine's outbound requests.
#[derive(Clone)]
pub struct FetchOptions {
    notifier: Arc<dyn Notifier>,
}

impl FetchOptions {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Only a 429 is surfaced to the user; every other status is left to the caller.
    pub fn on_error(&self, status: StatusCode) {
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.notifier.error(RATE_LIMIT_MESSAGE);
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::new(Arc::new(TracingNotifier))
    }
}

impl std::fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOptions").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub messages: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn error(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn rate_limit_notifies_once() {
        let notifier = Arc::new(RecordingNotifier::default());
        let options = FetchOptions::new(notifier.clone());

        options.on_error(StatusCode::TOO_MANY_REQUESTS);

        assert_eq!(
            *notifier.messages.lock().unwrap(),
            vec![RATE_LIMIT_MESSAGE.to_string()]
        );
    }

    #[test]
    fn other_errors_are_silent() {
        let notifier = Arc::new(RecordingNotifier::default());
        let options = FetchOptions::new(notifier.clone());

        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
        ] {
            options.on_error(status);
        }

        assert!(notifier.messages.lock().unwrap().is_empty());
    }
}
