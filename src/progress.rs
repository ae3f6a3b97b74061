/// Observer interface for coarse pipeline progress.
///
/// Purely observational: sinks receive human-readable stage messages and must
/// not influence control flow. Components take an `Option<&dyn ProgressSink>`
/// so callers that don't care simply pass `None`.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, message: &str);
}

/// Progress sink that forwards messages to the `log` facade at info level.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn notify(&self, message: &str) {
        log::info!("{}", message);
    }
}

/// Notify an optional sink without cluttering call sites
pub fn report(progress: Option<&dyn ProgressSink>, message: &str) {
    if let Some(sink) = progress {
        sink.notify(message);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ProgressSink;
    use std::sync::Mutex;

    /// Records every message for later assertions
    #[derive(Default)]
    pub struct RecordingProgress {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingProgress {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl ProgressSink for RecordingProgress {
        fn notify(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingProgress;
    use super::*;

    #[test]
    fn test_report_with_none_is_noop() {
        report(None, "ignored");
    }

    #[test]
    fn test_report_records_messages_in_order() {
        let sink = RecordingProgress::new();
        report(Some(&sink), "first");
        report(Some(&sink), "second");
        assert_eq!(sink.messages(), vec!["first", "second"]);
    }
}
