//! Display-facing ticket label generation.
//!
//! Labels come from a monotonically increasing counter held by the queue
//! cursor. The counter is independent of ticket deletion: removing tickets
//! never causes a label to be handed out twice within a sequence run.

use crate::config::QueueConfig;
use crate::store::QueueCursor;

/// Generates ticket labels like "T007" from the cursor's sequence counter.
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    prefix: String,
    width: usize,
}

impl SequenceGenerator {
    /// Create a generator from validated queue settings.
    #[must_use]
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            prefix: config.label_prefix.clone(),
            width: config.label_width,
        }
    }

    /// Advance the cursor's sequence counter and return the next label.
    #[must_use]
    pub fn next_label(&self, cursor: &mut QueueCursor) -> String {
        cursor.last_sequence_value += 1;
        self.format(cursor.last_sequence_value)
    }

    /// Restart labels at 1. Existing tickets keep the labels they have.
    pub fn reset(&self, cursor: &mut QueueCursor) {
        cursor.last_sequence_value = 0;
    }

    /// Format a raw sequence value as a label.
    #[must_use]
    pub fn format(&self, value: u64) -> String {
        format!("{}{:0width$}", self.prefix, value, width = self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;

    fn generator() -> SequenceGenerator {
        SequenceGenerator::new(&QueueConfig::default())
    }

    #[test]
    fn test_labels_are_sequential_and_padded() {
        let gen = generator();
        let mut cursor = QueueCursor::default();

        assert_eq!(gen.next_label(&mut cursor), "T001");
        assert_eq!(gen.next_label(&mut cursor), "T002");
        assert_eq!(cursor.last_sequence_value, 2);
    }

    #[test]
    fn test_width_overflow_grows_label() {
        let gen = generator();
        let mut cursor = QueueCursor {
            last_sequence_value: 999,
            ..QueueCursor::default()
        };
        assert_eq!(gen.next_label(&mut cursor), "T1000");
    }

    #[test]
    fn test_reset_restarts_at_one() {
        let gen = generator();
        let mut cursor = QueueCursor::default();
        let _ = gen.next_label(&mut cursor);
        let _ = gen.next_label(&mut cursor);

        gen.reset(&mut cursor);
        assert_eq!(cursor.last_sequence_value, 0);
        assert_eq!(gen.next_label(&mut cursor), "T001");
    }

    #[test]
    fn test_custom_prefix_and_width() {
        let config = QueueConfig {
            label_prefix: "QA".to_string(),
            label_width: 4,
            ..QueueConfig::default()
        };
        let gen = SequenceGenerator::new(&config);
        let mut cursor = QueueCursor::default();
        assert_eq!(gen.next_label(&mut cursor), "QA0001");
    }
}
