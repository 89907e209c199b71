/// Output Boundaries
///
/// Captured output and diagnostics are bounded per field before they leave
/// the engine. Truncation always lands on a UTF-8 character boundary.
use crate::config::types::OutputIntegrity;

pub const TRUNCATION_MARKER: &str = "\n... [output truncated]";

/// Output limits configuration
#[derive(Debug, Clone, Copy)]
pub struct OutputLimits {
    /// Per-field limit (bytes, marker excluded)
    pub field_limit: usize,
}

impl Default for OutputLimits {
    fn default() -> Self {
        OutputLimits {
            field_limit: 64 * 1024,
        }
    }
}

impl OutputLimits {
    pub fn new(field_limit: usize) -> Self {
        OutputLimits { field_limit }
    }

    /// Keep the head of `text`, appending a marker when anything was dropped
    pub fn clamp(&self, text: &str) -> (String, OutputIntegrity) {
        if text.len() <= self.field_limit {
            return (text.to_string(), OutputIntegrity::Complete);
        }
        let cut = floor_char_boundary(text, self.field_limit);
        let mut bounded = String::with_capacity(cut + TRUNCATION_MARKER.len());
        bounded.push_str(&text[..cut]);
        bounded.push_str(TRUNCATION_MARKER);
        (bounded, OutputIntegrity::TruncatedByJudgeLimit)
    }

    /// Clamp and drop the integrity flag
    pub fn bound(&self, text: &str) -> String {
        self.clamp(text).0
    }

    /// Keep the tail of `text`; crash diagnostics live at the end of stderr
    pub fn tail(&self, text: &str) -> String {
        if text.len() <= self.field_limit {
            return text.to_string();
        }
        let mut start = text.len() - self.field_limit;
        while !text.is_char_boundary(start) {
            start += 1;
        }
        format!("[output truncated] ...\n{}", &text[start..])
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut cut = index.min(text.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}

/// Decode collected bytes, replacing invalid UTF-8
pub fn lossy_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        let limits = OutputLimits::new(16);
        assert_eq!(
            limits.clamp("hello"),
            ("hello".to_string(), OutputIntegrity::Complete)
        );
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        let limits = OutputLimits::new(4);
        // 'é' is two bytes; byte 4 falls inside the second 'é'
        let (bounded, integrity) = limits.clamp("aéé");
        assert_eq!(integrity, OutputIntegrity::TruncatedByJudgeLimit);
        assert_eq!(bounded, format!("aé{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_tail_keeps_end() {
        let limits = OutputLimits::new(5);
        let tail = limits.tail("Traceback ... ValueError");
        assert!(tail.ends_with("Error"));
        assert!(tail.starts_with("[output truncated]"));
    }

    #[test]
    fn test_lossy_text() {
        assert_eq!(lossy_text(b"ok\xff"), "ok\u{fffd}");
    }
}
