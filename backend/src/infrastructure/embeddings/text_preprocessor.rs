/// Text normalization applied before anything is sent to the embedding model
use regex::Regex;
use std::sync::OnceLock;

/// Flattens multi-line transcript text into a single line
#[derive(Debug)]
pub struct TextPreprocessor {
    line_break_regex: Regex,
}

impl TextPreprocessor {
    pub fn new() -> Self {
        TextPreprocessor {
            // \r\n, lone \r and lone \n all count as one break
            line_break_regex: Regex::new(r"\r\n|\r|\n").expect("line break pattern is valid"),
        }
    }

    /// Get a singleton instance (for efficiency in batch processing)
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<TextPreprocessor> = OnceLock::new();
        INSTANCE.get_or_init(TextPreprocessor::new)
    }

    /// Join the non-empty, trimmed lines of `text` with single spaces.
    ///
    /// An empty return value means there is nothing to embed.
    pub fn normalize(&self, text: &str) -> String {
        self.line_break_regex
            .split(text)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Shortened text for log lines
    pub fn preview(&self, text: &str, max_chars: usize) -> String {
        let normalized = self.normalize(text);
        if normalized.chars().count() <= max_chars {
            return normalized;
        }
        let mut short: String = normalized.chars().take(max_chars).collect();
        short.push_str("...");
        short
    }
}

impl Default for TextPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}
