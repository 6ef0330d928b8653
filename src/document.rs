/// Plain text loaded into the prompter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    text: String,
    word_count: usize,
    line_count: usize,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let word_count = count_words(&text);
        let line_count = text.lines().count();
        Self {
            text,
            word_count,
            line_count,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Hard line breaks in the source; the display wraps further
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }
}

/// Words are runs of non-whitespace
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_across_any_whitespace() {
        assert_eq!(count_words("one two\tthree\n\nfour  "), 4);
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words(" \n\t "), 0);
    }

    #[test]
    fn document_caches_counts() {
        let doc = Document::new("Good evening.\nWelcome to the news.\n");
        assert_eq!(doc.word_count(), 6);
        assert_eq!(doc.line_count(), 2);
        assert!(!doc.is_empty());
    }

    #[test]
    fn whitespace_only_document_is_empty() {
        let doc = Document::new("   \n  ");
        assert!(doc.is_empty());
        assert_eq!(doc.word_count(), 0);
    }
}
