use libris_core::Book;

/// Prompt for a book insight.
///
/// Built from the book's current data at generation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightPrompt {
    title: String,
    author: Option<String>,
    description: Option<String>,
    words: u32,
}

impl InsightPrompt {
    pub fn for_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            description: book.description.clone(),
            words: 300,
        }
    }

    pub fn with_words(mut self, words: u32) -> Self {
        self.words = words;
        self
    }

    pub fn render(&self) -> String {
        let author = self.author.as_deref().unwrap_or("an unknown author");
        let description = self.description.as_deref().unwrap_or("not available");
        format!(
            "Provide a {}-word insight for the book '{}' by {}. The book's description is: '{}'. \
             Focus on the main themes and significance.",
            self.words, self.title, author, description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_core::{BookId, ExternalId};

    fn book(author: Option<&str>, description: Option<&str>) -> Book {
        Book {
            id: BookId::new(),
            external_id: ExternalId::new("dune"),
            title: "Dune".to_string(),
            author: author.map(str::to_string),
            language: None,
            description: description.map(str::to_string),
            cover_ref: None,
            content: String::new(),
        }
    }

    #[test]
    fn renders_title_author_and_description() {
        let prompt = InsightPrompt::for_book(&book(Some("Frank Herbert"), Some("Desert planet.")));
        assert_eq!(
            prompt.render(),
            "Provide a 300-word insight for the book 'Dune' by Frank Herbert. \
             The book's description is: 'Desert planet.'. Focus on the main themes and significance."
        );
    }

    #[test]
    fn missing_fields_render_placeholders() {
        let rendered = InsightPrompt::for_book(&book(None, None)).with_words(120).render();
        assert!(rendered.starts_with("Provide a 120-word insight"));
        assert!(rendered.contains("by an unknown author."));
        assert!(rendered.contains("is: 'not available'"));
    }
}
