//! Editorial content: lookbook gallery entries and storefront quotes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ImageUrl, LookbookEntryId, QuoteId, ValidationError, bounded_text, optional_text};

/// A lookbook gallery image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookbookEntry {
    pub id: LookbookEntryId,
    pub title: String,
    pub caption: Option<String>,
    pub image_url: ImageUrl,
    /// Display order, ascending.
    pub position: i32,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookbookDraft {
    pub title: String,
    pub caption: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidLookbookEntry {
    pub title: String,
    pub caption: Option<String>,
    pub image_url: ImageUrl,
    pub position: i32,
    pub published: bool,
}

impl LookbookDraft {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a blank or long title, a long caption
    /// or a bad image URL.
    pub fn validate(&self) -> Result<ValidLookbookEntry, ValidationError> {
        Ok(ValidLookbookEntry {
            title: bounded_text("title", &self.title, 1, 120)?,
            caption: optional_text("caption", self.caption.as_deref(), 1000)?,
            image_url: ImageUrl::parse(&self.image_url)
                .map_err(|e| ValidationError::new("image_url", e.to_string()))?,
            position: self.position,
            published: self.published,
        })
    }
}

/// A quote shown on the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub id: QuoteId,
    pub text: String,
    pub author: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuoteDraft {
    pub text: String,
    pub author: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidQuote {
    pub text: String,
    pub author: Option<String>,
    pub active: bool,
}

impl QuoteDraft {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for blank or long text, or a long author.
    pub fn validate(&self) -> Result<ValidQuote, ValidationError> {
        Ok(ValidQuote {
            text: bounded_text("text", &self.text, 1, 500)?,
            author: optional_text("author", self.author.as_deref(), 120)?,
            active: self.active,
        })
    }
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lookbook_draft() {
        let draft = LookbookDraft {
            title: " Spring Edit ".to_owned(),
            caption: Some(String::new()),
            image_url: "https://cdn.example.com/spring.jpg".to_owned(),
            ..LookbookDraft::default()
        };
        let valid = draft.validate().unwrap();
        assert_eq!(valid.title, "Spring Edit");
        assert_eq!(valid.caption, None);

        let bad = LookbookDraft {
            image_url: "ftp://cdn.example.com/a.jpg".to_owned(),
            ..draft
        };
        assert_eq!(bad.validate().unwrap_err().field, "image_url");
    }

    #[test]
    fn test_quote_draft() {
        let draft: QuoteDraft =
            serde_json::from_str(r#"{"text": "Elegance is refusal.", "author": "Coco Chanel"}"#)
                .unwrap();
        assert!(draft.active);
        assert!(draft.validate().is_ok());

        let long = QuoteDraft {
            text: "x".repeat(501),
            ..QuoteDraft::default()
        };
        assert_eq!(long.validate().unwrap_err().field, "text");
        assert_eq!(QuoteDraft::default().validate().unwrap_err().field, "text");
    }
}
