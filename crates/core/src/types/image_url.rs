//! Absolute image URL.
//!
//! Images live on an external CDN; the catalog only stores where they are.

use core::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Errors that can occur when parsing an [`ImageUrl`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageUrlError {
    /// Not a parseable absolute URL.
    #[error("image URL is not a valid absolute URL")]
    Invalid,
    /// Scheme other than http or https.
    #[error("image URL must use http or https")]
    Scheme,
    /// URL longer than [`ImageUrl::MAX_LENGTH`].
    #[error("image URL must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// An absolute `http`/`https` URL pointing at an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageUrl(String);

impl ImageUrl {
    /// Maximum accepted URL length.
    pub const MAX_LENGTH: usize = 2048;

    /// Parse an image URL.
    ///
    /// # Errors
    ///
    /// Returns an [`ImageUrlError`] if the URL is malformed, too long, or not
    /// served over http(s).
    pub fn parse(s: &str) -> Result<Self, ImageUrlError> {
        let s = s.trim();
        if s.len() > Self::MAX_LENGTH {
            return Err(ImageUrlError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        let url = Url::parse(s).map_err(|_| ImageUrlError::Invalid)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ImageUrlError::Scheme);
        }
        if url.host_str().is_none() {
            return Err(ImageUrlError::Invalid);
        }
        Ok(Self(url.into()))
    }

    /// The URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ImageUrl {
    type Error = ImageUrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ImageUrl> for String {
    fn from(url: ImageUrl) -> Self {
        url.0
    }
}
