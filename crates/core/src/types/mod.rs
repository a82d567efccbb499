//! Value types for Atelier.
//!
//! Newtypes that are valid by construction: once a handler holds an `Email`,
//! `Price` or `ImageUrl`, nothing downstream re-checks it.

pub mod email;
pub mod id;
pub mod image_url;
pub mod price;
pub mod slug;
pub mod status;
pub mod validation;

pub use email::{Email, EmailError};
pub use id::*;
pub use image_url::{ImageUrl, ImageUrlError};
pub use price::{Price, PriceError};
pub use slug::{Slug, SlugError};
pub use status::{AdminRole, OrderStatus, TransitionError};
pub use validation::{ValidationError, bounded_text, optional_text};
