use std::borrow::Borrow;
use std::fmt;

use crate::error::CatfreqError;

/// Namespace prefix of category pages.
pub const CATEGORY_PREFIX: &str = "Category:";

/// A category e.g. `American silversmiths`
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Category {
    /// The name as supplied by the user.
    name: String,
    /// Filesystem safe identifier used for cache entries.
    key: String,
}

impl Category {
    /// Accepts a user supplied category name.
    ///
    /// Surrounding whitespace is trimmed, an empty name is rejected.
    ///
    /// # Example
    ///
    /// ```rust
    ///  use catfreq::Category;
    ///  let category = Category::new("Category:American silversmiths").unwrap();
    ///  assert_eq!(category.key(), "Category_American_silversmiths");
    ///  assert_eq!(category.api_title(), "Category:American silversmiths");
    /// ```
    pub fn new<T: AsRef<str>>(name: T) -> Result<Self, CatfreqError> {
        let name = name.as_ref().trim();
        if name.is_empty() || name == CATEGORY_PREFIX {
            return Err(CatfreqError::InvalidCategory(name.to_string()));
        }
        Ok(Self {
            key: Category::normalize_key(name),
            name: name.to_string(),
        })
    }

    /// Replaces `:` and spaces with `_`.
    pub fn normalize_key(name: &str) -> String {
        name.replace(|c: char| c == ':' || c == ' ', "_")
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The title of the category page, as expected by the listing api.
    pub fn api_title(&self) -> String {
        if self.name.starts_with(CATEGORY_PREFIX) {
            self.name.clone()
        } else {
            format!("{}{}", CATEGORY_PREFIX, self.name)
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Borrow<str> for Category {
    fn borrow(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_key() {
        let category = Category::new("American silversmiths").unwrap();
        assert_eq!(category.key(), "American_silversmiths");
        assert_eq!(category.api_title(), "Category:American silversmiths");

        let category = Category::new("  Category:Jazz  ").unwrap();
        assert_eq!(category.name(), "Category:Jazz");
        assert_eq!(category.key(), "Category_Jazz");
        assert_eq!(category.api_title(), "Category:Jazz");
    }

    #[test]
    fn reject_empty() {
        assert!(Category::new("   ").is_err());
        assert!(Category::new("Category:").is_err());
    }
}
