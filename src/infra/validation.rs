//! Utilities for validating constraints on types.

use serde::Deserialize;
use validator::{Validate, ValidationErrors};

/// A type that cannot be instatiated without validating the value within.
/// That is, if you have a [`Valid<T>`], `T` is guaranteed to be valid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Valid<T> {
    value: T,
}

impl<T> Valid<T> {
    /// Constructs a new validated value.
    pub fn new(value: T) -> Result<Valid<T>, ValidationErrors>
    where
        T: Validate,
    {
        value.validate().map(|_| Valid { value })
    }

    /// Returns a reference to the validated value.
    pub fn inner(&self) -> &T {
        &self.value
    }

    /// Returns the validated value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> AsRef<T> for Valid<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<'de, T: Deserialize<'de> + Validate> Deserialize<'de> for Valid<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value: T = T::deserialize(deserializer)?;
        Valid::new(value).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Valid;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Debug, Validate, Deserialize)]
    struct Listing {
        #[validate(length(min = 1))]
        title: String,
        #[validate(range(min = 0))]
        price: i64,
        #[validate(range(min = 1, max = 5))]
        rating: i16,
    }

    #[test]
    pub fn valid_value_succeeds() {
        let data = r#"{ "title": "Desk lamp", "price": 0, "rating": 5 }"#;
        let value = serde_json::from_str::<Valid<Listing>>(data);
        assert!(value.is_ok());
    }

    #[test]
    pub fn invalid_value_fails() {
        let data = r#"{ "title": "", "price": -1, "rating": 6 }"#;
        let value = serde_json::from_str::<Valid<Listing>>(data);
        assert!(value.is_err());
    }

    #[test]
    pub fn into_inner_returns_the_value() {
        let listing = Listing {
            title: "Chair".to_string(),
            price: 5000,
            rating: 3,
        };
        let valid = Valid::new(listing).unwrap();
        assert_eq!("Chair", valid.inner().title);
        assert_eq!(5000, valid.into_inner().price);
    }
}
