//! Newtype keys for type-safe record references.
//!
//! Record keys are opaque strings assigned by the record store on creation
//! (or, for user profiles, by the identity provider). Use the `define_key!`
//! macro to create wrappers that prevent mixing keys from different
//! collections.

/// Macro to define a type-safe record key wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `Display`, `AsRef<str>`, and `From<String>`/`From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use lifestream_core::define_key;
/// define_key!(DonorKey);
/// define_key!(BankKey);
///
/// let donor = DonorKey::new("-Nx1");
/// let bank = BankKey::new("-Nx1");
///
/// // These are different types, so this won't compile:
/// // let _: DonorKey = bank;
/// assert_eq!(donor.as_str(), bank.as_str());
/// ```
#[macro_export]
macro_rules! define_key {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new key from a string value.
            #[must_use]
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Get the underlying key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the key and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.0
            }
        }
    };
}

// Keys for the store-keyed collections
define_key!(DonorKey);
define_key!(RequestKey);
define_key!(BankKey);

// Identity key assigned by the identity provider; also the `users/{uid}` key
define_key!(UserId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display_and_as_str() {
        let key = DonorKey::new("abc-123");
        assert_eq!(key.as_str(), "abc-123");
        assert_eq!(key.to_string(), "abc-123");
    }

    #[test]
    fn test_key_serializes_transparently() {
        let key = RequestKey::from("r1");
        assert_eq!(serde_json::to_string(&key).ok().as_deref(), Some("\"r1\""));
    }
}
