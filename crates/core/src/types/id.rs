//! Newtype IDs for type-safe entity references.
//!
//! The marketplace backend hands out string identifiers (UUIDs for current
//! records, bare numbers for some legacy ones). Use the `define_id!` macro to
//! create wrappers that prevent mixing IDs from different entity types.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` with `#[serde(transparent)]`, and a `Deserialize` that also
///   accepts bare JSON numbers (legacy records)
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `is_uuid()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use ayts_core::define_id;
/// define_id!(ShelfId);
/// define_id!(AisleId);
///
/// let shelf = ShelfId::new("s-1");
/// let aisle = AisleId::new("s-1");
///
/// // These are different types, so this won't compile:
/// // let _: ShelfId = aisle;
/// # let _ = (shelf, aisle);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the ID is a UUID (as opposed to a legacy numeric ID).
            #[must_use]
            pub fn is_uuid(&self) -> bool {
                ::uuid::Uuid::parse_str(&self.0).is_ok()
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                $crate::types::id::string_or_number(deserializer).map(Self)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Deserialize a JSON string or integer into its string form.
///
/// # Errors
///
/// Returns the deserializer's error for any other JSON type.
#[doc(hidden)]
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match <Raw as serde::Deserialize>::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Signed(n) => n.to_string(),
        Raw::Unsigned(n) => n.to_string(),
    })
}

define_id!(LocationId);
define_id!(CategoryId);
define_id!(StoreId);
define_id!(ProductId);
define_id!(OrderId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_detection() {
        assert!(LocationId::new("0b9f6a52-3c1e-4d8a-9f6e-2a7b1c4d5e6f").is_uuid());
        assert!(!LocationId::new("42").is_uuid());
        assert!(!LocationId::new("").is_uuid());
    }

    #[test]
    fn test_transparent_serde() {
        let id = StoreId::new("s1");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"s1\""));
        let parsed: Result<ProductId, _> = serde_json::from_str("\"p1\"");
        assert_eq!(parsed.ok(), Some(ProductId::new("p1")));
    }

    #[test]
    fn test_numeric_ids_are_accepted() {
        let parsed: Result<LocationId, _> = serde_json::from_str("42");
        assert_eq!(parsed.ok(), Some(LocationId::new("42")));
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderId::new("ord-7").to_string(), "ord-7");
    }
}
