//! Record ids and Shopify global ids.
//!
//! `define_id!` wraps the `i32` keys of our own tables, `define_gid!` the
//! `gid://shopify/<Resource>/<n>` strings Shopify hands out. A collection
//! gid is a different type from a product gid even though both are strings.

use serde::{Deserialize, Serialize};

/// Implements the sqlx Postgres traits for a newtype by delegating to its
/// column type. `$decode` turns the decoded column value into `Self`.
#[doc(hidden)]
#[macro_export]
macro_rules! __pg_column {
    ($name:ident, $column:ty, |$raw:ident| $decode:expr) => {
        #[cfg(feature = "postgres")]
        const _: () = {
            use ::sqlx::Postgres as Pg;
            use ::sqlx::error::BoxDynError;
            use ::sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};

            impl ::sqlx::Type<Pg> for $name {
                fn type_info() -> PgTypeInfo {
                    <$column as ::sqlx::Type<Pg>>::type_info()
                }

                fn compatible(ty: &PgTypeInfo) -> bool {
                    <$column as ::sqlx::Type<Pg>>::compatible(ty)
                }
            }

            impl<'r> ::sqlx::Decode<'r, Pg> for $name {
                fn decode(column: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                    let $raw = <$column as ::sqlx::Decode<Pg>>::decode(column)?;
                    Ok($decode)
                }
            }

            impl ::sqlx::Encode<'_, Pg> for $name {
                fn encode_by_ref(
                    &self,
                    buf: &mut PgArgumentBuffer,
                ) -> Result<::sqlx::encode::IsNull, BoxDynError> {
                    <$column as ::sqlx::Encode<Pg>>::encode_by_ref(&self.0, buf)
                }
            }
        };
    };
}

/// Declares a serial primary key of one of our tables.
///
/// ```rust
/// # use commission_manager_core::define_id;
/// define_id!(RecordId);
///
/// let id = RecordId::new(7);
/// assert_eq!(id.as_i32(), 7);
/// assert_eq!(i32::from(id), 7);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i32> for $name {
            fn from(raw: i32) -> Self {
                Self::new(raw)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.as_i32()
            }
        }

        $crate::__pg_column!($name, i32, |raw| Self(raw));
    };
}

/// Declares a Shopify global id (`gid://shopify/<Resource>/<n>`).
///
/// Values are always held in full gid form; `parse` also accepts a bare
/// numeric id and expands it.
///
/// ```rust
/// # use commission_manager_core::ProductGid;
/// let a = ProductGid::parse("123").unwrap();
/// let b = ProductGid::parse("gid://shopify/Product/123").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.numeric_id(), "123");
/// ```
#[macro_export]
macro_rules! define_gid {
    ($name:ident, $resource:literal) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Resource segment of the gid path.
            pub const RESOURCE: &'static str = $resource;

            /// Parse from a full gid or a bare numeric id.
            ///
            /// # Errors
            ///
            /// Returns [`GidError`] if the value is empty, names another
            /// resource, or has no id segment.
            pub fn parse(input: &str) -> ::core::result::Result<Self, $crate::types::id::GidError> {
                use $crate::types::id::GidError;

                let input = input.trim();
                if input.is_empty() {
                    return Err(GidError::Empty);
                }
                if input.bytes().all(|b| b.is_ascii_digit()) {
                    return Ok(Self(format!("gid://shopify/{}/{input}", Self::RESOURCE)));
                }
                match input.strip_prefix(concat!("gid://shopify/", $resource, "/")) {
                    None => Err(GidError::WrongResource {
                        expected: Self::RESOURCE,
                        value: input.to_owned(),
                    }),
                    Some("") => Err(GidError::MissingId),
                    Some(_) => Ok(Self(input.to_owned())),
                }
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Trailing id segment, e.g. `123` for `gid://shopify/Product/123`.
            #[must_use]
            pub fn numeric_id(&self) -> &str {
                self.0.rsplit('/').next().unwrap_or(&self.0)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::types::id::GidError;

            fn try_from(raw: String) -> ::core::result::Result<Self, Self::Error> {
                Self::parse(&raw)
            }
        }

        impl From<$name> for String {
            fn from(gid: $name) -> Self {
                gid.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        $crate::__pg_column!($name, String, |raw| Self::parse(&raw)?);
    };
}

/// Errors that can occur when parsing a Shopify gid.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GidError {
    /// The input string is empty.
    #[error("id cannot be empty")]
    Empty,
    /// The gid refers to another resource type.
    #[error("expected a {expected} id, got {value}")]
    WrongResource {
        /// Expected resource type.
        expected: &'static str,
        /// The rejected input.
        value: String,
    },
    /// The gid has no trailing id segment.
    #[error("id segment is missing")]
    MissingId,
}

define_id!(CommissionId);
define_id!(CollectionCommissionId);

define_gid!(ProductGid, "Product");
define_gid!(CollectionGid, "Collection");

/// Marker kept for serde round trips in API payloads that carry a raw id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    /// Numeric database id.
    Number(i64),
    /// String id (gid or numeric string).
    Text(String),
}

impl RawId {
    /// The id as text, for gid parsing.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}
