//! Typed row identifiers.
//!
//! Every table keys its rows with a `SERIAL` integer. Wrapping each one in
//! its own type keeps a `ReceiptId` from being passed where a `UserId` is
//! expected, which matters because every receipt query filters on both.

/// Define an `i32`-backed row identifier.
///
/// The generated type is `Copy`, ordered, serializes as a bare number,
/// parses from a decimal string (so it works directly in `axum::extract::Path`)
/// and, with the `postgres` feature, binds and decodes as `INTEGER`.
///
/// ```rust
/// # use receipts_core::define_id;
/// define_id!(
///     /// Identifies a print template.
///     TemplateId
/// );
///
/// let id: TemplateId = "12".parse().unwrap();
/// assert_eq!(id.as_i32(), 12);
/// ```
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
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

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::core::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(
    /// Primary key of `users`.
    UserId
);
define_id!(
    /// Primary key of `receipts`.
    ReceiptId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parses_from_path_segment() {
        let id: ReceiptId = "42".parse().unwrap();
        assert_eq!(id, ReceiptId::new(42));
        assert!("forty-two".parse::<ReceiptId>().is_err());
    }

    #[test]
    fn test_id_display_matches_number() {
        assert_eq!(UserId::new(7).to_string(), "7");
        assert_eq!(format!("{:>3}", UserId::new(7)), "  7");
    }

    #[test]
    fn test_id_ordering() {
        let mut ids = vec![ReceiptId::new(3), ReceiptId::new(1), ReceiptId::new(2)];
        ids.sort_unstable();
        assert_eq!(ids, [ReceiptId::new(1), ReceiptId::new(2), ReceiptId::new(3)]);
    }

    #[test]
    fn test_id_serializes_as_number() {
        assert_eq!(serde_json::to_string(&UserId::new(3)).unwrap(), "3");
        let id: UserId = serde_json::from_str("3").unwrap();
        assert_eq!(i32::from(id), 3);
    }
}
