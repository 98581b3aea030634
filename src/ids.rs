//! Typed Ids

use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    hash::{Hash, Hasher},
    marker::PhantomData,
    num::ParseIntError,
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Storefront identifier tagged with the kind of record it points at.
///
/// The storefront hands out plain integers for menu items and restaurants;
/// the marker keeps the two id spaces apart at compile time.
pub struct TypedId<T>(u64, PhantomData<fn() -> T>);

impl<T> TypedId<T> {
    /// Wrap a raw storefront id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id, PhantomData)
    }

    /// The raw storefront id, as used in URL paths.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl<T> Clone for TypedId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedId<T> {}

impl<T> Debug for TypedId<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Debug::fmt(&self.0, f)
    }
}

impl<T> Display for TypedId<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

impl<T> PartialEq for TypedId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for TypedId<T> {}

impl<T> Hash for TypedId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> PartialOrd for TypedId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for TypedId<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> From<u64> for TypedId<T> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<T> FromStr for TypedId<T> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self::new)
    }
}

impl<T> Serialize for TypedId<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de, T> Deserialize<'de> for TypedId<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[derive(Debug)]
    enum Marker {}

    #[test]
    fn parses_from_cli_text() -> TestResult {
        let id: TypedId<Marker> = " 42 ".parse()?;

        assert_eq!(id.get(), 42);

        Ok(())
    }

    #[test]
    fn rejects_non_numeric_text() {
        assert!("pizza".parse::<TypedId<Marker>>().is_err());
    }

    #[test]
    fn deserializes_from_json_number() -> TestResult {
        let id: TypedId<Marker> = serde_json::from_str("7")?;

        assert_eq!(id, TypedId::new(7));
        assert_eq!(serde_json::to_string(&id)?, "7");

        Ok(())
    }
}
