use serde::{Deserialize, Serialize};

/// Optimistic-concurrency counter for an order.
///
/// The store bumps this on every successful write and rejects writes whose
/// expected version no longer matches, turning a lost-update race into a
/// retryable conflict.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(version: i64) -> Self {
        Self(version)
    }

    /// The version of an order that has never been persisted.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the underlying value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_and_next() {
        let v = Version::initial();
        assert_eq!(v.as_i64(), 0);
        assert_eq!(v.next().as_i64(), 1);
        assert_eq!(v.next().next().as_i64(), 2);
    }

    #[test]
    fn test_ordering() {
        assert!(Version::new(1) < Version::new(2));
    }
}
