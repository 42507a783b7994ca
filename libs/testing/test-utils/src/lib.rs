//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for all domain crates:
//! - `TestDatabase`: in-memory SQLite through sea-orm (feature: "sqlite")
//! - `TestRedis`: Redis container with automatic cleanup (feature: "redis")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `sqlite` (default): Enables the relational test database
//! - `redis`: Enables Redis test infrastructure (needs docker)
//! - `all`: Enables all test infrastructure
//!
//! # Usage
//!
//! ```rust,ignore
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_repository_test() {
//!     let db = TestDatabase::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let key = builder.key("site_name");
//!     let file_id = builder.file_id(0);
//! }
//! ```
//!
//! ## Redis Testing
//!
//! Add `features = ["redis"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["redis"] }
//! ```

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "sqlite")]
pub use sqlite::TestDatabase;

#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_batch_upsert");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Generate a setting key unique to this builder
    ///
    /// Keys stay well under the 100 character column limit.
    pub fn key(&self, suffix: &str) -> String {
        format!("test_{:x}_{}", self.seed, suffix)
    }

    /// Generate a setting group unique to this builder
    pub fn group(&self, suffix: &str) -> String {
        format!("g{:x}_{}", self.seed & 0xffff_ffff, suffix)
    }

    /// Generate a deterministic, positive file id; `offset` separates files
    /// within one test.
    pub fn file_id(&self, offset: i32) -> i32 {
        ((self.seed % 100_000) as i32) * 100 + 1 + offset
    }

    /// Generate a unique name for testing
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(7);
    /// assert_eq!(builder.name("file", "main"), "test-file-7-main");
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that `haystack` contains `needle`
    pub fn assert_contains(haystack: &str, needle: &str, context: &str) {
        assert!(
            haystack.contains(needle),
            "{}: expected {:?} to contain {:?}",
            context,
            haystack,
            needle
        );
    }

    /// Assert that two slices hold the same elements, ignoring order
    pub fn assert_same_items<T: Ord + Clone + std::fmt::Debug>(
        actual: &[T],
        expected: &[T],
        context: &str,
    ) {
        let mut actual = actual.to_vec();
        let mut expected = expected.to_vec();
        actual.sort();
        expected.sort();
        assert_eq!(actual, expected, "{}", context);
    }
}
