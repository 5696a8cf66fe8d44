//! Invalidation targets and write-side helpers.

use std::future::Future;

use tracing::{info, warn};

use crate::cache::Cache;

/// A target removed by an [`Invalidation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One exact key.
    Key(String),
    /// Every key matching a glob pattern.
    Pattern(String),
}

/// Keys and patterns to drop after a write to the system of record.
///
/// # Examples
///
/// ```
/// use tally_cache::{CacheKey, Invalidation};
///
/// let company = CacheKey::new("company").push("42");
/// let invalidation = Invalidation::new()
///     .key(company.clone().push("invoices").push("7"))
///     .pattern(company.push("reports").pattern());
///
/// assert_eq!(invalidation.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    targets: Vec<Target>,
}

impl Invalidation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact key.
    pub fn key(mut self, key: impl AsRef<str>) -> Self {
        self.targets.push(Target::Key(key.as_ref().to_string()));
        self
    }

    /// Adds a glob pattern.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.targets.push(Target::Pattern(pattern.into()));
        self
    }

    /// Returns the targets in insertion order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Cache {
    /// Applies every target of `invalidation`.
    ///
    /// All targets are attempted even if one fails; returns `true` only if
    /// all of them succeeded.
    pub async fn invalidate(&self, invalidation: &Invalidation) -> bool {
        let mut all_ok = true;

        for target in invalidation.targets() {
            let ok = match target {
                Target::Key(key) => self.delete(key).await,
                Target::Pattern(pattern) => self.delete_by_pattern(pattern).await,
            };
            all_ok &= ok;
        }

        if !all_ok {
            warn!(
                targets = invalidation.len(),
                "Cache invalidation incomplete, stale entries expire by TTL"
            );
        }
        all_ok
    }

    /// Runs `write` against the system of record and, if it succeeds, awaits
    /// `invalidation` before handing the result back.
    ///
    /// The caller only sees the write as complete once the affected entries
    /// are gone (or their removal failed and the TTL bounds the staleness).
    /// A failed write invalidates nothing.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use tally_cache::{Cache, CacheKey, Invalidation, MemoryStore};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), std::io::Error> {
    /// # let cache = Cache::new(Arc::new(MemoryStore::new()));
    /// let key = CacheKey::new("company").push("1").push("profile");
    /// cache
    ///     .commit_and_invalidate(Invalidation::new().key(&key), async {
    ///         // UPDATE companies SET ... WHERE id = 1
    ///         Ok::<_, std::io::Error>(())
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn commit_and_invalidate<T, E, Fut>(
        &self,
        invalidation: Invalidation,
        write: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let value = write.await?;

        let complete = self.invalidate(&invalidation).await;
        info!(
            targets = invalidation.len(),
            complete, "Cache invalidated after commit"
        );

        Ok(value)
    }
}
