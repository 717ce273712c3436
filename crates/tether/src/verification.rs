//! Verification of observed traffic against expected request counts.
//!
//! Verification always runs over a journal snapshot fetched at query time.
//! The snapshot may already be filtered server-side by the search endpoint,
//! but the count is recomputed here with the descriptor's own matching rules,
//! so results do not depend on the server version's filtering behavior.

use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::matcher::RequestDescriptor;

/// A pure predicate over the number of matching journal entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationCriteria {
    /// Satisfied iff the count is exactly `n`.
    Times(usize),
    /// Satisfied iff the count is at least `n`.
    AtLeast(usize),
    /// Satisfied iff the count is at most `n`.
    AtMost(usize),
    /// Satisfied iff the count is zero.
    Never,
}

/// The request was made exactly `n` times.
pub fn times(n: usize) -> VerificationCriteria {
    VerificationCriteria::Times(n)
}

/// The request was made at least `n` times.
pub fn at_least(n: usize) -> VerificationCriteria {
    VerificationCriteria::AtLeast(n)
}

/// The request was made at least once.
pub fn at_least_once() -> VerificationCriteria {
    VerificationCriteria::AtLeast(1)
}

/// The request was made at most `n` times.
pub fn at_most(n: usize) -> VerificationCriteria {
    VerificationCriteria::AtMost(n)
}

/// The request was never made.
pub fn never() -> VerificationCriteria {
    VerificationCriteria::Never
}

impl VerificationCriteria {
    pub fn is_satisfied_by(&self, count: usize) -> bool {
        match self {
            VerificationCriteria::Times(n) => count == *n,
            VerificationCriteria::AtLeast(n) => count >= *n,
            VerificationCriteria::AtMost(n) => count <= *n,
            VerificationCriteria::Never => count == 0,
        }
    }

    /// Human-readable expectation for failure messages.
    pub fn expectation(&self) -> String {
        match self {
            VerificationCriteria::Times(n) => format!("exactly {n}"),
            VerificationCriteria::AtLeast(n) => format!("at least {n}"),
            VerificationCriteria::AtMost(n) => format!("at most {n}"),
            VerificationCriteria::Never => "no".to_string(),
        }
    }
}

/// Count the journal entries matching `descriptor` and evaluate `criteria`
/// against the count.
///
/// On rejection the error carries the literal descriptor and the observed vs.
/// expected counts, so a test failure names exactly which request misbehaved.
pub fn verify(
    descriptor: &RequestDescriptor,
    criteria: VerificationCriteria,
    journal: &Journal,
) -> Result<()> {
    let actual = journal
        .entries()
        .iter()
        .filter(|entry| descriptor.matches(&entry.request))
        .count();

    if criteria.is_satisfied_by(actual) {
        Ok(())
    } else {
        Err(Error::VerificationFailed {
            expected: criteria.expectation(),
            actual,
            descriptor: descriptor.describe(),
        })
    }
}

/// Assert that every descriptor was observed at least once.
///
/// Fail-fast: descriptors are checked in order and the first failure is
/// returned; later descriptors are not queried.
pub async fn verify_all<'a, I, F, Fut>(descriptors: I, mut journal_provider: F) -> Result<()>
where
    I: IntoIterator<Item = &'a RequestDescriptor>,
    F: FnMut(&'a RequestDescriptor) -> Fut,
    Fut: std::future::Future<Output = Result<Journal>>,
{
    for descriptor in descriptors {
        let journal = journal_provider(descriptor).await?;
        verify(descriptor, at_least_once(), &journal)?;
    }
    Ok(())
}
