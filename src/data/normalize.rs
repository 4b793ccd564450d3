//! Series normalization.
//!
//! The feed sends each site's history newest first; computation and rendering
//! want it oldest first. The two orders are separate types so a sequence can
//! only be reversed while it is still in wire order: a [`Chronological`]
//! series cannot be passed to [`normalize`] again by accident.

use std::ops::Deref;

use serde::Serialize;

use statuswatch_types::Sample;

/// Samples in feed order, most recent first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewestFirst(Vec<Sample>);

impl NewestFirst {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self(samples)
    }

    /// Keep only the `limit` most recent samples. A limit of zero keeps all.
    pub fn truncate(mut self, limit: usize) -> Self {
        if limit > 0 {
            self.0.truncate(limit);
        }
        self
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Sample>> for NewestFirst {
    fn from(samples: Vec<Sample>) -> Self {
        Self(samples)
    }
}

/// Samples in chronological order, oldest first.
///
/// This is the order used for uptime and last-state computation and the
/// left-to-right order of a rendered tracker.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Chronological(Vec<Sample>);

impl Chronological {
    /// The most recent sample.
    pub fn latest(&self) -> Option<&Sample> {
        self.0.last()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Sample> {
        self.0
    }
}

impl Deref for Chronological {
    type Target = [Sample];

    fn deref(&self) -> &[Sample] {
        &self.0
    }
}

/// Reverse a feed-ordered series into chronological order.
///
/// The input is left untouched.
pub fn normalize(raw: &NewestFirst) -> Chronological {
    Chronological(raw.0.iter().rev().cloned().collect())
}
