//! Listing comparators

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use kindling_core::Manifest;
use serde::{Deserialize, Serialize};

use crate::error::KubeError;

/// Boxed comparator over manifests
pub type Comparator = Box<dyn Fn(&Manifest, &Manifest) -> Ordering + Send + Sync>;

/// Sort order requested by a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortKey {
    /// Oldest first
    Age,
    /// Smallest first
    Size,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Age => write!(f, "AGE"),
            Self::Size => write!(f, "SIZE"),
        }
    }
}

impl FromStr for SortKey {
    type Err = KubeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "age" => Ok(Self::Age),
            "size" => Ok(Self::Size),
            _ => Err(KubeError::UnsupportedSort(s.to_string())),
        }
    }
}

/// Ascending creation timestamp; manifests without one sort first
pub fn by_age() -> Comparator {
    Box::new(|a, b| a.creation_timestamp().cmp(&b.creation_timestamp()))
}

/// Ascending replica count; a missing count ranks below zero
pub fn by_replicas() -> Comparator {
    Box::new(|a, b| a.replicas().cmp(&b.replicas()))
}

/// Ascending value of an arbitrary size metric
pub fn by_metric(metric: fn(&Manifest) -> usize) -> Comparator {
    Box::new(move |a, b| metric(a).cmp(&metric(b)))
}

/// Every manifest compares equal, leaving input order intact
pub fn unordered() -> Comparator {
    Box::new(|_, _| Ordering::Equal)
}
