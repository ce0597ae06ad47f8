use std::fmt;

use serde::{Deserialize, Serialize};

/// Requester-supplied reference, unique across the ledger. Doubles as the
/// idempotency key for submissions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReferenceNo(String);

impl ReferenceNo {
    pub fn new(reference_no: impl Into<String>) -> Self {
        Self(reference_no.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ReferenceNo {
    fn from(reference_no: &str) -> Self {
        Self::new(reference_no)
    }
}

impl fmt::Display for ReferenceNo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return write!(f, "{}", self.0);
    }
}
