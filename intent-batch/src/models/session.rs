//! Session flag and navigable views

use serde::{Deserialize, Serialize};
use std::fmt;

/// Client session
///
/// Holds only a boolean. This is a convenience gate in front of an external
/// identity provider, not a security boundary: anyone with access to the
/// storage file can flip it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub authenticated: bool,
}

/// Views a user can navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    /// Public landing page
    Landing,
    DatasetUpload,
    SingleQuery,
    Results,
}

impl View {
    /// Whether entering this view requires a signed-in session
    pub fn is_protected(self) -> bool {
        !matches!(self, View::Landing)
    }

    pub fn path(self) -> &'static str {
        match self {
            View::Landing => "/",
            View::DatasetUpload => "/DatasetUpload",
            View::SingleQuery => "/singleQuery",
            View::Results => "/Results",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
