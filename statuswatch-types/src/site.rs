//! Monitored site identity.

/// A monitored target.
///
/// Sites are owned by the status server and never change during a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Site {
    /// Unique, stable identifier.
    pub id: String,

    /// Address being checked.
    pub url: String,

    /// Human readable name shown by dashboards.
    pub name: String,
}

impl Site {
    /// Create a site.
    pub fn new(id: impl Into<String>, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            name: name.into(),
        }
    }

    /// Name to display, falling back to the URL when the server sent none.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }
}
