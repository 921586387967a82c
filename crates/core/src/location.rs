//! The delivery area a visitor shops in.

use serde::{Deserialize, Serialize};

use crate::types::LocationId;

/// A selectable delivery location.
///
/// Chosen once per session; pages that list stores or products are gated on
/// it. Replaced wholesale on re-selection, never partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub area: String,
}

impl Location {
    #[must_use]
    pub fn new(id: impl Into<LocationId>, name: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            area: area.into(),
        }
    }

    /// Locations persisted before the backend switched to UUIDs carry bare
    /// numeric ids that no longer resolve.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        !self.id.is_uuid()
    }

    /// Case-insensitive match on name or area.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.area.to_lowercase().contains(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "6f1c2a9e-8b3d-4e5f-a1b2-c3d4e5f60718";

    #[test]
    fn test_legacy_detection() {
        assert!(Location::new("42", "Manila", "Metro Manila").is_legacy());
        assert!(!Location::new(UUID, "Manila", "Metro Manila").is_legacy());
    }

    #[test]
    fn test_matches_name_or_area() {
        let loc = Location::new(UUID, "Quezon City", "Metro Manila");
        assert!(loc.matches("quezon"));
        assert!(loc.matches("METRO"));
        assert!(loc.matches("  "));
        assert!(!loc.matches("cebu"));
    }

    #[test]
    fn test_numeric_id_from_json() {
        let loc: Result<Location, _> =
            serde_json::from_str(r#"{"id":42,"name":"Manila","area":"Metro Manila"}"#);
        let loc = loc.ok();
        assert_eq!(loc.map(|l| l.id.to_string()).as_deref(), Some("42"));
    }
}
