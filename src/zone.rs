/// Scope of a generation run.
///
/// Views may carry a zone label. An unscoped run documents every view; a run
/// scoped to a zone documents only the views labelled with exactly that zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ZoneFilter {
    zone: Option<String>,
}

impl ZoneFilter {
    /// Document every view
    pub fn all() -> Self {
        Self::default()
    }

    /// Document only the views labelled `zone`
    pub fn only(zone: impl Into<String>) -> Self {
        Self {
            zone: Some(zone.into()),
        }
    }

    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn admits(&self, view_zone: Option<&str>) -> bool {
        match &self.zone {
            None => true,
            Some(zone) => view_zone == Some(zone.as_str()),
        }
    }
}

impl From<Option<String>> for ZoneFilter {
    fn from(zone: Option<String>) -> Self {
        Self { zone }
    }
}

impl From<Option<&str>> for ZoneFilter {
    fn from(zone: Option<&str>) -> Self {
        Self {
            zone: zone.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscoped_admits_everything() {
        let filter = ZoneFilter::all();
        assert!(filter.admits(None));
        assert!(filter.admits(Some("internal")));
    }

    #[test]
    fn test_scoped_admits_only_matching_label() {
        let filter = ZoneFilter::only("internal");
        assert!(filter.admits(Some("internal")));
        assert!(!filter.admits(Some("public")));
        assert!(!filter.admits(None));
    }
}
