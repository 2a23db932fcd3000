use std::collections::HashMap;

use crate::config::LocationTable;
use crate::models::recommendation::LocationProfile;

/// Resolves a free-text location to its generation factors.
pub trait LocationFactors: Send + Sync {
    fn profile(&self, location: &str) -> LocationProfile;
}

/// Static lookup table from configuration. Unknown sites get the default profile.
#[derive(Debug, Clone)]
pub struct TableLocationFactors {
    default: LocationProfile,
    sites: HashMap<String, LocationProfile>,
}

impl TableLocationFactors {
    pub fn new(default: LocationProfile, sites: impl IntoIterator<Item = (String, LocationProfile)>) -> Self {
        Self {
            default,
            sites: sites.into_iter().map(|(name, p)| (normalize(&name), p)).collect(),
        }
    }
}

impl From<&LocationTable> for TableLocationFactors {
    fn from(table: &LocationTable) -> Self {
        Self::new(table.default, table.sites.clone())
    }
}

impl LocationFactors for TableLocationFactors {
    fn profile(&self, location: &str) -> LocationProfile {
        self.sites.get(&normalize(location)).copied().unwrap_or(self.default)
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_spacing() {
        let table = TableLocationFactors::new(
            LocationProfile::default(),
            [("New  Delhi".to_string(), LocationProfile { solar_factor: 1.05, wind_factor: 0.8 })],
        );
        assert_eq!(table.profile("new delhi ").solar_factor, 1.05);
        assert_eq!(table.profile("Mumbai"), LocationProfile::default());
    }
}
