//! Store configuration needed to build a payload.
//!
//! Raw configuration is string-keyed and scoped per store view; this module
//! turns it into a typed [`StoreConfig`] once, before the pure transformer runs.

use ordersync_core::{StoreScope, ValueObject};

use crate::payload::PayloadAddress;

/// Configuration paths read by [`StoreConfig::resolve`].
pub mod paths {
    pub const STORE_NAME: &str = "general/store_information/name";
    pub const STREET_LINE1: &str = "general/store_information/street_line1";
    pub const STREET_LINE2: &str = "general/store_information/street_line2";
    pub const CITY: &str = "general/store_information/city";
    pub const COUNTRY_ID: &str = "general/store_information/country_id";
    pub const REGION_ID: &str = "general/store_information/region_id";
    pub const POSTCODE: &str = "general/store_information/postcode";
    pub const SENDER_FIRSTNAME: &str = "spodsync/sender/firstname";
    pub const SENDER_LASTNAME: &str = "spodsync/sender/lastname";
}

/// Scoped configuration lookup.
pub trait StoreConfigProvider: Send + Sync {
    /// Value at `path` for `scope`, or `None` when unset.
    fn config_value(&self, path: &str, scope: StoreScope) -> Option<String>;
}

/// Maps configured region identifiers to region codes (e.g. `"91"` -> `"SN"`).
pub trait RegionDirectory: Send + Sync {
    fn region_code(&self, region_id: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreConfigError {
    #[error("missing store configuration `{path}` for scope {scope}")]
    Missing { path: &'static str, scope: StoreScope },
}

/// Origin ("from") address of shipments, taken from store information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginAddress {
    pub company: String,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub street_annex: Option<String>,
    pub city: String,
    pub country: String,
    pub region_code: String,
    pub zip_code: String,
}

impl ValueObject for OriginAddress {}

impl From<&OriginAddress> for PayloadAddress {
    fn from(origin: &OriginAddress) -> Self {
        PayloadAddress {
            company: origin.company.clone(),
            first_name: origin.first_name.clone(),
            last_name: origin.last_name.clone(),
            street: origin.street.clone(),
            street_annex: origin.street_annex.clone(),
            city: origin.city.clone(),
            country: origin.country.clone(),
            state: origin.region_code.clone(),
            zip_code: origin.zip_code.clone(),
        }
    }
}

/// Snapshot of everything the transformer needs from store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub scope: StoreScope,
    pub origin: OriginAddress,
}

impl StoreConfig {
    /// Resolve the configuration snapshot for `scope`.
    ///
    /// Company, street line 2, sender names and region fall back to empty
    /// (or absent for the annex); the remaining address lines are required.
    pub fn resolve<P, R>(
        provider: &P,
        regions: &R,
        scope: StoreScope,
    ) -> Result<StoreConfig, StoreConfigError>
    where
        P: StoreConfigProvider + ?Sized,
        R: RegionDirectory + ?Sized,
    {
        let optional = |path: &'static str| -> Option<String> {
            provider
                .config_value(path, scope)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |path: &'static str| -> Result<String, StoreConfigError> {
            optional(path).ok_or(StoreConfigError::Missing { path, scope })
        };

        let region_code = optional(paths::REGION_ID)
            .and_then(|id| regions.region_code(&id))
            .unwrap_or_default();

        let origin = OriginAddress {
            company: optional(paths::STORE_NAME).unwrap_or_default(),
            first_name: optional(paths::SENDER_FIRSTNAME).unwrap_or_default(),
            last_name: optional(paths::SENDER_LASTNAME).unwrap_or_default(),
            street: required(paths::STREET_LINE1)?,
            street_annex: optional(paths::STREET_LINE2),
            city: required(paths::CITY)?,
            country: required(paths::COUNTRY_ID)?,
            region_code,
            zip_code: required(paths::POSTCODE)?,
        };

        Ok(StoreConfig { scope, origin })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct MapConfig(HashMap<(&'static str, u32), &'static str>);

    impl StoreConfigProvider for MapConfig {
        fn config_value(&self, path: &str, scope: StoreScope) -> Option<String> {
            self.0
                .iter()
                .find(|((p, s), _)| *p == path && *s == scope.0)
                .map(|(_, v)| v.to_string())
        }
    }

    struct Regions;

    impl RegionDirectory for Regions {
        fn region_code(&self, region_id: &str) -> Option<String> {
            (region_id == "91").then(|| "SN".to_string())
        }
    }

    fn base(scope: u32) -> HashMap<(&'static str, u32), &'static str> {
        HashMap::from([
            ((paths::STREET_LINE1, scope), "Werkstrasse 3"),
            ((paths::CITY, scope), "Leipzig"),
            ((paths::COUNTRY_ID, scope), "DE"),
            ((paths::POSTCODE, scope), "04109"),
        ])
    }

    #[test]
    fn minimal_configuration_defaults_optional_fields() {
        let config = StoreConfig::resolve(&MapConfig(base(1)), &Regions, StoreScope(1)).unwrap();

        assert_eq!(config.origin.company, "");
        assert_eq!(config.origin.first_name, "");
        assert_eq!(config.origin.region_code, "");
        assert_eq!(config.origin.street_annex, None);
        assert_eq!(config.origin.street, "Werkstrasse 3");
    }

    #[test]
    fn region_id_is_resolved_to_its_code() {
        let mut values = base(1);
        values.insert((paths::REGION_ID, 1), "91");
        values.insert((paths::STORE_NAME, 1), "Print Shop");
        values.insert((paths::STREET_LINE2, 1), "Halle B");

        let config = StoreConfig::resolve(&MapConfig(values), &Regions, StoreScope(1)).unwrap();
        assert_eq!(config.origin.region_code, "SN");
        assert_eq!(config.origin.company, "Print Shop");
        assert_eq!(config.origin.street_annex.as_deref(), Some("Halle B"));
    }

    #[test]
    fn unknown_region_id_resolves_to_empty_code() {
        let mut values = base(1);
        values.insert((paths::REGION_ID, 1), "9999");

        let config = StoreConfig::resolve(&MapConfig(values), &Regions, StoreScope(1)).unwrap();
        assert_eq!(config.origin.region_code, "");
    }

    #[test]
    fn values_are_scoped() {
        let err = StoreConfig::resolve(&MapConfig(base(1)), &Regions, StoreScope(2)).unwrap_err();
        assert_eq!(
            err,
            StoreConfigError::Missing {
                path: paths::STREET_LINE1,
                scope: StoreScope(2)
            }
        );
    }

    #[test]
    fn blank_required_value_counts_as_missing() {
        let mut values = base(1);
        values.insert((paths::CITY, 1), "   ");

        let err = StoreConfig::resolve(&MapConfig(values), &Regions, StoreScope(1)).unwrap_err();
        assert!(matches!(err, StoreConfigError::Missing { path, .. } if path == paths::CITY));
    }
}
