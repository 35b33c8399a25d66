//! # Device Catalog Reconciliation
//!
//! After the repository loop, the canonical list of device types is fetched
//! from the remote catalog and compared with the slugs collected from the
//! repositories processed in this run. Every canonical device without a
//! matching slug is reported; nothing is done to fix it.
//!
//! The catalog is reached through the `DeviceCatalog` trait. `HttpCatalog`
//! performs a single GET against an endpoint returning
//! `{"d": [{"slug": "..."}, ...]}`; there is no pagination.

use std::collections::HashSet;

use log::{debug, error, info};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Default catalog endpoint listing every device type slug
pub const DEFAULT_CATALOG_URL: &str = "https://api.balena-cloud.com/v6/device_type?$select=slug";

/// Source of the canonical device slug list
pub trait DeviceCatalog {
    /// All canonical device slugs, in catalog order.
    fn device_slugs(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    d: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    slug: String,
}

/// Catalog served over HTTP
pub struct HttpCatalog {
    client: Client,
    url: String,
}

impl HttpCatalog {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

impl DeviceCatalog for HttpCatalog {
    fn device_slugs(&self) -> Result<Vec<String>> {
        info!("Fetching device catalog from {}", self.url);

        let response = self.client.get(&self.url).send()?;
        if !response.status().is_success() {
            return Err(Error::Catalog {
                url: self.url.clone(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let body = response.text()?;
        let slugs = parse_catalog(&body).map_err(|e| Error::Catalog {
            url: self.url.clone(),
            message: e.to_string(),
        })?;
        debug!("Catalog lists {} device types", slugs.len());
        Ok(slugs)
    }
}

/// Decode a catalog payload into its slugs.
pub fn parse_catalog(body: &str) -> Result<Vec<String>> {
    let response: CatalogResponse = serde_json::from_str(body)?;
    Ok(response.d.into_iter().map(|entry| entry.slug).collect())
}

/// Canonical slugs with no match in `processed`, in canonical order.
pub fn missing_devices(canonical: &[String], processed: &[String]) -> Vec<String> {
    let processed: HashSet<&str> = processed.iter().map(String::as_str).collect();
    canonical
        .iter()
        .filter(|slug| !processed.contains(slug.as_str()))
        .cloned()
        .collect()
}

/// Outcome of comparing the catalog with the processed repositories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Canonical devices whose slug was collected this run
    pub covered: Vec<String>,
    /// Canonical devices without an ESR branch from this run
    pub missing: Vec<String>,
}

impl Reconciliation {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Fetch the catalog and log every canonical device missing from `processed`.
pub fn reconcile(
    catalog: &dyn DeviceCatalog,
    processed: &[String],
    esr_version: &str,
) -> Result<Reconciliation> {
    let canonical = catalog.device_slugs()?;
    let missing = missing_devices(&canonical, processed);
    let covered = canonical
        .into_iter()
        .filter(|slug| !missing.contains(slug))
        .collect();

    let reconciliation = Reconciliation { covered, missing };
    for device in &reconciliation.missing {
        error!("Missing {} from ESR branches", device);
    }
    if reconciliation.is_complete() {
        info!("All canonical devices have an {} ESR branch now.", esr_version);
    }

    Ok(reconciliation)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticCatalog(Vec<&'static str>);

    impl DeviceCatalog for StaticCatalog {
        fn device_slugs(&self) -> Result<Vec<String>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    struct FailingCatalog;

    impl DeviceCatalog for FailingCatalog {
        fn device_slugs(&self) -> Result<Vec<String>> {
            Err(Error::Catalog {
                url: "https://catalog.invalid".to_string(),
                message: "connection refused".to_string(),
            })
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_catalog() {
        let body = r#"{"d": [{"slug": "raspberrypi3"}, {"slug": "intel-nuc", "id": 12}]}"#;
        assert_eq!(parse_catalog(body).unwrap(), strings(&["raspberrypi3", "intel-nuc"]));
    }

    #[test]
    fn test_parse_catalog_empty_list() {
        assert!(parse_catalog(r#"{"d": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_catalog_rejects_unexpected_shape() {
        assert!(parse_catalog(r#"[{"slug": "raspberrypi3"}]"#).is_err());
        assert!(parse_catalog(r#"{"d": [{"name": "x"}]}"#).is_err());
    }

    #[test]
    fn test_missing_devices_keeps_canonical_order() {
        let canonical = strings(&["qemux86", "raspberrypi3", "intel-nuc", "coral-dev"]);
        let processed = strings(&["intel-nuc", "qemux86", "not-in-catalog"]);
        assert_eq!(
            missing_devices(&canonical, &processed),
            strings(&["raspberrypi3", "coral-dev"])
        );
    }

    #[test]
    fn test_missing_devices_none_missing() {
        let canonical = strings(&["a", "b"]);
        assert!(missing_devices(&canonical, &strings(&["b", "a"])).is_empty());
    }

    #[test]
    fn test_reconcile_logs_missing_devices() {
        testing_logger::setup();
        let catalog = StaticCatalog(vec!["raspberrypi3", "intel-nuc"]);

        let result = reconcile(&catalog, &strings(&["intel-nuc"]), "2020.07.1").unwrap();
        assert_eq!(result.missing, strings(&["raspberrypi3"]));
        assert_eq!(result.covered, strings(&["intel-nuc"]));
        assert!(!result.is_complete());

        testing_logger::validate(|captured| {
            assert!(captured
                .iter()
                .any(|log| log.level == log::Level::Error
                    && log.body == "Missing raspberrypi3 from ESR branches"));
        });
    }

    #[test]
    fn test_reconcile_complete() {
        testing_logger::setup();
        let catalog = StaticCatalog(vec!["intel-nuc"]);

        let result = reconcile(&catalog, &strings(&["intel-nuc"]), "2020.07.1").unwrap();
        assert!(result.is_complete());

        testing_logger::validate(|captured| {
            assert!(captured
                .iter()
                .any(|log| log.body == "All canonical devices have an 2020.07.1 ESR branch now."));
        });
    }

    #[test]
    fn test_reconcile_propagates_catalog_errors() {
        let result = reconcile(&FailingCatalog, &[], "2020.07.1");
        assert!(matches!(result, Err(Error::Catalog { .. })));
    }
}
