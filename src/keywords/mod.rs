//! keywords
//!
//! The keyword-service collaborator: an opaque read/write store of named
//! values grouped by service, where every call carries its own timeout.
//!
//! # Architecture
//!
//! Operations talk to hardware only through [`KeywordService`]. The trait is
//! object safe so a driver can be chosen at startup and shared by every
//! registered operation as an `Arc<dyn KeywordService>`.
//!
//! [`MemoryKeywords`] is the in-process driver used by the binary and by
//! tests. It can be seeded from `[keywords.<service>]` config sections and
//! switched into an unresponsive mode to exercise timeout handling.
//!
//! # Invariants
//!
//! - A timeout always surfaces as [`KeywordError::Timeout`], never as a
//!   generic failure, so phases can tell the two apart

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::core::config::{schema::toml_to_json, Config};

/// Errors from keyword access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeywordError {
    /// The service did not answer in time.
    #[error("timed out after {timeout:?} waiting for {service}.{keyword}")]
    Timeout {
        service: String,
        keyword: String,
        timeout: Duration,
    },

    /// The service does not know the keyword.
    #[error("unknown keyword {service}.{keyword}")]
    Unknown { service: String, keyword: String },
}

impl KeywordError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, KeywordError::Timeout { .. })
    }
}

/// Read/write access to instrument keywords.
pub trait KeywordService: Send + Sync {
    /// Read a keyword as its string form.
    fn read(&self, service: &str, keyword: &str, timeout: Duration) -> Result<String, KeywordError>;

    /// Write a keyword.
    fn write(
        &self,
        service: &str,
        keyword: &str,
        value: &str,
        timeout: Duration,
    ) -> Result<(), KeywordError>;
}

#[derive(Debug, Default)]
struct Store {
    values: BTreeMap<(String, String), String>,
    unresponsive: bool,
}

/// In-memory keyword store.
#[derive(Debug, Default)]
pub struct MemoryKeywords {
    store: Mutex<Store>,
}

impl MemoryKeywords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed keywords from every `[keywords.<service>]` section.
    ///
    /// Non-scalar values are stored in their JSON form.
    pub fn from_config(config: &Config) -> Self {
        let keywords = Self::new();
        let Some(section) = config.section("keywords") else {
            return keywords;
        };
        for (service, table) in section {
            let Some(table) = table.as_table() else {
                tracing::warn!(service = %service, "ignoring non-table keyword section");
                continue;
            };
            for (keyword, value) in table {
                let text = match value {
                    toml::Value::String(s) => s.clone(),
                    other => toml_to_json(other).to_string(),
                };
                keywords.set(service, keyword, text);
            }
        }
        keywords
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // A panicking holder cannot leave the map half-written.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set a keyword directly, bypassing timeouts.
    pub fn set(&self, service: &str, keyword: &str, value: impl Into<String>) {
        self.lock()
            .values
            .insert((service.to_string(), keyword.to_string()), value.into());
    }

    /// Current value of a keyword, if any.
    pub fn get(&self, service: &str, keyword: &str) -> Option<String> {
        self.lock()
            .values
            .get(&(service.to_string(), keyword.to_string()))
            .cloned()
    }

    /// When set, every read and write blocks for its full timeout and then
    /// fails with [`KeywordError::Timeout`].
    pub fn set_unresponsive(&self, unresponsive: bool) {
        self.lock().unresponsive = unresponsive;
    }

    fn check_responsive(
        &self,
        service: &str,
        keyword: &str,
        timeout: Duration,
    ) -> Result<(), KeywordError> {
        if self.lock().unresponsive {
            thread::sleep(timeout);
            return Err(KeywordError::Timeout {
                service: service.to_string(),
                keyword: keyword.to_string(),
                timeout,
            });
        }
        Ok(())
    }
}

impl KeywordService for MemoryKeywords {
    fn read(
        &self,
        service: &str,
        keyword: &str,
        timeout: Duration,
    ) -> Result<String, KeywordError> {
        self.check_responsive(service, keyword, timeout)?;
        self.get(service, keyword).ok_or_else(|| KeywordError::Unknown {
            service: service.to_string(),
            keyword: keyword.to_string(),
        })
    }

    fn write(
        &self,
        service: &str,
        keyword: &str,
        value: &str,
        timeout: Duration,
    ) -> Result<(), KeywordError> {
        self.check_responsive(service, keyword, timeout)?;
        tracing::debug!(service, keyword, value, "keyword write");
        self.set(service, keyword, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(1);

    #[test]
    fn write_then_read() {
        let kw = MemoryKeywords::new();
        kw.write("mosfire", "ITIME", "30", SHORT).unwrap();
        assert_eq!(kw.read("mosfire", "ITIME", SHORT).unwrap(), "30");
    }

    #[test]
    fn unknown_keyword() {
        let kw = MemoryKeywords::new();
        let err = kw.read("mosfire", "NOPE", SHORT).unwrap_err();
        assert!(matches!(err, KeywordError::Unknown { .. }));
        assert!(!err.is_timeout());
    }

    #[test]
    fn unresponsive_service_times_out() {
        let kw = MemoryKeywords::new();
        kw.set("mosfire", "ITIME", "30");
        kw.set_unresponsive(true);

        let err = kw.read("mosfire", "ITIME", SHORT).unwrap_err();
        assert!(err.is_timeout());
        assert!(kw.write("mosfire", "ITIME", "1", SHORT).unwrap_err().is_timeout());
        assert_eq!(kw.get("mosfire", "ITIME").as_deref(), Some("30"));

        kw.set_unresponsive(false);
        assert!(kw.read("mosfire", "ITIME", SHORT).is_ok());
    }

    #[test]
    fn seeded_from_config() {
        let config = Config::parse_str(
            r#"
            [keywords.mosfire]
            ITIME = "30"
            COADDS = 2

            [keywords.dcs]
            ROTPPOSN = 12.5
            "#,
        )
        .unwrap();
        let kw = MemoryKeywords::from_config(&config);
        assert_eq!(kw.get("mosfire", "ITIME").as_deref(), Some("30"));
        assert_eq!(kw.get("mosfire", "COADDS").as_deref(), Some("2"));
        assert_eq!(kw.get("dcs", "ROTPPOSN").as_deref(), Some("12.5"));
    }

    #[test]
    fn usable_as_trait_object() {
        let kw: std::sync::Arc<dyn KeywordService> = std::sync::Arc::new(MemoryKeywords::new());
        kw.write("s", "k", "v", SHORT).unwrap();
        assert_eq!(kw.read("s", "k", SHORT).unwrap(), "v");
    }
}
