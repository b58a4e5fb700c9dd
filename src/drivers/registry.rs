// Driver registry for managing radio drivers
// Drivers register a static DriverInfo at link time through `inventory`

use super::traits::CloneModeRadio;
use std::fmt;

/// Information about a radio driver
pub struct DriverInfo {
    pub vendor: &'static str,
    pub model: &'static str,
    pub description: &'static str,
    pub memsize: usize,
    factory: fn() -> Box<dyn CloneModeRadio>,
    detect: fn(&[u8], &str) -> bool,
}

impl DriverInfo {
    pub const fn new(
        vendor: &'static str,
        model: &'static str,
        description: &'static str,
        memsize: usize,
        factory: fn() -> Box<dyn CloneModeRadio>,
        detect: fn(&[u8], &str) -> bool,
    ) -> Self {
        Self {
            vendor,
            model,
            description,
            memsize,
            factory,
            detect,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.vendor, self.model)
    }

    /// Fresh driver instance with no image loaded
    pub fn create(&self) -> Box<dyn CloneModeRadio> {
        (self.factory)()
    }

    /// Whether this driver recognises an image
    pub fn matches(&self, data: &[u8], filename: &str) -> bool {
        (self.detect)(data, filename)
    }
}

impl fmt::Debug for DriverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverInfo")
            .field("vendor", &self.vendor)
            .field("model", &self.model)
            .field("memsize", &self.memsize)
            .finish()
    }
}

inventory::collect!(DriverInfo);

/// List all registered drivers, sorted by vendor then model
pub fn list_drivers() -> Vec<&'static DriverInfo> {
    let mut drivers: Vec<_> = inventory::iter::<DriverInfo>.into_iter().collect();
    drivers.sort_by(|a, b| (a.vendor, a.model).cmp(&(b.vendor, b.model)));
    drivers
}

/// Get information about a specific driver (case-insensitive)
pub fn get_driver(vendor: &str, model: &str) -> Option<&'static DriverInfo> {
    inventory::iter::<DriverInfo>
        .into_iter()
        .find(|d| d.vendor.eq_ignore_ascii_case(vendor) && d.model.eq_ignore_ascii_case(model))
}

/// First driver whose detector accepts the image
pub fn detect_driver(data: &[u8], filename: &str) -> Option<&'static DriverInfo> {
    let found = list_drivers()
        .into_iter()
        .find(|d| d.matches(data, filename));
    match found {
        Some(d) => tracing::debug!("{} matched as {}", filename, d.full_name()),
        None => tracing::debug!("no driver matched {} ({} bytes)", filename, data.len()),
    }
    found
}

/// Helper macro to register a driver
#[macro_export]
macro_rules! register_radio_driver {
    ($driver:ty, $vendor:expr, $model:expr, $description:expr, $memsize:expr) => {
        inventory::submit! {
            $crate::drivers::registry::DriverInfo::new(
                $vendor,
                $model,
                $description,
                $memsize,
                || -> Box<dyn $crate::drivers::traits::CloneModeRadio> {
                    Box::new(<$driver>::new())
                },
                <$driver as $crate::drivers::traits::CloneModeRadio>::match_model,
            )
        }
    };
}
