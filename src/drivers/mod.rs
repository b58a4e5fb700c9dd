// Radio driver framework
pub mod config;
pub mod registry;
pub mod traits;

// Drivers
pub mod ict7h;
pub mod uv5r;

pub use config::ModelConfig;
pub use registry::{detect_driver, get_driver, list_drivers, DriverInfo};
pub use traits::{CloneModeRadio, Radio, RadioError, RadioResult};

/// Driver for an image: the one named by vendor/model when given,
/// otherwise the first whose detector accepts the data
pub fn driver_for(
    data: &[u8],
    filename: &str,
    vendor: &str,
    model: &str,
) -> Option<&'static DriverInfo> {
    if !vendor.is_empty() && !model.is_empty() {
        if let Some(info) = get_driver(vendor, model) {
            return Some(info);
        }
        tracing::warn!("No driver registered for {} {}", vendor, model);
    }
    detect_driver(data, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drivers_registered() {
        let drivers = list_drivers();
        let names: Vec<String> = drivers.iter().map(|d| d.full_name()).collect();
        assert!(names.contains(&"Baofeng UV-5R".to_string()), "UV-5R not found");
        assert!(names.contains(&"Icom IC-T7H".to_string()), "IC-T7H not found");
    }

    #[test]
    fn test_driver_for() {
        let data = vec![0u8; 0x03B0];
        assert_eq!(driver_for(&data, "x.img", "", "").unwrap().model, "IC-T7H");
        assert_eq!(
            driver_for(&data, "x.img", "Baofeng", "UV-5R").unwrap().model,
            "UV-5R"
        );
        assert_eq!(
            driver_for(&data, "x.img", "Nobody", "Nothing").unwrap().model,
            "IC-T7H"
        );
    }
}
