//! Type definitions

pub mod batch;
pub mod delivery;
pub mod fleet;
pub mod job;
pub mod messages;
pub mod route;

pub use batch::*;
pub use delivery::*;
pub use fleet::*;
pub use job::*;
pub use messages::*;
pub use route::*;

use serde::{Deserialize, Serialize};

/// Coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_serialize_camel_case() {
        let c = Coordinates { lat: 18.4861, lng: -69.9312 };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"lat\":18.4861"));
        assert!(json.contains("\"lng\":-69.9312"));
    }
}
