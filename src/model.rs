//! The in-memory workout hierarchy: an activity owns laps, a lap owns
//! trackpoints. Sample fields are optional throughout; a `None` means the
//! device did not record the value, never zero.

/// One sample from a record message, already scaled to physical units.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trackpoint {
    /// FIT timestamp (seconds since the FIT epoch). Always known; compressed
    /// timestamps are reconstructed before a trackpoint is built.
    pub timestamp: u32,
    /// Degrees, positive north.
    pub latitude: Option<f64>,
    /// Degrees, positive east.
    pub longitude: Option<f64>,
    /// Meters.
    pub altitude: Option<f64>,
    /// Beats per minute.
    pub heart_rate: Option<u8>,
    /// Revolutions per minute.
    pub cadence: Option<u8>,
    /// Watts.
    pub power: Option<u16>,
    /// Cumulative meters.
    pub distance: Option<f64>,
    /// Meters per second.
    pub speed: Option<f64>,
    /// Degrees Celsius.
    pub temperature: Option<i8>,
}

/// One lap, closed either by a lap message, a lap event, or the end of the
/// stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Lap {
    /// FIT timestamp of the first sample (or the lap message's start_time).
    pub start_time: u32,
    /// Seconds.
    pub total_time: f64,
    /// Meters.
    pub distance: f64,
    pub calories: Option<u16>,
    /// Meters per second.
    pub max_speed: Option<f64>,
    pub avg_heart_rate: Option<u8>,
    pub max_heart_rate: Option<u8>,
    pub avg_cadence: Option<u8>,
    pub trackpoints: Vec<Trackpoint>,
}

/// Sport classification, restricted to what TCX can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sport {
    Running,
    Biking,
    #[default]
    Other,
}

impl Sport {
    /// The value of the TCX `Sport` attribute.
    pub fn tcx_name(&self) -> &'static str {
        match self {
            Sport::Running => "Running",
            Sport::Biking => "Biking",
            Sport::Other => "Other",
        }
    }
}

/// Device identity, collected from file_id and file_creator messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Creator {
    pub manufacturer: Option<u16>,
    pub product: Option<u16>,
    pub serial_number: Option<u32>,
    /// Scaled by 100: 350 means version 3.50.
    pub software_version: Option<u16>,
    pub hardware_version: Option<u8>,
}

impl Creator {
    /// A display name for the TCX `Creator` element.
    pub fn name(&self) -> String {
        match (self.manufacturer, self.product) {
            (Some(1), Some(product)) => format!("Garmin product {product}"),
            (Some(1), None) => "Garmin".to_string(),
            (Some(manufacturer), _) => format!("Manufacturer {manufacturer}"),
            (None, _) => "Unknown".to_string(),
        }
    }
}

/// The finished workout, ready for serialization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Activity {
    pub sport: Sport,
    /// FIT timestamp; falls back to file_id time_created when no samples
    /// exist.
    pub start_time: Option<u32>,
    pub creator: Creator,
    pub laps: Vec<Lap>,
}
