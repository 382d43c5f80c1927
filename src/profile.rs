//! The slice of the FIT global profile a workout conversion needs: message
//! numbers, field numbers, and the scale/offset rules that turn raw integers
//! into physical units.

/// Global message numbers.
pub mod mesg {
    pub const FILE_ID: u16 = 0;
    pub const SESSION: u16 = 18;
    pub const LAP: u16 = 19;
    pub const RECORD: u16 = 20;
    pub const EVENT: u16 = 21;
    pub const ACTIVITY: u16 = 34;
    pub const FILE_CREATOR: u16 = 49;
}

/// Field number shared by every message kind that carries an absolute
/// timestamp.
pub const TIMESTAMP: u8 = 253;

pub mod file_id {
    pub const FILE_TYPE: u8 = 0;
    pub const MANUFACTURER: u8 = 1;
    pub const PRODUCT: u8 = 2;
    pub const SERIAL_NUMBER: u8 = 3;
    pub const TIME_CREATED: u8 = 4;

    pub const FILE_TYPE_ACTIVITY: u8 = 4;
}

pub mod file_creator {
    pub const SOFTWARE_VERSION: u8 = 0;
    pub const HARDWARE_VERSION: u8 = 1;
}

pub mod record {
    pub const POSITION_LAT: u8 = 0;
    pub const POSITION_LONG: u8 = 1;
    pub const ALTITUDE: u8 = 2;
    pub const HEART_RATE: u8 = 3;
    pub const CADENCE: u8 = 4;
    pub const DISTANCE: u8 = 5;
    pub const SPEED: u8 = 6;
    pub const POWER: u8 = 7;
    pub const TEMPERATURE: u8 = 13;
}

pub mod lap {
    pub const START_TIME: u8 = 2;
    pub const TOTAL_ELAPSED_TIME: u8 = 7;
    pub const TOTAL_TIMER_TIME: u8 = 8;
    pub const TOTAL_DISTANCE: u8 = 9;
    pub const TOTAL_CALORIES: u8 = 11;
    pub const AVG_SPEED: u8 = 13;
    pub const MAX_SPEED: u8 = 14;
    pub const AVG_HEART_RATE: u8 = 15;
    pub const MAX_HEART_RATE: u8 = 16;
    pub const AVG_CADENCE: u8 = 17;
}

pub mod session {
    pub const SPORT: u8 = 5;

    pub const SPORT_RUNNING: u8 = 1;
    pub const SPORT_CYCLING: u8 = 2;
}

pub mod event {
    pub const EVENT: u8 = 0;
    pub const EVENT_TYPE: u8 = 1;

    pub const EVENT_TIMER: u8 = 0;
    pub const EVENT_LAP: u8 = 9;

    pub const EVENT_TYPE_START: u8 = 0;
    pub const EVENT_TYPE_STOP: u8 = 1;
    pub const EVENT_TYPE_STOP_ALL: u8 = 4;
}

/// The message kinds the conversion understands, keyed by global message
/// number. Anything else is skipped without error so that files written by
/// newer firmware still convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    FileId,
    FileCreator,
    Session,
    Lap,
    Record,
    Event,
    Activity,
}

impl MessageKind {
    pub fn from_global(number: u16) -> Option<Self> {
        match number {
            mesg::FILE_ID => Some(MessageKind::FileId),
            mesg::FILE_CREATOR => Some(MessageKind::FileCreator),
            mesg::SESSION => Some(MessageKind::Session),
            mesg::LAP => Some(MessageKind::Lap),
            mesg::RECORD => Some(MessageKind::Record),
            mesg::EVENT => Some(MessageKind::Event),
            mesg::ACTIVITY => Some(MessageKind::Activity),
            _ => None,
        }
    }
}

/// Positions are stored as signed 32-bit semicircles; 2^31 semicircles span
/// 180 degrees.
#[inline]
pub fn semicircles_to_degrees(semicircles: i32) -> f64 {
    f64::from(semicircles) * (180.0 / 2_147_483_648.0)
}

/// Altitude is scaled by 5 with a 500 m offset.
#[inline]
pub fn altitude_to_meters(raw: u16) -> f64 {
    f64::from(raw) / 5.0 - 500.0
}

/// Distances are centimeters.
#[inline]
pub fn distance_to_meters(raw: u32) -> f64 {
    f64::from(raw) / 100.0
}

/// Speeds are millimeters per second.
#[inline]
pub fn speed_to_mps(raw: u16) -> f64 {
    f64::from(raw) / 1000.0
}

/// Durations are milliseconds.
#[inline]
pub fn ms_to_seconds(raw: u32) -> f64 {
    f64::from(raw) / 1000.0
}
