//! Folds dispatched messages, in stream order, into the workout hierarchy.

use log::debug;

use crate::errors::Error;
use crate::model::{Activity, Creator, Lap, Sport, Trackpoint};
use crate::profile::{self, MessageKind};
use crate::types::{Message, RecordHeader};

/// Accumulator for the lap currently being recorded.
#[derive(Debug, Default)]
struct OpenLap {
    start_time: Option<u32>,
    trackpoints: Vec<Trackpoint>,
}

/// Stateful visitor for one conversion. Owns the partial hierarchy while the
/// record stream is consumed; [`WorkoutBuilder::finish`] yields the completed
/// [`Activity`].
///
/// State is private to one conversion, so independent files can be converted
/// in parallel with one builder each.
#[derive(Debug, Default)]
pub struct WorkoutBuilder {
    file_id_seen: bool,
    sport: Option<Sport>,
    creator: Creator,
    time_created: Option<u32>,
    last_timestamp: Option<u32>,
    timer_running: bool,
    laps: Vec<Lap>,
    open: OpenLap,
}

impl WorkoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches one decoded message. `header` is the record header byte,
    /// needed for compressed-timestamp reconstruction.
    pub fn handle(&mut self, header: u8, message: &Message) -> Result<(), Error> {
        match MessageKind::from_global(message.number()) {
            Some(MessageKind::FileId) => self.on_file_id(message),
            Some(MessageKind::FileCreator) => {
                self.on_file_creator(message);
                Ok(())
            }
            Some(MessageKind::Record) => self.on_record(header, message),
            Some(MessageKind::Lap) => {
                self.close_lap(Some(message));
                Ok(())
            }
            Some(MessageKind::Session) => {
                self.on_session(message);
                Ok(())
            }
            Some(MessageKind::Event) => {
                self.on_event(message);
                Ok(())
            }
            // Nothing in the activity summary a workout needs; unknown
            // global numbers are skipped for forward compatibility.
            Some(MessageKind::Activity) | None => Ok(()),
        }
    }

    /// Finalizes the model. An open lap at end-of-stream becomes the last
    /// lap; no explicit close message is required.
    pub fn finish(mut self) -> Result<Activity, Error> {
        if !self.file_id_seen {
            return Err(Error::MissingFileId);
        }
        self.close_lap(None);
        let start_time = self
            .laps
            .first()
            .map(|lap| lap.start_time)
            .or(self.time_created);
        Ok(Activity {
            sport: self.sport.unwrap_or_default(),
            start_time,
            creator: self.creator,
            laps: self.laps,
        })
    }

    fn on_file_id(&mut self, message: &Message) -> Result<(), Error> {
        if let Some(file_type) = message.field_u8(profile::file_id::FILE_TYPE) {
            if file_type != profile::file_id::FILE_TYPE_ACTIVITY {
                return Err(Error::WrongFileType { found: file_type });
            }
        }
        self.file_id_seen = true;
        let creator = &mut self.creator;
        creator.manufacturer = message
            .field_u16(profile::file_id::MANUFACTURER)
            .or(creator.manufacturer);
        creator.product = message
            .field_u16(profile::file_id::PRODUCT)
            .or(creator.product);
        creator.serial_number = message
            .field_u32(profile::file_id::SERIAL_NUMBER)
            .or(creator.serial_number);
        self.time_created = message
            .field_u32(profile::file_id::TIME_CREATED)
            .or(self.time_created);
        Ok(())
    }

    fn on_file_creator(&mut self, message: &Message) {
        let creator = &mut self.creator;
        creator.software_version = message
            .field_u16(profile::file_creator::SOFTWARE_VERSION)
            .or(creator.software_version);
        creator.hardware_version = message
            .field_u8(profile::file_creator::HARDWARE_VERSION)
            .or(creator.hardware_version);
    }

    fn on_record(&mut self, header: u8, message: &Message) -> Result<(), Error> {
        if !self.file_id_seen {
            return Err(Error::MissingFileId);
        }
        let timestamp = match message.field_u32(profile::TIMESTAMP) {
            Some(timestamp) => timestamp,
            None => {
                let previous = self.last_timestamp.ok_or(Error::MissingTimestampReference)?;
                match header.compressed() {
                    true => reconstruct_timestamp(previous, header.time_offset()),
                    // No timestamp at all: the sample shares the previous
                    // record's second.
                    false => previous,
                }
            }
        };
        let point = Trackpoint {
            timestamp,
            latitude: message
                .field_i32(profile::record::POSITION_LAT)
                .map(profile::semicircles_to_degrees),
            longitude: message
                .field_i32(profile::record::POSITION_LONG)
                .map(profile::semicircles_to_degrees),
            altitude: message
                .field_u16(profile::record::ALTITUDE)
                .map(profile::altitude_to_meters),
            heart_rate: message.field_u8(profile::record::HEART_RATE),
            cadence: message.field_u8(profile::record::CADENCE),
            power: message.field_u16(profile::record::POWER),
            distance: message
                .field_u32(profile::record::DISTANCE)
                .map(profile::distance_to_meters),
            speed: message
                .field_u16(profile::record::SPEED)
                .map(profile::speed_to_mps),
            temperature: message.field_i8(profile::record::TEMPERATURE),
        };
        self.last_timestamp = Some(timestamp);
        if self.open.start_time.is_none() {
            self.open.start_time = Some(timestamp);
        }
        self.open.trackpoints.push(point);
        Ok(())
    }

    fn on_session(&mut self, message: &Message) {
        if let Some(sport) = message.field_u8(profile::session::SPORT) {
            self.sport = Some(match sport {
                profile::session::SPORT_RUNNING => Sport::Running,
                profile::session::SPORT_CYCLING => Sport::Biking,
                _ => Sport::Other,
            });
        }
    }

    fn on_event(&mut self, message: &Message) {
        match message.field_u8(profile::event::EVENT) {
            // A lap marker closes the lap without summary stats.
            Some(profile::event::EVENT_LAP) => self.close_lap(None),
            Some(profile::event::EVENT_TIMER) => {
                match message.field_u8(profile::event::EVENT_TYPE) {
                    Some(profile::event::EVENT_TYPE_START) => {
                        if !self.timer_running {
                            debug!("timer started");
                        }
                        self.timer_running = true;
                    }
                    Some(profile::event::EVENT_TYPE_STOP)
                    | Some(profile::event::EVENT_TYPE_STOP_ALL) => {
                        if self.timer_running {
                            debug!("timer stopped");
                        }
                        self.timer_running = false;
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    /// Finalizes the open lap and starts a new one. Summary stats from a lap
    /// message win; anything missing is derived from the lap's trackpoints.
    fn close_lap(&mut self, message: Option<&Message>) {
        let open = std::mem::take(&mut self.open);
        if open.trackpoints.is_empty() && message.is_none() {
            return;
        }
        let points = open.trackpoints;

        let start_time = message
            .and_then(|m| m.field_u32(profile::lap::START_TIME))
            .or(open.start_time)
            .or_else(|| message.and_then(|m| m.field_u32(profile::TIMESTAMP)))
            .or(self.last_timestamp)
            .unwrap_or(0);
        let total_time = message
            .and_then(|m| m.field_u32(profile::lap::TOTAL_TIMER_TIME))
            .or_else(|| message.and_then(|m| m.field_u32(profile::lap::TOTAL_ELAPSED_TIME)))
            .map(profile::ms_to_seconds)
            .or_else(|| timestamp_span(&points))
            .unwrap_or(0.0);
        let distance = message
            .and_then(|m| m.field_u32(profile::lap::TOTAL_DISTANCE))
            .map(profile::distance_to_meters)
            .or_else(|| distance_span(&points))
            .unwrap_or(0.0);
        let max_speed = message
            .and_then(|m| m.field_u16(profile::lap::MAX_SPEED))
            .map(profile::speed_to_mps)
            .or_else(|| max_f64(points.iter().filter_map(|p| p.speed)));
        let avg_heart_rate = message
            .and_then(|m| m.field_u8(profile::lap::AVG_HEART_RATE))
            .or_else(|| mean_u8(points.iter().filter_map(|p| p.heart_rate)));
        let max_heart_rate = message
            .and_then(|m| m.field_u8(profile::lap::MAX_HEART_RATE))
            .or_else(|| points.iter().filter_map(|p| p.heart_rate).max());
        let avg_cadence = message
            .and_then(|m| m.field_u8(profile::lap::AVG_CADENCE))
            .or_else(|| mean_u8(points.iter().filter_map(|p| p.cadence)));

        self.laps.push(Lap {
            start_time,
            total_time,
            distance,
            calories: message.and_then(|m| m.field_u16(profile::lap::TOTAL_CALORIES)),
            max_speed,
            avg_heart_rate,
            max_heart_rate,
            avg_cadence,
            trackpoints: points,
        });
    }
}

/// Rebuilds an absolute timestamp from the five offset bits of a
/// compressed-timestamp record header. The offset replaces the low five bits
/// of the previous timestamp, rolling forward by 32 seconds when that would
/// move backwards.
fn reconstruct_timestamp(previous: u32, offset: u8) -> u32 {
    let candidate = (previous & !0x1f) | u32::from(offset);
    match candidate < previous {
        true => candidate + 0x20,
        false => candidate,
    }
}

/// Arithmetic mean of the present samples, rounded to the nearest integer.
fn mean_u8(values: impl Iterator<Item = u8>) -> Option<u8> {
    let (count, sum) = values.fold((0u32, 0u64), |(count, sum), value| {
        (count + 1, sum + u64::from(value))
    });
    match count {
        0 => None,
        _ => Some((sum as f64 / f64::from(count)).round() as u8),
    }
}

fn max_f64(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |best, value| {
        Some(best.map_or(value, |best: f64| best.max(value)))
    })
}

fn timestamp_span(points: &[Trackpoint]) -> Option<f64> {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => Some(f64::from(last.timestamp.saturating_sub(first.timestamp))),
        _ => None,
    }
}

fn distance_span(points: &[Trackpoint]) -> Option<f64> {
    let first = points.iter().find_map(|p| p.distance)?;
    let last = points.iter().rev().find_map(|p| p.distance)?;
    Some(last - first)
}
