//! Serializes a finished [`Activity`] into a TCX document.
//!
//! Optional values that were never recorded produce no elements at all;
//! emitting zeros would imply precision the device never provided. Float
//! formatting goes through `format!`, which always uses `.` as the decimal
//! separator, so output is valid regardless of the host locale.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::errors::Error;
use crate::model::{Activity, Lap, Trackpoint};
use crate::timestamp;

const TCX_NS: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2 \
     http://www.garmin.com/xmlschemas/TrainingCenterDatabasev2.xsd";
const TPX_NS: &str = "http://www.garmin.com/xmlschemas/ActivityExtension/v2";

/// Renders the workout as TCX text.
pub fn render(activity: &Activity) -> Result<String, Error> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;

    let mut root = BytesStart::new("TrainingCenterDatabase");
    root.push_attribute(("xmlns", TCX_NS));
    root.push_attribute(("xmlns:xsi", XSI_NS));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("Activities")))?;

    let mut element = BytesStart::new("Activity");
    element.push_attribute(("Sport", activity.sport.tcx_name()));
    writer.write_event(Event::Start(element))?;
    let id = timestamp::format_utc(activity.start_time.unwrap_or(0));
    text(&mut writer, "Id", &id)?;
    for lap in &activity.laps {
        write_lap(&mut writer, lap)?;
    }
    write_creator(&mut writer, activity)?;
    writer.write_event(Event::End(BytesEnd::new("Activity")))?;

    writer.write_event(Event::End(BytesEnd::new("Activities")))?;
    writer.write_event(Event::End(BytesEnd::new("TrainingCenterDatabase")))?;

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn write_lap<W: Write>(writer: &mut Writer<W>, lap: &Lap) -> Result<(), Error> {
    let mut element = BytesStart::new("Lap");
    element.push_attribute(("StartTime", timestamp::format_utc(lap.start_time).as_str()));
    writer.write_event(Event::Start(element))?;

    text(writer, "TotalTimeSeconds", &format!("{:.2}", lap.total_time))?;
    text(writer, "DistanceMeters", &format!("{:.2}", lap.distance))?;
    if let Some(max_speed) = lap.max_speed {
        text(writer, "MaximumSpeed", &format!("{max_speed:.3}"))?;
    }
    // Calories is schema-required; devices that never counted report zero.
    text(writer, "Calories", &lap.calories.unwrap_or(0).to_string())?;
    if let Some(average) = lap.avg_heart_rate {
        wrapped_value(writer, "AverageHeartRateBpm", &average.to_string())?;
    }
    if let Some(maximum) = lap.max_heart_rate {
        wrapped_value(writer, "MaximumHeartRateBpm", &maximum.to_string())?;
    }
    text(writer, "Intensity", "Active")?;
    if let Some(cadence) = lap.avg_cadence {
        text(writer, "Cadence", &cadence.to_string())?;
    }
    text(writer, "TriggerMethod", "Manual")?;

    writer.write_event(Event::Start(BytesStart::new("Track")))?;
    for point in &lap.trackpoints {
        write_trackpoint(writer, point)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Track")))?;

    writer.write_event(Event::End(BytesEnd::new("Lap")))?;
    Ok(())
}

fn write_trackpoint<W: Write>(writer: &mut Writer<W>, point: &Trackpoint) -> Result<(), Error> {
    writer.write_event(Event::Start(BytesStart::new("Trackpoint")))?;
    text(writer, "Time", &timestamp::format_utc(point.timestamp))?;
    if let (Some(latitude), Some(longitude)) = (point.latitude, point.longitude) {
        writer.write_event(Event::Start(BytesStart::new("Position")))?;
        text(writer, "LatitudeDegrees", &format!("{latitude:.7}"))?;
        text(writer, "LongitudeDegrees", &format!("{longitude:.7}"))?;
        writer.write_event(Event::End(BytesEnd::new("Position")))?;
    }
    if let Some(altitude) = point.altitude {
        text(writer, "AltitudeMeters", &format!("{altitude:.2}"))?;
    }
    if let Some(distance) = point.distance {
        text(writer, "DistanceMeters", &format!("{distance:.2}"))?;
    }
    if let Some(heart_rate) = point.heart_rate {
        wrapped_value(writer, "HeartRateBpm", &heart_rate.to_string())?;
    }
    if let Some(cadence) = point.cadence {
        text(writer, "Cadence", &cadence.to_string())?;
    }
    if point.speed.is_some() || point.power.is_some() {
        writer.write_event(Event::Start(BytesStart::new("Extensions")))?;
        let mut tpx = BytesStart::new("TPX");
        tpx.push_attribute(("xmlns", TPX_NS));
        writer.write_event(Event::Start(tpx))?;
        if let Some(speed) = point.speed {
            text(writer, "Speed", &format!("{speed:.3}"))?;
        }
        if let Some(power) = point.power {
            text(writer, "Watts", &power.to_string())?;
        }
        writer.write_event(Event::End(BytesEnd::new("TPX")))?;
        writer.write_event(Event::End(BytesEnd::new("Extensions")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Trackpoint")))?;
    Ok(())
}

fn write_creator<W: Write>(writer: &mut Writer<W>, activity: &Activity) -> Result<(), Error> {
    let creator = &activity.creator;
    let mut element = BytesStart::new("Creator");
    element.push_attribute(("xsi:type", "Device_t"));
    writer.write_event(Event::Start(element))?;
    text(writer, "Name", &creator.name())?;
    text(writer, "UnitId", &creator.serial_number.unwrap_or(0).to_string())?;
    text(writer, "ProductID", &creator.product.unwrap_or(0).to_string())?;
    let software = creator.software_version.unwrap_or(0);
    writer.write_event(Event::Start(BytesStart::new("Version")))?;
    text(writer, "VersionMajor", &(software / 100).to_string())?;
    text(writer, "VersionMinor", &(software % 100).to_string())?;
    text(writer, "BuildMajor", "0")?;
    text(writer, "BuildMinor", "0")?;
    writer.write_event(Event::End(BytesEnd::new("Version")))?;
    writer.write_event(Event::End(BytesEnd::new("Creator")))?;
    Ok(())
}

fn text<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<(), Error> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn wrapped_value<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<(), Error> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    text(writer, "Value", value)?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
