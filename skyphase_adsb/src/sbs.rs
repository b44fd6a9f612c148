/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::{fmt, str::FromStr};
use chrono::{DateTime, Utc, NaiveDate, NaiveTime, TimeZone, offset::LocalResult};
use chrono_tz::Tz;
use crate::errors::{Result, SkyphaseAdsbError, parse_error};

/// the type tag all records we process have to start with
pub const MSG_TYPE: &'static str = "MSG";

/// we need at least up to (including) the longitude field
pub const MIN_FIELDS: usize = 16;

const ID: usize = 4;
const DATE: usize = 6;
const TIME: usize = 7;
const ALTITUDE: usize = 11;
const SPEED: usize = 12;
const LATITUDE: usize = 14;
const LONGITUDE: usize = 15;

/// the per-record data we extract from SBS messages. Absent source fields are None, not 0
#[derive(Debug,Clone,PartialEq)]
pub struct SurveillanceUpdate {
    pub id: String,
    pub altitude: Option<i32>,   // ft
    pub speed: Option<u32>,      // kt
    pub latitude: Option<f64>,   // deg
    pub longitude: Option<f64>,  // deg
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for SurveillanceUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "SurveillanceUpdate( id: {}, time: {}", self.id, self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"))?;
        if let Some(alt) = self.altitude { write!( f, ", alt: {alt}")?; }
        if let Some(spd) = self.speed { write!( f, ", spd: {spd}")?; }
        if let (Some(lat),Some(lon)) = (self.latitude,self.longitude) { write!( f, ", pos: ({lat:.5},{lon:.5})")?; }
        write!( f, " )")
    }
}

/// SBS as documented on http://woodair.net/SBS/Article/Barebones42_Socket_Data.htm
///
/// Message examples:
///  MSG,1,111,11111,AA2BC2,111111,2016/03/11,13:07:16.663,2016/03/11,13:07:16.626,UAL814  ,,,,,,,,,,,0
///  MSG,3,111,11111,A04424,111111,2016/03/11,13:07:05.343,2016/03/11,13:07:05.288,,11025,,,37.17274,-122.03935,,,,,,0
///  MSG,4,111,11111,AC1FCC,111111,2016/03/11,13:07:07.777,2016/03/11,13:07:07.713,,,316,106,,,1536,,,,,0
///
/// fields we use:
///   0: message type (MSG, SEL, ID, AIR, STA, CLK) - only MSG is processed
///   4: entity id (ICAO 24 bit id or flight id, depending on source)
///   6: date generated
///   7: time generated (with fractional seconds)
///  11: mode-C altitude (relative to 1013.2mb (Flight Level), *not* AMSL)
///  12: ground speed
///  14: latitude
///  15: longitude
///
/// Any field that is present but cannot be converted makes the whole record invalid. We never
/// return partial updates
pub fn parse_msg (line: &str, source_tz: &Tz)->Result<SurveillanceUpdate> {
    let fields: Vec<&str> = line.trim().split(',').collect();

    if fields.len() < MIN_FIELDS {
        return Err( parse_error!( "expected at least {} fields, got {}", MIN_FIELDS, fields.len()))
    }
    if !fields[0].starts_with( MSG_TYPE) {
        return Err( parse_error!( "not a {} record: {}", MSG_TYPE, fields[0]))
    }

    let id = fields[ID].trim();
    if id.is_empty() {
        return Err( parse_error!( "empty entity id"))
    }

    let altitude: Option<i32> = optional_field( &fields, ALTITUDE, "altitude")?;
    let speed: Option<u32> = optional_field( &fields, SPEED, "speed")?;
    let latitude = optional_coordinate( &fields, LATITUDE, "latitude", 90.0)?;
    let longitude = optional_coordinate( &fields, LONGITUDE, "longitude", 180.0)?;
    let timestamp = get_utc_datetime( fields[DATE].trim(), fields[TIME].trim(), source_tz)?;

    Ok( SurveillanceUpdate { id: id.to_string(), altitude, speed, latitude, longitude, timestamp } )
}

fn optional_field<T> (fields: &[&str], idx: usize, name: &str)->Result<Option<T>> where T: FromStr, T::Err: fmt::Display {
    let s = fields[idx].trim();
    if s.is_empty() {
        Ok(None)
    } else {
        s.parse::<T>().map( Some).map_err( |e| parse_error!( "invalid {} '{}': {}", name, s, e))
    }
}

fn optional_coordinate (fields: &[&str], idx: usize, name: &str, max_abs: f64)->Result<Option<f64>> {
    match optional_field::<f64>( fields, idx, name)? {
        Some(v) if !v.is_finite() || v.abs() > max_abs => Err( parse_error!( "{} out of range: {}", name, v)),
        v => Ok(v)
    }
}

// note that dump1090 does report time in local timezone, i.e. we have to convert to UTC
pub fn get_utc_datetime (date: &str, time: &str, tz: &Tz)->Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str( date, "%Y/%m/%d")?;
    let time = NaiveTime::parse_from_str( time, "%H:%M:%S%.f")?;

    let dt = match tz.from_local_datetime( &date.and_time(time)) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(_, dt2) => dt2, // we don't care about that precision
        LocalResult::None => return Err( SkyphaseAdsbError::OpFailedError("forward time jump cannot be mapped to UTC".into())),
    };
    Ok( dt.with_timezone( &Utc) )
}
