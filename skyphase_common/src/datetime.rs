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

use std::time::Duration;
use chrono::{DateTime,Utc};
use serde::{Deserialize,Deserializer,Serializer};
use parse_duration::parse;

// simple Duration ctor wrappers that read better in configs and tests
#[inline] pub fn millis (n: u64)->Duration { Duration::from_millis(n) }
#[inline] pub fn secs (n: u64)->Duration { Duration::from_secs(n) }
#[inline] pub fn secs_f64 (n: f64)->Duration { Duration::from_secs_f64(n) }
#[inline] pub fn minutes (n: u64)->Duration { Duration::from_secs(n * 60) }

/// this should be used wherever we might have to use sim clock instead of wall clock
#[inline]
pub fn utc_now()->DateTime<Utc> {
    Utc::now()
}

/// signed, fractional seconds between two dates (negative if `dt_later` is before `dt_earlier`)
pub fn elapsed_secs (dt_later: &DateTime<Utc>, dt_earlier: &DateTime<Utc>)->f64 {
    let dt = *dt_later - *dt_earlier;
    match dt.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => dt.num_milliseconds() as f64 / 1000.0
    }
}

//--- support for serde

pub fn deserialize_duration <'a,D>(deserializer: D) -> Result<Duration,D::Error>
    where D: Deserializer<'a>
{
    String::deserialize(deserializer).and_then( |string| {
        parse(string.as_str())
            .map_err( |e| serde::de::Error::custom(format!("{:?}",e)))
    })
}

pub fn deserialize_optional_duration <'a,D>(deserializer: D) -> Result<Option<Duration>,D::Error>
    where D: Deserializer<'a>
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    if let Some(s) = s {
        let d =  parse(s.as_str()).map_err( |e| serde::de::Error::custom(format!("{:?}",e)))?;
        return Ok( Some(d) )
    }

    Ok(None)
}

pub fn serialize_duration<S: Serializer> (dur: &Duration, s: S) -> Result<S::Ok, S::Error>  {
    let dfm = format!("{:?}", dur);
    s.serialize_str(&dfm)
}

pub fn serialize_optional_duration<S>(dur: &Option<Duration>, s: S) -> Result<S::Ok, S::Error>
    where S: Serializer,
{
    if let Some(ref d) = *dur {
        let dfm = format!("{:?}", d);
        return s.serialize_some(&dfm);
    }
    s.serialize_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_elapsed_secs () {
        let t0 = Utc.with_ymd_and_hms( 2024, 1, 1, 12, 0, 0).unwrap();
        let t1 = t0 + chrono::TimeDelta::milliseconds(5250);
        assert_eq!( elapsed_secs( &t1, &t0), 5.25);
        assert_eq!( elapsed_secs( &t0, &t1), -5.25);
        assert_eq!( elapsed_secs( &t0, &t0), 0.0);
    }
}
