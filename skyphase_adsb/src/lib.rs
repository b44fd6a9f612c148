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
#![doc = r#"
Flight phase classification from live SBS (BaseStation) surveillance streams.

The data flow is
```text
  TCP stream ─▶ LineFramer ─▶ parse_msg ─▶ EntityTracker ─▶ PhaseClassifier ─▶ PhaseStore
   (bytes)       (lines)      (updates)      (rates)          (labels)          (results)
```
[`PhasePipeline`] owns the connection and runs all stages in a single background task. The [`PhaseStore`]
is the shared surface from which any number of readers can obtain consistent snapshots of the latest
classification per entity. Switching the store into synthetic [`DataMode`] makes the pipeline stop
reading the transport and publish jittered demo flights instead, without dropping the connection.
"#]

use std::time::Duration;
use serde::{Serialize,Deserialize};
use chrono_tz::Tz;
use skyphase_common::{define_load_config, datetime::{deserialize_duration,deserialize_optional_duration,serialize_duration,serialize_optional_duration}};

pub mod errors;
pub use errors::{SkyphaseAdsbError,Result};

pub mod framer;
pub use framer::LineFramer;

pub mod sbs;
pub use sbs::{SurveillanceUpdate,parse_msg};

pub mod tracker;
pub use tracker::{EntityTracker,EntityState,Rates};

pub mod store;
pub use store::{PhaseStore,ClassificationResult,DataMode,PipelineStats};

pub mod synthetic;
pub use synthetic::{SyntheticFlight,SyntheticGenerator,default_flights};

pub mod pipeline;
pub use pipeline::{PhasePipeline,PipelineHandle,PipelineState,RecordProcessor,Backoff};

define_load_config!{}

/// the config for a [`PhasePipeline`], normally loaded from `phase_pipeline.ron`
#[derive(Deserialize,Serialize,Debug,Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub source: String, // the receiver station name
    pub url: String, // host:port of the SBS socket
    pub timezone: Tz, // timezone of the receiver station (used to convert local SBS times)

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub connect_timeout: Duration,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub min_reconnect_delay: Duration,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub max_reconnect_delay: Duration,

    pub read_buffer_size: usize,

    // classify records that lack altitude or speed with the last known value of the entity
    pub fill_missing_features: bool,

    pub synthetic: bool, // do we start in synthetic mode

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub synthetic_interval: Duration,

    pub synthetic_jitter: f64, // max lat/lon change per synthetic tick in degrees
    pub synthetic_flights: Vec<SyntheticFlight>,

    // entities without updates for this long are dropped. None means they are kept forever
    #[serde(deserialize_with="deserialize_optional_duration", serialize_with="serialize_optional_duration", skip_serializing_if="skyphase_common::is_none")]
    pub drop_after: Option<Duration>,

    #[serde(deserialize_with="deserialize_duration", serialize_with="serialize_duration")]
    pub eviction_interval: Duration,
}

impl Default for PipelineConfig {
    fn default ()->Self {
        PipelineConfig {
            source: "local".to_string(),
            url: "localhost:30003".to_string(),
            timezone: chrono_tz::UTC,
            connect_timeout: Duration::from_secs(5),
            min_reconnect_delay: Duration::from_millis(500),
            max_reconnect_delay: Duration::from_secs(30),
            read_buffer_size: 4096,
            fill_missing_features: false,
            synthetic: true,
            synthetic_interval: Duration::from_secs(1),
            synthetic_jitter: 0.01,
            synthetic_flights: default_flights(),
            drop_after: None,
            eviction_interval: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config () {
        let config: PipelineConfig = ron::from_str( r#"(
            url: "127.0.0.1:30003",
            timezone: "America/Los_Angeles",
            connect_timeout: "250ms",
            synthetic: false,
            drop_after: Some("2min"),
        )"#).unwrap();

        assert_eq!( config.url, "127.0.0.1:30003");
        assert_eq!( config.timezone, chrono_tz::America::Los_Angeles);
        assert_eq!( config.connect_timeout, Duration::from_millis(250));
        assert_eq!( config.drop_after, Some( Duration::from_secs(120)));
        assert!( !config.synthetic);
        assert_eq!( config.read_buffer_size, 4096);
        assert!( !config.fill_missing_features);
        assert_eq!( config.synthetic_flights.len(), 5);
    }
}
