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
#![allow(unused)]

use anyhow::Result;
use skyphase_common::{define_cli, check_cli};
use skyphase_classify::{load_classifier, FeatureVector};

define_cli! { ARGS [about="classify a single feature vector with the configured flight phase classifier"] =
    config: String [help="filename or path of classifier config", short, long, default_value="classifier.ron"],
    altitude: f64 [help="altitude in ft"],
    speed: f64 [help="ground speed in kt"],
    altitude_rate: f64 [help="altitude rate in ft/s", allow_hyphen_values=true],
    speed_rate: f64 [help="speed rate in kt/s", allow_hyphen_values=true]
}

fn main() -> Result<()> {
    check_cli!(ARGS);
    skyphase_common::init_tracing();

    let classifier = load_classifier( &ARGS.config)?;
    let features = FeatureVector::new( Some(ARGS.altitude), Some(ARGS.speed), ARGS.altitude_rate, ARGS.speed_rate);

    match classifier.classify( &features) {
        Ok(phase) => println!("{features} -> {phase}"),
        Err(e) => println!("classification error: {e}")
    }

    Ok(())
}
