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

use serde::{Serialize,Deserialize};
use rand::{Rng, SeedableRng, rngs::StdRng};
use skyphase_classify::PhaseLabel;
use crate::store::ClassificationResult;

/// a fixed entity of the synthetic data set. Position is the start position that gets jittered
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct SyntheticFlight {
    pub flight: String,
    pub lat: f64,
    pub long: f64,
    pub phase: PhaseLabel,
    pub last_phase: PhaseLabel,
}

impl SyntheticFlight {
    pub fn new (flight: &str, lat: f64, long: f64, phase: &str, last_phase: &str)->Self {
        SyntheticFlight { flight: flight.to_string(), lat, long, phase: phase.into(), last_phase: last_phase.into() }
    }

    pub fn to_result (&self)->ClassificationResult {
        ClassificationResult {
            flight: self.flight.clone(),
            lat: Some(self.lat),
            long: Some(self.long),
            phase: self.phase.clone(),
            last_phase: self.last_phase.clone(),
        }
    }
}

/// the demo flights shown when there is no live data
pub fn default_flights ()->Vec<SyntheticFlight> {
    vec![
        SyntheticFlight::new( "BG101", 23.81, 90.41, "Climb", "Cruise"),
        SyntheticFlight::new( "AI223", 24.21, 88.93, "Descent", "Cruise"),
        SyntheticFlight::new( "EK582", 22.82, 91.18, "Cruise", "Climb"),
        SyntheticFlight::new( "QF109", 25.02, 89.23, "Climb", "Climb"),
        SyntheticFlight::new( "QR404", 24.50, 90.23, "Descent", "Cruise"),
    ]
}

/// random walk over a fixed set of flights. Each step moves every flight by up to +-jitter degrees
/// in lat and lon. Labels never change
pub struct SyntheticGenerator {
    flights: Vec<SyntheticFlight>,
    jitter: f64,
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new (flights: Vec<SyntheticFlight>, jitter: f64)->Self {
        Self::with_rng( flights, jitter, StdRng::from_os_rng())
    }

    /// a reproducible generator
    pub fn with_seed (flights: Vec<SyntheticFlight>, jitter: f64, seed: u64)->Self {
        Self::with_rng( flights, jitter, StdRng::seed_from_u64(seed))
    }

    fn with_rng (flights: Vec<SyntheticFlight>, jitter: f64, rng: StdRng)->Self {
        let jitter = if jitter.is_finite() { jitter.abs() } else { 0.0 };
        SyntheticGenerator { flights, jitter, rng }
    }

    pub fn flights (&self)->&[SyntheticFlight] { self.flights.as_slice() }

    pub fn jitter (&self)->f64 { self.jitter }

    /// results for the current positions without moving the flights
    pub fn current (&self)->Vec<ClassificationResult> {
        self.flights.iter().map( |f| f.to_result()).collect()
    }

    /// jitter all flights and return the new results
    pub fn next (&mut self)->Vec<ClassificationResult> {
        let j = self.jitter;
        for f in &mut self.flights {
            f.lat += self.rng.random_range( -j..=j);
            f.long += self.rng.random_range( -j..=j);
        }
        self.current()
    }
}
