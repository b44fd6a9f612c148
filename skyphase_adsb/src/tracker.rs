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
use dashmap::{DashMap, mapref::entry::Entry};
use skyphase_common::datetime::{self, elapsed_secs};

/// the last known kinematic state of an entity
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct EntityState {
    pub altitude: Option<i32>,
    pub speed: Option<u32>,
    pub last_altitude: Option<i32>, // most recent altitude that was present (not used for rates)
    pub last_speed: Option<u32>,    // most recent speed that was present (not used for rates)
    pub timestamp: DateTime<Utc>, // source time of last update
    pub received: DateTime<Utc>,  // wall clock time of last update (only used for eviction)
}

/// rate-of-change features relative to the previous observation of the same entity
#[derive(Debug,Clone,Copy,PartialEq,Default)]
pub struct Rates {
    pub altitude_rate: f64, // ft/s
    pub speed_rate: f64,    // kt/s
}

impl Rates {
    pub const ZERO: Rates = Rates { altitude_rate: 0.0, speed_rate: 0.0 };
}

/// per entity state store that derives rates from consecutive updates.
///
/// Entries are created by the first update for an id and only removed explicitly (`remove`, `clear`,
/// `remove_stale`). Updates for the same id are serialized by the map shard lock that is held
/// during `update`, updates for different ids do not need to synchronize with each other
#[derive(Debug,Default)]
pub struct EntityTracker {
    states: DashMap<String,EntityState>,
}

impl EntityTracker {
    pub fn new ()->Self {
        EntityTracker { states: DashMap::new() }
    }

    /// record a new observation and return the rates relative to the previous one.
    /// The first observation of an id and observations with the same timestamp as their predecessor
    /// have zero rates. In all cases the new values become the last known state.
    pub fn update (&self, id: &str, altitude: Option<i32>, speed: Option<u32>, timestamp: DateTime<Utc>)->Rates {
        self.update_with_state( id, altitude, speed, timestamp).0
    }

    /// same as `update` but also returns a copy of the new state, taken under the same lock
    pub fn update_with_state (&self, id: &str, altitude: Option<i32>, speed: Option<u32>, timestamp: DateTime<Utc>)->(Rates,EntityState) {
        let received = datetime::utc_now();

        if let Some(mut state) = self.states.get_mut( id) {
            let rates = advance( &mut state, altitude, speed, timestamp, received);
            return (rates, *state)
        }

        match self.states.entry( id.to_string()) {
            Entry::Occupied(mut e) => { // somebody else was faster
                let rates = advance( e.get_mut(), altitude, speed, timestamp, received);
                (rates, *e.get())
            }
            Entry::Vacant(e) => {
                let state = EntityState { altitude, speed, last_altitude: altitude, last_speed: speed, timestamp, received };
                e.insert( state);
                (Rates::ZERO, state)
            }
        }
    }

    pub fn get (&self, id: &str)->Option<EntityState> {
        self.states.get( id).map( |e| *e.value())
    }

    pub fn contains (&self, id: &str)->bool { self.states.contains_key( id) }

    pub fn len (&self)->usize { self.states.len() }

    pub fn is_empty (&self)->bool { self.states.is_empty() }

    pub fn remove (&self, id: &str)->Option<EntityState> {
        self.states.remove( id).map( |(_,state)| state)
    }

    pub fn clear (&self) { self.states.clear() }

    /// remove all entities that have not been updated within `max_age` (wall clock) and return their ids
    pub fn remove_stale (&self, max_age: Duration, now: DateTime<Utc>)->Vec<String> {
        let max_age_secs = max_age.as_secs_f64();
        let mut dropped = Vec::new();

        self.states.retain( |id,state| {
            let is_stale = elapsed_secs( &now, &state.received) > max_age_secs;
            if is_stale { dropped.push( id.clone()) }
            !is_stale
        });

        dropped
    }
}

fn advance (state: &mut EntityState, altitude: Option<i32>, speed: Option<u32>, timestamp: DateTime<Utc>, received: DateTime<Utc>)->Rates {
    let dt = elapsed_secs( &timestamp, &state.timestamp);

    let rates = if dt == 0.0 {
        Rates::ZERO
    } else {
        Rates {
            altitude_rate: rate( altitude.map(f64::from), state.altitude.map(f64::from), dt),
            speed_rate: rate( speed.map(f64::from), state.speed.map(f64::from), dt),
        }
    };

    *state = EntityState {
        altitude,
        speed,
        last_altitude: altitude.or( state.last_altitude),
        last_speed: speed.or( state.last_speed),
        timestamp,
        received
    };
    rates
}

// FIXME - zero values are treated like missing ones, which is wrong for aircraft on the ground (alt 0) or
// stopped (spd 0). We keep it for compatibility with how the classifier was trained
fn rate (current: Option<f64>, previous: Option<f64>, dt: f64)->f64 {
    match (current, previous) {
        (Some(cur), Some(prev)) if cur != 0.0 && prev != 0.0 => (cur - prev) / dt,
        _ => 0.0
    }
}
