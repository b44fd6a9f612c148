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

use std::sync::{RwLock, atomic::{AtomicU64,Ordering}};
use serde::{Serialize,Deserialize};
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::watch;
use skyphase_classify::PhaseLabel;

/// where published results come from
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub enum DataMode {
    Live,
    Synthetic
}

impl DataMode {
    pub fn toggled (&self)->Self {
        match self {
            DataMode::Live => DataMode::Synthetic,
            DataMode::Synthetic => DataMode::Live
        }
    }
}

/// the latest classification of an entity. Field names are what dashboard clients expect
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct ClassificationResult {
    pub flight: String,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub phase: PhaseLabel,
    pub last_phase: PhaseLabel,
}

/// pipeline counters. These are only used for observability
#[derive(Debug,Default)]
pub struct PipelineStats {
    lines: AtomicU64,
    parse_failures: AtomicU64,
    classify_failures: AtomicU64,
    published: AtomicU64,
    connects: AtomicU64,
    disconnects: AtomicU64,
}

macro_rules! counter {
    ($field:ident, $inc:ident) => {
        pub fn $field (&self)->u64 { self.$field.load(Ordering::Relaxed) }
        pub(crate) fn $inc (&self) { self.$field.fetch_add( 1, Ordering::Relaxed); }
    }
}

impl PipelineStats {
    counter!( lines, inc_lines);
    counter!( parse_failures, inc_parse_failures);
    counter!( classify_failures, inc_classify_failures);
    counter!( published, inc_published);
    counter!( connects, inc_connects);
    counter!( disconnects, inc_disconnects);
}

/// the published results surface that is shared between the pipeline (writer) and any number of readers.
/// Results are per entity and overwritten by each new classification. Readers always see complete
/// results since entries are replaced as a whole under the map shard lock
pub struct PhaseStore {
    source: String,
    results: DashMap<String,ClassificationResult>,
    synthetic: RwLock<Vec<ClassificationResult>>, // replaced as a whole by the synthetic generator
    mode: watch::Sender<DataMode>,
    stats: PipelineStats,
}

impl PhaseStore {
    pub fn new (source: impl Into<String>, mode: DataMode)->Self {
        let (mode,_) = watch::channel( mode);
        PhaseStore {
            source: source.into(),
            results: DashMap::new(),
            synthetic: RwLock::new( Vec::new()),
            mode,
            stats: PipelineStats::default(),
        }
    }

    pub fn source (&self)->&str { self.source.as_str() }

    pub fn stats (&self)->&PipelineStats { &self.stats }

    //--- live results

    pub fn publish (&self, result: ClassificationResult) {
        self.results.insert( result.flight.clone(), result);
        self.stats.inc_published();
    }

    /// publish a new phase for `id`, recording the phase of its previous result as `last_phase`
    pub fn publish_classification (&self, id: &str, lat: Option<f64>, long: Option<f64>, phase: PhaseLabel)->ClassificationResult {
        let result = match self.results.entry( id.to_string()) {
            Entry::Occupied(mut e) => {
                let last_phase = e.get().phase.clone();
                let result = ClassificationResult { flight: id.to_string(), lat, long, phase, last_phase };
                e.insert( result.clone());
                result
            }
            Entry::Vacant(e) => {
                let result = ClassificationResult { flight: id.to_string(), lat, long, phase, last_phase: PhaseLabel::unknown() };
                e.insert( result.clone());
                result
            }
        };

        self.stats.inc_published();
        result
    }

    pub fn get (&self, id: &str)->Option<ClassificationResult> {
        self.results.get( id).map( |e| e.value().clone())
    }

    pub fn remove (&self, id: &str)->Option<ClassificationResult> {
        self.results.remove( id).map( |(_,r)| r)
    }

    pub fn len (&self)->usize { self.results.len() }

    pub fn is_empty (&self)->bool { self.results.is_empty() }

    pub fn live_snapshot (&self)->Vec<ClassificationResult> {
        self.results.iter().map( |e| e.value().clone()).collect()
    }

    //--- synthetic results

    pub fn set_synthetic (&self, results: Vec<ClassificationResult>) {
        let mut synthetic = self.synthetic.write().unwrap_or_else( |e| e.into_inner());
        *synthetic = results;
    }

    pub fn synthetic_snapshot (&self)->Vec<ClassificationResult> {
        self.synthetic.read().unwrap_or_else( |e| e.into_inner()).clone()
    }

    //--- what readers should use

    /// the current results according to the data mode
    pub fn snapshot (&self)->Vec<ClassificationResult> {
        match self.mode() {
            DataMode::Live => self.live_snapshot(),
            DataMode::Synthetic => self.synthetic_snapshot()
        }
    }

    pub fn snapshot_json (&self)->serde_json::Result<String> {
        serde_json::to_string( &self.snapshot())
    }

    //--- mode control

    pub fn mode (&self)->DataMode { *self.mode.borrow() }

    /// set mode and return true if this was a change
    pub fn set_mode (&self, new_mode: DataMode)->bool {
        self.mode.send_if_modified( |mode| {
            if *mode != new_mode {
                *mode = new_mode;
                true
            } else {
                false
            }
        })
    }

    /// switch between live and synthetic and return the new mode
    pub fn toggle_mode (&self)->DataMode {
        let mut new_mode = DataMode::Live;
        self.mode.send_modify( |mode| {
            *mode = mode.toggled();
            new_mode = *mode;
        });
        new_mode
    }

    pub fn subscribe_mode (&self)->watch::Receiver<DataMode> {
        self.mode.subscribe()
    }
}
