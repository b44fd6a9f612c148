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

use std::{sync::Arc, time::Duration};
use chrono_tz::Tz;
use tokio::{
    io::{AsyncReadExt,AsyncWriteExt}, net::TcpStream, sync::watch, task::JoinHandle,
    time::{self, Interval, MissedTickBehavior, error::Elapsed}
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, trace};
use skyphase_classify::{FeatureVector, PhaseClassifier, errors::ClassifyError};
use skyphase_common::datetime;

use crate::{
    PipelineConfig, errors::{Result,SkyphaseAdsbError}, framer::LineFramer, sbs::parse_msg, tracker::EntityTracker,
    store::{ClassificationResult,DataMode,PhaseStore}, synthetic::SyntheticGenerator
};

/// the connection state of a running pipeline
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum PipelineState {
    Disconnected,
    Connecting,
    Streaming,
    Terminated
}

/// exponential reconnect delay. Each `next_delay()` doubles the delay until it reaches `max`
#[derive(Debug,Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new (min: Duration, max: Duration)->Self {
        let max = max.max(min);
        Backoff { min, max, current: min }
    }

    pub fn next_delay (&mut self)->Duration {
        let delay = self.current;
        self.current = self.current.checked_mul(2).map( |d| d.min(self.max)).unwrap_or(self.max);
        delay
    }

    pub fn reset (&mut self) {
        self.current = self.min;
    }
}

/* #region record processing *************************************************************************************/

/// the synchronous per-record part of the pipeline: parse, update entity state, classify and publish.
/// This does not know anything about transports, which is why we can use it on its own.
///
/// Note that classification needs both altitude and speed of the same record by default. Feeds such as
/// dump1090 report altitude only in MSG,3 (airborne position) and speed only in MSG,4 (airborne velocity)
/// records, which means nothing gets published for them unless feature fill is enabled with
/// [`RecordProcessor::with_feature_fill`]. Filled values are the most recent present ones of the entity.
/// They only go into the feature vector, rates are still computed from the values of the records
pub struct RecordProcessor {
    tracker: Arc<EntityTracker>,
    classifier: Arc<PhaseClassifier>,
    store: Arc<PhaseStore>,
    source_tz: Tz,
    fill_features: bool,
}

impl RecordProcessor {
    pub fn new (tracker: Arc<EntityTracker>, classifier: Arc<PhaseClassifier>, store: Arc<PhaseStore>, source_tz: Tz)->Self {
        RecordProcessor { tracker, classifier, store, source_tz, fill_features: false }
    }

    /// fill absent altitude or speed with the last known value of the entity
    pub fn with_feature_fill (mut self, fill_features: bool)->Self {
        self.fill_features = fill_features;
        self
    }

    /// process a single framed line. Parse errors leave the entity state untouched, classifier errors
    /// happen after the entity state got updated but do not publish anything
    pub fn process_line (&self, line: &str)->Result<ClassificationResult> {
        let update = parse_msg( line, &self.source_tz)?;
        let (rates, state) = self.tracker.update_with_state( &update.id, update.altitude, update.speed, update.timestamp);

        let (altitude, speed) = if self.fill_features {
            (state.last_altitude, state.last_speed)
        } else {
            (update.altitude, update.speed)
        };
        let features = FeatureVector::new(
            altitude.map(f64::from), speed.map(f64::from),
            rates.altitude_rate, rates.speed_rate
        );
        let phase = self.classifier.classify( &features)?;

        Ok( self.store.publish_classification( &update.id, update.latitude, update.longitude, phase) )
    }

    /// process a batch of lines, skipping (and counting) the ones that fail
    pub fn process_lines (&self, lines: Vec<String>) {
        let stats = self.store.stats();

        for line in lines {
            stats.inc_lines();
            match self.process_line( &line) {
                Ok(result) => trace!("{} : {} -> {}", result.flight, result.last_phase, result.phase),
                Err(SkyphaseAdsbError::ClassifyError(e)) => {
                    stats.inc_classify_failures();
                    match e {
                        ClassifyError::IncompleteFeatures(_) => debug!("not classified: {e}"),
                        _ => warn!("classification failed for {:?}: {e}", line)
                    }
                }
                Err(e) => {
                    stats.inc_parse_failures();
                    debug!("ignored {:?}: {e}", line);
                }
            }
        }
    }
}

/* #endregion record processing */

/* #region pipeline *********************************************************************************************/

/// the pipeline before it runs. This owns the shared state so that it can be handed out before the
/// pipeline task is spawned
pub struct PhasePipeline {
    config: PipelineConfig,
    classifier: Arc<PhaseClassifier>,
    tracker: Arc<EntityTracker>,
    store: Arc<PhaseStore>,
}

impl PhasePipeline {
    pub fn new (config: PipelineConfig, classifier: Arc<PhaseClassifier>)->Self {
        let mode = if config.synthetic { DataMode::Synthetic } else { DataMode::Live };
        let store = Arc::new( PhaseStore::new( config.source.clone(), mode));
        store.set_synthetic( config.synthetic_flights.iter().map( |f| f.to_result()).collect());
        let tracker = Arc::new( EntityTracker::new());

        PhasePipeline { config, classifier, tracker, store }
    }

    pub fn store (&self)->&Arc<PhaseStore> { &self.store }

    pub fn tracker (&self)->&Arc<EntityTracker> { &self.tracker }

    /// start the pipeline task. Needs to be called from within a tokio runtime
    pub fn spawn (self)->PipelineHandle {
        let PhasePipeline { config, classifier, tracker, store } = self;

        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel( PipelineState::Disconnected);

        let runner = Runner {
            processor: RecordProcessor::new( tracker.clone(), classifier, store.clone(), config.timezone)
                .with_feature_fill( config.fill_missing_features),
            generator: SyntheticGenerator::new( config.synthetic_flights.clone(), config.synthetic_jitter),
            backoff: Backoff::new( config.min_reconnect_delay, config.max_reconnect_delay),
            tracker: tracker.clone(),
            store: store.clone(),
            cancel: cancel.clone(),
            state: state_tx,
            config,
        };
        let task = tokio::spawn( runner.run());

        PipelineHandle { store, tracker, state: state_rx, cancel, task: Some(task) }
    }
}

/// the control interface of a running pipeline. Dropping the handle stops the pipeline task
pub struct PipelineHandle {
    store: Arc<PhaseStore>,
    tracker: Arc<EntityTracker>,
    state: watch::Receiver<PipelineState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    pub fn store (&self)->&Arc<PhaseStore> { &self.store }

    pub fn tracker (&self)->&Arc<EntityTracker> { &self.tracker }

    pub fn state (&self)->PipelineState { *self.state.borrow() }

    pub fn subscribe_state (&self)->watch::Receiver<PipelineState> { self.state.clone() }

    pub fn mode (&self)->DataMode { self.store.mode() }

    pub fn set_mode (&self, mode: DataMode)->bool { self.store.set_mode( mode) }

    pub fn toggle_mode (&self)->DataMode { self.store.toggle_mode() }

    /// stop the pipeline task and wait until it has closed its connection
    pub async fn shutdown (mut self)->Result<()> {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.await.map_err( |e| SkyphaseAdsbError::OpFailedError( format!("pipeline task failed: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for PipelineHandle {
    fn drop (&mut self) {
        self.cancel.cancel();
    }
}

/// an open transport. The framer is per connection since a fragment of a closed connection can never be completed
struct Connection {
    stream: TcpStream,
    framer: LineFramer,
    addr: String,
}

impl Connection {
    async fn close (mut self) {
        if self.framer.has_fragment() {
            debug!("discarding {} bytes of incomplete record from {}", self.framer.fragment().len(), self.addr);
        }
        if let Err(e) = self.stream.shutdown().await {
            debug!("error closing connection to {}: {e}", self.addr);
        }
    }
}

enum Event {
    Cancel,
    ModeChange,
    SyntheticTick,
    Evict,
    Connect( std::result::Result<std::io::Result<TcpStream>,Elapsed>),
    Read( std::io::Result<usize>),
}

/// the state of the pipeline task
struct Runner {
    config: PipelineConfig,
    processor: RecordProcessor,
    generator: SyntheticGenerator,
    backoff: Backoff,
    tracker: Arc<EntityTracker>,
    store: Arc<PhaseStore>,
    cancel: CancellationToken,
    state: watch::Sender<PipelineState>,
}

impl Runner {
    async fn run (mut self) {
        info!("pipeline for {} started in {:?} mode", self.config.url, self.store.mode());

        let cancel = self.cancel.clone();
        let mut mode_rx = self.store.subscribe_mode();
        let mut synthetic_ticker = ticker( self.config.synthetic_interval);
        let mut eviction_ticker = ticker( self.config.eviction_interval);
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        let mut conn: Option<Connection> = None;

        loop {
            let mode = *mode_rx.borrow_and_update();

            let event = match (mode, conn.as_mut()) {
                (DataMode::Synthetic, _) => tokio::select! {
                    _ = cancel.cancelled() => Event::Cancel,
                    Ok(()) = mode_rx.changed() => Event::ModeChange,
                    _ = synthetic_ticker.tick() => Event::SyntheticTick,
                    _ = eviction_ticker.tick() => Event::Evict,
                },
                (DataMode::Live, Some(c)) => tokio::select! {
                    _ = cancel.cancelled() => Event::Cancel,
                    Ok(()) = mode_rx.changed() => Event::ModeChange,
                    _ = eviction_ticker.tick() => Event::Evict,
                    res = c.stream.read( &mut buf) => Event::Read(res),
                },
                (DataMode::Live, None) => {
                    self.set_state( PipelineState::Connecting);
                    tokio::select! {
                        _ = cancel.cancelled() => Event::Cancel,
                        Ok(()) = mode_rx.changed() => Event::ModeChange,
                        res = time::timeout( self.config.connect_timeout, TcpStream::connect( &self.config.url)) => Event::Connect(res),
                    }
                }
            };

            let reconnect_delay = match event {
                Event::Cancel => break,

                Event::ModeChange => {
                    let mode = *mode_rx.borrow();
                    info!("switched to {:?} mode", mode);
                    if conn.is_none() { // a pending connect attempt was dropped
                        self.set_state( PipelineState::Disconnected);
                    }
                    None
                }

                Event::SyntheticTick => {
                    self.store.set_synthetic( self.generator.next());
                    None
                }

                Event::Evict => {
                    self.evict();
                    None
                }

                Event::Connect(Ok(Ok(stream))) => {
                    info!("connected to {}", self.config.url);
                    self.store.stats().inc_connects();
                    conn = Some( Connection { stream, framer: LineFramer::new(), addr: self.config.url.clone() });
                    self.set_state( PipelineState::Streaming);
                    None
                }
                Event::Connect(Ok(Err(e))) => {
                    warn!("failed to connect to {}: {e}", self.config.url);
                    Some( self.backoff.next_delay())
                }
                Event::Connect(Err(_)) => {
                    warn!("connect to {} timed out after {:?}", self.config.url, self.config.connect_timeout);
                    Some( self.backoff.next_delay())
                }

                Event::Read(Ok(len)) if len > 0 => {
                    if let Some(c) = conn.as_mut() {
                        self.backoff.reset();
                        let lines = c.framer.push( &buf[..len]);
                        self.processor.process_lines( lines);
                    }
                    None
                }
                Event::Read(res) => {
                    match res {
                        Ok(_) => info!("connection to {} closed by peer", self.config.url),
                        Err(e) => warn!("error reading from {}: {e}", self.config.url),
                    }
                    if let Some(c) = conn.take() {
                        c.close().await;
                    }
                    self.store.stats().inc_disconnects();
                    Some( self.backoff.next_delay())
                }
            };

            if let Some(delay) = reconnect_delay {
                self.set_state( PipelineState::Disconnected);
                debug!("reconnecting to {} in {:?}", self.config.url, delay);

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    Ok(()) = mode_rx.changed() => {} // re-evaluate on next iteration
                    _ = time::sleep( delay) => {}
                }
            }
        }

        if let Some(c) = conn.take() {
            c.close().await;
        }
        self.set_state( PipelineState::Terminated);
        info!("pipeline for {} terminated", self.config.url);
    }

    fn evict (&self) {
        if let Some(drop_after) = self.config.drop_after {
            let dropped = self.tracker.remove_stale( drop_after, datetime::utc_now());
            for id in &dropped {
                self.store.remove( id);
            }
            if !dropped.is_empty() {
                debug!("dropped {} stale entities", dropped.len());
            }
        }
    }

    fn set_state (&self, new_state: PipelineState) {
        self.state.send_if_modified( |state| {
            if *state != new_state {
                *state = new_state;
                true
            } else {
                false
            }
        });
    }
}

fn ticker (period: Duration)->Interval {
    let mut interval = time::interval( period.max( Duration::from_millis(1)));
    interval.set_missed_tick_behavior( MissedTickBehavior::Delay);
    interval
}

/* #endregion pipeline */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff () {
        let mut backoff = Backoff::new( Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!( backoff.next_delay(), Duration::from_millis(100));
        assert_eq!( backoff.next_delay(), Duration::from_millis(200));
        assert_eq!( backoff.next_delay(), Duration::from_millis(400));
        assert_eq!( backoff.next_delay(), Duration::from_millis(500));
        assert_eq!( backoff.next_delay(), Duration::from_millis(500));

        backoff.reset();
        assert_eq!( backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_bounds () {
        let mut backoff = Backoff::new( Duration::from_secs(2), Duration::from_secs(1)); // max < min
        assert_eq!( backoff.next_delay(), Duration::from_secs(2));
        assert_eq!( backoff.next_delay(), Duration::from_secs(2));

        let mut backoff = Backoff::new( Duration::MAX, Duration::MAX);
        assert_eq!( backoff.next_delay(), Duration::MAX);
        assert_eq!( backoff.next_delay(), Duration::MAX);
    }
}
