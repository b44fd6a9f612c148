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

/// run with "cargo test --test test_pipeline -- --nocapture"

use std::{net::SocketAddr, sync::Arc, time::{Duration, Instant}};
use tokio::{io::AsyncWriteExt, net::{TcpListener, TcpSocket, TcpStream}, time::{sleep, timeout}};
use chrono_tz::Tz;
use skyphase_classify::{LinearPhaseModel, PhaseClassifier, PhaseLabel};
use skyphase_adsb::{
    DataMode, EntityTracker, PhasePipeline, PhaseStore, PipelineConfig, PipelineState, RecordProcessor,
    SkyphaseAdsbError, default_flights
};

const MSG_0: &str = "MSG,3,1,1,ABC123,1,2024/01/01,12:00:00.000,2024/01/01,12:00:00.000,,5000,250,,23.5,90.4,,,,,,\n";
const MSG_1: &str = "MSG,3,1,1,ABC123,1,2024/01/01,12:00:05.000,2024/01/01,12:00:05.000,,5200,260,,23.51,90.41,,,,,,\n";

/// classifies by altitude rate only: > 1ft/s Climb, < -1ft/s Descent, Cruise otherwise
fn rate_classifier ()->Arc<PhaseClassifier> {
    let model = LinearPhaseModel {
        classes: vec![ "Climb".into(), "Cruise".into(), "Descent".into() ],
        coef: vec![ vec![0.0, 0.0, 1.0, 0.0], vec![0.0, 0.0, 0.0, 0.0], vec![0.0, 0.0, -1.0, 0.0] ],
        intercept: vec![ -1.0, 0.0, -1.0 ],
    };
    Arc::new( PhaseClassifier::new( "rate", None, Box::new(model)))
}

fn live_config (addr: SocketAddr)->PipelineConfig {
    PipelineConfig {
        url: addr.to_string(),
        synthetic: false,
        connect_timeout: Duration::from_millis(500),
        min_reconnect_delay: Duration::from_millis(20),
        max_reconnect_delay: Duration::from_millis(100),
        synthetic_interval: Duration::from_millis(50),
        ..PipelineConfig::default()
    }
}

async fn wait_for<F> (max_wait: Duration, cond: F)->bool where F: Fn()->bool {
    let deadline = Instant::now() + max_wait;
    while Instant::now() < deadline {
        if cond() { return true }
        sleep( Duration::from_millis(10)).await;
    }
    cond()
}

fn phase_of (store: &PhaseStore, id: &str)->Option<String> {
    store.get( id).map( |r| r.phase.as_str().to_string())
}

#[test]
fn test_record_processor () {
    let tracker = Arc::new( EntityTracker::new());
    let store = Arc::new( PhaseStore::new( "test", DataMode::Live));
    let processor = RecordProcessor::new( tracker.clone(), rate_classifier(), store.clone(), Tz::UTC);

    let r = processor.process_line( MSG_0).unwrap();
    assert_eq!( r.phase.as_str(), "Cruise");
    assert!( r.last_phase.is_unknown());
    assert_eq!( (r.lat, r.long), (Some(23.5), Some(90.4)));

    let r = processor.process_line( MSG_1).unwrap();
    assert_eq!( r.phase.as_str(), "Climb"); // 40ft/s
    assert_eq!( r.last_phase.as_str(), "Cruise");
    assert_eq!( store.get("ABC123"), Some(r));

    // parse failures don't touch entity state
    let res = processor.process_line( "MSG,3,1,1,XYZ789,1,2024/01/01,12:00:00.000");
    assert!( matches!( res, Err(SkyphaseAdsbError::ParseError(_))));
    assert!( !tracker.contains( "XYZ789"));

    // classifier failures happen after the state update but don't publish
    let res = processor.process_line( "MSG,4,1,1,XYZ789,1,2024/01/01,12:00:00.000,2024/01/01,12:00:00.000,,,310,,,,,,,,,");
    assert!( matches!( res, Err(SkyphaseAdsbError::ClassifyError(_))));
    assert!( tracker.contains( "XYZ789"));
    assert!( store.get( "XYZ789").is_none());

    processor.process_lines( vec![ "garbage".to_string(), MSG_0.trim().to_string() ]);
    let stats = store.stats();
    assert_eq!( (stats.lines(), stats.parse_failures(), stats.classify_failures()), (2, 1, 0));
    assert_eq!( store.get("ABC123").unwrap().last_phase.as_str(), "Climb");
}

#[test]
fn test_split_position_and_velocity_records () {
    // dump1090 style: altitude only in MSG,3, speed only in MSG,4
    let lines = vec![
        "MSG,3,111,11111,A04424,111111,2016/03/11,13:07:05.343,2016/03/11,13:07:05.288,,11025,,,37.17274,-122.03935,,,,,,0".to_string(),
        "MSG,4,111,11111,A04424,111111,2016/03/11,13:07:07.777,2016/03/11,13:07:07.713,,,316,106,,,1536,,,,,0".to_string(),
        "MSG,3,111,11111,A04424,111111,2016/03/11,13:07:09.000,2016/03/11,13:07:08.950,,11100,,,37.17500,-122.03500,,,,,,0".to_string(),
    ];

    let store = Arc::new( PhaseStore::new( "test", DataMode::Live));
    let processor = RecordProcessor::new( Arc::new( EntityTracker::new()), rate_classifier(), store.clone(), Tz::UTC);
    processor.process_lines( lines.clone());
    assert_eq!( (store.stats().published(), store.stats().classify_failures()), (0, 3));
    assert!( store.get( "A04424").is_none());

    let store = Arc::new( PhaseStore::new( "test", DataMode::Live));
    let processor = RecordProcessor::new( Arc::new( EntityTracker::new()), rate_classifier(), store.clone(), Tz::UTC)
        .with_feature_fill( true);
    processor.process_lines( lines);
    assert_eq!( (store.stats().published(), store.stats().classify_failures()), (2, 1)); // first record has no speed yet

    let r = store.get( "A04424").unwrap();
    assert_eq!( r.phase.as_str(), "Cruise"); // no altitude rate across the MSG,4 record
    assert_eq!( r.last_phase.as_str(), "Cruise");
    assert_eq!( (r.lat, r.long), (Some(37.175), Some(-122.035)));
}

#[tokio::test]
async fn test_streaming () {
    let listener = TcpListener::bind( "127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn( async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // split records across writes
        let (a,b) = MSG_1.split_at( 37);
        socket.write_all( MSG_0.as_bytes()).await.unwrap();
        socket.write_all( a.as_bytes()).await.unwrap();
        sleep( Duration::from_millis(50)).await;
        socket.write_all( b.as_bytes()).await.unwrap();
        sleep( Duration::from_secs(5)).await; // keep the connection open
    });

    let pipeline = PhasePipeline::new( live_config(addr), rate_classifier()).spawn();
    let mut state_rx = pipeline.subscribe_state();
    let store = pipeline.store().clone();

    assert!( wait_for( Duration::from_secs(2), || phase_of( &store, "ABC123").as_deref() == Some("Climb")).await);
    assert_eq!( pipeline.state(), PipelineState::Streaming);
    assert_eq!( store.stats().connects(), 1);
    assert_eq!( store.stats().lines(), 2);
    println!("{}", store.snapshot_json().unwrap());

    pipeline.shutdown().await.unwrap();
    assert_eq!( *state_rx.borrow_and_update(), PipelineState::Terminated);
    server.abort();
}

#[tokio::test]
async fn test_synthetic_toggle () {
    let listener = TcpListener::bind( "127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&'static str>(4);

    let server = tokio::spawn( async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        while let Some(msg) = rx.recv().await {
            socket.write_all( msg.as_bytes()).await.unwrap();
        }
    });

    let pipeline = PhasePipeline::new( live_config(addr), rate_classifier()).spawn();
    let store = pipeline.store().clone();

    tx.send( MSG_0).await.unwrap();
    assert!( wait_for( Duration::from_secs(2), || store.get("ABC123").is_some()).await);

    // switching to synthetic publishes the jittered demo flights right away
    assert_eq!( pipeline.toggle_mode(), DataMode::Synthetic);
    let seed = default_flights();
    let ids: Vec<String> = store.snapshot().into_iter().map( |r| r.flight).collect();
    assert_eq!( ids, seed.iter().map( |f| f.flight.clone()).collect::<Vec<_>>());
    assert!( wait_for( Duration::from_secs(2), || store.snapshot()[0].lat != Some(seed[0].lat)).await);

    // .. and does not consume the transport
    sleep( Duration::from_millis(50)).await;
    tx.send( MSG_1).await.unwrap();
    sleep( Duration::from_millis(200)).await;
    assert_eq!( store.stats().lines(), 1);
    assert_eq!( phase_of( &store, "ABC123").as_deref(), Some("Cruise"));

    // back to live on the same connection
    assert_eq!( pipeline.toggle_mode(), DataMode::Live);
    assert!( wait_for( Duration::from_secs(2), || phase_of( &store, "ABC123").as_deref() == Some("Climb")).await);
    assert_eq!( store.snapshot().len(), 1);
    assert_eq!( store.stats().connects(), 1);
    assert_eq!( store.stats().disconnects(), 0);

    pipeline.shutdown().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn test_reconnect () {
    let listener = TcpListener::bind( "127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn( async move {
        // first connection ends with an incomplete record that the second one would complete
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all( MSG_0.as_bytes()).await.unwrap();
        socket.write_all( b"MSG,3,1,1,XYZ789,1,2024").await.unwrap();
        drop( socket);

        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all( b"/01/01,12:00:00.000,2024/01/01,12:00:00.000,,5000,250,,23.5,90.4,,,,,,\n").await.unwrap();
        socket.write_all( MSG_1.as_bytes()).await.unwrap();
        sleep( Duration::from_secs(5)).await;
    });

    let pipeline = PhasePipeline::new( live_config(addr), rate_classifier()).spawn();
    let store = pipeline.store().clone();

    assert!( wait_for( Duration::from_secs(3), || phase_of( &store, "ABC123").as_deref() == Some("Climb")).await);
    assert_eq!( store.stats().connects(), 2);
    assert_eq!( store.stats().disconnects(), 1);
    assert_eq!( store.stats().parse_failures(), 1); // the orphaned tail
    assert!( store.get( "XYZ789").is_none());
    assert!( !pipeline.tracker().contains( "XYZ789"));

    pipeline.shutdown().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn test_eviction () {
    let listener = TcpListener::bind( "127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn( async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all( MSG_0.as_bytes()).await.unwrap();
        sleep( Duration::from_secs(5)).await;
    });

    let config = PipelineConfig {
        drop_after: Some( Duration::from_millis(100)),
        eviction_interval: Duration::from_millis(20),
        ..live_config(addr)
    };
    let pipeline = PhasePipeline::new( config, rate_classifier()).spawn();
    let store = pipeline.store().clone();

    assert!( wait_for( Duration::from_secs(2), || store.get("ABC123").is_some()).await);
    assert!( wait_for( Duration::from_secs(2), || store.get("ABC123").is_none()).await);
    assert!( pipeline.tracker().is_empty());

    pipeline.shutdown().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn test_shutdown_while_disconnected () {
    // get a port nobody listens on
    let addr = {
        let listener = TcpListener::bind( "127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let pipeline = PhasePipeline::new( live_config(addr), rate_classifier()).spawn();
    let mut state_rx = pipeline.subscribe_state();
    let store = pipeline.store().clone();

    sleep( Duration::from_millis(200)).await;
    assert_eq!( store.stats().connects(), 0);
    assert_ne!( pipeline.state(), PipelineState::Streaming);

    tokio::time::timeout( Duration::from_secs(2), pipeline.shutdown()).await.unwrap().unwrap();
    assert_eq!( *state_rx.borrow_and_update(), PipelineState::Terminated);
}

#[tokio::test]
async fn test_synthetic_start () {
    let addr: SocketAddr = "127.0.0.1:9".parse().unwrap(); // never connected in synthetic mode
    let config = PipelineConfig { synthetic: true, ..live_config(addr) };

    let pipeline = PhasePipeline::new( config, rate_classifier());
    assert_eq!( pipeline.store().snapshot().len(), 5); // seeded before the task runs

    let pipeline = pipeline.spawn();
    sleep( Duration::from_millis(100)).await;
    assert_eq!( pipeline.mode(), DataMode::Synthetic);
    assert_eq!( pipeline.state(), PipelineState::Disconnected);
    assert_eq!( pipeline.store().stats().connects(), 0);

    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_mode_switch_while_connecting () {
    // a listener that never accepts and whose backlog is full, so that further connects do not complete
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind( "127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen( 0).unwrap();
    let addr = listener.local_addr().unwrap();

    let mut backlog = Vec::new();
    for _ in 0..4 {
        if let Ok(Ok(stream)) = timeout( Duration::from_millis(100), TcpStream::connect( addr)).await {
            backlog.push( stream);
        }
    }

    let config = PipelineConfig { connect_timeout: Duration::from_secs(30), ..live_config(addr) };
    let pipeline = PhasePipeline::new( config, rate_classifier()).spawn();
    let mut state_rx = pipeline.subscribe_state();

    let _ = timeout( Duration::from_millis(500), state_rx.wait_for( |s| *s == PipelineState::Connecting)).await;
    sleep( Duration::from_millis(50)).await;

    pipeline.set_mode( DataMode::Synthetic);
    sleep( Duration::from_millis(100)).await;

    // no connect attempt is running in synthetic mode
    assert_ne!( pipeline.state(), PipelineState::Connecting);
    if pipeline.store().stats().connects() == 0 {
        assert_eq!( pipeline.state(), PipelineState::Disconnected);
    }

    pipeline.shutdown().await.unwrap();
    drop( backlog);
}
