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

use std::{sync::Arc, time::Duration};
use tokio::{self, io::{AsyncBufReadExt, BufReader}, time};
use anyhow::Result;
use tracing::info;
use skyphase_common::{define_cli, check_cli};
use skyphase_classify::load_classifier;
use skyphase_adsb::{load_config, DataMode, PhasePipeline, PipelineConfig, PipelineHandle};

define_cli! { ARGS [about="run the flight phase pipeline and print its results"] =
    config: String [help="filename or path of pipeline config", short, long, default_value="phase_pipeline.ron"],
    classifier: String [help="filename or path of classifier config", long, default_value="classifier.ron"],
    live: bool [help="start in live mode (overrides config)", long],
    interval: u64 [help="print interval in seconds", long, default_value="5"]
}

#[tokio::main]
async fn main() -> Result<()> {
    check_cli!(ARGS);
    skyphase_common::init_tracing();

    // artifacts have to be loaded before we start anything
    let classifier = Arc::new( load_classifier( &ARGS.classifier)?);

    let mut config: PipelineConfig = load_config( &ARGS.config)?;
    if ARGS.live { config.synthetic = false; }

    let pipeline = PhasePipeline::new( config, classifier).spawn();
    info!("enter 't' to toggle between live and synthetic data, ctrl-c to quit");

    let mut ticker = time::interval( Duration::from_secs( ARGS.interval.max(1)));
    let mut stdin = BufReader::new( tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => print_results( &pipeline),
            Ok(Some(line)) = stdin.next_line() => {
                match line.trim() {
                    "t" | "toggle" => { info!("now using {:?} data", pipeline.toggle_mode()); }
                    "" => {}
                    other => println!("unknown command {other:?}")
                }
            }
        }
    }

    pipeline.shutdown().await?;
    Ok(())
}

fn print_results (pipeline: &PipelineHandle) {
    let store = pipeline.store();
    let stats = store.stats();

    println!("--- {} [{:?} mode, {:?}] lines: {}, parse failures: {}, classify failures: {}",
        store.source(), store.mode(), pipeline.state(), stats.lines(), stats.parse_failures(), stats.classify_failures());

    let mut results = store.snapshot();
    results.sort_by( |a,b| a.flight.cmp( &b.flight));

    for r in results {
        let (alt, spd) = match pipeline.tracker().get( &r.flight) {
            Some(state) if store.mode() == DataMode::Live => (fmt_opt( state.altitude), fmt_opt( state.speed)),
            _ => ("-".to_string(), "-".to_string())
        };
        println!("{:>8} | alt: {:>6} | spd: {:>4} | {} -> {}", r.flight, alt, spd, r.last_phase, r.phase);
    }
}

fn fmt_opt<T: ToString> (v: Option<T>)->String {
    v.map( |v| v.to_string()).unwrap_or_else( || "-".to_string())
}
