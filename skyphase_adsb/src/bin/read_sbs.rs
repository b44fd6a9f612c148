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

use tokio::{self, net::TcpStream, io::AsyncReadExt};
use anyhow::Result;
use chrono_tz::Tz;
use skyphase_common::{define_cli, check_cli};
use skyphase_adsb::{LineFramer, sbs::parse_msg};

define_cli! { ARGS [about="ADS-B SBS socket monitoring tool"] =
    tz: String [help="timezone of message source", long, default_value="UTC"],
    url: String [help="host:port from where to read ADS-B SBS messages"]
}

#[tokio::main]
async fn main() -> Result<()> {
    check_cli!(ARGS);
    let tz: Tz = ARGS.tz.parse()?;

    let mut stream = TcpStream::connect( &ARGS.url).await?;
    let mut framer = LineFramer::new();
    let mut buf = vec![0u8; 4096];

    loop {
        let len = stream.read( &mut buf).await?;
        if len == 0 { break }

        for line in framer.push( &buf[..len]) {
            match parse_msg( &line, &tz) {
                Ok(update) => println!("{update}"),
                Err(e) => println!("PARSE ERROR for {line}: {e}")
            }
        }
    }
    Ok(())
}
