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

use memchr::memchr_iter;

/// splits a raw byte stream into newline delimited records.
///
/// Chunks can end anywhere - the trailing part after the last delimiter is kept as carry-over and
/// completed by subsequent chunks. Records are only emitted once their delimiter was received.
/// We buffer raw bytes (not decoded text) so that multi-byte characters split between reads survive,
/// and decode complete records lossily (invalid bytes are replaced, never rejected).
/// Note the carry-over grows without bound if the source never sends a delimiter
#[derive(Debug,Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub fn new ()->Self {
        LineFramer { buf: Vec::with_capacity(8192) }
    }

    /// append chunk and return all records that are complete now (without their delimiter)
    pub fn push (&mut self, chunk: &[u8])->Vec<String> {
        let scan_start = self.buf.len(); // carry-over has no delimiter
        self.buf.extend_from_slice( chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        for i in memchr_iter( b'\n', &self.buf[scan_start..]) {
            let end = scan_start + i;
            lines.push( String::from_utf8_lossy( &self.buf[start..end]).into_owned());
            start = end + 1;
        }

        if start > 0 {
            self.buf.drain( ..start);
        }
        lines
    }

    /// the pending (incomplete) record
    pub fn fragment (&self)->&[u8] { self.buf.as_slice() }

    pub fn has_fragment (&self)->bool { !self.buf.is_empty() }

    /// discard the carry-over, e.g. after the connection it came from was lost
    pub fn clear (&mut self) { self.buf.clear() }
}
