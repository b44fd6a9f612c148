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

//! lookup and loading of RON config files.
//!
//! Configs are searched for in this order:
//!   1. the filename itself, if it is an existing file path
//!   2. `$SKYPHASE_HOME/configs/❬crate❭/❬filename❭`
//!   3. `~/.skyphase/configs/❬crate❭/❬filename❭`
//!   4. `❬crate-dir❭/configs/❬filename❭` (the in-repo default)

use std::{env, fs, path::{Path,PathBuf}};
use serde::de::DeserializeOwned;
use tracing::debug;
use crate::errors::{ConfigError,Result};

pub const CONFIGS: &'static str = "configs";

pub fn find_config_file (resource_crate: &str, crate_dir: &str, filename: &str) -> Option<PathBuf> {
    let path = Path::new(filename);
    if path.is_file() { return Some(path.to_path_buf()) }

    if let Ok(home) = env::var("SKYPHASE_HOME") {
        if let Some(path) = find_external_config( Path::new(&home), resource_crate, filename) { return Some(path) }
    }

    if let Ok(usr_home) = env::var("HOME") {
        let root = Path::new(&usr_home).join(".skyphase");
        if let Some(path) = find_external_config( &root, resource_crate, filename) { return Some(path) }
    }

    find_internal_config( Path::new(crate_dir), filename)
}

fn find_external_config (root: &Path, resource_crate: &str, filename: &str)->Option<PathBuf> {
    let path = root.join(CONFIGS).join(resource_crate).join(filename);
    if path.is_file() { Some(path) } else { None }
}

fn find_internal_config (crate_dir: &Path, filename: &str)->Option<PathBuf> {
    let path = crate_dir.join(CONFIGS).join(filename);
    if path.is_file() { Some(path) } else { None }
}

/// deserialize a RON file into a value of type C
pub fn from_path<C,P> (path: P) -> Result<C> where C: DeserializeOwned, P: AsRef<Path> {
    let data = fs::read( path.as_ref())?;
    Ok( ron::de::from_bytes( data.as_slice())? )
}

/// look up and load a config. This is normally not called directly but through the `load_config(..)` function
/// that is generated by `define_load_config!()`
pub fn load_config<C> (resource_crate: &str, crate_dir: &str, filename: &str) -> Result<C> where C: DeserializeOwned {
    if let Some(path) = find_config_file( resource_crate, crate_dir, filename) {
        debug!("loading config {:?}", path);
        from_path( &path)
    } else {
        Err( ConfigError::ResourceNotFoundError( filename.to_string()) )
    }
}

/// this macro needs to be expanded at the top of crates (lib.rs) that define configs.
/// Config users call the defined `load_config(..)` function to instantiate config structs
#[macro_export]
macro_rules! define_load_config {
    () => {
        /// load config using the skyphase_common lookup mechanism
        pub fn load_config<C> (filename: &str) -> skyphase_common::Result<C> where C: serde::de::DeserializeOwned {
            skyphase_common::config::load_config( env!("CARGO_PKG_NAME"), env!("CARGO_MANIFEST_DIR"), filename)
        }
    }
}
