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

use thiserror::Error;

pub type Result<T> = std::result::Result<T,ClassifyError>;

#[derive(Error,Debug)]
pub enum ClassifyError {

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("config error {0}")]
    ConfigError( #[from] skyphase_common::ConfigError),

    #[error("artifact error {0}")]
    ArtifactError(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionError{ expected: usize, actual: usize },

    #[error("incomplete feature vector, missing {0}")]
    IncompleteFeatures(&'static str),

    #[error("model error {0}")]
    ModelError(String),
}

#[cfg(feature="onnx")]
skyphase_common::map_to_opaque_error!( ort::Error => ClassifyError::ModelError);

macro_rules! artifact_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        ClassifyError::ArtifactError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use artifact_error;
