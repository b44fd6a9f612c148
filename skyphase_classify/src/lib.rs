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
#![doc = r#"
Phase classifier gateway.

This crate wraps pretrained, opaque flight-phase classifier artifacts behind two narrow capabilities:
a [`FeatureScaler`] that applies the normalization fitted during offline training, and a [`PhaseModel`]
that maps a normalized feature vector to a [`PhaseLabel`]. The label set is whatever the trained model
supports - it is passed through, not validated.

Artifacts are loaded once at process start through [`load_classifier`]. Failure to load them is fatal
for the caller, whereas failures during [`PhaseClassifier::classify`] are per-vector errors the caller
can skip.
"#]

use std::{fmt, path::{Path,PathBuf}};
use serde::{Serialize,Deserialize};
use tracing::info;

pub mod errors;
use errors::{ClassifyError,Result,artifact_error};

pub mod scaler;
pub use scaler::StandardScaler;

pub mod linear;
pub use linear::LinearPhaseModel;

#[cfg(feature="onnx")]
pub mod onnx;

/// number of features we feed into the classifier: altitude, speed, altitude-rate, speed-rate
pub const N_FEATURES: usize = 4;

/// the label we use for "no previous phase"
pub const UNKNOWN_PHASE: &'static str = "None";

/// the raw (unscaled) classifier input.
/// Note that altitude and speed are optional since the SBS source fields are - we do not default them to 0
/// because that would corrupt the phase classification. A vector with missing values cannot be classified
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct FeatureVector {
    pub altitude: Option<f64>,  // ft
    pub speed: Option<f64>,     // kt
    pub altitude_rate: f64,     // ft/s
    pub speed_rate: f64,        // kt/s
}

impl FeatureVector {
    pub fn new (altitude: Option<f64>, speed: Option<f64>, altitude_rate: f64, speed_rate: f64)->Self {
        FeatureVector { altitude, speed, altitude_rate, speed_rate }
    }

    pub fn to_array (&self)->Result<[f64;N_FEATURES]> {
        let altitude = self.altitude.ok_or( ClassifyError::IncompleteFeatures("altitude"))?;
        let speed = self.speed.ok_or( ClassifyError::IncompleteFeatures("speed"))?;
        Ok( [altitude, speed, self.altitude_rate, self.speed_rate] )
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "FeatureVector( alt: {:?}, spd: {:?}, alt_rate: {:.2}, spd_rate: {:.2} )",
                self.altitude, self.speed, self.altitude_rate, self.speed_rate)
    }
}

/// a flight phase label as produced by the classifier (e.g. "Climb", "Cruise", "Descent")
#[derive(Debug,Clone,PartialEq,Eq,Hash,Serialize,Deserialize)]
#[serde(transparent)]
pub struct PhaseLabel(String);

impl PhaseLabel {
    pub fn new (label: impl Into<String>)->Self { PhaseLabel(label.into()) }
    pub fn unknown ()->Self { PhaseLabel(UNKNOWN_PHASE.to_string()) }
    pub fn is_unknown (&self)->bool { self.0 == UNKNOWN_PHASE }
    pub fn as_str (&self)->&str { self.0.as_str() }
}

impl fmt::Display for PhaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "{}", self.0)
    }
}

impl From<&str> for PhaseLabel {
    fn from (s: &str)->Self { PhaseLabel(s.to_string()) }
}

impl From<String> for PhaseLabel {
    fn from (s: String)->Self { PhaseLabel(s) }
}

/// the pre-fitted normalization transform
pub trait FeatureScaler: Send + Sync {
    fn transform (&self, x: &[f64;N_FEATURES])->Result<[f64;N_FEATURES]>;
}

/// the pre-fitted classifier
pub trait PhaseModel: Send + Sync {
    fn predict (&self, x: &[f64;N_FEATURES])->Result<PhaseLabel>;
}

/// the serialization format of the artifacts
#[derive(Deserialize,Serialize,Debug,Clone,Copy,PartialEq)]
pub enum ArtifactKind {
    Ron,  // StandardScaler + LinearPhaseModel
    Onnx  // requires the "onnx" feature
}

/// the configuration that specifies which artifacts to load.
/// Relative paths are resolved against the directory of the config file
#[derive(Deserialize,Serialize,Debug,Clone)]
pub struct ClassifierConfig {
    pub name: String,
    pub kind: ArtifactKind,
    #[serde(default)]
    pub scaler_path: Option<PathBuf>, // None if the model does its own scaling
    pub model_path: PathBuf,
    #[serde(default)]
    pub classes: Option<Vec<String>>, // maps integer model outputs to labels (only used for ONNX)
}

/// the gateway to the pretrained artifacts. Instances are immutable once loaded
pub struct PhaseClassifier {
    name: String,
    scaler: Option<Box<dyn FeatureScaler>>,
    model: Box<dyn PhaseModel>,
}

impl PhaseClassifier {
    pub fn new (name: impl Into<String>, scaler: Option<Box<dyn FeatureScaler>>, model: Box<dyn PhaseModel>)->Self {
        PhaseClassifier { name: name.into(), scaler, model }
    }

    pub fn from_config (config: &ClassifierConfig, base_dir: &Path)->Result<Self> {
        let scaler: Option<Box<dyn FeatureScaler>> = if let Some(path) = &config.scaler_path {
            let path = resolve( base_dir, path);
            info!("loading scaler {:?}", path);
            Some( Box::new( StandardScaler::from_path( &path)?))
        } else {
            None
        };

        let model_path = resolve( base_dir, &config.model_path);
        info!("loading {:?} model {:?}", config.kind, model_path);
        let model: Box<dyn PhaseModel> = match config.kind {
            ArtifactKind::Ron => Box::new( LinearPhaseModel::from_path( &model_path)?),
            ArtifactKind::Onnx => load_onnx_model( &model_path, config.classes.as_ref())?
        };

        Ok( PhaseClassifier::new( config.name.clone(), scaler, model) )
    }

    pub fn name (&self)->&str { self.name.as_str() }

    /// normalize the feature vector and run it through the model. Errors are per-vector and not fatal
    pub fn classify (&self, features: &FeatureVector)->Result<PhaseLabel> {
        let x = features.to_array()?;
        let x = match &self.scaler {
            Some(scaler) => scaler.transform( &x)?,
            None => x
        };
        self.model.predict( &x)
    }
}

#[cfg(feature="onnx")]
fn load_onnx_model (path: &Path, classes: Option<&Vec<String>>)->Result<Box<dyn PhaseModel>> {
    Ok( Box::new( onnx::OnnxPhaseModel::from_path( path, classes.cloned())?) )
}

#[cfg(not(feature="onnx"))]
fn load_onnx_model (path: &Path, _classes: Option<&Vec<String>>)->Result<Box<dyn PhaseModel>> {
    Err( artifact_error!("cannot load {:?}: ONNX support requires the 'onnx' feature", path) )
}

fn resolve (base_dir: &Path, path: &Path)->PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) }
}

/// look up the classifier config with the given filename and load the artifacts it refers to.
/// This is supposed to be called once at startup - errors are fatal for the caller
pub fn load_classifier (filename: &str)->Result<PhaseClassifier> {
    let path = skyphase_common::config::find_config_file( env!("CARGO_PKG_NAME"), env!("CARGO_MANIFEST_DIR"), filename)
        .ok_or_else( || ClassifyError::ConfigError( skyphase_common::ConfigError::ResourceNotFoundError( filename.to_string())))?;
    let config: ClassifierConfig = skyphase_common::config::from_path( &path)?;
    let base_dir = path.parent().unwrap_or( Path::new("."));

    PhaseClassifier::from_config( &config, base_dir)
}
