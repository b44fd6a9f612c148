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

//! ONNX classifier artifacts (e.g. sklearn pipelines exported with skl2onnx).
//! The model has to have a single float input of shape [1,4]. Its first output is interpreted as the
//! label, either as a string tensor or as an int64 class index that is mapped through the configured classes

use std::{path::Path, sync::Mutex};
use ndarray::Array2;
use ort::{session::Session, value::TensorRef};
use tracing::info;
use crate::{PhaseModel, PhaseLabel, N_FEATURES, errors::{ClassifyError,Result,artifact_error}};

pub struct OnnxPhaseModel {
    session: Mutex<Session>, // running a session requires exclusive access
    input_name: String,
    classes: Option<Vec<PhaseLabel>>,
}

impl OnnxPhaseModel {
    pub fn from_path (path: &Path, classes: Option<Vec<String>>)->Result<Self> {
        let session = Session::builder()?.commit_from_file( path)?;

        let input_name = session.inputs.first()
            .map( |input| input.name.clone())
            .ok_or_else( || artifact_error!("model {:?} has no inputs", path))?;
        if session.outputs.is_empty() {
            return Err( artifact_error!("model {:?} has no outputs", path))
        }
        info!("loaded ONNX model {:?} with input '{}'", path, input_name);

        let classes = classes.map( |cs| cs.into_iter().map( PhaseLabel::from).collect());
        Ok( OnnxPhaseModel { session: Mutex::new(session), input_name, classes } )
    }

    fn label_for_index (&self, idx: i64)->Result<PhaseLabel> {
        match &self.classes {
            Some(classes) => usize::try_from(idx).ok()
                .and_then( |i| classes.get(i).cloned())
                .ok_or_else( || ClassifyError::ModelError( format!("class index {idx} out of range"))),
            None => Ok( PhaseLabel::new( idx.to_string()) )
        }
    }
}

impl PhaseModel for OnnxPhaseModel {
    fn predict (&self, x: &[f64;N_FEATURES])->Result<PhaseLabel> {
        let input = Array2::<f32>::from_shape_vec( (1,N_FEATURES), x.iter().map( |v| *v as f32).collect())
            .map_err( |e| ClassifyError::ModelError( e.to_string()))?;

        let mut session = self.session.lock().map_err( |_| ClassifyError::ModelError("session lock poisoned".into()))?;
        let outputs = session.run( ort::inputs![ self.input_name.as_str() => TensorRef::from_array_view( &input)? ])?;

        let (_,label) = outputs.iter().next().ok_or_else( || ClassifyError::ModelError("no model output".into()))?;

        if let Ok((_,labels)) = label.try_extract_strings() {
            labels.into_iter().next()
                .map( PhaseLabel::from)
                .ok_or_else( || ClassifyError::ModelError("empty label output".into()))

        } else {
            let (_,ids) = label.try_extract_tensor::<i64>()?;
            let idx = ids.first().copied().ok_or_else( || ClassifyError::ModelError("empty label output".into()))?;
            self.label_for_index( idx)
        }
    }
}
