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

use std::path::Path;
use serde::{Serialize,Deserialize};
use crate::{FeatureScaler, N_FEATURES, errors::{ClassifyError,Result,artifact_error}};

/// the fitted parameters of a standardizing scaler: `x' = (x - mean) / scale`
/// This is what gets exported from a sklearn StandardScaler (`mean_` and `scale_`)
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new (mean: [f64;N_FEATURES], scale: [f64;N_FEATURES])->Self {
        StandardScaler { mean: mean.to_vec(), scale: scale.to_vec() }
    }

    pub fn from_path (path: &Path)->Result<Self> {
        let scaler: StandardScaler = skyphase_common::config::from_path( path)
            .map_err( |e| artifact_error!("failed to load scaler {:?}: {}", path, e))?;
        scaler.check()?;
        Ok(scaler)
    }

    pub fn check (&self)->Result<()> {
        if self.mean.len() != N_FEATURES {
            return Err( ClassifyError::DimensionError{ expected: N_FEATURES, actual: self.mean.len() })
        }
        if self.scale.len() != N_FEATURES {
            return Err( ClassifyError::DimensionError{ expected: N_FEATURES, actual: self.scale.len() })
        }
        if self.mean.iter().chain( self.scale.iter()).any( |v| !v.is_finite()) {
            return Err( artifact_error!("non-finite scaler parameters"))
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn transform (&self, x: &[f64;N_FEATURES])->Result<[f64;N_FEATURES]> {
        if self.mean.len() != N_FEATURES || self.scale.len() != N_FEATURES {
            return Err( ClassifyError::DimensionError{ expected: N_FEATURES, actual: self.mean.len().min( self.scale.len()) })
        }

        let mut xs = [0.0; N_FEATURES];
        for i in 0..N_FEATURES {
            let s = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] }; // zero variance features are only centered
            xs[i] = (x[i] - self.mean[i]) / s;
        }
        Ok(xs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform () {
        let scaler = StandardScaler::new( [10000.0, 300.0, 0.0, 0.0], [5000.0, 100.0, 20.0, 0.0]);
        let xs = scaler.transform( &[20000.0, 250.0, 40.0, 2.0]).unwrap();
        assert_eq!( xs, [2.0, -0.5, 2.0, 2.0]);
    }

    #[test]
    fn test_dimension_check () {
        let scaler = StandardScaler { mean: vec![0.0, 0.0, 0.0], scale: vec![1.0, 1.0, 1.0] };
        assert!( matches!( scaler.check(), Err(ClassifyError::DimensionError{ expected: 4, actual: 3 })));
        assert!( scaler.transform( &[1.0, 2.0, 3.0, 4.0]).is_err());
    }
}
