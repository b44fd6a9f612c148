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
use crate::{PhaseModel, PhaseLabel, N_FEATURES, errors::{ClassifyError,Result,artifact_error}};

/// the fitted parameters of a linear multi-class classifier (e.g. a sklearn LogisticRegression or
/// LinearSVC with `classes_`, `coef_` and `intercept_`). The predicted label is the class with the
/// maximum decision score. Binary models have a single coefficient row and predict `classes[1]` for
/// positive scores
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct LinearPhaseModel {
    pub classes: Vec<PhaseLabel>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LinearPhaseModel {
    pub fn from_path (path: &Path)->Result<Self> {
        let model: LinearPhaseModel = skyphase_common::config::from_path( path)
            .map_err( |e| artifact_error!("failed to load model {:?}: {}", path, e))?;
        model.check()?;
        Ok(model)
    }

    pub fn check (&self)->Result<()> {
        let n_classes = self.classes.len();
        let n_rows = self.coef.len();

        if n_classes < 2 {
            return Err( artifact_error!("model needs at least 2 classes, has {}", n_classes))
        }
        if !(n_rows == n_classes || (n_classes == 2 && n_rows == 1)) {
            return Err( artifact_error!("{} coefficient rows for {} classes", n_rows, n_classes))
        }
        if self.intercept.len() != n_rows {
            return Err( artifact_error!("{} intercepts for {} coefficient rows", self.intercept.len(), n_rows))
        }
        for row in &self.coef {
            if row.len() != N_FEATURES {
                return Err( ClassifyError::DimensionError{ expected: N_FEATURES, actual: row.len() })
            }
        }
        Ok(())
    }

    fn score (&self, i: usize, x: &[f64;N_FEATURES])->f64 {
        self.coef[i].iter().zip( x.iter()).fold( self.intercept[i], |acc, (c,v)| acc + c*v)
    }
}

impl PhaseModel for LinearPhaseModel {
    fn predict (&self, x: &[f64;N_FEATURES])->Result<PhaseLabel> {
        if x.iter().any( |v| !v.is_finite()) {
            return Err( ClassifyError::ModelError( format!("non-finite input {:?}", x)))
        }

        if self.coef.len() == 1 { // binary
            let idx = if self.score( 0, x) > 0.0 { 1 } else { 0 };
            return self.classes.get(idx).cloned().ok_or( ClassifyError::ModelError("no class for binary score".into()))
        }

        let mut best: Option<(usize,f64)> = None;
        for i in 0..self.coef.len() {
            let s = self.score( i, x);
            match best {
                Some((_,s_max)) if s <= s_max => {} // first max wins on ties
                _ => best = Some((i,s))
            }
        }

        best.and_then( |(i,_)| self.classes.get(i).cloned())
            .ok_or( ClassifyError::ModelError("no class scores".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model ()->LinearPhaseModel {
        LinearPhaseModel {
            classes: vec![ "Climb".into(), "Cruise".into(), "Descent".into() ],
            coef: vec![
                vec![ 0.0, 0.0,  1.0, 0.0],
                vec![ 1.0, 0.0,  0.0, 0.0],
                vec![ 0.0, 0.0, -1.0, 0.0],
            ],
            intercept: vec![ 0.0, 0.0, 0.0 ],
        }
    }

    #[test]
    fn test_argmax () {
        let m = model();
        assert!( m.check().is_ok());
        assert_eq!( m.predict( &[0.5, 0.0, 2.0, 0.0]).unwrap().as_str(), "Climb");
        assert_eq!( m.predict( &[0.5, 0.0, -2.0, 0.0]).unwrap().as_str(), "Descent");
        assert_eq!( m.predict( &[3.0, 0.0, 0.1, 0.0]).unwrap().as_str(), "Cruise");
    }

    #[test]
    fn test_binary () {
        let m = LinearPhaseModel {
            classes: vec![ "Ground".into(), "Airborne".into() ],
            coef: vec![ vec![ 1.0, 0.0, 0.0, 0.0] ],
            intercept: vec![ -1.0 ],
        };
        assert!( m.check().is_ok());
        assert_eq!( m.predict( &[2.0, 0.0, 0.0, 0.0]).unwrap().as_str(), "Airborne");
        assert_eq!( m.predict( &[0.5, 0.0, 0.0, 0.0]).unwrap().as_str(), "Ground");
    }

    #[test]
    fn test_shape_check () {
        let mut m = model();
        m.intercept.pop();
        assert!( m.check().is_err());

        let mut m = model();
        m.coef[1].push( 1.0);
        assert!( matches!( m.check(), Err(ClassifyError::DimensionError{..})));
    }

    #[test]
    fn test_non_finite_input () {
        assert!( model().predict( &[f64::NAN, 0.0, 0.0, 0.0]).is_err());
    }
}
