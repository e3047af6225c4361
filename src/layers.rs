use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use crate::error::{BalanceError, Result};

pub const LAYER_COUNT: usize = 4;
pub const CM_PER_INCH: f64 = 2.54;

// Volumetric water content per layer [cm³/cm³], top to bottom
pub type Moisture = Vector4<f64>;

// One slab of the modeled profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub depth: f64, // Top of the layer [cm]
    pub dlayr: f64, // Thickness [cm]
}

impl Layer {
    pub fn new(depth: f64, dlayr: f64) -> Self {
        Layer { depth, dlayr }
    }

    // Thickness [in]
    pub fn inches(&self) -> f64 {
        self.dlayr / CM_PER_INCH
    }
}

/**
Fixed layer geometry shared by every soil in a run.

Always exactly [`LAYER_COUNT`] layers with positive thickness, ordered top
to bottom. The only way to build one is through [`LayerStack::new`] (or the
serde path, which goes through the same checks), so every component can
index it without re-validating.
*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Layer>", into = "Vec<Layer>")]
pub struct LayerStack {
    layers: [Layer; LAYER_COUNT],
}

impl LayerStack {
    pub fn new(layers: Vec<Layer>) -> Result<Self> {
        let layers: [Layer; LAYER_COUNT] =
            layers
                .try_into()
                .map_err(|rejected: Vec<Layer>| BalanceError::LayerCount {
                    expected: LAYER_COUNT,
                    found: rejected.len(),
                })?;

        for (index, layer) in layers.iter().enumerate() {
            if !(layer.dlayr.is_finite() && layer.dlayr > 0.0) {
                return Err(BalanceError::LayerThickness {
                    index,
                    thickness: layer.dlayr,
                });
            }
            if index > 0 && !(layer.depth > layers[index - 1].depth) {
                return Err(BalanceError::LayerOrder {
                    index,
                    depth: layer.depth,
                    previous: layers[index - 1].depth,
                });
            }
        }

        Ok(LayerStack { layers })
    }

    // 3, 4.5, 7.5 and 135 cm layers down to 150 cm
    pub fn standard() -> Self {
        LayerStack {
            layers: [
                Layer::new(0.0, 3.0),
                Layer::new(3.0, 4.5),
                Layer::new(7.5, 7.5),
                Layer::new(15.0, 135.0),
            ],
        }
    }

    pub fn layers(&self) -> &[Layer; LAYER_COUNT] {
        &self.layers
    }

    pub fn surface(&self) -> &Layer {
        &self.layers[0]
    }

    // Thickness of each layer [cm]
    pub fn thickness(&self) -> Moisture {
        Moisture::from_fn(|i, _| self.layers[i].dlayr)
    }

    // Thickness of each layer [in]
    pub fn inches(&self) -> Moisture {
        Moisture::from_fn(|i, _| self.layers[i].inches())
    }

    pub fn total_thickness(&self) -> f64 {
        self.layers.iter().map(|l| l.dlayr).sum()
    }

    // Depth-weighted water in the profile [cm]
    pub fn water_depth(&self, moisture: &Moisture) -> f64 {
        moisture.dot(&self.thickness())
    }
}

impl Default for LayerStack {
    fn default() -> Self {
        LayerStack::standard()
    }
}

impl TryFrom<Vec<Layer>> for LayerStack {
    type Error = BalanceError;

    fn try_from(layers: Vec<Layer>) -> Result<Self> {
        LayerStack::new(layers)
    }
}

impl From<LayerStack> for Vec<Layer> {
    fn from(stack: LayerStack) -> Self {
        stack.layers.to_vec()
    }
}
