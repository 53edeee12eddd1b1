//! Render queue for ordered drawing
//!
//! Splits models into opaque and transparent lists and sorts each by view
//! distance: opaque front-to-back so the early depth test rejects as much as
//! possible, transparent back-to-front so blending composites correctly.

use std::cmp::Ordering;

use slotmap::SlotMap;

use crate::scene::ModelKey;
use crate::shaders::Model;

/// Draw order for one frame
#[derive(Debug, Clone, Default)]
pub struct RenderQueue {
    /// Opaque models, nearest first
    opaque: Vec<ModelKey>,

    /// Transparent models, farthest first
    transparent: Vec<ModelKey>,
}

impl RenderQueue {
    /// Create an empty render queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the queue from models whose distances are already set
    pub fn from_models(models: &SlotMap<ModelKey, Box<dyn Model>>) -> Self {
        let mut opaque: Vec<(ModelKey, f32)> = Vec::new();
        let mut transparent: Vec<(ModelKey, f32)> = Vec::new();
        for (key, model) in models {
            let entry = (key, model.distance());
            if model.opaque() {
                opaque.push(entry);
            } else {
                transparent.push(entry);
            }
        }

        opaque.sort_by(|a, b| compare_distance(a.1, b.1));
        transparent.sort_by(|a, b| compare_distance(b.1, a.1));

        Self {
            opaque: opaque.into_iter().map(|(key, _)| key).collect(),
            transparent: transparent.into_iter().map(|(key, _)| key).collect(),
        }
    }

    /// Opaque models (front-to-back order)
    pub fn opaque(&self) -> &[ModelKey] {
        &self.opaque
    }

    /// Transparent models (back-to-front order)
    pub fn transparent(&self) -> &[ModelKey] {
        &self.transparent
    }

    /// Every model in draw order: opaque first, then transparent
    pub fn iter(&self) -> impl Iterator<Item = ModelKey> + '_ {
        self.opaque.iter().chain(&self.transparent).copied()
    }

    /// Get total number of models in the queue
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Total order on distances; NaN sorts last
fn compare_distance(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.total_cmp(&b),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_distances_sort_last() {
        let mut distances = vec![3.0, f32::NAN, -1.0, 2.0];
        distances.sort_by(|a, b| compare_distance(*a, *b));

        assert_eq!(&distances[..3], &[-1.0, 2.0, 3.0]);
        assert!(distances[3].is_nan());
    }

    #[test]
    fn test_empty_queue() {
        let queue = RenderQueue::from_models(&SlotMap::with_key());
        assert!(queue.is_empty());
        assert_eq!(queue.iter().count(), 0);
    }
}
