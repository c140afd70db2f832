// ============================================================
// Layer 4 — Pair Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<PairSample>
// into three tensors:
//
//   features_a: [batch, dim]   source-side features
//   features_b: [batch, dim]   target-side features
//   labels:     [batch]        normalised quality labels
//
// Every sample has the same feature dimension, so the vectors
// are simply concatenated and reshaped.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::PairSample;

#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    pub features_a: Tensor<B, 2>,
    pub features_b: Tensor<B, 2>,
    pub labels:     Tensor<B, 1>,
}

#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<PairSample, PairBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<PairSample>) -> PairBatch<B> {
        let batch_size = items.len();
        let dim        = items.first().map(|s| s.features_a.len()).unwrap_or(0);

        let flat_a: Vec<f32> = items.iter().flat_map(|s| s.features_a.iter().copied()).collect();
        let flat_b: Vec<f32> = items.iter().flat_map(|s| s.features_b.iter().copied()).collect();
        let labels: Vec<f32> = items.iter().map(|s| s.label).collect();

        let features_a = Tensor::<B, 2>::from_data(
            TensorData::new(flat_a, [batch_size, dim]), &self.device,
        );
        let features_b = Tensor::<B, 2>::from_data(
            TensorData::new(flat_b, [batch_size, dim]), &self.device,
        );
        let labels = Tensor::<B, 1>::from_data(
            TensorData::new(labels, [batch_size]), &self.device,
        );

        PairBatch { features_a, features_b, labels }
    }
}
