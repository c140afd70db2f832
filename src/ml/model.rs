use burn::{
    nn::{
        loss::{MseLoss, Reduction},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::tanh,
};
use std::sync::{Mutex, PoisonError};

// The backend RNG is process-wide. Seeding it and drawing the
// weights happen under this lock, so concurrent folds or tests
// cannot consume each other's random stream.
static INIT_LOCK: Mutex<()> = Mutex::new(());

// #[derive(Config)] already implements Clone, Serialize and Deserialize.
#[derive(Config, Debug)]
pub struct SiameseConfig {
    pub input_dim:     usize,
    pub hidden_dim:    usize,
    pub embedding_dim: usize,
}

impl SiameseConfig {
    /// Build the model with weights drawn from the backend RNG
    /// seeded with `seed`. The same seed gives the same weights.
    pub fn init<B: Backend>(&self, seed: u64, device: &B::Device) -> SiameseRegressor<B> {
        let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        B::seed(seed);

        let encoder    = LinearConfig::new(self.input_dim, self.hidden_dim).init(device);
        let projection = LinearConfig::new(self.hidden_dim, self.embedding_dim).init(device);
        let model      = SiameseRegressor { encoder, projection };

        // Parameters are initialised lazily; draw them while the seed is held.
        model.materialize();
        model
    }
}

/// Shared tower applied to both segments; the score is the cosine
/// similarity of the two embeddings.
#[derive(Module, Debug)]
pub struct SiameseRegressor<B: Backend> {
    pub encoder:    Linear<B>,
    pub projection: Linear<B>,
}

impl<B: Backend> SiameseRegressor<B> {
    fn materialize(&self) {
        for layer in [&self.encoder, &self.projection] {
            let _ = layer.weight.val();
            if let Some(bias) = &layer.bias {
                let _ = bias.val();
            }
        }
    }

    /// [batch, input_dim] → [batch, embedding_dim]
    pub fn embed(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.projection.forward(tanh(self.encoder.forward(x)))
    }

    /// Cosine similarity per row: [batch, dim] × [batch, dim] → [batch]
    pub fn forward(&self, a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 1> {
        let ea = self.embed(a);
        let eb = self.embed(b);

        let dot    = (ea.clone() * eb.clone()).sum_dim(1);
        let norm_a = ea.powf_scalar(2.0).sum_dim(1).sqrt();
        let norm_b = eb.powf_scalar(2.0).sum_dim(1).sqrt();

        (dot / (norm_a * norm_b).add_scalar(1e-8)).flatten::<1>(0, 1)
    }

    /// Cosine-similarity loss: MSE between the cosine score and the
    /// normalised label. Returns (loss, scores).
    pub fn forward_loss(
        &self,
        a:      Tensor<B, 2>,
        b:      Tensor<B, 2>,
        labels: Tensor<B, 1>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let scores = self.forward(a, b);
        let loss   = MseLoss::new().forward(scores.clone(), labels, Reduction::Mean);
        (loss, scores)
    }
}
