//! Feedforward ordering predictor with one hidden layer.
//!
//! The output layer is linear: each output slot regresses the 1-based rank of
//! the stop in that slot, so sorting outputs ascending yields a visiting
//! order. Numerical trouble is absorbed rather than raised: non-finite inputs,
//! sums and gradient terms become zero, activations are clipped, and every
//! parameter step and value stays within [`PARAM_CLIP`].
//!
//! Parameters are stored as flat row-major arrays: `weights1` is
//! input x hidden, `weights2` is hidden x output.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::Path;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ModelError;
use crate::training::TrainingExample;

/// Current persisted record layout.
pub const MODEL_VERSION: u32 = 1;
pub const DEFAULT_HIDDEN_SIZE: usize = 16;
pub const DEFAULT_LEARNING_RATE: f64 = 0.001;

const HIDDEN_CLIP: f64 = 500.0;
const OUTPUT_CLIP: f64 = 100.0;
pub const PARAM_CLIP: f64 = 10.0;

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn clip_param(value: f64) -> f64 {
    value.clamp(-PARAM_CLIP, PARAM_CLIP)
}

/// Average loss of one training epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochLoss {
    pub epoch: usize,
    pub loss: f64,
}

/// Hidden and output activations of one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Activations {
    pub hidden: Vec<f64>,
    pub output: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Mean fraction of positions where the predicted order matches.
    pub accuracy: f64,
    pub average_mse: f64,
    pub examples: usize,
}

/// Persisted model layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRecord {
    pub version: u32,
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub learning_rate: f64,
    pub weights1: Vec<f64>,
    pub weights2: Vec<f64>,
    pub bias1: Vec<f64>,
    pub bias2: Vec<f64>,
    #[serde(default)]
    pub training_history: Vec<EpochLoss>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Learner {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    learning_rate: f64,
    weights1: Vec<f64>,
    weights2: Vec<f64>,
    bias1: Vec<f64>,
    bias2: Vec<f64>,
    history: Vec<EpochLoss>,
}

fn init_weights(rows: usize, cols: usize, rng: &mut impl Rng) -> Vec<f64> {
    let limit = (2.0 / (rows + cols) as f64).sqrt();
    (0..rows * cols)
        .map(|_| finite_or_zero(rng.gen_range(-1.0..1.0) * limit))
        .collect()
}

fn init_biases(size: usize, rng: &mut impl Rng) -> Vec<f64> {
    (0..size)
        .map(|_| (rng.gen_range(0.0..1.0) - 0.5) * 0.1)
        .collect()
}

impl Learner {
    /// Randomly initialized network.
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize, rng: &mut impl Rng) -> Self {
        let weights1 = init_weights(input_size, hidden_size, rng);
        let weights2 = init_weights(hidden_size, output_size, rng);
        let bias1 = init_biases(hidden_size, rng);
        let bias2 = init_biases(output_size, rng);

        Self {
            input_size,
            hidden_size,
            output_size,
            learning_rate: DEFAULT_LEARNING_RATE,
            weights1,
            weights2,
            bias1,
            bias2,
            history: Vec::new(),
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn history(&self) -> &[EpochLoss] {
        &self.history
    }

    pub fn forward(&self, input: &[f64]) -> Result<Activations, ModelError> {
        if input.len() != self.input_size {
            return Err(ModelError::InputSize {
                expected: self.input_size,
                actual: input.len(),
            });
        }

        let hidden: Vec<f64> = (0..self.hidden_size)
            .map(|h| {
                let sum = input.iter().enumerate().fold(self.bias1[h], |sum, (i, &x)| {
                    sum + finite_or_zero(x) * self.weights1[i * self.hidden_size + h]
                });
                finite_or_zero(sum).clamp(-HIDDEN_CLIP, HIDDEN_CLIP).max(0.0)
            })
            .collect();

        let output = (0..self.output_size)
            .map(|o| {
                let sum = hidden.iter().enumerate().fold(self.bias2[o], |sum, (h, &a)| {
                    sum + a * self.weights2[h * self.output_size + o]
                });
                finite_or_zero(sum).clamp(-OUTPUT_CLIP, OUTPUT_CLIP)
            })
            .collect();

        Ok(Activations { hidden, output })
    }

    /// One gradient step on a single example. Returns its squared-error loss.
    fn backward(&mut self, input: &[f64], activations: &Activations, target: &[f64]) -> f64 {
        let (hidden_size, output_size) = (self.hidden_size, self.output_size);
        let lr = self.learning_rate;

        let output_error: Vec<f64> = activations
            .output
            .iter()
            .zip(target)
            .map(|(predicted, expected)| finite_or_zero(predicted - expected))
            .collect();

        // Uses the pre-update output weights.
        let hidden_error: Vec<f64> = (0..hidden_size)
            .map(|h| {
                if activations.hidden[h] <= 0.0 {
                    return 0.0;
                }
                let error: f64 = output_error
                    .iter()
                    .enumerate()
                    .map(|(o, e)| e * self.weights2[h * output_size + o])
                    .sum();
                finite_or_zero(error)
            })
            .collect();

        for (h, &activation) in activations.hidden.iter().enumerate() {
            for (o, &error) in output_error.iter().enumerate() {
                let gradient = error * activation;
                if gradient.is_finite() {
                    let weight = &mut self.weights2[h * output_size + o];
                    *weight = clip_param(*weight - clip_param(lr * gradient));
                }
            }
        }
        for (bias, &error) in self.bias2.iter_mut().zip(&output_error) {
            *bias = clip_param(*bias - clip_param(lr * error));
        }
        for (i, &x) in input.iter().enumerate() {
            for (h, &error) in hidden_error.iter().enumerate() {
                let gradient = error * x;
                if gradient.is_finite() {
                    let weight = &mut self.weights1[i * hidden_size + h];
                    *weight = clip_param(*weight - clip_param(lr * gradient));
                }
            }
        }
        for (bias, &error) in self.bias1.iter_mut().zip(&hidden_error) {
            *bias = clip_param(*bias - clip_param(lr * error));
        }

        if output_error.is_empty() {
            return 0.0;
        }
        let loss = output_error.iter().map(|e| e * e).sum::<f64>() / output_error.len() as f64;
        finite_or_zero(loss)
    }

    fn check_example(&self, example: &TrainingExample) -> Result<(), ModelError> {
        if example.features.len() != self.input_size {
            return Err(ModelError::InputSize {
                expected: self.input_size,
                actual: example.features.len(),
            });
        }
        if example.target.len() != self.output_size {
            return Err(ModelError::ShapeMismatch {
                what: "target",
                expected: self.output_size,
                actual: example.target.len(),
            });
        }
        Ok(())
    }

    /// Mini-batch training. Shuffles every epoch and records the mean of the
    /// per-batch average losses.
    pub fn train(
        &mut self,
        data: &[TrainingExample],
        epochs: usize,
        batch_size: usize,
        rng: &mut impl Rng,
    ) -> Result<&[EpochLoss], ModelError> {
        if data.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        for example in data {
            self.check_example(example)?;
        }

        info!(examples = data.len(), epochs, batch_size, "training model");
        let mut order: Vec<usize> = (0..data.len()).collect();
        for epoch in 0..epochs {
            order.shuffle(rng);

            let mut total = 0.0;
            let mut batches = 0usize;
            for batch in order.chunks(batch_size.max(1)) {
                let mut batch_loss = 0.0;
                for &index in batch {
                    let example = &data[index];
                    let activations = self.forward(&example.features)?;
                    batch_loss += self.backward(&example.features, &activations, &example.target);
                }
                total += batch_loss / batch.len() as f64;
                batches += 1;
            }

            let loss = total / batches as f64;
            self.history.push(EpochLoss { epoch, loss });
            if epoch % 10 == 0 || epoch + 1 == epochs {
                info!(epoch, loss, "epoch complete");
            }
        }

        Ok(&self.history)
    }

    /// Slot indices ordered by ascending output. Callers drop indices beyond
    /// their stop count.
    pub fn predict(&self, features: &[f64]) -> Result<Vec<usize>, ModelError> {
        let output = self.forward(features)?.output;
        let mut order: Vec<usize> = (0..output.len()).collect();
        order.sort_by(|&a, &b| output[a].total_cmp(&output[b]));
        Ok(order)
    }

    /// Positional accuracy against each example's reference order and mean
    /// squared error against its rank vector.
    pub fn evaluate(&self, data: &[TrainingExample]) -> Result<Evaluation, ModelError> {
        let mut accuracy = 0.0;
        let mut error = 0.0;

        for example in data {
            let actual = &example.order;
            let predicted: Vec<usize> = self
                .predict(&example.features)?
                .into_iter()
                .filter(|&index| index < actual.len())
                .collect();
            if !actual.is_empty() {
                let matches = predicted.iter().zip(actual).filter(|(p, a)| p == a).count();
                accuracy += matches as f64 / actual.len() as f64;
            }

            let output = self.forward(&example.features)?.output;
            if !output.is_empty() {
                let squared: f64 = output
                    .iter()
                    .zip(&example.target)
                    .map(|(p, t)| (p - t).powi(2))
                    .sum();
                error += squared / output.len() as f64;
            }
        }

        let count = data.len();
        if count == 0 {
            return Ok(Evaluation {
                accuracy: 0.0,
                average_mse: 0.0,
                examples: 0,
            });
        }
        Ok(Evaluation {
            accuracy: accuracy / count as f64,
            average_mse: error / count as f64,
            examples: count,
        })
    }

    pub fn to_record(&self) -> ModelRecord {
        ModelRecord {
            version: MODEL_VERSION,
            input_size: self.input_size,
            hidden_size: self.hidden_size,
            output_size: self.output_size,
            learning_rate: self.learning_rate,
            weights1: self.weights1.clone(),
            weights2: self.weights2.clone(),
            bias1: self.bias1.clone(),
            bias2: self.bias2.clone(),
            training_history: self.history.clone(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &self.to_record())?;
        info!(path = %path.display(), "saved model");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let record: ModelRecord = serde_json::from_reader(reader)?;
        let learner = Self::try_from(record)?;
        info!(path = %path.display(), "loaded model");
        Ok(learner)
    }

    /// Like [`Learner::load`], but a missing file is `Ok(None)`.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>, ModelError> {
        match Self::load(path) {
            Ok(learner) => Ok(Some(learner)),
            Err(ModelError::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn check_len(what: &'static str, values: &[f64], expected: usize) -> Result<(), ModelError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(ModelError::ShapeMismatch {
            what,
            expected,
            actual: values.len(),
        })
    }
}

impl TryFrom<ModelRecord> for Learner {
    type Error = ModelError;

    fn try_from(record: ModelRecord) -> Result<Self, Self::Error> {
        if record.version != MODEL_VERSION {
            return Err(ModelError::UnsupportedVersion(record.version));
        }
        check_len("weights1", &record.weights1, record.input_size * record.hidden_size)?;
        check_len("weights2", &record.weights2, record.hidden_size * record.output_size)?;
        check_len("bias1", &record.bias1, record.hidden_size)?;
        check_len("bias2", &record.bias2, record.output_size)?;

        Ok(Self {
            input_size: record.input_size,
            hidden_size: record.hidden_size,
            output_size: record.output_size,
            learning_rate: record.learning_rate,
            weights1: record.weights1,
            weights2: record.weights2,
            bias1: record.bias1,
            bias2: record.bias2,
            history: record.training_history,
        })
    }
}

/// Hyperparameters for [`train_model`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub hidden_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 150,
            batch_size: 10,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            learning_rate: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub learner: Learner,
    pub evaluation: Evaluation,
}

/// Train on the first 80% of `data` and evaluate on the rest. Layer sizes
/// come from the first example. A set too small to split is used for both.
pub fn train_model(data: &[TrainingExample], options: &TrainOptions) -> Result<TrainedModel, ModelError> {
    let first = data.first().ok_or(ModelError::EmptyTrainingSet)?;
    let split = data.len() * 4 / 5;
    let (train_set, test_set) = if split == 0 {
        warn!(examples = data.len(), "too few examples to hold out; evaluating on the training set");
        (data, data)
    } else {
        data.split_at(split)
    };
    info!(train = train_set.len(), test = test_set.len(), "split training data");

    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut learner = Learner::new(
        first.features.len(),
        options.hidden_size,
        first.target.len(),
        &mut rng,
    )
    .with_learning_rate(options.learning_rate);
    learner.train(train_set, options.epochs, options.batch_size, &mut rng)?;

    let evaluation = learner.evaluate(test_set)?;
    info!(
        accuracy = evaluation.accuracy,
        average_mse = evaluation.average_mse,
        "model evaluation"
    );

    Ok(TrainedModel { learner, evaluation })
}
