use {
    crate::{InferError, Session},
    digit_base::Tensor,
    std::time::{Duration, Instant},
};

/// Classifier settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    classes: usize,
    threshold: f32,
    softmax: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            classes: 10,
            threshold: 0.7,
            softmax: false,
        }
    }
}

impl ClassifierConfig {
    /// Set the expected length of the score vector.
    pub fn with_classes(mut self, classes: usize) -> Self {
        self.classes = classes;
        self
    }

    /// Set the acceptance threshold. A score must be strictly greater.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Apply softmax to the raw output, for networks that emit logits.
    pub fn with_softmax(mut self, softmax: bool) -> Self {
        self.softmax = softmax;
        self
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn softmax(&self) -> bool {
        self.softmax
    }
}

/// Result of one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub scores: Vec<f32>,
    /// Highest-scoring class, accepted or not.
    pub best: usize,
    pub score: f32,
    /// `Some(best)` when `score` is above the threshold.
    pub label: Option<usize>,
    pub elapsed: Duration,
}

/// Index and value of the largest score. NaN never wins; ties go to the
/// lowest index. `None` when there is no comparable score.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .fold(None, |best, (index, score)| match best {
            Some((_, best_score)) if score <= best_score => best,
            _ => Some((index, score)),
        })
}

/// Numerically stable softmax. NaN inputs come out as NaN.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores
        .iter()
        .copied()
        .filter(|s| !s.is_nan())
        .fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return scores.to_vec();
    }
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().filter(|e| !e.is_nan()).sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// One network plus the arg-max and threshold policy around it.
pub struct Classifier {
    session: Box<dyn Session>,
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(session: Box<dyn Session>, config: ClassifierConfig) -> Self {
        Self { session, config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Shape the underlying session expects.
    pub fn input_shape(&self) -> &[usize] {
        self.session.input_shape()
    }

    /// Run the network on one normalized frame.
    pub fn classify(&mut self, input: &Tensor<f32>) -> Result<Prediction, InferError> {
        let start = Instant::now();
        let output = self.session.forward(input)?;
        let elapsed = start.elapsed();

        if output.data.len() != self.config.classes {
            return Err(InferError::Shape(format!(
                "expected {} scores, got {} (shape {:?})",
                self.config.classes,
                output.data.len(),
                output.shape
            )));
        }

        let scores = if self.config.softmax {
            softmax(&output.data)
        } else {
            output.data
        };
        let (best, score) = argmax(&scores)
            .ok_or_else(|| InferError::Runtime("network produced no comparable score".to_string()))?;
        let label = (score > self.config.threshold).then_some(best);

        log::debug!("forward pass took {:?}, scores {:?}", elapsed, scores);

        Ok(Prediction {
            scores,
            best,
            score,
            label,
            elapsed,
        })
    }
}
