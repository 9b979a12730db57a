//! AlphaZero domain types with enforced invariants.
//!
//! These types ensure critical invariants are maintained at the type level:
//! - Policy: probability distribution summing to 1.0
//! - Value: game value in range [-1, 1]

use crate::{Result, ZeroError};
use serde::{Deserialize, Serialize};

/// Tolerance for policy sum validation.
const POLICY_SUM_TOLERANCE: f32 = 1e-5;

/// A probability distribution over action indices.
///
/// Invariant: All values are non-negative and sum to 1.0 (±1e-5).
///
/// # Example
/// ```
/// use alphazero_core::Policy;
///
/// let policy = Policy::new(vec![0.3, 0.5, 0.2]).unwrap();
/// assert!((policy.sum() - 1.0).abs() < 1e-5);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Policy(Vec<f32>);

impl Policy {
    /// Create a new policy from a probability distribution.
    ///
    /// # Errors
    /// Returns `ZeroError::InvalidPolicy` if:
    /// - Any value is negative
    /// - Values don't sum to 1.0 (±1e-5)
    /// - Vector is empty
    pub fn new(probs: Vec<f32>) -> Result<Self> {
        if probs.is_empty() {
            return Err(ZeroError::InvalidPolicy(
                "policy cannot be empty".to_string(),
            ));
        }

        if probs.iter().any(|&p| p < 0.0 || !p.is_finite()) {
            return Err(ZeroError::InvalidPolicy(
                "policy contains negative or non-finite values".to_string(),
            ));
        }

        let sum: f32 = probs.iter().sum();
        if (sum - 1.0).abs() > POLICY_SUM_TOLERANCE {
            return Err(ZeroError::InvalidPolicy(format!(
                "policy sum {} is not 1.0 (tolerance {})",
                sum, POLICY_SUM_TOLERANCE
            )));
        }

        Ok(Self(probs))
    }

    /// Create a policy from raw values, normalizing them to sum to 1.0.
    ///
    /// # Errors
    /// Returns error if any value is negative or all values are zero.
    pub fn from_unnormalized(values: Vec<f32>) -> Result<Self> {
        if values.is_empty() {
            return Err(ZeroError::InvalidPolicy(
                "policy cannot be empty".to_string(),
            ));
        }

        if values.iter().any(|&v| v < 0.0 || !v.is_finite()) {
            return Err(ZeroError::InvalidPolicy(
                "policy contains negative or non-finite values".to_string(),
            ));
        }

        let sum: f64 = values.iter().map(|&v| v as f64).sum();
        if sum == 0.0 {
            return Err(ZeroError::InvalidPolicy(
                "cannot normalize: all values are zero".to_string(),
            ));
        }

        Ok(Self(values.iter().map(|&v| (v as f64 / sum) as f32).collect()))
    }

    /// Create a uniform policy over the given number of actions.
    ///
    /// # Errors
    /// Returns error if num_actions is zero.
    pub fn uniform(num_actions: usize) -> Result<Self> {
        if num_actions == 0 {
            return Err(ZeroError::InvalidPolicy(
                "cannot create uniform policy with 0 actions".to_string(),
            ));
        }

        let prob = 1.0 / num_actions as f32;
        Ok(Self(vec![prob; num_actions]))
    }

    /// Uniform distribution over the legal entries of `legal`, zero elsewhere.
    pub fn uniform_over(legal: &[bool]) -> Result<Self> {
        let count = legal.iter().filter(|&&l| l).count();
        if count == 0 {
            return Err(ZeroError::NoLegalActions);
        }
        let prob = 1.0 / count as f32;
        Ok(Self(
            legal.iter().map(|&l| if l { prob } else { 0.0 }).collect(),
        ))
    }

    /// Restrict `raw` to the legal entries of `legal` and renormalize.
    ///
    /// Negative and non-finite entries count as zero mass.
    ///
    /// # Errors
    /// - `NoLegalActions` if the mask is empty
    /// - `DegenerateMask` if no legal action carries positive mass
    /// - `InvalidPolicy` if the lengths differ
    pub fn masked(raw: &[f32], legal: &[bool]) -> Result<Self> {
        if raw.len() != legal.len() {
            return Err(ZeroError::InvalidPolicy(format!(
                "policy length {} does not match action space {}",
                raw.len(),
                legal.len()
            )));
        }

        let legal_count = legal.iter().filter(|&&l| l).count();
        if legal_count == 0 {
            return Err(ZeroError::NoLegalActions);
        }

        let mass = |p: f32, l: bool| {
            if l && p.is_finite() && p > 0.0 {
                p as f64
            } else {
                0.0
            }
        };

        let sum: f64 = raw.iter().zip(legal).map(|(&p, &l)| mass(p, l)).sum();
        if sum <= 0.0 {
            return Err(ZeroError::DegenerateMask { legal: legal_count });
        }

        Ok(Self(
            raw.iter()
                .zip(legal)
                .map(|(&p, &l)| (mass(p, l) / sum) as f32)
                .collect(),
        ))
    }

    /// Get the number of actions in this policy.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the policy is empty (should never be true for valid policies).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the sum of all probabilities (should be ~1.0).
    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    /// Get the underlying vector (consumes self).
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Get a reference to the underlying slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Iterate over the probabilities.
    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Policy {
    type Output = f32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// A game value estimate.
///
/// Invariant: Value is in range [-1, 1] where:
/// - +1 means the player to move is winning
/// - -1 means the player to move is losing
/// - 0 means a draw or equal position
///
/// Deserialization goes through [`Value::new`], so out-of-range values in a
/// stored replay buffer are rejected on load.
///
/// # Example
/// ```
/// use alphazero_core::Value;
///
/// let value = Value::new(0.5).unwrap();
/// assert!(value.get() >= -1.0 && value.get() <= 1.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Value(f32);

impl Value {
    /// Create a new value.
    ///
    /// # Errors
    /// Returns `ZeroError::InvalidValue` if the value is outside [-1, 1].
    pub fn new(value: f32) -> Result<Self> {
        if !(-1.0..=1.0).contains(&value) {
            return Err(ZeroError::InvalidValue(format!(
                "value {} is outside range [-1, 1]",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Create a value by clamping to [-1, 1].
    ///
    /// NaN maps to a draw.
    pub fn clamped(value: f32) -> Self {
        if value.is_nan() {
            return Self::DRAW;
        }
        Self(value.clamp(-1.0, 1.0))
    }

    /// Value for a win.
    pub const WIN: Self = Self(1.0);

    /// Value for a loss.
    pub const LOSS: Self = Self(-1.0);

    /// Value for a draw.
    pub const DRAW: Self = Self(0.0);

    /// Get the underlying value.
    pub fn get(self) -> f32 {
        self.0
    }

    /// Negate the value (for opponent's perspective).
    pub fn negate(self) -> Self {
        Self(-self.0)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl From<Value> for f32 {
    fn from(v: Value) -> f32 {
        v.0
    }
}

impl TryFrom<f32> for Value {
    type Error = ZeroError;

    fn try_from(value: f32) -> Result<Self> {
        Self::new(value)
    }
}
