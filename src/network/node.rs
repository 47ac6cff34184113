//! A single node in a Bayesian network and its conditional probability table.
//!
//! Weighted sampling from a flattened distribution, following the same
//! cumulative-anchor walk regardless of how deep the conditioning goes.

use rand::{Rng, RngCore};
use serde::Deserialize;
use std::collections::HashMap;

/// Node definition as it appears in a trained network's JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
  pub name: String,
  #[serde(default)]
  pub parent_names: Vec<String>,
  pub possible_values: Vec<String>,
  pub conditional_probabilities: ConditionalProbabilities,
}

/// Conditional probability table: either a further level of conditioning
/// keyed by a parent's value (`deeper`, with `skip` as the fallback when the
/// parent's value isn't covered), or a terminal value -> probability map.
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionalProbabilities {
  #[serde(default)]
  pub deeper: Option<HashMap<String, ConditionalProbabilities>>,
  #[serde(default)]
  pub skip: Option<Box<ConditionalProbabilities>>,
  #[serde(flatten)]
  pub probabilities: HashMap<String, f64>,
}

impl ConditionalProbabilities {
  /// A node with no further conditioning left to resolve.
  pub fn is_terminal(&self) -> bool {
    self.deeper.is_none()
  }
}

/// A single node in the Bayesian network, capable of sampling its own
/// conditional distribution given already-known parent values.
pub struct BayesianNode {
  definition: NodeDefinition,
}

impl BayesianNode {
  pub fn new(definition: NodeDefinition) -> Self {
    Self { definition }
  }

  pub fn name(&self) -> &str {
    &self.definition.name
  }

  pub fn parent_names(&self) -> &[String] {
    &self.definition.parent_names
  }

  pub fn possible_values(&self) -> &[String] {
    &self.definition.possible_values
  }

  pub fn conditional_probabilities(&self) -> &ConditionalProbabilities {
    &self.definition.conditional_probabilities
  }

  /// Descends the CPT one parent at a time, following `deeper` when the
  /// parent's value is known and covered, `skip` otherwise.
  fn get_probabilities_given_known_values(
    &self,
    parent_values: &HashMap<String, String>,
  ) -> HashMap<String, f64> {
    let mut probabilities = &self.definition.conditional_probabilities;

    for parent_name in &self.definition.parent_names {
      if let Some(deeper) = &probabilities.deeper {
        if let Some(parent_value) = parent_values.get(parent_name) {
          if let Some(next_level) = deeper.get(parent_value) {
            probabilities = next_level;
            continue;
          }
        }
        if let Some(skip) = &probabilities.skip {
          probabilities = skip;
        }
      }
    }

    probabilities.probabilities.clone()
  }

  /// Draws a uniform anchor in `[0,1)` and walks `possible_values` in order,
  /// returning the first value whose cumulative probability exceeds it. No
  /// renormalization: a restricted candidate set is walked against the raw
  /// probabilities from the full distribution, so truncating the set simply
  /// shifts mass towards earlier values rather than rescaling the anchor.
  fn sample_random_value_from_possibilities(
    possible_values: &[String],
    probabilities: &HashMap<String, f64>,
    rng: &mut dyn RngCore,
  ) -> String {
    if possible_values.is_empty() {
      return String::new();
    }

    let anchor = rng.random::<f64>();
    let mut cumulative = 0.0;

    for value in possible_values {
      if let Some(&prob) = probabilities.get(value) {
        cumulative += prob;
        if cumulative > anchor {
          return value.clone();
        }
      }
    }

    possible_values.first().cloned().unwrap_or_default()
  }

  /// Samples a value from the conditional distribution given parent values.
  pub fn sample(&self, parent_values: &HashMap<String, String>, rng: &mut dyn RngCore) -> String {
    let probabilities = self.get_probabilities_given_known_values(parent_values);
    let possible_values: Vec<String> = probabilities.keys().cloned().collect();
    Self::sample_random_value_from_possibilities(&possible_values, &probabilities, rng)
  }

  /// Samples from the conditional distribution restricted to `value_possibilities`
  /// (falling back to whatever values this parent combination actually assigns
  /// probability to) and excluding `banned_values`. Returns `None` if nothing
  /// in the restriction is reachable.
  pub fn sample_according_to_restrictions(
    &self,
    parent_values: &HashMap<String, String>,
    value_possibilities: Option<&[String]>,
    banned_values: &[String],
    rng: &mut dyn RngCore,
  ) -> Option<String> {
    let probabilities = self.get_probabilities_given_known_values(parent_values);
    let values_in_distribution: Vec<String> = probabilities.keys().cloned().collect();
    let possible_values = value_possibilities.unwrap_or(&values_in_distribution);

    let mut valid_values = Vec::new();

    for value in possible_values {
      if !banned_values.contains(value) && values_in_distribution.contains(value) {
        valid_values.push(value.clone());
      }
    }

    if valid_values.is_empty() {
      return None;
    }

    Some(Self::sample_random_value_from_possibilities(
      &valid_values,
      &probabilities,
      rng,
    ))
  }
}
