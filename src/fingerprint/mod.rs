//! Composes the header generator with a fingerprint Bayesian network to
//! produce a full browser identity: HTTP headers plus a structured
//! fingerprint, sampled consistently with the same User-Agent.

pub mod types;

use crate::headers::{
  Browser, HeaderError, HeaderGenerator, HeaderGeneratorOptions, HeaderGeneratorSources, HeaderOverrides, Headers,
};
use crate::network::{Assignment, BayesianNetwork, LoaderError};
use rand::RngCore;
use std::collections::HashMap;
use types::*;

const MAX_RETRIES: u32 = 10;

/// Raw byte sources for a `FingerprintGenerator`: the fingerprint network
/// plus everything `HeaderGenerator` needs.
pub struct FingerprintGeneratorSources<'a> {
  pub fingerprint_network: &'a [u8],
  pub headers: HeaderGeneratorSources<'a>,
}

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
  #[error("network loading error: {0}")]
  Network(#[from] LoaderError),

  #[error("header generation error: {0}")]
  Header(#[from] HeaderError),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("failed to generate a consistent fingerprint after {0} attempts")]
  GenerationFailed(u32),
}

pub struct FingerprintGenerator {
  fingerprint_network: BayesianNetwork,
  header_generator: HeaderGenerator,
}

impl FingerprintGenerator {
  pub fn new(
    sources: FingerprintGeneratorSources,
    header_options: HeaderGeneratorOptions,
  ) -> Result<Self, FingerprintError> {
    let fingerprint_network = BayesianNetwork::load(sources.fingerprint_network)?;
    let header_generator = HeaderGenerator::new(sources.headers, header_options)?;

    Ok(Self {
      fingerprint_network,
      header_generator,
    })
  }

  /// Generates a fingerprint and a consistent header set, retrying up to a
  /// bounded number of times when a sampled User-Agent turns out to have no
  /// fingerprint consistent with the requested screen constraints. In
  /// non-strict mode, a failed attempt is retried once more with the screen
  /// constraint dropped before moving on to a fresh User-Agent.
  ///
  /// The reference implementation retries unboundedly; bounding it here
  /// turns a pathological combination of constraints into an error instead
  /// of a hang.
  pub fn generate(
    &self,
    overrides: &FingerprintOverrides,
    rng: &mut dyn RngCore,
  ) -> Result<FingerprintWithHeaders, FingerprintError> {
    let header_overrides = self.build_header_overrides(overrides);

    let screen_values = overrides
      .screen
      .as_ref()
      .filter(|s| s.is_set())
      .and_then(|constraints| self.filter_screen_values(constraints));

    let screen_required = overrides.screen.as_ref().is_some_and(|s| s.is_set());
    if overrides.strict && screen_required && screen_values.is_none() {
      return Err(FingerprintError::GenerationFailed(0));
    }

    for _attempt in 0..MAX_RETRIES {
      let headers = self.header_generator.generate(&header_overrides, rng)?;

      let Some(user_agent) = headers.get("User-Agent").or_else(|| headers.get("user-agent")) else {
        continue;
      };

      let mut fp_constraints: HashMap<String, Vec<String>> = HashMap::new();
      fp_constraints.insert("userAgent".to_string(), vec![user_agent.clone()]);
      if let Some(values) = &screen_values {
        fp_constraints.insert("screen".to_string(), values.clone());
      }

      let fp_sample = match self
        .fingerprint_network
        .generate_consistent_sample_when_possible(&fp_constraints, rng)
      {
        Some(sample) => sample,
        None if !overrides.strict && screen_values.is_some() => {
          log::debug!("no consistent fingerprint sample with the screen constraint, retrying without it");
          fp_constraints.remove("screen");
          match self
            .fingerprint_network
            .generate_consistent_sample_when_possible(&fp_constraints, rng)
          {
            Some(sample) => sample,
            None => {
              log::debug!("no consistent fingerprint sample for this User-Agent, retrying");
              continue;
            }
          }
        }
        None => {
          log::debug!("no consistent fingerprint sample for this User-Agent, retrying");
          continue;
        }
      };

      match self.transform_sample(&fp_sample, &headers, overrides) {
        Ok(result) => return Ok(result),
        Err(err) => {
          log::debug!("failed to transform a sampled fingerprint: {err}");
          continue;
        }
      }
    }

    Err(FingerprintError::GenerationFailed(MAX_RETRIES))
  }

  /// Convenience entry point for callers that don't need reproducible
  /// output: draws from the thread-local RNG instead of an injected one.
  pub fn generate_default(
    &self,
    overrides: &FingerprintOverrides,
  ) -> Result<FingerprintWithHeaders, FingerprintError> {
    self.generate(overrides, &mut rand::rng())
  }

  fn build_header_overrides(&self, overrides: &FingerprintOverrides) -> HeaderOverrides {
    HeaderOverrides {
      browsers: overrides
        .browsers
        .clone()
        .map(|names| names.into_iter().map(Browser::new).collect()),
      operating_systems: overrides.operating_systems.clone(),
      devices: overrides.devices.clone(),
      locales: overrides.locales.clone(),
      http_version: overrides.http_version.clone(),
      user_agents: None,
      strict: Some(overrides.strict),
      request_dependent_headers: None,
    }
  }

  /// Narrows the fingerprint network's `screen` node to the values whose
  /// encoded width/height fall within the requested constraints.
  fn filter_screen_values(&self, constraints: &ScreenConstraints) -> Option<Vec<String>> {
    let possible_values = self.fingerprint_network.get_possible_values("screen")?;

    let filtered: Vec<String> = possible_values
      .iter()
      .filter(|screen_str| {
        let Some(json_str) = screen_str.strip_prefix(STRINGIFIED_PREFIX) else {
          return true;
        };
        let Ok(screen) = serde_json::from_str::<serde_json::Value>(json_str) else {
          return true;
        };
        let width = screen["width"].as_u64().unwrap_or(0) as u32;
        let height = screen["height"].as_u64().unwrap_or(0) as u32;
        constraints.matches(width, height)
      })
      .cloned()
      .collect();

    if filtered.is_empty() {
      None
    } else {
      Some(filtered)
    }
  }

  fn transform_sample(
    &self,
    fp_sample: &Assignment,
    headers: &Headers,
    overrides: &FingerprintOverrides,
  ) -> Result<FingerprintWithHeaders, FingerprintError> {
    let mut parsed: HashMap<String, serde_json::Value> = HashMap::new();

    for (key, value) in fp_sample {
      if value == MISSING_VALUE_DATASET_TOKEN {
        continue;
      }
      let parsed_value = if let Some(json_str) = value.strip_prefix(STRINGIFIED_PREFIX) {
        serde_json::from_str(json_str)?
      } else {
        serde_json::Value::String(value.clone())
      };
      parsed.insert(key.clone(), parsed_value);
    }

    let screen = parsed
      .get("screen")
      .and_then(|v| serde_json::from_value(v.clone()).ok())
      .unwrap_or_default();

    let accept_language = headers
      .get("Accept-Language")
      .or_else(|| headers.get("accept-language"))
      .cloned()
      .unwrap_or_else(|| "en-US".to_string());

    let languages: Vec<String> = accept_language
      .split(',')
      .map(|s| s.split(';').next().unwrap_or(s).trim().to_string())
      .filter(|s| !s.is_empty())
      .collect();
    let languages = if languages.is_empty() {
      vec!["en-US".to_string()]
    } else {
      languages
    };
    let language = languages.first().cloned().unwrap_or_else(|| "en-US".to_string());

    let navigator = NavigatorFingerprint {
      user_agent: get_string(&parsed, "userAgent"),
      user_agent_data: parsed
        .get("userAgentData")
        .and_then(|v| serde_json::from_value(v.clone()).ok()),
      do_not_track: parsed.get("doNotTrack").and_then(|v| v.as_str().map(String::from)),
      app_code_name: get_string_or(&parsed, "appCodeName", "Mozilla"),
      app_name: get_string_or(&parsed, "appName", "Netscape"),
      app_version: get_string(&parsed, "appVersion"),
      oscpu: parsed.get("oscpu").and_then(|v| v.as_str().map(String::from)),
      webdriver: parsed.get("webdriver").and_then(|v| v.as_str().map(String::from)),
      language,
      languages,
      platform: get_string(&parsed, "platform"),
      device_memory: parsed
        .get("deviceMemory")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok()),
      hardware_concurrency: parsed
        .get("hardwareConcurrency")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(4),
      product: get_string_or(&parsed, "product", "Gecko"),
      product_sub: get_string(&parsed, "productSub"),
      vendor: get_string(&parsed, "vendor"),
      vendor_sub: get_string(&parsed, "vendorSub"),
      // The training data encodes a real value here only for touch-capable
      // devices; the type's Default (0) already matches a non-touch desktop.
      max_touch_points: parsed
        .get("maxTouchPoints")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or_default(),
      extra_properties: parsed
        .get("extraProperties")
        .and_then(|v| serde_json::from_value(v.clone()).ok()),
    };

    let video_card = parsed
      .get("videoCard")
      .and_then(|v| serde_json::from_value(v.clone()).ok())
      .unwrap_or_default();
    let audio_codecs = parsed
      .get("audioCodecs")
      .and_then(|v| serde_json::from_value(v.clone()).ok())
      .unwrap_or_default();
    let video_codecs = parsed
      .get("videoCodecs")
      .and_then(|v| serde_json::from_value(v.clone()).ok())
      .unwrap_or_default();
    let plugins_data = parsed
      .get("pluginsData")
      .and_then(|v| serde_json::from_value(v.clone()).ok())
      .unwrap_or_default();
    let battery = parsed.get("battery").and_then(|v| serde_json::from_value(v.clone()).ok());
    let multimedia_devices = parsed
      .get("multimediaDevices")
      .and_then(|v| serde_json::from_value(v.clone()).ok())
      .unwrap_or_default();
    let fonts = parsed
      .get("fonts")
      .and_then(|v| serde_json::from_value(v.clone()).ok())
      .unwrap_or_default();

    let fingerprint = Fingerprint {
      screen,
      navigator,
      video_codecs,
      audio_codecs,
      plugins_data,
      battery,
      video_card,
      multimedia_devices,
      fonts,
      mock_web_rtc: overrides.mock_web_rtc,
      slim: overrides.slim,
    };

    let headers: Headers = headers
      .iter()
      .filter(|(k, v)| !k.starts_with('*') && v.as_str() != MISSING_VALUE_DATASET_TOKEN)
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect();

    Ok(FingerprintWithHeaders { fingerprint, headers })
  }
}

fn get_string(map: &HashMap<String, serde_json::Value>, key: &str) -> String {
  map.get(key).and_then(|v| v.as_str()).map(String::from).unwrap_or_default()
}

fn get_string_or(map: &HashMap<String, serde_json::Value>, key: &str, default: &str) -> String {
  map
    .get(key)
    .and_then(|v| v.as_str())
    .map(String::from)
    .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn transform_sample_drops_missing_value_entries_and_internal_nodes() {
    let mut fp_sample: Assignment = HashMap::new();
    fp_sample.insert("userAgent".to_string(), "ua".to_string());
    fp_sample.insert("oscpu".to_string(), MISSING_VALUE_DATASET_TOKEN.to_string());

    let mut parsed: HashMap<String, serde_json::Value> = HashMap::new();
    for (key, value) in &fp_sample {
      if value == MISSING_VALUE_DATASET_TOKEN {
        continue;
      }
      parsed.insert(key.clone(), serde_json::Value::String(value.clone()));
    }

    assert!(!parsed.contains_key("oscpu"));
    assert_eq!(get_string(&parsed, "userAgent"), "ua");
  }

  #[test]
  fn get_string_or_falls_back_to_default_when_key_absent() {
    let map: HashMap<String, serde_json::Value> = HashMap::new();
    assert_eq!(get_string_or(&map, "appName", "Netscape"), "Netscape");
  }
}
