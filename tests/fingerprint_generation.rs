//! End-to-end fingerprint generation against small, hand-built networks.

use personaforge::fingerprint::types::{FingerprintOverrides, ScreenConstraints};
use personaforge::fingerprint::FingerprintGenerator;
use personaforge::fingerprint::FingerprintGeneratorSources;
use personaforge::headers::{HeaderGeneratorOptions, HeaderGeneratorSources};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

fn input_network_json() -> Vec<u8> {
  json!({
    "nodes": [
      {
        "name": "*OPERATING_SYSTEM",
        "parentNames": [],
        "possibleValues": ["windows", "macos"],
        "conditionalProbabilities": { "windows": 0.5, "macos": 0.5 }
      },
      {
        "name": "*DEVICE",
        "parentNames": [],
        "possibleValues": ["desktop"],
        "conditionalProbabilities": { "desktop": 1.0 }
      },
      {
        "name": "*BROWSER_HTTP",
        "parentNames": ["*OPERATING_SYSTEM"],
        "possibleValues": ["chrome/120.0.0.0|2", "firefox/118.0|2"],
        "conditionalProbabilities": {
          "deeper": {
            "windows": { "chrome/120.0.0.0|2": 1.0 },
            "macos": { "firefox/118.0|2": 1.0 }
          }
        }
      }
    ]
  })
  .to_string()
  .into_bytes()
}

fn header_network_json() -> Vec<u8> {
  json!({
    "nodes": [
      {
        "name": "User-Agent",
        "parentNames": ["*BROWSER_HTTP"],
        "possibleValues": [
          "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0 Safari/537.36",
          "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15) Firefox/118.0"
        ],
        "conditionalProbabilities": {
          "deeper": {
            "chrome/120.0.0.0|2": {
              "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0 Safari/537.36": 1.0
            },
            "firefox/118.0|2": {
              "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15) Firefox/118.0": 1.0
            }
          }
        }
      }
    ]
  })
  .to_string()
  .into_bytes()
}

fn browser_helper_json() -> Vec<u8> {
  json!(["chrome/120.0.0.0|2", "firefox/118.0|2"]).to_string().into_bytes()
}

fn headers_order_json() -> Vec<u8> {
  json!({
    "chrome": ["User-Agent", "accept-language"],
    "firefox": ["User-Agent", "accept-language"]
  })
  .to_string()
  .into_bytes()
}

fn fingerprint_network_json() -> Vec<u8> {
  json!({
    "nodes": [
      {
        "name": "userAgent",
        "parentNames": [],
        "possibleValues": [
          "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0 Safari/537.36",
          "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15) Firefox/118.0"
        ],
        "conditionalProbabilities": {
          "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0 Safari/537.36": 0.5,
          "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15) Firefox/118.0": 0.5
        }
      },
      {
        "name": "screen",
        "parentNames": [],
        "possibleValues": [
          "*STRINGIFIED*{\"width\":1920,\"height\":1080}",
          "*STRINGIFIED*{\"width\":1366,\"height\":768}"
        ],
        "conditionalProbabilities": {
          "*STRINGIFIED*{\"width\":1920,\"height\":1080}": 0.5,
          "*STRINGIFIED*{\"width\":1366,\"height\":768}": 0.5
        }
      },
      {
        "name": "platform",
        "parentNames": ["userAgent"],
        "possibleValues": ["Win32", "MacIntel"],
        "conditionalProbabilities": {
          "deeper": {
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0 Safari/537.36": { "Win32": 1.0 },
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15) Firefox/118.0": { "MacIntel": 1.0 }
          }
        }
      },
      {
        "name": "hardwareConcurrency",
        "parentNames": [],
        "possibleValues": ["8"],
        "conditionalProbabilities": { "8": 1.0 }
      }
    ]
  })
  .to_string()
  .into_bytes()
}

fn build_generator() -> FingerprintGenerator {
  let _ = env_logger::builder().is_test(true).try_init();

  let sources = FingerprintGeneratorSources {
    fingerprint_network: &fingerprint_network_json(),
    headers: HeaderGeneratorSources {
      input_network: &input_network_json(),
      header_network: &header_network_json(),
      browser_helper_json: &browser_helper_json(),
      headers_order_json: &headers_order_json(),
    },
  };
  FingerprintGenerator::new(sources, HeaderGeneratorOptions::default()).expect("generator should build")
}

#[test]
fn generates_a_fingerprint_whose_platform_matches_its_user_agent() {
  let generator = build_generator();
  let mut rng = StdRng::seed_from_u64(1);

  let result = generator
    .generate(&FingerprintOverrides::default(), &mut rng)
    .expect("fingerprint should generate");

  let ua = result.fingerprint.navigator.user_agent.clone();
  assert!(!ua.is_empty());

  if ua.contains("Chrome") {
    assert_eq!(result.fingerprint.navigator.platform, "Win32");
  } else {
    assert!(ua.contains("Firefox"));
    assert_eq!(result.fingerprint.navigator.platform, "MacIntel");
  }

  assert!(result.fingerprint.screen.width > 0);
  assert_eq!(result.headers.get("User-Agent"), Some(&ua));
}

#[test]
fn screen_constraints_are_respected() {
  let generator = build_generator();
  let mut rng = StdRng::seed_from_u64(2);

  let overrides = FingerprintOverrides {
    screen: Some(ScreenConstraints::new().with_min_width(1900).with_max_width(1920)),
    ..Default::default()
  };

  let result = generator.generate(&overrides, &mut rng).expect("fingerprint should generate");
  assert_eq!(result.fingerprint.screen.width, 1920);
  assert_eq!(result.fingerprint.screen.height, 1080);
}

#[test]
fn generation_is_deterministic_given_the_same_seed() {
  let generator = build_generator();

  let mut rng_a = StdRng::seed_from_u64(7);
  let mut rng_b = StdRng::seed_from_u64(7);

  let a = generator.generate(&FingerprintOverrides::default(), &mut rng_a).unwrap();
  let b = generator.generate(&FingerprintOverrides::default(), &mut rng_b).unwrap();

  assert_eq!(a.fingerprint.navigator.user_agent, b.fingerprint.navigator.user_agent);
  assert_eq!(a.fingerprint.screen.width, b.fingerprint.screen.width);
  assert_eq!(a.headers, b.headers);
}

#[test]
fn generated_fingerprint_reports_the_hardware_concurrency_from_the_network() {
  let generator = build_generator();
  let mut rng = StdRng::seed_from_u64(3);

  let result = generator
    .generate(&FingerprintOverrides::default(), &mut rng)
    .expect("fingerprint should generate");

  assert_eq!(result.fingerprint.navigator.hardware_concurrency, 8);
}
