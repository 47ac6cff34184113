//! Generates HTTP headers consistent with a browser/OS/device profile,
//! using an input network and a header network plus a relaxation ladder
//! when the requested combination has no exact solution.

pub mod utils;

use crate::network::{closure, graph::Assignment, BayesianNetwork, LoaderError};
use indexmap::IndexMap;
use rand::RngCore;
use std::collections::HashMap;
use utils::{get_browser, get_user_agent, pascalize_headers};

/// Order-preserving header map: the header order in the output is an
/// externally observable, tested property, which a hash map can't provide.
pub type Headers = IndexMap<String, String>;

pub const SUPPORTED_BROWSERS: &[&str] = &["chrome", "firefox", "safari", "edge"];
pub const SUPPORTED_OPERATING_SYSTEMS: &[&str] = &["windows", "macos", "linux", "android", "ios"];
pub const SUPPORTED_DEVICES: &[&str] = &["desktop", "mobile"];
pub const SUPPORTED_HTTP_VERSIONS: &[&str] = &["1", "2"];
pub const MISSING_VALUE_DATASET_TOKEN: &str = "*MISSING_VALUE*";

const HTTP1_SEC_FETCH_ATTRIBUTES: &[(&str, &str)] = &[
  ("Sec-Fetch-Mode", "same-site"),
  ("Sec-Fetch-Dest", "navigate"),
  ("Sec-Fetch-Site", "?1"),
  ("Sec-Fetch-User", "document"),
];
const HTTP2_SEC_FETCH_ATTRIBUTES: &[(&str, &str)] = &[
  ("sec-fetch-mode", "same-site"),
  ("sec-fetch-dest", "navigate"),
  ("sec-fetch-site", "?1"),
  ("sec-fetch-user", "document"),
];

const BROWSER_HTTP_NODE_NAME: &str = "*BROWSER_HTTP";
const OPERATING_SYSTEM_NODE_NAME: &str = "*OPERATING_SYSTEM";
const DEVICE_NODE_NAME: &str = "*DEVICE";

/// Errors that can occur while generating headers.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
  #[error("network loading error: {0}")]
  Loader(#[from] LoaderError),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("browser min version ({min}) cannot exceed max version ({max})")]
  InvalidVersionRange { min: u32, max: u32 },

  #[error("constraint closure error: {0}")]
  Closure(#[from] closure::ClosureError),

  #[error("no headers based on this input can be generated; relax or change some of the requirements you specified")]
  NoSolution,

  #[error("failed to find a User-Agent in the generated headers")]
  MissingUserAgent,

  #[error("failed to determine a browser from the generated User-Agent")]
  UnknownBrowser,
}

/// A browser name with optional version bounds and HTTP version. A `None`
/// `http_version` means "use whatever the generator's effective HTTP
/// version is", rather than duplicating that value onto every browser.
#[derive(Debug, Clone)]
pub struct Browser {
  pub name: String,
  pub min_version: Option<u32>,
  pub max_version: Option<u32>,
  pub http_version: Option<String>,
}

impl Browser {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      min_version: None,
      max_version: None,
      http_version: None,
    }
  }

  pub fn with_http_version(mut self, http_version: impl Into<String>) -> Self {
    self.http_version = Some(http_version.into());
    self
  }

  pub fn with_version_range(
    mut self,
    min_version: Option<u32>,
    max_version: Option<u32>,
  ) -> Result<Self, HeaderError> {
    if let (Some(min), Some(max)) = (min_version, max_version) {
      if min > max {
        return Err(HeaderError::InvalidVersionRange { min, max });
      }
    }
    self.min_version = min_version;
    self.max_version = max_version;
    Ok(self)
  }

  fn resolved(&self, effective_http_version: &str) -> Browser {
    let mut b = self.clone();
    if b.http_version.is_none() {
      b.http_version = Some(effective_http_version.to_string());
    }
    b
  }
}

/// A parsed `name/version|httpVersion` entry from the browser helper list.
#[derive(Debug, Clone)]
pub struct HttpBrowserObject {
  pub name: Option<String>,
  pub version: Vec<u32>,
  pub complete_string: String,
  pub http_version: String,
}

impl HttpBrowserObject {
  pub fn is_http2(&self) -> bool {
    self.http_version == "2"
  }

  pub fn major_version(&self) -> u32 {
    self.version.first().copied().unwrap_or(0)
  }
}

fn prepare_http_browser_object(s: &str) -> HttpBrowserObject {
  if s == MISSING_VALUE_DATASET_TOKEN {
    return HttpBrowserObject {
      name: None,
      version: Vec::new(),
      complete_string: MISSING_VALUE_DATASET_TOKEN.to_string(),
      http_version: String::new(),
    };
  }

  let mut top = s.splitn(2, '|');
  let browser_string = top.next().unwrap_or("");
  let http_version = top.next().unwrap_or("").to_string();

  let mut browser_parts = browser_string.splitn(2, '/');
  let name = browser_parts.next().unwrap_or("").to_string();
  let version_string = browser_parts.next().unwrap_or("");
  let version: Vec<u32> = version_string.split('.').filter_map(|v| v.parse().ok()).collect();

  HttpBrowserObject {
    name: Some(name),
    version,
    complete_string: s.to_string(),
    http_version,
  }
}

/// The four overridable dimensions, relaxed in this order (dropping exactly
/// one per step) when the requested combination has no solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelaxKey {
  Locales,
  Devices,
  OperatingSystems,
  Browsers,
}

const RELAXATION_ORDER: [RelaxKey; 4] = [
  RelaxKey::Locales,
  RelaxKey::Devices,
  RelaxKey::OperatingSystems,
  RelaxKey::Browsers,
];

/// Per-call overrides of the generator's defaults. Each field's `Option`-ness
/// directly records whether this call overrode it, which is what drives the
/// relaxation ladder: only explicitly overridden dimensions are ever relaxed,
/// never the generator's own constructor defaults.
#[derive(Debug, Clone, Default)]
pub struct HeaderOverrides {
  pub browsers: Option<Vec<Browser>>,
  pub operating_systems: Option<Vec<String>>,
  pub devices: Option<Vec<String>>,
  pub locales: Option<Vec<String>>,
  pub http_version: Option<String>,
  pub user_agents: Option<Vec<String>>,
  pub strict: Option<bool>,
  pub request_dependent_headers: Option<Headers>,
}

#[derive(Debug, Clone, Default)]
struct ActiveOverrides {
  browsers: Option<Vec<Browser>>,
  operating_systems: Option<Vec<String>>,
  devices: Option<Vec<String>>,
  locales: Option<Vec<String>>,
  http_version: Option<String>,
}

impl ActiveOverrides {
  fn has(&self, key: RelaxKey) -> bool {
    match key {
      RelaxKey::Locales => self.locales.is_some(),
      RelaxKey::Devices => self.devices.is_some(),
      RelaxKey::OperatingSystems => self.operating_systems.is_some(),
      RelaxKey::Browsers => self.browsers.is_some(),
    }
  }

  fn clear(&mut self, key: RelaxKey) {
    match key {
      RelaxKey::Locales => self.locales = None,
      RelaxKey::Devices => self.devices = None,
      RelaxKey::OperatingSystems => self.operating_systems = None,
      RelaxKey::Browsers => self.browsers = None,
    }
  }
}

/// Constructor-time options, mirroring `HeaderOverrides` but with every
/// field required since these are the generator's baseline defaults.
#[derive(Debug, Clone)]
pub struct HeaderGeneratorOptions {
  pub browsers: Vec<Browser>,
  pub operating_systems: Vec<String>,
  pub devices: Vec<String>,
  pub locales: Vec<String>,
  pub http_version: String,
  pub strict: bool,
}

impl Default for HeaderGeneratorOptions {
  fn default() -> Self {
    Self {
      browsers: SUPPORTED_BROWSERS.iter().map(|s| Browser::new(*s)).collect(),
      operating_systems: SUPPORTED_OPERATING_SYSTEMS.iter().map(|s| s.to_string()).collect(),
      devices: SUPPORTED_DEVICES.iter().map(|s| s.to_string()).collect(),
      locales: vec!["en-US".to_string()],
      http_version: "2".to_string(),
      strict: false,
    }
  }
}

/// Raw byte sources for the data a `HeaderGenerator` needs: two trained
/// networks and two lookup tables. Supplied explicitly by the caller
/// (`include_bytes!`, a file read, a fetch) rather than bundled into the
/// library.
pub struct HeaderGeneratorSources<'a> {
  pub input_network: &'a [u8],
  pub header_network: &'a [u8],
  pub browser_helper_json: &'a [u8],
  pub headers_order_json: &'a [u8],
}

pub struct HeaderGenerator {
  input_network: BayesianNetwork,
  header_network: BayesianNetwork,
  unique_browsers: Vec<HttpBrowserObject>,
  headers_order: HashMap<String, Vec<String>>,
  default_browsers: Vec<Browser>,
  default_operating_systems: Vec<String>,
  default_devices: Vec<String>,
  default_locales: Vec<String>,
  default_http_version: String,
  default_strict: bool,
}

impl HeaderGenerator {
  pub fn new(
    sources: HeaderGeneratorSources,
    options: HeaderGeneratorOptions,
  ) -> Result<Self, HeaderError> {
    let input_network = BayesianNetwork::load(sources.input_network)?;
    let header_network = BayesianNetwork::load(sources.header_network)?;

    let browser_strings: Vec<String> = serde_json::from_slice(sources.browser_helper_json)?;
    let unique_browsers: Vec<HttpBrowserObject> = browser_strings
      .iter()
      .filter(|s| s.as_str() != MISSING_VALUE_DATASET_TOKEN)
      .map(|s| prepare_http_browser_object(s))
      .collect();

    let headers_order: HashMap<String, Vec<String>> =
      serde_json::from_slice(sources.headers_order_json)?;

    Ok(Self {
      input_network,
      header_network,
      unique_browsers,
      headers_order,
      default_browsers: options.browsers,
      default_operating_systems: options.operating_systems,
      default_devices: options.devices,
      default_locales: options.locales,
      default_http_version: options.http_version,
      default_strict: options.strict,
    })
  }

  /// Generates a header set using the constructor defaults plus any
  /// overrides given here.
  pub fn generate(&self, overrides: &HeaderOverrides, rng: &mut dyn RngCore) -> Result<Headers, HeaderError> {
    let active = ActiveOverrides {
      browsers: overrides.browsers.clone(),
      operating_systems: overrides.operating_systems.clone(),
      devices: overrides.devices.clone(),
      locales: overrides.locales.clone(),
      http_version: overrides.http_version.clone(),
    };
    let request_dependent_headers = overrides.request_dependent_headers.clone().unwrap_or_default();
    let strict = overrides.strict.unwrap_or(self.default_strict);

    let generated = self.get_headers(
      &request_dependent_headers,
      overrides.user_agents.as_deref(),
      active,
      strict,
      rng,
    )?;

    let effective_http_version = overrides
      .http_version
      .clone()
      .unwrap_or_else(|| self.default_http_version.clone());

    if effective_http_version == "2" {
      Ok(pascalize_headers(&generated))
    } else {
      Ok(generated)
    }
  }

  /// Convenience entry point for callers that don't need reproducible
  /// output: draws from the thread-local RNG instead of an injected one.
  pub fn generate_default(&self, overrides: &HeaderOverrides) -> Result<Headers, HeaderError> {
    self.generate(overrides, &mut rand::rng())
  }

  fn get_headers(
    &self,
    request_dependent_headers: &Headers,
    user_agents: Option<&[String]>,
    active: ActiveOverrides,
    strict: bool,
    rng: &mut dyn RngCore,
  ) -> Result<Headers, HeaderError> {
    let effective_http_version = active
      .http_version
      .clone()
      .unwrap_or_else(|| self.default_http_version.clone());
    let effective_browsers = active.browsers.clone().unwrap_or_else(|| self.default_browsers.clone());
    let effective_os = active
      .operating_systems
      .clone()
      .unwrap_or_else(|| self.default_operating_systems.clone());
    let effective_devices = active.devices.clone().unwrap_or_else(|| self.default_devices.clone());
    let effective_locales = active.locales.clone().unwrap_or_else(|| self.default_locales.clone());

    let possible_attribute_values = self.possible_attribute_values(
      &effective_browsers,
      &effective_http_version,
      &effective_os,
      &effective_devices,
    );

    let (http1_values, http2_values) = match user_agents {
      Some(uas) if !uas.is_empty() => {
        let mut c1 = HashMap::new();
        c1.insert("User-Agent".to_string(), uas.to_vec());
        let mut c2 = HashMap::new();
        c2.insert("user-agent".to_string(), uas.to_vec());
        (
          closure::compute_allowed_values(&self.header_network, &c1)?,
          closure::compute_allowed_values(&self.header_network, &c2)?,
        )
      }
      _ => (HashMap::new(), HashMap::new()),
    };

    let constraints = prepare_constraints(&possible_attribute_values, &http1_values, &http2_values);

    let input_sample = self
      .input_network
      .generate_consistent_sample_when_possible(&constraints, rng);

    let Some(input_sample) = input_sample else {
      if effective_http_version == "1" {
        let mut fallback = active.clone();
        fallback.http_version = Some("2".to_string());
        let headers2 = self.get_headers(request_dependent_headers, user_agents, fallback, strict, rng)?;
        return self.order_headers(pascalize_headers(&headers2));
      }

      let relaxation_index = RELAXATION_ORDER.iter().position(|key| active.has(*key));
      let Some(relaxation_index) = relaxation_index else {
        return Err(HeaderError::NoSolution);
      };
      if strict {
        return Err(HeaderError::NoSolution);
      }

      let mut relaxed = active;
      relaxed.clear(RELAXATION_ORDER[relaxation_index]);
      return self.get_headers(request_dependent_headers, user_agents, relaxed, strict, rng);
    };

    let mut generated_sample = self.header_network.generate_sample(&input_sample, rng);
    let browser_http_raw = generated_sample
      .get(BROWSER_HTTP_NODE_NAME)
      .cloned()
      .unwrap_or_default();
    let browser_http = prepare_http_browser_object(&browser_http_raw);

    let accept_language_field = if browser_http.is_http2() {
      "accept-language"
    } else {
      "Accept-Language"
    };
    generated_sample.insert(
      accept_language_field.to_string(),
      accept_language_header(&effective_locales),
    );

    if should_add_sec_fetch(&browser_http) {
      let attrs = if browser_http.is_http2() {
        HTTP2_SEC_FETCH_ATTRIBUTES
      } else {
        HTTP1_SEC_FETCH_ATTRIBUTES
      };
      for (k, v) in attrs {
        generated_sample.insert((*k).to_string(), (*v).to_string());
      }
    }

    generated_sample.retain(|k, v| {
      !(k.eq_ignore_ascii_case("connection") && v == "close")
        && !k.starts_with('*')
        && v != MISSING_VALUE_DATASET_TOKEN
    });

    let mut as_headers: Headers = generated_sample.into_iter().collect();
    for (k, v) in request_dependent_headers {
      as_headers.insert(k.clone(), v.clone());
    }

    self.order_headers(as_headers)
  }

  /// Orders a header set according to the browser-specific header order,
  /// determined from the User-Agent already present in `headers`.
  pub fn order_headers(&self, headers: Headers) -> Result<Headers, HeaderError> {
    let user_agent = get_user_agent(&headers).ok_or(HeaderError::MissingUserAgent)?;
    let browser_name = get_browser(&user_agent).ok_or(HeaderError::UnknownBrowser)?;

    let Some(order) = self.headers_order.get(browser_name) else {
      return Ok(headers);
    };

    let mut ordered = Headers::new();
    for key in order {
      if let Some(value) = headers.get(key) {
        ordered.insert(key.clone(), value.clone());
      }
    }
    Ok(ordered)
  }

  fn possible_attribute_values(
    &self,
    browsers: &[Browser],
    effective_http_version: &str,
    operating_systems: &[String],
    devices: &[String],
  ) -> HashMap<String, Vec<String>> {
    let resolved: Vec<Browser> = browsers.iter().map(|b| b.resolved(effective_http_version)).collect();

    let mut map = HashMap::new();
    map.insert(
      BROWSER_HTTP_NODE_NAME.to_string(),
      self.browser_http_options(&resolved),
    );
    map.insert(OPERATING_SYSTEM_NODE_NAME.to_string(), operating_systems.to_vec());
    map.insert(DEVICE_NODE_NAME.to_string(), devices.to_vec());
    map
  }

  fn browser_http_options(&self, browsers: &[Browser]) -> Vec<String> {
    let mut out = Vec::new();
    for browser in browsers {
      for candidate in &self.unique_browsers {
        let Some(name) = &candidate.name else { continue };
        if &browser.name != name {
          continue;
        }
        if let Some(min) = browser.min_version {
          if candidate.major_version() < min {
            continue;
          }
        }
        if let Some(max) = browser.max_version {
          if candidate.major_version() > max {
            continue;
          }
        }
        if let Some(hv) = &browser.http_version {
          if hv != &candidate.http_version {
            continue;
          }
        }
        out.push(candidate.complete_string.clone());
      }
    }
    out
  }
}

fn filter_browser_http(
  value: &str,
  http1_values: &HashMap<String, Vec<String>>,
  http2_values: &HashMap<String, Vec<String>>,
) -> bool {
  let mut parts = value.splitn(2, '|');
  let browser_part = parts.next().unwrap_or("").to_string();
  let http_version = parts.next().unwrap_or("");

  if http_version == "1" {
    http1_values.is_empty()
      || http1_values
        .get("*BROWSER")
        .map_or(false, |v| v.contains(&browser_part))
  } else {
    http2_values.is_empty()
      || http2_values
        .get("*BROWSER")
        .map_or(false, |v| v.contains(&browser_part))
  }
}

fn filter_other_values(
  value: &str,
  http1_values: &HashMap<String, Vec<String>>,
  http2_values: &HashMap<String, Vec<String>>,
  key: &str,
) -> bool {
  if !http1_values.is_empty() || !http2_values.is_empty() {
    http1_values.get(key).map_or(false, |v| v.iter().any(|x| x == value))
      || http2_values.get(key).map_or(false, |v| v.iter().any(|x| x == value))
  } else {
    true
  }
}

fn prepare_constraints(
  possible_attribute_values: &HashMap<String, Vec<String>>,
  http1_values: &HashMap<String, Vec<String>>,
  http2_values: &HashMap<String, Vec<String>>,
) -> HashMap<String, Vec<String>> {
  possible_attribute_values
    .iter()
    .map(|(key, values)| {
      let filtered: Vec<String> = values
        .iter()
        .filter(|v| {
          if key == BROWSER_HTTP_NODE_NAME {
            filter_browser_http(v, http1_values, http2_values)
          } else {
            filter_other_values(v, http1_values, http2_values, key)
          }
        })
        .cloned()
        .collect();
      (key.clone(), filtered)
    })
    .collect()
}

fn should_add_sec_fetch(browser: &HttpBrowserObject) -> bool {
  let Some(name) = &browser.name else { return false };
  let major = browser.major_version();
  match name.as_str() {
    "chrome" => major >= 76,
    "firefox" => major >= 90,
    "edge" => major >= 79,
    _ => false,
  }
}

fn accept_language_header(locales: &[String]) -> String {
  locales
    .iter()
    .enumerate()
    .map(|(i, locale)| format!("{};q={:.1}", locale, 1.0 - (i as f64) * 0.1))
    .collect::<Vec<_>>()
    .join(", ")
}
