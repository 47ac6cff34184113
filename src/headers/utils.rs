//! User-Agent parsing and header casing helpers.

use super::Headers;

/// Finds the User-Agent value in a header set, checking both the canonical
/// HTTP/1 casing and the lowercase HTTP/2 pseudo-header casing.
pub fn get_user_agent(headers: &Headers) -> Option<String> {
  headers
    .get("User-Agent")
    .or_else(|| headers.get("user-agent"))
    .cloned()
}

/// Determines a browser family from a User-Agent string.
///
/// Checked in the order firefox, edge, chrome, safari: a desktop Edge UA
/// also contains the substring "Chrome", so edge must be checked first or
/// every real Edge user agent would be classified as chrome.
pub fn get_browser(user_agent: &str) -> Option<&'static str> {
  if ["Firefox", "FxiOS"].iter().any(|alias| user_agent.contains(alias)) {
    Some("firefox")
  } else if ["Edge", "EdgA", "Edg", "EdgiOS"]
    .iter()
    .any(|alias| user_agent.contains(alias))
  {
    Some("edge")
  } else if ["Chrome", "CriOS"].iter().any(|alias| user_agent.contains(alias)) {
    Some("chrome")
  } else if user_agent.contains("Safari") {
    Some("safari")
  } else {
    None
  }
}

const PASCALIZE_UPPER: &[&str] = &["dnt", "rtt", "ect"];

/// Title-cases a header name, except `:pseudo-headers` and `sec-ch-ua*`
/// client hints (left alone) and the small set of acronym headers that
/// should stay fully uppercase.
pub fn pascalize(name: &str) -> String {
  if name.starts_with(':') || name.starts_with("sec-ch-ua") {
    return name.to_string();
  }
  if PASCALIZE_UPPER.contains(&name) {
    return name.to_uppercase();
  }
  title_case(name)
}

fn title_case(name: &str) -> String {
  name
    .split('-')
    .map(|part| {
      let mut chars = part.chars();
      match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
      }
    })
    .collect::<Vec<_>>()
    .join("-")
}

pub fn pascalize_headers(headers: &Headers) -> Headers {
  headers.iter().map(|(k, v)| (pascalize(k), v.clone())).collect()
}
