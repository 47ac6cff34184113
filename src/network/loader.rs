//! Loads a network definition from raw bytes, either a zip archive containing
//! a single JSON file (as the trained networks ship) or plain JSON.
//!
//! The caller supplies the bytes directly (read from disk, embedded with
//! `include_bytes!`, or fetched at runtime) rather than this module knowing
//! about file paths.

use super::node::NodeDefinition;
use serde::Deserialize;
use std::io::{Cursor, Read};

#[derive(Debug, Deserialize)]
pub(crate) struct NetworkDefinition {
  pub nodes: Vec<NodeDefinition>,
}

/// Errors that can occur while loading a network definition.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
  #[error("zip archive error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("no JSON file found in zip archive")]
  NoJsonInZip,
}

const ZIP_LOCAL_FILE_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

pub(crate) fn load_network_definition(bytes: &[u8]) -> Result<NetworkDefinition, LoaderError> {
  if bytes.len() >= 4 && bytes[..4] == ZIP_LOCAL_FILE_MAGIC {
    load_from_zip(bytes)
  } else {
    Ok(serde_json::from_slice(bytes)?)
  }
}

fn load_from_zip(bytes: &[u8]) -> Result<NetworkDefinition, LoaderError> {
  let cursor = Cursor::new(bytes);
  let mut archive = zip::ZipArchive::new(cursor)?;

  let mut json_content = String::new();
  for i in 0..archive.len() {
    let mut file = archive.by_index(i)?;
    if file.name().ends_with(".json") {
      file.read_to_string(&mut json_content)?;
      break;
    }
  }

  if json_content.is_empty() {
    return Err(LoaderError::NoJsonInZip);
  }

  Ok(serde_json::from_str(&json_content)?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  const PLAIN_JSON: &str = r#"{"nodes":[{"name":"a","parentNames":[],"possibleValues":["x","y"],"conditionalProbabilities":{"x":0.5,"y":0.5}}]}"#;

  #[test]
  fn loads_plain_json() {
    let def = load_network_definition(PLAIN_JSON.as_bytes()).unwrap();
    assert_eq!(def.nodes.len(), 1);
    assert_eq!(def.nodes[0].name, "a");
  }

  #[test]
  fn loads_zip_archive() {
    let mut zip_bytes = Vec::new();
    {
      let cursor = Cursor::new(&mut zip_bytes);
      let mut writer = zip::ZipWriter::new(cursor);
      let options = zip::write::FileOptions::<()>::default().compression_method(zip::CompressionMethod::Stored);
      writer.start_file("network.json", options).unwrap();
      writer.write_all(PLAIN_JSON.as_bytes()).unwrap();
      writer.finish().unwrap();
    }

    let def = load_network_definition(&zip_bytes).unwrap();
    assert_eq!(def.nodes.len(), 1);
  }

  #[test]
  fn rejects_zip_with_no_json() {
    let mut zip_bytes = Vec::new();
    {
      let cursor = Cursor::new(&mut zip_bytes);
      let mut writer = zip::ZipWriter::new(cursor);
      let options = zip::write::FileOptions::<()>::default().compression_method(zip::CompressionMethod::Stored);
      writer.start_file("readme.txt", options).unwrap();
      writer.write_all(b"not json").unwrap();
      writer.finish().unwrap();
    }

    let err = load_network_definition(&zip_bytes).unwrap_err();
    assert!(matches!(err, LoaderError::NoJsonInZip));
  }
}
