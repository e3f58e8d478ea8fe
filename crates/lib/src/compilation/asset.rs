use std::path::PathBuf;

/// Content of an output asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
  Text(String),
  Bytes(Vec<u8>),
}

impl AssetSource {
  pub fn to_bytes(&self) -> Vec<u8> {
    match self {
      AssetSource::Text(text) => text.as_bytes().to_vec(),
      AssetSource::Bytes(bytes) => bytes.clone(),
    }
  }

  pub fn size(&self) -> usize {
    match self {
      AssetSource::Text(text) => text.len(),
      AssetSource::Bytes(bytes) => bytes.len(),
    }
  }
}

impl From<String> for AssetSource {
  fn from(text: String) -> Self {
    AssetSource::Text(text)
  }
}

impl From<&str> for AssetSource {
  fn from(text: &str) -> Self {
    AssetSource::Text(text.to_string())
  }
}

impl From<Vec<u8>> for AssetSource {
  fn from(bytes: Vec<u8>) -> Self {
    AssetSource::Bytes(bytes)
  }
}

/// An output file produced by a compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
  pub source: AssetSource,
  /// Whether the last emit wrote this asset.
  pub emitted: bool,
  /// Where this exact source was last written. Replacing the asset resets it.
  pub exists_at: Option<PathBuf>,
}

impl Asset {
  pub fn new(source: impl Into<AssetSource>) -> Self {
    Self {
      source: source.into(),
      emitted: false,
      exists_at: None,
    }
  }
}
