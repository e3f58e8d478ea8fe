//! Hash accumulators for block, module and output hashing.
//!
//! This module provides:
//! - `HashAccumulator`: the streaming hash interface the dependency graph
//!   writes into
//! - `create_hash()`: builds an accumulator by algorithm name
//! - `BulkHash`: wraps a digest primitive and batches short text updates
//! - `DebugHash`: a readable, deterministic digest for snapshot tests
//!
//! Buffering is invisible in the output: a `BulkHash` yields exactly the
//! bytes an unbuffered digest over the same updates would.

use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use xxhash_rust::xxh3::Xxh3;

use crate::consts::BULK_SIZE;
use crate::{CompilerError, Result};

/// Encoding of textual input passed to [`HashAccumulator::update_encoded`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputEncoding {
  #[default]
  Utf8,
  Latin1,
  Hex,
  Base64,
}

/// Representation of a finalized digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestEncoding {
  #[default]
  Hex,
  Base64,
  Latin1,
}

impl FromStr for InputEncoding {
  type Err = CompilerError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "utf8" | "utf-8" => Ok(InputEncoding::Utf8),
      "latin1" | "binary" => Ok(InputEncoding::Latin1),
      "hex" => Ok(InputEncoding::Hex),
      "base64" => Ok(InputEncoding::Base64),
      other => Err(CompilerError::InvalidEncoding(other.to_string())),
    }
  }
}

impl FromStr for DigestEncoding {
  type Err = CompilerError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "hex" => Ok(DigestEncoding::Hex),
      "base64" => Ok(DigestEncoding::Base64),
      "latin1" | "binary" => Ok(DigestEncoding::Latin1),
      other => Err(CompilerError::InvalidEncoding(other.to_string())),
    }
  }
}

/// A streaming hash.
///
/// `digest` consumes the accumulator, so a hash can only be finalized once.
pub trait HashAccumulator: Send {
  /// Append UTF-8 text.
  fn update(&mut self, data: &str);

  /// Append raw bytes.
  fn update_bytes(&mut self, data: &[u8]);

  /// Append text given in an explicit encoding.
  fn update_encoded(&mut self, data: &str, encoding: InputEncoding) -> Result<()>;

  /// Finalize and render the digest.
  fn digest(self: Box<Self>, encoding: DigestEncoding) -> String;
}

/// Create a hash accumulator by algorithm name.
///
/// Supported names: `sha256`, `sha512`, `xxh3` (non-cryptographic, 128 bit)
/// and `debug`.
pub fn create_hash(algorithm: &str) -> Result<Box<dyn HashAccumulator>> {
  match algorithm.to_ascii_lowercase().as_str() {
    "sha256" => Ok(Box::new(BulkHash::new(Primitive::Sha256(Sha256::new())))),
    "sha512" => Ok(Box::new(BulkHash::new(Primitive::Sha512(Sha512::new())))),
    "xxh3" | "xxhash128" => Ok(Box::new(BulkHash::new(Primitive::Xxh3(Box::new(Xxh3::new()))))),
    "debug" => Ok(Box::new(DebugHash::default())),
    other => Err(CompilerError::UnknownHashAlgorithm(other.to_string())),
  }
}

/// Digest primitives a [`BulkHash`] can drive.
enum Primitive {
  Sha256(Sha256),
  Sha512(Sha512),
  Xxh3(Box<Xxh3>),
}

impl Primitive {
  fn update(&mut self, data: &[u8]) {
    match self {
      Primitive::Sha256(h) => h.update(data),
      Primitive::Sha512(h) => h.update(data),
      Primitive::Xxh3(h) => h.update(data),
    }
  }

  fn finalize(self) -> Vec<u8> {
    match self {
      Primitive::Sha256(h) => h.finalize().to_vec(),
      Primitive::Sha512(h) => h.finalize().to_vec(),
      Primitive::Xxh3(h) => h.digest128().to_be_bytes().to_vec(),
    }
  }
}

/// Batches short text updates before forwarding them to the primitive.
///
/// Text shorter than [`BULK_SIZE`] bytes is appended to an internal buffer;
/// the buffer is flushed once it grows past the threshold, and before any
/// binary update, encoded update or finalization.
pub struct BulkHash {
  inner: Primitive,
  buffer: String,
}

impl BulkHash {
  fn new(inner: Primitive) -> Self {
    Self {
      inner,
      buffer: String::new(),
    }
  }

  fn flush(&mut self) {
    if !self.buffer.is_empty() {
      self.inner.update(self.buffer.as_bytes());
      self.buffer.clear();
    }
  }
}

impl HashAccumulator for BulkHash {
  fn update(&mut self, data: &str) {
    if data.len() > BULK_SIZE {
      self.flush();
      self.inner.update(data.as_bytes());
      return;
    }
    self.buffer.push_str(data);
    if self.buffer.len() > BULK_SIZE {
      self.flush();
    }
  }

  fn update_bytes(&mut self, data: &[u8]) {
    self.flush();
    self.inner.update(data);
  }

  fn update_encoded(&mut self, data: &str, encoding: InputEncoding) -> Result<()> {
    let bytes = decode_input(data, encoding)?;
    self.flush();
    self.inner.update(&bytes);
    Ok(())
  }

  fn digest(mut self: Box<Self>, encoding: DigestEncoding) -> String {
    self.flush();
    let this = *self;
    encode_digest(&this.inner.finalize(), encoding)
  }
}

/// Readable digest for golden-file tests.
///
/// Collects every update as text; the digest keeps ASCII letters and digits
/// and replaces each maximal run of anything else with the hex encoding of
/// its UTF-8 bytes. Never use it for cache keys.
#[derive(Debug, Default)]
pub struct DebugHash {
  text: String,
}

impl HashAccumulator for DebugHash {
  fn update(&mut self, data: &str) {
    self.text.push_str(data);
  }

  fn update_bytes(&mut self, data: &[u8]) {
    self.text.push_str(&String::from_utf8_lossy(data));
  }

  fn update_encoded(&mut self, data: &str, _encoding: InputEncoding) -> Result<()> {
    self.text.push_str(data);
    Ok(())
  }

  fn digest(self: Box<Self>, _encoding: DigestEncoding) -> String {
    debug_digest(&self.text)
  }
}

fn debug_digest(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut run = String::new();
  for c in text.chars() {
    if c.is_ascii_alphanumeric() {
      if !run.is_empty() {
        out.push_str(&hex::encode(run.as_bytes()));
        run.clear();
      }
      out.push(c);
    } else {
      run.push(c);
    }
  }
  if !run.is_empty() {
    out.push_str(&hex::encode(run.as_bytes()));
  }
  out
}

fn decode_input(data: &str, encoding: InputEncoding) -> Result<Vec<u8>> {
  match encoding {
    InputEncoding::Utf8 => Ok(data.as_bytes().to_vec()),
    // Latin-1 keeps the low byte of every code point.
    InputEncoding::Latin1 => Ok(data.chars().map(|c| (c as u32 & 0xff) as u8).collect()),
    InputEncoding::Hex => hex::decode(data).map_err(|e| CompilerError::InvalidEncoding(format!("hex input: {}", e))),
    InputEncoding::Base64 => STANDARD
      .decode(data)
      .map_err(|e| CompilerError::InvalidEncoding(format!("base64 input: {}", e))),
  }
}

fn encode_digest(bytes: &[u8], encoding: DigestEncoding) -> String {
  match encoding {
    DigestEncoding::Hex => hex::encode(bytes),
    DigestEncoding::Base64 => STANDARD.encode(bytes),
    DigestEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
  }
}
