use anyhow::{Context, Result};

use wrapkit_lib::util::hash::{DigestEncoding, InputEncoding, create_hash};

/// Feed every piece of `text` into one accumulator and print the digest.
pub fn cmd_hash(algorithm: &str, input: &str, digest: &str, text: &[String]) -> Result<()> {
  let input: InputEncoding = input.parse().context("Invalid --input encoding")?;
  let digest: DigestEncoding = digest.parse().context("Invalid --digest encoding")?;
  let mut hash = create_hash(algorithm).context("Cannot create hash")?;
  for part in text {
    hash
      .update_encoded(part, input)
      .with_context(|| format!("Cannot decode input: {}", part))?;
  }
  println!("{}", hash.digest(digest));
  Ok(())
}
