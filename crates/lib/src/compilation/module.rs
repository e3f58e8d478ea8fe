use crate::block::DependenciesBlock;

/// A module of the module graph: its identifier and its dependency tree.
#[derive(Debug)]
pub struct Module {
  pub identifier: String,
  pub block: DependenciesBlock,
  /// Set while sealing, cleared on unseal.
  pub hash: Option<String>,
}

impl Module {
  pub fn new(identifier: impl Into<String>) -> Self {
    Self {
      identifier: identifier.into(),
      block: DependenciesBlock::new(),
      hash: None,
    }
  }

  pub fn with_block(identifier: impl Into<String>, block: DependenciesBlock) -> Self {
    Self {
      identifier: identifier.into(),
      block,
      hash: None,
    }
  }
}
