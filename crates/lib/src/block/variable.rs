use std::sync::Arc;

use super::dependency::{Dependency, DependencyTemplates, ReplaceSource};
use crate::util::hash::HashAccumulator;
use crate::{CompilerError, Result};

/// A named expression bound to the dependencies needed to resolve it.
#[derive(Debug)]
pub struct BlockVariable {
  pub name: String,
  pub expression: String,
  pub dependencies: Vec<Arc<dyn Dependency>>,
}

impl BlockVariable {
  pub fn new(name: impl Into<String>, expression: impl Into<String>, dependencies: Vec<Arc<dyn Dependency>>) -> Self {
    Self {
      name: name.into(),
      expression: expression.into(),
      dependencies,
    }
  }

  pub fn update_hash(&self, hash: &mut dyn HashAccumulator) {
    hash.update(&self.name);
    hash.update(&self.expression);
    for dep in &self.dependencies {
      dep.update_hash(hash);
    }
  }

  /// Build the output source of the expression by running the template of
  /// every dependency over it.
  pub fn expression_source(&self, templates: &DependencyTemplates) -> Result<ReplaceSource> {
    let mut source = ReplaceSource::new(self.expression.clone());
    for dep in &self.dependencies {
      let template = templates
        .get(dep.kind())
        .ok_or_else(|| CompilerError::TemplateResolution(dep.kind().to_string()))?;
      template.apply(dep.as_ref(), &mut source, templates)?;
    }
    Ok(source)
  }

  pub fn disconnect(&mut self) {
    for dep in &self.dependencies {
      dep.disconnect();
    }
  }

  pub fn has_dependencies(&self) -> bool {
    !self.dependencies.is_empty()
  }

  pub fn has_dependencies_where(&self, filter: &dyn Fn(&dyn Dependency) -> bool) -> bool {
    self.dependencies.iter().any(|d| filter(d.as_ref()))
  }
}
