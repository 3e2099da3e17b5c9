//! Recipe rendering: selector pass, template expansion, typed parsing.

use super::context::RenderContext;
use super::expr::Scope;
use super::selector::apply_selectors;
use super::template::Template;
use crate::core::CrawlError;
use crate::recipe::Recipe;

/// Renders raw recipe text for a fixed set of architectures.
#[derive(Debug, Clone, Default)]
pub struct RecipeRenderer {
    context: RenderContext,
}

impl RecipeRenderer {
    pub fn new(context: RenderContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Run the selector and template passes, returning the expanded text.
    ///
    /// # Errors
    ///
    /// [`CrawlError::RenderFailure`] when the template is malformed.
    pub fn expand(&self, name: &str, raw: &str) -> Result<String, CrawlError> {
        let selected = apply_selectors(raw, &self.context.archs);
        let template = Template::parse(&selected).map_err(|e| CrawlError::RenderFailure {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        let mut scope = Scope::new(self.context.variables(), self.context.target());
        Ok(template.render(&mut scope))
    }

    /// Render to a typed [`Recipe`], surfacing failures.
    pub fn try_render(&self, name: &str, raw: &str) -> Result<Recipe, CrawlError> {
        let expanded = self.expand(name, raw)?;
        Recipe::from_yaml(&expanded).map_err(|e| CrawlError::RenderFailure {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Render to a typed [`Recipe`]; any failure yields an empty recipe.
    pub fn render(&self, name: &str, raw: &str) -> Recipe {
        match self.try_render(name, raw) {
            Ok(recipe) => recipe,
            Err(e) => {
                tracing::warn!("{e}; using an empty recipe");
                Recipe::default()
            }
        }
    }
}
