//! Code generation for Laravel artifacts
//!
//! Each artifact kind has a generator implementing [`ArtifactGenerator`];
//! all of them render through one shared [`TemplateGenerator`] so user
//! template overrides apply everywhere.

use crate::metadata::ModelMetadata;
use crate::naming;
use crate::options::{ArtifactKind, GenerationOptions};
use crate::{Result, SchemaError};
use handlebars::Handlebars;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub mod artifacts;
pub mod model;

pub use artifacts::{ControllerGenerator, ObserverGenerator, PolicyGenerator, ResourceGenerator};
pub use model::{ModelBuilder, ModelGenerator};

/// Built-in templates, registered under these names
pub const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("model", include_str!("templates/model.php.hbs")),
    ("controller", include_str!("templates/controller.php.hbs")),
    ("resource", include_str!("templates/resource.php.hbs")),
    ("observer", include_str!("templates/observer.php.hbs")),
    ("policy", include_str!("templates/policy.php.hbs")),
];

/// A rendered file, path relative to the project root
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub name: String,
    pub relative_path: PathBuf,
    pub content: String,
}

/// Base trait for artifact generators
pub trait ArtifactGenerator: Send + Sync {
    fn kind(&self) -> ArtifactKind;

    /// Whether the options ask for this artifact
    fn supports(&self, options: &GenerationOptions) -> bool {
        options.is_enabled(self.kind())
    }

    fn generate(&self, meta: &ModelMetadata, options: &GenerationOptions) -> Result<Artifact>;
}

/// Template-based code generator
pub struct TemplateGenerator {
    handlebars: Handlebars<'static>,
}

impl TemplateGenerator {
    /// Create a new template generator without templates
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();

        // Generated code is PHP, never HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        // Register helper functions
        handlebars.register_helper("snake_case", Box::new(snake_case_helper));
        handlebars.register_helper("camel_case", Box::new(camel_case_helper));
        handlebars.register_helper("pascal_case", Box::new(pascal_case_helper));
        handlebars.register_helper("pluralize", Box::new(pluralize_helper));
        handlebars.register_helper("singularize", Box::new(singularize_helper));

        Self { handlebars }
    }

    /// Template generator with every built-in template registered
    pub fn with_builtin_templates() -> Result<Self> {
        let mut generator = Self::new();
        for (name, template) in BUILTIN_TEMPLATES {
            generator.register_template(name, template)?;
        }
        Ok(generator)
    }

    /// Register a template, replacing any template of the same name
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| SchemaError::CodeGen(format!("Template registration failed: {}", e)))?;
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.has_template(name)
    }

    /// Render a template with context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(template_name, context)
            .map_err(|e| SchemaError::CodeGen(format!("Template rendering failed: {}", e)))
    }
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Artifacts rendered for one model
#[derive(Debug)]
pub struct ModelArtifacts {
    pub table: String,
    pub model: String,
    pub artifacts: Vec<(ArtifactKind, Result<Artifact>)>,
}

/// Runs every enabled generator over a set of models
pub struct GenerationOrchestrator {
    generators: Vec<Box<dyn ArtifactGenerator>>,
}

impl GenerationOrchestrator {
    pub fn new() -> Self {
        Self {
            generators: Vec::new(),
        }
    }

    /// Orchestrator with the model, controller, resource, observer and policy generators
    pub fn with_defaults(templates: Arc<TemplateGenerator>) -> Self {
        let mut orchestrator = Self::new();
        orchestrator.add_generator(Box::new(ModelGenerator::new(templates.clone())));
        orchestrator.add_generator(Box::new(ControllerGenerator::new(templates.clone())));
        orchestrator.add_generator(Box::new(ResourceGenerator::new(templates.clone())));
        orchestrator.add_generator(Box::new(ObserverGenerator::new(templates.clone())));
        orchestrator.add_generator(Box::new(PolicyGenerator::new(templates)));
        orchestrator
    }

    pub fn add_generator(&mut self, generator: Box<dyn ArtifactGenerator>) {
        self.generators.push(generator);
    }

    /// Generators the options enable, in registration order
    pub fn enabled_generators<'a>(
        &'a self,
        options: &'a GenerationOptions,
    ) -> impl Iterator<Item = &'a dyn ArtifactGenerator> + 'a {
        self.generators
            .iter()
            .map(|g| g.as_ref())
            .filter(move |g| g.supports(options))
    }

    /// Render one model; a failing generator does not stop the others
    pub fn generate_model(&self, meta: &ModelMetadata, options: &GenerationOptions) -> ModelArtifacts {
        let artifacts = self
            .enabled_generators(options)
            .map(|generator| {
                let result = generator.generate(meta, options);
                if let Err(e) = &result {
                    log::warn!("{} generation failed for {}: {}", generator.kind(), meta.model, e);
                }
                (generator.kind(), result)
            })
            .collect();

        ModelArtifacts {
            table: meta.table.clone(),
            model: meta.model.clone(),
            artifacts,
        }
    }

    pub fn generate(&self, models: &[ModelMetadata], options: &GenerationOptions) -> Vec<ModelArtifacts> {
        models
            .iter()
            .map(|meta| self.generate_model(meta, options))
            .collect()
    }
}

impl Default for GenerationOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Relative path for a class in `App\...` below `app/`
pub(crate) fn app_class_path(subdir: &str, class: &str) -> PathBuf {
    PathBuf::from("app").join(subdir).join(format!("{}.php", class))
}

/// Relative path of a model file for the configured namespace and target path
pub fn model_path(meta: &ModelMetadata, options: &GenerationOptions) -> PathBuf {
    let mut path = PathBuf::from(options.target_path.trim_matches('/'));
    let namespace_dir = naming::namespace_to_path(&meta.namespace, &options.target_path);
    for segment in namespace_dir.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.push(format!("{}.php", meta.model));
    path
}

// Handlebars helper functions

fn transform_param(
    h: &handlebars::Helper,
    helper_name: &str,
    transform: fn(&str) -> String,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let param = h.param(0).ok_or_else(|| {
        handlebars::RenderError::new(format!("{} helper requires a parameter", helper_name))
    })?;

    let input = param.value().as_str().ok_or_else(|| {
        handlebars::RenderError::new(format!("{} helper requires a string parameter", helper_name))
    })?;

    out.write(&transform(input))?;
    Ok(())
}

fn snake_case_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    transform_param(h, "snake_case", naming::snake, out)
}

fn camel_case_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    transform_param(h, "camel_case", naming::camel, out)
}

fn pascal_case_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    transform_param(h, "pascal_case", naming::studly, out)
}

fn pluralize_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    transform_param(h, "pluralize", naming::plural, out)
}

fn singularize_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    transform_param(h, "singularize", naming::singular, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_helpers_and_no_escape() {
        let mut generator = TemplateGenerator::new();
        generator
            .register_template(
                "t",
                "{{pascal_case name}} {{camel_case name}} {{pluralize word}} {{singularize plural}} {{snake_case class}} {{raw}}",
            )
            .unwrap();

        let out = generator
            .render(
                "t",
                &json!({
                    "name": "order_item",
                    "word": "category",
                    "plural": "boxes",
                    "class": "OrderItem",
                    "raw": "$this->a['b'] <=> \"c\" & App\\Models",
                }),
            )
            .unwrap();

        assert_eq!(
            out,
            "OrderItem orderItem categories box order_item $this->a['b'] <=> \"c\" & App\\Models"
        );
    }

    #[test]
    fn test_builtin_templates_register() {
        let generator = TemplateGenerator::with_builtin_templates().unwrap();
        for (name, _) in BUILTIN_TEMPLATES {
            assert!(generator.has_template(name));
        }
    }

    #[test]
    fn test_template_errors_are_codegen_errors() {
        let mut generator = TemplateGenerator::new();
        assert!(matches!(
            generator.register_template("broken", "{{#each items}}"),
            Err(SchemaError::CodeGen(_))
        ));
        assert!(matches!(
            generator.render("missing", &json!({})),
            Err(SchemaError::CodeGen(_))
        ));
    }
}
