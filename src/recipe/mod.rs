//! Recipes: validated, named transformation units over manifest trees.
//!
//! A [`Recipe`] produces a [`TagVisitor`] that is driven to a fixpoint on
//! the tree; recipes chain through [`CompositeRecipe::do_next`], each
//! running to its fixpoint before the next starts. Follow-up visitors
//! scheduled during a traversal run after it, in insertion order, bounded
//! to catch visitors that reschedule themselves forever.
//!
//! Validation is separated from execution: [`Recipe::validate`] runs at
//! activation, and [`run_recipe`] skips (and logs) recipes whose
//! validation fails rather than aborting the run.

pub mod declarative;
pub mod visitor;

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::constants::{MAX_RECIPE_CYCLES, MAX_SCHEDULED_VISITORS};
use crate::core::{ExecutionContext, RegraftError, Result};
use crate::xml::Tag;

pub use declarative::{DeclarativeRecipe, RecipeRegistry};
pub use visitor::TagVisitor;

const MAX_RECIPE_NESTING: usize = 32;

/// Outcome of validating a recipe's configuration.
#[derive(Debug, Clone, Default)]
pub struct Validated {
    problems: Vec<Problem>,
}

/// One validation failure.
#[derive(Debug, Clone)]
pub struct Problem {
    /// The configuration property at fault.
    pub property: String,
    pub message: String,
}

impl Validated {
    pub fn valid() -> Validated {
        Validated::default()
    }

    pub fn invalid(property: impl Into<String>, message: impl Into<String>) -> Validated {
        Validated {
            problems: vec![Problem {
                property: property.into(),
                message: message.into(),
            }],
        }
    }

    /// Combine with another validation result, keeping all problems.
    pub fn and(mut self, other: Validated) -> Validated {
        self.problems.extend(other.problems);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    fn render(&self) -> String {
        self.problems
            .iter()
            .map(|problem| format!("{}: {}", problem.property, problem.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A named, validated unit of transformation.
pub trait Recipe: Send + Sync {
    /// Fully qualified name, e.g. `regraft.maven.UpgradeParentVersion`.
    fn name(&self) -> &str;

    fn display_name(&self) -> &str {
        self.name()
    }

    fn description(&self) -> &str {
        ""
    }

    fn validate(&self) -> Validated {
        Validated::valid()
    }

    /// The validation that gates this recipe's own execution. Aggregating
    /// recipes report their children's problems through [`Recipe::validate`]
    /// but keep them out of their own gate; each child is gated again when
    /// it runs, so one broken recipe does not stop its siblings.
    fn validate_self(&self) -> Validated {
        self.validate()
    }

    /// The visitor this recipe applies, if it applies one directly.
    fn visitor(&self) -> Option<TagVisitor> {
        None
    }

    /// Sub-recipes run after this recipe's own visitor reaches fixpoint.
    fn recipe_list(&self) -> Vec<Arc<dyn Recipe>> {
        Vec::new()
    }
}

impl fmt::Debug for dyn Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe").field("name", &self.name()).finish()
    }
}

/// Run a recipe over one document. A recipe that fails validation is
/// skipped with a warning; a visitor error aborts this document only and
/// is surfaced to the caller.
pub fn run_recipe(recipe: &dyn Recipe, document: &Tag, ctx: &ExecutionContext) -> Result<Tag> {
    run_recipe_at(recipe, document, ctx, 0)
}

fn run_recipe_at(
    recipe: &dyn Recipe,
    document: &Tag,
    ctx: &ExecutionContext,
    depth: usize,
) -> Result<Tag> {
    if depth > MAX_RECIPE_NESTING {
        return Err(RegraftError::InvalidRecipe {
            name: recipe.name().to_string(),
            reason: "recipe nesting too deep; recipes reference each other cyclically"
                .to_string(),
        });
    }

    let validated = recipe.validate_self();
    if !validated.is_valid() {
        warn!(
            recipe = recipe.name(),
            problems = %validated.render(),
            "skipping recipe that failed validation"
        );
        return Ok(document.clone());
    }

    let mut tree = document.clone();
    if let Some(visitor) = recipe.visitor() {
        tree = drive_to_fixpoint(&visitor, tree, ctx)?;
    }
    for sub in recipe.recipe_list() {
        tree = run_recipe_at(sub.as_ref(), &tree, ctx, depth + 1)?;
    }
    Ok(tree)
}

/// Re-apply a visitor (and drain its follow-ups) until the tree stops
/// changing, bounded by [`MAX_RECIPE_CYCLES`].
fn drive_to_fixpoint(visitor: &TagVisitor, mut tree: Tag, ctx: &ExecutionContext) -> Result<Tag> {
    for _cycle in 0..MAX_RECIPE_CYCLES {
        let mut next = visitor.visit(&tree, ctx)?;
        let mut drained = 0;
        while let Some(follow_up) = ctx.take_after_visit() {
            drained += 1;
            if drained > MAX_SCHEDULED_VISITORS {
                return Err(RegraftError::VisitorLoop {
                    limit: MAX_SCHEDULED_VISITORS,
                });
            }
            next = follow_up.visit(&next, ctx)?;
        }
        if next == tree {
            break;
        }
        tree = next;
    }
    Ok(tree)
}

/// The root recipe activation builds: named recipes chained in order.
pub struct CompositeRecipe {
    name: String,
    recipes: Vec<Arc<dyn Recipe>>,
}

impl CompositeRecipe {
    pub fn new(name: impl Into<String>) -> CompositeRecipe {
        CompositeRecipe {
            name: name.into(),
            recipes: Vec::new(),
        }
    }

    /// Append a recipe to run after the ones already chained.
    pub fn do_next(mut self, recipe: Arc<dyn Recipe>) -> CompositeRecipe {
        self.recipes.push(recipe);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }
}

impl Recipe for CompositeRecipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Validated {
        self.recipes
            .iter()
            .fold(Validated::valid(), |acc, recipe| acc.and(recipe.validate()))
    }

    fn validate_self(&self) -> Validated {
        Validated::valid()
    }

    fn recipe_list(&self) -> Vec<Arc<dyn Recipe>> {
        self.recipes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replaces the value of every tag with the given name. Idempotent by
    /// construction.
    struct SetValue {
        name: String,
        tag: String,
        value: String,
    }

    impl Recipe for SetValue {
        fn name(&self) -> &str {
            &self.name
        }

        fn visitor(&self) -> Option<TagVisitor> {
            let tag = self.tag.clone();
            let value = self.value.clone();
            Some(
                TagVisitor::new(self.name.clone()).on_tag(move |node, _path, _ctx| {
                    if node.name == tag && node.value.as_deref() != Some(value.as_str()) {
                        Ok(Some(Tag::with_value(&tag, &value)))
                    } else {
                        Ok(None)
                    }
                }),
            )
        }
    }

    struct AlwaysInvalid;

    impl Recipe for AlwaysInvalid {
        fn name(&self) -> &str {
            "test.AlwaysInvalid"
        }

        fn validate(&self) -> Validated {
            Validated::invalid("version", "missing")
        }

        fn visitor(&self) -> Option<TagVisitor> {
            Some(
                TagVisitor::new("boom").on_tag(|_t, _p, _c| panic!("must not run")),
            )
        }
    }

    fn doc() -> Tag {
        Tag::parse("<project><a>1</a><b>1</b></project>", "test").unwrap()
    }

    #[test]
    fn chained_recipes_run_in_order() {
        let root = CompositeRecipe::new("root")
            .do_next(Arc::new(SetValue {
                name: "test.SetA".to_string(),
                tag: "a".to_string(),
                value: "2".to_string(),
            }))
            .do_next(Arc::new(SetValue {
                name: "test.SetB".to_string(),
                tag: "b".to_string(),
                value: "3".to_string(),
            }));

        let result = run_recipe(&root, &doc(), &ExecutionContext::new()).unwrap();
        assert_eq!(result.child_value("a"), Some("2"));
        assert_eq!(result.child_value("b"), Some("3"));
    }

    #[test]
    fn invalid_recipe_is_skipped_not_fatal() {
        let root = CompositeRecipe::new("root")
            .do_next(Arc::new(AlwaysInvalid))
            .do_next(Arc::new(SetValue {
                name: "test.SetA".to_string(),
                tag: "a".to_string(),
                value: "2".to_string(),
            }));

        let result = run_recipe(&root, &doc(), &ExecutionContext::new()).unwrap();
        assert_eq!(result.child_value("a"), Some("2"));
    }

    #[test]
    fn composite_validation_aggregates_problems() {
        let root = CompositeRecipe::new("root").do_next(Arc::new(AlwaysInvalid));
        let validated = root.validate();
        assert!(!validated.is_valid());
        assert_eq!(validated.problems()[0].property, "version");
    }

    #[test]
    fn follow_up_visitors_run_after_the_traversal() {
        struct Scheduler;

        impl Recipe for Scheduler {
            fn name(&self) -> &str {
                "test.Scheduler"
            }

            fn visitor(&self) -> Option<TagVisitor> {
                Some(TagVisitor::new("scheduler").on_tag(|node, _path, ctx| {
                    if node.name == "a" && node.value.as_deref() == Some("1") {
                        ctx.after_visit(TagVisitor::new("follow-up").on_tag(
                            |node, _path, _ctx| {
                                if node.name == "a" {
                                    Ok(Some(Tag::with_value("a", "2")))
                                } else {
                                    Ok(None)
                                }
                            },
                        ));
                    }
                    Ok(None)
                }))
            }
        }

        let result = run_recipe(&Scheduler, &doc(), &ExecutionContext::new()).unwrap();
        assert_eq!(result.child_value("a"), Some("2"));
    }

    #[test]
    fn self_rescheduling_visitor_is_detected() {
        struct Forever;

        impl Recipe for Forever {
            fn name(&self) -> &str {
                "test.Forever"
            }

            fn visitor(&self) -> Option<TagVisitor> {
                fn reschedule(ctx: &ExecutionContext) {
                    ctx.after_visit(TagVisitor::new("again").on_tag(|_node, path, ctx| {
                        if path.is_empty() {
                            reschedule(ctx);
                        }
                        Ok(None)
                    }));
                }
                Some(TagVisitor::new("kickoff").on_tag(|_node, path, ctx| {
                    if path.is_empty() {
                        reschedule(ctx);
                    }
                    Ok(None)
                }))
            }
        }

        let err = run_recipe(&Forever, &doc(), &ExecutionContext::new()).unwrap_err();
        assert!(matches!(err, RegraftError::VisitorLoop { .. }));
    }

    #[test]
    fn rerunning_on_own_output_is_a_noop() {
        let recipe = SetValue {
            name: "test.SetA".to_string(),
            tag: "a".to_string(),
            value: "2".to_string(),
        };
        let ctx = ExecutionContext::new();
        let once = run_recipe(&recipe, &doc(), &ctx).unwrap();
        let twice = run_recipe(&recipe, &once, &ctx).unwrap();
        assert_eq!(once, twice);
    }
}
