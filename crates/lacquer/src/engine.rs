//! Class name generation and rule set compilation.
//!
//! The [`StyleEngine`] trait is the seam between rule sets and compiled
//! [`Sheet`]s. The default [`Engine`] assigns deterministic counter-based
//! class names, which makes server-side output reproducible: compile the
//! same rule sets in the same order against a fresh engine and the emitted
//! classes match.

use crate::rules::{Block, RuleSet};
use crate::sheet::{ClassMap, Sheet, SheetOptions};
use std::sync::{Arc, LazyLock, Mutex};
use tracing::debug;

/// Deterministic class name generator.
///
/// Names follow `{meta}-{rule}-{n}` (or `{rule}-{n}` without a label) with a
/// single counter shared by every sheet compiled through the same generator,
/// so no two rules ever collide.
#[derive(Debug, Clone, Default)]
pub struct ClassNameGenerator {
    counter: u64,
}

impl ClassNameGenerator {
    /// Create a generator counting from zero.
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Generate the next class name for `rule`.
    pub fn generate(&mut self, rule: &str, meta: Option<&str>) -> String {
        let n = self.counter;
        self.counter += 1;
        match meta {
            Some(meta) => format!("{meta}-{rule}-{n}"),
            None => format!("{rule}-{n}"),
        }
    }

    /// Restart numbering from zero.
    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

/// Compiles rule sets into sheets.
pub trait StyleEngine {
    /// Compile `rules` into a sheet, assigning every rule a class name.
    fn compile(&self, rules: RuleSet, options: SheetOptions) -> Arc<Sheet>;
}

/// The default engine: a counter-backed name generator behind a mutex.
#[derive(Debug, Default)]
pub struct Engine {
    names: Mutex<ClassNameGenerator>,
}

impl Engine {
    /// Create an engine with a fresh name counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart class name numbering, e.g. between server-rendered requests.
    pub fn reset_names(&self) {
        self.names
            .lock()
            .expect("class name generator lock poisoned")
            .reset();
    }
}

impl StyleEngine for Engine {
    /// Compile `rules`, generating one class name per rule in order.
    ///
    /// A rule already annotated with `composes` gets a chained class map
    /// entry: its own fresh name first, the composed class after.
    fn compile(&self, rules: RuleSet, options: SheetOptions) -> Arc<Sheet> {
        let mut classes = ClassMap::new();
        {
            let mut names = self
                .names
                .lock()
                .expect("class name generator lock poisoned");
            for (name, body) in rules.iter() {
                let fresh = names.generate(name, options.meta.as_deref());
                let entry = match body.as_block().and_then(Block::composes) {
                    Some(composed) => format!("{fresh} {composed}"),
                    None => fresh,
                };
                classes.insert(name, entry);
            }
        }
        debug!(
            sheet.meta = ?options.meta,
            sheet.rules = rules.len(),
            "Compiled sheet"
        );
        Arc::new(Sheet::new(rules, classes, options))
    }
}

static DEFAULT_ENGINE: LazyLock<Arc<Engine>> = LazyLock::new(|| Arc::new(Engine::new()));

/// Returns the process-wide engine used when no engine is supplied.
///
/// Sharing one counter keeps generated names unique across independent
/// callers. Code that needs reproducible names (server rendering, tests)
/// should construct its own [`Engine`] instead.
pub fn default_engine() -> Arc<Engine> {
    Arc::clone(&DEFAULT_ENGINE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Props, RuleBody};

    #[test]
    fn test_generator_sequence_with_meta() {
        let mut names = ClassNameGenerator::new();
        assert_eq!(names.generate("root", Some("Button")), "Button-root-0");
        assert_eq!(names.generate("label", Some("Button")), "Button-label-1");
        assert_eq!(names.generate("root", None), "root-2");
    }

    #[test]
    fn test_generator_reset() {
        let mut names = ClassNameGenerator::new();
        names.generate("a", None);
        names.generate("b", None);
        names.reset();
        assert_eq!(names.generate("a", None), "a-0");
    }

    #[test]
    fn test_compile_assigns_names_in_rule_order() {
        let engine = Engine::new();
        let rules = RuleSet::new()
            .rule("root", Block::new().set("color", "red"))
            .rule("label", Block::new().set("color", "blue"));
        let sheet = engine.compile(rules, SheetOptions::new().meta("Card"));

        assert_eq!(sheet.class("root"), Some("Card-root-0"));
        assert_eq!(sheet.class("label"), Some("Card-label-1"));
    }

    #[test]
    fn test_compile_counter_spans_sheets() {
        let engine = Engine::new();
        let first = engine.compile(
            RuleSet::new().rule("a", Block::new().set("color", "red")),
            SheetOptions::new(),
        );
        let second = engine.compile(
            RuleSet::new().rule("a", Block::new().set("color", "blue")),
            SheetOptions::new(),
        );
        assert_eq!(first.class("a"), Some("a-0"));
        assert_eq!(second.class("a"), Some("a-1"));
    }

    #[test]
    fn test_separate_engines_are_independent() {
        let rules = || RuleSet::new().rule("a", Block::new().set("color", "red"));
        let first = Engine::new().compile(rules(), SheetOptions::new());
        let second = Engine::new().compile(rules(), SheetOptions::new());
        assert_eq!(first.class("a"), second.class("a"));
    }

    #[test]
    fn test_compile_merges_composes_into_entry() {
        let engine = Engine::new();
        let rules = RuleSet::new().rule(
            "label",
            Block::new()
                .computed("width", |p: &Props| p.get("w").cloned())
                .with_composes("Button-label-0"),
        );
        let sheet = engine.compile(rules, SheetOptions::new().meta("ButtonDynamic").link(true));
        assert_eq!(
            sheet.class("label"),
            Some("ButtonDynamic-label-0 Button-label-0")
        );
    }

    #[test]
    fn test_compile_computed_rule_gets_plain_entry() {
        let engine = Engine::new();
        let rules = RuleSet::new().rule("row", RuleBody::computed(|_| vec![]));
        let sheet = engine.compile(rules, SheetOptions::new());
        assert_eq!(sheet.class("row"), Some("row-0"));
    }
}
