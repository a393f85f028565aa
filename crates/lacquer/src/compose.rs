//! Composition of dynamic rules with the static classes they refine.
//!
//! When a rule set is split into a static sheet and a per-consumer dynamic
//! sheet, the dynamic rules must stay visually linked to the static classes
//! generated for the same rule names. [`compose`] produces the rule set for
//! the dynamic sheet: every dynamic rule is annotated with the static class
//! it composes with, and every static-only rule gains a pure composition
//! entry so the consumer sees one complete class map.

use crate::rules::{Block, RuleBody, RuleSet};
use crate::sheet::ClassMap;

/// Weave `dynamic` rules together with generated static `classes`.
///
/// The output contains, in order:
///
/// - each dynamic rule, annotated via `composes` with the static class of
///   the same name. Function-valued rules are wrapped into a block whose
///   extend function is the original rule function. A dynamic rule with no
///   static counterpart passes through unchanged, and processing continues
///   with the remaining rules.
/// - a pure composition entry (`composes` only, no declarations) for every
///   static class with no dynamic counterpart.
///
/// Returns `None` when `dynamic` is `None` or empty: with nothing
/// data-driven there is no dynamic sheet to build.
pub fn compose(classes: &ClassMap, dynamic: Option<RuleSet>) -> Option<RuleSet> {
    let dynamic = dynamic?;
    if dynamic.is_empty() {
        return None;
    }

    let mut out = RuleSet::new();
    for (name, body) in dynamic.iter() {
        match classes.get(name) {
            Some(class) => {
                let block = match body {
                    RuleBody::Block(b) => b.clone(),
                    RuleBody::Computed(f) => Block::new().with_extend(f.clone()),
                };
                out.set(name, block.with_composes(class));
            }
            None => out.set(name, body.clone()),
        }
    }
    for (name, class) in classes.iter() {
        if out.get(name).is_none() {
            out.set(name, Block::new().with_composes(class));
        }
    }
    Some(out)
}
