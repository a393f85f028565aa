//! Extraction of the data-driven half of a rule set.
//!
//! Compilation wants static declarations once and computed declarations per
//! consumer. [`split_dynamic`] pulls the computed parts out of a rule set so
//! the caller can compile them into a separate, linked sheet that follows
//! each consumer's props.

use crate::rules::{Block, RuleBody, RuleSet};

/// Splits out the rules of `rules` that depend on props.
///
/// Function-valued rules are carried whole. Blocks contribute their computed
/// declarations and extend function; literal declarations stay behind. Rule
/// order is preserved. Returns `None` when nothing depends on props.
pub fn split_dynamic(rules: &RuleSet) -> Option<RuleSet> {
    let mut out: Option<RuleSet> = None;
    for (name, body) in rules.iter() {
        match body {
            RuleBody::Computed(f) => {
                out.get_or_insert_with(RuleSet::new)
                    .set(name, RuleBody::Computed(f.clone()));
            }
            RuleBody::Block(block) => {
                if !block.has_computed() {
                    continue;
                }
                let mut dynamic = Block::new();
                for (decl, value) in block.decls() {
                    if value.is_computed() {
                        dynamic = dynamic.set(decl.clone(), value.clone());
                    }
                }
                if let Some(f) = block.extend_fn() {
                    dynamic = dynamic.with_extend(f.clone());
                }
                out.get_or_insert_with(RuleSet::new).set(name, dynamic);
            }
        }
    }
    out
}
