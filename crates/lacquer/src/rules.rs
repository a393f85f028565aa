//! Rule model: declarations, blocks, and ordered rule sets.
//!
//! A [`RuleSet`] is the source form of a style sheet. Each rule maps a name
//! (e.g. `"button"`) to a [`RuleBody`], which is either a [`Block`] of
//! declarations or a function of the current [`Props`]. Declarations inside a
//! block are themselves either literal [`Value`]s or per-property functions,
//! so a single block can mix fixed and data-driven styling.
//!
//! Rule sets preserve insertion order. Order is visible everywhere downstream:
//! class name generation, cascade position in rendered CSS, and composition
//! all follow it.
//!
//! # Example
//!
//! ```rust
//! use lacquer::rules::{Block, Props, RuleSet};
//!
//! let rules = RuleSet::new()
//!     .rule("root", Block::new().set("display", "flex").set("gap", "8px"))
//!     .rule(
//!         "label",
//!         Block::new()
//!             .set("color", "#18181b")
//!             .computed("font-size", |props: &Props| props.get("size").cloned()),
//!     );
//!
//! assert_eq!(rules.names().collect::<Vec<_>>(), vec!["root", "label"]);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A declaration value.
///
/// Values are deliberately permissive: strings for most CSS-ish payloads,
/// numbers for unitless quantities, and lists for space-joined shorthand
/// values (`margin`, `font-family` fallbacks, and so on).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A literal string, emitted as-is.
    Str(String),
    /// A unitless number.
    Num(f64),
    /// A list of values, emitted space-separated.
    List(Vec<Value>),
}

impl Value {
    /// Returns the string payload if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric payload if this is a [`Value::Num`].
    pub const fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Num(n) => write!(f, "{n}"),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Num(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Num(f64::from(n))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

/// Consumer-supplied data that per-property and per-rule functions read.
///
/// Props behave like a small ordered map. They carry whatever the caller
/// wants rule functions to see: widget state, measurements, feature flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    entries: Vec<(String, Value)>,
}

impl Props {
    /// Create an empty props bag.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set a prop, replacing any existing entry with the same name.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
        self
    }

    /// Look up a prop by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no props have been set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A per-property function: resolves one declaration from props.
///
/// Returning `None` omits the declaration from the resolved output.
pub type PropertyFn = Arc<dyn Fn(&Props) -> Option<Value> + Send + Sync>;

/// A per-rule function: resolves a whole block of declarations from props.
pub type RuleFn = Arc<dyn Fn(&Props) -> Vec<(String, Value)> + Send + Sync>;

/// A declaration value inside a [`Block`]: literal or computed from props.
#[derive(Clone)]
pub enum PropertyValue {
    /// A fixed value, known at sheet compile time.
    Literal(Value),
    /// A function of the current props, resolved on every update.
    Computed(PropertyFn),
}

impl PropertyValue {
    /// True for [`PropertyValue::Computed`].
    pub const fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Self::Computed(_) => f.debug_tuple("Computed").field(&"<fn>").finish(),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Literal(value.into())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Literal(value.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Literal(value.into())
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Literal(value.into())
    }
}

/// A block of declarations plus composition metadata.
///
/// `composes` names another class this block's rule should be expressed
/// alongside; `extend` is a whole-block function merged in before the block's
/// own declarations. Both are how dynamic rules stay linked to the static
/// classes they refine.
#[derive(Clone, Default)]
pub struct Block {
    decls: Vec<(String, PropertyValue)>,
    composes: Option<String>,
    extend: Option<RuleFn>,
}

impl Block {
    /// Create an empty block.
    pub const fn new() -> Self {
        Self {
            decls: Vec::new(),
            composes: None,
            extend: None,
        }
    }

    /// Add a literal declaration, replacing any existing one with the same name.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.decls.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.decls.push((name, value));
        }
        self
    }

    /// Add a computed declaration resolved from props on every update.
    #[must_use]
    pub fn computed(
        self,
        name: impl Into<String>,
        f: impl Fn(&Props) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.set(name, PropertyValue::Computed(Arc::new(f)))
    }

    /// Attach a whole-block function merged in ahead of this block's own
    /// declarations on every update.
    #[must_use]
    pub fn with_extend(mut self, f: RuleFn) -> Self {
        self.extend = Some(f);
        self
    }

    /// Record the class name this block composes with.
    #[must_use]
    pub fn with_composes(mut self, class: impl Into<String>) -> Self {
        self.composes = Some(class.into());
        self
    }

    /// Declarations in insertion order.
    pub fn decls(&self) -> &[(String, PropertyValue)] {
        &self.decls
    }

    /// The composed class name, if any.
    pub fn composes(&self) -> Option<&str> {
        self.composes.as_deref()
    }

    /// The whole-block extend function, if any.
    pub const fn extend_fn(&self) -> Option<&RuleFn> {
        self.extend.as_ref()
    }

    /// True when any declaration is computed or an extend function is set.
    pub fn has_computed(&self) -> bool {
        self.extend.is_some() || self.decls.iter().any(|(_, v)| v.is_computed())
    }

    /// True when the block carries no declarations and no extend function.
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty() && self.extend.is_none()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("decls", &self.decls)
            .field("composes", &self.composes)
            .field("extend", &self.extend.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// The body of a rule: a declaration block or a function of props.
#[derive(Clone)]
pub enum RuleBody {
    /// A block of declarations (possibly mixing literal and computed).
    Block(Block),
    /// The whole rule is a function of props.
    Computed(RuleFn),
}

impl RuleBody {
    /// Build a computed rule body from a closure.
    pub fn computed(f: impl Fn(&Props) -> Vec<(String, Value)> + Send + Sync + 'static) -> Self {
        Self::Computed(Arc::new(f))
    }

    /// Returns the block if this body is one.
    pub const fn as_block(&self) -> Option<&Block> {
        match self {
            Self::Block(b) => Some(b),
            Self::Computed(_) => None,
        }
    }
}

impl fmt::Debug for RuleBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(b) => f.debug_tuple("Block").field(b).finish(),
            Self::Computed(_) => f.debug_tuple("Computed").field(&"<fn>").finish(),
        }
    }
}

impl From<Block> for RuleBody {
    fn from(block: Block) -> Self {
        Self::Block(block)
    }
}

/// An ordered collection of named rules.
///
/// Setting a rule that already exists replaces the body in place, keeping the
/// rule's original position.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(String, RuleBody)>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add or replace a rule, builder style.
    #[must_use]
    pub fn rule(mut self, name: impl Into<String>, body: impl Into<RuleBody>) -> Self {
        self.set(name, body);
        self
    }

    /// Add or replace a rule in place.
    pub fn set(&mut self, name: impl Into<String>, body: impl Into<RuleBody>) {
        let name = name.into();
        let body = body.into();
        if let Some(entry) = self.rules.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = body;
        } else {
            self.rules.push((name, body));
        }
    }

    /// Look up a rule body by name.
    pub fn get(&self, name: &str) -> Option<&RuleBody> {
        self.rules
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b)
    }

    /// Iterate over rules in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleBody)> {
        self.rules.iter().map(|(n, b)| (n.as_str(), b))
    }

    /// Iterate over rule names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(n, _)| n.as_str())
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when the set contains no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from("4px 8px").to_string(), "4px 8px");
        assert_eq!(Value::from(12).to_string(), "12");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        let list = Value::List(vec![Value::from("0"), Value::from("auto")]);
        assert_eq!(list.to_string(), "0 auto");
    }

    #[test]
    fn test_props_set_and_get() {
        let props = Props::new().set("size", "14px").set("grow", 2);
        assert_eq!(props.get("size").and_then(Value::as_str), Some("14px"));
        assert_eq!(props.get("grow").and_then(Value::as_num), Some(2.0));
        assert_eq!(props.get("missing"), None);
    }

    #[test]
    fn test_props_replace_keeps_position() {
        let props = Props::new().set("a", "1").set("b", "2").set("a", "3");
        let names: Vec<&str> = props.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(props.get("a").and_then(Value::as_str), Some("3"));
    }

    #[test]
    fn test_block_mixed_declarations() {
        let block = Block::new()
            .set("color", "red")
            .computed("width", |props: &Props| props.get("width").cloned());
        assert_eq!(block.decls().len(), 2);
        assert!(block.has_computed());
        assert!(!block.decls()[0].1.is_computed());
        assert!(block.decls()[1].1.is_computed());
    }

    #[test]
    fn test_block_without_computed() {
        let block = Block::new().set("color", "red");
        assert!(!block.has_computed());
        assert!(!block.is_empty());
        assert!(Block::new().is_empty());
    }

    #[test]
    fn test_block_composes_metadata() {
        let block = Block::new().with_composes("button-0");
        assert_eq!(block.composes(), Some("button-0"));
        assert!(block.is_empty());
    }

    #[test]
    fn test_ruleset_preserves_insertion_order() {
        let rules = RuleSet::new()
            .rule("z", Block::new().set("color", "red"))
            .rule("a", Block::new().set("color", "blue"))
            .rule("m", Block::new().set("color", "green"));
        let names: Vec<&str> = rules.names().collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_ruleset_replace_in_place() {
        let mut rules = RuleSet::new()
            .rule("a", Block::new().set("color", "red"))
            .rule("b", Block::new().set("color", "blue"));
        rules.set("a", Block::new().set("color", "green"));

        let names: Vec<&str> = rules.names().collect();
        assert_eq!(names, vec!["a", "b"]);

        let body = rules.get("a").and_then(RuleBody::as_block).unwrap();
        match &body.decls()[0].1 {
            PropertyValue::Literal(v) => assert_eq!(v.as_str(), Some("green")),
            PropertyValue::Computed(_) => panic!("expected literal"),
        }
    }

    #[test]
    fn test_computed_rule_body() {
        let body = RuleBody::computed(|props| {
            vec![("height".to_string(), props.get("h").cloned().unwrap())]
        });
        assert!(body.as_block().is_none());
        match &body {
            RuleBody::Computed(f) => {
                let out = f(&Props::new().set("h", "10px"));
                assert_eq!(out.len(), 1);
                assert_eq!(out[0].0, "height");
            }
            RuleBody::Block(_) => panic!("expected computed body"),
        }
    }
}
