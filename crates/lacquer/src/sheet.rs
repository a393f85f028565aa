//! Compiled sheets: class maps, compile options, and the attach lifecycle.
//!
//! A [`Sheet`] is the output of compiling a [`RuleSet`]: every rule has been
//! assigned a generated class name (the [`ClassMap`]) and literal
//! declarations have been resolved. Sheets are immutable apart from two
//! pieces of state: whether they are attached to the live output, and the
//! resolved declarations of linked sheets, which [`Sheet::update`]
//! re-derives from fresh [`Props`].
//!
//! A sheet knows nothing about reference counting; that lives in
//! [`crate::manager`]. The [`Attachable`] trait is the seam between the two,
//! and lets the manager be tested against fakes.

use crate::rules::{Props, PropertyValue, RuleBody, RuleSet, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// Maps rule names to generated class names.
///
/// Ordered like the rule set it was generated from. An entry's value may be
/// a space-separated chain (`"ButtonDynamic-label-3 Button-label-0"`) when
/// the rule composes with another class; the first token is always the
/// rule's own generated name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMap {
    entries: Vec<(String, String)>,
}

impl ClassMap {
    /// Create an empty map.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert an entry, replacing any existing one with the same name in
    /// place.
    pub fn insert(&mut self, name: impl Into<String>, class: impl Into<String>) {
        let name = name.into();
        let class = class.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = class;
        } else {
            self.entries.push((name, class));
        }
    }

    /// Look up the class attribute value for a rule name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.as_str())
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for ClassMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (name, class) in iter {
            map.insert(name, class);
        }
        map
    }
}

/// Compile options for a sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetOptions {
    /// Human-readable label. Prefixes generated class names and identifies
    /// the sheet in logs and debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,

    /// Cascade position. Registries render lower indices first.
    #[serde(default)]
    pub index: i32,

    /// Whether the sheet stays linked to its rules so [`Sheet::update`] can
    /// re-resolve them from fresh props.
    #[serde(default)]
    pub link: bool,
}

impl SheetOptions {
    /// Default options: no label, index 0, not linked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label.
    #[must_use]
    pub fn meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    /// Set the cascade index.
    #[must_use]
    pub const fn index(mut self, index: i32) -> Self {
        self.index = index;
        self
    }

    /// Set whether the sheet stays linked for updates.
    #[must_use]
    pub const fn link(mut self, link: bool) -> Self {
        self.link = link;
        self
    }
}

/// Anything whose presence in the live output can be toggled.
///
/// [`Sheet`] is the obvious implementor; the reference-counting manager only
/// ever talks to this trait, so tests substitute instrumented fakes.
pub trait Attachable {
    /// Make the artifact active in the output.
    fn attach(&self);

    /// Remove the artifact from the output.
    fn detach(&self);

    /// Whether the artifact is currently active.
    fn is_attached(&self) -> bool;
}

/// A compiled style sheet.
///
/// Holds the source rules, the generated class names, and the resolved
/// declarations. Construction resolves every literal declaration once;
/// computed declarations stay unresolved until [`Sheet::update`] supplies
/// props.
pub struct Sheet {
    rules: RuleSet,
    classes: ClassMap,
    options: SheetOptions,
    attached: AtomicBool,
    resolved: RwLock<Vec<(String, Vec<(String, Value)>)>>,
}

impl Sheet {
    pub(crate) fn new(rules: RuleSet, classes: ClassMap, options: SheetOptions) -> Self {
        let resolved = RwLock::new(resolve(&rules, None));
        Self {
            rules,
            classes,
            options,
            attached: AtomicBool::new(false),
            resolved,
        }
    }

    /// The source rules this sheet was compiled from.
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Generated class names by rule name.
    pub const fn classes(&self) -> &ClassMap {
        &self.classes
    }

    /// Class attribute value for one rule.
    pub fn class(&self, name: &str) -> Option<&str> {
        self.classes.get(name)
    }

    /// The options this sheet was compiled with.
    pub const fn options(&self) -> &SheetOptions {
        &self.options
    }

    /// The sheet's label, if any.
    pub fn meta(&self) -> Option<&str> {
        self.options.meta.as_deref()
    }

    /// The sheet's cascade index.
    pub const fn index(&self) -> i32 {
        self.options.index
    }

    /// Whether the sheet was compiled linked.
    pub const fn is_linked(&self) -> bool {
        self.options.link
    }

    /// Mark the sheet active. Idempotent.
    pub fn attach(&self) {
        if !self.attached.swap(true, Ordering::SeqCst) {
            debug!(
                sheet.meta = ?self.options.meta,
                sheet.index = self.options.index,
                "Sheet attached"
            );
        }
    }

    /// Mark the sheet inactive. Idempotent.
    pub fn detach(&self) {
        if self.attached.swap(false, Ordering::SeqCst) {
            debug!(sheet.meta = ?self.options.meta, "Sheet detached");
        }
    }

    /// Whether the sheet is currently active.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Re-resolve declarations from fresh props.
    ///
    /// Computed declarations returning `None` are omitted. The link flag is
    /// not consulted: any computed parts the rules carry are re-resolved, so
    /// updating a shared sheet bakes one consumer's props into CSS every
    /// consumer sees. The binding layer only updates per-consumer linked
    /// sheets.
    pub fn update(&self, props: &Props) {
        let fresh = resolve(&self.rules, Some(props));
        *self
            .resolved
            .write()
            .expect("sheet resolution lock poisoned") = fresh;
        trace!(sheet.meta = ?self.options.meta, "Sheet re-resolved from props");
    }

    /// Render the sheet's resolved declarations as CSS.
    ///
    /// Rules with no resolved declarations are skipped. Selectors use the
    /// rule's own generated class (the first token of a composed chain).
    pub fn to_css(&self) -> String {
        let resolved = self
            .resolved
            .read()
            .expect("sheet resolution lock poisoned");
        let mut css = String::new();
        for (name, decls) in resolved.iter() {
            if decls.is_empty() {
                continue;
            }
            let Some(class) = self.classes.get(name) else {
                continue;
            };
            let selector = class.split_whitespace().next().unwrap_or(class);
            if !css.is_empty() {
                css.push('\n');
            }
            css.push('.');
            css.push_str(selector);
            css.push_str(" {\n");
            for (decl, value) in decls {
                css.push_str("  ");
                css.push_str(decl);
                css.push_str(": ");
                css.push_str(&value.to_string());
                css.push_str(";\n");
            }
            css.push('}');
        }
        css
    }
}

impl Attachable for Sheet {
    fn attach(&self) {
        Self::attach(self);
    }

    fn detach(&self) {
        Self::detach(self);
    }

    fn is_attached(&self) -> bool {
        Self::is_attached(self)
    }
}

impl fmt::Debug for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sheet")
            .field("meta", &self.options.meta)
            .field("index", &self.options.index)
            .field("link", &self.options.link)
            .field("rules", &self.rules.len())
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Resolves rules to flat declaration lists.
///
/// Without props only literals survive. With props, extend functions run
/// first so a block's own declarations override what they produced; later
/// same-name declarations always win.
fn resolve(rules: &RuleSet, props: Option<&Props>) -> Vec<(String, Vec<(String, Value)>)> {
    let mut out = Vec::with_capacity(rules.len());
    for (name, body) in rules.iter() {
        let mut decls: Vec<(String, Value)> = Vec::new();
        match body {
            RuleBody::Computed(f) => {
                if let Some(props) = props {
                    for (decl, value) in f(props) {
                        push_decl(&mut decls, decl, value);
                    }
                }
            }
            RuleBody::Block(block) => {
                if let (Some(props), Some(f)) = (props, block.extend_fn()) {
                    for (decl, value) in f(props) {
                        push_decl(&mut decls, decl, value);
                    }
                }
                for (decl, value) in block.decls() {
                    match value {
                        PropertyValue::Literal(v) => {
                            push_decl(&mut decls, decl.clone(), v.clone());
                        }
                        PropertyValue::Computed(f) => {
                            if let Some(v) = props.and_then(|p| f(p)) {
                                push_decl(&mut decls, decl.clone(), v);
                            }
                        }
                    }
                }
            }
        }
        out.push((name.to_string(), decls));
    }
    out
}

fn push_decl(decls: &mut Vec<(String, Value)>, name: String, value: Value) {
    if let Some(entry) = decls.iter_mut().find(|(n, _)| *n == name) {
        entry.1 = value;
    } else {
        decls.push((name, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Block;

    fn plain_sheet(rules: RuleSet, options: SheetOptions) -> Sheet {
        let mut classes = ClassMap::new();
        for (i, name) in rules.names().enumerate() {
            classes.insert(name, format!("{name}-{i}"));
        }
        Sheet::new(rules, classes, options)
    }

    #[test]
    fn test_classmap_replace_keeps_position() {
        let mut map = ClassMap::new();
        map.insert("a", "a-0");
        map.insert("b", "b-1");
        map.insert("a", "a-9");
        let entries: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(entries, vec![("a", "a-9"), ("b", "b-1")]);
    }

    #[test]
    fn test_options_defaults() {
        let options = SheetOptions::new();
        assert_eq!(options.meta, None);
        assert_eq!(options.index, 0);
        assert!(!options.link);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: SheetOptions = serde_json::from_str(r#"{"meta":"Button"}"#).unwrap();
        assert_eq!(options.meta.as_deref(), Some("Button"));
        assert_eq!(options.index, 0);
        assert!(!options.link);
    }

    #[test]
    fn test_attach_detach_idempotent() {
        let sheet = plain_sheet(
            RuleSet::new().rule("a", Block::new().set("color", "red")),
            SheetOptions::new(),
        );
        assert!(!sheet.is_attached());
        sheet.attach();
        sheet.attach();
        assert!(sheet.is_attached());
        sheet.detach();
        sheet.detach();
        assert!(!sheet.is_attached());
    }

    #[test]
    fn test_to_css_literals() {
        let sheet = plain_sheet(
            RuleSet::new().rule(
                "button",
                Block::new().set("color", "red").set("margin", "4px 8px"),
            ),
            SheetOptions::new(),
        );
        assert_eq!(
            sheet.to_css(),
            ".button-0 {\n  color: red;\n  margin: 4px 8px;\n}"
        );
    }

    #[test]
    fn test_computed_declarations_need_update() {
        let rules = RuleSet::new().rule(
            "label",
            Block::new()
                .set("color", "blue")
                .computed("width", |props: &Props| props.get("width").cloned()),
        );
        let sheet = plain_sheet(rules, SheetOptions::new().link(true));

        // Before update only the literal resolves.
        assert_eq!(sheet.to_css(), ".label-0 {\n  color: blue;\n}");

        sheet.update(&Props::new().set("width", "120px"));
        assert_eq!(
            sheet.to_css(),
            ".label-0 {\n  color: blue;\n  width: 120px;\n}"
        );
    }

    #[test]
    fn test_update_ignores_link_flag() {
        let rules = RuleSet::new().rule(
            "label",
            Block::new()
                .set("color", "blue")
                .computed("width", |props: &Props| props.get("width").cloned()),
        );
        let sheet = plain_sheet(rules, SheetOptions::new());

        assert_eq!(sheet.to_css(), ".label-0 {\n  color: blue;\n}");

        // Not linked, yet the computed part still resolves.
        sheet.update(&Props::new().set("width", "120px"));
        assert_eq!(
            sheet.to_css(),
            ".label-0 {\n  color: blue;\n  width: 120px;\n}"
        );
    }

    #[test]
    fn test_computed_none_is_omitted() {
        let rules = RuleSet::new().rule(
            "label",
            Block::new().computed("width", |props: &Props| props.get("width").cloned()),
        );
        let sheet = plain_sheet(rules, SheetOptions::new().link(true));
        sheet.update(&Props::new());
        assert_eq!(sheet.to_css(), "");
    }

    #[test]
    fn test_extend_runs_before_own_declarations() {
        let rules = RuleSet::new().rule(
            "chip",
            Block::new()
                .set("color", "white")
                .with_extend(std::sync::Arc::new(|_props: &Props| {
                    vec![
                        ("color".to_string(), Value::from("black")),
                        ("border".to_string(), Value::from("1px solid")),
                    ]
                })),
        );
        let sheet = plain_sheet(rules, SheetOptions::new().link(true));
        sheet.update(&Props::new());
        // Own literal wins over the extend output for the same property.
        assert_eq!(
            sheet.to_css(),
            ".chip-0 {\n  color: white;\n  border: 1px solid;\n}"
        );
    }

    #[test]
    fn test_computed_rule_body_resolution() {
        let rules = RuleSet::new().rule(
            "row",
            RuleBody::computed(|props| {
                let mut decls = Vec::new();
                if let Some(h) = props.get("height") {
                    decls.push(("height".to_string(), h.clone()));
                }
                decls
            }),
        );
        let sheet = plain_sheet(rules, SheetOptions::new().link(true));
        assert_eq!(sheet.to_css(), "");
        sheet.update(&Props::new().set("height", "32px"));
        assert_eq!(sheet.to_css(), ".row-0 {\n  height: 32px;\n}");
    }

    #[test]
    fn test_selector_uses_own_class_from_composed_chain() {
        let rules = RuleSet::new().rule("label", Block::new().set("color", "red"));
        let mut classes = ClassMap::new();
        classes.insert("label", "dyn-label-3 label-0");
        let sheet = Sheet::new(rules, classes, SheetOptions::new());
        assert_eq!(sheet.to_css(), ".dyn-label-3 {\n  color: red;\n}");
    }
}
