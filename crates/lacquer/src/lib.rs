#![forbid(unsafe_code)]
// Allow these clippy lints for API ergonomics
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::use_self)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::items_after_test_module)]

//! # Lacquer
//!
//! Style sheet lifecycle for component-shaped applications: declare rules
//! once, attach them many times, and let reference counting decide what is
//! actually live.
//!
//! The pieces, bottom to top:
//!
//! - **Rules** ([`RuleSet`], [`Block`], [`Value`]): ordered, named rules
//!   whose declarations are literal values or functions of per-consumer
//!   [`Props`].
//! - **Compilation** ([`Engine`], [`Sheet`]): rules become sheets with
//!   deterministic generated class names ([`ClassMap`]).
//! - **Splitting and composition** ([`split_dynamic`], [`compose`]): the
//!   data-driven half of a rule set is extracted into its own rule set,
//!   composed so every dynamic class stays chained to its static
//!   counterpart.
//! - **Caching** ([`SheetManager`], [`SharedManager`]): one sheet per key,
//!   reference counted. The first acquire attaches, the matching last
//!   release detaches, and mismatches surface as [`CacheError`]s instead of
//!   being papered over.
//! - **Binding** ([`StyleBinding`], [`BoundStyles`], [`Theme`]): ties it all
//!   together per consumer, with one static sheet per theme identity and a
//!   per-consumer dynamic sheet that follows props.
//! - **Registry** ([`SheetRegistry`]): collects sheets for server-side
//!   rendering, emitting only what is attached, in cascade order.
//!
//! ## Quick Start
//!
//! ```rust
//! use lacquer::{Block, Props, RuleSet, StyleBinding};
//!
//! let binding = StyleBinding::new(
//!     RuleSet::new()
//!         .rule("root", Block::new().set("display", "flex").set("gap", "8px"))
//!         .rule(
//!             "label",
//!             Block::new()
//!                 .set("color", "#18181b")
//!                 .computed("font-size", |props: &Props| props.get("size").cloned()),
//!         ),
//! )
//! .meta("Card");
//!
//! let styles = binding.attach(None, &Props::new().set("size", "14px"))?;
//!
//! // With a data-driven rule anywhere in the set, every rule's class is
//! // served through the consumer's dynamic sheet, chained onto the shared
//! // static class.
//! assert!(styles.class("root").unwrap().starts_with("CardDynamic-root-"));
//! assert!(styles.class("root").unwrap().contains(" Card-root-"));
//! assert!(styles.class("label").unwrap().starts_with("CardDynamic-label-"));
//! assert!(styles.class("label").unwrap().contains(" Card-label-"));
//!
//! // Dropping `styles` releases the shared sheet and detaches the
//! // consumer's dynamic sheet.
//! # Ok::<(), lacquer::CacheError>(())
//! ```
//!
//! ## Theming
//!
//! Rule sets may be functions of a [`Theme`]. Sheets are cached per theme
//! *identity*: clones of a theme share sheets, while a second theme built
//! from equal values gets its own.
//!
//! ```rust
//! use lacquer::{Block, Props, RuleSet, StyleBinding, Theme, ThemedRules, Value};
//!
//! let rules = ThemedRules::themed(|theme: &Theme| {
//!     RuleSet::new().rule(
//!         "banner",
//!         Block::new().set(
//!             "background",
//!             theme
//!                 .get("primary")
//!                 .cloned()
//!                 .unwrap_or_else(|| Value::from("#333")),
//!         ),
//!     )
//! });
//! let binding = StyleBinding::new(rules).meta("Banner");
//!
//! let dark = Theme::new("dark").set("primary", "#7c3aed");
//! let attached = binding.attach(Some(&dark), &Props::new())?;
//! assert!(attached.sheet().to_css().contains("#7c3aed"));
//! # Ok::<(), lacquer::CacheError>(())
//! ```
//!
//! ## Server-side rendering
//!
//! ```rust
//! use lacquer::{Block, Engine, RuleSet, SheetOptions, SheetRegistry, StyleEngine};
//!
//! // One engine per request keeps generated class names reproducible.
//! let engine = Engine::new();
//! let mut registry = SheetRegistry::new();
//!
//! let sheet = engine.compile(
//!     RuleSet::new().rule("page", Block::new().set("margin", "0 auto")),
//!     SheetOptions::new().meta("Layout"),
//! );
//! sheet.attach();
//! registry.add(sheet);
//!
//! assert_eq!(registry.to_css(), ".Layout-page-0 {\n  margin: 0 auto;\n}");
//! ```
//!
//! ## Cache discipline
//!
//! The manager is usable on its own, with any key type and any
//! [`Attachable`] artifact:
//!
//! ```rust
//! use lacquer::{Block, CacheError, Engine, RuleSet, SheetManager, SheetOptions, StyleEngine};
//!
//! let engine = Engine::new();
//! let sheet = engine.compile(
//!     RuleSet::new().rule("button", Block::new().set("color", "blue")),
//!     SheetOptions::new().meta("Button"),
//! );
//!
//! let mut manager = SheetManager::new();
//! manager.put("button-styles", sheet)?;
//!
//! let sheet = manager.acquire(&"button-styles")?; // first consumer attaches
//! assert!(sheet.is_attached());
//! manager.release(&"button-styles")?; // last consumer detaches
//! assert!(!sheet.is_attached());
//! # Ok::<(), CacheError>(())
//! ```

pub mod binding;
pub mod compose;
pub mod dynamic;
pub mod engine;
pub mod manager;
pub mod registry;
pub mod rules;
pub mod sheet;
pub mod theme;

pub use binding::{
    BindingId, BindingKey, BoundStyles, StyleBinding, ThemedRules, default_manager,
};
pub use compose::compose;
pub use dynamic::split_dynamic;
pub use engine::{ClassNameGenerator, Engine, StyleEngine, default_engine};
pub use manager::{CacheError, SharedManager, SheetLease, SheetManager};
pub use registry::SheetRegistry;
pub use rules::{Block, Props, PropertyFn, PropertyValue, RuleBody, RuleFn, RuleSet, Value};
pub use sheet::{Attachable, ClassMap, Sheet, SheetOptions};
pub use theme::{Theme, ThemeId, ThemeLoadError, ThemeSaveError};
