//! Binding of rule sets to themes, props, and sheet lifetime.
//!
//! A [`StyleBinding`] is the piece consumers hold onto: rules declared once,
//! attached many times. Each [`StyleBinding::attach`] serves one consumer
//! and yields [`BoundStyles`], which bundles the class names to render with
//! and owns the consumer's share of the underlying sheets. Static sheets are
//! compiled once per theme and shared through the reference-counted manager;
//! dynamic sheets (when any rule depends on props) are compiled fresh per
//! consumer and follow that consumer's props through
//! [`BoundStyles::update`]. Dropping the `BoundStyles` undoes both.
//!
//! Bindings default to a process-wide manager and engine, which is the
//! convenient mode for application code. Anything that needs isolation, a
//! server handling concurrent requests, a test asserting exact class names,
//! passes its own via [`StyleBinding::with_engine`] and
//! [`StyleBinding::with_manager`].

use crate::compose::compose;
use crate::dynamic::split_dynamic;
use crate::engine::{Engine, StyleEngine, default_engine};
use crate::manager::{CacheError, SharedManager, SheetLease};
use crate::rules::{Props, RuleSet};
use crate::sheet::{ClassMap, Sheet, SheetOptions};
use crate::theme::{Theme, ThemeId};
use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace};

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one binding instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

impl BindingId {
    /// Allocate a fresh id.
    pub fn fresh() -> Self {
        Self(NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding-{}", self.0)
    }
}

/// Cache key for binding-owned sheets: the binding plus the theme identity
/// its rules were resolved against ([`ThemeId::NONE`] when the rules ignore
/// themes).
pub type BindingKey = (BindingId, ThemeId);

static DEFAULT_MANAGER: LazyLock<SharedManager<BindingKey>> = LazyLock::new(SharedManager::new);

/// Returns the process-wide manager used by bindings not given one
/// explicitly.
pub fn default_manager() -> &'static SharedManager<BindingKey> {
    &DEFAULT_MANAGER
}

// Bindings declared earlier get smaller cascade indices, so registry output
// follows declaration order unless a caller overrides the index.
static NEXT_BINDING_INDEX: AtomicI32 = AtomicI32::new(-100_000);

fn next_binding_index() -> i32 {
    NEXT_BINDING_INDEX.fetch_add(1, Ordering::Relaxed)
}

/// Rule sets that may depend on a theme.
pub enum ThemedRules {
    /// Theme-independent rules.
    Fixed(RuleSet),
    /// Rules derived from the active theme.
    Themed(Arc<dyn Fn(&Theme) -> RuleSet + Send + Sync>),
}

impl ThemedRules {
    /// Build themed rules from a closure.
    pub fn themed(f: impl Fn(&Theme) -> RuleSet + Send + Sync + 'static) -> Self {
        Self::Themed(Arc::new(f))
    }

    /// True when the rules read the theme.
    pub const fn is_themed(&self) -> bool {
        matches!(self, Self::Themed(_))
    }

    fn resolve(&self, theme: Option<&Theme>) -> RuleSet {
        match self {
            Self::Fixed(rules) => rules.clone(),
            Self::Themed(f) => match theme {
                Some(theme) => f(theme),
                // No theme in scope: resolve against an empty one.
                None => f(&Theme::default()),
            },
        }
    }
}

impl fmt::Debug for ThemedRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(rules) => f.debug_tuple("Fixed").field(rules).finish(),
            Self::Themed(_) => f.debug_tuple("Themed").field(&"<fn>").finish(),
        }
    }
}

impl From<RuleSet> for ThemedRules {
    fn from(rules: RuleSet) -> Self {
        Self::Fixed(rules)
    }
}

/// Binds a rule set to the sheet lifecycle.
///
/// One static sheet per theme, compiled lazily and shared across consumers;
/// one dynamic sheet per consumer when rules depend on props.
pub struct StyleBinding<E: StyleEngine = Engine> {
    id: BindingId,
    rules: ThemedRules,
    options: SheetOptions,
    engine: Arc<E>,
    manager: SharedManager<BindingKey>,
}

impl StyleBinding<Engine> {
    /// Bind `rules` using the default engine and manager.
    pub fn new(rules: impl Into<ThemedRules>) -> Self {
        Self::with_engine(rules, default_engine())
    }
}

impl<E: StyleEngine> StyleBinding<E> {
    /// Bind `rules` with an explicit engine.
    pub fn with_engine(rules: impl Into<ThemedRules>, engine: Arc<E>) -> Self {
        let id = BindingId::fresh();
        debug!(binding.id = %id, "Style binding created");
        Self {
            id,
            rules: rules.into(),
            options: SheetOptions::new().index(next_binding_index()),
            engine,
            manager: default_manager().clone(),
        }
    }

    /// Use an explicit manager instead of the process-wide default.
    #[must_use]
    pub fn with_manager(mut self, manager: SharedManager<BindingKey>) -> Self {
        self.manager = manager;
        self
    }

    /// Label sheets compiled by this binding. The label prefixes generated
    /// class names.
    #[must_use]
    pub fn meta(mut self, meta: impl Into<String>) -> Self {
        self.options.meta = Some(meta.into());
        self
    }

    /// Override the cascade index assigned at construction.
    #[must_use]
    pub const fn index(mut self, index: i32) -> Self {
        self.options.index = index;
        self
    }

    /// This binding's identity.
    pub const fn id(&self) -> BindingId {
        self.id
    }

    /// The options sheets are compiled with.
    pub const fn options(&self) -> &SheetOptions {
        &self.options
    }

    /// Attach styles for one consumer.
    ///
    /// Compiles the static sheet for the resolved theme if this is the first
    /// consumer to need it, then takes a reference to it. When rules depend
    /// on props, also compiles this consumer's dynamic sheet, resolves it
    /// against `props`, and attaches it.
    ///
    /// Theme-independent rules share one sheet regardless of the theme in
    /// scope; theme-dependent rules get one sheet per theme identity, so two
    /// themes with equal values still style independently while clones of
    /// one theme share.
    ///
    /// # Errors
    /// Returns [`CacheError`] if the manager rejects the underlying cache
    /// operations, e.g. after a concurrent reset discarded the entry.
    pub fn attach(&self, theme: Option<&Theme>, props: &Props) -> Result<BoundStyles, CacheError> {
        let theme_key = match (&self.rules, theme) {
            (ThemedRules::Themed(_), Some(theme)) => theme.key(),
            _ => ThemeId::NONE,
        };
        let key = (self.id, theme_key);

        if self.manager.get(&key).is_none() {
            let rules = self.rules.resolve(theme);
            let sheet = self.engine.compile(rules, self.options.clone());
            match self.manager.put(key, sheet) {
                Ok(()) => {}
                // Another consumer compiled the same sheet in between; reuse
                // theirs.
                Err(CacheError::DuplicateKey { .. }) => {
                    trace!(binding.id = %self.id, "Lost compile race, reusing cached sheet");
                }
                Err(err) => return Err(err),
            }
        }

        let lease = self.manager.lease(&key)?;
        let sheet = Arc::clone(lease.artifact());

        let dynamic = compose(sheet.classes(), split_dynamic(sheet.rules())).map(|rules| {
            let options = SheetOptions {
                meta: self.options.meta.as_ref().map(|m| format!("{m}Dynamic")),
                index: self.options.index,
                link: true,
            };
            let dynamic_sheet = self.engine.compile(rules, options);
            dynamic_sheet.update(props);
            dynamic_sheet.attach();
            dynamic_sheet
        });

        let mut classes = sheet.classes().clone();
        if let Some(dynamic_sheet) = &dynamic {
            for (name, class) in dynamic_sheet.classes().iter() {
                classes.insert(name, class);
            }
        }

        debug!(
            binding.id = %self.id,
            theme.key = %theme_key,
            dynamic = dynamic.is_some(),
            "Styles attached"
        );
        Ok(BoundStyles {
            classes,
            dynamic,
            lease,
        })
    }
}

impl<E: StyleEngine> fmt::Debug for StyleBinding<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleBinding")
            .field("id", &self.id)
            .field("meta", &self.options.meta)
            .field("index", &self.options.index)
            .field("themed", &self.rules.is_themed())
            .finish()
    }
}

/// Attached styles for one consumer.
///
/// Dropping releases the shared static sheet (detaching it when this was the
/// last consumer) and detaches this consumer's dynamic sheet.
pub struct BoundStyles {
    classes: ClassMap,
    dynamic: Option<Arc<Sheet>>,
    lease: SheetLease<BindingKey>,
}

impl BoundStyles {
    /// Class names by rule name. Entries for data-driven rules point at the
    /// dynamic class (chained with the static one); the rest point at the
    /// static class.
    pub const fn classes(&self) -> &ClassMap {
        &self.classes
    }

    /// Class attribute value for one rule.
    pub fn class(&self, name: &str) -> Option<&str> {
        self.classes.get(name)
    }

    /// The shared static sheet.
    pub const fn sheet(&self) -> &Arc<Sheet> {
        self.lease.artifact()
    }

    /// This consumer's dynamic sheet, when any rule depends on props.
    pub const fn dynamic_sheet(&self) -> Option<&Arc<Sheet>> {
        self.dynamic.as_ref()
    }

    /// Re-resolve data-driven rules from fresh props.
    pub fn update(&self, props: &Props) {
        if let Some(sheet) = &self.dynamic {
            sheet.update(props);
        }
    }
}

impl fmt::Debug for BoundStyles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundStyles")
            .field("key", self.lease.key())
            .field("classes", &self.classes.len())
            .field("dynamic", &self.dynamic.is_some())
            .finish()
    }
}

impl Drop for BoundStyles {
    fn drop(&mut self) {
        if let Some(sheet) = &self.dynamic {
            sheet.detach();
        }
        // The lease's own drop releases the static sheet.
    }
}
