//! Registry of compiled sheets for server-side rendering.
//!
//! A request handler registers every sheet it compiles, renders the page,
//! then asks the registry for the combined CSS. Only sheets attached at
//! render time are emitted, so the registry can track everything it saw and
//! still produce exactly what the page uses.

use crate::sheet::Sheet;
use std::sync::Arc;
use tracing::trace;

/// An ordered collection of sheets, kept sorted by cascade index.
///
/// Insertion is stable: among sheets with equal index, earlier additions
/// stay earlier, so registration order breaks ties the same way the live
/// cascade would.
#[derive(Debug, Default)]
pub struct SheetRegistry {
    sheets: Vec<Arc<Sheet>>,
}

impl SheetRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self { sheets: Vec::new() }
    }

    /// Add a sheet at its cascade position.
    ///
    /// Re-adding a sheet already present (by identity) is a no-op.
    pub fn add(&mut self, sheet: Arc<Sheet>) {
        if self.sheets.iter().any(|s| Arc::ptr_eq(s, &sheet)) {
            return;
        }
        let index = sheet.index();
        let pos = self
            .sheets
            .iter()
            .rposition(|s| s.index() <= index)
            .map_or(0, |p| p + 1);
        trace!(
            registry.index = index,
            registry.position = pos,
            "Sheet registered"
        );
        self.sheets.insert(pos, sheet);
    }

    /// Remove a sheet by identity.
    pub fn remove(&mut self, sheet: &Arc<Sheet>) {
        self.sheets.retain(|s| !Arc::ptr_eq(s, sheet));
    }

    /// Drop every registered sheet.
    pub fn reset(&mut self) {
        self.sheets.clear();
    }

    /// Sheets in cascade order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Sheet>> {
        self.sheets.iter()
    }

    /// Number of registered sheets.
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Render every attached sheet, in cascade order.
    ///
    /// Detached sheets and sheets rendering to nothing are skipped; the
    /// rest are joined with newlines.
    pub fn to_css(&self) -> String {
        let mut out = String::new();
        for sheet in &self.sheets {
            if !sheet.is_attached() {
                continue;
            }
            let css = sheet.to_css();
            if css.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&css);
        }
        out
    }
}
