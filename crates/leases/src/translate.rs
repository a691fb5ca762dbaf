//! Compound identifier translation.
//!
//! Routers announce their clients and primary realms as compound hashed
//! identifiers: one or more opaque hash tokens joined with `:`. The
//! registry never stores a hash it cannot map back to a stable internal
//! identifier, so every component must resolve through the router's
//! translation table or the whole compound identifier is dropped.

use relaymesh_storage::TranslationTable;

/// Translates one compound identifier through the table.
///
/// Returns the re-joined internal form, or `None` if any component is
/// missing from the table (all-or-drop).
#[must_use]
pub fn translate_compound(id: &str, table: &TranslationTable) -> Option<String> {
    let translated: Option<Vec<&str>> = id.split(':').map(|component| table.get(component)).collect();
    translated.map(|components| components.join(":"))
}

/// Translates a list of compound identifiers, dropping the untranslatable
/// ones.
#[must_use]
pub fn translate_list(list: &[String], table: &TranslationTable) -> Vec<String> {
    let translated: Vec<String> =
        list.iter().filter_map(|id| translate_compound(id, table)).collect();
    if translated.len() < list.len() {
        tracing::debug!(
            submitted = list.len(),
            kept = translated.len(),
            "dropped untranslatable compound identifiers"
        );
    }
    translated
}
