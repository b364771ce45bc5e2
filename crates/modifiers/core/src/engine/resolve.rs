//! The scope-ordered fold shared by the manager and read-only views.
use crate::modification::{ModificationSummary, summarize};
use crate::store::{ModifierStore, PropertyId};
use crate::types::{ClassList, EntityId};

/// Summary of the directives `scope` holds for `property` that apply to `classes`.
pub(crate) fn scope_summary(
    store: &ModifierStore,
    property: PropertyId,
    scope: EntityId,
    classes: &ClassList,
) -> ModificationSummary {
    summarize(store.directives(property, scope), classes)
}

/// Folds `raw` through each scope in turn: player scope first, then the
/// entity itself.
pub(crate) fn fold_scopes(
    store: &ModifierStore,
    property: PropertyId,
    scopes: impl IntoIterator<Item = EntityId>,
    classes: &ClassList,
    raw: f64,
) -> f64 {
    scopes.into_iter().fold(raw, |value, scope| {
        scope_summary(store, property, scope, classes).apply(value)
    })
}
