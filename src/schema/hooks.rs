//! Per-object-kind hooks run while the schema is built.

use crate::catalog::{RawEvent, RawRoutine, RawTable, RawView};
use std::fmt;

/// What a hook decided about one object
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome<T> {
    /// Keep the object unchanged
    Keep,
    /// Drop the object from the schema
    Skip,
    /// Keep a replacement of the object
    KeepModified(T),
}

/// Boxed hook over a raw catalog object
pub type Hook<T> = Box<dyn Fn(&T) -> HookOutcome<T>>;

/// Optional hooks, one per object kind.
///
/// Hooks see objects that passed the include/exclude filter, before they are
/// normalized and linked. A skipped table never becomes a foreign key target.
#[derive(Default)]
pub struct Hooks {
    table: Option<Hook<RawTable>>,
    view: Option<Hook<RawView>>,
    routine: Option<Hook<RawRoutine>>,
    event: Option<Hook<RawEvent>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_table(mut self, hook: impl Fn(&RawTable) -> HookOutcome<RawTable> + 'static) -> Self {
        self.table = Some(Box::new(hook));
        self
    }

    pub fn on_view(mut self, hook: impl Fn(&RawView) -> HookOutcome<RawView> + 'static) -> Self {
        self.view = Some(Box::new(hook));
        self
    }

    pub fn on_routine(
        mut self,
        hook: impl Fn(&RawRoutine) -> HookOutcome<RawRoutine> + 'static,
    ) -> Self {
        self.routine = Some(Box::new(hook));
        self
    }

    pub fn on_event(mut self, hook: impl Fn(&RawEvent) -> HookOutcome<RawEvent> + 'static) -> Self {
        self.event = Some(Box::new(hook));
        self
    }

    pub(crate) fn table(&self, raw: RawTable) -> Option<RawTable> {
        apply(self.table.as_ref(), raw)
    }

    pub(crate) fn view(&self, raw: RawView) -> Option<RawView> {
        apply(self.view.as_ref(), raw)
    }

    pub(crate) fn routine(&self, raw: RawRoutine) -> Option<RawRoutine> {
        apply(self.routine.as_ref(), raw)
    }

    pub(crate) fn event(&self, raw: RawEvent) -> Option<RawEvent> {
        apply(self.event.as_ref(), raw)
    }
}

fn apply<T>(hook: Option<&Hook<T>>, raw: T) -> Option<T> {
    let Some(hook) = hook else {
        return Some(raw);
    };
    match hook(&raw) {
        HookOutcome::Keep => Some(raw),
        HookOutcome::Skip => None,
        HookOutcome::KeepModified(modified) => Some(modified),
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("table", &self.table.is_some())
            .field("view", &self.view.is_some())
            .field("routine", &self.routine.is_some())
            .field("event", &self.event.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_hook_keeps() {
        let hooks = Hooks::new();
        assert!(hooks.table(RawTable::new("t_article")).is_some());
    }

    #[test]
    fn test_outcomes() {
        let hooks = Hooks::new().on_table(|t| match t.name.as_str() {
            "t_skip" => HookOutcome::Skip,
            "t_rename" => {
                let mut renamed = t.clone();
                renamed.comment = Some("Renamed".to_string());
                HookOutcome::KeepModified(renamed)
            }
            _ => HookOutcome::Keep,
        });

        assert!(hooks.table(RawTable::new("t_skip")).is_none());
        assert_eq!(
            hooks.table(RawTable::new("t_rename")).unwrap().comment.as_deref(),
            Some("Renamed")
        );
        assert!(hooks.table(RawTable::new("t_keep")).is_some());
    }

    #[test]
    fn test_debug_lists_registered_hooks() {
        let hooks = Hooks::new().on_event(|_| HookOutcome::Keep);
        let debug = format!("{:?}", hooks);
        assert!(debug.contains("event: true"));
        assert!(debug.contains("table: false"));
    }
}
