#![forbid(unsafe_code)]

//! Renderer registry: how to draw each modal name.
//!
//! Registration is independent of the stack. A name can be registered
//! before, during, or after it is open, and stays registered after it closes.

use std::rc::Rc;

use ahash::AHashMap;

use crate::control::ModalControl;

/// Render callback for one modal name.
pub type RenderFn<R> = Rc<dyn Fn(&ModalControl<R>) -> R>;

/// Name → render callback table.
pub struct RendererRegistry<R> {
    renderers: AHashMap<String, RenderFn<R>>,
}

impl<R> Default for RendererRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for RendererRegistry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("RendererRegistry")
            .field("names", &names)
            .finish()
    }
}

impl<R> RendererRegistry<R> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            renderers: AHashMap::new(),
        }
    }

    /// Store `render` under `name`.
    ///
    /// With `replace == false` an existing callback is kept. Returns whether
    /// `render` was stored.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        render: RenderFn<R>,
        replace: bool,
    ) -> bool {
        let name = name.into();
        if !replace && self.renderers.contains_key(&name) {
            return false;
        }
        self.renderers.insert(name, render);
        true
    }

    /// Remove the callback for `name`. Returns whether one was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.renderers.remove(name).is_some()
    }

    /// Whether a callback is registered for `name`.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.renderers.contains_key(name)
    }

    /// The callback for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<RenderFn<R>> {
        self.renderers.get(name).cloned()
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_const(value: &'static str) -> RenderFn<&'static str> {
        Rc::new(move |_: &ModalControl<&'static str>| value)
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = RendererRegistry::new();
        assert!(!registry.is_registered("x"));
        assert!(registry.register("x", render_const("one"), true));
        assert!(registry.is_registered("x"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("y").is_none());
    }

    #[test]
    fn first_registration_wins_without_replace() {
        let mut registry = RendererRegistry::new();
        let first = render_const("fn1");
        assert!(registry.register("x", Rc::clone(&first), false));
        assert!(!registry.register("x", render_const("fn2"), false));
        let active = registry.get("x").unwrap();
        assert!(Rc::ptr_eq(&active, &first));
    }

    #[test]
    fn replace_overwrites() {
        let mut registry = RendererRegistry::new();
        registry.register("x", render_const("fn1"), false);
        let second = render_const("fn2");
        assert!(registry.register("x", Rc::clone(&second), true));
        assert!(Rc::ptr_eq(&registry.get("x").unwrap(), &second));
    }

    #[test]
    fn unregister_removes() {
        let mut registry = RendererRegistry::new();
        registry.register("x", render_const("fn1"), true);
        assert!(registry.unregister("x"));
        assert!(!registry.unregister("x"));
        assert!(registry.is_empty());
    }
}
