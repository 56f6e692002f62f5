//! Per-call-site inline caches.
//!
//! Each send site memoizes the methods it resolved for the receiver
//! classes it has seen. The state machine only ever moves forward:
//! Uninitialized, then monomorphic, then polymorphic with a bounded entry
//! list, then megamorphic, which permanently falls back to dictionary
//! lookup. Super sends do not use this machinery; their target is pinned
//! once from the lexically fixed superclass.

use crate::{Class, Invokable, SomRef};
use arrayvec::ArrayVec;
use std::rc::Rc;

/// Bound on polymorphic cache entries before a site goes megamorphic.
pub const MAX_CACHE_ENTRIES: usize = 6;

/// State of one call-site cache.
#[derive(Debug, Clone)]
pub enum CallCache {
    /// Never executed
    Uninitialized,
    /// Exactly one receiver class observed
    Monomorphic {
        /// The cached receiver class
        class: SomRef<Class>,
        /// The method resolved for it
        target: Rc<Invokable>,
    },
    /// Several receiver classes observed, up to [`MAX_CACHE_ENTRIES`]
    Polymorphic {
        /// Class/method pairs in observation order
        entries: ArrayVec<(SomRef<Class>, Rc<Invokable>), MAX_CACHE_ENTRIES>,
    },
    /// Too many classes; dictionary lookup from here on
    Megamorphic,
}

impl CallCache {
    /// The cached target for `class`, if this site has one.
    ///
    /// Class comparison is identity; megamorphic and uninitialized sites
    /// always miss.
    pub fn lookup(&self, class: &SomRef<Class>) -> Option<Rc<Invokable>> {
        match self {
            CallCache::Uninitialized | CallCache::Megamorphic => None,
            CallCache::Monomorphic { class: cached, target } => {
                if Rc::ptr_eq(cached, class) {
                    Some(target.clone())
                } else {
                    None
                }
            }
            CallCache::Polymorphic { entries } => entries
                .iter()
                .find(|(c, _)| Rc::ptr_eq(c, class))
                .map(|(_, target)| target.clone()),
        }
    }

    /// Record a resolution, advancing the state machine.
    ///
    /// Degradation is one-way: once megamorphic, the site stays that way.
    pub fn record(&mut self, class: SomRef<Class>, target: Rc<Invokable>) {
        match self {
            CallCache::Uninitialized => {
                *self = CallCache::Monomorphic { class, target };
            }
            CallCache::Monomorphic {
                class: cached,
                target: cached_target,
            } => {
                if Rc::ptr_eq(cached, &class) {
                    *cached_target = target;
                } else {
                    let mut entries = ArrayVec::new();
                    entries.push((cached.clone(), cached_target.clone()));
                    entries.push((class, target));
                    *self = CallCache::Polymorphic { entries };
                }
            }
            CallCache::Polymorphic { entries } => {
                if let Some(entry) = entries.iter_mut().find(|(c, _)| Rc::ptr_eq(c, &class)) {
                    entry.1 = target;
                } else if entries.len() < MAX_CACHE_ENTRIES {
                    entries.push((class, target));
                } else {
                    log::trace!("call site degraded to megamorphic");
                    *self = CallCache::Megamorphic;
                }
            }
            CallCache::Megamorphic => {}
        }
    }

    /// Whether this site has permanently given up on caching.
    pub fn is_megamorphic(&self) -> bool {
        matches!(self, CallCache::Megamorphic)
    }
}

impl Default for CallCache {
    fn default() -> Self {
        CallCache::Uninitialized
    }
}
