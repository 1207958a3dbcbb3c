//! Deduplicated, immutable interned strings.
//!
//! A [`Sym`] is a cheap, clonable handle whose equality and hashing are
//! defined by storage identity, not content — two symbols interned from
//! equal bytes through the *same* [`Interner`] compare equal; two symbols
//! that happen to hold equal bytes but came from different origins (e.g.
//! [`Sym::empty`] versus `interner.intern("")`) do not.
//!
//! Rather than a process-global store, interning lives in an explicit
//! [`Interner`] value threaded through a compilation: a fresh compilation
//! unit gets a fresh interner. Thread safety is not required; `Interner`
//! is `Rc`-based.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::OnceLock;

/// An interned, deduplicated string handle.
///
/// Cloning is a refcount bump, not a copy of the underlying bytes.
#[derive(Clone)]
pub struct Sym(Rc<str>);

impl Sym {
    /// The distinguished "no handle" sentinel. Distinct from the handle
    /// produced by interning an empty string through any [`Interner`]
    ///.
    pub fn empty() -> Sym {
        static SENTINEL: OnceLock<Rc<str>> = OnceLock::new();
        // OnceLock<Rc<str>> is not Sync, so we can't store it in a static
        // directly; thread_local sidesteps that while keeping the "one
        // sentinel per thread, stable for the life of the thread" property
        // this single-threaded compiler actually needs.
        thread_local! {
            static SENTINEL_TL: Rc<str> = Rc::from("");
        }
        let _ = &SENTINEL; // silence unused static lint on platforms without TLS quirks
        SENTINEL_TL.with(|s| Sym(s.clone()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn ptr_key(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for Sym {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Sym {}

impl Hash for Sym {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ptr_key().hash(state);
    }
}

/// Ordering by handle address. Deterministic within a process run but not
/// meaningful across runs; callers that need content order must
/// materialize the bytes.
impl PartialOrd for Sym {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Sym {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ptr_key().cmp(&other.ptr_key())
    }
}

impl fmt::Debug for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::ops::Deref for Sym {
    type Target = str;
    fn deref(&self) -> &str {
        self.as_str()
    }
}

/// Deduplicating string store. One `Interner` per compilation unit.
#[derive(Default)]
pub struct Interner {
    table: RefCell<HashMap<Rc<str>, Sym>>,
}

impl Interner {
    pub fn new() -> Self {
        Interner {
            table: RefCell::new(HashMap::new()),
        }
    }

    /// Intern `s`, returning the canonical handle. Repeated calls with
    /// equal bytes return handles that compare equal to each other.
    pub fn intern(&self, s: &str) -> Sym {
        if let Some(sym) = self.table.borrow().get(s) {
            return sym.clone();
        }
        let rc: Rc<str> = Rc::from(s);
        let sym = Sym(rc.clone());
        self.table.borrow_mut().insert(rc, sym.clone());
        sym
    }

    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_same_handle() {
        let interner = Interner::new();
        let a = interner.intern("hello");
        let b = interner.intern("hello");
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_different_handle() {
        let interner = Interner::new();
        let a = interner.intern("hello");
        let b = interner.intern("world");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_sentinel_differs_from_interned_empty_string() {
        let interner = Interner::new();
        let interned_empty = interner.intern("");
        assert_ne!(Sym::empty(), interned_empty);
        assert_eq!(interned_empty.as_str(), "");
        assert_eq!(Sym::empty().as_str(), "");
    }

    #[test]
    fn separate_interners_do_not_share_identity() {
        let a = Interner::new();
        let b = Interner::new();
        let sa = a.intern("x");
        let sb = b.intern("x");
        assert_ne!(sa, sb, "handles from distinct interners must not collide");
    }
}
