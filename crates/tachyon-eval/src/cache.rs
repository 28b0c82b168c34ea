//! Calc cache (spec §3/§4.E), grounded on `tachy_calc_cache.h` for the hash
//! key minting / `clear`-in-insertion-order contract, and on the teacher's
//! `formualizer-eval/src/engine/cache.rs` for the general shape of a small
//! owning, `insert`-returns-bool, `len`/`is_empty`/`clear` cache type.
//!
//! Two implementations share the [`Cache`] trait: [`CalcCache`] (level >= 1,
//! real storage) and [`NullCache`] (level 0, the "dummy" sentinel named in
//! spec §3 — `has_key` always false, `hash_key(s) = "V0"`).

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use tachyon_common::{TachyonError, TachyonErrorKind};

use crate::Lane;
use crate::date_vector::VectorEngine;

/// Renders `id` as hex digits in little-endian nibble order (spec §4.E:
/// "the id in hex, nibbles in little-endian nibble order"), i.e. the
/// least-significant nibble first. For `id < 16` this is indistinguishable
/// from ordinary big-endian hex (`1`..`f`); it diverges starting at `id =
/// 16`, which renders `"01"` (nibbles `[0, 1]`, LSB first) rather than the
/// big-endian `"10"`.
fn hex_le_nibbles(mut id: u32) -> String {
    if id == 0 {
        return "0".to_string();
    }
    let mut s = String::new();
    while id > 0 {
        s.push(std::char::from_digit(id & 0xf, 16).unwrap());
        id >>= 4;
    }
    s
}

/// The operations every cache level exposes (spec §6 "Cache surface").
pub trait Cache<T: Lane> {
    fn level(&self) -> u32;
    fn id(&self) -> &str;

    /// Interns `s`, returning a short opaque token stable for the lifetime
    /// of this cache instance (`hash_key(s1) = hash_key(s2) <=> s1 = s2`,
    /// spec §8). This is independent of whether anything is ever inserted
    /// under that token — see [`CalcCache::hash_key`].
    fn hash_key(&mut self, s: &str) -> String;

    fn contains(&self, key: &str) -> bool;
    fn get(&self, key: &str) -> Option<Rc<RefCell<VectorEngine<T>>>>;

    /// Inserts, replacing any existing value under `key` (spec §4.E).
    fn force_insert(&mut self, key: String, engine: Rc<RefCell<VectorEngine<T>>>);

    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn clear(&mut self);
}

/// Level-0 sentinel: zero-byte, no-op cache. `hash_key` always returns the
/// fixed token `"V0"` (spec §3, §4.E).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl<T: Lane> Cache<T> for NullCache {
    fn level(&self) -> u32 {
        0
    }
    fn id(&self) -> &str {
        "V0"
    }
    fn hash_key(&mut self, _s: &str) -> String {
        "V0".to_string()
    }
    fn contains(&self, _key: &str) -> bool {
        false
    }
    fn get(&self, _key: &str) -> Option<Rc<RefCell<VectorEngine<T>>>> {
        None
    }
    fn force_insert(&mut self, _key: String, _engine: Rc<RefCell<VectorEngine<T>>>) {}
    fn len(&self) -> usize {
        0
    }
    fn clear(&mut self) {}
}

/// A real, owning cache at level >= 1. Storage is an insertion-ordered
/// association (a `Vec` of entries plus an `FxHashMap` index) because
/// spec §4.E requires `clear` to destroy values "in insertion order" — this
/// port honours that literally rather than the original's `std::map`
/// (lexicographic) ordering; see SPEC_FULL.md "Supplemented features" item 5.
pub struct CalcCache<T: Lane> {
    id: String,
    level: u32,
    token_of: FxHashMap<String, String>,
    next_token_id: u32,
    order: Vec<String>,
    index: FxHashMap<String, usize>,
    store: FxHashMap<String, Rc<RefCell<VectorEngine<T>>>>,
}

impl<T: Lane> CalcCache<T> {
    pub fn new(id: impl Into<String>, level: u32) -> Result<Self, TachyonError> {
        if level == 0 {
            return Err(TachyonError::new(TachyonErrorKind::DuplicateKey)
                .with_message("level 0 is reserved for NullCache"));
        }
        Ok(Self {
            id: id.into(),
            level,
            token_of: FxHashMap::default(),
            next_token_id: 1,
            order: Vec::new(),
            index: FxHashMap::default(),
            store: FxHashMap::default(),
        })
    }

    /// Deep-clones every stored engine (spec §3: "clone (deep clone of every
    /// stored engine)").
    pub fn clone_deep(&self) -> Self {
        let store = self
            .store
            .iter()
            .map(|(k, v)| (k.clone(), Rc::new(RefCell::new(v.borrow().clone()))))
            .collect();
        Self {
            id: self.id.clone(),
            level: self.level,
            token_of: self.token_of.clone(),
            next_token_id: self.next_token_id,
            order: self.order.clone(),
            index: self.index.clone(),
            store,
        }
    }

    /// Inserts under `id` unless already present; fails with
    /// [`TachyonErrorKind::DuplicateKey`] otherwise (spec §4.F construction
    /// contract).
    pub fn insert_new(
        &mut self,
        id: String,
        engine: Rc<RefCell<VectorEngine<T>>>,
    ) -> Result<(), TachyonError> {
        if <Self as Cache<T>>::contains(self, &id) {
            return Err(TachyonError::new(TachyonErrorKind::DuplicateKey)
                .with_message(format!("key already present: {id}")));
        }
        <Self as Cache<T>>::force_insert(self, id, engine);
        Ok(())
    }

    /// Insertion-order iteration (spec §6 "Cache surface").
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<RefCell<VectorEngine<T>>>)> {
        self.order
            .iter()
            .map(|k| (k.as_str(), self.store.get(k).expect("index/store desync")))
    }
}

impl<T: Lane> Cache<T> for CalcCache<T> {
    fn level(&self) -> u32 {
        self.level
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn hash_key(&mut self, s: &str) -> String {
        if let Some(tok) = self.token_of.get(s) {
            return tok.clone();
        }
        let tok = format!("X{}", hex_le_nibbles(self.next_token_id));
        self.next_token_id += 1;
        self.token_of.insert(s.to_string(), tok.clone());
        crate::trace!(cache = %self.id, expr = %s, token = %tok, "calc_cache mint hash key");
        tok
    }

    fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<Rc<RefCell<VectorEngine<T>>>> {
        self.store.get(key).cloned()
    }

    fn force_insert(&mut self, key: String, engine: Rc<RefCell<VectorEngine<T>>>) {
        if let Some(&pos) = self.index.get(&key) {
            self.order[pos] = key.clone();
            self.store.insert(key, engine);
            crate::debug!(cache = %self.id, "calc_cache replace on duplicate key");
        } else {
            self.index.insert(key.clone(), self.order.len());
            self.order.push(key.clone());
            self.store.insert(key, engine);
            crate::trace!(cache = %self.id, "calc_cache insert");
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn clear(&mut self) {
        crate::debug!(cache = %self.id, entries = self.order.len(), "calc_cache clear");
        for key in self.order.drain(..) {
            self.store.remove(&key);
        }
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tachyon_common::Date;

    fn engine(n: usize) -> Rc<RefCell<VectorEngine<f64>>> {
        Rc::new(RefCell::new(VectorEngine::zeros(
            Date::from_yyyymm(201701).unwrap(),
            n,
        )))
    }

    #[test]
    fn null_cache_never_has_keys() {
        let mut nc = NullCache;
        assert_eq!(<NullCache as Cache<f64>>::hash_key(&mut nc, "a+b"), "V0");
        assert!(!<NullCache as Cache<f64>>::contains(&nc, "V0"));
    }

    #[test]
    fn hash_key_stability_scenario() {
        let mut cache = CalcCache::<f64>::new("c1", 1).unwrap();
        let x1 = cache.hash_key("a+b");
        let x2 = cache.hash_key("a-b");
        let x1_again = cache.hash_key("a+b");
        assert_eq!(x1, "X1");
        assert_eq!(x2, "X2");
        assert_eq!(x1_again, "X1");
    }

    #[test]
    fn token_sixteenth_onward_uses_little_endian_nibble_order() {
        let mut cache = CalcCache::<f64>::new("c1", 1).unwrap();
        let exprs: Vec<String> = (0..17).map(|i| format!("expr{i}")).collect();
        let tokens: Vec<String> = exprs.iter().map(|e| cache.hash_key(e)).collect();
        assert_eq!(tokens[14], "Xf"); // id 15
        assert_eq!(tokens[15], "X01"); // id 16 = 0x10, LSB nibble first
        assert_eq!(tokens[16], "X11"); // id 17 = 0x11, symmetric either way
    }

    #[test]
    fn duplicate_insert_fails() {
        let mut cache = CalcCache::<f64>::new("c1", 1).unwrap();
        cache.insert_new("k".into(), engine(4)).unwrap();
        let err = cache.insert_new("k".into(), engine(4)).unwrap_err();
        assert_eq!(err, TachyonErrorKind::DuplicateKey);
    }

    #[test]
    fn clear_destroys_in_insertion_order() {
        let mut cache = CalcCache::<f64>::new("c1", 1).unwrap();
        cache.force_insert("b".into(), engine(1));
        cache.force_insert("a".into(), engine(1));
        let order: Vec<&str> = cache.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["b", "a"]);
        cache.clear();
        assert!(cache.is_empty());
    }
}
