//! O(1) recency and frequency indexes
//!
//! These drive victim selection when a full dictionary must shed an entry.
//! Nodes live in an arena and link by index, which sidesteps the ownership
//! cycles of a pointer-based doubly-linked list; sentinels occupy fixed
//! arena slots and a hash map takes keys to node indices.  Every operation
//! is O(1) amortized.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

struct Node<K> {
    key: Option<K>,
    freq: u64,
    prev: usize,
    next: usize
}

/// Keys ordered by recency of use.  `find_victim` is the least recently
/// touched key.
pub struct LruOrder<K> {
    nodes: Vec<Node<K>>,
    free: Vec<usize>,
    map: HashMap<K,usize>
}

const HEAD: usize = 0;
const TAIL: usize = 1;

impl<K: Hash + Eq + Clone> LruOrder<K> {
    pub fn new() -> Self {
        let nodes = vec![
            Node { key: None, freq: 0, prev: HEAD, next: TAIL },
            Node { key: None, freq: 0, prev: HEAD, next: TAIL }
        ];
        Self {
            nodes,
            free: Vec::new(),
            map: HashMap::new()
        }
    }
    fn unlink(&mut self,idx: usize) {
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }
    fn link_front(&mut self,idx: usize) {
        let first = self.nodes[HEAD].next;
        self.nodes[idx].prev = HEAD;
        self.nodes[idx].next = first;
        self.nodes[first].prev = idx;
        self.nodes[HEAD].next = idx;
    }
    fn alloc(&mut self,key: K) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx].key = Some(key);
                idx
            },
            None => {
                self.nodes.push(Node { key: Some(key), freq: 0, prev: HEAD, next: TAIL });
                self.nodes.len() - 1
            }
        }
    }
    /// Move `key` to the most-recent end, inserting it if absent.
    pub fn touch(&mut self,key: K) {
        match self.map.get(&key) {
            Some(&idx) => {
                self.unlink(idx);
                self.link_front(idx);
            },
            None => {
                let idx = self.alloc(key.clone());
                self.map.insert(key,idx);
                self.link_front(idx);
            }
        }
    }
    /// The least recently used key, left in place.
    pub fn find_victim(&self) -> Option<&K> {
        let idx = self.nodes[TAIL].prev;
        match idx == HEAD {
            true => None,
            false => self.nodes[idx].key.as_ref()
        }
    }
    pub fn remove<Q>(&mut self,key: &Q)
    where K: Borrow<Q>, Q: Hash + Eq + ?Sized {
        if let Some(idx) = self.map.remove(key) {
            self.unlink(idx);
            self.nodes[idx].key = None;
            self.free.push(idx);
        }
    }
    pub fn contains<Q>(&self,key: &Q) -> bool
    where K: Borrow<Q>, Q: Hash + Eq + ?Sized {
        self.map.contains_key(key)
    }
    pub fn len(&self) -> usize {
        self.map.len()
    }
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Keys ordered by frequency of use, least-recent first within a frequency.
/// `find_victim` is the least frequently touched key, ties broken by least
/// recent use.  `touch` increments the key's frequency (inserting at
/// frequency 1), so it is not idempotent.
pub struct LfuOrder<K> {
    nodes: Vec<Node<K>>,
    free: Vec<usize>,
    map: HashMap<K,usize>,
    /// frequency to the (head,tail) sentinels of that frequency's list
    lists: HashMap<u64,(usize,usize)>,
    /// smallest frequency present; only ever raised, and only when a touch
    /// empties the minimum bucket (removal is always followed by an insert
    /// at frequency 1, which restores it)
    min_freq: u64
}

impl<K: Hash + Eq + Clone> LfuOrder<K> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            map: HashMap::new(),
            lists: HashMap::new(),
            min_freq: 0
        }
    }
    fn unlink(&mut self,idx: usize) {
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }
    fn alloc(&mut self,key: Option<K>,freq: u64) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx].key = key;
                self.nodes[idx].freq = freq;
                idx
            },
            None => {
                self.nodes.push(Node { key, freq, prev: 0, next: 0 });
                self.nodes.len() - 1
            }
        }
    }
    /// sentinels of the list for `freq`, created on first use
    fn bucket(&mut self,freq: u64) -> (usize,usize) {
        if let Some(&pair) = self.lists.get(&freq) {
            return pair;
        }
        let head = self.alloc(None,freq);
        let tail = self.alloc(None,freq);
        self.nodes[head].next = tail;
        self.nodes[head].prev = head;
        self.nodes[tail].prev = head;
        self.nodes[tail].next = tail;
        self.lists.insert(freq,(head,tail));
        (head,tail)
    }
    fn link_front(&mut self,head: usize,idx: usize) {
        let first = self.nodes[head].next;
        self.nodes[idx].prev = head;
        self.nodes[idx].next = first;
        self.nodes[first].prev = idx;
        self.nodes[head].next = idx;
    }
    /// Increment the frequency of `key`, inserting it at frequency 1 if
    /// absent.
    pub fn touch(&mut self,key: K) {
        match self.map.get(&key) {
            Some(&idx) => {
                let old_freq = self.nodes[idx].freq;
                self.unlink(idx);
                if old_freq == self.min_freq {
                    let (head,tail) = self.bucket(old_freq);
                    if self.nodes[head].next == tail {
                        self.min_freq = old_freq + 1;
                    }
                }
                let freq = old_freq + 1;
                self.nodes[idx].freq = freq;
                let (head,_) = self.bucket(freq);
                self.link_front(head,idx);
            },
            None => {
                let idx = self.alloc(Some(key.clone()),1);
                self.map.insert(key,idx);
                let (head,_) = self.bucket(1);
                self.link_front(head,idx);
                self.min_freq = 1;
            }
        }
    }
    /// The key with the smallest (frequency, recency) pair, left in place.
    pub fn find_victim(&self) -> Option<&K> {
        let (head,tail) = *self.lists.get(&self.min_freq)?;
        let idx = self.nodes[tail].prev;
        match idx == head {
            true => None,
            false => self.nodes[idx].key.as_ref()
        }
    }
    pub fn remove<Q>(&mut self,key: &Q)
    where K: Borrow<Q>, Q: Hash + Eq + ?Sized {
        if let Some(idx) = self.map.remove(key) {
            self.unlink(idx);
            self.nodes[idx].key = None;
            self.free.push(idx);
        }
    }
    pub fn contains<Q>(&self,key: &Q) -> bool
    where K: Borrow<Q>, Q: Hash + Eq + ?Sized {
        self.map.contains_key(key)
    }
    pub fn len(&self) -> usize {
        self.map.len()
    }
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// *************** TESTS *****************

#[test]
fn lru_victim_is_least_recent() {
    let mut order: LruOrder<&str> = LruOrder::new();
    order.touch("a");
    order.touch("b");
    order.touch("c");
    assert_eq!(order.find_victim(),Some(&"a"));
    order.touch("a");
    assert_eq!(order.find_victim(),Some(&"b"));
}

#[test]
fn lru_remove_detaches() {
    let mut order: LruOrder<u32> = LruOrder::new();
    order.touch(1);
    order.touch(2);
    order.touch(3);
    order.remove(&1);
    assert!(!order.contains(&1));
    assert_eq!(order.find_victim(),Some(&2));
    order.remove(&2);
    order.remove(&3);
    assert_eq!(order.find_victim(),None);
    assert!(order.is_empty());
}

#[test]
fn lru_arena_reuses_slots() {
    let mut order: LruOrder<u32> = LruOrder::new();
    for i in 0..100 {
        order.touch(i);
        order.remove(&i);
    }
    // 2 sentinels + 1 recycled node
    assert!(order.nodes.len() <= 3);
}

#[test]
fn lfu_victim_has_smallest_frequency() {
    let mut order: LfuOrder<&str> = LfuOrder::new();
    order.touch("a");
    order.touch("b");
    order.touch("b");
    assert_eq!(order.find_victim(),Some(&"a"));
}

#[test]
fn lfu_breaks_ties_by_least_recent_use() {
    let mut order: LfuOrder<&str> = LfuOrder::new();
    order.touch("a");
    order.touch("b");
    assert_eq!(order.find_victim(),Some(&"a"));
    order.touch("a");
    order.touch("b");
    // both at frequency 2, "a" entered that bucket first
    assert_eq!(order.find_victim(),Some(&"a"));
}

#[test]
fn lfu_min_freq_rises_when_bucket_drains() {
    let mut order: LfuOrder<&str> = LfuOrder::new();
    order.touch("a");
    order.touch("b");
    order.touch("a");
    assert_eq!(order.find_victim(),Some(&"b"));
    order.touch("b");
    // frequency-1 bucket is now empty, min moves to 2 where "a" is older
    assert_eq!(order.find_victim(),Some(&"a"));
}

#[test]
fn lfu_eviction_cycle_restores_min_freq() {
    let mut order: LfuOrder<u32> = LfuOrder::new();
    order.touch(1);
    order.touch(1);
    order.touch(2);
    let victim = *order.find_victim().unwrap();
    assert_eq!(victim,2);
    order.remove(&victim);
    order.touch(3);
    assert_eq!(order.find_victim(),Some(&3));
    assert_eq!(order.len(),2);
}
