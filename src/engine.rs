//! Dictionary engines
//!
//! The string table for both endpoints: phrase-to-code for the compressor,
//! code-to-phrase for the expander, together with the current code width and
//! the policy's slot management.  Phrases are owned byte strings rather than
//! (code,symbol) links: once a policy reuses a slot, a link chain passing
//! through it would silently change meaning, so the flat representation is
//! required.
//!
//! Code space, with `|A|` the alphabet size and `max_size = 2^max_bits`:
//! * `0..|A|` one code per alphabet symbol, fixed by declared order
//! * `|A|` the end-of-stream marker
//! * `|A|+1` the reset code, reserved by the reset policy only
//! * `max_size-1` the evict signal, reserved by the signalled policies only
//! * everything else is dictionary range

use std::collections::HashMap;
use crate::alphabet::Alphabet;
use crate::header::Header;
use crate::tools::recency::{LfuOrder,LruOrder};
use crate::{Error,Options,Phrase,Policy};

/// append a symbol to a phrase
pub fn extend(phrase: &[u8],sym: u8) -> Phrase {
    let mut v = Vec::with_capacity(phrase.len() + 1);
    v.extend_from_slice(phrase);
    v.push(sym);
    Phrase::from(v)
}

/// The recency index a policy calls for, on either endpoint.  The compressor
/// keys by phrase, the expander by code.
enum Evictor<K> {
    Untracked,
    Lru(LruOrder<K>),
    Lfu(LfuOrder<K>)
}

impl<K: std::hash::Hash + Eq + Clone> Evictor<K> {
    fn touch(&mut self,key: K) {
        match self {
            Evictor::Untracked => {},
            Evictor::Lru(order) => order.touch(key),
            Evictor::Lfu(order) => order.touch(key)
        }
    }
    fn contains(&self,key: &K) -> bool {
        match self {
            Evictor::Untracked => false,
            Evictor::Lru(order) => order.contains(key),
            Evictor::Lfu(order) => order.contains(key)
        }
    }
    fn find_victim(&self) -> Option<&K> {
        match self {
            Evictor::Untracked => None,
            Evictor::Lru(order) => order.find_victim(),
            Evictor::Lfu(order) => order.find_victim()
        }
    }
    fn remove(&mut self,key: &K) {
        match self {
            Evictor::Untracked => {},
            Evictor::Lru(order) => order.remove(key),
            Evictor::Lfu(order) => order.remove(key)
        }
    }
}

/// Recorded when a signalled policy reuses a slot; becomes the payload of
/// the resync packet emitted just before the slot's code next appears.
pub struct Resync {
    /// the phrase installed in the reused slot
    pub phrase: Phrase,
    /// the match in progress when the eviction fired; the new phrase is this
    /// prefix plus one symbol
    pub prefix: Phrase
}

pub enum InsertOutcome {
    /// entry stored, in a fresh slot or a reused one
    Added,
    /// dictionary frozen, or no victim available; entry dropped
    Skipped,
    /// reset policy with a full dictionary: the caller must emit RESET_CODE
    /// and call `reset` on both engines
    NeedsReset
}

fn first_free(alphabet_len: u32,policy: Policy) -> u32 {
    match policy.reserves_reset() {
        true => alphabet_len + 2,
        false => alphabet_len + 1
    }
}

pub struct EncoderDict {
    policy: Policy,
    alphabet: Alphabet,
    phrases: HashMap<Phrase,u32>,
    order: Evictor<Phrase>,
    pending: HashMap<u32,Resync>,
    next_code: u32,
    code_bits: u8,
    threshold: u32,
    min_bits: u8,
    max_bits: u8,
    max_size: u32
}

impl EncoderDict {
    pub fn new(opt: &Options) -> Self {
        let order = match opt.policy {
            Policy::Lfu => Evictor::Lfu(LfuOrder::new()),
            Policy::Lru | Policy::LruOpt1 | Policy::LruOpt2 => Evictor::Lru(LruOrder::new()),
            _ => Evictor::Untracked
        };
        Self {
            policy: opt.policy,
            alphabet: opt.alphabet.clone(),
            phrases: HashMap::new(),
            order,
            pending: HashMap::new(),
            next_code: first_free(opt.alphabet.len() as u32,opt.policy),
            code_bits: opt.min_bits,
            threshold: 1u32 << opt.min_bits,
            min_bits: opt.min_bits,
            max_bits: opt.max_bits,
            max_size: 1u32 << opt.max_bits
        }
    }
    pub fn code_bits(&self) -> u8 {
        self.code_bits
    }
    pub fn eof_code(&self) -> u32 {
        self.alphabet.len() as u32
    }
    /// reset policy only
    pub fn reset_code(&self) -> u32 {
        self.alphabet.len() as u32 + 1
    }
    /// signalled policies only
    pub fn evict_signal(&self) -> u32 {
        self.max_size - 1
    }
    /// one past the last dictionary slot
    fn code_limit(&self) -> u32 {
        match self.policy.signalled() {
            true => self.max_size - 1,
            false => self.max_size
        }
    }
    pub fn contains(&self,phrase: &[u8]) -> bool {
        self.phrases.contains_key(phrase)
    }
    /// code of a currently matched phrase; single symbols come from the
    /// alphabet range
    pub fn code_of(&self,phrase: &[u8]) -> Option<u32> {
        match phrase.len() {
            1 => self.alphabet.code_of(phrase[0]),
            _ => self.phrases.get(phrase).copied()
        }
    }
    /// Recency credit for a phrase whose code was just written.  Alphabet
    /// phrases are not tracked.
    pub fn touch_emitted(&mut self,phrase: &[u8]) {
        if phrase.len() < 2 {
            return;
        }
        if let Some((key,_)) = self.phrases.get_key_value(phrase) {
            let key = key.clone();
            self.order.touch(key);
        }
    }
    /// the resync obligation attached to this code, if any
    pub fn take_pending(&mut self,code: u32) -> Option<Resync> {
        self.pending.remove(&code)
    }
    /// Store the phrase that just failed to match (the emitted phrase plus
    /// one symbol).  Grows the code width when the slot about to be used
    /// reaches the growth threshold; at the code limit the policy takes over.
    pub fn insert(&mut self,candidate: &[u8]) -> Result<InsertOutcome,Error> {
        debug_assert!(candidate.len() >= 2);
        if self.next_code < self.code_limit() {
            if self.next_code >= self.threshold && self.code_bits < self.max_bits {
                self.code_bits += 1;
                self.threshold <<= 1;
            }
            let phrase = Phrase::from(candidate);
            self.phrases.insert(phrase.clone(),self.next_code);
            self.order.touch(phrase);
            self.next_code += 1;
            return Ok(InsertOutcome::Added);
        }
        match self.policy {
            Policy::Freeze => Ok(InsertOutcome::Skipped),
            Policy::Reset => Ok(InsertOutcome::NeedsReset),
            _ => self.evict_and_insert(candidate)
        }
    }
    fn evict_and_insert(&mut self,candidate: &[u8]) -> Result<InsertOutcome,Error> {
        let victim = match self.order.find_victim() {
            Some(key) => key.clone(),
            None => return Ok(InsertOutcome::Skipped)
        };
        let slot = match self.phrases.remove(&victim) {
            Some(code) => code,
            None => return Err(Error::InternalInvariant("recency index holds a phrase the dictionary lacks"))
        };
        self.order.remove(&victim);
        log::trace!("evict code {}",slot);
        let phrase = Phrase::from(candidate);
        self.phrases.insert(phrase.clone(),slot);
        self.order.touch(phrase.clone());
        if self.policy.signalled() {
            let prefix = Phrase::from(&candidate[..candidate.len() - 1]);
            self.pending.insert(slot,Resync {
                phrase,
                prefix
            });
        }
        Ok(InsertOutcome::Added)
    }
    /// Reinitialize after a RESET_CODE (reset policy).
    pub fn reset(&mut self) {
        self.phrases.clear();
        self.pending.clear();
        self.next_code = self.alphabet.len() as u32 + 2;
        self.code_bits = self.min_bits;
        self.threshold = 1u32 << self.min_bits;
    }
    /// Width check between the final data code and the EOF marker; the
    /// expander performs the matching check before reading the marker.
    pub fn final_width_bump(&mut self) {
        if self.next_code >= self.threshold && self.code_bits < self.max_bits {
            self.code_bits += 1;
        }
    }
}

pub struct DecoderDict {
    policy: Policy,
    entries: Vec<Option<Phrase>>,
    order: Evictor<u32>,
    alphabet_len: u32,
    next_code: u32,
    code_bits: u8,
    threshold: u32,
    min_bits: u8,
    max_bits: u8,
    max_size: u32
}

impl DecoderDict {
    pub fn new(header: &Header,policy: Policy) -> Self {
        let order = match policy {
            Policy::Lfu => Evictor::Lfu(LfuOrder::new()),
            Policy::Lru => Evictor::Lru(LruOrder::new()),
            _ => Evictor::Untracked
        };
        let max_size = 1u32 << header.max_bits;
        let mut entries = vec![None;max_size as usize];
        for (i,sym) in header.alphabet.symbols().iter().enumerate() {
            entries[i] = Some(Phrase::from([*sym].as_slice()));
        }
        Self {
            policy,
            entries,
            order,
            alphabet_len: header.alphabet.len() as u32,
            next_code: first_free(header.alphabet.len() as u32,policy),
            code_bits: header.min_bits,
            threshold: 1u32 << header.min_bits,
            min_bits: header.min_bits,
            max_bits: header.max_bits,
            max_size
        }
    }
    pub fn code_bits(&self) -> u8 {
        self.code_bits
    }
    pub fn eof_code(&self) -> u32 {
        self.alphabet_len
    }
    pub fn reset_code(&self) -> u32 {
        self.alphabet_len + 1
    }
    pub fn evict_signal(&self) -> u32 {
        self.max_size - 1
    }
    fn code_limit(&self) -> u32 {
        match self.policy.signalled() {
            true => self.max_size - 1,
            false => self.max_size
        }
    }
    /// The compressor applies its width check just before each insertion;
    /// this is the mirror image, applied before reading the next code, one
    /// code later than the insertion it pairs with.
    pub fn maybe_grow(&mut self) {
        if self.next_code >= self.threshold && self.code_bits < self.max_bits {
            self.code_bits += 1;
            self.threshold <<= 1;
        }
    }
    pub fn get(&self,code: u32) -> Option<Phrase> {
        match self.entries.get(code as usize) {
            Some(entry) => entry.clone(),
            None => None
        }
    }
    /// The slot the next insertion will define.  A received code equal to
    /// this slot is the just-constructed-phrase case and decodes as
    /// `prev + prev[0]`; under the mirroring policies at the code limit the
    /// slot is the victim's, which still holds the stale phrase, so this
    /// check must come before the table lookup.  The signalled policies
    /// repair staleness with resync packets instead and have no pending slot
    /// once full.
    pub fn pending_slot(&self) -> Option<u32> {
        if self.next_code < self.code_limit() {
            return Some(self.next_code);
        }
        match self.policy.mirrors_eviction() {
            true => self.order.find_victim().copied(),
            false => None
        }
    }
    /// Mirror of the compressor's insertion, one code behind it.
    pub fn insert(&mut self,entry: Phrase) {
        if self.next_code < self.code_limit() {
            self.entries[self.next_code as usize] = Some(entry);
            self.order.touch(self.next_code);
            self.next_code += 1;
            return;
        }
        if !self.policy.mirrors_eviction() {
            // frozen, awaiting a reset code, or repaired by resync packets
            return;
        }
        let victim = match self.order.find_victim() {
            Some(&code) => code,
            None => return
        };
        self.order.remove(&victim);
        log::trace!("evict code {}",victim);
        self.entries[victim as usize] = Some(entry);
        self.order.touch(victim);
    }
    /// Recency credit for a code that was just decoded; alphabet and
    /// reserved codes are not tracked.
    pub fn touch_code(&mut self,code: u32) {
        if code > self.alphabet_len && self.order.contains(&code) {
            self.order.touch(code);
        }
    }
    /// Install a resync packet's phrase over the stale slot.
    pub fn apply_signal(&mut self,victim: u32,phrase: Phrase) -> Result<(),Error> {
        if victim <= self.alphabet_len || victim >= self.evict_signal() {
            return Err(Error::InvalidSignal(format!("victim code {} is outside the dictionary range",victim)));
        }
        match self.entries.get_mut(victim as usize) {
            Some(slot) if slot.is_some() => {
                *slot = Some(phrase);
                Ok(())
            },
            _ => Err(Error::InvalidSignal(format!("victim code {} is not defined",victim)))
        }
    }
    /// Reinitialize after a RESET_CODE (reset policy).
    pub fn reset(&mut self) {
        for entry in self.entries.iter_mut().skip(self.alphabet_len as usize) {
            *entry = None;
        }
        self.next_code = self.alphabet_len + 2;
        self.code_bits = self.min_bits;
        self.threshold = 1u32 << self.min_bits;
    }
}

// *************** TESTS *****************

#[cfg(test)]
fn ab_options(policy: Policy,min_bits: u8,max_bits: u8) -> Options {
    Options::with_widths(policy,Alphabet::ab(),min_bits,max_bits)
}

#[test]
fn encoder_width_grows_at_threshold() {
    let mut dict = EncoderDict::new(&ab_options(Policy::Freeze,3,5));
    // slots 3..8 fit in 3 bits; the insert that takes slot 8 grows the width
    let phrases: [&[u8];5] = [b"aa",b"ab",b"ba",b"bb",b"aaa"];
    for (i,phrase) in phrases.iter().enumerate() {
        assert!(matches!(dict.insert(phrase),Ok(InsertOutcome::Added)));
        assert_eq!(dict.code_bits(),3,"insert {}",i);
    }
    assert!(matches!(dict.insert(b"aab"),Ok(InsertOutcome::Added)));
    assert_eq!(dict.code_bits(),4);
}

#[test]
fn encoder_freeze_skips_when_full() {
    let mut dict = EncoderDict::new(&ab_options(Policy::Freeze,3,3));
    let phrases: [&[u8];5] = [b"aa",b"ab",b"ba",b"bb",b"aaa"];
    for phrase in phrases {
        assert!(matches!(dict.insert(phrase),Ok(InsertOutcome::Added)));
    }
    assert!(matches!(dict.insert(b"aab"),Ok(InsertOutcome::Skipped)));
    assert_eq!(dict.code_of(b"aa"),Some(3));
    assert_eq!(dict.code_of(b"aab"),None);
}

#[test]
fn encoder_reset_rebuilds() {
    let mut dict = EncoderDict::new(&ab_options(Policy::Reset,3,3));
    // reset reserves code 3, slots 4..8 hold four entries
    for phrase in [b"aa",b"ab",b"ba",b"bb"] {
        assert!(matches!(dict.insert(phrase),Ok(InsertOutcome::Added)));
    }
    assert!(matches!(dict.insert(b"aaa"),Ok(InsertOutcome::NeedsReset)));
    dict.reset();
    assert_eq!(dict.code_of(b"aa"),None);
    assert!(matches!(dict.insert(b"aa"),Ok(InsertOutcome::Added)));
    assert_eq!(dict.code_of(b"aa"),Some(4));
}

#[test]
fn encoder_eviction_reuses_lru_slot() {
    let mut dict = EncoderDict::new(&ab_options(Policy::Lru,3,3));
    let phrases: [&[u8];5] = [b"aa",b"ab",b"ba",b"bb",b"aaa"];
    for phrase in phrases {
        dict.insert(phrase).unwrap();
    }
    // credit "aa" so "ab" at slot 4 is now least recent
    dict.touch_emitted(b"aa");
    assert!(matches!(dict.insert(b"aab"),Ok(InsertOutcome::Added)));
    assert_eq!(dict.code_of(b"ab"),None);
    assert_eq!(dict.code_of(b"aab"),Some(4));
}

#[test]
fn encoder_signalled_records_pending() {
    let mut dict = EncoderDict::new(&ab_options(Policy::LruOpt2,3,3));
    // signal reserves code 7, slots 3..7 hold four entries
    for phrase in [b"aa",b"ab",b"ba",b"bb"] {
        dict.insert(phrase).unwrap();
    }
    dict.insert(b"aaa").unwrap();
    let resync = dict.take_pending(3).expect("eviction should leave a pending resync");
    assert_eq!(resync.phrase.as_ref(),b"aaa");
    assert_eq!(resync.prefix.as_ref(),b"aa");
    assert!(dict.take_pending(3).is_none());
}

#[cfg(test)]
fn test_header(min_bits: u8,max_bits: u8) -> Header {
    Header {
        min_bits,
        max_bits,
        alphabet: Alphabet::ab()
    }
}

#[test]
fn decoder_pending_slot_tracks_the_victim() {
    let mut dict = DecoderDict::new(&test_header(3,3),Policy::Lru);
    assert_eq!(dict.pending_slot(),Some(3));
    let phrases: [&[u8];5] = [b"aa",b"ab",b"ba",b"bb",b"aaa"];
    for phrase in phrases {
        dict.insert(Phrase::from(phrase));
    }
    // full: the pending slot is now the LRU victim, the oldest insert
    assert_eq!(dict.pending_slot(),Some(3));
    dict.touch_code(3);
    assert_eq!(dict.pending_slot(),Some(4));
}

#[test]
fn decoder_signal_replaces_defined_slots_only() {
    let mut dict = DecoderDict::new(&test_header(3,3),Policy::LruOpt2);
    assert!(matches!(dict.apply_signal(4,Phrase::from(b"ab".as_slice())),Err(Error::InvalidSignal(_))));
    dict.insert(Phrase::from(b"aa".as_slice()));
    dict.insert(Phrase::from(b"ab".as_slice()));
    assert!(dict.apply_signal(4,Phrase::from(b"bb".as_slice())).is_ok());
    assert_eq!(dict.get(4).unwrap().as_ref(),b"bb");
    assert!(matches!(dict.apply_signal(7,Phrase::from(b"ba".as_slice())),Err(Error::InvalidSignal(_))));
    assert!(matches!(dict.apply_signal(1,Phrase::from(b"ba".as_slice())),Err(Error::InvalidSignal(_))));
}

#[test]
fn decoder_signalled_inserts_stop_at_the_signal_slot() {
    let mut dict = DecoderDict::new(&test_header(3,3),Policy::LruOpt1);
    for phrase in [b"aa",b"ab",b"ba",b"bb"] {
        dict.insert(Phrase::from(phrase.as_slice()));
    }
    assert_eq!(dict.pending_slot(),None);
    dict.insert(Phrase::from(b"aaa".as_slice()));
    assert_eq!(dict.get(7),None);
}
