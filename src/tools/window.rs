//! Recent-output window
//!
//! A bounded record of the phrases most recently emitted (compressor) or
//! decoded (expander).  Both endpoints push after every non-signal output,
//! so identical push sequences keep the two windows identical and an 8-bit
//! offset into the window is meaningful on both sides.  Offsets are 1-based
//! from the newest entry; 0 is reserved on the wire to mean "no usable
//! reference, a literal payload follows".

use std::collections::{HashMap,VecDeque};
use crate::Phrase;

pub const CAPACITY: usize = 255;

pub struct RecentWindow {
    entries: VecDeque<Phrase>,
    /// phrase to the sequence number of its most recent push; pruned as
    /// entries age out so the map stays as bounded as the window
    index: HashMap<Phrase,u64>,
    /// sequence number of the oldest retained entry
    start: u64
}

impl RecentWindow {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(CAPACITY + 1),
            index: HashMap::new(),
            start: 0
        }
    }
    pub fn push(&mut self,phrase: Phrase) {
        let seq = self.start + self.entries.len() as u64;
        self.index.insert(phrase.clone(),seq);
        self.entries.push_back(phrase);
        if self.entries.len() > CAPACITY {
            if let Some(old) = self.entries.pop_front() {
                if self.index.get(&old) == Some(&self.start) {
                    self.index.remove(&old);
                }
            }
            self.start += 1;
        }
    }
    /// The entry `offset` places back from the newest, 1-based.
    pub fn get(&self,offset: u8) -> Option<&Phrase> {
        if offset == 0 {
            return None;
        }
        match self.entries.len().checked_sub(offset as usize) {
            Some(i) => self.entries.get(i),
            None => None
        }
    }
    /// Offset of the most recent push of `phrase`, if it has not aged out.
    pub fn find_recent(&self,phrase: &[u8]) -> Option<u8> {
        let seq = *self.index.get(phrase)?;
        let newest = self.start + self.entries.len() as u64 - 1;
        Some((newest - seq + 1) as u8)
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// *************** TESTS *****************

#[cfg(test)]
fn phrase(s: &str) -> Phrase {
    Phrase::from(s.as_bytes())
}

#[test]
fn newest_is_offset_one() {
    let mut win = RecentWindow::new();
    win.push(phrase("ab"));
    win.push(phrase("ba"));
    win.push(phrase("aba"));
    assert_eq!(win.find_recent(b"aba"),Some(1));
    assert_eq!(win.find_recent(b"ba"),Some(2));
    assert_eq!(win.find_recent(b"ab"),Some(3));
    assert_eq!(win.get(1).unwrap().as_ref(),b"aba");
    assert_eq!(win.get(3).unwrap().as_ref(),b"ab");
    assert_eq!(win.get(4),None);
}

#[test]
fn repeated_push_tracks_latest_occurrence() {
    let mut win = RecentWindow::new();
    win.push(phrase("ab"));
    win.push(phrase("ba"));
    win.push(phrase("ab"));
    assert_eq!(win.find_recent(b"ab"),Some(1));
}

#[test]
fn entries_age_out() {
    let mut win = RecentWindow::new();
    win.push(phrase("first"));
    for i in 0..CAPACITY {
        win.push(Phrase::from(format!("p{}",i).as_bytes()));
    }
    assert_eq!(win.len(),CAPACITY);
    assert_eq!(win.find_recent(b"first"),None);
    assert_eq!(win.find_recent(b"p0"),Some(255));
}

#[test]
fn aging_keeps_reemitted_phrases() {
    let mut win = RecentWindow::new();
    win.push(phrase("keep"));
    win.push(phrase("drop"));
    for i in 0..CAPACITY - 1 {
        win.push(Phrase::from(format!("p{}",i).as_bytes()));
    }
    win.push(phrase("keep"));
    // "keep" was re-pushed after its first entry aged out
    assert_eq!(win.find_recent(b"keep"),Some(1));
    assert_eq!(win.find_recent(b"drop"),None);
}
