//! # Bounded LZW Library
//!
//! Compress or expand byte streams with LZW over a bounded dictionary.
//! The dictionary holds at most `2^max_bits` codes; once the last slot is
//! occupied a *full-dictionary policy* decides what happens next:
//! * `Freeze` stops adding entries and keeps matching with what is there
//! * `Reset` emits a reset code and rebuilds the dictionary from the alphabet
//! * `Lfu` evicts the least-frequently-used entry and reuses its slot
//! * `Lru` evicts the least-recently-used entry and reuses its slot
//! * `LruOpt1` and `LruOpt2` evict like `Lru` but send a resynchronization
//!   signal in the code stream, so the expander tracks no recency at all;
//!   `LruOpt2` also shortens the signal payload against a window of recent
//!   output
//!
//! The compression/expansion functions are generics that operate on trait
//! objects with bounds `Read` or `Write`.  There are convenience functions for
//! working directly with buffers.
//!
//! ## File Example
//!
//! ```rs
//! use bounded_lzw::*;
//! let mut in_file = std::fs::File::open("some_input_path").expect("open failed");
//! let mut out_file = std::fs::File::create("some_output_path").expect("create failed");
//! let opt = Options::new(Policy::Freeze,alphabet::Alphabet::ascii());
//! let (in_size,out_size) = codec::compress(&mut in_file,&mut out_file,&opt)
//!     .expect("compression failed");
//! eprintln!("compressed {} into {}",in_size,out_size);
//! ```
//!
//! ## Buffer Example
//!
//! ```rs
//! use bounded_lzw::*;
//! let test_data = "This is the chaunt of the priests.".as_bytes();
//! let opt = Options::new(Policy::Lru,alphabet::Alphabet::ascii());
//! let compressed = codec::compress_slice(test_data,&opt).expect("compression failed");
//! let expanded = codec::expand_slice(&compressed,Policy::Lru).expect("expansion failed");
//! ```

pub mod alphabet;
mod tools;
mod header;
mod engine;
pub mod codec;

use alphabet::Alphabet;

/// Phrases are shared byte strings; the dictionary maps, the recency index
/// and the recent-output window all refer to one allocation.
pub(crate) type Phrase = std::rc::Rc<[u8]>;

/// Codec Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("alphabet `{0}` is not recognized")]
    UnsupportedAlphabet(String),
    #[error("bad parameters: {0}")]
    BadParameters(String),
    #[error("byte value {value} at position {position} not in alphabet")]
    OutOfAlphabet {
        position: u64,
        value: u8
    },
    #[error("truncated artifact: {0}")]
    TruncatedArtifact(&'static str),
    #[error("invalid codeword {0}")]
    InvalidCode(u32),
    #[error("invalid resync signal: {0}")]
    InvalidSignal(String),
    #[error("internal invariant violated: {0}")]
    InternalInvariant(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error)
}

/// What happens once the dictionary's last code slot is occupied.
/// An artifact carries no policy tag; the expander must be told the policy
/// the compressor used, normally implied by the subcommand.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Policy {
    Freeze,
    Reset,
    Lfu,
    Lru,
    LruOpt1,
    LruOpt2
}

impl Policy {
    /// reset policy reserves `RESET_CODE = |A| + 1`
    pub fn reserves_reset(&self) -> bool {
        matches!(self,Policy::Reset)
    }
    /// signalled policies reserve `EVICT_SIGNAL = 2^max_bits - 1`
    pub fn signalled(&self) -> bool {
        matches!(self,Policy::LruOpt1 | Policy::LruOpt2)
    }
    /// does the signal payload reference the recent-output window
    pub fn windowed(&self) -> bool {
        matches!(self,Policy::LruOpt2)
    }
    /// does the expander run the same eviction logic as the compressor
    pub fn mirrors_eviction(&self) -> bool {
        matches!(self,Policy::Lfu | Policy::Lru)
    }
}

/// Options controlling compression.  The expander needs no options; every
/// parameter it uses is read back from the artifact header.
#[derive(Clone)]
pub struct Options {
    /// full-dictionary policy
    pub policy: Policy,
    /// the set of admissible input symbols, serialized into the header
    pub alphabet: Alphabet,
    /// starting code width in bits
    pub min_bits: u8,
    /// maximum code width in bits, bounds the dictionary at `2^max_bits`
    pub max_bits: u8
}

impl Options {
    /// Options with the default code widths (9 through 16)
    pub fn new(policy: Policy,alphabet: Alphabet) -> Self {
        Self {
            policy,
            alphabet,
            min_bits: 9,
            max_bits: 16
        }
    }
    pub fn with_widths(policy: Policy,alphabet: Alphabet,min_bits: u8,max_bits: u8) -> Self {
        Self {
            policy,
            alphabet,
            min_bits,
            max_bits
        }
    }
    pub fn validate(&self) -> Result<(),Error> {
        validate_params(self.min_bits,self.max_bits,self.alphabet.len(),self.policy)
    }
}

/// Shared by compression options and decoded headers.  Widths outside 2..=16
/// are refused; 16 bits keeps every code table small and covers the range
/// this codec family is used with.
pub(crate) fn validate_params(min_bits: u8,max_bits: u8,alphabet_len: usize,policy: Policy) -> Result<(),Error> {
    if !(2..=16).contains(&min_bits) || !(2..=16).contains(&max_bits) {
        return Err(Error::BadParameters(format!("code widths must be in 2..=16, got {} and {}",min_bits,max_bits)));
    }
    if min_bits > max_bits {
        return Err(Error::BadParameters(format!("min width {} exceeds max width {}",min_bits,max_bits)));
    }
    let reserved = match policy.signalled() {
        true => alphabet_len + 3,
        false => alphabet_len + 2
    };
    if (1usize << min_bits) < reserved {
        return Err(Error::BadParameters(format!("2^{} is too small for {} symbols plus reserved codes",min_bits,alphabet_len)));
    }
    Ok(())
}
