//! Alphabets for the bounded LZW codecs
//!
//! An alphabet is an ordered set of distinct octets; the order fixes the
//! single-symbol codes.  The compressor rejects any input byte outside the
//! chosen alphabet, and the alphabet is serialized into the artifact header
//! so the expander needs no prior agreement about it.

use crate::Error;

#[derive(Clone)]
pub struct Alphabet {
    symbols: Vec<u8>,
    codes: [Option<u16>;256]
}

impl Alphabet {
    /// assumes `symbols` are distinct, callers validate or know statically
    fn build(symbols: Vec<u8>) -> Self {
        let mut codes = [None;256];
        for (i,sym) in symbols.iter().enumerate() {
            codes[*sym as usize] = Some(i as u16);
        }
        Self {
            symbols,
            codes
        }
    }
    /// 7-bit ASCII, 128 symbols
    pub fn ascii() -> Self {
        Self::build((0..128).collect())
    }
    /// all 256 octets
    pub fn extended_ascii() -> Self {
        Self::build((0..=255).collect())
    }
    /// the two-symbol set {'a','b'}
    pub fn ab() -> Self {
        Self::build(vec![b'a',b'b'])
    }
    pub fn from_name(name: &str) -> Result<Self,Error> {
        match name {
            "ascii" => Ok(Self::ascii()),
            "extendedascii" => Ok(Self::extended_ascii()),
            "ab" => Ok(Self::ab()),
            _ => Err(Error::UnsupportedAlphabet(name.to_string()))
        }
    }
    /// custom alphabet, also used when parsing an artifact header
    pub fn from_symbols(symbols: Vec<u8>) -> Result<Self,Error> {
        if symbols.is_empty() {
            return Err(Error::BadParameters("alphabet is empty".to_string()));
        }
        let mut seen = [false;256];
        for sym in &symbols {
            if seen[*sym as usize] {
                return Err(Error::BadParameters(format!("alphabet repeats symbol {}",sym)));
            }
            seen[*sym as usize] = true;
        }
        Ok(Self::build(symbols))
    }
    pub fn len(&self) -> usize {
        self.symbols.len()
    }
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
    /// code of a single symbol, `None` if the symbol is outside the alphabet
    pub fn code_of(&self,sym: u8) -> Option<u32> {
        self.codes[sym as usize].map(u32::from)
    }
    pub fn contains(&self,sym: u8) -> bool {
        self.codes[sym as usize].is_some()
    }
    /// symbol at a single-symbol code
    pub fn symbol(&self,code: u32) -> Option<u8> {
        self.symbols.get(code as usize).copied()
    }
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }
}

// *************** TESTS *****************

#[test]
fn builtin_sizes() {
    assert_eq!(Alphabet::ascii().len(),128);
    assert_eq!(Alphabet::extended_ascii().len(),256);
    assert_eq!(Alphabet::ab().len(),2);
}

#[test]
fn symbol_codes_follow_declared_order() {
    let ab = Alphabet::ab();
    assert_eq!(ab.code_of(b'a'),Some(0));
    assert_eq!(ab.code_of(b'b'),Some(1));
    assert_eq!(ab.code_of(b'c'),None);
    assert_eq!(ab.symbol(0),Some(b'a'));
    assert_eq!(ab.symbol(1),Some(b'b'));
    assert_eq!(ab.symbol(2),None);
}

#[test]
fn rejects_repeated_symbols() {
    assert!(Alphabet::from_symbols(vec![1,2,1]).is_err());
    assert!(Alphabet::from_symbols(vec![]).is_err());
}
