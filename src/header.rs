//! Artifact header
//!
//! Every artifact opens with the code widths and the serialized alphabet:
//! `min_bits` and `max_bits` at 8 bits each, `alphabet_size` at 16 bits, then
//! the symbols at 8 bits apiece in declared order.  The header carries no
//! policy tag; the policy is implied by the tool that wrote the artifact, and
//! the expander validates the header against the policy it was invoked with.

use std::io::{Read,Write};
use crate::alphabet::Alphabet;
use crate::tools::bits::{BitReader,BitWriter};
use crate::{Error,Policy};

pub struct Header {
    pub min_bits: u8,
    pub max_bits: u8,
    pub alphabet: Alphabet
}

impl Header {
    pub fn write<W: Write>(&self,writer: &mut BitWriter<W>) -> Result<(),Error> {
        writer.write(self.min_bits as u32,8)?;
        writer.write(self.max_bits as u32,8)?;
        writer.write(self.alphabet.len() as u32,16)?;
        for sym in self.alphabet.symbols() {
            writer.write(*sym as u32,8)?;
        }
        Ok(())
    }
    pub fn read<R: Read>(reader: &mut BitReader<R>,policy: Policy) -> Result<Self,Error> {
        let min_bits = match reader.read(8)? {
            Some(v) => v as u8,
            None => return Err(Error::TruncatedArtifact("header is missing the code widths"))
        };
        let max_bits = match reader.read(8)? {
            Some(v) => v as u8,
            None => return Err(Error::TruncatedArtifact("header is missing the code widths"))
        };
        let alphabet_size = match reader.read(16)? {
            Some(v) => v as usize,
            None => return Err(Error::TruncatedArtifact("header is missing the alphabet size"))
        };
        let mut symbols = Vec::with_capacity(alphabet_size);
        for _ in 0..alphabet_size {
            match reader.read(8)? {
                Some(v) => symbols.push(v as u8),
                None => return Err(Error::TruncatedArtifact("header alphabet is cut short"))
            }
        }
        let alphabet = Alphabet::from_symbols(symbols)?;
        crate::validate_params(min_bits,max_bits,alphabet.len(),policy)?;
        Ok(Self {
            min_bits,
            max_bits,
            alphabet
        })
    }
}

// *************** TESTS *****************

#[test]
fn header_roundtrip() {
    let header = Header {
        min_bits: 9,
        max_bits: 12,
        alphabet: Alphabet::ascii()
    };
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    header.write(&mut writer).unwrap();
    writer.close().unwrap();
    assert_eq!(buf.len(),4 + 128);
    let mut reader = BitReader::new(buf.as_slice());
    let parsed = Header::read(&mut reader,Policy::Freeze).unwrap();
    assert_eq!(parsed.min_bits,9);
    assert_eq!(parsed.max_bits,12);
    assert_eq!(parsed.alphabet.symbols(),Alphabet::ascii().symbols());
}

#[test]
fn truncated_header_is_reported() {
    let header = Header {
        min_bits: 9,
        max_bits: 16,
        alphabet: Alphabet::extended_ascii()
    };
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    header.write(&mut writer).unwrap();
    writer.close().unwrap();
    for len in [0,1,3,20] {
        let mut reader = BitReader::new(&buf[0..len]);
        assert!(matches!(Header::read(&mut reader,Policy::Freeze),Err(Error::TruncatedArtifact(_))));
    }
}

#[test]
fn inconsistent_widths_are_reported() {
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    Header {
        min_bits: 12,
        max_bits: 9,
        alphabet: Alphabet::ab()
    }.write(&mut writer).unwrap();
    writer.close().unwrap();
    let mut reader = BitReader::new(buf.as_slice());
    assert!(matches!(Header::read(&mut reader,Policy::Freeze),Err(Error::BadParameters(_))));
}
