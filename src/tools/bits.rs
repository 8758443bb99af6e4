//! Variable-width bit packing
//!
//! Codes are packed most-significant-bit first, both within a field and
//! within each byte of the stream.  The writer keeps a `u64` accumulator and
//! drains whole bytes from its high end; the reader fills the accumulator
//! from the stream and serves fields from its high end.  Neither side seeks.

use std::io::{ErrorKind,Read,Write};

pub struct BitWriter<W: Write> {
    out: W,
    buf: u64,
    held: u8,
    written: u64
}

impl<W: Write> BitWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            buf: 0,
            held: 0,
            written: 0
        }
    }
    /// Write the low `num_bits` of `value`.  A value wider than `num_bits`
    /// is a programmer error.
    pub fn write(&mut self,value: u32,num_bits: u8) -> std::io::Result<()> {
        debug_assert!(num_bits >= 1 && num_bits <= 32);
        debug_assert!(num_bits == 32 || u64::from(value) < 1u64 << num_bits);
        self.buf = (self.buf << num_bits) | u64::from(value);
        self.held += num_bits;
        while self.held >= 8 {
            self.held -= 8;
            let byte = (self.buf >> self.held) as u8;
            self.out.write_all(&[byte])?;
            self.buf &= (1u64 << self.held) - 1;
            self.written += 1;
        }
        Ok(())
    }
    /// Pad the partial byte with zero bits on the right, write it, and flush.
    /// Returns the total byte count.
    pub fn close(&mut self) -> std::io::Result<u64> {
        if self.held > 0 {
            let byte = (self.buf << (8 - self.held)) as u8;
            self.out.write_all(&[byte])?;
            self.buf = 0;
            self.held = 0;
            self.written += 1;
        }
        self.out.flush()?;
        Ok(self.written)
    }
    pub fn bytes_written(&self) -> u64 {
        self.written
    }
}

pub struct BitReader<R: Read> {
    src: R,
    buf: u64,
    held: u8,
    consumed: u64
}

impl<R: Read> BitReader<R> {
    pub fn new(src: R) -> Self {
        Self {
            src,
            buf: 0,
            held: 0,
            consumed: 0
        }
    }
    /// Next `num_bits` of the stream, or `None` when fewer remain.
    pub fn read(&mut self,num_bits: u8) -> std::io::Result<Option<u32>> {
        debug_assert!(num_bits >= 1 && num_bits <= 32);
        while self.held < num_bits {
            let mut byte: [u8;1] = [0];
            match self.src.read_exact(&mut byte) {
                Ok(()) => {
                    self.buf = (self.buf << 8) | u64::from(byte[0]);
                    self.held += 8;
                    self.consumed += 1;
                },
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(e)
            }
        }
        self.held -= num_bits;
        let value = (self.buf >> self.held) as u32;
        self.buf &= (1u64 << self.held) - 1;
        Ok(Some(value))
    }
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }
}

// *************** TESTS *****************

#[test]
fn msb_first_packing() {
    let mut out: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut out);
    writer.write(0b101,3).unwrap();
    writer.write(0b0,1).unwrap();
    writer.write(0xAB,8).unwrap();
    writer.close().unwrap();
    assert_eq!(out,vec![0xAA,0xB0]);
}

#[test]
fn whole_bytes_pass_through() {
    let mut out: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut out);
    for byte in [0x00,0x7F,0x80,0xFF] {
        writer.write(byte,8).unwrap();
    }
    let count = writer.close().unwrap();
    assert_eq!(count,4);
    assert_eq!(out,vec![0x00,0x7F,0x80,0xFF]);
}

#[test]
fn roundtrip_mixed_widths() {
    let fields: Vec<(u32,u8)> = vec![(5,3),(0,1),(1023,10),(0x1234,16),(1,2),(0xFFFF_FFFF,32),(99,9)];
    let mut out: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut out);
    for (value,width) in &fields {
        writer.write(*value,*width).unwrap();
    }
    writer.close().unwrap();
    let mut reader = BitReader::new(out.as_slice());
    for (value,width) in &fields {
        assert_eq!(reader.read(*width).unwrap(),Some(*value));
    }
}

#[test]
fn short_stream_reads_none() {
    let mut reader = BitReader::new([0xA5].as_slice());
    assert_eq!(reader.read(9).unwrap(),None);
    let mut reader = BitReader::new([0xA5].as_slice());
    assert_eq!(reader.read(8).unwrap(),Some(0xA5));
    assert_eq!(reader.read(1).unwrap(),None);
}

#[test]
fn close_pads_with_zeros() {
    let mut out: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut out);
    writer.write(0b11,2).unwrap();
    writer.close().unwrap();
    assert_eq!(out,vec![0b1100_0000]);
}
