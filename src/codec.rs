//! Compression and expansion drivers
//!
//! One pair of streaming entry points serves all six policy variants; the
//! policy decides what happens at the code limit and whether resync packets
//! appear in the stream.  The artifact is self-describing up to the policy:
//! a header (widths and alphabet), a body of codes at the current width, and
//! an end-of-stream marker.  Under the signalled policies the body also
//! carries resync packets; under the reset policy it carries reset codes.

use std::io::{BufReader,BufWriter,Cursor,ErrorKind,Read,Write};
use crate::engine::{extend,DecoderDict,EncoderDict,InsertOutcome,Resync};
use crate::header::Header;
use crate::tools::bits::{BitReader,BitWriter};
use crate::tools::window::RecentWindow;
use crate::{Error,Options,Phrase,Policy};

/// Main compression function.
/// `expanded_in` is an object with the `Read` trait, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `compressed_out` is an object with the `Write` trait, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.
pub fn compress<R,W>(expanded_in: &mut R,compressed_out: &mut W,opt: &Options) -> Result<(u64,u64),Error>
where R: Read, W: Write {
    opt.validate()?;
    let mut reader = BufReader::new(expanded_in);
    let mut writer = BitWriter::new(BufWriter::new(compressed_out));
    Header {
        min_bits: opt.min_bits,
        max_bits: opt.max_bits,
        alphabet: opt.alphabet.clone()
    }.write(&mut writer)?;
    let mut dict = EncoderDict::new(opt);
    let mut window = RecentWindow::new();

    let mut sym_in: [u8;1] = [0];
    match reader.read_exact(&mut sym_in) {
        Ok(()) => {},
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            writer.write(dict.eof_code(),dict.code_bits())?;
            let out_size = writer.close()?;
            return Ok((0,out_size));
        },
        Err(e) => return Err(Error::Io(e))
    }
    if !opt.alphabet.contains(sym_in[0]) {
        return Err(Error::OutOfAlphabet {
            position: 0,
            value: sym_in[0]
        });
    }
    let mut current: Vec<u8> = vec![sym_in[0]];
    let mut pos: u64 = 1;

    log::debug!("entering compression loop");
    loop {
        match reader.read_exact(&mut sym_in) {
            Ok(()) => {
                let sym = sym_in[0];
                if !opt.alphabet.contains(sym) {
                    return Err(Error::OutOfAlphabet {
                        position: pos,
                        value: sym
                    });
                }
                pos += 1;
                current.push(sym);
                if dict.contains(&current) {
                    // keep extending the match
                    continue;
                }
                current.pop();
                emit_phrase(&mut writer,&mut dict,&mut window,&current,opt.policy)?;
                current.push(sym);
                if let InsertOutcome::NeedsReset = dict.insert(&current)? {
                    log::debug!("dictionary full, emitting reset code");
                    writer.write(dict.reset_code(),dict.code_bits())?;
                    dict.reset();
                }
                current.clear();
                current.push(sym);
            },
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(Error::Io(e))
        }
    }
    emit_phrase(&mut writer,&mut dict,&mut window,&current,opt.policy)?;
    dict.final_width_bump();
    writer.write(dict.eof_code(),dict.code_bits())?;
    let out_size = writer.close()?;
    Ok((pos,out_size))
}

/// Write the code for a completed match, preceded by its resync packet when
/// the slot was repurposed since the expander last saw it.
fn emit_phrase<W: Write>(writer: &mut BitWriter<W>,dict: &mut EncoderDict,window: &mut RecentWindow,phrase: &[u8],policy: Policy) -> Result<(),Error> {
    let code = match dict.code_of(phrase) {
        Some(code) => code,
        None => return Err(Error::InternalInvariant("matched phrase has no code"))
    };
    if policy.signalled() {
        if let Some(resync) = dict.take_pending(code) {
            write_resync(writer,dict.code_bits(),dict.evict_signal(),code,&resync,window,policy)?;
        }
    }
    log::trace!("code: {}",code);
    writer.write(code,dict.code_bits())?;
    if policy.windowed() {
        window.push(Phrase::from(phrase));
    }
    dict.touch_emitted(phrase);
    Ok(())
}

fn write_resync<W: Write>(writer: &mut BitWriter<W>,code_bits: u8,signal: u32,victim: u32,resync: &Resync,window: &RecentWindow,policy: Policy) -> Result<(),Error> {
    log::debug!("resync for code {} before reuse",victim);
    writer.write(signal,code_bits)?;
    writer.write(victim,code_bits)?;
    if policy.windowed() {
        if let Some(offset) = window.find_recent(&resync.prefix) {
            let suffix = &resync.phrase[resync.prefix.len()..];
            if suffix.len() != 1 {
                return Err(Error::InternalInvariant("resync suffix is not a single symbol"));
            }
            writer.write(offset as u32,8)?;
            writer.write(suffix[0] as u32,8)?;
            return Ok(());
        }
        // prefix aged out of the window, fall back to the literal form
        log::debug!("prefix of code {} aged out, sending literal payload",victim);
        writer.write(0,8)?;
    }
    write_literal(writer,&resync.phrase)
}

fn write_literal<W: Write>(writer: &mut BitWriter<W>,phrase: &Phrase) -> Result<(),Error> {
    if phrase.len() > u16::MAX as usize {
        return Err(Error::InternalInvariant("resync phrase exceeds the 16-bit length field"));
    }
    writer.write(phrase.len() as u32,16)?;
    for sym in phrase.iter() {
        writer.write(*sym as u32,8)?;
    }
    Ok(())
}

/// Main expansion function.
/// `compressed_in` is an object with the `Read` trait, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `expanded_out` is an object with the `Write` trait, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// `policy` must be the policy the artifact was compressed with.
/// Returns (in_size,out_size) or error.
pub fn expand<R,W>(compressed_in: &mut R,expanded_out: &mut W,policy: Policy) -> Result<(u64,u64),Error>
where R: Read, W: Write {
    let mut reader = BitReader::new(BufReader::new(compressed_in));
    let header = Header::read(&mut reader,policy)?;
    let mut dict = DecoderDict::new(&header,policy);
    let mut writer = BufWriter::new(expanded_out);
    let mut window = RecentWindow::new();
    let mut prev: Option<Phrase> = None;
    let mut suppress_insert = false;
    let mut out_size: u64 = 0;

    log::debug!("entering expansion loop");
    loop {
        if prev.is_some() {
            // pairs with the compressor's check before each insertion; the
            // stream-initial code (and the one after a reset) precedes any
            // insertion and is read at the starting width
            dict.maybe_grow();
        }
        let code = match reader.read(dict.code_bits())? {
            Some(code) => code,
            None => return Err(Error::TruncatedArtifact("unexpected end of file (no EOF marker)"))
        };
        if code == dict.eof_code() {
            break;
        }
        if policy.reserves_reset() && code == dict.reset_code() {
            log::debug!("reset code, rebuilding dictionary");
            dict.reset();
            prev = None;
            continue;
        }
        if policy.signalled() && code == dict.evict_signal() {
            read_resync(&mut reader,&mut dict,&window,policy)?;
            suppress_insert = true;
            continue;
        }
        let current = match &prev {
            Some(p) if dict.pending_slot() == Some(code) => extend(p,p[0]),
            _ => match dict.get(code) {
                Some(phrase) => phrase,
                None => return Err(Error::InvalidCode(code))
            }
        };
        log::trace!("code {} expands to {} symbols",code,current.len());
        writer.write_all(&current[..])?;
        out_size += current.len() as u64;
        if policy.windowed() {
            window.push(current.clone());
        }
        if let Some(p) = &prev {
            if !suppress_insert {
                dict.insert(extend(p,current[0]));
            }
            dict.touch_code(code);
        }
        suppress_insert = false;
        prev = Some(current);
    }
    writer.flush()?;
    Ok((reader.bytes_consumed(),out_size))
}

fn read_resync<R: Read>(reader: &mut BitReader<R>,dict: &mut DecoderDict,window: &RecentWindow,policy: Policy) -> Result<(),Error> {
    let victim = match reader.read(dict.code_bits())? {
        Some(code) => code,
        None => return Err(Error::TruncatedArtifact("resync packet is missing its victim code"))
    };
    let phrase = match policy.windowed() {
        false => read_literal(reader)?,
        true => {
            let offset = match reader.read(8)? {
                Some(value) => value as u8,
                None => return Err(Error::TruncatedArtifact("resync packet is missing its offset"))
            };
            match offset {
                0 => read_literal(reader)?,
                _ => {
                    let suffix = match reader.read(8)? {
                        Some(value) => value as u8,
                        None => return Err(Error::TruncatedArtifact("resync packet is missing its suffix"))
                    };
                    match window.get(offset) {
                        Some(prefix) => extend(prefix,suffix),
                        None => return Err(Error::InvalidSignal(format!("offset {} exceeds the window of {}",offset,window.len())))
                    }
                }
            }
        }
    };
    log::debug!("resync installs {} symbols at code {}",phrase.len(),victim);
    dict.apply_signal(victim,phrase)
}

fn read_literal<R: Read>(reader: &mut BitReader<R>) -> Result<Phrase,Error> {
    let length = match reader.read(16)? {
        Some(value) => value as usize,
        None => return Err(Error::TruncatedArtifact("resync packet is missing its length"))
    };
    if length < 2 {
        return Err(Error::InvalidSignal(format!("literal phrase of length {} is impossible",length)));
    }
    let mut symbols = Vec::with_capacity(length);
    for _ in 0..length {
        match reader.read(8)? {
            Some(value) => symbols.push(value as u8),
            None => return Err(Error::TruncatedArtifact("resync phrase is cut short"))
        }
    }
    Ok(Phrase::from(symbols))
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>,Error> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}

/// Convenience function, calls `expand` with a slice returning a Vec
pub fn expand_slice(slice: &[u8],policy: Policy) -> Result<Vec<u8>,Error> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    expand(&mut src,&mut ans,policy)?;
    Ok(ans.into_inner())
}

// *************** TESTS *****************

#[cfg(test)]
use crate::alphabet::Alphabet;

#[cfg(test)]
const POLICIES: [Policy;6] = [Policy::Freeze,Policy::Reset,Policy::Lfu,Policy::Lru,Policy::LruOpt1,Policy::LruOpt2];

#[cfg(test)]
fn roundtrip(policy: Policy,alphabet: Alphabet,min_bits: u8,max_bits: u8,data: &[u8]) {
    let opt = Options::with_widths(policy,alphabet,min_bits,max_bits);
    let compressed = compress_slice(data,&opt).expect("compression failed");
    let expanded = expand_slice(&compressed,policy).expect("expansion failed");
    assert_eq!(data.to_vec(),expanded,"mismatch under {:?}",policy);
}

#[cfg(test)]
fn lcg_bytes(count: usize,seed: u32) -> Vec<u8> {
    let mut state = seed;
    let mut ans = Vec::with_capacity(count);
    for _ in 0..count {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        ans.push((state >> 24) as u8);
    }
    ans
}

#[test]
fn compression_works() {
    // freeze over {a,b} at a fixed 3-bit width; codes are 0,1,3,3 then EOF
    let opt = Options::with_widths(Policy::Freeze,Alphabet::ab(),3,3);
    let compressed = compress_slice(b"ababab",&opt).expect("compression failed");
    assert_eq!(compressed,hex::decode("03030002616205b4").unwrap());
    // 16 bits of body against 48 bits of input
    assert!(8 * (compressed.len() - 6) < 8 * 6);
}

#[test]
fn expansion_works() {
    let artifact = hex::decode("03030002616205b4").unwrap();
    assert_eq!(expand_slice(&artifact,Policy::Freeze).unwrap(),b"ababab");
}

#[test]
fn empty_input_is_a_bare_marker() {
    let opt = Options::with_widths(Policy::Freeze,Alphabet::ab(),3,16);
    let compressed = compress_slice(b"",&opt).unwrap();
    assert_eq!(compressed,hex::decode("03100002616240").unwrap());
    assert_eq!(expand_slice(&compressed,Policy::Freeze).unwrap(),Vec::<u8>::new());
}

#[test]
fn invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    for policy in POLICIES {
        roundtrip(policy,Alphabet::ascii(),9,16,test_data);
    }
}

#[test]
fn invertibility_under_heavy_eviction() {
    let data: Vec<u8> = b"ab".iter().cycle().take(1000).copied().collect();
    for policy in POLICIES {
        roundtrip(policy,Alphabet::ab(),3,3,&data);
    }
}

#[test]
fn boundary_inputs_roundtrip() {
    let ascii_all: Vec<u8> = (0..128).collect();
    for policy in POLICIES {
        roundtrip(policy,Alphabet::ascii(),9,16,b"");
        roundtrip(policy,Alphabet::ascii(),9,16,b"x");
        roundtrip(policy,Alphabet::ascii(),9,16,&ascii_all);
    }
}

#[test]
fn fill_boundaries_roundtrip() {
    // lengths chosen so the tiny dictionary is exactly full, one past full,
    // and many times past full
    for n in [1,2,3,4,5,6,7,8,9,10,11,12,16,24,48,96] {
        let data: Vec<u8> = b"ab".iter().cycle().take(n).copied().collect();
        for policy in POLICIES {
            roundtrip(policy,Alphabet::ab(),3,3,&data);
        }
    }
}

#[test]
fn width_growth_roundtrips_at_every_boundary() {
    let data: Vec<u8> = lcg_bytes(40_000,0x2F6E2B1).iter().map(|b| b & 0x7F).collect();
    for policy in POLICIES {
        roundtrip(policy,Alphabet::ascii(),9,12,&data);
    }
}

#[test]
fn changing_patterns_roundtrip() {
    let mut data = Vec::new();
    for _ in 0..500 {
        data.extend_from_slice(b"ab");
    }
    for _ in 0..500 {
        data.extend_from_slice(b"aaab");
    }
    for _ in 0..500 {
        data.extend_from_slice(b"bbba");
    }
    for policy in POLICIES {
        roundtrip(policy,Alphabet::ab(),3,4,&data);
    }
}

#[cfg(test)]
fn fibonacci_string(limit: usize) -> Vec<u8> {
    let mut a: Vec<u8> = b"a".to_vec();
    let mut b: Vec<u8> = b"ab".to_vec();
    while b.len() < limit {
        let next = [b.as_slice(),a.as_slice()].concat();
        a = b;
        b = next;
    }
    b.truncate(limit);
    b
}

#[test]
fn pathological_patterns_roundtrip() {
    let cases: Vec<Vec<u8>> = vec![
        vec![b'a';10_000],
        b"ab".iter().cycle().take(10_000).copied().collect(),
        b"aaabbb".iter().cycle().take(9_000).copied().collect(),
        fibonacci_string(1000)
    ];
    for data in &cases {
        for policy in POLICIES {
            roundtrip(policy,Alphabet::ab(),3,3,data);
            roundtrip(policy,Alphabet::ab(),3,9,data);
        }
    }
}

#[test]
fn binary_extremes_roundtrip() {
    let mut sequential = Vec::new();
    for _ in 0..10 {
        sequential.extend(0u8..=255);
    }
    let cases: Vec<Vec<u8>> = vec![
        vec![0u8;1000],
        vec![0xFF;1000],
        [0u8,0xFF].iter().cycle().take(1000).copied().collect(),
        sequential
    ];
    for data in &cases {
        for policy in POLICIES {
            roundtrip(policy,Alphabet::extended_ascii(),9,9,data);
        }
    }
    // cycling through the whole alphabet keeps every tracked entry young
    let cycling: Vec<u8> = (0..10_000).map(|i| (i % 128) as u8).collect();
    for policy in POLICIES {
        roundtrip(policy,Alphabet::ascii(),9,9,&cycling);
    }
}

#[test]
fn lru_evicts_continuously_and_stays_in_sync() {
    let data: Vec<u8> = b"ab".iter().cycle().take(1000).copied().collect();
    roundtrip(Policy::Lru,Alphabet::ab(),3,3,&data);
}

#[test]
fn lfu_roundtrips_under_eviction_pressure() {
    let data: Vec<u8> = b"ab".iter().cycle().take(1000).copied().collect();
    roundtrip(Policy::Lfu,Alphabet::ab(),3,3,&data);
}

#[test]
fn signalled_binary_roundtrip() {
    let data = lcg_bytes(8192,0xDECAF);
    roundtrip(Policy::LruOpt1,Alphabet::extended_ascii(),9,9,&data);
    roundtrip(Policy::LruOpt2,Alphabet::extended_ascii(),9,9,&data);
}

#[test]
fn windowed_signal_survives_window_aging() {
    // a monotone run, then enough distinct tags to age the run's phrases out
    // of the 255-entry window, then the run again; evictions fire with stale
    // window state throughout the tail
    let mut data = vec![b'a';10_000];
    for i in 0..300u32 {
        data.push(b'<');
        data.push((i % 256) as u8);
        data.push((i / 256) as u8 + 1);
        data.push(b'>');
    }
    data.extend(vec![b'a';10_000]);
    roundtrip(Policy::LruOpt2,Alphabet::extended_ascii(),9,9,&data);
}

#[test]
fn out_of_alphabet_bytes_are_rejected() {
    let opt = Options::new(Policy::Freeze,Alphabet::ascii());
    match compress_slice(&[b'h',b'i',0xFF],&opt) {
        Err(Error::OutOfAlphabet { position, value }) => {
            assert_eq!(position,2);
            assert_eq!(value,0xFF);
        },
        other => panic!("expected rejection, got {:?}",other.map(|v| v.len()))
    }
    match compress_slice(&[0xFF],&opt) {
        Err(Error::OutOfAlphabet { position, value }) => {
            assert_eq!(position,0);
            assert_eq!(value,0xFF);
        },
        other => panic!("expected rejection, got {:?}",other.map(|v| v.len()))
    }
}

#[test]
fn bad_parameters_are_rejected() {
    let cases = [
        Options::with_widths(Policy::Freeze,Alphabet::ab(),5,4),
        Options::with_widths(Policy::Freeze,Alphabet::ab(),1,16),
        Options::with_widths(Policy::Freeze,Alphabet::ab(),3,17),
        Options::with_widths(Policy::Freeze,Alphabet::extended_ascii(),8,16),
        Options::with_widths(Policy::LruOpt1,Alphabet::ab(),2,16)
    ];
    for opt in cases {
        assert!(matches!(compress_slice(b"",&opt),Err(Error::BadParameters(_))));
    }
    // the same floor admits an unsignalled policy
    assert!(compress_slice(b"",&Options::with_widths(Policy::Freeze,Alphabet::ab(),2,16)).is_ok());
}

#[test]
fn truncation_is_always_detected() {
    let opt = Options::with_widths(Policy::Freeze,Alphabet::ab(),3,3);
    let artifact = compress_slice(b"abababab",&opt).unwrap();
    for len in 0..artifact.len() {
        match expand_slice(&artifact[0..len],Policy::Freeze) {
            Err(Error::TruncatedArtifact(_)) => {},
            other => panic!("prefix of {} bytes: expected a truncation error, got {:?}",len,other.map(|v| v.len()))
        }
    }
}

#[test]
fn truncation_inside_a_resync_packet_is_detected() {
    // the first resync packet of this stream begins 15 bits into the body
    let opt = Options::with_widths(Policy::LruOpt2,Alphabet::ab(),3,3);
    let data: Vec<u8> = b"ab".iter().cycle().take(20).copied().collect();
    let artifact = compress_slice(&data,&opt).unwrap();
    for len in [8,9,10] {
        match expand_slice(&artifact[0..len],Policy::LruOpt2) {
            Err(Error::TruncatedArtifact(_)) => {},
            other => panic!("prefix of {} bytes: expected a truncation error, got {:?}",len,other.map(|v| v.len()))
        }
    }
}

#[test]
fn unknown_codes_are_rejected() {
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    Header {
        min_bits: 3,
        max_bits: 3,
        alphabet: Alphabet::ab()
    }.write(&mut writer).unwrap();
    writer.write(6,3).unwrap();
    writer.write(2,3).unwrap();
    writer.close().unwrap();
    assert!(matches!(expand_slice(&buf,Policy::Freeze),Err(Error::InvalidCode(6))));
}

#[test]
fn initial_special_case_code_is_rejected() {
    // the next-free-code case needs a predecessor, so it cannot open a stream
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    Header {
        min_bits: 3,
        max_bits: 3,
        alphabet: Alphabet::ab()
    }.write(&mut writer).unwrap();
    writer.write(3,3).unwrap();
    writer.write(2,3).unwrap();
    writer.close().unwrap();
    assert!(matches!(expand_slice(&buf,Policy::Freeze),Err(Error::InvalidCode(3))));
}

#[test]
fn literal_resync_payloads_are_applied() {
    // offset 0 marks the fallback form: a 16-bit length and the phrase verbatim
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    Header {
        min_bits: 3,
        max_bits: 3,
        alphabet: Alphabet::ab()
    }.write(&mut writer).unwrap();
    writer.write(0,3).unwrap();   // 'a'
    writer.write(1,3).unwrap();   // 'b', defines slot 3 as "ab"
    writer.write(7,3).unwrap();   // signal
    writer.write(3,3).unwrap();   // victim slot
    writer.write(0,8).unwrap();   // no window reference
    writer.write(2,16).unwrap();
    writer.write(b'b' as u32,8).unwrap();
    writer.write(b'b' as u32,8).unwrap();
    writer.write(3,3).unwrap();   // the repurposed slot
    writer.write(2,3).unwrap();   // EOF
    writer.close().unwrap();
    assert_eq!(expand_slice(&buf,Policy::LruOpt2).unwrap(),b"abbb");
}

#[test]
fn undefined_resync_victims_are_rejected() {
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    Header {
        min_bits: 3,
        max_bits: 3,
        alphabet: Alphabet::ab()
    }.write(&mut writer).unwrap();
    writer.write(0,3).unwrap();   // 'a'
    writer.write(7,3).unwrap();   // signal
    writer.write(3,3).unwrap();   // victim slot, never defined
    writer.write(1,8).unwrap();   // offset 1, the 'a' just decoded
    writer.write(b'b' as u32,8).unwrap();
    writer.close().unwrap();
    assert!(matches!(expand_slice(&buf,Policy::LruOpt2),Err(Error::InvalidSignal(_))));
}

#[test]
fn oversized_resync_offsets_are_rejected() {
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    Header {
        min_bits: 3,
        max_bits: 3,
        alphabet: Alphabet::ab()
    }.write(&mut writer).unwrap();
    writer.write(0,3).unwrap();
    writer.write(7,3).unwrap();
    writer.write(3,3).unwrap();
    writer.write(9,8).unwrap();   // only one phrase has been decoded
    writer.write(b'b' as u32,8).unwrap();
    writer.close().unwrap();
    assert!(matches!(expand_slice(&buf,Policy::LruOpt2),Err(Error::InvalidSignal(_))));
}
