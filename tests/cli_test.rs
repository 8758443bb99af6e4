use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const POLICIES: [&str;6] = ["freeze","reset","lfu","lru","lru-opt1","lru-opt2"];

fn write_input(dir: &tempfile::TempDir,data: &[u8]) -> Result<PathBuf,Box<dyn std::error::Error>> {
    let path = dir.path().join("original.dat");
    std::fs::write(&path,data)?;
    Ok(path)
}

fn roundtrip_test(policy: &str,alphabet: &str,min_bits: &str,max_bits: &str,data: &[u8]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,data)?;
    let cmp_path = temp_dir.path().join("compressed.lzw");
    let out_path = temp_dir.path().join("expanded.dat");
    let mut cmd = Command::cargo_bin("bounded-lzw")?;
    cmd.arg(policy).arg("compress")
        .arg(&in_path)
        .arg(&cmp_path)
        .arg("--alphabet").arg(alphabet)
        .arg("--min-bits").arg(min_bits)
        .arg("--max-bits").arg(max_bits)
        .assert()
        .success();
    let mut cmd = Command::cargo_bin("bounded-lzw")?;
    cmd.arg(policy).arg("decompress")
        .arg(&cmp_path)
        .arg(&out_path)
        .assert()
        .success();
    match (std::fs::read(&in_path),std::fs::read(&out_path)) {
        (Ok(v1),Ok(v2)) => {
            assert_eq!(v1,v2);
        },
        _ => panic!("unable to compare output with original")
    }
    Ok(())
}

#[test]
fn text_roundtrips() -> STDRESULT {
    let text = "Now is the winter of our discontent made glorious summer by this sun of York.\n".repeat(40);
    for policy in POLICIES {
        roundtrip_test(policy,"ascii","9","16",text.as_bytes())?;
    }
    Ok(())
}

#[test]
fn tiny_dictionary_roundtrips() -> STDRESULT {
    let data: Vec<u8> = b"ab".iter().cycle().take(2000).copied().collect();
    for policy in POLICIES {
        roundtrip_test(policy,"ab","3","3",&data)?;
    }
    Ok(())
}

#[test]
fn binary_roundtrips() -> STDRESULT {
    let mut state: u32 = 0xB0075;
    let mut data = Vec::with_capacity(6000);
    for _ in 0..6000 {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        data.push((state >> 24) as u8);
    }
    for policy in POLICIES {
        roundtrip_test(policy,"extendedascii","9","10",&data)?;
    }
    Ok(())
}

#[test]
fn empty_file_roundtrips() -> STDRESULT {
    for policy in POLICIES {
        roundtrip_test(policy,"ascii","9","16",b"")?;
    }
    Ok(())
}

#[test]
fn foreign_bytes_fail_compression() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,&[b'h',b'i',0xFF])?;
    let cmp_path = temp_dir.path().join("compressed.lzw");
    let mut cmd = Command::cargo_bin("bounded-lzw")?;
    cmd.arg("freeze").arg("compress")
        .arg(&in_path)
        .arg(&cmp_path)
        .arg("--alphabet").arg("ascii")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not in alphabet"));
    Ok(())
}

#[test]
fn unknown_alphabet_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,b"hi")?;
    let cmp_path = temp_dir.path().join("compressed.lzw");
    let mut cmd = Command::cargo_bin("bounded-lzw")?;
    cmd.arg("freeze").arg("compress")
        .arg(&in_path)
        .arg(&cmp_path)
        .arg("--alphabet").arg("base64")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not recognized"));
    Ok(())
}

#[test]
fn truncated_artifact_fails_decompression() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,b"abababababab")?;
    let cmp_path = temp_dir.path().join("compressed.lzw");
    let out_path = temp_dir.path().join("expanded.dat");
    let mut cmd = Command::cargo_bin("bounded-lzw")?;
    cmd.arg("freeze").arg("compress")
        .arg(&in_path)
        .arg(&cmp_path)
        .arg("--alphabet").arg("ab")
        .arg("--min-bits").arg("3")
        .arg("--max-bits").arg("3")
        .assert()
        .success();
    let artifact = std::fs::read(&cmp_path)?;
    std::fs::write(&cmp_path,&artifact[0..artifact.len() - 1])?;
    let mut cmd = Command::cargo_bin("bounded-lzw")?;
    cmd.arg("freeze").arg("decompress")
        .arg(&cmp_path)
        .arg(&out_path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("truncated artifact"));
    Ok(())
}

#[test]
fn bad_widths_fail_compression() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,b"hello")?;
    let cmp_path = temp_dir.path().join("compressed.lzw");
    let mut cmd = Command::cargo_bin("bounded-lzw")?;
    cmd.arg("freeze").arg("compress")
        .arg(&in_path)
        .arg(&cmp_path)
        .arg("--alphabet").arg("ascii")
        .arg("--min-bits").arg("12")
        .arg("--max-bits").arg("9")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("bad parameters"));
    Ok(())
}
