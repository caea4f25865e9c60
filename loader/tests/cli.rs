//! Loader behavior driven through the binary: the demand-paging success
//! path against hand-built ELF32 images, plus the failure paths.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn loader_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_loader"))
}

fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("oslab_loader_{tag}_{}.bin", std::process::id()))
}

/// Minimal statically linked ELF32 image: one PT_LOAD segment whose bytes
/// live at `offset` in the file, with `code` chunks placed at offsets
/// relative to the segment start.
fn elf32_image(
    entry: u32,
    vaddr: u32,
    offset: u32,
    filesz: u32,
    memsz: u32,
    code: &[(usize, &[u8])],
) -> Vec<u8> {
    let mut bytes = vec![0u8; 52];
    bytes[..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
    bytes[4] = 1; // ELFCLASS32
    bytes[5] = 1; // little-endian
    bytes[6] = 1; // EV_CURRENT
    bytes[16..18].copy_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    bytes[18..20].copy_from_slice(&3u16.to_le_bytes()); // EM_386
    bytes[24..28].copy_from_slice(&entry.to_le_bytes());
    bytes[28..32].copy_from_slice(&52u32.to_le_bytes()); // e_phoff
    bytes[40..42].copy_from_slice(&52u16.to_le_bytes()); // e_ehsize
    bytes[42..44].copy_from_slice(&32u16.to_le_bytes()); // e_phentsize
    bytes[44..46].copy_from_slice(&1u16.to_le_bytes()); // e_phnum
    for field in [1u32, offset, vaddr, 0, filesz, memsz, 5, 0x1000] {
        bytes.extend_from_slice(&field.to_le_bytes());
    }
    bytes.resize(offset as usize + filesz as usize, 0);
    for (at, chunk) in code {
        let start = offset as usize + at;
        bytes[start..start + chunk.len()].copy_from_slice(chunk);
    }
    bytes
}

fn run_image(tag: &str, image: &[u8]) -> Output {
    let path = temp_path(tag);
    fs::write(&path, image).expect("writing the image failed");
    let out = loader_cmd()
        .arg(&path)
        .output()
        .expect("failed to run loader");
    let _ = fs::remove_file(&path);
    out
}

#[test]
fn single_page_entry_returns_42_with_one_fault() {
    // mov eax, 42; ret
    let code: &[u8] = &[0xb8, 0x2a, 0x00, 0x00, 0x00, 0xc3];
    let image = elf32_image(
        0x0804_8000,
        0x0804_8000,
        0x1000,
        code.len() as u32,
        code.len() as u32,
        &[(0, code)],
    );

    let out = run_image("single_page", &image);
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("User entry return value = 42"), "stdout: {stdout}");
    assert!(stdout.contains("Total Page Faults: 1"), "stdout: {stdout}");
    assert!(stdout.contains("Total Page Allocations: 1"), "stdout: {stdout}");
    // one page holding a 6-byte segment: 4090 bytes of slack
    assert!(
        stdout.contains("Total Internal Fragmentation: 3.99 KB"),
        "stdout: {stdout}"
    );
}

#[test]
fn three_page_segment_faults_once_per_page_and_repeats_identically() {
    // page 0: jmp +0x1000 (land at the start of page 1)
    let jmp: &[u8] = &[0xe9, 0xfb, 0x0f, 0x00, 0x00];
    // page 1: call +0x1000 (the leaf on page 2), then ret
    let call_ret: &[u8] = &[0xe8, 0xfb, 0x0f, 0x00, 0x00, 0xc3];
    // page 2: mov eax, 42; ret
    let leaf: &[u8] = &[0xb8, 0x2a, 0x00, 0x00, 0x00, 0xc3];
    let image = elf32_image(
        0x0804_8000,
        0x0804_8000,
        0x1000,
        0x3000,
        0x3000,
        &[(0, jmp), (0x1000, call_ret), (0x2000, leaf)],
    );

    let first = run_image("three_page_a", &image);
    assert!(
        first.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&first.stderr)
    );
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert!(stdout.contains("User entry return value = 42"), "stdout: {stdout}");
    assert!(stdout.contains("Total Page Faults: 3"), "stdout: {stdout}");
    assert!(stdout.contains("Total Page Allocations: 3"), "stdout: {stdout}");
    // the segment ends exactly on a page boundary
    assert!(
        stdout.contains("Total Internal Fragmentation: 0.00 KB"),
        "stdout: {stdout}"
    );

    // paging the same pages in again produces the same counts
    let second = run_image("three_page_b", &image);
    assert!(second.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn missing_argument_exits_with_code_1() {
    let out = loader_cmd().output().expect("failed to run loader");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Usage"), "no usage line in: {stderr}");
}

#[test]
fn nonexistent_file_exits_with_code_1() {
    let out = loader_cmd()
        .arg("/definitely/not/a/real/elf")
        .output()
        .expect("failed to run loader");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("opening"), "stderr: {stderr}");
}

#[test]
fn non_elf_input_is_rejected() {
    // at least one full header's worth of bytes, so the magic check is
    // what rejects it rather than a short read
    let ballast = b"MZ this is not an ELF image ".repeat(4);
    let out = run_image("not_elf", &ballast);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("not an ELF file"), "stderr: {stderr}");
}

#[test]
fn truncated_header_is_an_error() {
    let out = run_image("trunc", &[0x7f, b'E', b'L', b'F', 1, 1]);
    assert_eq!(out.status.code(), Some(1));
}
