use mmqf::Queue;
use mmqf_core::Error;
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::TempDir;

/// S4: flip a bit in the capacity field after creation; the CRC must
/// catch it on reopen.
#[test]
fn test_checksum_mismatch_on_flipped_byte() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("s4.mmqf");
    Queue::create(&path, 1, 4, 4, false).unwrap();

    {
        let mut file = std::fs::OpenOptions::new().read(true).write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(29)).unwrap();
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte).unwrap();
        file.seek(SeekFrom::Start(29)).unwrap();
        file.write_all(&[byte[0] ^ 0xFF]).unwrap();
    }

    let result = Queue::open(&path);
    assert!(matches!(result, Err(Error::ChecksumMismatch)));
}

/// S5: a handcrafted header with an out-of-range version (but otherwise
/// internally consistent) must be rejected as unsupported, not silently
/// accepted or mistaken for a checksum failure.
#[test]
fn test_unsupported_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("s5.mmqf");
    Queue::create(&path, 1, 4, 4, false).unwrap();
    drop(Queue::open(&path).unwrap());

    {
        let mut file = std::fs::OpenOptions::new().read(true).write(true).open(&path).unwrap();
        let mut header = [0u8; 39];
        file.read_exact(&mut header).unwrap();

        // `version` sits outside the CRC window (bytes 13..=38), so
        // flipping it alone is enough to trip `VersionUnsupported` without
        // disturbing the checksum.
        header[8] = 0xFF;

        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(&header).unwrap();
    }

    let result = Queue::open(&path);
    assert!(matches!(result, Err(Error::VersionUnsupported { found: 0xFF, .. })));
}

#[test]
fn test_truncated_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("truncated.mmqf");
    Queue::create(&path, 1, 4, 4, false).unwrap();

    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(39).unwrap();
    drop(file);

    let result = Queue::open(&path);
    assert!(matches!(result, Err(Error::FileTruncated { .. })));
}
