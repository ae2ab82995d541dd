// Bench65 - 6502 Firmware Simulation Platform
// Copyright (C) 2026 The Bench65 Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{anyhow, Context, Result};
use bench65_core::memory::ProgramImage;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// The 6502 address space ends at 0xFFFF; an image may not run past it.
const ADDRESS_SPACE: usize = 0x1_0000;

/// Loads a compiled 6502 program from disk.
///
/// `.prg`/`.c64` images (the cc65 c64 target) carry their load address in the
/// first two bytes, little-endian. Raw images need an explicit
/// `load_address`; an explicit address also overrides a `.prg` header.
pub fn load_image(path: &Path, load_address: Option<u16>) -> Result<ProgramImage> {
    let buffer =
        fs::read(path).with_context(|| format!("Failed to read image file: {:?}", path))?;

    let has_header = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("prg") | Some("c64")
    );

    let (start_addr, payload) = if has_header {
        if buffer.len() < 2 {
            return Err(anyhow!("Image {:?} is too short for a load-address header", path));
        }
        let header_addr = u16::from_le_bytes([buffer[0], buffer[1]]);
        debug!("Image header load address: {:#06x}", header_addr);
        match load_address {
            Some(explicit) => {
                if explicit != header_addr {
                    tracing::warn!(
                        "Explicit load address {:#06x} overrides image header {:#06x}",
                        explicit,
                        header_addr
                    );
                }
                (explicit, &buffer[2..])
            }
            None => (header_addr, &buffer[2..]),
        }
    } else {
        let addr = load_address
            .ok_or_else(|| anyhow!("Raw image {:?} needs an explicit load address", path))?;
        (addr, &buffer[..])
    };

    if payload.is_empty() {
        return Err(anyhow!("Image {:?} has no program bytes", path));
    }

    if start_addr as usize + payload.len() > ADDRESS_SPACE {
        return Err(anyhow!(
            "Image of {} bytes at {:#06x} runs past the end of the address space",
            payload.len(),
            start_addr
        ));
    }

    info!(
        "Loaded {} bytes at {:#06x} from {:?}",
        payload.len(),
        start_addr,
        path
    );

    let mut program_image = ProgramImage::new(start_addr);
    program_image.add_segment(start_addr, payload.to_vec());
    Ok(program_image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn write_temp_image(name: &str, contents: &[u8]) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push("bench65-loader-tests");
        let _ = std::fs::create_dir_all(&dir);

        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = dir.join(format!("{}-{}", nonce, name));
        std::fs::write(&path, contents).expect("Failed to write temp image");
        path
    }

    #[test]
    fn test_prg_header_sets_load_address() {
        let path = write_temp_image("test.prg", &[0x00, 0x80, 0xA9, 0x01]);
        let image = load_image(&path, None).unwrap();
        assert_eq!(image.entry_point, 0x8000);
        assert_eq!(image.segments.len(), 1);
        assert_eq!(image.segments[0].start_addr, 0x8000);
        assert_eq!(image.segments[0].data, vec![0xA9, 0x01]);
    }

    #[test]
    fn test_raw_image_requires_address() {
        let path = write_temp_image("test.bin", &[0xEA]);
        assert!(load_image(&path, None).is_err());

        let image = load_image(&path, Some(0x0200)).unwrap();
        assert_eq!(image.entry_point, 0x0200);
        assert_eq!(image.segments[0].data, vec![0xEA]);
    }

    #[test]
    fn test_explicit_address_overrides_header() {
        let path = write_temp_image("test.c64", &[0x00, 0x80, 0xEA]);
        let image = load_image(&path, Some(0x4000)).unwrap();
        assert_eq!(image.entry_point, 0x4000);
        assert_eq!(image.segments[0].start_addr, 0x4000);
    }

    #[test]
    fn test_image_past_end_of_memory_is_rejected() {
        let path = write_temp_image("test.bin", &[0xEA, 0xEA, 0xEA, 0xEA]);
        let err = load_image(&path, Some(0xFFFE)).unwrap_err();
        assert!(err.to_string().contains("address space"));
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let path = write_temp_image("empty.prg", &[0x00, 0x02]);
        assert!(load_image(&path, None).is_err());
    }
}
