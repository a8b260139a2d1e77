use std::{fs::File, io::Read, path::Path};

use super::{LoadError, MEMORY_SIZE, Machine, PROGRAM_START_ADDRESS};

/// Largest program image that fits between the program start and the end of memory.
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_START_ADDRESS;

impl Machine {
    /// Copies a program image into memory at the program start and resets pc.
    ///
    /// Memory outside the image is left as it was.
    pub fn load_program(&mut self, image: &[u8]) -> Result<(), LoadError> {
        if image.len() > MAX_PROGRAM_SIZE {
            return Err(LoadError::TooLarge {
                size: image.len(),
                max_size: MAX_PROGRAM_SIZE,
            });
        }

        let end = PROGRAM_START_ADDRESS + image.len();
        self.memory[PROGRAM_START_ADDRESS..end].copy_from_slice(image);
        self.pc = PROGRAM_START_ADDRESS as u16;

        log::debug!("Loaded {} byte program image", image.len());
        Ok(())
    }

    /// A fresh machine holding `image`.
    pub fn with_program(image: &[u8]) -> Result<Self, LoadError> {
        let mut machine = Machine::new();
        machine.load_program(image)?;
        Ok(machine)
    }
}

/// Reads a program image from disk, rejecting files that cannot fit in memory.
pub fn read_program(path: &Path) -> Result<Vec<u8>, LoadError> {
    let io_error = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let expected = file.metadata().map_err(io_error)?.len() as usize;
    if expected > MAX_PROGRAM_SIZE {
        return Err(LoadError::TooLarge {
            size: expected,
            max_size: MAX_PROGRAM_SIZE,
        });
    }

    let mut image = Vec::with_capacity(expected);
    file.by_ref()
        .take(MAX_PROGRAM_SIZE as u64 + 1)
        .read_to_end(&mut image)
        .map_err(io_error)?;

    if image.len() < expected {
        return Err(LoadError::Truncated {
            expected,
            actual: image.len(),
        });
    }
    if image.len() > MAX_PROGRAM_SIZE {
        return Err(LoadError::TooLarge {
            size: image.len(),
            max_size: MAX_PROGRAM_SIZE,
        });
    }

    log::info!("Read program image {} ({} bytes)", path.display(), image.len());
    Ok(image)
}

/// Reads `path` and loads it into `machine`.
pub fn load_program_file(machine: &mut Machine, path: &Path) -> Result<(), LoadError> {
    let image = read_program(path)?;
    machine.load_program(&image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::FONT;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("chip8-vm-{}-{name}", std::process::id()))
    }

    #[test]
    fn image_lands_at_program_start() {
        let machine = Machine::with_program(&[0x12, 0x34, 0x56]).unwrap();
        assert_eq!(&machine.memory[0x200..0x203], &[0x12, 0x34, 0x56]);
        assert_eq!(machine.memory[0x203], 0);
        assert_eq!(&machine.memory[..80], &FONT[..]);
        assert_eq!(machine.pc, 0x200);
    }

    #[test]
    fn largest_image_fills_memory() {
        let image = vec![0xAA; MAX_PROGRAM_SIZE];
        let machine = Machine::with_program(&image).unwrap();
        assert_eq!(machine.memory[0xFFF], 0xAA);
    }

    #[test]
    fn oversized_image_is_rejected() {
        let mut machine = Machine::new();
        let image = vec![0; MAX_PROGRAM_SIZE + 1];
        assert!(matches!(
            machine.load_program(&image),
            Err(LoadError::TooLarge {
                size: 3585,
                max_size: 3584
            })
        ));
        assert!(machine.memory[0x200..].iter().all(|&b| b == 0));
    }

    #[test]
    fn reads_image_from_disk() {
        let path = temp_path("ok.ch8");
        std::fs::write(&path, [0x60, 0x05]).unwrap();

        let mut machine = Machine::new();
        load_program_file(&mut machine, &path).unwrap();
        assert_eq!(machine.read_word(0x200), 0x6005);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn oversized_file_is_rejected() {
        let path = temp_path("big.ch8");
        std::fs::write(&path, vec![0; MAX_PROGRAM_SIZE + 10]).unwrap();

        assert!(matches!(
            read_program(&path),
            Err(LoadError::TooLarge { size: 3594, .. })
        ));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_reported() {
        let path = temp_path("does-not-exist.ch8");
        assert!(matches!(read_program(&path), Err(LoadError::Io { .. })));
    }
}
