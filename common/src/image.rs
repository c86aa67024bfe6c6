use std::{fmt, fs, io, path::Path};

use packed_struct::PackingError;

use crate::hexfile::{HexFile, HexFileError};
use crate::{ControlWord, BIOS_SIZE, UROM_SIZE};

pub const UROM0_FILE: &str = "urom0.bin";
pub const UROM1_FILE: &str = "urom1.bin";

#[derive(Debug)]
pub enum ImageError {
    BankSize { bank: usize, len: usize },
    BiosSize(usize),
    Io(io::Error),
    Hex(HexFileError),
    Packing { address: usize, error: PackingError },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::BankSize { bank, len } => {
                write!(f, "bank {} holds {} bytes, expected {}", bank, len, UROM_SIZE)
            }
            ImageError::BiosSize(len) => {
                write!(f, "bootstrap image is {} bytes, at most {} fit", len, BIOS_SIZE)
            }
            ImageError::Io(e) => write!(f, "{}", e),
            ImageError::Hex(e) => write!(f, "{}", e),
            ImageError::Packing { address, error } => {
                write!(f, "control word at {:05x} does not decode: {:?}", address, error)
            }
        }
    }
}

impl std::error::Error for ImageError {}

impl From<io::Error> for ImageError {
    fn from(e: io::Error) -> Self {
        ImageError::Io(e)
    }
}

impl From<HexFileError> for ImageError {
    fn from(e: HexFileError) -> Self {
        ImageError::Hex(e)
    }
}

/// The two parallel control-store banks, byte `i` of each holding half of
/// the control word at address `i`.
#[derive(Clone, PartialEq, Eq)]
pub struct ControlStoreImage {
    bank0: Vec<u8>,
    bank1: Vec<u8>,
}

impl fmt::Debug for ControlStoreImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = (0..UROM_SIZE).filter(|&i| self.bank0[i] != 0 || self.bank1[i] != 0).count();
        write!(f, "ControlStoreImage {{ {} of {} words non-idle }}", used, UROM_SIZE)
    }
}

impl ControlStoreImage {
    pub fn new(bank0: Vec<u8>, bank1: Vec<u8>) -> Result<ControlStoreImage, ImageError> {
        for (bank, bytes) in [&bank0, &bank1].iter().enumerate() {
            if bytes.len() != UROM_SIZE {
                return Err(ImageError::BankSize { bank, len: bytes.len() });
            }
        }
        Ok(ControlStoreImage { bank0, bank1 })
    }

    /// Both banks all zero, so every address holds the idle word.
    pub fn blank() -> ControlStoreImage {
        ControlStoreImage {
            bank0: vec![0; UROM_SIZE],
            bank1: vec![0; UROM_SIZE],
        }
    }

    pub fn set(&mut self, address: usize, bank0: u8, bank1: u8) {
        self.bank0[address] = bank0;
        self.bank1[address] = bank1;
    }

    pub fn bank0(&self) -> &[u8] {
        &self.bank0
    }

    pub fn bank1(&self) -> &[u8] {
        &self.bank1
    }

    pub fn word(&self, address: usize) -> Result<ControlWord, ImageError> {
        ControlWord::from_banks(self.bank0[address], self.bank1[address])
            .map_err(|error| ImageError::Packing { address, error })
    }

    /// Every control word in address order.
    pub fn decode(&self) -> Result<Vec<ControlWord>, ImageError> {
        (0..UROM_SIZE).map(|address| self.word(address)).collect()
    }

    pub fn read_files<P: AsRef<Path>, Q: AsRef<Path>>(path0: P, path1: Q) -> Result<ControlStoreImage, ImageError> {
        ControlStoreImage::new(fs::read(path0)?, fs::read(path1)?)
    }

    pub fn write_files<P: AsRef<Path>, Q: AsRef<Path>>(&self, path0: P, path1: Q) -> Result<(), ImageError> {
        fs::write(path0, &self.bank0)?;
        fs::write(path1, &self.bank1)?;
        Ok(())
    }
}

/// Reads a bootstrap image, either raw bytes or a `v2.0 raw` hex listing.
pub fn read_bios<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ImageError> {
    let bytes = fs::read(path)?;
    let bytes = if bytes.starts_with(HexFile::header().as_bytes()) {
        HexFile::read(bytes.as_slice())?.bytes()
    } else {
        bytes
    };

    if bytes.len() > BIOS_SIZE {
        return Err(ImageError::BiosSize(bytes.len()));
    }
    Ok(bytes)
}
