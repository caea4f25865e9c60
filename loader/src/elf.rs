//! ELF32 header parsing for executing statically linked programs.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::mem::{self, MaybeUninit};

/// ELF magic number
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Program header type for loadable segments
pub const PT_LOAD: u32 = 1;

/// Upper bound on retained loadable segments
pub const MAX_SEGMENTS: usize = 16;

/// ELF32 file header
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Elf32Ehdr {
    pub e_ident: [u8; 16],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u32,
    pub e_phoff: u32,
    pub e_shoff: u32,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

/// ELF32 program header
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Elf32Phdr {
    pub p_type: u32,
    pub p_offset: u32,
    pub p_vaddr: u32,
    pub p_paddr: u32,
    pub p_filesz: u32,
    pub p_memsz: u32,
    pub p_flags: u32,
    pub p_align: u32,
}

/// A loadable segment, copied out of the program-header table at startup
/// and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSegment {
    pub vaddr: u32,
    pub memsz: u32,
    pub offset: u32,
    pub filesz: u32,
}

impl LoadSegment {
    /// Empty placeholder for fixed-size segment tables.
    pub const ZERO: LoadSegment = LoadSegment {
        vaddr: 0,
        memsz: 0,
        offset: 0,
        filesz: 0,
    };
}

/// Parse and validation failures.
#[derive(Debug)]
pub enum ElfError {
    Io(io::Error),
    /// The first four bytes are not the ELF magic.
    NotElf,
    /// More than [`MAX_SEGMENTS`] loadable segments.
    TooManySegments,
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElfError::Io(e) => write!(f, "reading the ELF image failed: {e}"),
            ElfError::NotElf => write!(f, "not an ELF file"),
            ElfError::TooManySegments => {
                write!(f, "more than {MAX_SEGMENTS} loadable segments")
            }
        }
    }
}

impl std::error::Error for ElfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ElfError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ElfError {
    fn from(e: io::Error) -> Self {
        ElfError::Io(e)
    }
}

/// Parsed image: the entry address plus the retained loadable segments.
#[derive(Debug)]
pub struct Image {
    pub entry: u32,
    pub segments: Vec<LoadSegment>,
}

/// Read one `repr(C)` plain-data record byte-exactly from `src`.
fn read_pod<T: Copy, R: Read>(src: &mut R) -> io::Result<T> {
    let mut value = MaybeUninit::<T>::uninit();
    // Safety: T is plain old data; every byte is written before assume_init
    let buf = unsafe {
        std::slice::from_raw_parts_mut(value.as_mut_ptr() as *mut u8, mem::size_of::<T>())
    };
    src.read_exact(buf)?;
    Ok(unsafe { value.assume_init() })
}

/// Read the file header, validate the magic, then retain the PT_LOAD
/// entries of the program-header table.
pub fn parse<R: Read + Seek>(src: &mut R) -> Result<Image, ElfError> {
    let ehdr: Elf32Ehdr = read_pod(src)?;
    if ehdr.e_ident[..4] != ELF_MAGIC {
        return Err(ElfError::NotElf);
    }

    src.seek(SeekFrom::Start(u64::from(ehdr.e_phoff)))?;
    let mut segments = Vec::new();
    for _ in 0..ehdr.e_phnum {
        let phdr: Elf32Phdr = read_pod(src)?;
        if phdr.p_type != PT_LOAD {
            continue;
        }
        if segments.len() == MAX_SEGMENTS {
            return Err(ElfError::TooManySegments);
        }
        segments.push(LoadSegment {
            vaddr: phdr.p_vaddr,
            memsz: phdr.p_memsz,
            offset: phdr.p_offset,
            filesz: phdr.p_filesz,
        });
    }

    Ok(Image {
        entry: ehdr.e_entry,
        segments,
    })
}
