//! Minimal PE image reader
//!
//! Reads headers and import tables straight out of a mapped image, where
//! an RVA is an offset from the base. Every read is bounds-checked against
//! the image size so a malformed or hostile header yields `None` instead of
//! touching memory outside the module.

use super::HookError;

const DOS_MAGIC: u16 = 0x5A4D;
const NT_SIGNATURE: u32 = 0x0000_4550;
const PE32_MAGIC: u16 = 0x10B;
const PE32_PLUS_MAGIC: u16 = 0x20B;

const E_LFANEW: usize = 0x3C;
const FILE_HEADER_SIZE: usize = 20;
const SECTION_HEADER_SIZE: usize = 40;
const IMPORT_DESCRIPTOR_SIZE: usize = 20;
const DELAY_DESCRIPTOR_SIZE: usize = 32;

const DIRECTORY_IMPORT: usize = 1;
const DIRECTORY_DELAY_IMPORT: usize = 13;

/// Delay descriptor attribute: fields hold RVAs rather than VAs
const DELAY_RVA_BASED: u32 = 1;

/// Upper bound on descriptors walked before giving up on a missing terminator
const MAX_DESCRIPTORS: usize = 4096;

/// Bounds-checked view over a mapped image
#[derive(Debug, Clone, Copy)]
pub struct ImageView {
    base: usize,
    len: usize,
}

impl ImageView {
    /// # Safety
    /// `base..base + len` must stay readable for the view's lifetime.
    pub unsafe fn new(base: *const u8, len: usize) -> Self {
        Self {
            base: base as usize,
            len,
        }
    }

    /// View a loaded module, sized by its `SizeOfImage`
    ///
    /// # Safety
    /// `base` must be the base of a mapped image.
    pub unsafe fn from_module(base: usize) -> Option<Self> {
        if base == 0 {
            return None;
        }
        // Headers first, then widen to the whole image
        let headers = Self::new(base as *const u8, 0x1000);
        let lfanew = headers.read_u32(E_LFANEW)? as usize;
        let optional = lfanew.checked_add(4 + FILE_HEADER_SIZE)?;
        let size_of_image = headers.read_u32(optional.checked_add(56)?)? as usize;
        if size_of_image < 0x1000 {
            return None;
        }
        Some(Self::new(base as *const u8, size_of_image))
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `address` points inside the image
    pub fn contains(&self, address: usize) -> bool {
        address >= self.base && address - self.base < self.len
    }

    fn read<T: Copy>(&self, rva: usize) -> Option<T> {
        let end = rva.checked_add(std::mem::size_of::<T>())?;
        if end > self.len {
            return None;
        }
        // SAFETY: range checked against the image size
        Some(unsafe { std::ptr::read_unaligned((self.base + rva) as *const T) })
    }

    pub fn read_u16(&self, rva: usize) -> Option<u16> {
        self.read(rva)
    }

    pub fn read_u32(&self, rva: usize) -> Option<u32> {
        self.read(rva)
    }

    pub fn read_u64(&self, rva: usize) -> Option<u64> {
        self.read(rva)
    }

    /// NUL-terminated byte string at `rva`, without the terminator
    pub fn c_str(&self, rva: usize) -> Option<&[u8]> {
        if rva >= self.len {
            return None;
        }
        // SAFETY: range checked against the image size
        let tail = unsafe { std::slice::from_raw_parts((self.base + rva) as *const u8, self.len - rva) };
        let end = tail.iter().position(|&b| b == 0)?;
        Some(&tail[..end])
    }
}

/// One section's virtual extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub rva: usize,
    pub size: usize,
}

/// An import or delay-import descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDescriptor {
    pub dll: String,
    /// Import name table, 0 when the linker omitted it
    pub names: usize,
    /// Import address table
    pub addresses: usize,
}

impl ImportDescriptor {
    /// Case-insensitive match on the imported DLL; `None` matches every DLL
    pub fn matches(&self, filter: Option<&str>) -> bool {
        filter.map_or(true, |dll| self.dll.eq_ignore_ascii_case(dll))
    }
}

/// What an import name table entry refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportName {
    Name(String),
    Ordinal(u16),
}

/// Parsed PE headers over an [`ImageView`]
#[derive(Debug, Clone)]
pub struct PeImage {
    view: ImageView,
    pe64: bool,
    directories: usize,
    directory_count: usize,
    sections: Vec<Section>,
}

impl PeImage {
    pub fn parse(view: ImageView) -> Result<Self, HookError> {
        if view.read_u16(0) != Some(DOS_MAGIC) {
            return Err(HookError::InvalidImage("missing MZ header"));
        }
        let nt = view
            .read_u32(E_LFANEW)
            .ok_or(HookError::InvalidImage("truncated DOS header"))? as usize;
        if view.read_u32(nt) != Some(NT_SIGNATURE) {
            return Err(HookError::InvalidImage("missing PE signature"));
        }

        let file_header = nt + 4;
        let section_count = view
            .read_u16(file_header + 2)
            .ok_or(HookError::InvalidImage("truncated file header"))? as usize;
        let optional_size = view
            .read_u16(file_header + 16)
            .ok_or(HookError::InvalidImage("truncated file header"))? as usize;

        let optional = file_header + FILE_HEADER_SIZE;
        let (pe64, count_offset, directories_offset) = match view.read_u16(optional) {
            Some(PE32_MAGIC) => (false, 92, 96),
            Some(PE32_PLUS_MAGIC) => (true, 108, 112),
            _ => return Err(HookError::InvalidImage("unknown optional header magic")),
        };
        let directory_count = view
            .read_u32(optional + count_offset)
            .ok_or(HookError::InvalidImage("truncated optional header"))?
            as usize;

        let section_table = optional + optional_size;
        let sections = (0..section_count)
            .map_while(|i| {
                let header = section_table + i * SECTION_HEADER_SIZE;
                Some(Section {
                    size: view.read_u32(header + 8)? as usize,
                    rva: view.read_u32(header + 12)? as usize,
                })
            })
            .collect();

        Ok(Self {
            view,
            pe64,
            directories: optional + directories_offset,
            directory_count: directory_count.min(16),
            sections,
        })
    }

    pub fn view(&self) -> &ImageView {
        &self.view
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Pointer width the image was built for
    pub fn pointer_size(&self) -> usize {
        if self.pe64 {
            8
        } else {
            4
        }
    }

    fn directory(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.directory_count {
            return None;
        }
        let entry = self.directories + index * 8;
        let rva = self.view.read_u32(entry)? as usize;
        let size = self.view.read_u32(entry + 4)? as usize;
        (rva != 0).then_some((rva, size))
    }

    /// Pointer-sized value at `rva`, widened to 64 bits
    pub fn read_pointer(&self, rva: usize) -> Option<u64> {
        if self.pe64 {
            self.view.read_u64(rva)
        } else {
            self.view.read_u32(rva).map(u64::from)
        }
    }

    /// RVA of entry `index` in a thunk table
    pub fn thunk_rva(&self, table: usize, index: usize) -> Option<usize> {
        table.checked_add(index.checked_mul(self.pointer_size())?)
    }

    /// Entry `index` of a thunk table
    pub fn thunk(&self, table: usize, index: usize) -> Option<u64> {
        self.read_pointer(self.thunk_rva(table, index)?)
    }

    /// Decode an import name table entry
    pub fn import_name(&self, thunk: u64) -> Option<ImportName> {
        let ordinal_flag = if self.pe64 { 1u64 << 63 } else { 1u64 << 31 };
        if thunk & ordinal_flag != 0 {
            return Some(ImportName::Ordinal(thunk as u16));
        }
        // IMAGE_IMPORT_BY_NAME: u16 hint, then the name
        let name = self.view.c_str(usize::try_from(thunk).ok()?.checked_add(2)?)?;
        Some(ImportName::Name(String::from_utf8_lossy(name).into_owned()))
    }

    fn dll_name(&self, rva: usize) -> Option<String> {
        self.view
            .c_str(rva)
            .map(|name| String::from_utf8_lossy(name).into_owned())
    }

    /// Regular import descriptors
    pub fn imports(&self) -> Vec<ImportDescriptor> {
        let Some((table, _)) = self.directory(DIRECTORY_IMPORT) else {
            return Vec::new();
        };

        let mut descriptors = Vec::new();
        for i in 0..MAX_DESCRIPTORS {
            let entry = table + i * IMPORT_DESCRIPTOR_SIZE;
            let (Some(names), Some(name), Some(addresses)) = (
                self.view.read_u32(entry),
                self.view.read_u32(entry + 12),
                self.view.read_u32(entry + 16),
            ) else {
                break;
            };
            if name == 0 && addresses == 0 {
                break;
            }
            if let Some(dll) = self.dll_name(name as usize) {
                descriptors.push(ImportDescriptor {
                    dll,
                    names: names as usize,
                    addresses: addresses as usize,
                });
            }
        }
        descriptors
    }

    /// RVA-based delay-load descriptors
    pub fn delay_imports(&self) -> Vec<ImportDescriptor> {
        let Some((table, _)) = self.directory(DIRECTORY_DELAY_IMPORT) else {
            return Vec::new();
        };

        let mut descriptors = Vec::new();
        for i in 0..MAX_DESCRIPTORS {
            let entry = table + i * DELAY_DESCRIPTOR_SIZE;
            let (Some(attributes), Some(name), Some(addresses), Some(names)) = (
                self.view.read_u32(entry),
                self.view.read_u32(entry + 4),
                self.view.read_u32(entry + 12),
                self.view.read_u32(entry + 16),
            ) else {
                break;
            };
            if name == 0 {
                break;
            }
            if attributes & DELAY_RVA_BASED == 0 {
                tracing::trace!("Skipping VA-based delay descriptor #{}", i);
                continue;
            }
            if let Some(dll) = self.dll_name(name as usize) {
                descriptors.push(ImportDescriptor {
                    dll,
                    names: names as usize,
                    addresses: addresses as usize,
                });
            }
        }
        descriptors
    }
}


#[cfg(test)]
mod tests {
    use super::fixture::{ImageBuilder, Thunk};
    use super::*;

    #[test]
    fn test_rejects_non_pe() {
        let bytes = vec![0u8; 256];
        let view = unsafe { ImageView::new(bytes.as_ptr(), bytes.len()) };
        assert!(matches!(
            PeImage::parse(view),
            Err(HookError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_reads_out_of_bounds_fail() {
        let bytes = [1u8, 2, 3, 4];
        let view = unsafe { ImageView::new(bytes.as_ptr(), bytes.len()) };
        assert_eq!(view.read_u32(0), Some(0x0403_0201));
        assert_eq!(view.read_u32(1), None);
        assert_eq!(view.read_u64(0), None);
        assert_eq!(view.c_str(0), None);
        assert_eq!(view.read_u16(usize::MAX), None);
    }

    #[test]
    fn test_parses_fixture_imports() {
        let mut builder = ImageBuilder::new();
        builder.import(
            "KERNEL32.dll",
            &[Thunk::Name("LoadLibraryA"), Thunk::Ordinal(17)],
            &[0x1111, 0x2222],
            true,
        );
        builder.delay_import("user32.dll", &[Thunk::Name("GetFocus")], &[0x3333]);
        let fixture = builder.build();

        let image = PeImage::parse(fixture.view()).unwrap();
        assert_eq!(image.pointer_size(), 8);
        assert_eq!(image.sections().len(), 1);

        let imports = image.imports();
        assert_eq!(imports.len(), 1);
        assert!(imports[0].matches(Some("kernel32.DLL")));
        assert!(imports[0].matches(None));
        assert!(!imports[0].matches(Some("user32.dll")));

        let first = image.thunk(imports[0].names, 0).unwrap();
        assert_eq!(
            image.import_name(first),
            Some(ImportName::Name("LoadLibraryA".into()))
        );
        let second = image.thunk(imports[0].names, 1).unwrap();
        assert_eq!(image.import_name(second), Some(ImportName::Ordinal(17)));
        assert_eq!(image.thunk(imports[0].addresses, 1), Some(0x2222));

        let delays = image.delay_imports();
        assert_eq!(delays.len(), 1);
        assert_eq!(delays[0].dll, "user32.dll");
    }

    #[test]
    fn test_module_view_sized_from_headers() {
        let fixture = ImageBuilder::new().build();
        let view = unsafe { ImageView::from_module(fixture.base()) }.unwrap();
        assert_eq!(view.len(), fixture::IMAGE_SIZE);
        assert!(view.contains(fixture.base() + 0x1FFF));
        assert!(!view.contains(fixture.base() + 0x2000));
    }
}
