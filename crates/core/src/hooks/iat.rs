//! Import address table hooks via slot replacement
//!
//! Locates the slot a module calls an imported function through and swaps
//! it for a replacement. No trampoline is involved: the previous slot value
//! is returned and callers invoke it directly to reach the original.
//!
//! Slots are searched in this order:
//! 1. Named imports, matched through the import name table
//! 2. Ordinal imports, when a DLL filter is given
//! 3. A raw scan of section data for the export's address
//! 4. Delay-load descriptors, after a bounded wait for the loader to bind
//!    the slot; a slot still unbound is patched anyway

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::pe::{ImageView, ImportDescriptor, ImportName, PeImage};
use super::HookError;

new_key_type! {
    /// Handle for a patched import slot
    pub struct PatchKey;
}

/// Resolves the address a DLL exports for a symbol
pub trait ExportResolver {
    fn export_address(&self, dll: Option<&str>, symbol: &str) -> Option<usize>;
}

/// Narrow interface the hooking controller patches modules through
pub trait SymbolPatcher {
    /// Redirect `module`'s import of `symbol` to `replacement`
    ///
    /// # Returns
    /// The previous slot value, or `None` when nothing was patched
    fn install(
        &self,
        module: usize,
        imported_dll: Option<&str>,
        symbol: &str,
        replacement: usize,
    ) -> Result<Option<usize>, HookError>;
}

/// Which import to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportQuery<'a> {
    pub symbol: &'a str,
    /// Imported DLL, matched case-insensitively
    pub dll: Option<&'a str>,
    pub ordinal: Option<u16>,
}

impl<'a> ImportQuery<'a> {
    /// Query for `symbol`, splitting off an `@N` ordinal suffix
    pub fn parse(symbol: &'a str) -> Self {
        if let Some((name, suffix)) = symbol.rsplit_once('@') {
            if let Ok(ordinal) = suffix.parse::<u16>() {
                return Self {
                    symbol: name,
                    dll: None,
                    ordinal: Some(ordinal),
                };
            }
        }
        Self {
            symbol,
            dll: None,
            ordinal: None,
        }
    }

    pub fn with_dll(mut self, dll: Option<&'a str>) -> Self {
        self.dll = dll;
        self
    }

    pub fn with_ordinal(mut self, ordinal: u16) -> Self {
        self.ordinal = Some(ordinal);
        self
    }
}

/// One rewritten slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    /// Base of the module owning the slot
    pub module: usize,
    pub slot: usize,
    pub original: usize,
    pub replacement: usize,
    pub symbol: String,
    /// `original` is the real export rather than the module's delay-load thunk
    pub bound: bool,
}

/// Bookkeeping for every patched slot
///
/// A slot is booked once; later attempts on it are no-ops, so the first
/// original seen for each symbol is the one shims call through.
#[derive(Default)]
pub struct PatchRegistry {
    records: SlotMap<PatchKey, PatchRecord>,
    by_slot: HashMap<usize, PatchKey>,
    originals: HashMap<String, usize>,
}

impl PatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_patched(&self, slot: usize) -> bool {
        self.by_slot.contains_key(&slot)
    }

    pub fn get(&self, key: PatchKey) -> Option<&PatchRecord> {
        self.records.get(key)
    }

    pub fn by_slot(&self, slot: usize) -> Option<&PatchRecord> {
        self.by_slot.get(&slot).and_then(|key| self.records.get(*key))
    }

    /// Original address first booked for `symbol`
    ///
    /// Unbound delay-load thunks are never handed out here; callers fall
    /// back to the real export instead.
    pub fn original(&self, symbol: &str) -> Option<usize> {
        self.originals.get(symbol).copied()
    }

    pub fn book(&mut self, record: PatchRecord) -> PatchKey {
        if record.bound {
            self.originals
                .entry(record.symbol.clone())
                .or_insert(record.original);
        }
        let slot = record.slot;
        let key = self.records.insert(record);
        self.by_slot.insert(slot, key);
        key
    }

    /// Drop every record whose slot belongs to `module`
    ///
    /// Originals stay booked since shims may still call through them.
    pub fn forget_module(&mut self, module: usize) -> usize {
        let stale: Vec<PatchKey> = self
            .records
            .iter()
            .filter(|(_, record)| record.module == module)
            .map(|(key, _)| key)
            .collect();
        for key in &stale {
            if let Some(record) = self.records.remove(*key) {
                self.by_slot.remove(&record.slot);
            }
        }
        stale.len()
    }
}

/// Locate the slot for `query` in `image`
///
/// # Returns
/// Absolute slot address, or `None` when the module does not import it
pub fn find_slot(
    image: &PeImage,
    query: &ImportQuery,
    resolver: &dyn ExportResolver,
    delay_wait: Duration,
) -> Option<usize> {
    let base = image.view().base();
    named_slot(image, query, resolver)
        .or_else(|| ordinal_slot(image, query))
        .or_else(|| scanned_slot(image, query, resolver))
        .map(|rva| base + rva)
        .or_else(|| delay_slot(image, query, resolver, delay_wait))
}

/// IAT slot whose name table entry satisfies `wanted`
fn slot_by_name(
    image: &PeImage,
    descriptor: &ImportDescriptor,
    wanted: impl Fn(&ImportName) -> bool,
) -> Option<usize> {
    if descriptor.names == 0 {
        return None;
    }
    for index in 0.. {
        let thunk = image.thunk(descriptor.names, index)?;
        if thunk == 0 {
            return None;
        }
        if image.import_name(thunk).is_some_and(|name| wanted(&name)) {
            return image.thunk_rva(descriptor.addresses, index);
        }
    }
    None
}

/// IAT slot currently holding `address`
fn slot_by_value(image: &PeImage, table: usize, address: usize) -> Option<usize> {
    for index in 0.. {
        let value = image.thunk(table, index)?;
        if value == 0 {
            return None;
        }
        if value == address as u64 {
            return image.thunk_rva(table, index);
        }
    }
    None
}

fn named_slot(image: &PeImage, query: &ImportQuery, resolver: &dyn ExportResolver) -> Option<usize> {
    for descriptor in image.imports().iter().filter(|d| d.matches(query.dll)) {
        let found = if descriptor.names == 0 {
            resolver
                .export_address(Some(&descriptor.dll), query.symbol)
                .and_then(|address| slot_by_value(image, descriptor.addresses, address))
        } else {
            slot_by_name(image, descriptor, |name| {
                matches!(name, ImportName::Name(n) if n == query.symbol)
            })
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn ordinal_slot(image: &PeImage, query: &ImportQuery) -> Option<usize> {
    let (Some(_), Some(ordinal)) = (query.dll, query.ordinal) else {
        return None;
    };
    image
        .imports()
        .iter()
        .filter(|d| d.matches(query.dll))
        .find_map(|descriptor| {
            slot_by_name(image, descriptor, |name| *name == ImportName::Ordinal(ordinal))
        })
}

fn scanned_slot(image: &PeImage, query: &ImportQuery, resolver: &dyn ExportResolver) -> Option<usize> {
    let address = resolver.export_address(query.dll, query.symbol)? as u64;
    let step = image.pointer_size();
    image.sections().iter().find_map(|section| {
        let start = section.rva.next_multiple_of(step);
        let end = section.rva.saturating_add(section.size);
        (start..end)
            .step_by(step)
            .find(|rva| image.read_pointer(*rva) == Some(address))
    })
}

fn delay_slot(
    image: &PeImage,
    query: &ImportQuery,
    resolver: &dyn ExportResolver,
    delay_wait: Duration,
) -> Option<usize> {
    for descriptor in image.delay_imports().iter().filter(|d| d.matches(query.dll)) {
        let found = slot_by_name(image, descriptor, |name| match name {
            ImportName::Name(n) => n == query.symbol,
            ImportName::Ordinal(o) => query.ordinal == Some(*o),
        })
        .or_else(|| {
            resolver
                .export_address(Some(&descriptor.dll), query.symbol)
                .and_then(|address| slot_by_value(image, descriptor.addresses, address))
        });

        let Some(rva) = found else {
            continue;
        };
        // Patched either way: the thunk would bind the slot to the real
        // export and bypass us, and the module is never swept again
        if !wait_for_binding(image, rva, delay_wait) {
            tracing::debug!(
                "Delay-load slot for {}!{} still unbound after {:?}, patching the thunk",
                descriptor.dll,
                query.symbol,
                delay_wait
            );
        }
        return Some(image.view().base() + rva);
    }
    None
}

/// Wait until the slot no longer points at the image's own delay-load thunk
fn wait_for_binding(image: &PeImage, rva: usize, limit: Duration) -> bool {
    let started = Instant::now();
    loop {
        match image.read_pointer(rva) {
            None => return false,
            Some(value) if !image.view().contains(value as usize) => return true,
            Some(_) => {}
        }
        if started.elapsed() >= limit {
            return false;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Swap the slot's current value for `replacement`
///
/// # Safety
/// `slot` must be a mapped, pointer-sized location.
unsafe fn swap_slot(slot: usize, replacement: usize) -> Result<Option<usize>, HookError> {
    if slot % std::mem::align_of::<usize>() != 0 {
        return Err(HookError::MisalignedSlot(slot));
    }

    let cell = &*(slot as *const AtomicUsize);
    let current = cell.load(Ordering::Acquire);
    if current == 0 || current == replacement {
        return Ok(None);
    }

    let _guard = region::protect_with_handle(
        slot as *const u8,
        std::mem::size_of::<usize>(),
        region::Protection::READ_WRITE,
    )
    .map_err(|e| HookError::MemoryProtection(e.to_string()))?;

    Ok(cell
        .compare_exchange(current, replacement, Ordering::AcqRel, Ordering::Acquire)
        .ok())
}

/// Patch `image`'s import matching `query`
///
/// # Returns
/// The original slot value, or `None` if there was nothing to do: the
/// import is absent, the slot is null, already holds `replacement`, or was
/// patched before.
pub fn install_hook(
    registry: &mut PatchRegistry,
    image: &PeImage,
    query: &ImportQuery,
    replacement: usize,
    resolver: &dyn ExportResolver,
    delay_wait: Duration,
) -> Result<Option<usize>, HookError> {
    if image.pointer_size() != std::mem::size_of::<usize>() {
        return Err(HookError::PointerSizeMismatch(image.pointer_size()));
    }

    let Some(slot) = find_slot(image, query, resolver, delay_wait) else {
        tracing::trace!(
            "No import of {} in module {:#x}",
            query.symbol,
            image.view().base()
        );
        return Ok(None);
    };
    if registry.is_patched(slot) {
        return Ok(None);
    }

    // SAFETY: find_slot only returns slots inside the image
    let Some(original) = (unsafe { swap_slot(slot, replacement)? }) else {
        return Ok(None);
    };

    let bound = !image.view().contains(original);
    registry.book(PatchRecord {
        module: image.view().base(),
        slot,
        original,
        replacement,
        symbol: query.symbol.to_string(),
        bound,
    });

    tracing::debug!(
        "Hooked {} in module {:#x}: slot={:#x}, original={:#x}, bound={}",
        query.symbol,
        image.view().base(),
        slot,
        original,
        bound
    );
    Ok(Some(original))
}

/// [`SymbolPatcher`] over live modules
pub struct IatPatcher<R> {
    registry: Mutex<PatchRegistry>,
    resolver: R,
    delay_wait: Duration,
}

impl<R: ExportResolver> IatPatcher<R> {
    pub fn new(resolver: R, delay_wait: Duration) -> Self {
        Self {
            registry: Mutex::new(PatchRegistry::new()),
            resolver,
            delay_wait,
        }
    }

    /// Original address first booked for `symbol`
    pub fn original(&self, symbol: &str) -> Option<usize> {
        self.registry.lock().original(symbol)
    }

    pub fn patched_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Drop records for an unloaded module
    pub fn forget_module(&self, module: usize) -> usize {
        self.registry.lock().forget_module(module)
    }
}

impl<R: ExportResolver> SymbolPatcher for IatPatcher<R> {
    fn install(
        &self,
        module: usize,
        imported_dll: Option<&str>,
        symbol: &str,
        replacement: usize,
    ) -> Result<Option<usize>, HookError> {
        // SAFETY: callers pass bases of loaded modules
        let view = unsafe { ImageView::from_module(module) }
            .ok_or(HookError::InvalidImage("unreadable module headers"))?;
        let image = PeImage::parse(view)?;
        let query = ImportQuery::parse(symbol).with_dll(imported_dll);
        install_hook(
            &mut self.registry.lock(),
            &image,
            &query,
            replacement,
            &self.resolver,
            self.delay_wait,
        )
    }
}

/// Resolves exports from modules already loaded in the process
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadedModules;

#[cfg(windows)]
impl ExportResolver for LoadedModules {
    fn export_address(&self, dll: Option<&str>, symbol: &str) -> Option<usize> {
        use std::ffi::CString;
        use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleA, GetProcAddress};

        let dll = CString::new(dll?).ok()?;
        let symbol = CString::new(symbol).ok()?;
        // SAFETY: both strings are NUL-terminated
        unsafe {
            let module = GetModuleHandleA(dll.as_ptr() as *const u8);
            if module.is_null() {
                return None;
            }
            GetProcAddress(module, symbol.as_ptr() as *const u8).map(|f| f as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::pe::fixture::{Fixture, ImageBuilder, Thunk};
    use super::*;

    const LOAD_LIBRARY: u64 = 0x7FF0_0000_1000;
    const GET_FOCUS: u64 = 0x7FF0_0000_2000;
    const REPLACEMENT: usize = 0x7FF0_DEAD_0000;
    const NO_WAIT: Duration = Duration::from_millis(0);

    struct Exports(HashMap<&'static str, usize>);

    impl Exports {
        fn new() -> Self {
            Self(HashMap::from([
                ("LoadLibraryA", LOAD_LIBRARY as usize),
                ("GetFocus", GET_FOCUS as usize),
            ]))
        }
    }

    impl ExportResolver for Exports {
        fn export_address(&self, _dll: Option<&str>, symbol: &str) -> Option<usize> {
            self.0.get(symbol).copied()
        }
    }

    fn parse(fixture: &Fixture) -> PeImage {
        PeImage::parse(fixture.view()).unwrap()
    }

    #[test]
    fn test_query_parses_ordinal_suffix() {
        let query = ImportQuery::parse("Direct3DCreate9@37");
        assert_eq!(query.symbol, "Direct3DCreate9");
        assert_eq!(query.ordinal, Some(37));

        let plain = ImportQuery::parse("name@host");
        assert_eq!(plain.symbol, "name@host");
        assert_eq!(plain.ordinal, None);
    }

    #[test]
    fn test_finds_named_import() {
        let mut builder = ImageBuilder::new();
        let slots = builder.import(
            "KERNEL32.dll",
            &[Thunk::Name("GetVersion"), Thunk::Name("LoadLibraryA")],
            &[0x1234, LOAD_LIBRARY],
            true,
        );
        let fixture = builder.build();
        let image = parse(&fixture);

        let query = ImportQuery::parse("LoadLibraryA");
        assert_eq!(
            find_slot(&image, &query, &Exports::new(), NO_WAIT),
            Some(fixture.base() + slots[1])
        );

        let filtered = query.with_dll(Some("kernel32.dll"));
        assert!(find_slot(&image, &filtered, &Exports::new(), NO_WAIT).is_some());

        let wrong_dll = ImportQuery::parse("GetVersion").with_dll(Some("user32.dll"));
        assert_eq!(find_slot(&image, &wrong_dll, &Exports::new(), NO_WAIT), None);
    }

    #[test]
    fn test_ordinal_needs_dll_filter() {
        let mut builder = ImageBuilder::new();
        let slots = builder.import("d3d9.dll", &[Thunk::Ordinal(37)], &[0x5555], true);
        let fixture = builder.build();
        let image = parse(&fixture);

        let unfiltered = ImportQuery::parse("Direct3DCreate9@37");
        assert_eq!(find_slot(&image, &unfiltered, &Exports::new(), NO_WAIT), None);

        let filtered = unfiltered.with_dll(Some("D3D9.DLL"));
        assert_eq!(
            find_slot(&image, &filtered, &Exports::new(), NO_WAIT),
            Some(fixture.base() + slots[0])
        );
    }

    #[test]
    fn test_missing_name_table_matches_by_address() {
        let mut builder = ImageBuilder::new();
        let slots = builder.import(
            "user32.dll",
            &[Thunk::Name("GetActiveWindow"), Thunk::Name("GetFocus")],
            &[0x9999, GET_FOCUS],
            false,
        );
        let fixture = builder.build();
        let image = parse(&fixture);

        let query = ImportQuery::parse("GetFocus");
        assert_eq!(
            find_slot(&image, &query, &Exports::new(), NO_WAIT),
            Some(fixture.base() + slots[1])
        );
    }

    #[test]
    fn test_raw_scan_fallback() {
        let mut builder = ImageBuilder::new();
        builder.pointer(0x4444);
        let loose = builder.pointer(GET_FOCUS);
        let fixture = builder.build();
        let image = parse(&fixture);

        let query = ImportQuery::parse("GetFocus");
        assert_eq!(
            find_slot(&image, &query, &Exports::new(), NO_WAIT),
            Some(fixture.base() + loose)
        );

        let unknown = ImportQuery::parse("NotExported");
        assert_eq!(find_slot(&image, &unknown, &Exports::new(), NO_WAIT), None);
    }

    #[test]
    fn test_delay_load_waits_for_binding() {
        let mut builder = ImageBuilder::new();
        let slots = builder.delay_import("user32.dll", &[Thunk::Name("GetFocus")], &[1]);
        let fixture = builder.build();
        let image = parse(&fixture);
        let query = ImportQuery::parse("GetFocus");

        // Still pointing at the image's own thunk: found once the cap runs out
        fixture.set_slot(slots[0], fixture.base() + 0x1F00);
        assert_eq!(
            find_slot(&image, &query, &Exports::new(), Duration::from_millis(5)),
            Some(fixture.base() + slots[0])
        );

        fixture.set_slot(slots[0], GET_FOCUS as usize);
        assert_eq!(
            find_slot(&image, &query, &Exports::new(), NO_WAIT),
            Some(fixture.base() + slots[0])
        );
    }

    #[test]
    fn test_registry_first_original_wins() {
        let mut registry = PatchRegistry::new();
        let record = |module, slot, original| PatchRecord {
            module,
            slot,
            original,
            replacement: REPLACEMENT,
            symbol: "GetFocus".into(),
            bound: true,
        };
        registry.book(record(0x1000, 0x1010, 0xAAAA));
        registry.book(record(0x2000, 0x2010, 0xBBBB));

        assert_eq!(registry.original("GetFocus"), Some(0xAAAA));
        assert!(registry.is_patched(0x2010));

        assert_eq!(registry.forget_module(0x2000), 1);
        assert!(!registry.is_patched(0x2010));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.by_slot(0x1010).unwrap().original, 0xAAAA);
    }

    #[cfg(target_pointer_width = "64")]
    mod install {
        use super::*;

        #[test]
        fn test_install_is_idempotent() {
            let mut builder = ImageBuilder::new();
            let slots = builder.import(
                "KERNEL32.dll",
                &[Thunk::Name("LoadLibraryA")],
                &[LOAD_LIBRARY],
                true,
            );
            let fixture = builder.build();
            let image = parse(&fixture);
            let query = ImportQuery::parse("LoadLibraryA");
            let mut registry = PatchRegistry::new();

            let first = install_hook(&mut registry, &image, &query, REPLACEMENT, &Exports::new(), NO_WAIT);
            assert_eq!(first.unwrap(), Some(LOAD_LIBRARY as usize));
            assert_eq!(fixture.slot(slots[0]), REPLACEMENT);

            let second = install_hook(&mut registry, &image, &query, REPLACEMENT, &Exports::new(), NO_WAIT);
            assert_eq!(second.unwrap(), None);
            assert_eq!(fixture.slot(slots[0]), REPLACEMENT);
            assert_eq!(registry.len(), 1);
            assert_eq!(registry.original("LoadLibraryA"), Some(LOAD_LIBRARY as usize));
        }

        #[test]
        fn test_unbound_delay_slot_is_patched_after_wait() {
            let mut builder = ImageBuilder::new();
            let slots = builder.delay_import("user32.dll", &[Thunk::Name("GetFocus")], &[1]);
            let fixture = builder.build();
            let thunk = fixture.base() + 0x1F00;
            fixture.set_slot(slots[0], thunk);
            let image = parse(&fixture);
            let query = ImportQuery::parse("GetFocus");
            let mut registry = PatchRegistry::new();

            let result = install_hook(
                &mut registry,
                &image,
                &query,
                REPLACEMENT,
                &Exports::new(),
                Duration::from_millis(5),
            );
            assert_eq!(result.unwrap(), Some(thunk));
            assert_eq!(fixture.slot(slots[0]), REPLACEMENT);
            assert!(registry.is_patched(fixture.base() + slots[0]));
            assert!(!registry.by_slot(fixture.base() + slots[0]).unwrap().bound);
            // Shims must not be handed the thunk
            assert_eq!(registry.original("GetFocus"), None);

            let again = install_hook(&mut registry, &image, &query, REPLACEMENT, &Exports::new(), NO_WAIT);
            assert_eq!(again.unwrap(), None);
        }

        #[test]
        fn test_different_replacement_not_double_booked() {
            let mut builder = ImageBuilder::new();
            let slots = builder.import("user32.dll", &[Thunk::Name("GetFocus")], &[GET_FOCUS], true);
            let fixture = builder.build();
            let image = parse(&fixture);
            let query = ImportQuery::parse("GetFocus");
            let mut registry = PatchRegistry::new();

            install_hook(&mut registry, &image, &query, REPLACEMENT, &Exports::new(), NO_WAIT).unwrap();
            let again = install_hook(&mut registry, &image, &query, 0x1234_5678, &Exports::new(), NO_WAIT);
            assert_eq!(again.unwrap(), None);
            assert_eq!(fixture.slot(slots[0]), REPLACEMENT);
        }

        #[test]
        fn test_null_slot_is_noop() {
            let mut builder = ImageBuilder::new();
            let slots = builder.import(
                "user32.dll",
                &[Thunk::Name("GetFocus"), Thunk::Name("GetActiveWindow")],
                &[GET_FOCUS, 0x7777],
                true,
            );
            let fixture = builder.build();
            fixture.set_slot(slots[0], 0);
            let image = parse(&fixture);
            let mut registry = PatchRegistry::new();

            let result = install_hook(
                &mut registry,
                &image,
                &ImportQuery::parse("GetFocus"),
                REPLACEMENT,
                &Exports::new(),
                NO_WAIT,
            );
            assert_eq!(result.unwrap(), None);
            assert!(registry.is_empty());
        }

        #[test]
        fn test_absent_import_is_silent() {
            let fixture = ImageBuilder::new().build();
            let patcher = IatPatcher::new(Exports::new(), NO_WAIT);
            let result = patcher.install(fixture.base(), None, "RegisterClassW", REPLACEMENT);
            assert_eq!(result.unwrap(), None);
            assert_eq!(patcher.patched_count(), 0);
        }

        #[test]
        fn test_patcher_over_module_base() {
            let mut builder = ImageBuilder::new();
            let slots = builder.import("user32.dll", &[Thunk::Name("GetFocus")], &[GET_FOCUS], true);
            let fixture = builder.build();

            let patcher = IatPatcher::new(Exports::new(), NO_WAIT);
            let original = patcher
                .install(fixture.base(), Some("USER32.dll"), "GetFocus", REPLACEMENT)
                .unwrap();
            assert_eq!(original, Some(GET_FOCUS as usize));
            assert_eq!(fixture.slot(slots[0]), REPLACEMENT);
            assert_eq!(patcher.original("GetFocus"), Some(GET_FOCUS as usize));

            assert_eq!(patcher.forget_module(fixture.base()), 1);
            assert_eq!(patcher.patched_count(), 0);
        }
    }
}
