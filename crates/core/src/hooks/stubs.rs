//! Forwarding stubs for interface proxies
//!
//! A proxy object's first field is its vtable and its second the wrapped
//! object. A forwarding stub for slot `i` replaces `this` with the wrapped
//! object and tail-jumps through the wrapped object's own vtable entry `i`,
//! so arguments, return values and the stack are left exactly as the
//! caller set them up.
//!
//! Stubs only depend on the slot index, so one stub per index is shared by
//! every proxied interface.

use iced_x86::{
    BlockEncoder, BlockEncoderOptions, Code, Instruction, InstructionBlock, MemoryOperand,
    Register,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::HookError;

/// Executable page size
const PAGE_SIZE: usize = 4096;

/// Stub alignment inside a page
const STUB_ALIGN: usize = 16;

/// Byte offset of the wrapped object pointer inside a proxy
pub const REAL_OFFSET: usize = std::mem::size_of::<usize>();

/// Global stub allocator
static ALLOCATOR: Mutex<StubAllocator> = Mutex::new(StubAllocator::new());

/// Stub address per vtable slot
static FORWARDERS: Mutex<BTreeMap<usize, usize>> = Mutex::new(BTreeMap::new());

/// Bump allocator over read-write-execute pages
struct StubAllocator {
    pages: Vec<Page>,
}

struct Page {
    allocation: region::Allocation,
    used: usize,
}

// SAFETY: pages are only touched through the allocator's mutex
unsafe impl Send for Page {}

impl StubAllocator {
    const fn new() -> Self {
        Self { pages: Vec::new() }
    }

    fn alloc(&mut self, size: usize) -> Result<*mut u8, HookError> {
        let size = size.next_multiple_of(STUB_ALIGN);
        if size > PAGE_SIZE {
            return Err(HookError::AllocationFailed);
        }

        if let Some(page) = self
            .pages
            .iter_mut()
            .find(|page| page.used + size <= page.allocation.len())
        {
            // SAFETY: offset stays inside the allocation
            let ptr = unsafe { page.allocation.as_mut_ptr::<u8>().add(page.used) };
            page.used += size;
            return Ok(ptr);
        }

        let mut allocation = region::alloc(PAGE_SIZE, region::Protection::READ_WRITE_EXECUTE)
            .map_err(|e| {
                tracing::error!("Failed to allocate stub page: {}", e);
                HookError::AllocationFailed
            })?;
        let ptr = allocation.as_mut_ptr::<u8>();
        tracing::debug!("Allocated stub page at {:#x}", ptr as usize);
        self.pages.push(Page {
            allocation,
            used: size,
        });
        Ok(ptr)
    }
}

/// Machine code for the forwarding stub of vtable `slot`
///
/// # Arguments
/// * `bitness` - 32 for stdcall `this` on the stack, 64 for `this` in RCX
pub fn assemble_forwarder(bitness: u32, slot: usize) -> Result<Vec<u8>, HookError> {
    let assembly = |e: iced_x86::IcedError| HookError::Assembly(e.to_string());

    let instructions = match bitness {
        64 => vec![
            // mov rcx, [rcx + 8]
            Instruction::with2(
                Code::Mov_r64_rm64,
                Register::RCX,
                MemoryOperand::with_base_displ(Register::RCX, 8),
            )
            .map_err(assembly)?,
            // mov rax, [rcx]
            Instruction::with2(
                Code::Mov_r64_rm64,
                Register::RAX,
                MemoryOperand::with_base_displ(Register::RCX, 0),
            )
            .map_err(assembly)?,
            // jmp qword ptr [rax + slot * 8]
            Instruction::with1(
                Code::Jmp_rm64,
                MemoryOperand::with_base_displ(Register::RAX, (slot * 8) as i64),
            )
            .map_err(assembly)?,
        ],
        32 => vec![
            // mov eax, [esp + 4]
            Instruction::with2(
                Code::Mov_r32_rm32,
                Register::EAX,
                MemoryOperand::with_base_displ(Register::ESP, 4),
            )
            .map_err(assembly)?,
            // mov eax, [eax + 4]
            Instruction::with2(
                Code::Mov_r32_rm32,
                Register::EAX,
                MemoryOperand::with_base_displ(Register::EAX, 4),
            )
            .map_err(assembly)?,
            // mov [esp + 4], eax
            Instruction::with2(
                Code::Mov_rm32_r32,
                MemoryOperand::with_base_displ(Register::ESP, 4),
                Register::EAX,
            )
            .map_err(assembly)?,
            // mov ecx, [eax]
            Instruction::with2(
                Code::Mov_r32_rm32,
                Register::ECX,
                MemoryOperand::with_base_displ(Register::EAX, 0),
            )
            .map_err(assembly)?,
            // jmp dword ptr [ecx + slot * 4]
            Instruction::with1(
                Code::Jmp_rm32,
                MemoryOperand::with_base_displ(Register::ECX, (slot * 4) as i64),
            )
            .map_err(assembly)?,
        ],
        other => return Err(HookError::Assembly(format!("unsupported bitness {}", other))),
    };

    let block = InstructionBlock::new(&instructions, 0);
    let result =
        BlockEncoder::encode(bitness, block, BlockEncoderOptions::NONE).map_err(assembly)?;
    Ok(result.code_buffer)
}

/// Address of the executable forwarding stub for `slot`
///
/// Stubs are assembled on first use and live for the rest of the process.
pub fn forwarder(slot: usize) -> Result<usize, HookError> {
    let mut forwarders = FORWARDERS.lock();
    if let Some(&address) = forwarders.get(&slot) {
        return Ok(address);
    }

    let code = assemble_forwarder(usize::BITS, slot)?;
    let ptr = ALLOCATOR.lock().alloc(code.len())?;
    // SAFETY: ptr points at a fresh writable block of at least code.len() bytes
    unsafe {
        std::ptr::copy_nonoverlapping(code.as_ptr(), ptr, code.len());
    }
    flush_instruction_cache(ptr, code.len());

    let address = ptr as usize;
    forwarders.insert(slot, address);
    tracing::trace!("Forwarder for slot {} at {:#x}", slot, address);
    Ok(address)
}

#[cfg(windows)]
fn flush_instruction_cache(ptr: *const u8, len: usize) {
    use windows_sys::Win32::System::Diagnostics::Debug::FlushInstructionCache;
    use windows_sys::Win32::System::Threading::GetCurrentProcess;

    // SAFETY: the range was just written by this process
    unsafe {
        FlushInstructionCache(GetCurrentProcess(), ptr as *const _, len);
    }
}

#[cfg(not(windows))]
fn flush_instruction_cache(_ptr: *const u8, _len: usize) {}
