//! Intrinsics for panic handling

/// Required to handle panics
#[cfg(all(feature = "panic_handler", target_arch = "arm", not(test)))]
#[panic_handler]
fn rust_begin_unwind(info: &core::panic::PanicInfo) -> ! {
    log::error!("KERNEL PANIC: {}", info);
    log::error!("HALT");
    crate::arch::arm::halt()
}
