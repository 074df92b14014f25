//! Language items and default exception handlers

// When defmt feature is enabled on ARM targets, use defmt_rtt and panic_probe
#[cfg(all(feature = "defmt", target_arch = "arm"))]
use defmt_rtt as _;

#[cfg(all(feature = "defmt", target_arch = "arm"))]
use panic_probe as _;

// Defmt panic handler
#[cfg(all(feature = "defmt", target_arch = "arm"))]
#[defmt::panic_handler]
fn defmt_panic() -> ! {
    cortex_m::asm::udf()
}

// Other bare-metal builds halt on panic
#[cfg(all(target_os = "none", not(all(feature = "defmt", target_arch = "arm"))))]
use panic_halt as _;

// Default HardFault handler
#[cfg(all(feature = "port-cortex-m", target_arch = "arm"))]
#[cortex_m_rt::exception]
unsafe fn HardFault(_ef: &cortex_m_rt::ExceptionFrame) -> ! {
    loop { cortex_m::asm::udf(); }
}

// Log lines are stamped with the port's cycle counter
#[cfg(all(feature = "defmt", target_os = "none"))]
defmt::timestamp!("{=u32}", crate::ts::os_ts_get());
