//! Runtime capability detection.
//!
//! [`detect`] queries the executing CPU; [`capabilities`] caches the answer
//! for the lifetime of the process. A probe that cannot run reports the
//! feature as absent, it never faults.

use std::sync::OnceLock;

use crate::capability::Capabilities;

/// Cached capabilities - detected once at first use.
static CAPABILITIES: OnceLock<Capabilities> = OnceLock::new();

/// Returns the cached capability mask of the running CPU.
#[inline]
#[must_use]
pub fn capabilities() -> Capabilities {
    *CAPABILITIES.get_or_init(|| {
        let detected = detect();
        tracing::debug!(capabilities = %detected, bits = detected.bits(), "detected CPU capabilities");
        detected
    })
}

/// Queries the running CPU without consulting the cache.
#[must_use]
pub fn detect() -> Capabilities {
    #[cfg(target_arch = "x86_64")]
    {
        return x86::detect();
    }

    #[cfg(target_arch = "aarch64")]
    {
        return arm::detect();
    }

    #[allow(unreachable_code)]
    Capabilities::NONE
}

#[cfg(target_arch = "x86_64")]
pub(crate) mod x86 {
    use std::arch::x86_64::{__cpuid_count, __get_cpuid_max, _xgetbv};

    use crate::capability::Capabilities;

    #[derive(Clone, Copy)]
    enum Register {
        Ebx,
        Ecx,
        Edx,
    }

    /// One `(leaf, register, bit)` triple of the CPUID feature map.
    #[derive(Clone, Copy)]
    struct CpuidProbe {
        leaf: u32,
        register: Register,
        bit: u32,
    }

    const FMA: CpuidProbe = CpuidProbe {
        leaf: 1,
        register: Register::Ecx,
        bit: 12,
    };
    const OSXSAVE: CpuidProbe = CpuidProbe {
        leaf: 1,
        register: Register::Ecx,
        bit: 27,
    };
    const F16C: CpuidProbe = CpuidProbe {
        leaf: 1,
        register: Register::Ecx,
        bit: 29,
    };
    const AVX2: CpuidProbe = CpuidProbe {
        leaf: 7,
        register: Register::Ebx,
        bit: 5,
    };
    const AVX512F: CpuidProbe = CpuidProbe {
        leaf: 7,
        register: Register::Ebx,
        bit: 16,
    };
    const AVX512BW: CpuidProbe = CpuidProbe {
        leaf: 7,
        register: Register::Ebx,
        bit: 30,
    };
    const AVX512FP16: CpuidProbe = CpuidProbe {
        leaf: 7,
        register: Register::Edx,
        bit: 23,
    };
    const AMX_TILE: CpuidProbe = CpuidProbe {
        leaf: 7,
        register: Register::Edx,
        bit: 24,
    };

    impl CpuidProbe {
        fn read(self, max_leaf: u32) -> bool {
            if self.leaf > max_leaf {
                return false;
            }
            // SAFETY: CPUID exists on every x86_64 processor and the leaf is
            // bounded by the maximum basic leaf reported by the CPU.
            #[allow(unused_unsafe)]
            let regs = unsafe { __cpuid_count(self.leaf, 0) };
            let value = match self.register {
                Register::Ebx => regs.ebx,
                Register::Ecx => regs.ecx,
                Register::Edx => regs.edx,
            };
            value & (1 << self.bit) != 0
        }
    }

    /// XCR0 bits 17 (XTILECFG) and 18 (XTILEDATA).
    const XCR0_AMX_TILE: u64 = (1 << 17) | (1 << 18);

    #[target_feature(enable = "xsave")]
    unsafe fn xcr0() -> u64 {
        _xgetbv(0)
    }

    /// Whether the OS saves AMX tile state. `xgetbv` faults unless OSXSAVE
    /// is set, so that bit is checked first.
    pub(crate) fn os_enables_amx_tiles() -> bool {
        // SAFETY: leaf 0 is always valid.
        #[allow(unused_unsafe)]
        let (max_leaf, _) = unsafe { __get_cpuid_max(0) };
        if !OSXSAVE.read(max_leaf) {
            return false;
        }
        // SAFETY: OSXSAVE implies XSAVE support and an OS-enabled XGETBV.
        let xcr0 = unsafe { xcr0() };
        xcr0 & XCR0_AMX_TILE == XCR0_AMX_TILE
    }

    pub(super) fn detect() -> Capabilities {
        // SAFETY: leaf 0 is always valid.
        #[allow(unused_unsafe)]
        let (max_leaf, _) = unsafe { __get_cpuid_max(0) };
        let has = |probe: CpuidProbe| probe.read(max_leaf);

        // CPUID reports silicon support; the std probes also confirm that the
        // OS saves the wider register state (XCR0), without which the
        // instructions fault.
        let avx2 = has(AVX2)
            && has(FMA)
            && is_x86_feature_detected!("avx2")
            && is_x86_feature_detected!("fma");
        let f16c = has(F16C) && is_x86_feature_detected!("f16c");
        let avx512f = has(AVX512F) && is_x86_feature_detected!("avx512f");
        let avx512bw = has(AVX512BW) && is_x86_feature_detected!("avx512bw");

        let mut caps = Capabilities::NONE;
        caps.set(Capabilities::AVX2, avx2);
        caps.set(Capabilities::AVX2_FP16, avx2 && f16c);
        caps.set(Capabilities::AVX512, avx512f && avx512bw);
        caps.set(Capabilities::AVX512_FP16, avx512f && has(AVX512FP16));
        caps.set(Capabilities::AMX, has(AMX_TILE) && os_enables_amx_tiles());
        caps
    }
}

#[cfg(target_arch = "aarch64")]
mod arm {
    use crate::capability::Capabilities;

    pub(super) fn detect() -> Capabilities {
        // Every 64-bit Arm core implements Advanced SIMD. SVE and SVE2 come
        // from the OS hwcaps; the ID registers themselves are EL1-only. SME
        // has no portable probe here and stays absent.
        let mut caps = Capabilities::NEON;
        caps.set(
            Capabilities::SVE,
            std::arch::is_aarch64_feature_detected!("sve"),
        );
        caps.set(
            Capabilities::SVE2,
            std::arch::is_aarch64_feature_detected!("sve2"),
        );
        caps
    }
}
