//! Kernel selection.
//!
//! This module provides:
//! - `Tier` for the instruction-set families that have compiled kernels
//! - `select()` returning the best `KernelHandle` for a metric and datatype
//! - `Dispatcher`, a pre-resolved table of handles for one allowed mask
//! - `default_dispatcher()`, the process-wide table built from the environment
//!
//! Selection is a pure function of `(kind, datatype, detected, allowed)`.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;
use crate::config::DispatchConfig;
use crate::detect::capabilities;
use crate::error::{Error, Result};
use crate::kernels::{serial, KernelFn};
use crate::metric::{DataType, MetricKind};
use crate::view::{Score, VectorView};

// =============================================================================
// Tiers
// =============================================================================

/// Instruction-set family a kernel was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Portable baseline, available everywhere.
    Serial,
    /// ARM Advanced SIMD (aarch64 only).
    Neon,
    /// AVX2 + FMA, with F16C for half precision (x86_64 only).
    Avx2,
    /// AVX-512 F + BW (x86_64 only).
    Avx512,
}

impl Tier {
    /// Tiers in the order selection tries them.
    pub const PREFERENCE: [Self; 4] = [Self::Avx512, Self::Avx2, Self::Neon, Self::Serial];

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Neon => "neon",
            Self::Avx2 => "avx2",
            Self::Avx512 => "avx512",
        }
    }

    /// Whether this tier's kernels are linked into the binary
    /// (matching target architecture and cargo feature enabled).
    #[must_use]
    pub const fn is_compiled(self) -> bool {
        match self {
            Self::Serial => true,
            Self::Neon => cfg!(all(target_arch = "aarch64", feature = "neon")),
            Self::Avx2 => cfg!(all(target_arch = "x86_64", feature = "avx2")),
            Self::Avx512 => cfg!(all(target_arch = "x86_64", feature = "avx512")),
        }
    }

    /// Capability bits that must be viable before this tier's kernels for
    /// `datatype` may run.
    #[must_use]
    pub const fn required(self, datatype: DataType) -> Capabilities {
        match (self, datatype) {
            (Self::Serial, _) => Capabilities::NONE,
            (Self::Neon, _) => Capabilities::NEON,
            (Self::Avx2, DataType::F16) => Capabilities::AVX2.union(Capabilities::AVX2_FP16),
            (Self::Avx2, _) => Capabilities::AVX2,
            (Self::Avx512, _) => Capabilities::AVX512,
        }
    }

    /// Kernel this tier implements for the pair, if any.
    pub(crate) fn resolve(self, kind: MetricKind, datatype: DataType) -> Option<KernelFn> {
        match self {
            Self::Serial => serial::resolve(kind, datatype),
            #[cfg(all(target_arch = "aarch64", feature = "neon"))]
            Self::Neon => crate::kernels::neon::resolve(kind, datatype),
            #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
            Self::Avx2 => crate::kernels::x86_avx2::resolve(kind, datatype),
            #[cfg(all(target_arch = "x86_64", feature = "avx512"))]
            Self::Avx512 => crate::kernels::x86_avx512::resolve(kind, datatype),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Walks [`Tier::PREFERENCE`] and returns the first compiled tier whose
/// required bits are all in `viable` and that has a kernel for the pair.
pub(crate) fn resolve(
    kind: MetricKind,
    datatype: DataType,
    viable: Capabilities,
) -> Option<(Tier, KernelFn)> {
    Tier::PREFERENCE
        .into_iter()
        .filter(|tier| tier.is_compiled() && viable.contains(tier.required(datatype)))
        .find_map(|tier| tier.resolve(kind, datatype).map(|kernel| (tier, kernel)))
}

// =============================================================================
// Kernel handles
// =============================================================================

/// A selected kernel: metric, datatype, tier and the function to call.
///
/// Handles are `Copy`, `'static` and never allocate when invoked.
#[derive(Clone, Copy)]
pub struct KernelHandle {
    kind: MetricKind,
    datatype: DataType,
    tier: Tier,
    kernel: KernelFn,
}

impl KernelHandle {
    /// Metric this handle computes.
    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Element type this handle accepts.
    #[must_use]
    pub const fn datatype(&self) -> DataType {
        self.datatype
    }

    /// Tier the kernel was compiled for.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Computes the metric over two views.
    ///
    /// # Errors
    ///
    /// - [`Error::DataTypeMismatch`] if either view is not of the handle's datatype
    /// - [`Error::DimensionMismatch`] if the views differ in length
    pub fn compute(&self, a: VectorView<'_>, b: VectorView<'_>) -> Result<Score> {
        for view in [a, b] {
            if view.datatype() != self.datatype {
                return Err(Error::DataTypeMismatch {
                    expected: self.datatype,
                    actual: view.datatype(),
                });
            }
        }
        if a.len() != b.len() {
            return Err(Error::DimensionMismatch {
                left: a.len(),
                right: b.len(),
            });
        }
        // SAFETY: lengths are equal, and the handle was only built after the
        // tier's capability bits were confirmed against the detected mask.
        unsafe { self.compute_unchecked(a, b) }
    }

    /// Computes the metric without comparing the two lengths.
    ///
    /// The view types are still matched against the kernel.
    ///
    /// # Safety
    ///
    /// `a.len() == b.len()` must hold; SIMD kernels read both slices up to
    /// the length of the first.
    pub unsafe fn compute_unchecked(&self, a: VectorView<'_>, b: VectorView<'_>) -> Result<Score> {
        let score = match (self.kernel, a, b) {
            (KernelFn::F64(f), VectorView::F64(a), VectorView::F64(b)) => Score::Real(f(a, b)),
            (KernelFn::F32(f), VectorView::F32(a), VectorView::F32(b)) => Score::Real(f(a, b)),
            (KernelFn::F16(f), VectorView::F16(a), VectorView::F16(b)) => Score::Real(f(a, b)),
            (KernelFn::I8(f), VectorView::I8(a), VectorView::I8(b)) => Score::Real(f(a, b)),
            (KernelFn::B1(f), VectorView::B1(a), VectorView::B1(b)) => Score::Real(f(a, b)),
            (KernelFn::B1Count(f), VectorView::B1(a), VectorView::B1(b)) => Score::Count(f(a, b)),
            (_, a, b) => {
                let actual = if a.datatype() == self.datatype {
                    b.datatype()
                } else {
                    a.datatype()
                };
                return Err(Error::DataTypeMismatch {
                    expected: self.datatype,
                    actual,
                });
            }
        };
        Ok(score)
    }
}

impl fmt::Debug for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelHandle")
            .field("kind", &self.kind)
            .field("datatype", &self.datatype)
            .field("tier", &self.tier)
            .finish_non_exhaustive()
    }
}

// Two handles for the same (kind, datatype, tier) always hold the same kernel.
impl PartialEq for KernelHandle {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.datatype == other.datatype && self.tier == other.tier
    }
}

impl Eq for KernelHandle {}

// =============================================================================
// Selection
// =============================================================================

/// Returns the best kernel for `kind` over `datatype` among the detected
/// capabilities that `allowed` permits.
///
/// An empty `allowed` mask always yields the serial tier.
///
/// # Errors
///
/// [`Error::UnsupportedMetric`] if no tier, the serial one included,
/// implements the pair.
///
/// # Example
///
/// ```
/// use vecmetric_core::{select, Capabilities, DataType, MetricKind, Score, VectorView};
///
/// let handle = select(MetricKind::InnerProduct, DataType::F32, Capabilities::all()).unwrap();
/// let a = [1.0_f32, 2.0, 3.0];
/// let b = [4.0_f32, 5.0, 6.0];
/// let score = handle.compute(VectorView::F32(&a), VectorView::F32(&b)).unwrap();
/// assert_eq!(score, Score::Real(32.0));
/// ```
pub fn select(kind: MetricKind, datatype: DataType, allowed: Capabilities) -> Result<KernelHandle> {
    select_viable(kind, datatype, capabilities() & allowed)
}

fn select_viable(kind: MetricKind, datatype: DataType, viable: Capabilities) -> Result<KernelHandle> {
    resolve(kind, datatype, viable)
        .map(|(tier, kernel)| KernelHandle {
            kind,
            datatype,
            tier,
            kernel,
        })
        .ok_or(Error::UnsupportedMetric { kind, datatype })
}

// =============================================================================
// Dispatch table
// =============================================================================

const KINDS: usize = MetricKind::ALL.len();
const DATATYPES: usize = DataType::ALL.len();

/// Pre-resolved handles for every `(kind, datatype)` pair under one allowed
/// mask; lookups are array indexing.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    allowed: Capabilities,
    viable: Capabilities,
    table: [[Option<KernelHandle>; DATATYPES]; KINDS],
}

impl Dispatcher {
    /// Builds the table for `allowed`, intersected with the detected capabilities.
    #[must_use]
    pub fn new(allowed: Capabilities) -> Self {
        let viable = capabilities() & allowed;
        let mut table = [[None; DATATYPES]; KINDS];
        for kind in MetricKind::ALL {
            for datatype in DataType::ALL {
                table[kind.index()][datatype.index()] = select_viable(kind, datatype, viable).ok();
            }
        }

        let kernels = table.iter().flatten().filter(|slot| slot.is_some()).count();
        tracing::debug!(%allowed, %viable, kernels, "built dispatch table");

        Self {
            allowed,
            viable,
            table,
        }
    }

    /// Builds the table for the mask carried by `config`.
    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.allowed)
    }

    /// Mask this dispatcher was built with.
    #[must_use]
    pub const fn allowed(&self) -> Capabilities {
        self.allowed
    }

    /// Detected capabilities restricted to [`Dispatcher::allowed`].
    #[must_use]
    pub const fn viable(&self) -> Capabilities {
        self.viable
    }

    /// Handle for the pair.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedMetric`] if no tier implements the pair.
    pub fn get(&self, kind: MetricKind, datatype: DataType) -> Result<KernelHandle> {
        self.table[kind.index()][datatype.index()].ok_or(Error::UnsupportedMetric { kind, datatype })
    }

    /// Looks up the handle for `kind` over the views' datatype and computes.
    ///
    /// # Errors
    ///
    /// Any error of [`Dispatcher::get`] or [`KernelHandle::compute`].
    pub fn compute(&self, kind: MetricKind, a: VectorView<'_>, b: VectorView<'_>) -> Result<Score> {
        self.get(kind, a.datatype())?.compute(a, b)
    }

    /// Every resolved handle, metric-major.
    pub fn handles(&self) -> impl Iterator<Item = KernelHandle> + '_ {
        self.table.iter().flatten().filter_map(|slot| *slot)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Capabilities::all())
    }
}

/// Process-wide dispatcher, built once from [`DispatchConfig::from_env`].
static DEFAULT_DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();

/// Returns the process-wide dispatcher, building it on first use.
#[must_use]
pub fn default_dispatcher() -> &'static Dispatcher {
    DEFAULT_DISPATCHER.get_or_init(|| Dispatcher::from_config(&DispatchConfig::from_env()))
}
