//! Bundle SKU decomposition.
//!
//! A bundle SKU encodes a base product and a pack size, e.g. `ABC**3` is three
//! units of `ABC`. Malformed bundles never fail the order: they fall back to a
//! multiplier of 1 and report a diagnostic.

use core::num::NonZeroU32;

/// Separator used by the marketplace between base SKU and multiplier.
pub const DEFAULT_BUNDLE_SEPARATOR: &str = "**";

/// Something odd about a bundle SKU worth surfacing to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleDiagnostic {
    /// More than one separator; only the last segment is read as multiplier.
    ExtraSeparators { segments: usize },
    /// The trailing segment is not a canonical positive integer.
    InvalidMultiplier { candidate: String },
}

impl core::fmt::Display for BundleDiagnostic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BundleDiagnostic::ExtraSeparators { segments } => {
                write!(f, "bundle sku contains more than 1 separator ({segments} segments)")
            }
            BundleDiagnostic::InvalidMultiplier { candidate } => {
                write!(f, "invalid bundle sku multiplier {candidate:?}, multiplier set to 1")
            }
        }
    }
}

/// Result of decomposing a SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSku {
    /// The SKU exactly as supplied.
    pub variation_sku: String,
    /// SKU with a valid multiplier suffix removed.
    pub base_sku: String,
    pub multiplier: NonZeroU32,
    pub diagnostics: Vec<BundleDiagnostic>,
}

impl BundleSku {
    pub fn is_bundle(&self) -> bool {
        self.multiplier.get() > 1 || self.base_sku != self.variation_sku
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier.get()
    }
}

/// Split `sku` into base SKU and multiplier.
pub fn decompose(sku: &str, separator: &str) -> BundleSku {
    let single = |diagnostics| BundleSku {
        variation_sku: sku.to_string(),
        base_sku: sku.to_string(),
        multiplier: NonZeroU32::MIN,
        diagnostics,
    };

    if separator.is_empty() {
        return single(Vec::new());
    }

    let mut segments: Vec<&str> = sku.split(separator).collect();
    if segments.len() == 1 {
        return single(Vec::new());
    }

    let mut diagnostics = Vec::new();
    if segments.len() > 2 {
        diagnostics.push(BundleDiagnostic::ExtraSeparators {
            segments: segments.len(),
        });
    }

    let candidate = segments.pop().unwrap_or_default();
    match canonical_multiplier(candidate) {
        Some(multiplier) => BundleSku {
            variation_sku: sku.to_string(),
            base_sku: segments.join(separator),
            multiplier,
            diagnostics,
        },
        None => {
            diagnostics.push(BundleDiagnostic::InvalidMultiplier {
                candidate: candidate.to_string(),
            });
            single(diagnostics)
        }
    }
}

/// A multiplier must be written exactly as its canonical decimal form:
/// no sign, no leading zeros, no whitespace, greater than zero.
fn canonical_multiplier(candidate: &str) -> Option<NonZeroU32> {
    let value: u32 = candidate.parse().ok()?;
    if value.to_string() != candidate {
        return None;
    }
    NonZeroU32::new(value)
}
