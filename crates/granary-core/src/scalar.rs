//! Scalar encodings for stored vector components.
//!
//! The scalar kind decides how vectors are held inside the index and on
//! disk. Encodings other than `F32` are lossy; search always decodes back
//! to f32 before computing distances, so the distance kernels stay in one
//! place.
//!
//! | Kind | Bytes per component | Notes |
//! |------|---------------------|-------|
//! | `F32` | 4 | exact |
//! | `F16` | 2 | IEEE binary16 via the `half` crate |
//! | `I8`  | 1 | symmetric quantization, components clamped to [-1, 1] |
//! | `B1`  | 1/8 | sign bit per component, Hamming metric only |

use half::f16;
use serde::{Deserialize, Serialize};

/// Numeric encoding of stored vector components.
///
/// The discriminant bytes returned by [`ScalarKind::to_code`] are part of
/// the persisted granule header and must never be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarKind {
    /// 32-bit float, exact.
    F32,
    /// 16-bit float, ~3 decimal digits of precision.
    F16,
    /// Signed 8-bit symmetric quantization of [-1, 1].
    I8,
    /// One bit per component (sign), 8 components per byte.
    B1,
}

impl ScalarKind {
    /// Returns the stable on-disk byte code for this scalar kind.
    #[must_use]
    pub const fn to_code(self) -> u8 {
        match self {
            Self::F32 => 0,
            Self::F16 => 1,
            Self::I8 => 2,
            Self::B1 => 3,
        }
    }

    /// Decodes an on-disk byte code, `None` for unknown codes.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::F32),
            1 => Some(Self::F16),
            2 => Some(Self::I8),
            3 => Some(Self::B1),
            _ => None,
        }
    }

    /// Returns the encoded size of one vector with `dimensions` components.
    #[must_use]
    pub const fn bytes_per_vector(self, dimensions: usize) -> usize {
        match self {
            Self::F32 => dimensions * 4,
            Self::F16 => dimensions * 2,
            Self::I8 => dimensions,
            Self::B1 => dimensions.div_ceil(8),
        }
    }

    /// Encodes one vector into its stored byte representation.
    #[must_use]
    pub fn encode(self, vector: &[f32]) -> Vec<u8> {
        match self {
            Self::F32 => {
                let mut out = Vec::with_capacity(vector.len() * 4);
                for &v in vector {
                    out.extend_from_slice(&v.to_le_bytes());
                }
                out
            }
            Self::F16 => {
                let mut out = Vec::with_capacity(vector.len() * 2);
                for &v in vector {
                    out.extend_from_slice(&f16::from_f32(v).to_le_bytes());
                }
                out
            }
            Self::I8 => {
                vector
                    .iter()
                    .map(|&v| {
                        let q = (v.clamp(-1.0, 1.0) * 127.0).round();
                        #[allow(clippy::cast_possible_truncation)]
                        let q = q as i8;
                        q as u8
                    })
                    .collect()
            }
            Self::B1 => {
                let mut out = vec![0u8; vector.len().div_ceil(8)];
                for (i, &v) in vector.iter().enumerate() {
                    if v > 0.0 {
                        out[i / 8] |= 1 << (i % 8);
                    }
                }
                out
            }
        }
    }

    /// Decodes one stored vector back to f32 components.
    ///
    /// `dimensions` is the configured vector width; `bytes` must have been
    /// produced by [`ScalarKind::encode`] with the same kind and width.
    #[must_use]
    pub fn decode(self, bytes: &[u8], dimensions: usize) -> Vec<f32> {
        match self {
            Self::F32 => bytes
                .chunks_exact(4)
                .take(dimensions)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            Self::F16 => bytes
                .chunks_exact(2)
                .take(dimensions)
                .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect(),
            Self::I8 => bytes
                .iter()
                .take(dimensions)
                .map(|&b| f32::from(b as i8) / 127.0)
                .collect(),
            Self::B1 => (0..dimensions)
                .map(|i| {
                    if bytes[i / 8] & (1 << (i % 8)) != 0 {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect(),
        }
    }
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::I8 => "i8",
            Self::B1 => "b1",
        };
        write!(f, "{name}")
    }
}
