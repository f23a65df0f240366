//! Data layer: core types, decoding, and reshaping.
//!
//! Architecture:
//! ```text
//!  train/t10k *-ubyte(.gz)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │   idx     │  magic-checked header + u8 payload → Split
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │   Dataset     │  train + test Splits, labels aligned to samples
//!   └──────────────┘
//!        │
//!        ├──────────────┬───────────────┐
//!        ▼              ▼               ▼
//!   ┌─────────┐   ┌──────────┐   ┌──────────┐
//!   │ labels   │→ │  reduce   │   │ shuffle   │
//!   └─────────┘   └──────────┘   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  export   │  CSV rows / snapshot blob
//!   └──────────┘
//! ```

pub mod export;
pub mod idx;
pub mod labels;
pub mod model;
pub mod reduce;
pub mod shuffle;
