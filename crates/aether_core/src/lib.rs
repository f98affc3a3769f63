//! The `aether_core` crate simulates the Aether sandpile automaton seeded with a single
//! source at the origin of an n-dimensional integer lattice.
//!
//! Only the fundamental domain of the lattice's symmetry group is stored, sliced by
//! the outermost coordinate and grouped into blocks, so grids far larger than memory
//! can be evolved with two blocks resident at a time.
//!
//! Key components:
//! - **Traits**: `Quantity` (value type abstraction), `EvolvingModel` (stepping and point queries), `RegionProcessor` (per-step observers).
//! - **Domain**: canonical points, symmetry counts and the folded neighbor slots of each canonical point.
//! - **Topple**: the single-cell distribution rule shared by the folded and unfolded models.
//! - **Storage**: slices, blocks, their binary encoding and the paged store over disk or memory.
//! - **Automaton**: the out-of-core `Aether` model with backups and restore.
pub mod automaton;
pub mod block;
pub mod codec;
pub mod domain;
pub mod error;
pub mod explicit;
pub mod limits;
pub mod quantity;
pub mod region;
pub mod slice;
pub mod storage;
pub mod store;
pub mod topple;
pub mod traits;

pub use automaton::{Aether, RunProperties, SimulationSettings};
pub use block::BlockRange;
pub use error::{AetherError, Result};
pub use explicit::ExplicitAether;
pub use region::GridRegion;
pub use storage::{BlockStorage, DirectoryStorage, MemoryStorage};
pub use traits::{EvolvingModel, Quantity, RegionProcessor};
