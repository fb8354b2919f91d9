pub mod error;
pub mod lines;
pub mod xyz;
pub mod forces;
pub mod table;
pub mod ener;
pub mod cell;

pub use error::ParseError;
pub use lines::{LineReader, open_source};
pub use xyz::{StepBlock, XyzReader};
pub use forces::{ForceFormat, ForceReader, AtomicForcesReader};
pub use ener::{EnergyReader, EnergyRecord};
pub use cell::{CellReader, CellRecord};
