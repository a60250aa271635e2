#![forbid(unsafe_code)]

pub mod algebra;
pub mod check;
mod dimension;
mod error;
pub mod lattice;
pub mod model;
pub mod surface;
mod unit;

pub use algebra::{divide, is_subtype, least_upper_bound, multiply};
pub use check::{check_solution, Violation};
pub use dimension::{BaseDimensions, RESERVED_COMPONENTS};
pub use error::{ArithmeticUnitError, ConfigurationError};
pub use lattice::{LatticeBuilder, UnitLattice};
pub use model::{
    BinaryOp, Constraint, ConstraintModel, LiteralKind, Location, Slot, SlotId, Solution,
};
pub use surface::{AliasTable, SurfaceMapper, SurfaceUnit};
pub use unit::{Unit, UnitVector};
