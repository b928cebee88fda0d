//! `weft` is an in-process data-parallel kernel execution engine: typed
//! fixed-length allocations, per-index kernel launches, and synchronous
//! invokable routines, all over a shared global scope.
//!
//! ## Key Components
//! 1. **Value Model**:
//!    - Scalar kinds (`char` through `double` plus `bool`) with C-style
//!      conversion semantics ([`num`]).
//!    - Fixed-width vectors of 2 to 4 lanes with swizzle access ([`value`],
//!      [`swizzle`]).
//!    - Ordered structs whose fields mutate independently, including
//!      fixed-size array fields.
//! 2. **Storage**:
//!    - [`alloc::Allocation`]: a typed, fixed-length element buffer with
//!      host-slice and raw-byte boundaries.
//!    - [`global::GlobalScope`]: named scalar/vector cells with atomic
//!      read-modify-write.
//! 3. **Execution Model**:
//!    - [`kernel::Kernel`]: an element-wise function launched once per index
//!      over whole allocations, optionally coordinate-aware.
//!    - [`kernel::Invokable`]: a routine called once with explicit arguments,
//!      free to launch kernels itself.
//!    - [`engine::Engine`]: the registries and driver-facing API tying it all
//!      together.
//!
//! Launches check lengths and element-type convertibility up front, treat
//! zero-length allocations as trivial successes, and report the first failing
//! element index. With the `rayon` feature (default) elements run in
//! parallel; results are written back in index order either way.

pub mod alloc;
pub mod dispatch;
pub mod engine;
pub mod global;
pub mod kernel;
pub mod num;
pub mod swizzle;
pub mod value;

pub use alloc::{AllocError, Allocation, AllocationHandle};
pub use dispatch::LaunchError;
pub use engine::{Engine, EngineError};
pub use global::{GlobalError, GlobalScope};
pub use kernel::{Invokable, InvokeArg, Kernel, KernelError, ParamType};
pub use num::{NumError, Scalar, ScalarData, ScalarType};
pub use swizzle::{Lane, Swizzle, SwizzleError};
pub use value::{
    ElementType, StructType, StructValue, Value, ValueError, Vector, VectorType,
};
