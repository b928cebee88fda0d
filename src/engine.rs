use std::sync::{Arc, RwLock};

use itertools::izip;
use rustc_hash::FxHashMap as HashMap;
use thiserror::Error;

use crate::{
    alloc::{AllocError, Allocation, AllocationHandle},
    dispatch::{self, LaunchError},
    global::{GlobalError, GlobalScope},
    kernel::{Invokable, InvokeArg, Kernel, KernelError, ParamType},
    num::ScalarData,
    value::{ElementType, Value, ValueError},
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown kernel: {0}")]
    UnknownKernel(String),
    #[error("unknown invokable: {0}")]
    UnknownInvokable(String),
    #[error("unknown allocation: {0:?}")]
    UnknownAllocation(AllocationHandle),
    #[error("duplicate kernel: {0}")]
    DuplicateKernel(String),
    #[error("duplicate invokable: {0}")]
    DuplicateInvokable(String),
    #[error("invoke arity error: routine {0} takes {1} arguments, got {2}")]
    Arity(String, usize, usize),
    #[error("invoke argument error: routine {0} argument {1} mismatches its declared parameter")]
    Argument(String, usize),
    #[error("routine {name} failed: {source}")]
    InvokableFailed { name: String, source: KernelError },
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Global(#[from] GlobalError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

impl From<EngineError> for KernelError {
    fn from(value: EngineError) -> Self {
        Self::new(value.to_string())
    }
}

enum Source {
    Owned(Allocation),
    Shared(Arc<RwLock<Allocation>>),
}

/// The in-process execution engine: kernel and routine registries, the
/// global scope, and the allocation pool. Registration happens once up
/// front (`&mut self`); launches, invokes, and peeks run on `&self`.
///
/// Engines are self-contained; several can coexist in one process.
#[derive(Debug, Default)]
pub struct Engine {
    kernels: HashMap<String, Kernel>,
    invokables: HashMap<String, Invokable>,
    globals: GlobalScope,
    allocations: RwLock<HashMap<AllocationHandle, Arc<RwLock<Allocation>>>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kernel. Malformed descriptors and duplicate names are
    /// rejected immediately, never deferred to launch time.
    pub fn define_kernel(&mut self, kernel: Kernel) -> Result<(), EngineError> {
        kernel.validate()?;
        if self.kernels.contains_key(kernel.name()) {
            return Err(EngineError::DuplicateKernel(kernel.name().into()));
        }
        log::debug!("register kernel {}", kernel.name());
        self.kernels.insert(kernel.name().into(), kernel);
        Ok(())
    }

    /// Registers an invokable routine.
    pub fn define_invokable(&mut self, invokable: Invokable) -> Result<(), EngineError> {
        invokable.validate()?;
        if self.invokables.contains_key(invokable.name()) {
            return Err(EngineError::DuplicateInvokable(invokable.name().into()));
        }
        log::debug!("register invokable {}", invokable.name());
        self.invokables.insert(invokable.name().into(), invokable);
        Ok(())
    }

    /// Defines a scalar or vector global with its initial value.
    pub fn define_global(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), EngineError> {
        Ok(self.globals.define(name, value)?)
    }

    #[inline]
    pub fn globals(&self) -> &GlobalScope {
        &self.globals
    }

    pub fn read_global(&self, name: &str) -> Result<Value, EngineError> {
        Ok(self.globals.read(name)?)
    }

    pub fn write_global(&self, name: &str, value: Value) -> Result<(), EngineError> {
        Ok(self.globals.write(name, value)?)
    }

    /// Creates an allocation of `len` elements, zero-filled or from initial
    /// values whose count must match `len`.
    pub fn create_allocation(
        &self,
        r#type: ElementType,
        len: usize,
        data: Option<Vec<Value>>,
    ) -> Result<AllocationHandle, EngineError> {
        r#type.validate_element()?;
        let allocation = match data {
            None => Allocation::new(r#type, len),
            Some(data) if data.len() != len => {
                return Err(AllocError::InvalidLength(len, data.len()).into());
            }
            Some(data) => Allocation::with_data(r#type, data)?,
        };
        Ok(self.register(allocation))
    }

    /// Creates a scalar allocation straight from a host slice.
    pub fn create_allocation_from_slice<T: ScalarData>(&self, data: &[T]) -> AllocationHandle {
        self.register(Allocation::from_slice(data))
    }

    fn register(&self, allocation: Allocation) -> AllocationHandle {
        let id = uid::Id::new();
        self.allocations
            .write()
            .expect("failed to lock")
            .insert(id, Arc::new(RwLock::new(allocation)));
        id
    }

    fn fetch(&self, id: AllocationHandle) -> Result<Arc<RwLock<Allocation>>, EngineError> {
        self.allocations
            .read()
            .expect("failed to lock")
            .get(&id)
            .cloned()
            .ok_or(EngineError::UnknownAllocation(id))
    }

    /// Snapshots an allocation for external inspection.
    pub fn allocation(&self, id: AllocationHandle) -> Result<Allocation, EngineError> {
        Ok(self.fetch(id)?.read().expect("failed to lock").clone())
    }

    /// Reads an allocation back as a host vector.
    pub fn read_allocation<T: ScalarData>(
        &self,
        id: AllocationHandle,
    ) -> Result<Vec<T>, EngineError> {
        Ok(self.fetch(id)?.read().expect("failed to lock").to_vec()?)
    }

    pub fn get_element(&self, id: AllocationHandle, index: usize) -> Result<Value, EngineError> {
        Ok(self.fetch(id)?.read().expect("failed to lock").get(index)?)
    }

    pub fn set_element(
        &self,
        id: AllocationHandle,
        index: usize,
        value: Value,
    ) -> Result<(), EngineError> {
        Ok(self
            .fetch(id)?
            .write()
            .expect("failed to lock")
            .set(index, value)?)
    }

    pub fn free_allocation(&self, id: AllocationHandle) -> Result<(), EngineError> {
        self.allocations
            .write()
            .expect("failed to lock")
            .remove(&id)
            .map(|_| ())
            .ok_or(EngineError::UnknownAllocation(id))
    }

    /// Launches a kernel across every index of the given allocations.
    /// Precondition failures are reported before any element is written.
    ///
    /// An input handle that aliases the output is snapshotted first, so a
    /// kernel may map an allocation onto itself.
    pub fn launch(
        &self,
        name: &str,
        inputs: &[AllocationHandle],
        output: AllocationHandle,
    ) -> Result<(), EngineError> {
        let kernel = self
            .kernels
            .get(name)
            .ok_or_else(|| EngineError::UnknownKernel(name.into()))?;

        let sources: Vec<Source> = inputs
            .iter()
            .map(|&id| {
                let source = self.fetch(id)?;
                Ok(match id == output {
                    true => Source::Owned(source.read().expect("failed to lock").clone()),
                    false => Source::Shared(source),
                })
            })
            .collect::<Result<_, EngineError>>()?;
        let guards: Vec<_> = sources
            .iter()
            .map(|source| match source {
                Source::Shared(arc) => Some(arc.read().expect("failed to lock")),
                Source::Owned(_) => None,
            })
            .collect();
        let refs: Vec<&Allocation> = izip!(&sources, &guards)
            .map(|(source, guard)| match (source, guard) {
                (Source::Owned(allocation), _) => allocation,
                (Source::Shared(_), Some(guard)) => &**guard,
                (Source::Shared(_), None) => unreachable!(),
            })
            .collect();

        let out = self.fetch(output)?;
        let mut out = out.write().expect("failed to lock");

        log::trace!("launch kernel {name} over {} elements", out.len());
        dispatch::launch(kernel, &self.globals, &refs, &mut out).map_err(|err| {
            log::error!("launch {name} failed: {err}");
            EngineError::Launch(err)
        })
    }

    /// Invokes a routine synchronously. Value arguments are converted to the
    /// declared parameter types; allocation arguments must name live
    /// allocations.
    pub fn invoke(
        &self,
        name: &str,
        args: &[InvokeArg],
    ) -> Result<Option<Value>, EngineError> {
        let invokable = self
            .invokables
            .get(name)
            .ok_or_else(|| EngineError::UnknownInvokable(name.into()))?;
        let params = invokable.params();
        if args.len() != params.len() {
            return Err(EngineError::Arity(name.into(), params.len(), args.len()));
        }
        let args: Vec<InvokeArg> = izip!(params, args)
            .enumerate()
            .map(|(index, (param, arg))| match (param, arg) {
                (ParamType::Value(r#type), InvokeArg::Value(value)) => {
                    let value = value
                        .convert(r#type)
                        .map_err(|_| EngineError::Argument(name.into(), index))?;
                    Ok(InvokeArg::Value(value))
                }
                (ParamType::Allocation, InvokeArg::Allocation(id)) => {
                    self.fetch(*id)?;
                    Ok(InvokeArg::Allocation(*id))
                }
                _ => Err(EngineError::Argument(name.into(), index)),
            })
            .collect::<Result<_, _>>()?;

        log::trace!("invoke routine {name}");
        invokable.run(self, &args).map_err(|source| {
            log::error!("routine {name} failed: {source}");
            EngineError::InvokableFailed {
                name: name.into(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use itertools::Itertools;

    use super::{Engine, EngineError};
    use crate::{
        alloc::Allocation,
        kernel::{Invokable, InvokeArg, Kernel, KernelError},
        num::{Scalar, ScalarData, ScalarType},
        value::{ElementType, StructType, StructValue, Value, Vector, VectorType},
    };

    fn square_kernel() -> Kernel {
        Kernel::new("square_kernel", ElementType::Scalar(ScalarType::U32), |_, args| {
            let x = args[0].clone().try_into_scalar()?.convert(ScalarType::U32);
            Ok(x.try_mul(x)?.into())
        })
        .with_input(ElementType::Scalar(ScalarType::U16))
    }

    #[test]
    fn test_square_kernel() -> Result<(), Box<dyn Error>> {
        let mut engine = Engine::new();
        engine.define_kernel(square_kernel())?;

        let input = engine.create_allocation_from_slice(&[0u16, 1, 2, 3]);
        let output = engine.create_allocation(ElementType::Scalar(ScalarType::U32), 4, None)?;

        engine.launch("square_kernel", &[input], output)?;
        assert_eq!(engine.read_allocation::<u32>(output)?, vec![0, 1, 4, 9]);
        Ok(())
    }

    #[test]
    fn test_swizzle_kernel() -> Result<(), Box<dyn Error>> {
        let mut engine = Engine::new();
        let wzyx = "wzyx".parse()?;
        engine.define_kernel(
            Kernel::new(
                "swizzle_kernel",
                ElementType::vector(ScalarType::U8, 4),
                move |_, args| {
                    let v = args[0].clone().try_into_vector()?;
                    Ok(v.swizzle(&wzyx)?.into())
                },
            )
            .with_input(ElementType::vector(ScalarType::U8, 4)),
        )?;

        let r#type = ElementType::vector(ScalarType::U8, 4);
        let value = Vector::from_array([10u8, 20, 30, 40]);
        let input = engine.create_allocation(r#type.clone(), 1, Some(vec![value.into()]))?;
        let output = engine.create_allocation(r#type, 1, None)?;

        engine.launch("swizzle_kernel", &[input], output)?;
        assert_eq!(
            engine.get_element(output, 0)?,
            Value::Vector(Vector::from_array([40u8, 30, 20, 10]))
        );
        Ok(())
    }

    #[test]
    fn test_add_to_global() -> Result<(), Box<dyn Error>> {
        let mut engine = Engine::new();
        engine.define_global("glob", Value::Scalar(Scalar::I32(123)))?;
        engine.define_invokable(
            Invokable::new("addToGlobal", |engine, args| {
                let arg = args[0].clone().try_into_value()?.try_into_scalar()?;
                engine.globals().update("glob", |v| {
                    Ok(v.clone().try_into_scalar()?.try_add(arg)?.into())
                })?;
                Ok(None)
            })
            .with_value_param(ElementType::Scalar(ScalarType::I32)),
        )?;

        engine.invoke("addToGlobal", &[Scalar::I32(5).into()])?;
        engine.invoke("addToGlobal", &[Scalar::I32(5).into()])?;
        assert_eq!(engine.read_global("glob")?, Value::Scalar(Scalar::I32(133)));

        // The routine's writes are visible to every element of a later launch.
        engine.define_kernel(Kernel::new(
            "read_glob",
            ElementType::Scalar(ScalarType::I32),
            |globals, _| Ok(globals.read("glob")?),
        ))?;
        let output = engine.create_allocation(ElementType::Scalar(ScalarType::I32), 3, None)?;
        engine.launch("read_glob", &[], output)?;
        assert_eq!(engine.read_allocation::<i32>(output)?, vec![133, 133, 133]);
        Ok(())
    }

    fn complex_struct() -> StructType {
        StructType::new([
            (
                "s",
                ElementType::Struct(StructType::new([
                    ("i", ElementType::Scalar(ScalarType::I32)),
                    ("j", ElementType::Scalar(ScalarType::U32)),
                ])),
            ),
            ("c", ElementType::vector(ScalarType::U8, 4)),
            (
                "f",
                ElementType::array(ElementType::Scalar(ScalarType::F32), 2),
            ),
        ])
    }

    #[test]
    fn test_struct_kernel() -> Result<(), Box<dyn Error>> {
        let mut engine = Engine::new();
        let r#type = ElementType::Struct(complex_struct());
        engine.define_kernel(
            Kernel::new("struct_kernel", r#type.clone(), |_, args| {
                let x = args[1].clone().try_into_scalar()?;
                let xf = x.convert(ScalarType::F32);
                let s = StructValue::new([
                    ("i", Value::Scalar(x.convert(ScalarType::I32))),
                    ("j", Value::Scalar(x)),
                ]);
                let c = Vector::new(
                    ScalarType::U8,
                    [
                        x.try_rem(Scalar::U32(128))?,
                        Scalar::U8(b'A'),
                        Scalar::U8(b'B'),
                        Scalar::U8(b'C'),
                    ],
                );
                let f = Value::Array(vec![
                    xf.into(),
                    xf.try_add(Scalar::F32(0.5))?.into(),
                ]);
                Ok(Value::Struct(StructValue::new([
                    ("s", s.into()),
                    ("c", c.into()),
                    ("f", f),
                ])))
            })
            .with_input(r#type.clone())
            .with_coord(),
        )?;

        let input = engine.create_allocation(r#type.clone(), 8, None)?;
        let output = engine.create_allocation(r#type, 8, None)?;
        engine.launch("struct_kernel", &[input], output)?;

        let element = engine.get_element(output, 7)?.try_into_struct()?;
        let s = element.field("s")?.clone().try_into_struct()?;
        assert_eq!(*s.field("i")?, Value::Scalar(Scalar::I32(7)));
        assert_eq!(*s.field("j")?, Value::Scalar(Scalar::U32(7)));
        assert_eq!(
            *element.field("c")?,
            Value::Vector(Vector::from_array([7u8, b'A', b'B', b'C']))
        );
        assert_eq!(
            *element.field("f")?,
            Value::Array(vec![
                Value::Scalar(Scalar::F32(7.0)),
                Value::Scalar(Scalar::F32(7.5)),
            ])
        );
        Ok(())
    }

    #[test]
    fn test_zero_length_launch() -> Result<(), Box<dyn Error>> {
        let mut engine = Engine::new();
        engine.define_kernel(square_kernel())?;
        let input = engine.create_allocation(ElementType::Scalar(ScalarType::U16), 0, None)?;
        let output = engine.create_allocation(ElementType::Scalar(ScalarType::U32), 0, None)?;
        engine.launch("square_kernel", &[input], output)?;
        assert_eq!(engine.read_allocation::<u32>(output)?, Vec::<u32>::new());
        Ok(())
    }

    #[test]
    fn test_script_invoke() -> Result<(), Box<dyn Error>> {
        // `script_invoke(rs_allocation out, rs_allocation in)` launching a
        // kernel from inside a routine.
        let mut engine = Engine::new();
        engine.define_kernel(square_kernel())?;
        engine.define_invokable(
            Invokable::new("script_invoke", |engine, args| {
                let out = args[0].clone().try_into_allocation()?;
                let input = args[1].clone().try_into_allocation()?;
                engine.launch("square_kernel", &[input], out)?;
                Ok(None)
            })
            .with_allocation_param()
            .with_allocation_param(),
        )?;

        let input = engine.create_allocation_from_slice(&[3u16, 5]);
        let output = engine.create_allocation(ElementType::Scalar(ScalarType::U32), 2, None)?;
        engine.invoke("script_invoke", &[output.into(), input.into()])?;
        assert_eq!(engine.read_allocation::<u32>(output)?, vec![9, 25]);
        Ok(())
    }

    #[test]
    fn test_order_independence() -> Result<(), Box<dyn Error>> {
        // For a global-free kernel the launch result is identical to any
        // sequential evaluation order, here a shuffled one.
        let body = |x: i64| x.wrapping_mul(x).wrapping_add(1);

        let mut engine = Engine::new();
        engine.define_kernel(
            Kernel::new("affine", ElementType::Scalar(ScalarType::I64), move |_, args| {
                let x = args[0].clone().try_into_scalar()?;
                Ok(x.try_mul(x)?.try_add(Scalar::I64(1))?.into())
            })
            .with_input(ElementType::Scalar(ScalarType::I64)),
        )?;

        let data = (-50..50i64).collect_vec();
        let input = engine.create_allocation_from_slice(&data);
        let output = engine.create_allocation(ElementType::Scalar(ScalarType::I64), 100, None)?;
        engine.launch("affine", &[input], output)?;

        let mut reference = Allocation::new(ElementType::Scalar(ScalarType::I64), 100);
        let mut order = (0..100usize).collect_vec();
        fastrand::seed(42);
        fastrand::shuffle(&mut order);
        for index in order {
            reference.set(index, Scalar::I64(body(data[index])).into())?;
        }
        assert_eq!(
            engine.read_allocation::<i64>(output)?,
            reference.to_vec::<i64>()?
        );
        Ok(())
    }

    #[test]
    fn test_helper_mutation_stays_local() -> Result<(), Box<dyn Error>> {
        // Helpers mutate caller locals through `&mut` parameters; nothing
        // escapes the element's own invocation.
        fn is_neg(a: i32) -> bool {
            a < 0
        }
        fn is_pos(a: i32) -> bool {
            a > 0
        }
        fn set_i(a: &mut i32, b: i32) {
            *a = b;
        }
        fn modify_f(f: &mut f32) {
            *f *= 0.5;
        }
        fn modify_i(i: &mut i32) {
            let j = *i;
            let cutoff = 2 << 6;
            let j = j.min(cutoff);
            if is_neg(j) {
                set_i(i, 0);
            } else if is_pos(j) {
                set_i(i, j);
            } else {
                set_i(i, cutoff);
            }
        }

        let mut engine = Engine::new();
        engine.define_kernel(
            Kernel::new("simple_kernel", ElementType::Scalar(ScalarType::I32), |_, args| {
                let input = args[0].clone().try_into_scalar()?;
                let Scalar::I32(x) = input else {
                    return Err(KernelError::new("expect an int"));
                };
                let mut i = x;
                let mut f = x as f32;
                modify_f(&mut f);
                modify_i(&mut i);
                let ret = f as i32;
                Ok(Scalar::I32(x.wrapping_mul(ret)).into())
            })
            .with_input(ElementType::Scalar(ScalarType::I32)),
        )?;

        let input = engine.create_allocation_from_slice(&[-2i32, 0, 3, 1000]);
        let output = engine.create_allocation(ElementType::Scalar(ScalarType::I32), 4, None)?;
        engine.launch("simple_kernel", &[input], output)?;
        assert_eq!(
            engine.read_allocation::<i32>(output)?,
            vec![2, 0, 3, 500 * 1000]
        );
        Ok(())
    }

    #[test]
    fn test_add_half_kernel() -> Result<(), Box<dyn Error>> {
        // double3 result built from the first three lanes of a double4.
        fn half_helper(x: f64) -> f64 {
            x + 0.5
        }

        let mut engine = Engine::new();
        engine.define_kernel(
            Kernel::new(
                "add_half_kernel",
                ElementType::vector(ScalarType::F64, 3),
                |_, args| {
                    let v = args[0].clone().try_into_vector()?;
                    let lanes: Vec<f64> = (0..3)
                        .map(|i| Ok(f64::from_scalar(v.lane(i)?)))
                        .collect::<Result<_, KernelError>>()?;
                    Ok(Vector::new(
                        ScalarType::F64,
                        lanes.into_iter().map(|x| Scalar::F64(half_helper(x))),
                    )
                    .into())
                },
            )
            .with_input(ElementType::vector(ScalarType::F64, 4)),
        )?;

        let r#in = ElementType::vector(ScalarType::F64, 4);
        let out = ElementType::vector(ScalarType::F64, 3);
        let value = Vector::from_array([1.0f64, 2.0, 3.0, 4.0]);
        let input = engine.create_allocation(r#in, 1, Some(vec![value.into()]))?;
        let output = engine.create_allocation(out, 1, None)?;
        engine.launch("add_half_kernel", &[input], output)?;

        assert_eq!(
            engine.get_element(output, 0)?,
            Value::Vector(Vector::from_array([1.5f64, 2.5, 3.5]))
        );
        Ok(())
    }

    #[test]
    fn test_vector_global_visible_to_all_elements() -> Result<(), Box<dyn Error>> {
        // `float4 gColor` read by every element, packed back to uchar4.
        let mut engine = Engine::new();
        engine.define_global(
            "gColor",
            Value::Vector(Vector::from_array([0.299f32, 0.587, 0.114, 1.0])),
        )?;
        engine.define_kernel(
            Kernel::new(
                "color_kernel",
                ElementType::vector(ScalarType::U8, 4),
                |globals, _| {
                    let color = globals.read("gColor")?.try_into_vector()?;
                    let packed = color
                        .map(|x| x.try_mul(Scalar::F32(255.0))?.try_add(Scalar::F32(0.5)))?
                        .convert(VectorType::new(ScalarType::U8, 4))?;
                    Ok(packed.into())
                },
            )
            .with_input(ElementType::vector(ScalarType::U8, 4)),
        )?;

        let r#type = ElementType::vector(ScalarType::U8, 4);
        let input = engine.create_allocation(r#type.clone(), 16, None)?;
        let output = engine.create_allocation(r#type, 16, None)?;
        engine.launch("color_kernel", &[input], output)?;

        let expect = Value::Vector(Vector::from_array([76u8, 150, 29, 255]));
        for index in 0..16 {
            assert_eq!(engine.get_element(output, index)?, expect);
        }
        Ok(())
    }

    #[test]
    fn test_launch_onto_itself() -> Result<(), Box<dyn Error>> {
        // The aliased input is snapshotted, so in-place mapping works.
        let mut engine = Engine::new();
        engine.define_kernel(
            Kernel::new("incr", ElementType::Scalar(ScalarType::I32), |_, args| {
                let x = args[0].clone().try_into_scalar()?;
                Ok(x.try_add(Scalar::I32(1))?.into())
            })
            .with_input(ElementType::Scalar(ScalarType::I32)),
        )?;
        let buffer = engine.create_allocation_from_slice(&[1i32, 2, 3]);
        engine.launch("incr", &[buffer], buffer)?;
        assert_eq!(engine.read_allocation::<i32>(buffer)?, vec![2, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_registration_and_lookup_errors() -> Result<(), Box<dyn Error>> {
        let mut engine = Engine::new();
        engine.define_kernel(square_kernel())?;
        assert!(matches!(
            engine.define_kernel(square_kernel()),
            Err(EngineError::DuplicateKernel(_))
        ));
        assert!(matches!(
            engine.launch("nope", &[], engine.create_allocation_from_slice(&[0u32])),
            Err(EngineError::UnknownKernel(_))
        ));
        assert!(matches!(
            engine.invoke("nope", &[]),
            Err(EngineError::UnknownInvokable(_))
        ));

        // A freed allocation is gone.
        let id = engine.create_allocation_from_slice(&[1i32]);
        engine.free_allocation(id)?;
        assert!(matches!(
            engine.read_allocation::<i32>(id),
            Err(EngineError::UnknownAllocation(_))
        ));

        // Initializer data must match the declared length.
        assert!(matches!(
            engine.create_allocation(
                ElementType::Scalar(ScalarType::I32),
                3,
                Some(vec![Scalar::I32(1).into()]),
            ),
            Err(EngineError::Alloc(_))
        ));
        Ok(())
    }

    #[test]
    fn test_invoke_argument_checks() -> Result<(), Box<dyn Error>> {
        let mut engine = Engine::new();
        engine.define_invokable(
            Invokable::new("routine", |_, args| {
                Ok(Some(args[0].clone().try_into_value()?))
            })
            .with_value_param(ElementType::Scalar(ScalarType::F32)),
        )?;

        assert!(matches!(
            engine.invoke("routine", &[]),
            Err(EngineError::Arity(_, 1, 0))
        ));
        let id = engine.create_allocation_from_slice(&[0u8]);
        assert!(matches!(
            engine.invoke("routine", &[InvokeArg::Allocation(id)]),
            Err(EngineError::Argument(_, 0))
        ));

        // Pass-by-value arguments convert to the declared parameter type.
        let out = engine.invoke("routine", &[Scalar::I32(2).into()])?;
        assert_eq!(out, Some(Value::Scalar(Scalar::F32(2.0))));
        Ok(())
    }
}
