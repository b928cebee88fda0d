use thiserror::Error;

use crate::{
    alloc::Allocation,
    global::GlobalScope,
    kernel::{Kernel, KernelError},
    num::Scalar,
    value::{ElementType, Value},
};

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("launch arity error: kernel {0} takes {1} input allocations, got {2}")]
    Arity(String, usize, usize),
    #[error("launch length error: input length {0} mismatches output length {1}")]
    LengthMismatch(usize, usize),
    #[error("launch type error: {0} is not convertible to {1}")]
    TypeMismatch(ElementType, ElementType),
    #[error("kernel execution failed at index {index}: {source}")]
    KernelExecutionFailed { index: usize, source: KernelError },
}

/// Runs one kernel launch: applies the kernel body independently to every
/// index of the input/output allocations.
///
/// Preconditions are checked before any element runs, so a precondition
/// failure leaves the output untouched. A body failure aborts the remaining
/// elements and reports the failing index; elements already written stay
/// written (no rollback).
///
/// Element order is unobservable for bodies that do not touch globals: the
/// sequential and the `rayon` path produce identical output.
pub(crate) fn launch(
    kernel: &Kernel,
    globals: &GlobalScope,
    inputs: &[&Allocation],
    output: &mut Allocation,
) -> Result<(), LaunchError> {
    let arity = kernel.input().map_or(0, |_| 1);
    if inputs.len() != arity {
        return Err(LaunchError::Arity(
            kernel.name().into(),
            arity,
            inputs.len(),
        ));
    }
    let n = output.len();
    for input in inputs {
        if input.len() != n {
            return Err(LaunchError::LengthMismatch(input.len(), n));
        }
    }
    if let (Some(declared), Some(input)) = (kernel.input(), inputs.first()) {
        if !input.element_type().convertible(declared) {
            return Err(LaunchError::TypeMismatch(
                input.element_type().clone(),
                declared.clone(),
            ));
        }
    }
    if !kernel.output().convertible(output.element_type()) {
        return Err(LaunchError::TypeMismatch(
            kernel.output().clone(),
            output.element_type().clone(),
        ));
    }
    // The idempotent boundary case: nothing to do.
    if n == 0 {
        return Ok(());
    }

    let input = inputs.first().copied();
    let element = |index: usize| -> Result<Value, LaunchError> {
        let run = || -> Result<Value, KernelError> {
            let mut args = Vec::with_capacity(2);
            if let (Some(declared), Some(input)) = (kernel.input(), input) {
                let value = input.get(index).expect("index within launch range");
                args.push(value.convert(declared)?);
            }
            if kernel.coord() {
                args.push(Scalar::U32(index as u32).into());
            }
            let value = kernel.run(globals, &args)?;
            Ok(value.convert(kernel.output())?)
        };
        run().map_err(|source| LaunchError::KernelExecutionFailed { index, source })
    };

    #[cfg(not(feature = "rayon"))]
    for index in 0..n {
        let value = element(index)?;
        output
            .set(index, value)
            .expect("output convertible per launch preconditions");
    }
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;

        let values = (0..n)
            .into_par_iter()
            .map(element)
            .collect::<Result<Vec<_>, _>>()?;
        for (index, value) in values.into_iter().enumerate() {
            output
                .set(index, value)
                .expect("output convertible per launch preconditions");
        }
    }
    Ok(())
}
