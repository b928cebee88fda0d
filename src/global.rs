use std::sync::RwLock;

use rustc_hash::FxHashMap as HashMap;
use thiserror::Error;

use crate::value::{ElementType, Value, ValueError};

#[derive(Debug, Error)]
pub enum GlobalError {
    #[error("duplicate global: {0}")]
    Duplicate(String),
    #[error("undefined global: {0}")]
    Undefined(String),
    #[error("global type error: {0} of type {1} (globals are scalars or vectors)")]
    Type(String, ElementType),
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Process-wide named cells, the one piece of shared mutable state kernels
/// and routines may touch. One lock guards the whole table; reads and writes
/// of a global are atomic with respect to other elements of a launch, with no
/// ordering guarantee across elements.
///
/// The scope is owned by an [`Engine`](crate::engine::Engine), never ambient,
/// so several engines can coexist in one process.
#[derive(Debug, Default)]
pub struct GlobalScope {
    cells: RwLock<HashMap<String, Value>>,
}

impl GlobalScope {
    /// Defines a global once, at registration time. Globals are scalar or
    /// vector valued; the type fixed here survives every later write.
    pub fn define(&self, name: impl Into<String>, value: Value) -> Result<(), GlobalError> {
        let name = name.into();
        if !matches!(value, Value::Scalar(_) | Value::Vector(_)) {
            return Err(GlobalError::Type(name, value.element_type()));
        }
        let mut cells = self.cells.write().expect("failed to lock");
        if cells.contains_key(&name) {
            return Err(GlobalError::Duplicate(name));
        }
        cells.insert(name, value);
        Ok(())
    }

    /// Reads a global by value.
    pub fn read(&self, name: &str) -> Result<Value, GlobalError> {
        self.cells
            .read()
            .expect("failed to lock")
            .get(name)
            .cloned()
            .ok_or_else(|| GlobalError::Undefined(name.into()))
    }

    /// Whole-value write, converted to the type the global was defined with.
    pub fn write(&self, name: &str, value: Value) -> Result<(), GlobalError> {
        let mut cells = self.cells.write().expect("failed to lock");
        let cell = cells
            .get_mut(name)
            .ok_or_else(|| GlobalError::Undefined(name.into()))?;
        *cell = value.convert(&cell.element_type())?;
        Ok(())
    }

    /// Read-modify-write under a single lock acquisition; atomic with respect
    /// to every other access of the table.
    pub fn update(
        &self,
        name: &str,
        f: impl FnOnce(&Value) -> Result<Value, ValueError>,
    ) -> Result<(), GlobalError> {
        let mut cells = self.cells.write().expect("failed to lock");
        let cell = cells
            .get_mut(name)
            .ok_or_else(|| GlobalError::Undefined(name.into()))?;
        *cell = f(cell)?.convert(&cell.element_type())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{GlobalError, GlobalScope};
    use crate::{
        num::Scalar,
        value::{StructValue, Value, Vector},
    };

    #[test]
    fn test_define_read_write() -> Result<(), Box<dyn Error>> {
        let globals = GlobalScope::default();
        globals.define("glob", Value::Scalar(Scalar::I32(123)))?;
        globals.define("gColor", Value::Vector(Vector::from_array([0.299f32, 0.587, 0.114, 1.0])))?;

        assert_eq!(globals.read("glob")?, Value::Scalar(Scalar::I32(123)));
        assert!(matches!(
            globals.define("glob", Value::Scalar(Scalar::I32(0))),
            Err(GlobalError::Duplicate(_))
        ));
        assert!(matches!(globals.read("nope"), Err(GlobalError::Undefined(_))));

        // A write converts to the defined type; `int glob` stays an int.
        globals.write("glob", Value::Scalar(Scalar::F64(7.9)))?;
        assert_eq!(globals.read("glob")?, Value::Scalar(Scalar::I32(7)));

        globals.update("glob", |v| {
            Ok(v.clone().try_into_scalar()?.try_add(Scalar::I32(5))?.into())
        })?;
        assert_eq!(globals.read("glob")?, Value::Scalar(Scalar::I32(12)));
        Ok(())
    }

    #[test]
    fn test_struct_global_rejected() {
        let globals = GlobalScope::default();
        let value = Value::Struct(StructValue::new([("i", Value::Scalar(Scalar::I32(0)))]));
        assert!(matches!(
            globals.define("s", value),
            Err(GlobalError::Type(..))
        ));
    }
}
