//! Built-in column functions
//!
//! Every function works elementwise: arguments arrive already broadcast to
//! the row count, and a null in any argument gives a null in that row.

pub mod math;

use crate::error::FormulaResult;
use ahash::AHashMap;
use gradesheet_core::ColumnData;

/// Function implementation signature
pub type FunctionImpl = fn(&[ColumnData]) -> FormulaResult<ColumnData>;

/// Function definition
pub struct FunctionDef {
    /// Function name as written in formulas (lowercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
///
/// Names match exactly; `ABS` is not `abs`.
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// Names of all registered functions, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef {
            name: "abs",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_abs,
        });

        self.register(FunctionDef {
            name: "floor",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_floor,
        });

        self.register(FunctionDef {
            name: "ceil",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_ceil,
        });

        // round(x) or round(x, digits)
        self.register(FunctionDef {
            name: "round",
            min_args: 1,
            max_args: Some(2),
            implementation: math::fn_round,
        });

        self.register(FunctionDef {
            name: "min",
            min_args: 1,
            max_args: None,
            implementation: math::fn_min,
        });

        self.register(FunctionDef {
            name: "max",
            min_args: 1,
            max_args: None,
            implementation: math::fn_max,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names() {
        let registry = FunctionRegistry::new();
        assert_eq!(
            registry.names(),
            vec!["abs", "ceil", "floor", "max", "min", "round"]
        );
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = FunctionRegistry::new();
        assert!(registry.get("round").is_some());
        assert!(registry.get("ROUND").is_none());
        assert!(registry.get("sqrt").is_none());
    }
}
