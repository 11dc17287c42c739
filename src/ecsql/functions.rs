/// Scalar and aggregate functions known to the ECSQL binder.
///
/// Maps a lowercase function name to its arity and result typing rule.
use std::collections::HashMap;

use crate::schema_catalog::PrimitiveType;

/// `NAVIGATION_VALUE(<relationship class>, <id>[, <rel class id>])`
pub const NAVIGATION_VALUE: &str = "navigation_value";
/// Full-instance extraction function the `$` form compiles to
pub const EXTRACT_INSTANCE: &str = "extract_inst";
/// Single-property extraction function the `$->Prop` form compiles to
pub const EXTRACT_PROPERTY: &str = "extract_prop";

/// How the result type of a call is derived from its arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReturnType {
    Fixed(PrimitiveType),
    /// Same type as the first argument
    FirstArgument,
    /// `long` for integral arguments, `double` otherwise
    NumericOfFirstArgument,
    /// Not known until execution
    Untyped,
}

#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub min_args: usize,
    /// `None` for variadic functions
    pub max_args: Option<usize>,
    pub return_type: ReturnType,
    pub aggregate: bool,
}

impl FunctionSignature {
    fn scalar(min_args: usize, max_args: Option<usize>, return_type: ReturnType) -> Self {
        FunctionSignature {
            min_args,
            max_args,
            return_type,
            aggregate: false,
        }
    }

    fn aggregate(min_args: usize, max_args: Option<usize>, return_type: ReturnType) -> Self {
        FunctionSignature {
            min_args,
            max_args,
            return_type,
            aggregate: true,
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }

    /// Human readable arity, for error messages.
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..{}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

/// Get the signature of a function, ignoring case.
pub fn lookup(name: &str) -> Option<&'static FunctionSignature> {
    let lower = name.to_ascii_lowercase();
    FUNCTIONS.get(lower.as_str())
}

lazy_static::lazy_static! {
    static ref FUNCTIONS: HashMap<&'static str, FunctionSignature> = {
        use PrimitiveType::*;
        use ReturnType::*;

        let mut m = HashMap::new();

        // ===== AGGREGATES =====
        m.insert("count", FunctionSignature::aggregate(0, Some(1), Fixed(Long)));
        m.insert("sum", FunctionSignature::aggregate(1, Some(1), NumericOfFirstArgument));
        m.insert("total", FunctionSignature::aggregate(1, Some(1), Fixed(Double)));
        m.insert("avg", FunctionSignature::aggregate(1, Some(1), Fixed(Double)));
        m.insert("group_concat", FunctionSignature::aggregate(1, Some(2), Fixed(String)));

        // min/max are aggregates with one argument and scalar with more
        m.insert("min", FunctionSignature::scalar(1, None, FirstArgument));
        m.insert("max", FunctionSignature::scalar(1, None, FirstArgument));

        // ===== NUMERIC =====
        m.insert("abs", FunctionSignature::scalar(1, Some(1), FirstArgument));
        m.insert("round", FunctionSignature::scalar(1, Some(2), Fixed(Double)));
        m.insert("random", FunctionSignature::scalar(0, Some(0), Fixed(Long)));

        // ===== STRING =====
        m.insert("length", FunctionSignature::scalar(1, Some(1), Fixed(Long)));
        m.insert("lower", FunctionSignature::scalar(1, Some(1), Fixed(String)));
        m.insert("upper", FunctionSignature::scalar(1, Some(1), Fixed(String)));
        m.insert("trim", FunctionSignature::scalar(1, Some(2), Fixed(String)));
        m.insert("ltrim", FunctionSignature::scalar(1, Some(2), Fixed(String)));
        m.insert("rtrim", FunctionSignature::scalar(1, Some(2), Fixed(String)));
        m.insert("substr", FunctionSignature::scalar(2, Some(3), Fixed(String)));
        m.insert("replace", FunctionSignature::scalar(3, Some(3), Fixed(String)));
        m.insert("instr", FunctionSignature::scalar(2, Some(2), Fixed(Long)));
        m.insert("printf", FunctionSignature::scalar(1, None, Fixed(String)));
        m.insert("hex", FunctionSignature::scalar(1, Some(1), Fixed(String)));
        m.insert("typeof", FunctionSignature::scalar(1, Some(1), Fixed(String)));

        // ===== NULL HANDLING =====
        m.insert("coalesce", FunctionSignature::scalar(2, None, FirstArgument));
        m.insert("ifnull", FunctionSignature::scalar(2, Some(2), FirstArgument));
        m.insert("nullif", FunctionSignature::scalar(2, Some(2), FirstArgument));
        m.insert("iif", FunctionSignature::scalar(3, Some(3), Untyped));

        // ===== DATE/TIME =====
        m.insert("date", FunctionSignature::scalar(1, None, Fixed(String)));
        m.insert("time", FunctionSignature::scalar(1, None, Fixed(String)));
        m.insert("datetime", FunctionSignature::scalar(1, None, Fixed(String)));
        m.insert("julianday", FunctionSignature::scalar(1, None, Fixed(Double)));
        m.insert("strftime", FunctionSignature::scalar(2, None, Fixed(String)));

        // ===== EC FUNCTIONS =====
        m.insert("ec_classname", FunctionSignature::scalar(1, Some(2), Fixed(String)));
        m.insert("ec_classid", FunctionSignature::scalar(1, Some(1), Fixed(Long)));
        m.insert(NAVIGATION_VALUE, FunctionSignature::scalar(2, Some(3), Untyped));
        m.insert(EXTRACT_INSTANCE, FunctionSignature::scalar(2, Some(2), Fixed(String)));
        m.insert(EXTRACT_PROPERTY, FunctionSignature::scalar(3, Some(3), Untyped));

        m
    };
}
