//! Operator requirements.
//!
//! Host-language operators are not interface members, so a template cannot
//! demand them through nominal constraints. Instead a constraint names the
//! [`Operator`] it needs together with the [`OperatorForm`] the concrete type
//! must provide, and the matcher checks it structurally.
//!
//! # Example
//!
//! ```
//! use stencil_core::{Operator, OperatorForm};
//!
//! // "equality comparison taking two read-only references, returning boolean"
//! let form = OperatorForm::comparison();
//! assert_eq!(form.to_string(), "(in, in) -> bool");
//! assert_eq!(Operator::Equals.symbol(), "==");
//! ```

use std::fmt;

/// Operator kinds that a constraint may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    // === Comparison ===
    /// `==`
    Equals,
    /// `!=`
    NotEquals,
    /// `<`
    LessThan,
    /// `<=`
    LessOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterOrEqual,

    // === Arithmetic ===
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,

    // === Bitwise ===
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,

    // === Unary ===
    /// unary `-`
    Neg,
    /// `!`
    Not,
    /// `++`
    Increment,
    /// `--`
    Decrement,
}

impl Operator {
    /// Source-level symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Equals => "==",
            Operator::NotEquals => "!=",
            Operator::LessThan => "<",
            Operator::LessOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Add => "+",
            Operator::Sub | Operator::Neg => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::BitAnd => "&",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::Shl => "<<",
            Operator::Shr => ">>",
            Operator::Not => "!",
            Operator::Increment => "++",
            Operator::Decrement => "--",
        }
    }

    /// Member name used for forwarding members in synthesized witnesses.
    pub fn member_name(self) -> &'static str {
        match self {
            Operator::Equals => "op_equals",
            Operator::NotEquals => "op_not_equals",
            Operator::LessThan => "op_less_than",
            Operator::LessOrEqual => "op_less_or_equal",
            Operator::GreaterThan => "op_greater_than",
            Operator::GreaterOrEqual => "op_greater_or_equal",
            Operator::Add => "op_add",
            Operator::Sub => "op_sub",
            Operator::Mul => "op_mul",
            Operator::Div => "op_div",
            Operator::Mod => "op_mod",
            Operator::BitAnd => "op_bit_and",
            Operator::BitOr => "op_bit_or",
            Operator::BitXor => "op_bit_xor",
            Operator::Shl => "op_shl",
            Operator::Shr => "op_shr",
            Operator::Neg => "op_neg",
            Operator::Not => "op_not",
            Operator::Increment => "op_increment",
            Operator::Decrement => "op_decrement",
        }
    }

    /// Check if this is a unary operator.
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            Operator::Neg | Operator::Not | Operator::Increment | Operator::Decrement
        )
    }

    /// The form this operator most commonly takes; used as the default
    /// requirement when a marker names only the operator.
    pub fn natural_form(self) -> OperatorForm {
        match self {
            Operator::Equals
            | Operator::NotEquals
            | Operator::LessThan
            | Operator::LessOrEqual
            | Operator::GreaterThan
            | Operator::GreaterOrEqual => OperatorForm::comparison(),
            Operator::Not => OperatorForm::new(PassMode::Value, 1, ReturnKind::Bool),
            op if op.is_unary() => OperatorForm::unary(),
            _ => OperatorForm::binary(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operator {}", self.symbol())
    }
}

/// How operands are passed to an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassMode {
    /// By value (copy).
    Value,
    /// Read-only reference.
    In,
    /// Mutable reference.
    Ref,
}

impl PassMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PassMode::Value => "value",
            PassMode::In => "in",
            PassMode::Ref => "ref",
        }
    }
}

/// What an operator returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReturnKind {
    /// Boolean result (comparisons).
    Bool,
    /// Integer result (three-way comparison).
    Int,
    /// A value of the operand type.
    Operand,
    /// Nothing.
    Void,
}

impl ReturnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnKind::Bool => "bool",
            ReturnKind::Int => "int",
            ReturnKind::Operand => "self",
            ReturnKind::Void => "void",
        }
    }
}

/// The functional shape an operator must have: operand passing, operand count
/// and result kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorForm {
    pub pass: PassMode,
    pub arity: u8,
    pub returns: ReturnKind,
}

impl OperatorForm {
    pub const fn new(pass: PassMode, arity: u8, returns: ReturnKind) -> Self {
        Self {
            pass,
            arity,
            returns,
        }
    }

    /// Two read-only operands, boolean result.
    pub const fn comparison() -> Self {
        Self::new(PassMode::In, 2, ReturnKind::Bool)
    }

    /// Two by-value operands, operand-typed result.
    pub const fn binary() -> Self {
        Self::new(PassMode::Value, 2, ReturnKind::Operand)
    }

    /// One by-value operand, operand-typed result.
    pub const fn unary() -> Self {
        Self::new(PassMode::Value, 1, ReturnKind::Operand)
    }
}

impl fmt::Display for OperatorForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for i in 0..self.arity {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.pass.as_str())?;
        }
        write!(f, ") -> {}", self.returns.as_str())
    }
}
