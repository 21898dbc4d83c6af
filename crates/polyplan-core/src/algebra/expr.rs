//! Typed scalar expressions.
//!
//! An [`Expr`] is a literal, a reference to an input field, or an operator
//! call. The result type of a call is computed from the operator and the
//! operand types when the call is built, and nothing else.
//!
//! Expressions are immutable and shared through [`ExprRef`]. Rewrites go
//! through [`Expr::substitute`], which only allocates along paths that
//! actually changed.

use polyplan_common::types::{LogicalType, Value};
use polyplan_common::utils::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A shared expression.
pub type ExprRef = Arc<Expr>;

/// A scalar expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// A constant.
    Literal {
        /// The constant value.
        value: Value,
        /// Its type.
        ty: LogicalType,
    },
    /// A reference to field `index` of the input schema.
    InputRef {
        /// Field position in the input schema.
        index: usize,
        /// Type of the referenced field.
        ty: LogicalType,
    },
    /// An operator applied to operands.
    Call {
        /// The operator.
        op: Operator,
        /// The operands, in operator-specific order.
        operands: Vec<ExprRef>,
        /// Result type, derived from `op` and the operand types.
        ty: LogicalType,
    },
}

/// Operators that can appear in a [`Expr::Call`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    /// `a = b`
    Eq,
    /// `a <> b`
    Ne,
    /// `a < b`
    Lt,
    /// `a <= b`
    Le,
    /// `a > b`
    Gt,
    /// `a >= b`
    Ge,
    /// Conjunction of two or more operands.
    And,
    /// Disjunction of two or more operands.
    Or,
    /// Exclusive or.
    Xor,
    /// Negation.
    Not,
    /// Addition, string or list concatenation.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Modulo.
    Mod,
    /// Exponentiation.
    Pow,
    /// Unary minus.
    Neg,
    /// `a IS NULL`
    IsNull,
    /// `a IS NOT NULL`
    IsNotNull,
    /// `a IN list`
    In,
    /// SQL-style pattern match with `%` wildcards. `STARTS WITH`, `ENDS WITH`
    /// and `CONTAINS` all lower to this.
    Like,
    /// `a =~ regex`
    Regex,
    /// `n:Label1:Label2`: `(target, labels)`.
    HasLabels,
    /// `n.key`: `(target, key)`.
    ExtractProperty,
    /// Binds one element of a pattern: `(graph, path, name)`.
    PatternMatch,
    /// Binds an edge literal to two endpoint values: `(edge, left, right)`.
    AdjustEdge,
    /// `SET n.key = value`: `(target, key, value)`.
    SetProperty,
    /// `SET n = map` or `SET n += map`: `(target, map, replace)`.
    SetProperties,
    /// `SET n:Label`: `(target, labels)`.
    SetLabels,
    /// `REMOVE n.key`: `(target, key)`.
    RemoveProperty,
    /// `REMOVE n:Label`: `(target, labels)`.
    RemoveLabels,
    /// Coerces a value to a list: null to empty, scalar to singleton.
    ToList,
    /// List constructor.
    MakeList,
    /// Map constructor: alternating key literals and values.
    MakeMap,
    /// Searched case: `(cond, value)*` followed by an optional else value.
    Case,
    /// A named scalar function (lower-cased).
    Function(String),
}

impl Operator {
    /// Creates a function operator; names are case-insensitive.
    pub fn function(name: impl AsRef<str>) -> Self {
        Self::Function(name.as_ref().to_ascii_lowercase())
    }

    /// Returns the canonical name of this operator.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Not => "NOT",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "^",
            Self::Neg => "NEG",
            Self::IsNull => "IS_NULL",
            Self::IsNotNull => "IS_NOT_NULL",
            Self::In => "IN",
            Self::Like => "LIKE",
            Self::Regex => "REGEX",
            Self::HasLabels => "HAS_LABELS",
            Self::ExtractProperty => "EXTRACT_PROPERTY",
            Self::PatternMatch => "PATTERN_MATCH",
            Self::AdjustEdge => "ADJUST_EDGE",
            Self::SetProperty => "SET_PROPERTY",
            Self::SetProperties => "SET_PROPERTIES",
            Self::SetLabels => "SET_LABELS",
            Self::RemoveProperty => "REMOVE_PROPERTY",
            Self::RemoveLabels => "REMOVE_LABELS",
            Self::ToList => "TO_LIST",
            Self::MakeList => "MAKE_LIST",
            Self::MakeMap => "MAKE_MAP",
            Self::Case => "CASE",
            Self::Function(name) => name,
        }
    }

    /// Computes the result type of this operator over the given operands.
    pub fn result_type(&self, operands: &[ExprRef]) -> Result<LogicalType> {
        let types: Vec<&LogicalType> = operands.iter().map(|o| o.ty()).collect();
        match self {
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge => {
                self.arity(operands, 2)?;
                Ok(LogicalType::Bool)
            }
            Self::And | Self::Or | Self::Xor => {
                if operands.len() < 2 {
                    return Err(self.arity_error("at least 2", operands.len()));
                }
                for ty in &types {
                    expect(ty.is_boolean_like(), "bool", ty)?;
                }
                Ok(LogicalType::Bool)
            }
            Self::Not => {
                self.arity(operands, 1)?;
                expect(types[0].is_boolean_like(), "bool", types[0])?;
                Ok(LogicalType::Bool)
            }
            Self::Add => {
                self.arity(operands, 2)?;
                let (l, r) = (types[0], types[1]);
                if l.is_list() || r.is_list() {
                    let le = l.element_type().cloned().unwrap_or_else(|| l.clone());
                    let re = r.element_type().cloned().unwrap_or_else(|| r.clone());
                    return Ok(LogicalType::list_of(le.unify(&re)));
                }
                if (*l == LogicalType::String || *r == LogicalType::String)
                    && l.is_string_like()
                    && r.is_string_like()
                {
                    return Ok(LogicalType::String);
                }
                expect(l.is_numeric_like(), "numeric", l)?;
                expect(r.is_numeric_like(), "numeric", r)?;
                Ok(l.unify(r))
            }
            Self::Sub | Self::Mul | Self::Div | Self::Mod => {
                self.arity(operands, 2)?;
                expect(types[0].is_numeric_like(), "numeric", types[0])?;
                expect(types[1].is_numeric_like(), "numeric", types[1])?;
                Ok(types[0].unify(types[1]))
            }
            Self::Pow => {
                self.arity(operands, 2)?;
                expect(types[0].is_numeric_like(), "numeric", types[0])?;
                expect(types[1].is_numeric_like(), "numeric", types[1])?;
                Ok(LogicalType::Float64)
            }
            Self::Neg => {
                self.arity(operands, 1)?;
                expect(types[0].is_numeric_like(), "numeric", types[0])?;
                Ok(types[0].clone())
            }
            Self::IsNull | Self::IsNotNull => {
                self.arity(operands, 1)?;
                Ok(LogicalType::Bool)
            }
            Self::In => {
                self.arity(operands, 2)?;
                expect(types[1].is_list() || types[1].is_dynamic(), "list", types[1])?;
                Ok(LogicalType::Bool)
            }
            Self::Like | Self::Regex => {
                self.arity(operands, 2)?;
                expect(types[0].is_string_like(), "string", types[0])?;
                expect(types[1].is_string_like(), "string", types[1])?;
                Ok(LogicalType::Bool)
            }
            Self::HasLabels => {
                self.arity(operands, 2)?;
                expect(labelled(types[0]), "node", types[0])?;
                expect_string_list(&operands[1])?;
                Ok(LogicalType::Bool)
            }
            Self::ExtractProperty => {
                self.arity(operands, 2)?;
                expect(types[0].has_properties(), "node, edge or map", types[0])?;
                expect_string_literal(&operands[1])?;
                Ok(LogicalType::Any)
            }
            Self::PatternMatch => {
                self.arity(operands, 3)?;
                expect(
                    matches!(types[0], LogicalType::Graph | LogicalType::Any),
                    "graph",
                    types[0],
                )?;
                let Some(Value::Path(path)) = operands[1].as_literal() else {
                    return Err(Error::type_mismatch("path literal", types[1]));
                };
                let name = expect_string_literal(&operands[2])?;
                path.element_type(name)
                    .ok_or_else(|| Error::UnboundVariable(name.to_string()))
            }
            Self::AdjustEdge => {
                self.arity(operands, 3)?;
                let Some(Value::Edge(_)) = operands[0].as_literal() else {
                    return Err(Error::type_mismatch("edge literal", types[0]));
                };
                for ty in &types[1..] {
                    expect(matches!(ty, LogicalType::Node | LogicalType::Any), "node", ty)?;
                }
                Ok(LogicalType::Edge)
            }
            Self::SetProperty => {
                self.arity(operands, 3)?;
                expect(types[0].has_properties(), "node or edge", types[0])?;
                expect_string_literal(&operands[1])?;
                Ok(types[0].clone())
            }
            Self::SetProperties => {
                self.arity(operands, 3)?;
                expect(types[0].has_properties(), "node or edge", types[0])?;
                expect(types[1].has_properties(), "map", types[1])?;
                expect(*types[2] == LogicalType::Bool, "bool", types[2])?;
                Ok(types[0].clone())
            }
            Self::SetLabels | Self::RemoveLabels => {
                self.arity(operands, 2)?;
                expect(labelled(types[0]), "node", types[0])?;
                expect_string_list(&operands[1])?;
                Ok(types[0].clone())
            }
            Self::RemoveProperty => {
                self.arity(operands, 2)?;
                expect(types[0].has_properties(), "node or edge", types[0])?;
                expect_string_literal(&operands[1])?;
                Ok(types[0].clone())
            }
            Self::ToList => {
                self.arity(operands, 1)?;
                Ok(match types[0] {
                    LogicalType::List(_) => types[0].clone(),
                    other => LogicalType::list_of(other.clone()),
                })
            }
            Self::MakeList => Ok(LogicalType::list_of(common_type(types.iter().copied()))),
            Self::MakeMap => {
                if operands.len() % 2 != 0 {
                    return Err(self.arity_error("an even number of", operands.len()));
                }
                for key in operands.iter().step_by(2) {
                    expect_string_literal(key)?;
                }
                Ok(LogicalType::Map)
            }
            Self::Case => {
                if operands.len() < 2 {
                    return Err(self.arity_error("at least 2", operands.len()));
                }
                let pairs = operands.len() / 2;
                let mut branches = Vec::with_capacity(pairs + 1);
                for i in 0..pairs {
                    expect(types[2 * i].is_boolean_like(), "bool", types[2 * i])?;
                    branches.push(types[2 * i + 1]);
                }
                if operands.len() % 2 == 1 {
                    branches.push(types[operands.len() - 1]);
                }
                Ok(common_type(branches.into_iter()))
            }
            Self::Function(name) => Ok(function_type(name, &types)),
        }
    }

    fn arity(&self, operands: &[ExprRef], n: usize) -> Result<()> {
        if operands.len() == n {
            Ok(())
        } else {
            Err(self.arity_error(&n.to_string(), operands.len()))
        }
    }

    fn arity_error(&self, expected: &str, found: usize) -> Error {
        Error::InvalidPlan(format!(
            "{} expects {expected} operands, found {found}",
            self.name()
        ))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn expect(ok: bool, expected: &str, found: &LogicalType) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::type_mismatch(expected, found))
    }
}

fn labelled(ty: &LogicalType) -> bool {
    matches!(
        ty,
        LogicalType::Node | LogicalType::Edge | LogicalType::Any | LogicalType::Null
    )
}

fn expect_string_literal(expr: &Expr) -> Result<&str> {
    expr.as_literal()
        .and_then(Value::as_str)
        .ok_or_else(|| Error::type_mismatch("string literal", expr.ty()))
}

fn expect_string_list(expr: &Expr) -> Result<()> {
    match expr.as_literal() {
        Some(Value::List(items)) if items.iter().all(|v| v.as_str().is_some()) => Ok(()),
        _ => Err(Error::type_mismatch("list of string literals", expr.ty())),
    }
}

fn common_type<'a>(types: impl Iterator<Item = &'a LogicalType>) -> LogicalType {
    types
        .cloned()
        .reduce(|acc, t| acc.unify(&t))
        .unwrap_or(LogicalType::Any)
}

/// Result types of the named scalar functions. Unknown functions are dynamic.
fn function_type(name: &str, args: &[&LogicalType]) -> LogicalType {
    match name {
        "size" | "length" | "tointeger" | "count" => LogicalType::Int64,
        "tofloat" | "rand" | "sqrt" | "log" | "exp" => LogicalType::Float64,
        "toboolean" | "exists" => LogicalType::Bool,
        "tostring" | "id" | "elementid" | "type" | "tolower" | "toupper" | "trim" | "substring"
        | "replace" => LogicalType::String,
        "labels" | "keys" => LogicalType::list_of(LogicalType::String),
        "properties" => LogicalType::Map,
        "nodes" => LogicalType::list_of(LogicalType::Node),
        "relationships" => LogicalType::list_of(LogicalType::Edge),
        "startnode" | "endnode" => LogicalType::Node,
        "range" => LogicalType::list_of(LogicalType::Int64),
        "abs" | "ceil" | "floor" | "round" => {
            args.first().map_or(LogicalType::Any, |t| (*t).clone())
        }
        "coalesce" => common_type(args.iter().copied()),
        "head" | "last" => args
            .first()
            .and_then(|t| t.element_type())
            .cloned()
            .unwrap_or(LogicalType::Any),
        "tail" | "reverse" => args.first().map_or(LogicalType::Any, |t| (*t).clone()),
        _ => LogicalType::Any,
    }
}

/// Surface string-matching forms that lower to [`Operator::Like`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringMatch {
    /// `a STARTS WITH p`
    StartsWith,
    /// `a ENDS WITH p`
    EndsWith,
    /// `a CONTAINS p`
    Contains,
}

impl StringMatch {
    /// Returns the surface keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::StartsWith => "STARTS WITH",
            Self::EndsWith => "ENDS WITH",
            Self::Contains => "CONTAINS",
        }
    }

    fn pattern(self, literal: &str) -> String {
        match self {
            Self::StartsWith => format!("{literal}%"),
            Self::EndsWith => format!("%{literal}"),
            Self::Contains => format!("%{literal}%"),
        }
    }
}

impl Expr {
    /// Creates a literal; its type is the value's type.
    #[must_use]
    pub fn literal(value: Value) -> ExprRef {
        let ty = value.logical_type();
        Arc::new(Self::Literal { value, ty })
    }

    /// Creates a reference to input field `index` of type `ty`.
    #[must_use]
    pub fn input_ref(index: usize, ty: LogicalType) -> ExprRef {
        Arc::new(Self::InputRef { index, ty })
    }

    /// Creates an operator call, applying the operator's type rule.
    pub fn call(op: Operator, operands: Vec<ExprRef>) -> Result<ExprRef> {
        let ty = op.result_type(&operands)?;
        tracing::trace!(op = %op, ty = %ty, "built call");
        Ok(Arc::new(Self::Call { op, operands, ty }))
    }

    /// Creates a single `Like` call for a `STARTS WITH`/`ENDS WITH`/`CONTAINS`
    /// test.
    ///
    /// The pattern must be a string literal; it is rewritten to carry the
    /// wildcards of the surface form.
    pub fn string_match(kind: StringMatch, subject: ExprRef, pattern: &ExprRef) -> Result<ExprRef> {
        let Some(literal) = pattern.as_literal().and_then(Value::as_str) else {
            return Err(Error::UnsupportedOperation(format!(
                "{} requires a string literal pattern",
                kind.keyword()
            )));
        };
        let adjusted = Self::literal(Value::from(kind.pattern(literal)));
        Self::call(Operator::Like, vec![subject, adjusted])
    }

    /// Returns the result type.
    #[must_use]
    pub fn ty(&self) -> &LogicalType {
        match self {
            Self::Literal { ty, .. } | Self::InputRef { ty, .. } | Self::Call { ty, .. } => ty,
        }
    }

    /// Returns the value if this is a literal.
    #[must_use]
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Self::Literal { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns the field index if this is an input reference.
    #[must_use]
    pub fn as_input_ref(&self) -> Option<usize> {
        match self {
            Self::InputRef { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Returns the operator if this is a call.
    #[must_use]
    pub fn operator(&self) -> Option<&Operator> {
        match self {
            Self::Call { op, .. } => Some(op),
            _ => None,
        }
    }

    /// Returns the operands of a call, or nothing.
    #[must_use]
    pub fn operands(&self) -> &[ExprRef] {
        match self {
            Self::Call { operands, .. } => operands,
            _ => &[],
        }
    }

    /// Returns every input reference in this expression with the type it
    /// claims, leftmost first.
    #[must_use]
    pub fn input_refs(&self) -> Vec<(usize, &LogicalType)> {
        let mut out = Vec::new();
        self.collect_input_refs(&mut out);
        out
    }

    fn collect_input_refs<'e>(&'e self, out: &mut Vec<(usize, &'e LogicalType)>) {
        match self {
            Self::Literal { .. } => {}
            Self::InputRef { index, ty } => out.push((*index, ty)),
            Self::Call { operands, .. } => {
                for operand in operands {
                    operand.collect_input_refs(out);
                }
            }
        }
    }

    /// Rewrites `this` bottom-up.
    ///
    /// `f` is offered every subtree, outermost first; returning `Some`
    /// replaces the subtree without descending into it. Calls are rebuilt
    /// (re-running their type rule) only if an operand changed. A replacement
    /// equal to the subtree it replaces counts as no change, so a rewrite that
    /// changes nothing returns `this` itself.
    pub fn substitute<F>(this: &ExprRef, f: &mut F) -> Result<ExprRef>
    where
        F: FnMut(&ExprRef) -> Option<ExprRef>,
    {
        if let Some(replacement) = f(this) {
            if Arc::ptr_eq(&replacement, this) || replacement == *this {
                return Ok(Arc::clone(this));
            }
            return Ok(replacement);
        }
        let Self::Call { op, operands, .. } = this.as_ref() else {
            return Ok(Arc::clone(this));
        };
        let mut changed = false;
        let mut rewritten = Vec::with_capacity(operands.len());
        for operand in operands {
            let next = Self::substitute(operand, f)?;
            changed |= !Arc::ptr_eq(&next, operand);
            rewritten.push(next);
        }
        if changed {
            Self::call(op.clone(), rewritten)
        } else {
            Ok(Arc::clone(this))
        }
    }

    /// Replaces every subtree equal to `target` with `replacement`.
    pub fn replace(this: &ExprRef, target: &Expr, replacement: &ExprRef) -> Result<ExprRef> {
        Self::substitute(this, &mut |e: &ExprRef| {
            (e.as_ref() == target).then(|| Arc::clone(replacement))
        })
    }

    /// Renumbers input references through `mapping` (old index to new index).
    pub fn remap_inputs(this: &ExprRef, mapping: &[usize]) -> Result<ExprRef> {
        let mut missing = None;
        let out = Self::substitute(this, &mut |e: &ExprRef| match e.as_ref() {
            Self::InputRef { index, ty } => match mapping.get(*index) {
                Some(&to) => Some(Self::input_ref(to, ty.clone())),
                None => {
                    missing = Some(*index);
                    None
                }
            },
            _ => None,
        })?;
        match missing {
            Some(index) => Err(Error::InvalidPlan(format!(
                "input ${index} has no mapping"
            ))),
            None => Ok(out),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { value, .. } => write!(f, "{value}"),
            Self::InputRef { index, .. } => write!(f, "${index}"),
            Self::Call { op, operands, .. } => {
                write!(f, "{op}(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{operand}")?;
                }
                f.write_str(")")
            }
        }
    }
}
