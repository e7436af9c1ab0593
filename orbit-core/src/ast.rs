//! Abstract syntax tree for Orbit source.
//!
//! The tree is strictly owned: a parent node owns its children
//! outright (`Box` / `Vec` / `Option`, never shared pointers), the
//! parser constructs nodes exactly once and nothing mutates them
//! afterwards. Dropping the root drops the whole tree.
//!
//! Statement and expression positions are heterogeneous, so they are
//! represented by the [`Expression`] enum; structural nodes that only
//! ever appear in one place (signatures, blocks, APIs, ...) stay
//! plain structs.

use core::fmt;

/// Line/column location of a token in the original source.
///
/// Lines and columns are 1-based, the way editors count them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// An operator symbol together with where it appeared.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub symbol: String,
    pub position: Position,
}

impl Operator {
    pub fn new(symbol: impl Into<String>, position: Position) -> Self {
        Operator {
            symbol: symbol.into(),
            position,
        }
    }
}

/// A value-level name (first letter lower-case).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
}

/// A type-level name (first letter upper-case).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeIdentifier {
    pub name: String,
}

/// A `name Type` binding, as in parameter lists and type properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub name: Identifier,
    pub ty: TypeIdentifier,
}

/// A record type declaration: `type Point(x Int, y Int)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: String,
    pub properties: Vec<Pair>,
}

/// A method signature.
///
/// The receiver type is mandatory; the return type is optional and
/// its absence is meaningful (a method that returns nothing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub receiver_type: TypeIdentifier,
    pub name: Identifier,
    pub parameters: Vec<Pair>,
    pub return_type: Option<TypeIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntLiteral {
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealLiteral {
    pub value: f64,
}

/// Prefix operator application, e.g. `-x`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: Operator,
    pub operand: Box<Expression>,
}

/// Infix operator application, e.g. `a + b`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: Operator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

/// A call whose receiver is a runtime value: `point.scale(2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceCall {
    pub receiver: Box<Expression>,
    pub method: Identifier,
    pub arguments: Vec<Expression>,
}

/// A call whose receiver is a type: `Point.origin()`.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticCall {
    pub receiver: TypeIdentifier,
    pub method: Identifier,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub value: Box<Expression>,
}

/// `defer { ... }`: a block scheduled to run when the enclosing
/// method returns.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferStatement {
    pub block: Block,
}

/// A brace-delimited statement sequence.
///
/// `return_statement` is separate from `body` and absent for blocks
/// that fall off the end.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub body: Vec<Expression>,
    pub return_statement: Option<ReturnStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub signature: Signature,
    pub body: Block,
}

/// One declaration inside an API body.
///
/// The two kinds stay interleaved in source order; consumers that
/// want only one kind filter without reordering.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiMember {
    Type(TypeDef),
    Method(Method),
}

/// A top-level namespace: `api Foo { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Api {
    pub name: String,
    pub body: Vec<ApiMember>,
}

/// The tree root produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub apis: Vec<Api>,
}

/// A node of a kind this crate does not understand.
///
/// Grammar extensions surface as `ExtensionNode`s carrying the stable
/// name of their variant, so downstream consumers (most importantly
/// the tagged-tree serializer) can degrade gracefully instead of
/// failing on syntax newer than they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionNode {
    pub kind: String,
}

/// Any node that can appear in statement or expression position.
///
/// This is the type the rest of the crate sees once a node's concrete
/// kind has been erased: block bodies, call arguments and operands
/// are all `Expression`s.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    TypeIdentifier(TypeIdentifier),
    IntLiteral(IntLiteral),
    RealLiteral(RealLiteral),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    InstanceCall(InstanceCall),
    StaticCall(StaticCall),
    Return(ReturnStatement),
    Defer(DeferStatement),
    Extension(ExtensionNode),
}

impl Api {
    /// The TypeDefs of this API, in source order.
    pub fn type_defs(&self) -> impl Iterator<Item = &TypeDef> {
        self.body.iter().filter_map(|member| match member {
            ApiMember::Type(def) => Some(def),
            ApiMember::Method(_) => None,
        })
    }

    /// The methods of this API, in source order.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.body.iter().filter_map(|member| match member {
            ApiMember::Method(method) => Some(method),
            ApiMember::Type(_) => None,
        })
    }
}
