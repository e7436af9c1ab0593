//! Type resolution for parsed programs.
//!
//! The resolver walks a [`Program`], builds the table of known types
//! and methods, and checks that every type reference and every
//! identifier in a method body resolves. It consumes the program and
//! hands it on unchanged together with the table; nothing in the
//! tree is rewritten.

use log::debug;

use crate::ast::{Block, Expression, Method, Pair, Program, Signature, TypeDef};
use crate::error::OrbitError;
use crate::phase::Phase;

/// Types every program starts with.
pub const BUILTIN_TYPES: &[&str] = &["Int", "Real"];

/// A method recorded in the type table, keyed by the API that
/// declared it.
#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub api: String,
    pub signature: Signature,
}

/// Everything the later stages need to know about names: the known
/// type names (builtins plus user definitions) and the declared
/// methods.
///
/// Lookup is linear; the tables are as small as the source programs.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    type_names: Vec<String>,
    methods: Vec<MethodEntry>,
}

impl TypeTable {
    pub fn is_known_type(&self, name: &str) -> bool {
        BUILTIN_TYPES.contains(&name) || self.type_names.iter().any(|n| n == name)
    }

    /// Find a method by receiver type and name, whichever API
    /// declared it.
    pub fn lookup_method(&self, receiver: &str, name: &str) -> Option<&MethodEntry> {
        self.methods.iter().find(|entry| {
            entry.signature.receiver_type.name == receiver && entry.signature.name.name == name
        })
    }

    pub fn methods(&self) -> &[MethodEntry] {
        &self.methods
    }
}

/// A program together with its resolved type table.
#[derive(Debug, Clone)]
pub struct TypedProgram {
    pub program: Program,
    pub table: TypeTable,
}

/// Resolves names and checks types across a program.
#[derive(Debug, Default)]
pub struct TypeResolver;

impl TypeResolver {
    pub fn new() -> Self {
        TypeResolver
    }
}

impl Phase for TypeResolver {
    type Input = Program;
    type Output = TypedProgram;

    fn execute(&self, input: Program) -> Result<TypedProgram, OrbitError> {
        let table = collect_table(&input)?;
        debug!(
            "resolved {} user types and {} methods",
            table.type_names.len(),
            table.methods.len()
        );

        for api in &input.apis {
            for def in api.type_defs() {
                check_type_def(&table, def)?;
            }
            for method in api.methods() {
                check_method(&table, method)?;
            }
        }

        Ok(TypedProgram {
            program: input,
            table,
        })
    }
}

/// First pass: gather every declared type and method so that later
/// checks see declarations regardless of their order in source.
fn collect_table(program: &Program) -> Result<TypeTable, OrbitError> {
    let mut table = TypeTable::default();
    for api in &program.apis {
        for def in api.type_defs() {
            if table.is_known_type(&def.name) {
                return Err(OrbitError::Compilation(format!(
                    "type '{}' is defined more than once",
                    def.name
                )));
            }
            table.type_names.push(def.name.clone());
        }
        for method in api.methods() {
            table.methods.push(MethodEntry {
                api: api.name.clone(),
                signature: method.signature.clone(),
            });
        }
    }
    Ok(table)
}

fn check_type_def(table: &TypeTable, def: &TypeDef) -> Result<(), OrbitError> {
    check_unique_names(&def.properties, "property", &def.name)?;
    for property in &def.properties {
        require_type(table, &property.ty.name)?;
    }
    Ok(())
}

fn check_method(table: &TypeTable, method: &Method) -> Result<(), OrbitError> {
    let signature = &method.signature;
    require_type(table, &signature.receiver_type.name)?;
    if let Some(ret) = &signature.return_type {
        require_type(table, &ret.name)?;
    }
    check_unique_names(&signature.parameters, "parameter", &signature.name.name)?;
    for parameter in &signature.parameters {
        require_type(table, &parameter.ty.name)?;
    }

    let scope = Scope {
        table,
        parameters: &signature.parameters,
    };
    scope.check_block(&method.body)
}

fn check_unique_names(pairs: &[Pair], what: &str, owner: &str) -> Result<(), OrbitError> {
    for (index, pair) in pairs.iter().enumerate() {
        if pairs[..index].iter().any(|p| p.name.name == pair.name.name) {
            return Err(OrbitError::Compilation(format!(
                "duplicate {what} '{}' in '{owner}'",
                pair.name.name
            )));
        }
    }
    Ok(())
}

fn require_type(table: &TypeTable, name: &str) -> Result<(), OrbitError> {
    if table.is_known_type(name) {
        Ok(())
    } else {
        Err(OrbitError::Compilation(format!(
            "unresolved type '{name}'"
        )))
    }
}

/// Method-body scope: the declared parameters are the only value
/// names in sight.
struct Scope<'a> {
    table: &'a TypeTable,
    parameters: &'a [Pair],
}

impl<'a> Scope<'a> {
    fn check_block(&self, block: &Block) -> Result<(), OrbitError> {
        for statement in &block.body {
            self.check_expression(statement)?;
        }
        if let Some(ret) = &block.return_statement {
            self.check_expression(&ret.value)?;
        }
        Ok(())
    }

    fn check_expression(&self, expr: &Expression) -> Result<(), OrbitError> {
        self.infer(expr).map(|_| ())
    }

    /// Infer the type name of an expression where one is knowable.
    ///
    /// `None` means "well-formed but of unknown type" (e.g. a call to
    /// a method with no declared return type); errors are reserved
    /// for genuinely unresolved names and operand mismatches.
    fn infer(&self, expr: &Expression) -> Result<Option<String>, OrbitError> {
        match expr {
            Expression::IntLiteral(_) => Ok(Some("Int".to_string())),
            Expression::RealLiteral(_) => Ok(Some("Real".to_string())),
            Expression::Identifier(ident) => {
                match self
                    .parameters
                    .iter()
                    .find(|pair| pair.name.name == ident.name)
                {
                    Some(pair) => Ok(Some(pair.ty.name.clone())),
                    None => Err(OrbitError::Compilation(format!(
                        "unresolved identifier '{}'",
                        ident.name
                    ))),
                }
            }
            Expression::TypeIdentifier(ty) => {
                require_type(self.table, &ty.name)?;
                Ok(None)
            }
            Expression::Unary(unary) => self.infer(&unary.operand),
            Expression::Binary(binary) => {
                let left = self.infer(&binary.left)?;
                let right = self.infer(&binary.right)?;
                match (left, right) {
                    (Some(l), Some(r)) if l != r => Err(OrbitError::Compilation(format!(
                        "operator '{}' applied to mismatched types '{l}' and '{r}'",
                        binary.op.symbol
                    ))),
                    (Some(l), _) => Ok(Some(l)),
                    (None, r) => Ok(r),
                }
            }
            Expression::InstanceCall(call) => {
                let receiver = self.infer(&call.receiver)?;
                for argument in &call.arguments {
                    self.check_expression(argument)?;
                }
                match receiver {
                    Some(ty) => Ok(self
                        .table
                        .lookup_method(&ty, &call.method.name)
                        .and_then(|entry| entry.signature.return_type.as_ref())
                        .map(|ret| ret.name.clone())),
                    None => Ok(None),
                }
            }
            Expression::StaticCall(call) => {
                require_type(self.table, &call.receiver.name)?;
                for argument in &call.arguments {
                    self.check_expression(argument)?;
                }
                Ok(self
                    .table
                    .lookup_method(&call.receiver.name, &call.method.name)
                    .and_then(|entry| entry.signature.return_type.as_ref())
                    .map(|ret| ret.name.clone()))
            }
            Expression::Return(ret) => {
                self.check_expression(&ret.value)?;
                Ok(None)
            }
            Expression::Defer(defer) => {
                self.check_block(&defer.block)?;
                Ok(None)
            }
            Expression::Extension(node) => Err(OrbitError::Compilation(format!(
                "cannot type-check unsupported syntax '{}'",
                node.kind
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn resolve(input: &str) -> Result<TypedProgram, OrbitError> {
        let tokens = Lexer::new().execute(input.to_string())?;
        let program = Parser::new().execute(tokens)?;
        TypeResolver::new().execute(program)
    }

    #[test]
    fn accepts_builtin_types_in_signatures() {
        let typed = resolve("api M { (Int) double (x Int) (Int) { return x + x } }")
            .expect("resolve");
        assert!(typed.table.is_known_type("Int"));
        assert_eq!(typed.table.methods().len(), 1);
    }

    #[test]
    fn records_user_types() {
        let typed = resolve("api Geo { type Point(x Int, y Int) }").expect("resolve");
        assert!(typed.table.is_known_type("Point"));
        assert!(!typed.table.is_known_type("Line"));
    }

    #[test]
    fn rejects_duplicate_type_definitions() {
        let err = resolve("api Geo { type Point(x Int) type Point(y Int) }").unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_unresolved_property_type() {
        let err = resolve("api Geo { type Point(x Vector) }").unwrap_err();
        assert!(err.to_string().contains("unresolved type 'Vector'"));
    }

    #[test]
    fn rejects_unresolved_receiver_type() {
        let err = resolve("api Geo { (Vector) len () (Real) { return 1.0 } }").unwrap_err();
        assert!(err.to_string().contains("unresolved type 'Vector'"));
    }

    #[test]
    fn rejects_duplicate_parameters() {
        let err = resolve("api M { (Int) add (x Int, x Int) (Int) { return x } }").unwrap_err();
        assert!(err.to_string().contains("duplicate parameter 'x'"));
    }

    #[test]
    fn rejects_unresolved_identifier_in_body() {
        let err = resolve("api M { (Int) add (x Int) (Int) { return x + y } }").unwrap_err();
        assert!(err.to_string().contains("unresolved identifier 'y'"));
    }

    #[test]
    fn rejects_mismatched_operand_types() {
        let err =
            resolve("api M { (Int) mix (x Int, y Real) (Int) { return x + y } }").unwrap_err();
        assert!(err.to_string().contains("mismatched types"));
    }

    #[test]
    fn resolves_static_call_receiver() {
        let source = "api Geo {
            type Point(x Int, y Int)
            (Point) origin () (Point) { return Point.origin() }
        }";
        let typed = resolve(source).expect("resolve");
        let entry = typed.table.lookup_method("Point", "origin").expect("method");
        assert_eq!(entry.api, "Geo");
    }

    #[test]
    fn rejects_static_call_on_unknown_type() {
        let err = resolve("api M { (Int) go () { Vector.make() } }").unwrap_err();
        assert!(err.to_string().contains("unresolved type 'Vector'"));
    }

    #[test]
    fn checks_defer_blocks() {
        let err = resolve("api M { (Int) go (x Int) { defer { missing } } }").unwrap_err();
        assert!(err.to_string().contains("unresolved identifier 'missing'"));
    }

    #[test]
    fn infers_instance_call_through_declared_return_type() {
        let source = "api Geo {
            type Point(x Int, y Int)
            (Point) flipped (p Point) (Point) { return p }
            (Point) go (p Point) (Point) { return p.flipped().flipped() }
        }";
        // Chained instance calls resolve because `flipped` declares a
        // Point return type.
        resolve(source).expect("resolve");
    }
}
