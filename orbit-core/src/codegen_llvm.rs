//! Textual LLVM IR backend.
//!
//! Lowers a resolved program to LLVM IR text. `Int` maps to `i64`,
//! `Real` to `double`, user-defined types to `ptr`. Methods become
//! plain functions named `"<api>.<receiver>.<method>"`; an instance
//! call passes its receiver as the callee's first argument, a static
//! call passes exactly its argument list. Bitcode is outside this
//! backend; requesting it is a compilation error.

use core::fmt;

use log::debug;

use crate::ast::{Block, Expression, Method, Signature};
use crate::error::OrbitError;
use crate::phase::Phase;
use crate::typecheck::{TypeTable, TypedProgram};

/// A compiled module holding textual LLVM IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlvmModule {
    pub ir: String,
}

impl fmt::Display for LlvmModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ir)
    }
}

/// Serializing a module to bitcode.
///
/// The textual backend has no bitcode writer; callers that ask for
/// bitcode get a compilation error after their flags validate.
pub fn emit_bitcode(_module: &LlvmModule) -> Result<Vec<u8>, OrbitError> {
    Err(OrbitError::Compilation(
        "this backend emits textual IR only; bitcode output is not supported".to_string(),
    ))
}

/// Lowers a type-resolved program to an [`LlvmModule`].
#[derive(Debug, Default)]
pub struct CodeGenerator;

impl CodeGenerator {
    pub fn new() -> Self {
        CodeGenerator
    }
}

impl Phase for CodeGenerator {
    type Input = TypedProgram;
    type Output = LlvmModule;

    fn execute(&self, input: TypedProgram) -> Result<LlvmModule, OrbitError> {
        let mut ir = String::from("; ModuleID = \"orbit-module\"\n");

        for api in &input.program.apis {
            for def in api.type_defs() {
                let fields: Vec<&str> = def
                    .properties
                    .iter()
                    .map(|p| value_type(&p.ty.name))
                    .collect();
                ir.push_str(&format!("%{} = type {{ {} }}\n", def.name, fields.join(", ")));
            }
        }
        ir.push('\n');

        for api in &input.program.apis {
            for method in api.methods() {
                debug!("lowering method {}.{}", api.name, method.signature.name.name);
                let function = lower_method(&input.table, &api.name, method)?;
                ir.push_str(&function);
                ir.push('\n');
            }
        }

        Ok(LlvmModule { ir })
    }
}

fn symbol(api: &str, signature: &Signature) -> String {
    format!(
        "@\"{}.{}.{}\"",
        api, signature.receiver_type.name, signature.name.name
    )
}

/// LLVM type for a value of the named Orbit type.
fn value_type(name: &str) -> &'static str {
    match name {
        "Int" => "i64",
        "Real" => "double",
        _ => "ptr",
    }
}

fn return_type(signature: &Signature) -> &'static str {
    match &signature.return_type {
        Some(ty) => value_type(&ty.name),
        None => "void",
    }
}

fn lower_method(table: &TypeTable, api: &str, method: &Method) -> Result<String, OrbitError> {
    let signature = &method.signature;
    let params: Vec<String> = signature
        .parameters
        .iter()
        .map(|p| format!("{} %{}", value_type(&p.ty.name), p.name.name))
        .collect();

    let mut body = FunctionBody {
        table,
        signature,
        temp: 0,
        lines: Vec::new(),
        deferred: Vec::new(),
    };
    body.lower_block_statements(&method.body)?;

    let ret = match (&signature.return_type, &method.body.return_statement) {
        (Some(ty), Some(statement)) => {
            let value = body.lower(&statement.value)?;
            if value.ty != ty.name {
                return Err(OrbitError::Compilation(format!(
                    "method '{}' returns '{}' but declares '{}'",
                    signature.name.name, value.ty, ty.name
                )));
            }
            format!("  ret {} {}", value_type(&value.ty), value.repr)
        }
        (Some(_), None) => {
            return Err(OrbitError::Compilation(format!(
                "method '{}' declares a return type but has no return statement",
                signature.name.name
            )));
        }
        (None, Some(_)) => {
            return Err(OrbitError::Compilation(format!(
                "method '{}' returns a value but declares no return type",
                signature.name.name
            )));
        }
        (None, None) => "  ret void".to_string(),
    };

    // Deferred blocks run on the way out, most recent first.
    let deferred: Vec<String> = body.deferred.drain(..).rev().flatten().collect();

    let mut lines = String::new();
    lines.push_str(&format!(
        "define {} {}({}) {{\nentry:\n",
        return_type(signature),
        symbol(api, signature),
        params.join(", ")
    ));
    for line in &body.lines {
        lines.push_str(line);
        lines.push('\n');
    }
    for line in &deferred {
        lines.push_str(line);
        lines.push('\n');
    }
    lines.push_str(&ret);
    lines.push_str("\n}\n");
    Ok(lines)
}

/// An SSA value paired with its Orbit-level type name.
struct Value {
    repr: String,
    ty: String,
}

struct FunctionBody<'a> {
    table: &'a TypeTable,
    signature: &'a Signature,
    temp: u32,
    lines: Vec<String>,
    deferred: Vec<Vec<String>>,
}

impl<'a> FunctionBody<'a> {
    fn lower_block_statements(&mut self, block: &Block) -> Result<(), OrbitError> {
        for statement in &block.body {
            if let Expression::Defer(defer) = statement {
                if defer.block.return_statement.is_some() {
                    return Err(OrbitError::Compilation(
                        "cannot return from a deferred block".to_string(),
                    ));
                }
                // Lower the deferred block into its own buffer and
                // splice it in before the return.
                let checkpoint = self.lines.len();
                self.lower_block_statements(&defer.block)?;
                let deferred: Vec<String> = self.lines.drain(checkpoint..).collect();
                self.deferred.push(deferred);
                continue;
            }
            self.lower(statement)?;
        }
        Ok(())
    }

    fn fresh(&mut self) -> String {
        let name = format!("%t{}", self.temp);
        self.temp += 1;
        name
    }

    fn lower(&mut self, expr: &Expression) -> Result<Value, OrbitError> {
        match expr {
            Expression::IntLiteral(literal) => Ok(Value {
                repr: literal.value.to_string(),
                ty: "Int".to_string(),
            }),
            Expression::RealLiteral(literal) => Ok(Value {
                // Bit-exact hex form; decimal text rejects values the
                // IR parser cannot represent exactly.
                repr: format!("0x{:016X}", literal.value.to_bits()),
                ty: "Real".to_string(),
            }),
            Expression::Identifier(ident) => {
                let pair = self
                    .signature
                    .parameters
                    .iter()
                    .find(|p| p.name.name == ident.name)
                    .ok_or_else(|| {
                        OrbitError::Compilation(format!(
                            "unresolved identifier '{}'",
                            ident.name
                        ))
                    })?;
                Ok(Value {
                    repr: format!("%{}", pair.name.name),
                    ty: pair.ty.name.clone(),
                })
            }
            Expression::Unary(unary) => {
                let operand = self.lower(&unary.operand)?;
                match unary.op.symbol.as_str() {
                    "+" => Ok(operand),
                    "-" => {
                        let target = self.fresh();
                        let line = match operand.ty.as_str() {
                            "Int" => format!("  {target} = sub i64 0, {}", operand.repr),
                            "Real" => format!("  {target} = fneg double {}", operand.repr),
                            other => {
                                return Err(type_does_not_support(&unary.op.symbol, other));
                            }
                        };
                        self.lines.push(line);
                        Ok(Value {
                            repr: target,
                            ty: operand.ty,
                        })
                    }
                    other => Err(OrbitError::Compilation(format!(
                        "unary operator '{other}' cannot be lowered"
                    ))),
                }
            }
            Expression::Binary(binary) => {
                let left = self.lower(&binary.left)?;
                let right = self.lower(&binary.right)?;
                if left.ty != right.ty {
                    return Err(OrbitError::Compilation(format!(
                        "operator '{}' applied to mismatched types '{}' and '{}'",
                        binary.op.symbol, left.ty, right.ty
                    )));
                }
                let instruction = match (binary.op.symbol.as_str(), left.ty.as_str()) {
                    ("+", "Int") => "add i64",
                    ("-", "Int") => "sub i64",
                    ("*", "Int") => "mul i64",
                    ("/", "Int") => "sdiv i64",
                    ("+", "Real") => "fadd double",
                    ("-", "Real") => "fsub double",
                    ("*", "Real") => "fmul double",
                    ("/", "Real") => "fdiv double",
                    (op, ty) => return Err(type_does_not_support(op, ty)),
                };
                let target = self.fresh();
                self.lines.push(format!(
                    "  {target} = {instruction} {}, {}",
                    left.repr, right.repr
                ));
                Ok(Value {
                    repr: target,
                    ty: left.ty,
                })
            }
            Expression::InstanceCall(call) => {
                let receiver = self.lower(&call.receiver)?;
                let entry = self
                    .table
                    .lookup_method(&receiver.ty, &call.method.name)
                    .ok_or_else(|| {
                        OrbitError::Compilation(format!(
                            "type '{}' has no method '{}'",
                            receiver.ty, call.method.name
                        ))
                    })?;
                let signature = entry.signature.clone();
                let api = entry.api.clone();
                // The receiver feeds the callee's first parameter.
                let mut arguments = vec![receiver];
                for argument in &call.arguments {
                    arguments.push(self.lower(argument)?);
                }
                self.emit_call(&api, &signature, arguments, &call.method.name)
            }
            Expression::StaticCall(call) => {
                let entry = self
                    .table
                    .lookup_method(&call.receiver.name, &call.method.name)
                    .ok_or_else(|| {
                        OrbitError::Compilation(format!(
                            "type '{}' has no method '{}'",
                            call.receiver.name, call.method.name
                        ))
                    })?;
                let signature = entry.signature.clone();
                let api = entry.api.clone();
                let mut arguments = Vec::new();
                for argument in &call.arguments {
                    arguments.push(self.lower(argument)?);
                }
                self.emit_call(&api, &signature, arguments, &call.method.name)
            }
            Expression::TypeIdentifier(ty) => Err(OrbitError::Compilation(format!(
                "type '{}' is not a value",
                ty.name
            ))),
            Expression::Return(_) | Expression::Defer(_) => Err(OrbitError::Compilation(
                "statement cannot be lowered as a value".to_string(),
            )),
            Expression::Extension(node) => Err(OrbitError::Compilation(format!(
                "cannot lower unsupported syntax '{}'",
                node.kind
            ))),
        }
    }

    fn emit_call(
        &mut self,
        api: &str,
        signature: &Signature,
        arguments: Vec<Value>,
        method_name: &str,
    ) -> Result<Value, OrbitError> {
        if signature.parameters.len() != arguments.len() {
            return Err(OrbitError::Compilation(format!(
                "method '{method_name}' expects {} arguments but received {}",
                signature.parameters.len(),
                arguments.len()
            )));
        }
        for (parameter, argument) in signature.parameters.iter().zip(&arguments) {
            if parameter.ty.name != argument.ty {
                return Err(OrbitError::Compilation(format!(
                    "argument '{}' of '{method_name}' expects '{}' but received '{}'",
                    parameter.name.name, parameter.ty.name, argument.ty
                )));
            }
        }

        let rendered: Vec<String> = arguments
            .iter()
            .map(|a| format!("{} {}", value_type(&a.ty), a.repr))
            .collect();
        let callee = symbol(api, signature);

        match &signature.return_type {
            Some(ty) => {
                let target = self.fresh();
                self.lines.push(format!(
                    "  {target} = call {} {callee}({})",
                    value_type(&ty.name),
                    rendered.join(", ")
                ));
                Ok(Value {
                    repr: target,
                    ty: ty.name.clone(),
                })
            }
            None => {
                self.lines
                    .push(format!("  call void {callee}({})", rendered.join(", ")));
                // A void call in value position has no type; model it
                // as a unit the caller cannot consume.
                Ok(Value {
                    repr: "void".to_string(),
                    ty: "Nothing".to_string(),
                })
            }
        }
    }
}

fn type_does_not_support(op: &str, ty: &str) -> OrbitError {
    OrbitError::Compilation(format!("operator '{op}' is not defined for type '{ty}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::typecheck::TypeResolver;

    fn emit(input: &str) -> Result<LlvmModule, OrbitError> {
        let tokens = Lexer::new().execute(input.to_string())?;
        let program = Parser::new().execute(tokens)?;
        let typed = TypeResolver::new().execute(program)?;
        CodeGenerator::new().execute(typed)
    }

    #[test]
    fn emits_arithmetic_method() {
        let module = emit("api M { (Int) sum (a Int, b Int) (Int) { return a + b * 2 } }")
            .expect("emit");
        assert!(module.ir.contains("define i64 @\"M.Int.sum\"(i64 %a, i64 %b)"));
        assert!(module.ir.contains("mul i64 %b, 2"));
        assert!(module.ir.contains("ret i64"));
    }

    #[test]
    fn emits_real_arithmetic() {
        let module =
            emit("api M { (Real) halve (x Real) (Real) { return x / 2.0 } }").expect("emit");
        assert!(module.ir.contains("fdiv double %x"));
        // 2.0 renders in bit-exact hex form.
        assert!(module.ir.contains("0x4000000000000000"));
    }

    #[test]
    fn emits_type_definitions() {
        let module = emit("api Geo { type Point(x Int, y Real) }").expect("emit");
        assert!(module.ir.contains("%Point = type { i64, double }"));
    }

    #[test]
    fn void_method_returns_void() {
        let module = emit("api M { (Int) noop () {} }").expect("emit");
        assert!(module.ir.contains("define void @\"M.Int.noop\"()"));
        assert!(module.ir.contains("ret void"));
    }

    #[test]
    fn lowers_static_call() {
        let source = "api M {
            (Int) two () (Int) { return 2 }
            (Int) four () (Int) { return Int.two() + Int.two() }
        }";
        let module = emit(source).expect("emit");
        assert!(module.ir.contains("call i64 @\"M.Int.two\"()"));
    }

    #[test]
    fn lowers_instance_call_with_receiver_first() {
        let source = "api M {
            (Int) double (x Int) (Int) { return x + x }
            (Int) quadruple (x Int) (Int) { return x.double().double() }
        }";
        let module = emit(source).expect("emit");
        assert!(module.ir.contains("call i64 @\"M.Int.double\"(i64 %x)"));
    }

    #[test]
    fn deferred_blocks_run_before_return_most_recent_first() {
        let source = "api M {
            (Int) log (x Int) {}
            (Int) go (x Int) (Int) {
                defer { x.log() }
                defer { (x + 1).log() }
                return x
            }
        }";
        let module = emit(source).expect("emit");
        let first_defer = module.ir.find("add i64 %x, 1").expect("second defer body");
        let second_defer = module.ir.rfind("call void @\"M.Int.log\"(i64 %x)").expect("first defer body");
        let ret = module.ir.find("ret i64 %x").expect("ret");
        assert!(first_defer < second_defer, "defers must run most recent first");
        assert!(second_defer < ret, "defers must run before the return");
    }

    #[test]
    fn rejects_missing_return() {
        let err = emit("api M { (Int) sum (a Int) (Int) { a } }").unwrap_err();
        assert!(err.to_string().contains("no return statement"));
    }

    #[test]
    fn rejects_return_type_mismatch() {
        let err = emit("api M { (Int) sum (a Int) (Real) { return a } }").unwrap_err();
        assert!(err.to_string().contains("declares 'Real'"));
    }

    #[test]
    fn rejects_unknown_method() {
        let err = emit("api M { (Int) go (x Int) { x.missing() } }").unwrap_err();
        assert!(err.to_string().contains("no method 'missing'"));
    }

    #[test]
    fn rejects_arity_mismatch() {
        let source = "api M {
            (Int) double (x Int) (Int) { return x + x }
            (Int) go (x Int) { Int.double(x, x) }
        }";
        let err = emit(source).unwrap_err();
        assert!(err.to_string().contains("expects 1 arguments but received 2"));
    }

    #[test]
    fn rejects_arithmetic_on_user_types() {
        let source = "api Geo {
            type Point(x Int)
            (Point) go (p Point) { p + p }
        }";
        let err = emit(source).unwrap_err();
        assert!(err.to_string().contains("not defined for type 'Point'"));
    }

    #[test]
    fn bitcode_is_not_supported() {
        let module = emit("api M { (Int) noop () {} }").expect("emit");
        let err = emit_bitcode(&module).unwrap_err();
        assert!(matches!(err, OrbitError::Compilation(_)));
    }
}
