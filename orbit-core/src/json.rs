//! Tagged-tree serialization of the AST.
//!
//! Every node maps to a JSON object carrying an `@node_type`
//! discriminator plus the node's fields, recursively serialized. The
//! discriminator strings and field names are a compatibility contract
//! with external tooling and must not change, down to the historical
//! `TypeIdenfifier` misspelling.
//!
//! Each variant implements [`TaggedJson`] for itself without knowing
//! about its siblings; the impl on [`Expression`] is the one place
//! that dispatches on an erased node, and its `Extension` arm keeps
//! the serializer total: a node of an unrecognized kind becomes an
//! `Unsupported <kind>` stand-in instead of an error.

use serde_json::{Value, json};

use crate::error::OrbitError;

use crate::ast::{
    Api, BinaryExpr, Block, DeferStatement, Expression, Identifier, InstanceCall, IntLiteral,
    Method, Pair, Program, RealLiteral, ReturnStatement, Signature, StaticCall, TypeDef,
    TypeIdentifier, UnaryExpr,
};

/// Conversion into the tagged JSON representation.
///
/// Implementations are pure: they never fail and never touch the
/// node beyond reading it.
pub trait TaggedJson {
    fn to_json(&self) -> Value;
}

/// Render a tagged tree as pretty-printed JSON text.
pub fn render(value: &Value) -> Result<String, OrbitError> {
    serde_json::to_string_pretty(value).map_err(|err| OrbitError::Serialization(err.to_string()))
}

impl TaggedJson for Identifier {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "Identifier",
            "value": self.name,
        })
    }
}

impl TaggedJson for TypeIdentifier {
    fn to_json(&self) -> Value {
        // "TypeIdenfifier" is a historical misspelling that external
        // consumers of the tagged format depend on.
        json!({
            "@node_type": "TypeIdenfifier",
            "value": self.name,
        })
    }
}

impl TaggedJson for Pair {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "IDTypePair",
            "identifier": self.name.to_json(),
            "type": self.ty.to_json(),
        })
    }
}

impl TaggedJson for TypeDef {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "TypeDef",
            "value": self.name,
            "properties": self.properties.iter().map(Pair::to_json).collect::<Vec<_>>(),
        })
    }
}

impl TaggedJson for Signature {
    fn to_json(&self) -> Value {
        // An absent return type is an explicit null, never an
        // omitted key.
        let return_type = match &self.return_type {
            Some(ty) => ty.to_json(),
            None => Value::Null,
        };
        json!({
            "@node_type": "Signature",
            "receiverType": self.receiver_type.to_json(),
            "returnType": return_type,
            "parameters": self.parameters.iter().map(Pair::to_json).collect::<Vec<_>>(),
        })
    }
}

impl TaggedJson for IntLiteral {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "IntLiteral",
            "value": self.value,
        })
    }
}

impl TaggedJson for RealLiteral {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "RealLiteral",
            "value": self.value,
        })
    }
}

impl TaggedJson for UnaryExpr {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "UnaryExpr",
            "operator": format!("{} : {}", self.op.symbol, self.op.position),
            "value": self.operand.to_json(),
        })
    }
}

impl TaggedJson for BinaryExpr {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "BinaryExpr",
            "operator": format!("{} : {}", self.op.symbol, self.op.position),
            "left": self.left.to_json(),
            "right": self.right.to_json(),
        })
    }
}

impl TaggedJson for InstanceCall {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "InstanceCall",
            "receiver": self.receiver.to_json(),
            "method": self.method.to_json(),
            "arguments": self.arguments.iter().map(Expression::to_json).collect::<Vec<_>>(),
        })
    }
}

impl TaggedJson for StaticCall {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "StaticCall",
            "receiver": self.receiver.to_json(),
            "method": self.method.to_json(),
            "arguments": self.arguments.iter().map(Expression::to_json).collect::<Vec<_>>(),
        })
    }
}

impl TaggedJson for ReturnStatement {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "Return",
            "value": self.value.to_json(),
        })
    }
}

impl TaggedJson for DeferStatement {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "Defer",
            "value": self.block.to_json(),
        })
    }
}

impl TaggedJson for Block {
    fn to_json(&self) -> Value {
        let return_statement = match &self.return_statement {
            Some(ret) => ret.to_json(),
            None => Value::Null,
        };
        json!({
            "@node_type": "Block",
            "body": self.body.iter().map(Expression::to_json).collect::<Vec<_>>(),
            "return": return_statement,
        })
    }
}

impl TaggedJson for Method {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "Method",
            "signature": self.signature.to_json(),
            "body": self.body.to_json(),
        })
    }
}

impl TaggedJson for Api {
    fn to_json(&self) -> Value {
        // Partitioned by kind, each partition keeping source order.
        json!({
            "@node_type": "API",
            "value": self.name,
            "types": self.type_defs().map(TypeDef::to_json).collect::<Vec<_>>(),
            "methods": self.methods().map(Method::to_json).collect::<Vec<_>>(),
        })
    }
}

impl TaggedJson for Program {
    fn to_json(&self) -> Value {
        json!({
            "@node_type": "Program",
            "apis": self.apis.iter().map(Api::to_json).collect::<Vec<_>>(),
        })
    }
}

impl TaggedJson for Expression {
    /// Dispatch for nodes whose concrete kind has been erased.
    ///
    /// Leaf impls stay ignorant of their siblings; only this match
    /// knows the full variant set, and the `Extension` arm makes it
    /// total over kinds this crate has never heard of.
    fn to_json(&self) -> Value {
        match self {
            Expression::Identifier(node) => node.to_json(),
            Expression::TypeIdentifier(node) => node.to_json(),
            Expression::IntLiteral(node) => node.to_json(),
            Expression::RealLiteral(node) => node.to_json(),
            Expression::Unary(node) => node.to_json(),
            Expression::Binary(node) => node.to_json(),
            Expression::InstanceCall(node) => node.to_json(),
            Expression::StaticCall(node) => node.to_json(),
            Expression::Return(node) => node.to_json(),
            Expression::Defer(node) => node.to_json(),
            Expression::Extension(node) => json!({
                "@node_type": format!("Unsupported {}", node.kind),
            }),
        }
    }
}
