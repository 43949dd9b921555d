//! Arena-backed abstract syntax tree consumed by the semantic passes.
//!
//! The parser hands over a tree in leftmost-child / right-sibling form. Nodes
//! live in one `Vec` owned by [`Ast`] and refer to each other through
//! [`NodeId`]s, so parent back-links need no shared ownership.
//!
//! ## Node shapes
//!
//! ```text
//! Program            ClassList? ImplementationList? FunctionList?
//! Class              ClassId InheritanceList MemberList
//! Member             Visibility? (Variable | FunctionDeclaration)
//! Variable           Type VariableId ArrayDimension*      (also LocalVariable)
//! Param              Type ParamId ArrayDimension*
//! FunctionDeclaration  FunctionSignature | ConstructorSignature
//! FunctionSignature  FunctionId ParamList Type
//! ConstructorSignature ParamList
//! Function           (FunctionSignature | ConstructorSignature) FunctionBody
//! Implementation     ImplementationId ImplementationFunctionList
//! FunctionBody       (LocalVariable | statement)*
//! IfStatement        expr Block Block
//! WhileStatement     expr Block
//! Assignment         target expr
//! AddOp/MultOp/RelOp expr expr                 (value = operator text)
//! FunctionCall       expr*                     (value = callee name)
//! ArrayAccess        expr expr+
//! DotAccess          expr (Identifier | FunctionCall)
//! ```

mod annotation;
mod builder;
mod node;
mod tree;

pub use annotation::{TempAnnotation, TempKind};
pub use builder::AstBuilder;
pub use node::{Node, NodeId, NodeKind};
pub use tree::{Ast, Children};
