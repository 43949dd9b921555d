//! Typed constructors for well-formed trees.
//!
//! The table-driven parser drives [`Ast::make_family`] directly from its
//! semantic actions; this builder produces the same shapes for tools and
//! tests that assemble programs by hand.

use crate::{Ast, NodeId, NodeKind};

/// Builds an [`Ast`] bottom-up.
///
/// Every node is stamped with the builder's current line, set with
/// [`line`](Self::line).
#[derive(Debug, Default)]
pub struct AstBuilder {
    ast: Ast,
    line: u32,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self {
            ast: Ast::new(),
            line: 1,
        }
    }

    /// Set the source line for nodes created from now on.
    pub fn line(&mut self, line: u32) -> &mut Self {
        self.line = line;
        self
    }

    /// Finish with `root` as the tree root.
    pub fn finish(mut self, root: NodeId) -> Ast {
        self.ast.set_root(root);
        self.ast
    }

    pub fn leaf(&mut self, kind: NodeKind, value: &str) -> NodeId {
        self.ast.create_node(kind, value, self.line)
    }

    pub fn family(&mut self, kind: NodeKind, value: &str, kids: &[NodeId]) -> NodeId {
        self.ast.make_family(kind, value, self.line, kids)
    }

    // ==========================================================================
    // Program structure
    // ==========================================================================

    /// `Program` with the given top-level lists.
    pub fn program(&mut self, lists: &[NodeId]) -> NodeId {
        self.family(NodeKind::Program, "", lists)
    }

    pub fn class_list(&mut self, classes: &[NodeId]) -> NodeId {
        self.family(NodeKind::ClassList, "", classes)
    }

    pub fn function_list(&mut self, functions: &[NodeId]) -> NodeId {
        self.family(NodeKind::FunctionList, "", functions)
    }

    pub fn implementation_list(&mut self, implementations: &[NodeId]) -> NodeId {
        self.family(NodeKind::ImplementationList, "", implementations)
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    pub fn class(&mut self, name: &str, parents: &[&str], members: &[NodeId]) -> NodeId {
        let id = self.leaf(NodeKind::ClassId, name);
        let parent_ids: Vec<_> = parents
            .iter()
            .map(|p| self.leaf(NodeKind::InheritanceId, p))
            .collect();
        let inheritance = self.family(NodeKind::InheritanceList, "", &parent_ids);
        let member_list = self.family(NodeKind::MemberList, "", members);
        self.family(NodeKind::Class, name, &[id, inheritance, member_list])
    }

    /// A class member with an optional `public`/`private` marker.
    pub fn member(&mut self, visibility: Option<&str>, decl: NodeId) -> NodeId {
        match visibility {
            Some(vis) => {
                let marker = self.leaf(NodeKind::Visibility, vis);
                self.family(NodeKind::Member, "", &[marker, decl])
            }
            None => self.family(NodeKind::Member, "", &[decl]),
        }
    }

    /// A data member. `dims` holds the raw dimension texts (`""` for `[]`).
    pub fn data_member(&mut self, ty: &str, name: &str, dims: &[&str]) -> NodeId {
        self.variable_like(NodeKind::Variable, NodeKind::VariableId, ty, name, dims)
    }

    pub fn local(&mut self, ty: &str, name: &str, dims: &[&str]) -> NodeId {
        self.variable_like(
            NodeKind::LocalVariable,
            NodeKind::VariableId,
            ty,
            name,
            dims,
        )
    }

    pub fn param(&mut self, ty: &str, name: &str, dims: &[&str]) -> NodeId {
        self.variable_like(NodeKind::Param, NodeKind::ParamId, ty, name, dims)
    }

    fn variable_like(
        &mut self,
        kind: NodeKind,
        id_kind: NodeKind,
        ty: &str,
        name: &str,
        dims: &[&str],
    ) -> NodeId {
        let mut kids = vec![self.leaf(NodeKind::Type, ty), self.leaf(id_kind, name)];
        for dim in dims {
            kids.push(self.leaf(NodeKind::ArrayDimension, dim));
        }
        self.family(kind, name, &kids)
    }

    pub fn signature(&mut self, name: &str, params: &[NodeId], return_type: &str) -> NodeId {
        let id = self.leaf(NodeKind::FunctionId, name);
        let list = self.family(NodeKind::ParamList, "", params);
        let ret = self.leaf(NodeKind::Type, return_type);
        self.family(NodeKind::FunctionSignature, name, &[id, list, ret])
    }

    pub fn constructor_signature(&mut self, params: &[NodeId]) -> NodeId {
        let list = self.family(NodeKind::ParamList, "", params);
        self.family(NodeKind::ConstructorSignature, "", &[list])
    }

    /// A member function declaration without a body.
    pub fn function_decl(&mut self, name: &str, params: &[NodeId], return_type: &str) -> NodeId {
        let sig = self.signature(name, params, return_type);
        self.family(NodeKind::FunctionDeclaration, name, &[sig])
    }

    pub fn constructor_decl(&mut self, params: &[NodeId]) -> NodeId {
        let sig = self.constructor_signature(params);
        self.family(NodeKind::FunctionDeclaration, "", &[sig])
    }

    /// A function definition. `body` mixes local declarations and statements.
    pub fn function(
        &mut self,
        name: &str,
        params: &[NodeId],
        return_type: &str,
        body: &[NodeId],
    ) -> NodeId {
        let sig = self.signature(name, params, return_type);
        let body = self.family(NodeKind::FunctionBody, "", body);
        self.family(NodeKind::Function, name, &[sig, body])
    }

    pub fn constructor(&mut self, params: &[NodeId], body: &[NodeId]) -> NodeId {
        let sig = self.constructor_signature(params);
        let body = self.family(NodeKind::FunctionBody, "", body);
        self.family(NodeKind::Function, "", &[sig, body])
    }

    pub fn implementation(&mut self, class: &str, functions: &[NodeId]) -> NodeId {
        let id = self.leaf(NodeKind::ImplementationId, class);
        let list = self.family(NodeKind::ImplementationFunctionList, "", functions);
        self.family(NodeKind::Implementation, class, &[id, list])
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    pub fn block(&mut self, statements: &[NodeId]) -> NodeId {
        self.family(NodeKind::Block, "", statements)
    }

    pub fn assign(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.family(NodeKind::Assignment, "=", &[target, value])
    }

    pub fn if_stmt(&mut self, cond: NodeId, then: &[NodeId], otherwise: &[NodeId]) -> NodeId {
        let then = self.block(then);
        let otherwise = self.block(otherwise);
        self.family(NodeKind::IfStatement, "", &[cond, then, otherwise])
    }

    pub fn while_stmt(&mut self, cond: NodeId, body: &[NodeId]) -> NodeId {
        let body = self.block(body);
        self.family(NodeKind::WhileStatement, "", &[cond, body])
    }

    pub fn read(&mut self, target: NodeId) -> NodeId {
        self.family(NodeKind::ReadStatement, "", &[target])
    }

    pub fn write(&mut self, value: NodeId) -> NodeId {
        self.family(NodeKind::WriteStatement, "", &[value])
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        match value {
            Some(v) => self.family(NodeKind::ReturnStatement, "", &[v]),
            None => self.family(NodeKind::ReturnStatement, "", &[]),
        }
    }

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.family(NodeKind::ExpressionStatement, "", &[expr])
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    pub fn int(&mut self, text: &str) -> NodeId {
        self.leaf(NodeKind::Int, text)
    }

    pub fn float(&mut self, text: &str) -> NodeId {
        self.leaf(NodeKind::Float, text)
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.leaf(NodeKind::Identifier, name)
    }

    pub fn self_ident(&mut self) -> NodeId {
        self.leaf(NodeKind::SelfIdentifier, "self")
    }

    /// `+`, `-` or `or`.
    pub fn add(&mut self, op: &str, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.family(NodeKind::AddOp, op, &[lhs, rhs])
    }

    /// `*`, `/` or `and`.
    pub fn mult(&mut self, op: &str, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.family(NodeKind::MultOp, op, &[lhs, rhs])
    }

    pub fn rel(&mut self, op: &str, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.family(NodeKind::RelOp, op, &[lhs, rhs])
    }

    pub fn call(&mut self, name: &str, args: &[NodeId]) -> NodeId {
        self.family(NodeKind::FunctionCall, name, args)
    }

    pub fn index(&mut self, base: NodeId, indices: &[NodeId]) -> NodeId {
        let mut kids = Vec::with_capacity(indices.len() + 1);
        kids.push(base);
        kids.extend_from_slice(indices);
        self.family(NodeKind::ArrayAccess, "", &kids)
    }

    pub fn dot(&mut self, object: NodeId, member: NodeId) -> NodeId {
        self.family(NodeKind::DotAccess, ".", &[object, member])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_shape() {
        let mut b = AstBuilder::new();
        let field = b.data_member("int", "x", &["3"]);
        let member = b.member(Some("public"), field);
        let class = b.class("Point", &["Shape"], &[member]);
        let ast = b.finish(class);

        let kids: Vec<_> = ast.children(class).map(|c| ast.kind(c)).collect();
        assert_eq!(
            kids,
            vec![
                NodeKind::ClassId,
                NodeKind::InheritanceList,
                NodeKind::MemberList
            ]
        );
        let inheritance = ast.child(class, 1).unwrap();
        assert_eq!(ast.value(ast.child(inheritance, 0).unwrap()), "Shape");
        assert_eq!(ast.value(ast.child(field, 2).unwrap()), "3");
    }

    #[test]
    fn function_shape() {
        let mut b = AstBuilder::new();
        let p = b.param("float", "r", &[]);
        let x = b.local("int", "x", &[]);
        let f = b.function("area", &[p], "float", &[x]);
        let ast = b.finish(f);

        let sig = ast.child(f, 0).unwrap();
        assert_eq!(ast.kind(sig), NodeKind::FunctionSignature);
        assert_eq!(ast.value(ast.child(sig, 0).unwrap()), "area");
        assert_eq!(ast.value(ast.child(sig, 2).unwrap()), "float");
        let body = ast.child(f, 1).unwrap();
        assert_eq!(ast.children(body).count(), 1);
    }

    #[test]
    fn lines_are_stamped() {
        let mut b = AstBuilder::new();
        b.line(9);
        let lit = b.int("1");
        let ast = b.finish(lit);
        assert_eq!(ast.span(lit).line, 9);
        assert_eq!(ast.root(), Some(lit));
    }
}
