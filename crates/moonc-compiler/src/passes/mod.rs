//! Compiler passes.
//!
//! - [`scope_building`]: Pass 1 - build the scope tree and report declaration errors
//! - [`layout`]: Pass 2 - size symbols, synthesize temporaries, assign offsets
//!
//! Both passes read declarations through the helpers below so that a function
//! signature computed while building scopes is identical to the one computed
//! while laying them out.

pub mod layout;
pub mod scope_building;

pub use layout::{BaseRegion, FrameLayout, LayoutInfo, LayoutOutput, LayoutPass, SlotKind};
pub use scope_building::{ScopeBuildingOutput, ScopeBuildingPass};

use moonc_ast::{Ast, NodeId, NodeKind};
use moonc_core::{Span, primitives};
use moonc_registry::{Param, Signature, Symbol, format_type};

/// Parse one array dimension. Empty text is an unsized dimension (`-1`);
/// anything that is not a positive integer is `None`.
pub(crate) fn parse_dimension(text: &str) -> Option<i32> {
    let text = text.trim();
    if text.is_empty() {
        return Some(-1);
    }
    text.parse::<i32>().ok().filter(|n| *n > 0)
}

/// A variable, local or parameter declaration as written.
#[derive(Debug, Clone)]
pub(crate) struct VarDecl {
    pub name: String,
    pub type_name: String,
    /// Raw dimension texts, in order.
    pub dims: Vec<String>,
    pub span: Span,
}

impl VarDecl {
    pub fn read(ast: &Ast, node: NodeId) -> Self {
        let type_name = ast
            .child_of_kind(node, NodeKind::Type)
            .map(|t| ast.value(t).to_string())
            .unwrap_or_default();
        let name = ast
            .children(node)
            .find(|&c| matches!(ast.kind(c), NodeKind::VariableId | NodeKind::ParamId))
            .map(|id| ast.value(id).to_string())
            .unwrap_or_else(|| ast.value(node).to_string());
        let dims = ast
            .children(node)
            .filter(|&c| ast.kind(c) == NodeKind::ArrayDimension)
            .map(|c| ast.value(c).to_string())
            .collect();
        Self {
            name,
            type_name,
            dims,
            span: ast.span(node),
        }
    }

    /// Dimensions with malformed entries read as unsized.
    pub fn dimensions(&self) -> Vec<i32> {
        self.dims
            .iter()
            .map(|d| parse_dimension(d).unwrap_or(-1))
            .collect()
    }

    pub fn type_text(&self) -> String {
        format_type(&self.type_name, &self.dimensions())
    }

    pub fn to_parameter(&self) -> Symbol {
        Symbol::parameter(&self.name, &self.type_name, self.dimensions(), self.span)
    }
}

/// The header of a function definition or declaration.
#[derive(Debug, Clone)]
pub(crate) struct FunctionHeader {
    pub name: String,
    pub return_type: String,
    pub params: Vec<VarDecl>,
    pub span: Span,
}

impl FunctionHeader {
    /// Read the `FunctionSignature` / `ConstructorSignature` child of `node`.
    ///
    /// Constructors are named after `class` and return it.
    pub fn read(ast: &Ast, node: NodeId, class: Option<&str>) -> Option<Self> {
        let sig = ast.children(node).find(|&c| {
            matches!(
                ast.kind(c),
                NodeKind::FunctionSignature | NodeKind::ConstructorSignature
            )
        })?;
        let params = ast
            .child_of_kind(sig, NodeKind::ParamList)
            .map(|list| {
                ast.children(list)
                    .filter(|&p| ast.kind(p) == NodeKind::Param)
                    .map(|p| VarDecl::read(ast, p))
                    .collect()
            })
            .unwrap_or_default();

        let (name, return_type) = if ast.kind(sig) == NodeKind::ConstructorSignature {
            let class = class.unwrap_or_default().to_string();
            (class.clone(), class)
        } else {
            let name = ast
                .child_of_kind(sig, NodeKind::FunctionId)
                .map(|id| ast.value(id).to_string())
                .unwrap_or_else(|| ast.value(sig).to_string());
            let ret = ast
                .child_of_kind(sig, NodeKind::Type)
                .map(|t| ast.value(t).to_string())
                .unwrap_or_else(|| primitives::VOID.to_string());
            (name, ret)
        };

        Some(Self {
            name,
            return_type,
            params,
            span: ast.span(node),
        })
    }

    pub fn signature(&self) -> Signature {
        Signature::new(
            self.name.clone(),
            self.params.iter().map(VarDecl::type_text).collect(),
        )
    }

    pub fn to_symbol(&self) -> Symbol {
        let params = self
            .params
            .iter()
            .map(|p| Param {
                name: p.name.clone(),
                type_name: p.type_text(),
            })
            .collect();
        Symbol::function(&self.name, &self.return_type, params, self.span)
    }

    /// Display name of the function's scope.
    pub fn scope_name(&self, class: Option<&str>) -> String {
        match class {
            Some(class) => format!("{}::{}", class, self.signature()),
            None => self.signature().to_string(),
        }
    }
}

/// Visit every `LocalVariable` under `node` in source order.
pub(crate) fn for_each_local(ast: &Ast, node: NodeId, f: &mut impl FnMut(NodeId)) {
    for child in ast.children(node) {
        if ast.kind(child) == NodeKind::LocalVariable {
            f(child);
        } else {
            for_each_local(ast, child, f);
        }
    }
}
