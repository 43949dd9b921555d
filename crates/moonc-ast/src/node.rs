//! Node identifiers, kinds and storage.

use std::fmt;

use moonc_core::Span;

/// Index of a node inside its [`Ast`](crate::Ast).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Construct an identifier from a raw value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Retrieve the underlying integer value.
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Discriminant of an AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Empty,
    Program,
    ClassList,
    FunctionList,
    ImplementationList,

    // Declarations
    Class,
    ClassId,
    InheritanceList,
    InheritanceId,
    MemberList,
    Member,
    Visibility,
    Variable,
    VariableId,
    LocalVariable,
    Type,
    ArrayDimension,
    FunctionDeclaration,
    FunctionSignature,
    ConstructorSignature,
    FunctionId,
    ParamList,
    Param,
    ParamId,
    Function,
    FunctionBody,
    Implementation,
    ImplementationId,
    ImplementationFunctionList,

    // Statements
    Block,
    IfStatement,
    WhileStatement,
    Assignment,
    ReadStatement,
    WriteStatement,
    ReturnStatement,
    ExpressionStatement,

    // Expressions
    Int,
    Float,
    Identifier,
    SelfIdentifier,
    AddOp,
    MultOp,
    RelOp,
    FunctionCall,
    ArrayAccess,
    DotAccess,
}

impl NodeKind {
    /// Whether evaluating this node produces a value that needs a temporary.
    pub fn is_temporary_producing(self) -> bool {
        matches!(
            self,
            NodeKind::Int
                | NodeKind::Float
                | NodeKind::AddOp
                | NodeKind::MultOp
                | NodeKind::RelOp
                | NodeKind::FunctionCall
                | NodeKind::ArrayAccess
                | NodeKind::DotAccess
        )
    }

    /// Whether this node is an expression: a temporary-producing node or a
    /// plain name.
    pub fn is_expression(self) -> bool {
        self.is_temporary_producing()
            || matches!(self, NodeKind::Identifier | NodeKind::SelfIdentifier)
    }
}

/// A single node: kind, text, position and its links in the tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub value: String,
    pub span: Span,
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, value: String, span: Span) -> Self {
        Self {
            kind,
            value,
            span,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }
}
