//! ECSQL SELECT syntax tree.
//!
//! Every node that later needs rewriting keeps the `&'a str` slice it was
//! parsed from; callers recover byte ranges with
//! [`subslice_range`](crate::utils::text_edit::subslice_range).

#[derive(Debug, PartialEq, Clone)]
pub struct SelectStatement<'a> {
    pub with_clause: Option<WithClause<'a>>,
    pub body: SelectBody<'a>,
    pub order_by: Vec<OrderByItem<'a>>,
    pub limit: Option<LimitClause<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct WithClause<'a> {
    pub recursive: bool,
    pub ctes: Vec<CommonTableExpression<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CommonTableExpression<'a> {
    pub name: &'a str,
    /// Explicit column list, `WITH c(a, b) AS (...)`
    pub columns: Option<Vec<&'a str>>,
    pub query: Box<SelectStatement<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SelectBody<'a> {
    pub first: SelectCore<'a>,
    pub compounds: Vec<(CompoundOperator, SelectCore<'a>)>,
}

impl<'a> SelectBody<'a> {
    pub fn cores(&self) -> impl Iterator<Item = &SelectCore<'a>> {
        std::iter::once(&self.first).chain(self.compounds.iter().map(|(_, core)| core))
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CompoundOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SelectCore<'a> {
    pub distinct: bool,
    pub items: Vec<SelectItem<'a>>,
    /// The whole select list, from the first item to the end of the last
    pub select_list: &'a str,
    pub from: Vec<FromItem<'a>>,
    pub where_clause: Option<Expression<'a>>,
    pub group_by: Vec<Expression<'a>>,
    pub having: Option<Expression<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum SelectItem<'a> {
    /// `*` or `alias.*`
    Wildcard { qualifier: Option<&'a str> },
    Expression {
        expr: Expression<'a>,
        /// Source text of the expression, without the alias
        text: &'a str,
        alias: Option<&'a str>,
    },
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum JoinOperator {
    Inner,
    Left,
    Right,
    Cross,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FromItem<'a> {
    /// `None` for the first item and for comma-separated items
    pub join: Option<JoinOperator>,
    pub source: TableSource<'a>,
    pub alias: Option<&'a str>,
    pub constraint: Option<JoinConstraint<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum JoinConstraint<'a> {
    On(Expression<'a>),
    Using(Vec<&'a str>),
}

#[derive(Debug, PartialEq, Clone)]
pub enum TableSource<'a> {
    /// `[ONLY|ALL] schema.Class` or a bare CTE name
    Class(ClassRef<'a>),
    Subquery(Box<SelectStatement<'a>>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassRef<'a> {
    pub schema: Option<&'a str>,
    pub name: &'a str,
    /// `false` for `ONLY`
    pub polymorphic: bool,
    /// Source text of the reference including any ONLY/ALL modifier, without
    /// the alias
    pub text: &'a str,
}

#[derive(Debug, PartialEq, Clone)]
pub struct OrderByItem<'a> {
    pub expr: Expression<'a>,
    pub descending: bool,
}

#[derive(Debug, PartialEq, Clone)]
pub struct LimitClause<'a> {
    pub limit: Expression<'a>,
    pub offset: Option<Expression<'a>>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal<'a> {
    Integer(i64),
    Float(f64),
    String(&'a str),
    Boolean(bool),
    Null,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Minus,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
    BitAnd,
    BitOr,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanEqual
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::Or | BinaryOperator::And)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionCall<'a> {
    pub name: &'a str,
    pub distinct: bool,
    /// `COUNT(*)`
    pub star: bool,
    pub args: Vec<Expression<'a>>,
    /// Source text of each argument
    pub arg_texts: Vec<&'a str>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression<'a> {
    Literal(Literal<'a>),
    /// `?`, `:name`
    Parameter(&'a str),
    /// `alias.Prop.Member`, `Prop`
    PropertyPath(Vec<&'a str>),
    FunctionCall(FunctionCall<'a>),
    Cast {
        expr: Box<Expression<'a>>,
        target: &'a str,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<Expression<'a>>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression<'a>>,
        right: Box<Expression<'a>>,
    },
    IsNull {
        expr: Box<Expression<'a>>,
        negated: bool,
    },
    Like {
        expr: Box<Expression<'a>>,
        pattern: Box<Expression<'a>>,
        negated: bool,
    },
    InList {
        expr: Box<Expression<'a>>,
        list: Vec<Expression<'a>>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expression<'a>>,
        query: Box<SelectStatement<'a>>,
        negated: bool,
    },
    Between {
        expr: Box<Expression<'a>>,
        low: Box<Expression<'a>>,
        high: Box<Expression<'a>>,
        negated: bool,
    },
    Case {
        operand: Option<Box<Expression<'a>>>,
        branches: Vec<(Expression<'a>, Expression<'a>)>,
        else_result: Option<Box<Expression<'a>>>,
    },
    Exists(Box<SelectStatement<'a>>),
    Subquery(Box<SelectStatement<'a>>),
    /// `$`, `alias.$`, `$->Prop`, `alias.$->Prop`
    InstanceAccess(InstanceAccess<'a>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct InstanceAccess<'a> {
    pub qualifier: Option<&'a str>,
    /// `None` for the full-instance form
    pub property: Option<&'a str>,
    /// Source text of the whole access expression
    pub text: &'a str,
}
