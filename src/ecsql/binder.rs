//! Name resolution and result typing for parsed ECSQL.
//!
//! The binder walks a [`SelectStatement`] with a stack of visible common
//! table expressions and a chain of FROM-clause environments (one per nesting
//! level, so correlated subqueries can see their parent's sources). Besides
//! the output columns it records the spans later rewritten by the view
//! compiler.
//!
//! Output column aliases are visible in GROUP BY, HAVING and ORDER BY. ORDER BY
//! looks them up before the FROM sources; GROUP BY and HAVING only fall back to
//! them when no source has a column of that name.

use std::ops::Range;
use std::sync::Arc;

use log::debug;

use super::ast::{
    BinaryOperator, ClassRef, CommonTableExpression, Expression, FromItem, FunctionCall,
    InstanceAccess, JoinConstraint, Literal, SelectBody, SelectCore, SelectItem,
    SelectStatement, TableSource, UnaryOperator, WithClause,
};
use super::functions::{self, ReturnType, NAVIGATION_VALUE};
use super::{
    parse_ecsql, AliasReference, ClassReference, ClassScope, ColumnInfo, CoreProjection, ExtractionSite,
    PrepareError, PreparedQuery, QueryCompiler, SlotSource,
};
use crate::schema_catalog::{
    ClassKind, EcClass, PrimitiveType, PropertyType, SchemaCatalog, NAV_ID, NAV_REL_ECCLASSID,
};
use crate::utils::identifiers::bracket_alias;
use crate::utils::text_edit::subslice_range;

/// The reference [`QueryCompiler`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EcSqlCompiler;

impl EcSqlCompiler {
    pub fn new() -> Self {
        EcSqlCompiler
    }
}

impl QueryCompiler for EcSqlCompiler {
    fn prepare(&self, ecsql: &str, scope: &dyn ClassScope) -> Result<PreparedQuery, PrepareError> {
        let statement = parse_ecsql(ecsql)?;
        let mut binder = Binder::new(ecsql, scope);
        let columns = binder.bind_statement(&statement, None, true)?;
        debug!(
            "Prepared ECSQL: {} column(s), {} class reference(s)",
            columns.len(),
            binder.class_references.len()
        );
        Ok(binder.finish(columns))
    }
}

/// Any system property name, entity or relationship.
pub fn is_system_name(name: &str) -> bool {
    ClassKind::Relationship.is_system_property(name)
}

fn primitive(p: PrimitiveType) -> Option<PropertyType> {
    Some(PropertyType::Primitive(p))
}

fn is_integral(ty: Option<&PropertyType>) -> bool {
    ty.and_then(|t| t.as_primitive())
        .is_some_and(|p| p.is_integral())
}

enum SourceKind {
    Class(Arc<EcClass>),
    /// Subquery or CTE
    Derived(Vec<ColumnInfo>),
}

/// A FROM-clause item after binding.
struct Source {
    /// Explicit alias, else the class or CTE name. Empty for an unaliased subquery.
    alias: String,
    kind: SourceKind,
}

impl Source {
    fn columns(&self, catalog: &SchemaCatalog) -> Vec<ColumnInfo> {
        match &self.kind {
            SourceKind::Class(class) => catalog
                .all_properties(class.id)
                .into_iter()
                .map(|p| ColumnInfo {
                    name: p.name.clone(),
                    origin: Some(p.name),
                    column_type: Some(p.property_type),
                    is_system: p.is_system,
                })
                .collect(),
            SourceKind::Derived(columns) => columns.clone(),
        }
    }

    fn matches_alias(&self, alias: &str) -> bool {
        !self.alias.is_empty() && self.alias.eq_ignore_ascii_case(alias)
    }
}

struct Env<'p> {
    sources: &'p [Source],
    parent: Option<&'p Env<'p>>,
}

impl<'p> Env<'p> {
    fn levels(&self) -> impl Iterator<Item = &Env<'p>> {
        std::iter::successors(Some(self), |env| env.parent)
    }
}

/// Output columns of the SELECT core being finished.
struct OutputAliases {
    columns: Vec<ColumnInfo>,
    /// Only uses in top-level cores are rewritten by the view compiler
    record: bool,
}

struct ResolvedPath {
    name: String,
    property_type: Option<PropertyType>,
}

struct Binder<'s> {
    text: &'s str,
    scope: &'s dyn ClassScope,
    /// Visible CTEs, innermost last
    ctes: Vec<(String, Vec<ColumnInfo>)>,
    projections: Vec<CoreProjection>,
    class_references: Vec<ClassReference>,
    alias_references: Vec<AliasReference>,
    output_aliases: Option<OutputAliases>,
    extraction_sites: Vec<ExtractionSite>,
    uses_experimental_features: bool,
}

impl<'s> Binder<'s> {
    fn new(text: &'s str, scope: &'s dyn ClassScope) -> Self {
        Binder {
            text,
            scope,
            ctes: Vec::new(),
            projections: Vec::new(),
            class_references: Vec::new(),
            alias_references: Vec::new(),
            output_aliases: None,
            extraction_sites: Vec::new(),
            uses_experimental_features: false,
        }
    }

    fn finish(mut self, columns: Vec<ColumnInfo>) -> PreparedQuery {
        // Recursive CTE seeds are bound twice
        self.class_references.sort_by_key(|r| r.range.start);
        self.class_references.dedup_by(|a, b| a.range == b.range);
        self.alias_references.sort_by_key(|r| r.range.start);
        self.alias_references.dedup_by(|a, b| a.range == b.range);
        self.extraction_sites.sort_by_key(|s| s.range.start);
        self.extraction_sites.dedup_by(|a, b| a.range == b.range);

        PreparedQuery {
            columns,
            projections: self.projections,
            class_references: self.class_references,
            alias_references: self.alias_references,
            extraction_sites: self.extraction_sites,
            uses_experimental_features: self.uses_experimental_features,
        }
    }

    fn catalog(&self) -> &SchemaCatalog {
        self.scope.catalog()
    }

    fn span(&self, slice: &str) -> Range<usize> {
        subslice_range(self.text, slice).unwrap_or(0..0)
    }

    fn bind_statement(
        &mut self,
        statement: &SelectStatement<'_>,
        parent: Option<&Env<'_>>,
        top: bool,
    ) -> Result<Vec<ColumnInfo>, PrepareError> {
        let frame = self.ctes.len();
        let outer_aliases = self.output_aliases.take();
        let result = self.bind_statement_in_frame(statement, parent, top);
        self.ctes.truncate(frame);
        self.output_aliases = outer_aliases;
        result
    }

    fn bind_statement_in_frame(
        &mut self,
        statement: &SelectStatement<'_>,
        parent: Option<&Env<'_>>,
        top: bool,
    ) -> Result<Vec<ColumnInfo>, PrepareError> {
        if let Some(with) = &statement.with_clause {
            self.bind_with(with, parent)?;
        }

        let (columns, sources) = self.bind_body(&statement.body, parent, top)?;
        let env = Env {
            sources: sources.as_slice(),
            parent,
        };

        self.output_aliases = Some(OutputAliases {
            columns: columns.clone(),
            record: top,
        });
        for item in &statement.order_by {
            match &item.expr {
                // Ordinal
                Expression::Literal(_) => {}
                Expression::PropertyPath(path) if self.resolve_output_alias(path).is_some() => {}
                expr => {
                    self.bind_expr(expr, &env)?;
                }
            }
        }
        self.output_aliases = None;

        if let Some(limit) = &statement.limit {
            self.bind_expr(&limit.limit, &env)?;
            if let Some(offset) = &limit.offset {
                self.bind_expr(offset, &env)?;
            }
        }
        Ok(columns)
    }

    fn bind_with(
        &mut self,
        with: &WithClause<'_>,
        parent: Option<&Env<'_>>,
    ) -> Result<(), PrepareError> {
        let mut names: Vec<String> = Vec::with_capacity(with.ctes.len());
        for cte in &with.ctes {
            let key = cte.name.to_ascii_lowercase();
            if names.contains(&key) {
                return Err(PrepareError::DuplicateCte {
                    cte: cte.name.to_string(),
                });
            }
            names.push(key.clone());

            let columns = if with.recursive && cte.query.with_clause.is_none() {
                // The seed arm defines the columns the recursive arm sees
                let (seed, _) = self.bind_core(&cte.query.body.first, parent, false)?;
                let seed = rename_cte_columns(cte, seed)?;
                self.ctes.push((key.clone(), seed));
                let columns = self.bind_statement(&cte.query, parent, false);
                self.ctes.pop();
                columns?
            } else {
                self.bind_statement(&cte.query, parent, false)?
            };
            let columns = rename_cte_columns(cte, columns)?;
            debug!("CTE '{}' binds {} column(s)", cte.name, columns.len());
            self.ctes.push((key, columns));
        }
        Ok(())
    }

    fn bind_body(
        &mut self,
        body: &SelectBody<'_>,
        parent: Option<&Env<'_>>,
        top: bool,
    ) -> Result<(Vec<ColumnInfo>, Vec<Source>), PrepareError> {
        let (mut columns, sources) = self.bind_core(&body.first, parent, top)?;
        for (_, core) in &body.compounds {
            let (arm, _) = self.bind_core(core, parent, top)?;
            if arm.len() != columns.len() {
                return Err(PrepareError::CompoundColumnCount {
                    expected: columns.len(),
                    actual: arm.len(),
                });
            }
            for (column, other) in columns.iter_mut().zip(arm) {
                if column.column_type.is_none() {
                    column.column_type = other.column_type;
                }
            }
        }
        Ok((columns, sources))
    }

    fn bind_core(
        &mut self,
        core: &SelectCore<'_>,
        parent: Option<&Env<'_>>,
        top: bool,
    ) -> Result<(Vec<ColumnInfo>, Vec<Source>), PrepareError> {
        let mut sources: Vec<Source> = Vec::with_capacity(core.from.len());
        for item in &core.from {
            let source = self.bind_from_item(item)?;
            sources.push(source);
            if let Some(JoinConstraint::On(condition)) = &item.constraint {
                let env = Env {
                    sources: sources.as_slice(),
                    parent,
                };
                self.bind_expr(condition, &env)?;
            }
        }

        let env = Env {
            sources: sources.as_slice(),
            parent,
        };
        if let Some(condition) = &core.where_clause {
            self.bind_expr(condition, &env)?;
        }

        let mut columns = Vec::new();
        let mut slots = Vec::new();
        for item in &core.items {
            match item {
                SelectItem::Wildcard { qualifier } => {
                    let targets: Vec<&Source> = match qualifier {
                        Some(qualifier) => {
                            let source = sources
                                .iter()
                                .find(|s| s.matches_alias(qualifier))
                                .ok_or_else(|| PrepareError::UnknownWildcardQualifier {
                                    qualifier: qualifier.to_string(),
                                })?;
                            vec![source]
                        }
                        None if sources.is_empty() => {
                            return Err(PrepareError::WildcardWithoutSource)
                        }
                        None => sources.iter().collect(),
                    };
                    for source in targets {
                        for column in source.columns(self.catalog()) {
                            slots.push(wildcard_slots(source, &column));
                            columns.push(column);
                        }
                    }
                }
                SelectItem::Expression { expr, text, alias } => {
                    let (column, column_slots) =
                        self.bind_select_expression(expr, text, *alias, &env)?;
                    columns.push(column);
                    slots.push(column_slots);
                }
            }
        }

        self.output_aliases = Some(OutputAliases {
            columns: columns.clone(),
            record: top,
        });
        for expr in &core.group_by {
            self.bind_expr(expr, &env)?;
        }
        if let Some(condition) = &core.having {
            self.bind_expr(condition, &env)?;
        }
        self.output_aliases = None;

        if top {
            self.projections.push(CoreProjection {
                list_span: self.span(core.select_list),
                columns: slots,
            });
        }
        Ok((columns, sources))
    }

    fn bind_select_expression(
        &mut self,
        expr: &Expression<'_>,
        text: &str,
        alias: Option<&str>,
        env: &Env<'_>,
    ) -> Result<(ColumnInfo, Vec<SlotSource>), PrepareError> {
        let range = self.span(text);
        let (name, origin, column_type) = match expr {
            Expression::PropertyPath(path) => {
                let resolved = self.resolve_path(path, env)?;
                (
                    resolved.name.clone(),
                    Some(resolved.name),
                    resolved.property_type,
                )
            }
            other => {
                let column_type = self.bind_expr(other, env)?;
                (text.to_string(), None, column_type)
            }
        };
        let name = alias.map(str::to_string).unwrap_or(name);

        let slots = if column_type.as_ref().is_some_and(PropertyType::is_navigation) {
            self.navigation_slots(expr, range)
        } else {
            vec![SlotSource::Span {
                range,
                member: None,
            }]
        };

        let column = ColumnInfo {
            is_system: is_system_name(&name),
            name,
            origin,
            column_type,
        };
        Ok((column, slots))
    }

    fn navigation_slots(&self, expr: &Expression<'_>, range: Range<usize>) -> Vec<SlotSource> {
        if let Expression::FunctionCall(call) = expr {
            if call.name.eq_ignore_ascii_case(NAVIGATION_VALUE) && call.arg_texts.len() >= 2 {
                let id = SlotSource::Span {
                    range: self.span(call.arg_texts[1]),
                    member: None,
                };
                let rel_class_id = match call.arg_texts.get(2) {
                    Some(text) => SlotSource::Span {
                        range: self.span(text),
                        member: None,
                    },
                    None => SlotSource::Synthesized("NULL".to_string()),
                };
                return vec![id, rel_class_id];
            }
        }
        vec![
            SlotSource::Span {
                range: range.clone(),
                member: Some(NAV_ID.to_string()),
            },
            SlotSource::Span {
                range,
                member: Some(NAV_REL_ECCLASSID.to_string()),
            },
        ]
    }

    fn bind_from_item(&mut self, item: &FromItem<'_>) -> Result<Source, PrepareError> {
        match &item.source {
            TableSource::Subquery(query) => {
                let columns = self.bind_statement(query, None, false)?;
                Ok(Source {
                    alias: item.alias.unwrap_or_default().to_string(),
                    kind: SourceKind::Derived(columns),
                })
            }
            TableSource::Class(class_ref) => self.bind_class_ref(class_ref, item.alias),
        }
    }

    fn find_cte(&self, name: &str) -> Option<Vec<ColumnInfo>> {
        self.ctes
            .iter()
            .rev()
            .find(|(cte, _)| cte.eq_ignore_ascii_case(name))
            .map(|(_, columns)| columns.clone())
    }

    fn bind_class_ref(
        &mut self,
        class_ref: &ClassRef<'_>,
        alias: Option<&str>,
    ) -> Result<Source, PrepareError> {
        if class_ref.schema.is_none() {
            if let Some(columns) = self.find_cte(class_ref.name) {
                return Ok(Source {
                    alias: alias.unwrap_or(class_ref.name).to_string(),
                    kind: SourceKind::Derived(columns),
                });
            }
        }

        let display = match class_ref.schema {
            Some(schema) => format!("{}.{}", schema, class_ref.name),
            None => class_ref.name.to_string(),
        };
        let class = class_ref
            .schema
            .and_then(|schema| self.catalog().find_class(schema, class_ref.name))
            .cloned()
            .ok_or(PrepareError::UnknownClass { class: display })?;

        if class.kind == ClassKind::Struct {
            return Err(PrepareError::StructClassInFrom {
                class: class.qualified_name(),
            });
        }
        if !self.scope.is_usable(&class) {
            return Err(PrepareError::UnusableClass {
                class: class.qualified_name(),
            });
        }

        let range = self.span(class_ref.text);
        self.class_references.push(ClassReference {
            range,
            class_id: class.id,
            class_name: class.name.clone(),
            has_alias: alias.is_some(),
            is_view: class.is_view(),
        });
        Ok(Source {
            alias: alias.unwrap_or(class.name.as_str()).to_string(),
            kind: SourceKind::Class(class),
        })
    }

    /// Type of the output column `path` names, recording the use.
    fn resolve_output_alias(&mut self, path: &[&str]) -> Option<Option<PropertyType>> {
        let [name] = path else {
            return None;
        };
        let aliases = self.output_aliases.as_ref()?;
        let column = aliases
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))?;
        let column_type = aliases.columns[column].column_type.clone();
        if aliases.record {
            let range = self.span(name);
            self.alias_references.push(AliasReference { range, column });
        }
        Some(column_type)
    }

    fn resolve_path(&self, path: &[&str], env: &Env<'_>) -> Result<ResolvedPath, PrepareError> {
        let display = path.join(".");
        for level in env.levels() {
            if path.len() >= 2 {
                if let Some(source) = level.sources.iter().find(|s| s.matches_alias(path[0])) {
                    return self
                        .resolve_in_source(source, &path[1..])
                        .ok_or(PrepareError::UnknownProperty { path: display });
                }
            }

            let mut matches = level
                .sources
                .iter()
                .filter_map(|source| self.resolve_in_source(source, path));
            if let Some(resolved) = matches.next() {
                if matches.next().is_some() {
                    return Err(PrepareError::AmbiguousProperty { path: display });
                }
                return Ok(resolved);
            }
        }
        Err(PrepareError::UnknownProperty { path: display })
    }

    fn resolve_in_source(&self, source: &Source, segments: &[&str]) -> Option<ResolvedPath> {
        let columns = source.columns(self.catalog());
        // Derived column names may themselves contain dots ("Parent.Id")
        for split in (1..=segments.len()).rev() {
            let head = segments[..split].join(".");
            if let Some(column) = columns.iter().find(|c| c.name.eq_ignore_ascii_case(&head)) {
                return self.resolve_members(
                    column.name.clone(),
                    column.column_type.clone(),
                    &segments[split..],
                );
            }
        }
        None
    }

    fn resolve_members(
        &self,
        mut name: String,
        mut property_type: Option<PropertyType>,
        members: &[&str],
    ) -> Option<ResolvedPath> {
        for member in members {
            let (member_name, member_type) = match property_type.as_ref()? {
                PropertyType::Navigation(_) => [NAV_ID, NAV_REL_ECCLASSID]
                    .into_iter()
                    .find(|m| m.eq_ignore_ascii_case(member))
                    .map(|m| (m.to_string(), PropertyType::Primitive(PrimitiveType::Long)))?,
                PropertyType::Primitive(p) if p.is_point() => p
                    .point_members()
                    .iter()
                    .find(|m| m.eq_ignore_ascii_case(member))
                    .map(|m| (m.to_string(), PropertyType::Primitive(PrimitiveType::Double)))?,
                PropertyType::Struct(struct_name) => {
                    let catalog = self.catalog();
                    let struct_class = catalog.find_qualified(struct_name)?;
                    let property = catalog
                        .declared_properties(struct_class.id)
                        .into_iter()
                        .find(|p| p.name.eq_ignore_ascii_case(member))?;
                    (property.name, property.property_type)
                }
                _ => return None,
            };
            name = format!("{name}.{member_name}");
            property_type = Some(member_type);
        }
        Some(ResolvedPath {
            name,
            property_type,
        })
    }

    fn bind_expr(
        &mut self,
        expr: &Expression<'_>,
        env: &Env<'_>,
    ) -> Result<Option<PropertyType>, PrepareError> {
        let boolean = primitive(PrimitiveType::Boolean);
        let column_type = match expr {
            Expression::Literal(literal) => match literal {
                Literal::Integer(_) => primitive(PrimitiveType::Long),
                Literal::Float(_) => primitive(PrimitiveType::Double),
                Literal::String(_) => primitive(PrimitiveType::String),
                Literal::Boolean(_) => boolean,
                Literal::Null => None,
            },
            Expression::Parameter(_) => None,
            Expression::PropertyPath(path) => match self.resolve_path(path, env) {
                Ok(resolved) => resolved.property_type,
                Err(err @ PrepareError::UnknownProperty { .. }) => {
                    self.resolve_output_alias(path).ok_or(err)?
                }
                Err(err) => return Err(err),
            },
            Expression::FunctionCall(call) => self.bind_function(call, env)?,
            Expression::Cast { expr, target } => {
                self.bind_expr(expr, env)?;
                let target_type = PrimitiveType::from_cast_target(target).ok_or_else(|| {
                    PrepareError::UnknownCastType {
                        target: target.to_string(),
                    }
                })?;
                primitive(target_type)
            }
            Expression::Unary { op, expr } => {
                let inner = self.bind_expr(expr, env)?;
                match op {
                    UnaryOperator::Not => boolean,
                    UnaryOperator::BitNot => primitive(PrimitiveType::Long),
                    UnaryOperator::Minus | UnaryOperator::Plus => inner,
                }
            }
            Expression::Binary { op, left, right } => {
                let left = self.bind_expr(left, env)?;
                let right = self.bind_expr(right, env)?;
                binary_type(*op, left.as_ref(), right.as_ref())
            }
            Expression::IsNull { expr, .. } => {
                self.bind_expr(expr, env)?;
                boolean
            }
            Expression::Like { expr, pattern, .. } => {
                self.bind_expr(expr, env)?;
                self.bind_expr(pattern, env)?;
                boolean
            }
            Expression::InList { expr, list, .. } => {
                self.bind_expr(expr, env)?;
                for item in list {
                    self.bind_expr(item, env)?;
                }
                boolean
            }
            Expression::InSubquery { expr, query, .. } => {
                self.bind_expr(expr, env)?;
                self.bind_statement(query, Some(env), false)?;
                boolean
            }
            Expression::Between {
                expr, low, high, ..
            } => {
                self.bind_expr(expr, env)?;
                self.bind_expr(low, env)?;
                self.bind_expr(high, env)?;
                boolean
            }
            Expression::Case {
                operand,
                branches,
                else_result,
            } => {
                if let Some(operand) = operand {
                    self.bind_expr(operand, env)?;
                }
                let mut result = None;
                for (condition, value) in branches {
                    self.bind_expr(condition, env)?;
                    let value_type = self.bind_expr(value, env)?;
                    result = result.or(value_type);
                }
                if let Some(else_result) = else_result {
                    let else_type = self.bind_expr(else_result, env)?;
                    result = result.or(else_type);
                }
                result
            }
            Expression::Exists(query) => {
                self.bind_statement(query, Some(env), false)?;
                boolean
            }
            Expression::Subquery(query) => {
                let columns = self.bind_statement(query, Some(env), false)?;
                if columns.len() != 1 {
                    return Err(PrepareError::ScalarSubqueryColumns);
                }
                columns.into_iter().next().and_then(|c| c.column_type)
            }
            Expression::InstanceAccess(access) => self.bind_instance_access(access, env)?,
        };
        Ok(column_type)
    }

    fn bind_function(
        &mut self,
        call: &FunctionCall<'_>,
        env: &Env<'_>,
    ) -> Result<Option<PropertyType>, PrepareError> {
        let signature = functions::lookup(call.name).ok_or_else(|| PrepareError::UnknownFunction {
            name: call.name.to_string(),
        })?;
        let count = call.args.len();
        if !signature.accepts(count) {
            return Err(PrepareError::FunctionArity {
                name: call.name.to_string(),
                expected: signature.arity(),
                actual: count,
            });
        }

        if call.name.eq_ignore_ascii_case(NAVIGATION_VALUE) {
            return self.bind_navigation_value(call, env);
        }

        let mut first = None;
        for (i, arg) in call.args.iter().enumerate() {
            let arg_type = self.bind_expr(arg, env)?;
            if i == 0 {
                first = arg_type;
            }
        }

        Ok(match signature.return_type {
            ReturnType::Fixed(p) => primitive(p),
            ReturnType::FirstArgument => first,
            ReturnType::NumericOfFirstArgument => {
                if is_integral(first.as_ref()) {
                    primitive(PrimitiveType::Long)
                } else {
                    primitive(PrimitiveType::Double)
                }
            }
            ReturnType::Untyped => None,
        })
    }

    /// `NAVIGATION_VALUE(<relationship>, <id>[, <rel class id>])`. The first
    /// argument names a relationship class, not a property.
    fn bind_navigation_value(
        &mut self,
        call: &FunctionCall<'_>,
        env: &Env<'_>,
    ) -> Result<Option<PropertyType>, PrepareError> {
        let relationship = match call.args.first() {
            Some(Expression::PropertyPath(path)) => {
                let qualified = path.join(".");
                self.catalog()
                    .find_qualified(&qualified)
                    .filter(|class| class.is_relationship())
                    .map(|class| class.qualified_name())
                    .ok_or(PrepareError::UnknownClass { class: qualified })?
            }
            _ => {
                return Err(PrepareError::UnknownClass {
                    class: call.arg_texts.first().unwrap_or(&"").to_string(),
                })
            }
        };
        for arg in &call.args[1..] {
            self.bind_expr(arg, env)?;
        }
        Ok(Some(PropertyType::Navigation(relationship)))
    }

    fn bind_instance_access(
        &mut self,
        access: &InstanceAccess<'_>,
        env: &Env<'_>,
    ) -> Result<Option<PropertyType>, PrepareError> {
        let source = match access.qualifier {
            Some(qualifier) => env
                .levels()
                .flat_map(|level| level.sources.iter())
                .find(|s| s.matches_alias(qualifier))
                .ok_or_else(|| PrepareError::UnknownAlias {
                    alias: qualifier.to_string(),
                })?,
            None => match env.sources {
                [single] => single,
                [] => {
                    return Err(PrepareError::InstanceAccessWithoutSource {
                        text: access.text.to_string(),
                    })
                }
                _ => {
                    return Err(PrepareError::AmbiguousInstanceAccess {
                        text: access.text.to_string(),
                    })
                }
            },
        };
        if source.alias.is_empty() {
            return Err(PrepareError::InstanceAccessWithoutSource {
                text: access.text.to_string(),
            });
        }

        let site = ExtractionSite {
            range: self.span(access.text),
            alias: source.alias.clone(),
            property: access.property.map(str::to_string),
        };
        self.extraction_sites.push(site);
        self.uses_experimental_features = true;

        Ok(match access.property {
            None => primitive(PrimitiveType::String),
            Some(_) => None,
        })
    }
}

fn rename_cte_columns(
    cte: &CommonTableExpression<'_>,
    columns: Vec<ColumnInfo>,
) -> Result<Vec<ColumnInfo>, PrepareError> {
    let Some(names) = &cte.columns else {
        return Ok(columns);
    };
    if names.len() != columns.len() {
        return Err(PrepareError::CteColumnCount {
            cte: cte.name.to_string(),
            declared: names.len(),
            returned: columns.len(),
        });
    }
    Ok(names
        .iter()
        .zip(columns)
        .map(|(name, column)| ColumnInfo {
            name: name.to_string(),
            is_system: is_system_name(name),
            ..column
        })
        .collect())
}

fn binary_type(
    op: BinaryOperator,
    left: Option<&PropertyType>,
    right: Option<&PropertyType>,
) -> Option<PropertyType> {
    if op.is_logical() || op.is_comparison() {
        return primitive(PrimitiveType::Boolean);
    }
    match op {
        BinaryOperator::Concat => primitive(PrimitiveType::String),
        BinaryOperator::BitAnd | BinaryOperator::BitOr | BinaryOperator::Modulo => {
            primitive(PrimitiveType::Long)
        }
        _ if is_integral(left) && is_integral(right) => primitive(PrimitiveType::Long),
        _ => primitive(PrimitiveType::Double),
    }
}

/// Explicit column references for one column of a wildcard expansion.
fn wildcard_slots(source: &Source, column: &ColumnInfo) -> Vec<SlotSource> {
    let qualified = if source.alias.is_empty() {
        bracket_alias(&column.name)
    } else {
        format!(
            "{}.{}",
            bracket_alias(&source.alias),
            bracket_alias(&column.name)
        )
    };
    if column
        .column_type
        .as_ref()
        .is_some_and(PropertyType::is_navigation)
    {
        vec![
            SlotSource::Synthesized(format!("{qualified}.[{NAV_ID}]")),
            SlotSource::Synthesized(format!("{qualified}.[{NAV_REL_ECCLASSID}]")),
        ]
    } else {
        vec![SlotSource::Synthesized(qualified)]
    }
}
