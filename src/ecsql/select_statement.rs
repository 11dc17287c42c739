use nom::{
    branch::alt,
    character::complete::char,
    combinator::{consumed, map, opt, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
    Parser,
};

use super::ast::{
    ClassRef, CommonTableExpression, CompoundOperator, FromItem, JoinConstraint, JoinOperator,
    LimitClause, OrderByItem, SelectBody, SelectCore, SelectItem, SelectStatement, TableSource,
    WithClause,
};
use super::common::{identifier, ident_token, keyword, member_token, sp, symbol, PResult};
use super::errors::{snippet, EcSqlParsingError, PrepareError};
use super::expression::expression;

/// Parse a complete ECSQL SELECT statement. A trailing `;` is allowed.
pub fn parse_ecsql(text: &str) -> Result<SelectStatement<'_>, PrepareError> {
    let result = terminated(select_statement, (opt(symbol(";")), sp)).parse(text);
    match result {
        Ok(("", statement)) => Ok(statement),
        Ok((rest, _)) => Err(PrepareError::Syntax {
            near: snippet(rest),
        }),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(PrepareError::Syntax {
            near: snippet(furthest(&e).unwrap_or(text)),
        }),
        Err(nom::Err::Incomplete(_)) => Err(PrepareError::Syntax {
            near: snippet(""),
        }),
    }
}

// The error position that got furthest into the input
fn furthest<'a>(error: &EcSqlParsingError<'a>) -> Option<&'a str> {
    error
        .errors
        .iter()
        .map(|(input, _)| *input)
        .min_by_key(|input| input.len())
}

pub fn select_statement(input: &str) -> PResult<'_, SelectStatement<'_>> {
    let (input, _) = sp(input)?;
    let (input, with_clause) = opt(with_clause).parse(input)?;
    let (input, body) = select_body(input)?;
    let (input, order_by) = opt(order_by_clause).parse(input)?;
    let (input, limit) = opt(limit_clause).parse(input)?;
    Ok((
        input,
        SelectStatement {
            with_clause,
            body,
            order_by: order_by.unwrap_or_default(),
            limit,
        },
    ))
}

fn with_clause(input: &str) -> PResult<'_, WithClause<'_>> {
    let (input, _) = keyword("WITH")(input)?;
    let (input, recursive) = opt(keyword("RECURSIVE")).parse(input)?;
    let (input, ctes) = separated_list1(symbol(","), common_table_expression).parse(input)?;
    Ok((
        input,
        WithClause {
            recursive: recursive.is_some(),
            ctes,
        },
    ))
}

fn common_table_expression(input: &str) -> PResult<'_, CommonTableExpression<'_>> {
    let (input, name) = identifier(input)?;
    let (input, columns) = opt(delimited(
        symbol("("),
        separated_list1(symbol(","), identifier),
        symbol(")"),
    ))
    .parse(input)?;
    let (input, _) = keyword("AS")(input)?;
    let (input, _) = symbol("(")(input)?;
    let (input, query) = select_statement(input)?;
    let (input, _) = symbol(")")(input)?;
    Ok((
        input,
        CommonTableExpression {
            name,
            columns,
            query: Box::new(query),
        },
    ))
}

fn compound_operator(input: &str) -> PResult<'_, CompoundOperator> {
    alt((
        value(
            CompoundOperator::UnionAll,
            pair(keyword("UNION"), keyword("ALL")),
        ),
        value(CompoundOperator::Union, keyword("UNION")),
        value(CompoundOperator::Intersect, keyword("INTERSECT")),
        value(CompoundOperator::Except, keyword("EXCEPT")),
    ))
    .parse(input)
}

fn select_body(input: &str) -> PResult<'_, SelectBody<'_>> {
    let (input, first) = select_core(input)?;
    let (input, compounds) = many0(pair(compound_operator, select_core)).parse(input)?;
    Ok((input, SelectBody { first, compounds }))
}

fn select_core(input: &str) -> PResult<'_, SelectCore<'_>> {
    let (input, _) = keyword("SELECT")(input)?;
    let (input, distinct) = opt(alt((
        value(true, keyword("DISTINCT")),
        value(false, keyword("ALL")),
    )))
    .parse(input)?;
    let (input, (select_list, items)) =
        consumed(separated_list1(symbol(","), select_item)).parse(input)?;
    let (input, from) = opt(preceded(keyword("FROM"), from_clause)).parse(input)?;
    let (input, where_clause) = opt(preceded(keyword("WHERE"), expression)).parse(input)?;
    let (input, group_by) = opt(preceded(
        pair(keyword("GROUP"), keyword("BY")),
        separated_list1(symbol(","), expression),
    ))
    .parse(input)?;
    let (input, having) = opt(preceded(keyword("HAVING"), expression)).parse(input)?;
    Ok((
        input,
        SelectCore {
            distinct: distinct.unwrap_or(false),
            items,
            select_list: select_list.trim(),
            from: from.unwrap_or_default(),
            where_clause,
            group_by: group_by.unwrap_or_default(),
            having,
        },
    ))
}

fn select_item(input: &str) -> PResult<'_, SelectItem<'_>> {
    alt((wildcard_item, expression_item)).parse(input)
}

fn wildcard_item(input: &str) -> PResult<'_, SelectItem<'_>> {
    let (input, _) = sp(input)?;
    let (input, qualifier) = opt(terminated(ident_token, char('.'))).parse(input)?;
    let (input, _) = symbol("*")(input)?;
    Ok((input, SelectItem::Wildcard { qualifier }))
}

fn alias(input: &str) -> PResult<'_, &str> {
    alt((preceded(keyword("AS"), identifier), identifier)).parse(input)
}

fn expression_item(input: &str) -> PResult<'_, SelectItem<'_>> {
    let (input, (text, expr)) = consumed(expression).parse(input)?;
    let (input, alias) = opt(alias).parse(input)?;
    Ok((
        input,
        SelectItem::Expression {
            expr,
            text: text.trim(),
            alias,
        },
    ))
}

fn from_clause(input: &str) -> PResult<'_, Vec<FromItem<'_>>> {
    let (input, first) = table_reference(input)?;
    let (input, joins) = many0(join_item).parse(input)?;
    let mut items = Vec::with_capacity(joins.len() + 1);
    items.push(first);
    items.extend(joins);
    Ok((input, items))
}

fn class_ref(input: &str) -> PResult<'_, ClassRef<'_>> {
    let (input, _) = sp(input)?;
    let (input, (text, (modifier, (first, second)))) = consumed(pair(
        opt(alt((
            value(false, keyword("ONLY")),
            value(true, keyword("ALL")),
        ))),
        pair(
            ident_token,
            opt(preceded(alt((char('.'), char(':'))), member_token)),
        ),
    ))
    .parse(input)?;
    let (schema, name) = match second {
        Some(name) => (Some(first), name),
        None => (None, first),
    };
    Ok((
        input,
        ClassRef {
            schema,
            name,
            polymorphic: modifier.unwrap_or(true),
            text: text.trim(),
        },
    ))
}

fn table_source(input: &str) -> PResult<'_, TableSource<'_>> {
    alt((
        map(
            delimited(symbol("("), select_statement, symbol(")")),
            |query| TableSource::Subquery(Box::new(query)),
        ),
        map(class_ref, TableSource::Class),
    ))
    .parse(input)
}

fn table_reference(input: &str) -> PResult<'_, FromItem<'_>> {
    let (input, source) = table_source(input)?;
    let (input, alias) = opt(alias).parse(input)?;
    let (input, _) = sp(input)?;
    Ok((
        input,
        FromItem {
            join: None,
            source,
            alias,
            constraint: None,
        },
    ))
}

fn join_operator(input: &str) -> PResult<'_, JoinOperator> {
    alt((
        value(
            JoinOperator::Left,
            (keyword("LEFT"), opt(keyword("OUTER")), keyword("JOIN")),
        ),
        value(
            JoinOperator::Right,
            (keyword("RIGHT"), opt(keyword("OUTER")), keyword("JOIN")),
        ),
        value(JoinOperator::Cross, pair(keyword("CROSS"), keyword("JOIN"))),
        value(
            JoinOperator::Inner,
            pair(opt(keyword("INNER")), keyword("JOIN")),
        ),
    ))
    .parse(input)
}

fn join_constraint(input: &str) -> PResult<'_, JoinConstraint<'_>> {
    alt((
        map(preceded(keyword("ON"), expression), JoinConstraint::On),
        map(
            preceded(
                keyword("USING"),
                delimited(
                    symbol("("),
                    separated_list1(symbol(","), identifier),
                    symbol(")"),
                ),
            ),
            JoinConstraint::Using,
        ),
    ))
    .parse(input)
}

fn join_item(input: &str) -> PResult<'_, FromItem<'_>> {
    if let Ok((rest, _)) = symbol(",")(input) {
        return table_reference(rest);
    }
    let (input, join) = join_operator(input)?;
    let (input, mut item) = table_reference(input)?;
    let (input, constraint) = opt(join_constraint).parse(input)?;
    item.join = Some(join);
    item.constraint = constraint;
    Ok((input, item))
}

fn order_by_clause(input: &str) -> PResult<'_, Vec<OrderByItem<'_>>> {
    let (input, _) = pair(keyword("ORDER"), keyword("BY")).parse(input)?;
    separated_list1(
        symbol(","),
        map(
            pair(
                expression,
                opt(alt((
                    value(false, keyword("ASC")),
                    value(true, keyword("DESC")),
                ))),
            ),
            |(expr, descending)| OrderByItem {
                expr,
                descending: descending.unwrap_or(false),
            },
        ),
    )
    .parse(input)
}

fn limit_clause(input: &str) -> PResult<'_, LimitClause<'_>> {
    let (input, _) = keyword("LIMIT")(input)?;
    let (input, first) = expression(input)?;
    if let Ok((rest, _)) = keyword("OFFSET")(input) {
        let (rest, offset) = expression(rest)?;
        return Ok((
            rest,
            LimitClause {
                limit: first,
                offset: Some(offset),
            },
        ));
    }
    // LIMIT <offset>, <count>
    if let Ok((rest, _)) = symbol(",")(input) {
        let (rest, count) = expression(rest)?;
        return Ok((
            rest,
            LimitClause {
                limit: count,
                offset: Some(first),
            },
        ));
    }
    Ok((
        input,
        LimitClause {
            limit: first,
            offset: None,
        },
    ))
}
