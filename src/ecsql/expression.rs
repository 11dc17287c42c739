use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{consumed, map, opt, value},
    multi::{many0, many1, separated_list1},
    sequence::{pair, preceded, terminated},
    Parser,
};

use super::ast::{
    BinaryOperator, Expression, FunctionCall, InstanceAccess, Literal, UnaryOperator,
};
use super::common::{
    fail, ident_token, keyword, member_token, numeric_literal, parameter, sp, string_literal,
    symbol, ws, PResult,
};
use super::select_statement::select_statement;

pub fn expression(input: &str) -> PResult<'_, Expression<'_>> {
    or_expression(input)
}

fn fold_left<'a>(
    first: Expression<'a>,
    rest: Vec<(BinaryOperator, Expression<'a>)>,
) -> Expression<'a> {
    rest.into_iter()
        .fold(first, |left, (op, right)| Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
}

fn or_expression(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, first) = and_expression(input)?;
    let (input, rest) = many0(pair(
        value(BinaryOperator::Or, keyword("OR")),
        and_expression,
    ))
    .parse(input)?;
    Ok((input, fold_left(first, rest)))
}

fn and_expression(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, first) = not_expression(input)?;
    let (input, rest) = many0(pair(
        value(BinaryOperator::And, keyword("AND")),
        not_expression,
    ))
    .parse(input)?;
    Ok((input, fold_left(first, rest)))
}

fn not_expression(input: &str) -> PResult<'_, Expression<'_>> {
    alt((
        map(preceded(keyword("NOT"), not_expression), |expr| {
            Expression::Unary {
                op: UnaryOperator::Not,
                expr: Box::new(expr),
            }
        }),
        predicate,
    ))
    .parse(input)
}

fn comparison_operator(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        value(BinaryOperator::LessThanEqual, symbol("<=")),
        value(BinaryOperator::GreaterThanEqual, symbol(">=")),
        value(BinaryOperator::NotEqual, symbol("<>")),
        value(BinaryOperator::NotEqual, symbol("!=")),
        value(BinaryOperator::Equal, symbol("==")),
        value(BinaryOperator::Equal, symbol("=")),
        value(BinaryOperator::LessThan, symbol("<")),
        value(BinaryOperator::GreaterThan, symbol(">")),
    ))
    .parse(input)
}

/// Comparison, IS [NOT] NULL, [NOT] LIKE / IN / BETWEEN.
fn predicate(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, left) = additive(input)?;

    if let Ok((rest, op)) = comparison_operator(input) {
        let (rest, right) = additive(rest)?;
        return Ok((
            rest,
            Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        ));
    }

    if let Ok((rest, _)) = keyword("IS")(input) {
        let (rest, negated) = opt(keyword("NOT")).parse(rest)?;
        let (rest, _) = keyword("NULL")(rest)?;
        return Ok((
            rest,
            Expression::IsNull {
                expr: Box::new(left),
                negated: negated.is_some(),
            },
        ));
    }

    let (after_not, negated) = opt(keyword("NOT")).parse(input)?;
    let negated = negated.is_some();

    if let Ok((rest, _)) = keyword("LIKE")(after_not) {
        let (rest, pattern) = additive(rest)?;
        let (rest, _) = opt(preceded(keyword("ESCAPE"), additive)).parse(rest)?;
        return Ok((
            rest,
            Expression::Like {
                expr: Box::new(left),
                pattern: Box::new(pattern),
                negated,
            },
        ));
    }

    if let Ok((rest, _)) = keyword("IN")(after_not) {
        let (rest, _) = symbol("(")(rest)?;
        if let Ok((rest, query)) = select_statement(rest) {
            let (rest, _) = symbol(")")(rest)?;
            return Ok((
                rest,
                Expression::InSubquery {
                    expr: Box::new(left),
                    query: Box::new(query),
                    negated,
                },
            ));
        }
        let (rest, list) = separated_list1(symbol(","), expression).parse(rest)?;
        let (rest, _) = symbol(")")(rest)?;
        return Ok((
            rest,
            Expression::InList {
                expr: Box::new(left),
                list,
                negated,
            },
        ));
    }

    if let Ok((rest, _)) = keyword("BETWEEN")(after_not) {
        let (rest, low) = additive(rest)?;
        let (rest, _) = keyword("AND")(rest)?;
        let (rest, high) = additive(rest)?;
        return Ok((
            rest,
            Expression::Between {
                expr: Box::new(left),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            },
        ));
    }

    Ok((input, left))
}

fn additive_operator(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        value(BinaryOperator::Concat, symbol("||")),
        value(BinaryOperator::Add, symbol("+")),
        value(BinaryOperator::Subtract, symbol("-")),
        value(BinaryOperator::BitAnd, symbol("&")),
        value(BinaryOperator::BitOr, symbol("|")),
    ))
    .parse(input)
}

fn additive(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, first) = multiplicative(input)?;
    let (input, rest) = many0(pair(additive_operator, multiplicative)).parse(input)?;
    Ok((input, fold_left(first, rest)))
}

fn multiplicative_operator(input: &str) -> PResult<'_, BinaryOperator> {
    alt((
        value(BinaryOperator::Multiply, symbol("*")),
        value(BinaryOperator::Divide, symbol("/")),
        value(BinaryOperator::Modulo, symbol("%")),
    ))
    .parse(input)
}

fn multiplicative(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(multiplicative_operator, unary)).parse(input)?;
    Ok((input, fold_left(first, rest)))
}

fn unary(input: &str) -> PResult<'_, Expression<'_>> {
    let unary_op = alt((
        value(UnaryOperator::Minus, symbol("-")),
        value(UnaryOperator::Plus, symbol("+")),
        value(UnaryOperator::BitNot, symbol("~")),
    ));
    alt((
        map(pair(unary_op, unary), |(op, expr)| Expression::Unary {
            op,
            expr: Box::new(expr),
        }),
        primary,
    ))
    .parse(input)
}

fn primary(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, _) = sp(input)?;
    let (input, expr) = alt((
        parenthesized,
        exists_expression,
        case_expression,
        cast_expression,
        literal_expression,
        parameter_expression,
        instance_access,
        function_call,
        property_path,
    ))
    .parse(input)?;
    let (input, _) = sp(input)?;
    Ok((input, expr))
}

fn parenthesized(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, _) = symbol("(")(input)?;
    let (input, expr) = alt((
        map(select_statement, |q| Expression::Subquery(Box::new(q))),
        expression,
    ))
    .parse(input)?;
    let (input, _) = symbol(")")(input)?;
    Ok((input, expr))
}

fn exists_expression(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, _) = keyword("EXISTS")(input)?;
    let (input, _) = symbol("(")(input)?;
    let (input, query) = select_statement(input)?;
    let (input, _) = symbol(")")(input)?;
    Ok((input, Expression::Exists(Box::new(query))))
}

fn case_expression(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, _) = keyword("CASE")(input)?;
    let (input, operand) = if keyword("WHEN")(input).is_ok() {
        (input, None)
    } else {
        let (input, operand) = expression(input)?;
        (input, Some(Box::new(operand)))
    };
    let (input, branches) = many1(pair(
        preceded(keyword("WHEN"), expression),
        preceded(keyword("THEN"), expression),
    ))
    .parse(input)?;
    let (input, else_result) = opt(preceded(keyword("ELSE"), expression)).parse(input)?;
    let (input, _) = keyword("END")(input)?;
    Ok((
        input,
        Expression::Case {
            operand,
            branches,
            else_result: else_result.map(Box::new),
        },
    ))
}

fn cast_expression(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, _) = keyword("CAST")(input)?;
    let (input, _) = symbol("(")(input)?;
    let (input, expr) = expression(input)?;
    let (input, _) = keyword("AS")(input)?;
    let (input, target) = ws(member_token).parse(input)?;
    let (input, _) = symbol(")")(input)?;
    Ok((
        input,
        Expression::Cast {
            expr: Box::new(expr),
            target,
        },
    ))
}

fn literal_expression(input: &str) -> PResult<'_, Expression<'_>> {
    alt((
        value(Expression::Literal(Literal::Null), keyword("NULL")),
        value(Expression::Literal(Literal::Boolean(true)), keyword("TRUE")),
        value(Expression::Literal(Literal::Boolean(false)), keyword("FALSE")),
        map(string_literal, |s| Expression::Literal(Literal::String(s))),
        number,
    ))
    .parse(input)
}

fn number(input: &str) -> PResult<'_, Expression<'_>> {
    let (rest, text) = numeric_literal(input)?;
    let literal = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok().map(Literal::Integer)
    } else if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>().ok().map(Literal::Float)
    } else {
        text.parse::<i64>().ok().map(Literal::Integer)
    };
    match literal {
        Some(literal) => Ok((rest, Expression::Literal(literal))),
        None => fail(input, "numeric literal"),
    }
}

fn parameter_expression(input: &str) -> PResult<'_, Expression<'_>> {
    map(parameter, Expression::Parameter).parse(input)
}

/// `$`, `alias.$`, `$->Prop`, `alias.$->Prop`
fn instance_access(input: &str) -> PResult<'_, Expression<'_>> {
    let (rest, (text, (qualifier, _, property))) = consumed((
        opt(terminated(ident_token, char('.'))),
        char('$'),
        opt(preceded(tag("->"), member_token)),
    ))
    .parse(input)?;
    Ok((
        rest,
        Expression::InstanceAccess(InstanceAccess {
            qualifier,
            property,
            text,
        }),
    ))
}

fn function_call(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, name) = ident_token(input)?;
    let (input, _) = symbol("(")(input)?;
    let (input, distinct) = opt(keyword("DISTINCT")).parse(input)?;
    let (input, star) = opt(symbol("*")).parse(input)?;
    let (input, args) = if star.is_some() {
        (input, Vec::new())
    } else {
        let (input, args) =
            opt(separated_list1(symbol(","), consumed(expression))).parse(input)?;
        (input, args.unwrap_or_default())
    };
    let (input, _) = symbol(")")(input)?;

    let (arg_texts, args): (Vec<&str>, Vec<Expression>) = args
        .into_iter()
        .map(|(text, expr)| (text.trim(), expr))
        .unzip();
    Ok((
        input,
        Expression::FunctionCall(FunctionCall {
            name,
            distinct: distinct.is_some(),
            star: star.is_some(),
            args,
            arg_texts,
        }),
    ))
}

fn property_path(input: &str) -> PResult<'_, Expression<'_>> {
    let (input, (first, rest)) =
        pair(ident_token, many0(preceded(char('.'), member_token))).parse(input)?;
    let mut segments = Vec::with_capacity(rest.len() + 1);
    segments.push(first);
    segments.extend(rest);
    Ok((input, Expression::PropertyPath(segments)))
}
