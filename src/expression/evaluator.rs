//! Evaluator boundary and the reference path evaluator

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::EvaluationError;

use super::lexer::{tokenize, Token};
use super::value::Value;

/// Variables and callable functions visible to an expression
pub trait ExpressionContext {
    /// Root variable lookup
    fn variable(&self, name: &str) -> Option<Value>;

    /// Function call dispatch; arguments are already evaluated
    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, EvaluationError>;
}

/// Turns expression text into a value
pub trait Evaluator {
    fn evaluate(
        &self,
        expression: &str,
        context: &mut dyn ExpressionContext,
    ) -> Result<Value, EvaluationError>;
}

/// Context over plain data; no function is callable
#[derive(Debug, Clone, Copy)]
pub struct DataContext<'a> {
    data: &'a Value,
}

impl<'a> DataContext<'a> {
    pub fn new(data: &'a Value) -> Self {
        Self { data }
    }
}

impl ExpressionContext for DataContext<'_> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.data.get(name).cloned()
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, EvaluationError> {
        Err(EvaluationError::unknown_function(name, args.len()))
    }
}

/// Minimal expression language: literals, variables, `a.b.c` member paths,
/// calls `f(x, "y")` and parentheses
#[derive(Debug, Default, Clone, Copy)]
pub struct PathEvaluator;

impl Evaluator for PathEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        context: &mut dyn ExpressionContext,
    ) -> Result<Value, EvaluationError> {
        let expr = parse(expression)?;
        eval(&expr, context)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Variable(String),
    Member(Box<Expr>, String),
    Call(String, Vec<Expr>),
}

/// Parse expression text into an AST
fn parse(expression: &str) -> Result<Expr, EvaluationError> {
    let len = expression.len();
    let tokens = tokenize(expression).map_err(|span| {
        let offset = span.start;
        EvaluationError::syntax(
            expression,
            span,
            format!("unexpected character at offset {}", offset),
        )
    })?;

    let token_stream = Stream::from_iter(tokens.into_iter().map(|(tok, span)| (tok, span.into())))
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    expression_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| match errs.into_iter().next() {
            Some(err) => syntax_error(expression, err),
            None => EvaluationError::syntax(expression, 0..len, "invalid expression"),
        })
}

fn syntax_error(expression: &str, err: Rich<'_, Token>) -> EvaluationError {
    let span = err.span().into_range();
    let message = match err.found() {
        Some(token) => format!("unexpected {:?} at offset {}", token, span.start),
        None => "unexpected end of expression".to_string(),
    };
    EvaluationError::syntax(expression, span, message)
}

fn expression_parser<'a, I>() -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let ident = select! {
        Token::Ident(name) => name,
    };

    let expr = recursive(|expr| {
        let literal = select! {
            Token::True => Value::Bool(true),
            Token::False => Value::Bool(false),
            Token::Null => Value::Null,
            Token::String(s) => Value::String(s),
            Token::Integer(i) => Value::Integer(i),
            Token::Float(x) => Value::Float(x),
        }
        .map(Expr::Literal);

        // name(arg, ...)
        let call = ident
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            )
            .map(|(name, args)| Expr::Call(name, args));

        let atom = choice((
            literal,
            call,
            ident.clone().map(Expr::Variable),
            expr.delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        ));

        atom.foldl(
            just(Token::Dot).ignore_then(ident.clone()).repeated(),
            |target, member| Expr::Member(Box::new(target), member),
        )
    });

    expr.then_ignore(end())
}

fn eval(expr: &Expr, context: &mut dyn ExpressionContext) -> Result<Value, EvaluationError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => context
            .variable(name)
            .ok_or_else(|| EvaluationError::unknown_variable(name.as_str())),
        Expr::Member(target, member) => match eval(target, context)? {
            Value::Map(mut map) => map.remove(member).ok_or_else(|| EvaluationError::UnknownMember {
                member: member.clone(),
                kind: "map",
            }),
            other => Err(EvaluationError::UnknownMember {
                member: member.clone(),
                kind: other.kind(),
            }),
        },
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|arg| eval(arg, context))
                .collect::<Result<Vec<_>, _>>()?;
            context.call(name, values)
        }
    }
}
