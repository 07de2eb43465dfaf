//! Expression grammar
//!
//! Binding from loosest to tightest: `in` range membership, `||`, `&&`,
//! comparisons, primaries. Every binary level is left-associative.

use ha_ast::{BinaryOp, Expression, FunctionCall, RangeExpression};

use crate::cursor::{PResult, Parser};

const COMPARISONS: [(&str, BinaryOp); 6] = [
    ("==", BinaryOp::Eq),
    ("!=", BinaryOp::Ne),
    (">=", BinaryOp::Ge),
    ("<=", BinaryOp::Le),
    (">", BinaryOp::Gt),
    ("<", BinaryOp::Lt),
];

impl<'src> Parser<'src> {
    /// `or_expr ("in" range)?`
    ///
    /// The range applies to the whole OR-expression on its left.
    pub(crate) fn expression(&mut self) -> PResult<Expression> {
        let left = self.or_expr()?;
        if self.eat_keyword("in") {
            let range = self.range()?;
            return Ok(Expression::InRange {
                left: Box::new(left),
                range: Box::new(range),
            });
        }
        Ok(left)
    }

    /// Clock-time ranges are tried first so `08:00` is never read as a
    /// malformed primary
    fn range(&mut self) -> PResult<RangeExpression> {
        let time_range = self.attempt(|p| {
            let start = p.clock_time()?;
            p.symbol("..")?;
            let end = p.clock_time()?;
            Ok(RangeExpression::Time { start, end })
        });
        if let Some(range) = time_range {
            return Ok(range);
        }

        let start = self.or_expr()?;
        self.symbol("..")?;
        let end = self.or_expr()?;
        Ok(RangeExpression::Value { start, end })
    }

    fn or_expr(&mut self) -> PResult<Expression> {
        let mut left = self.and_expr()?;
        while self.eat("||") {
            let right = self.and_expr()?;
            left = Expression::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> PResult<Expression> {
        let mut left = self.comparison()?;
        while self.eat("&&") {
            let right = self.comparison()?;
            left = Expression::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn comparison(&mut self) -> PResult<Expression> {
        let mut left = self.labeled("expression", Self::primary)?;
        while let Some(op) = self.comparison_op() {
            let right = self.labeled("expression", Self::primary)?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn comparison_op(&mut self) -> Option<BinaryOp> {
        COMPARISONS
            .iter()
            .find(|(sym, _)| self.eat(sym))
            .map(|(_, op)| *op)
    }

    /// Parenthesized expression, function call, literal or dotted reference,
    /// tried in that order
    fn primary(&mut self) -> PResult<Expression> {
        if self.eat("(") {
            let inner = self.expression()?;
            self.symbol(")")?;
            return Ok(Expression::paren(inner));
        }

        if let Some(call) = self.attempt(Self::function_call) {
            return Ok(Expression::FunctionCall(call));
        }

        if let Some(value) = self.attempt(Self::literal) {
            return Ok(Expression::Literal { value });
        }

        let (path, span) = self.dotted_path()?;
        Ok(Expression::Reference { path, span })
    }

    /// `target.name(args)` or `name(args)`; the last path segment is the name
    pub(crate) fn function_call(&mut self) -> PResult<FunctionCall> {
        let start = self.start();
        let (mut path, _) = self.dotted_path()?;
        self.symbol("(")?;
        let args = self.arguments()?;

        let Some(name) = path.pop() else {
            return self.fail("identifier");
        };
        let target = (!path.is_empty()).then(|| path.join("."));

        Ok(FunctionCall {
            target,
            name,
            args,
            span: self.span_from(start),
        })
    }

    /// Comma-separated expressions up to and including `)`
    fn arguments(&mut self) -> PResult<Vec<Expression>> {
        let mut args = Vec::new();
        if self.eat(")") {
            return Ok(args);
        }

        loop {
            args.push(self.expression()?);
            if !self.eat(",") {
                self.symbol(")")?;
                return Ok(args);
            }
        }
    }
}
