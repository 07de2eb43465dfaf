//! `when` conditions and action blocks

use ha_ast::{
    ActionBlock, ActionStatement, ConditionExpression, DurationLiteral, Expression, FunctionCall,
};

use crate::cursor::{PResult, Parser};

impl<'src> Parser<'src> {
    /// One of:
    /// - `all|any for? { item; ... }`
    /// - `for? { item; ... }` (implicit all)
    /// - `expr for?`
    ///
    /// Wait conditions carry their duration on the `wait` statement, so they
    /// are parsed with `allow_guard = false`.
    pub(crate) fn condition(&mut self, allow_guard: bool) -> PResult<ConditionExpression> {
        if let Some(cond) = self.attempt(|p| p.group_condition(allow_guard)) {
            return Ok(cond);
        }

        if let Some(cond) = self.attempt(|p| {
            let for_duration = p.duration_guard(allow_guard)?;
            p.symbol("{")?;
            let exprs = p.condition_items()?;
            Ok(ConditionExpression::All {
                exprs,
                for_duration,
            })
        }) {
            return Ok(cond);
        }

        let expr = self.expression()?;
        let for_duration = self.duration_guard(allow_guard)?;
        Ok(ConditionExpression::Single { expr, for_duration })
    }

    fn group_condition(&mut self, allow_guard: bool) -> PResult<ConditionExpression> {
        let kind = self.keyword_any(&["all", "any"])?;
        let for_duration = self.duration_guard(allow_guard)?;
        self.symbol("{")?;
        let exprs = self.condition_items()?;

        Ok(if kind == "all" {
            ConditionExpression::All {
                exprs,
                for_duration,
            }
        } else {
            ConditionExpression::Any {
                exprs,
                for_duration,
            }
        })
    }

    fn duration_guard(&mut self, allow_guard: bool) -> PResult<Option<DurationLiteral>> {
        if allow_guard && self.eat_keyword("for") {
            Ok(Some(self.duration()?))
        } else {
            Ok(None)
        }
    }

    /// `item;` repeated, through the closing `}`
    ///
    /// A nested `all { ... }` or `any { ... }` item becomes a call to the
    /// `all`/`any` builtin with the nested items as arguments.
    fn condition_items(&mut self) -> PResult<Vec<Expression>> {
        let mut items = Vec::new();

        while !self.eat("}") {
            let nested = self.attempt(|p| {
                let start = p.start();
                let kind = p.keyword_any(&["all", "any"])?;
                p.symbol("{")?;
                let args = p.condition_items()?;
                Ok(FunctionCall {
                    target: None,
                    name: kind.to_string(),
                    args,
                    span: p.span_from(start),
                })
            });

            let item = match nested {
                Some(call) => Expression::FunctionCall(call),
                None => self.expression()?,
            };
            self.symbol(";")?;
            items.push(item);
        }

        Ok(items)
    }

    /// `{ statement* }`
    pub(crate) fn action_block(&mut self) -> PResult<ActionBlock> {
        self.symbol("{")?;
        let mut statements = Vec::new();
        while !self.eat("}") {
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    fn statement(&mut self) -> PResult<ActionStatement> {
        let start = self.start();

        if self.eat_keyword("do") || self.eat_keyword("call") {
            let call = self.labeled("function call", Self::function_call)?;
            self.symbol(";")?;
            return Ok(ActionStatement::Invoke { call });
        }

        self.keyword("wait")?;
        let condition = self.condition(false)?;
        self.keyword("for")?;
        let for_duration = self.duration()?;
        let timeout = if self.eat_keyword("timeout") {
            Some(self.duration()?)
        } else {
            None
        };
        self.symbol(";")?;

        Ok(ActionStatement::WaitFor {
            condition,
            for_duration,
            timeout,
            span: self.span_from(start),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ha_ast::BinaryOp;

    fn condition(src: &str) -> ConditionExpression {
        let mut p = Parser::new(src);
        let result = p.condition(true).and_then(|c| p.end_of_input().map(|_| c));
        p.finish(result).unwrap()
    }

    fn block(src: &str) -> ActionBlock {
        let mut p = Parser::new(src);
        let result = p.action_block().and_then(|b| p.end_of_input().map(|_| b));
        p.finish(result).unwrap()
    }

    #[test]
    fn test_single_with_guard() {
        let cond = condition("sensor.temperature > 25 for 5m");
        let ConditionExpression::Single { expr, for_duration } = cond else {
            panic!("expected single");
        };
        assert_eq!(expr.binary_op(), Some(BinaryOp::Gt));
        assert_eq!(for_duration, Some(DurationLiteral::minutes(5)));
    }

    #[test]
    fn test_groups() {
        let cond = condition("all { a > 5; a < 10; }");
        assert!(matches!(&cond, ConditionExpression::All { exprs, for_duration: None } if exprs.len() == 2));

        let cond = condition("any for 10s { door.open == true; window.open == true; }");
        assert!(matches!(
            &cond,
            ConditionExpression::Any { exprs, for_duration: Some(d) } if exprs.len() == 2 && d.as_secs() == 10
        ));
    }

    #[test]
    fn test_implicit_all() {
        let cond = condition("for 1h { a > 5; b < 10; }");
        assert!(matches!(
            &cond,
            ConditionExpression::All { exprs, for_duration: Some(d) } if exprs.len() == 2 && d.as_secs() == 3600
        ));

        let cond = condition("{ a; }");
        assert!(matches!(&cond, ConditionExpression::All { for_duration: None, .. }));
    }

    #[test]
    fn test_nested_groups_become_builtin_calls() {
        let cond = condition("all { a == 1; any { b == 2; c == 3; }; }");
        let ConditionExpression::All { exprs, .. } = cond else {
            panic!("expected all");
        };
        let Expression::FunctionCall(call) = &exprs[1] else {
            panic!("expected nested group");
        };
        assert_eq!(call.name, "any");
        assert_eq!(call.target, None);
        assert_eq!(call.args.len(), 2);
    }

    #[test]
    fn test_reference_named_like_a_keyword() {
        let cond = condition("all.enabled == true");
        assert!(matches!(cond, ConditionExpression::Single { .. }));
    }

    #[test]
    fn test_statements() {
        let stmts = block(
            "{ do light.turn_on(light.ceiling, { brightness: 70 });
               wait sensors.motion == 'off' for 40s timeout 10m;
               call notify(); }",
        );
        assert_eq!(stmts.len(), 3);

        let ActionStatement::Invoke { call } = &stmts[0] else {
            panic!("expected invoke");
        };
        assert_eq!(call.qualified_name(), "light.turn_on");

        let ActionStatement::WaitFor {
            condition,
            for_duration,
            timeout,
            ..
        } = &stmts[1]
        else {
            panic!("expected wait");
        };
        assert!(matches!(condition, ConditionExpression::Single { for_duration: None, .. }));
        assert_eq!(*for_duration, DurationLiteral::seconds(40));
        assert_eq!(*timeout, Some(DurationLiteral::minutes(10)));

        assert!(matches!(&stmts[2], ActionStatement::Invoke { call } if call.name == "notify"));
    }

    #[test]
    fn test_wait_with_group_condition() {
        let stmts = block("{ wait any { a == 1; b == 2; } for 5s; }");
        let ActionStatement::WaitFor { condition, timeout, .. } = &stmts[0] else {
            panic!("expected wait");
        };
        assert!(matches!(condition, ConditionExpression::Any { .. }));
        assert_eq!(*timeout, None);
    }

    #[test]
    fn test_wait_requires_duration() {
        let mut p = Parser::new("{ wait a == 1; }");
        let result = p.action_block();
        let err = p.finish(result).unwrap_err();
        assert!(err.expected.contains(&"`for`".to_string()), "{err}");
    }
}
