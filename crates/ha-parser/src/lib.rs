//! Parser for the home automation language
//!
//! A hand-written, scannerless recursive-descent parser. Alternatives are
//! tried in a fixed order with backtracking; when nothing matches, the error
//! points at the furthest position any alternative reached and lists what
//! would have been accepted there.
//!
//! ```text
//! home 'My flat' flat {
//!   area 'Kitchen' kitchen {
//!     device 'Sensors' sensors {
//!       entities: [ binary_sensor motion = 'binary_sensor.kitchen_motion' ];
//!     }
//!   }
//! }
//!
//! automation 'Kitchen light' {
//!   when flat.kitchen.sensors.motion == 'on' {
//!     do notify('motion');
//!   }
//! }
//! ```

mod condition;
mod cursor;
mod declaration;
mod error;
mod expression;
mod literal;

pub use error::{ParseResult, SyntaxError};

use ha_ast::{ConditionExpression, Expression, Program};
use tracing::debug;

use cursor::Parser;

/// Parse a complete source file
pub fn parse(source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(source);
    let result = parser.program();
    let program = parser.finish(result)?;

    debug!(
        sites = program.sites.len(),
        automations = program.automations.len(),
        entities = program.entity_count(),
        "Parsed program"
    );
    Ok(program)
}

/// Parse a standalone expression
pub fn parse_expression(source: &str) -> ParseResult<Expression> {
    let mut parser = Parser::new(source);
    let result = parser.expression().and_then(|expr| {
        parser.end_of_input()?;
        Ok(expr)
    });
    parser.finish(result)
}

/// Parse a standalone `when` condition, duration guard included
pub fn parse_condition(source: &str) -> ParseResult<ConditionExpression> {
    let mut parser = Parser::new(source);
    let result = parser.condition(true).and_then(|cond| {
        parser.end_of_input()?;
        Ok(cond)
    });
    parser.finish(result)
}
