//! Typed syntax tree for the home automation language
//!
//! The tree is pure data produced once per parse. Every node owns its
//! children; a [`Expression::Reference`] is only a lookup path and is resolved
//! later against the validator's symbol table.

mod action;
mod condition;
mod declaration;
mod expression;
mod literal;
mod span;

pub use action::{ActionBlock, ActionStatement};
pub use condition::ConditionExpression;
pub use declaration::{
    find_decorator, Area, Automation, BrokerSettings, Decorator, DecoratorArg, Device, Entity,
    EventsMode, EventsSettings, Program, Property, Settings, Site, WhenClause,
};
pub use expression::{BinaryOp, Expression, FunctionCall, RangeExpression};
pub use literal::{ClockTime, DurationLiteral, DurationUnit, Literal, Number};
pub use span::Span;
