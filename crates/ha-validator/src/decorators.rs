//! Argument checks for the decorators the engine interprets
//!
//! Any other decorator is kept as metadata and not checked.

use ha_ast::{Decorator, DecoratorArg};

/// Where a decorator is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    Automation,
    WhenClause,
}

/// Problem with a known decorator, or `None` when it is fine or unknown
pub(crate) fn check(decorator: &Decorator, placement: Placement) -> Option<String> {
    let name = decorator.name.as_str();
    let allowed_here = match name {
        "mode" => placement == Placement::Automation,
        "cooldown" => true,
        "edge" | "debounce" => placement == Placement::WhenClause,
        _ => return None,
    };

    if !allowed_here {
        let place = match placement {
            Placement::Automation => "an automation",
            Placement::WhenClause => "a when clause",
        };
        return Some(format!("Decorator '@{}' cannot be applied to {}", name, place));
    }

    let ok = match (name, decorator.args.as_slice()) {
        ("mode", [DecoratorArg::Identifier(v)]) => matches!(v.as_str(), "single" | "restart"),
        ("edge", [DecoratorArg::Identifier(v)]) => matches!(v.as_str(), "rising" | "level"),
        ("cooldown" | "debounce", [DecoratorArg::Duration(_)]) => true,
        _ => false,
    };

    (!ok).then(|| format!("Decorator '@{}' expects {}", name, expected_args(name)))
}

fn expected_args(name: &str) -> &'static str {
    match name {
        "mode" => "one of: single, restart",
        "edge" => "one of: rising, level",
        _ => "a single duration such as 30s",
    }
}
