//! Declarative argument specifications for bot commands.
//!
//! Every command module describes its positional arguments with an [`ArgSpec`]:
//! a name, a value type, an arity (required, optional with a default, or
//! variadic) and an optional allowed-value set. The spec converts the raw
//! whitespace-split tokens of an invocation into [`ParsedArgs`], reporting its
//! own validation errors with user-facing messages.
//!
//! A spec is also validated structurally when a command is loaded: duplicate
//! argument names, a required argument after an optional one, or a variadic
//! argument that is not last all reject the command at load time.

use std::collections::HashMap;
use std::fmt;

/// Value type of a single argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Token is taken as-is
    Text,
    /// Token must parse as a signed integer
    Integer,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKind::Text => write!(f, "text"),
            ArgKind::Integer => write!(f, "an integer"),
        }
    }
}

/// A typed argument value produced by [`ArgSpec::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// A single text token
    Text(String),
    /// A single integer token
    Integer(i64),
    /// All remaining tokens of a variadic argument
    List(Vec<String>),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Text(text) => write!(f, "{text}"),
            ArgValue::Integer(value) => write!(f, "{value}"),
            ArgValue::List(items) => write!(f, "{}", items.join(" ")),
        }
    }
}

/// How many tokens an argument consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arity {
    /// Exactly one token, which must be present
    Required,
    /// One token if present, otherwise the default value
    Optional(ArgValue),
    /// All remaining tokens, at least `min` of them
    Variadic { min: usize },
}

/// Definition of one positional argument.
#[derive(Debug, Clone)]
struct ArgDef {
    name: String,
    kind: ArgKind,
    arity: Arity,
    /// When set, the parsed value must be one of these
    allowed: Option<Vec<ArgValue>>,
}

/// Errors raised while converting raw tokens into typed values.
///
/// The rendered message is sent back to the invoking user, so variants format
/// as complete sentences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// A required argument was not given
    Missing(String),
    /// A token did not parse as the declared kind
    InvalidValue {
        /// Argument name
        name: String,
        /// The offending token
        value: String,
        /// The kind the token should have parsed as
        expected: ArgKind,
    },
    /// The parsed value is outside the allowed-value set
    NotAllowed {
        /// Argument name
        name: String,
        /// The offending value
        value: String,
        /// Rendered allowed values
        allowed: String,
    },
    /// More tokens were given than the spec consumes
    Unexpected(String),
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentError::Missing(name) => {
                write!(f, "Missing required argument `{name}`.")
            }
            ArgumentError::InvalidValue {
                name,
                value,
                expected,
            } => {
                write!(f, "Invalid value `{value}` for `{name}`: expected {expected}.")
            }
            ArgumentError::NotAllowed {
                name,
                value,
                allowed,
            } => {
                write!(f, "Value `{value}` for `{name}` must be one of: {allowed}.")
            }
            ArgumentError::Unexpected(token) => {
                write!(f, "Unexpected argument `{token}`.")
            }
        }
    }
}

/// Structural problems in a spec, detected when a command is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// Two arguments share the same name
    DuplicateName(String),
    /// A required argument follows an optional one
    RequiredAfterOptional(String),
    /// A variadic argument is not the last argument
    VariadicNotLast(String),
    /// A default value or allowed-value set does not match the argument kind
    KindMismatch(String),
    /// The default value is outside the allowed-value set
    DefaultNotAllowed(String),
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::DuplicateName(name) => write!(f, "duplicate argument `{name}`"),
            SpecError::RequiredAfterOptional(name) => {
                write!(f, "required argument `{name}` follows an optional one")
            }
            SpecError::VariadicNotLast(name) => {
                write!(f, "variadic argument `{name}` is not last")
            }
            SpecError::KindMismatch(name) => {
                write!(f, "default or allowed values of `{name}` do not match its kind")
            }
            SpecError::DefaultNotAllowed(name) => {
                write!(f, "default value of `{name}` is not in its allowed set")
            }
        }
    }
}

/// Declarative description of a command's positional arguments.
///
/// Built with [`ArgSpec::builder`], validated once at load time with
/// [`ArgSpec::validate`], and applied to raw tokens with [`ArgSpec::parse`].
///
/// # Examples
///
/// ```no_run
/// use maki::commands::arguments::{ArgKind, ArgSpec, ArgValue};
///
/// let spec = ArgSpec::builder()
///     .optional("amount", ArgKind::Integer, ArgValue::Integer(1))
///     .allowed(vec![
///         ArgValue::Integer(1),
///         ArgValue::Integer(2),
///         ArgValue::Integer(3),
///     ])
///     .build();
///
/// let args = spec.parse(&["2".to_string()]).unwrap();
/// assert_eq!(args.integer("amount"), Some(2));
/// ```
#[derive(Debug, Clone)]
pub struct ArgSpec {
    args: Vec<ArgDef>,
}

impl ArgSpec {
    /// Starts building a new spec.
    pub fn builder() -> ArgSpecBuilder {
        ArgSpecBuilder { args: Vec::new() }
    }

    /// Checks the spec for structural problems.
    ///
    /// Called by the registry when a command is loaded; a spec that fails
    /// validation rejects the whole command.
    pub fn validate(&self) -> Result<(), SpecError> {
        let mut seen_optional = false;
        for (index, arg) in self.args.iter().enumerate() {
            if self.args[..index].iter().any(|other| other.name == arg.name) {
                return Err(SpecError::DuplicateName(arg.name.clone()));
            }

            match &arg.arity {
                Arity::Required => {
                    if seen_optional {
                        return Err(SpecError::RequiredAfterOptional(arg.name.clone()));
                    }
                }
                Arity::Optional(default) => {
                    seen_optional = true;
                    if !value_matches_kind(default, arg.kind) {
                        return Err(SpecError::KindMismatch(arg.name.clone()));
                    }
                    if let Some(allowed) = &arg.allowed
                        && !allowed.contains(default)
                    {
                        return Err(SpecError::DefaultNotAllowed(arg.name.clone()));
                    }
                }
                Arity::Variadic { .. } => {
                    if index != self.args.len() - 1 {
                        return Err(SpecError::VariadicNotLast(arg.name.clone()));
                    }
                }
            }

            if let Some(allowed) = &arg.allowed
                && allowed.iter().any(|value| !value_matches_kind(value, arg.kind))
            {
                return Err(SpecError::KindMismatch(arg.name.clone()));
            }
        }

        Ok(())
    }

    /// Converts raw tokens into typed values.
    ///
    /// Tokens are consumed left to right. Optional arguments take a token when
    /// one is available, otherwise their default. A variadic argument consumes
    /// every remaining token.
    ///
    /// # Errors
    ///
    /// Returns an [`ArgumentError`] with a user-facing message when a required
    /// argument is missing, a token fails type conversion, a value is outside
    /// the allowed set, or tokens are left over.
    pub fn parse(&self, tokens: &[String]) -> Result<ParsedArgs, ArgumentError> {
        let mut values = HashMap::new();
        let mut remaining = tokens;

        for arg in &self.args {
            match &arg.arity {
                Arity::Required => {
                    let Some((token, rest)) = remaining.split_first() else {
                        return Err(ArgumentError::Missing(arg.name.clone()));
                    };
                    remaining = rest;
                    values.insert(arg.name.clone(), convert(arg, token)?);
                }
                Arity::Optional(default) => match remaining.split_first() {
                    Some((token, rest)) => {
                        remaining = rest;
                        values.insert(arg.name.clone(), convert(arg, token)?);
                    }
                    None => {
                        values.insert(arg.name.clone(), default.clone());
                    }
                },
                Arity::Variadic { min } => {
                    if remaining.len() < *min {
                        return Err(ArgumentError::Missing(arg.name.clone()));
                    }
                    values.insert(arg.name.clone(), ArgValue::List(remaining.to_vec()));
                    remaining = &[];
                }
            }
        }

        if let Some(extra) = remaining.first() {
            return Err(ArgumentError::Unexpected(extra.clone()));
        }

        Ok(ParsedArgs { values })
    }
}

/// Builder for [`ArgSpec`].
pub struct ArgSpecBuilder {
    args: Vec<ArgDef>,
}

impl ArgSpecBuilder {
    /// Adds a required single-token argument.
    pub fn required(mut self, name: &str, kind: ArgKind) -> Self {
        self.args.push(ArgDef {
            name: name.to_owned(),
            kind,
            arity: Arity::Required,
            allowed: None,
        });
        self
    }

    /// Adds an optional single-token argument with a default value.
    pub fn optional(mut self, name: &str, kind: ArgKind, default: ArgValue) -> Self {
        self.args.push(ArgDef {
            name: name.to_owned(),
            kind,
            arity: Arity::Optional(default),
            allowed: None,
        });
        self
    }

    /// Adds a variadic text argument consuming all remaining tokens.
    ///
    /// `min` is the smallest number of tokens accepted; use `0` for an
    /// argument that may be absent entirely.
    pub fn variadic(mut self, name: &str, min: usize) -> Self {
        self.args.push(ArgDef {
            name: name.to_owned(),
            kind: ArgKind::Text,
            arity: Arity::Variadic { min },
            allowed: None,
        });
        self
    }

    /// Restricts the most recently added argument to a set of values.
    pub fn allowed(mut self, values: Vec<ArgValue>) -> Self {
        if let Some(last) = self.args.last_mut() {
            last.allowed = Some(values);
        }
        self
    }

    /// Finishes the spec.
    pub fn build(self) -> ArgSpec {
        ArgSpec { args: self.args }
    }
}

/// Typed arguments of one invocation, keyed by argument name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedArgs {
    values: HashMap<String, ArgValue>,
}

impl ParsedArgs {
    /// Returns the raw value of an argument.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    /// Returns a text argument.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Returns an integer argument.
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    /// Returns the tokens of a variadic argument.
    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(ArgValue::List(items)) => Some(items),
            _ => None,
        }
    }
}

fn value_matches_kind(value: &ArgValue, kind: ArgKind) -> bool {
    matches!(
        (value, kind),
        (ArgValue::Text(_), ArgKind::Text) | (ArgValue::Integer(_), ArgKind::Integer)
    )
}

fn convert(arg: &ArgDef, token: &str) -> Result<ArgValue, ArgumentError> {
    let value = match arg.kind {
        ArgKind::Text => ArgValue::Text(token.to_owned()),
        ArgKind::Integer => match token.parse::<i64>() {
            Ok(value) => ArgValue::Integer(value),
            Err(_) => {
                return Err(ArgumentError::InvalidValue {
                    name: arg.name.clone(),
                    value: token.to_owned(),
                    expected: arg.kind,
                });
            }
        },
    };

    if let Some(allowed) = &arg.allowed
        && !allowed.contains(&value)
    {
        let rendered = allowed
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ArgumentError::NotAllowed {
            name: arg.name.clone(),
            value: token.to_owned(),
            allowed: rendered,
        });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|token| token.to_string()).collect()
    }

    #[test]
    fn test_required_text_argument() {
        let spec = ArgSpec::builder().required("game", ArgKind::Text).build();
        let args = spec.parse(&tokens(&["game123"])).unwrap();
        assert_eq!(args.text("game"), Some("game123"));
    }

    #[test]
    fn test_missing_required_argument() {
        let spec = ArgSpec::builder().required("game", ArgKind::Text).build();
        let result = spec.parse(&[]);
        assert_eq!(result, Err(ArgumentError::Missing("game".to_string())));
    }

    #[test]
    fn test_integer_argument() {
        let spec = ArgSpec::builder().required("delay", ArgKind::Integer).build();
        let args = spec.parse(&tokens(&["60"])).unwrap();
        assert_eq!(args.integer("delay"), Some(60));
    }

    #[test]
    fn test_invalid_integer_argument() {
        let spec = ArgSpec::builder().required("delay", ArgKind::Integer).build();
        let result = spec.parse(&tokens(&["soon"]));
        assert!(matches!(
            result,
            Err(ArgumentError::InvalidValue { name, .. }) if name == "delay"
        ));
    }

    #[test]
    fn test_optional_argument_uses_default() {
        let spec = ArgSpec::builder()
            .optional("amount", ArgKind::Integer, ArgValue::Integer(1))
            .build();
        let args = spec.parse(&[]).unwrap();
        assert_eq!(args.integer("amount"), Some(1));
    }

    #[test]
    fn test_optional_argument_takes_token_when_present() {
        let spec = ArgSpec::builder()
            .optional("amount", ArgKind::Integer, ArgValue::Integer(1))
            .build();
        let args = spec.parse(&tokens(&["3"])).unwrap();
        assert_eq!(args.integer("amount"), Some(3));
    }

    #[test]
    fn test_allowed_values_accepts_member() {
        let spec = ArgSpec::builder()
            .optional("amount", ArgKind::Integer, ArgValue::Integer(1))
            .allowed(vec![ArgValue::Integer(1), ArgValue::Integer(2)])
            .build();
        assert!(spec.parse(&tokens(&["2"])).is_ok());
    }

    #[test]
    fn test_allowed_values_rejects_outsider() {
        let spec = ArgSpec::builder()
            .optional("amount", ArgKind::Integer, ArgValue::Integer(1))
            .allowed(vec![ArgValue::Integer(1), ArgValue::Integer(2)])
            .build();
        let result = spec.parse(&tokens(&["9"]));
        assert!(matches!(
            result,
            Err(ArgumentError::NotAllowed { value, .. }) if value == "9"
        ));
    }

    #[test]
    fn test_variadic_collects_remaining_tokens() {
        let spec = ArgSpec::builder().variadic("users", 0).build();
        let args = spec.parse(&tokens(&["Alice", "Bob"])).unwrap();
        assert_eq!(args.list("users"), Some(&tokens(&["Alice", "Bob"])[..]));
    }

    #[test]
    fn test_variadic_empty_is_allowed_with_zero_min() {
        let spec = ArgSpec::builder().variadic("users", 0).build();
        let args = spec.parse(&[]).unwrap();
        assert_eq!(args.list("users"), Some(&[][..]));
    }

    #[test]
    fn test_variadic_enforces_minimum() {
        let spec = ArgSpec::builder().variadic("commands", 1).build();
        let result = spec.parse(&[]);
        assert_eq!(result, Err(ArgumentError::Missing("commands".to_string())));
    }

    #[test]
    fn test_unexpected_extra_token() {
        let spec = ArgSpec::builder().required("game", ArgKind::Text).build();
        let result = spec.parse(&tokens(&["game123", "extra"]));
        assert_eq!(result, Err(ArgumentError::Unexpected("extra".to_string())));
    }

    #[test]
    fn test_mixed_required_then_variadic() {
        let spec = ArgSpec::builder()
            .required("game", ArgKind::Text)
            .variadic("players", 0)
            .build();
        let args = spec.parse(&tokens(&["game123", "Alice", "Bob"])).unwrap();
        assert_eq!(args.text("game"), Some("game123"));
        assert_eq!(args.list("players"), Some(&tokens(&["Alice", "Bob"])[..]));
    }

    #[test]
    fn test_validate_accepts_well_formed_spec() {
        let spec = ArgSpec::builder()
            .required("game", ArgKind::Text)
            .optional("amount", ArgKind::Integer, ArgValue::Integer(1))
            .variadic("rest", 0)
            .build();
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let spec = ArgSpec::builder()
            .required("game", ArgKind::Text)
            .required("game", ArgKind::Text)
            .build();
        assert_eq!(
            spec.validate(),
            Err(SpecError::DuplicateName("game".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_required_after_optional() {
        let spec = ArgSpec::builder()
            .optional("amount", ArgKind::Integer, ArgValue::Integer(1))
            .required("game", ArgKind::Text)
            .build();
        assert_eq!(
            spec.validate(),
            Err(SpecError::RequiredAfterOptional("game".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_variadic_not_last() {
        let spec = ArgSpec::builder()
            .variadic("users", 0)
            .required("game", ArgKind::Text)
            .build();
        assert_eq!(
            spec.validate(),
            Err(SpecError::VariadicNotLast("users".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_default_kind_mismatch() {
        let spec = ArgSpec::builder()
            .optional("amount", ArgKind::Integer, ArgValue::Text("one".to_string()))
            .build();
        assert_eq!(
            spec.validate(),
            Err(SpecError::KindMismatch("amount".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_default_outside_allowed_set() {
        let spec = ArgSpec::builder()
            .optional("amount", ArgKind::Integer, ArgValue::Integer(7))
            .allowed(vec![ArgValue::Integer(1), ArgValue::Integer(2)])
            .build();
        assert_eq!(
            spec.validate(),
            Err(SpecError::DefaultNotAllowed("amount".to_string()))
        );
    }

    #[test]
    fn test_get_returns_the_raw_value() {
        let spec = ArgSpec::builder().required("delay", ArgKind::Integer).build();
        let args = spec.parse(&tokens(&["60"])).unwrap();
        assert_eq!(args.get("delay"), Some(&ArgValue::Integer(60)));
        assert_eq!(args.get("missing"), None);
    }

    #[test]
    fn test_argument_error_messages_are_user_facing() {
        let missing = ArgumentError::Missing("game".to_string());
        assert_eq!(missing.to_string(), "Missing required argument `game`.");

        let invalid = ArgumentError::InvalidValue {
            name: "amount".to_string(),
            value: "soon".to_string(),
            expected: ArgKind::Integer,
        };
        assert_eq!(
            invalid.to_string(),
            "Invalid value `soon` for `amount`: expected an integer."
        );
    }
}
