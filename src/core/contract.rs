use std::collections::BTreeMap;
use std::str::FromStr;

use crate::core::context::{is_filled, Context};
use crate::core::error::DefinitionError;

/// Field name → reasons the field breached its contract.
pub type Breaches = BTreeMap<String, Vec<String>>;

/// Options accepted by [`Contract::expect_with`] and [`Contract::promise_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOptions {
    /// The value must also be non-blank, not merely present.
    pub filled: bool,
    /// Only meaningful on promises: whether downstream steps may rely on the field.
    pub forward: bool,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            filled: true,
            forward: true,
        }
    }
}

impl FieldOptions {
    pub fn unfilled() -> Self {
        Self {
            filled: false,
            ..Self::default()
        }
    }

    pub fn without_forwarding(self) -> Self {
        Self {
            forward: false,
            ..self
        }
    }
}

/// A required input of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub filled: bool,
}

/// An output a step promises to leave in the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promise {
    pub name: String,
    pub filled: bool,
    pub forward: bool,
}

/// The declared input/output contract of a step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contract {
    required: Vec<Field>,
    optional: Vec<String>,
    promised: Vec<Promise>,
}

impl Contract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the fields to be present and filled.
    pub fn expect<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expect_with(names, FieldOptions::default())
    }

    pub fn expect_with<I, S>(mut self, names: I, options: FieldOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let field = Field {
                name: name.into(),
                filled: options.filled,
            };
            match self.required.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => *existing = field,
                None => self.required.push(field),
            }
        }
        self
    }

    /// Optional fields are never checked, but travel along with job payloads.
    pub fn optional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.optional.contains(&name) {
                self.optional.push(name);
            }
        }
        self
    }

    pub fn promise<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.promise_with(names, FieldOptions::default())
    }

    pub fn promise_with<I, S>(mut self, names: I, options: FieldOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let promise = Promise {
                name: name.into(),
                filled: options.filled,
                forward: options.forward,
            };
            match self.promised.iter_mut().find(|p| p.name == promise.name) {
                Some(existing) => *existing = promise,
                None => self.promised.push(promise),
            }
        }
        self
    }

    pub fn required_fields(&self) -> &[Field] {
        &self.required
    }

    pub fn promises(&self) -> &[Promise] {
        &self.promised
    }

    pub fn expected_keys(&self) -> Vec<&str> {
        self.required.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn optional_keys(&self) -> Vec<&str> {
        self.optional.iter().map(String::as_str).collect()
    }

    pub fn promised_keys(&self) -> Vec<&str> {
        self.promised.iter().map(|p| p.name.as_str()).collect()
    }

    /// Promises downstream steps are allowed to depend on.
    pub fn forwarded_keys(&self) -> Vec<&str> {
        self.promised
            .iter()
            .filter(|p| p.forward)
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.optional.is_empty() && self.promised.is_empty()
    }

    /// Rejects fields declared both required and optional.
    pub fn check(&self, step: &str) -> Result<(), DefinitionError> {
        let fields: Vec<String> = self
            .required
            .iter()
            .filter(|f| self.optional.contains(&f.name))
            .map(|f| f.name.clone())
            .collect();

        if fields.is_empty() {
            Ok(())
        } else {
            Err(DefinitionError::OverlappingFields {
                step: step.to_string(),
                fields,
            })
        }
    }

    /// Breaches of the required fields, checked before a step runs.
    pub fn entry_breaches(&self, ctx: &Context) -> Breaches {
        breaches(ctx, self.required.iter().map(|f| (f.name.as_str(), f.filled)))
    }

    /// Breaches of the promised fields, checked after a step ran.
    pub fn exit_breaches(&self, ctx: &Context) -> Breaches {
        breaches(ctx, self.promised.iter().map(|p| (p.name.as_str(), p.filled)))
    }
}

fn breaches<'a>(ctx: &Context, fields: impl Iterator<Item = (&'a str, bool)>) -> Breaches {
    let mut found = Breaches::new();
    for (name, filled) in fields {
        match ctx.get(name) {
            None => {
                found.insert(name.to_string(), vec![format!("{name} is missing")]);
            }
            Some(value) if filled && !is_filled(value) => {
                found.insert(name.to_string(), vec![format!("{name} must be filled")]);
            }
            Some(_) => {}
        }
    }
    found
}

impl FromStr for Contract {
    type Err = DefinitionError;

    /// Parses shorthand syntax: "input1, maybe? -> output1, output2"
    ///
    /// Inputs suffixed with `?` are optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split("->").collect();
        if parts.len() != 2 {
            return Err(DefinitionError::InvalidShorthand {
                input: s.to_string(),
                reason: "must contain exactly one '->'".to_string(),
            });
        }

        let names = |part: &str| {
            part.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect::<Vec<String>>()
        };

        let (optional, required): (Vec<String>, Vec<String>) =
            names(parts[0]).into_iter().partition(|n| n.ends_with('?'));
        let optional = optional.into_iter().map(|n| n.trim_end_matches('?').to_string());

        Ok(Contract::new()
            .expect(required)
            .optional(optional)
            .promise(names(parts[1])))
    }
}

/// Macro for rapid contract creation: contract!("things, extra? -> total")
#[macro_export]
macro_rules! contract {
    ($s:expr) => {
        $s.parse::<$crate::Contract>().expect("Invalid contract shorthand")
    };
}
