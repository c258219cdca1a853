//! Input checks run before any engine call.

use crate::domain::models::NodeIdentity;
use crate::services::environments::EnvironmentRegistry;
use serde::Serialize;

pub const MIN_NAME_LEN: usize = 4;
pub const PKEY_LEN: usize = 66;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputField {
    Name,
    Net,
    Pkey,
}

impl InputField {
    pub fn flag(&self) -> &'static str {
        match self {
            InputField::Name => "--name",
            InputField::Net => "--net",
            InputField::Pkey => "--pkey",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Missing,
    TooShort,
    BadCharacters,
    WrongLength,
    NotHex,
    UnknownNetwork,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: InputField,
    pub reason: Reason,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            Reason::Missing => write!(
                f,
                "{} is required when starting a new fullnode",
                self.field.flag()
            ),
            _ => write!(f, "{} is not valid", self.field.flag()),
        }
    }
}

impl ValidationError {
    fn new(field: InputField, reason: Reason) -> Self {
        Self { field, reason }
    }
}

/// Non-fatal: a different `--name` was given while a fullnode is remembered.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("fullnode {name} is already configured")]
pub struct AlreadyConfigured {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct StartArgs {
    pub name: Option<String>,
    pub net: Option<String>,
    pub pkey: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartIntent {
    /// First-time configuration with validated input.
    Configure { identity: NodeIdentity, pkey: String },
    /// A remembered identity is reused; a valid `--pkey` is kept only for
    /// re-creating a missing node container.
    Reuse {
        identity: NodeIdentity,
        warning: Option<AlreadyConfigured>,
        repair_pkey: Option<String>,
    },
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.chars().count() < MIN_NAME_LEN {
        return Err(ValidationError::new(InputField::Name, Reason::TooShort));
    }
    let mut chars = name.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !first_ok || !rest_ok {
        return Err(ValidationError::new(InputField::Name, Reason::BadCharacters));
    }
    Ok(())
}

pub fn validate_pkey(pkey: &str) -> Result<(), ValidationError> {
    if pkey.len() != PKEY_LEN {
        return Err(ValidationError::new(InputField::Pkey, Reason::WrongLength));
    }
    if hex::decode(pkey).is_err() {
        return Err(ValidationError::new(InputField::Pkey, Reason::NotHex));
    }
    Ok(())
}

pub fn validate_net(net: &str, registry: &EnvironmentRegistry) -> Result<(), ValidationError> {
    if !registry.contains(net) {
        return Err(ValidationError::new(InputField::Net, Reason::UnknownNetwork));
    }
    Ok(())
}

/// Decide what `start` should do. Fields are checked in the order name, net,
/// pkey and only the first problem is returned.
pub fn resolve_start(
    remembered: Option<NodeIdentity>,
    args: &StartArgs,
    registry: &EnvironmentRegistry,
) -> Result<StartIntent, ValidationError> {
    if let Some(identity) = remembered {
        let warning = args
            .name
            .as_deref()
            .filter(|n| *n != identity.name)
            .map(|_| AlreadyConfigured {
                name: identity.name.clone(),
            });
        let repair_pkey = args
            .pkey
            .clone()
            .filter(|p| validate_pkey(p).is_ok());
        return Ok(StartIntent::Reuse {
            identity,
            warning,
            repair_pkey,
        });
    }

    let name = required(args.name.as_deref(), InputField::Name)?;
    validate_name(name)?;
    let net = required(args.net.as_deref(), InputField::Net)?;
    validate_net(net, registry)?;
    let pkey = required(args.pkey.as_deref(), InputField::Pkey)?;
    validate_pkey(pkey)?;

    Ok(StartIntent::Configure {
        identity: NodeIdentity::new(name, net),
        pkey: pkey.to_string(),
    })
}

fn required(value: Option<&str>, field: InputField) -> Result<&str, ValidationError> {
    value.ok_or(ValidationError::new(field, Reason::Missing))
}
