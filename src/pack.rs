//! Pack definition parser.
//!
//! A pack file is a small line-oriented format describing a named bundle of
//! addons for bulk import. Blank lines and `#` comments are skipped; every
//! other line must be one of four directives, tried in fixed priority order:
//!
//! ```text
//! ID 42
//! NAME My Pack
//! CLIENT retail classic
//! ADDON 123 stable
//! ```
//!
//! An unrecognized line or a malformed `ADDON` aborts the whole parse; a
//! pack definition is either fully understood or rejected.

use crate::catalog::ChannelType;
use crate::client::ClientType;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveType {
    Id,
    Name,
    Client,
    Addon,
}

/// One parsed line of a pack definition. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackDirective {
    pub directive_type: DirectiveType,
    pub arguments: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackParseError {
    #[error("line {line}: unrecognized directive: {text}")]
    UnknownDirective { line: usize, text: String },
    #[error("line {line}: ADDON takes 1 or 2 arguments, found {found}")]
    AddonArity { line: usize, found: usize },
}

/// Parses pack text into directives, preserving line order.
pub fn parse(text: &str) -> Result<Vec<PackDirective>, PackParseError> {
    let mut directives = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let directive = parse_line(line, index + 1)?;
        directives.push(directive);
    }

    Ok(directives)
}

fn parse_line(line: &str, line_number: usize) -> Result<PackDirective, PackParseError> {
    // Prefix forms are tried in fixed priority order; the prefix alone
    // selects the directive, a separator is not required.
    if let Some(rest) = line.strip_prefix("ID") {
        return Ok(PackDirective {
            directive_type: DirectiveType::Id,
            arguments: vec![rest.trim().to_string()],
        });
    }
    if let Some(rest) = line.strip_prefix("NAME") {
        return Ok(PackDirective {
            directive_type: DirectiveType::Name,
            arguments: vec![rest.trim().to_string()],
        });
    }
    if let Some(rest) = line.strip_prefix("CLIENT") {
        return Ok(PackDirective {
            directive_type: DirectiveType::Client,
            arguments: rest
                .split_whitespace()
                .map(|token| token.to_lowercase())
                .collect(),
        });
    }
    if let Some(rest) = line.strip_prefix("ADDON") {
        let arguments: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
        if arguments.is_empty() || arguments.len() > 2 {
            return Err(PackParseError::AddonArity {
                line: line_number,
                found: arguments.len(),
            });
        }
        return Ok(PackDirective {
            directive_type: DirectiveType::Addon,
            arguments,
        });
    }

    Err(PackParseError::UnknownDirective {
        line: line_number,
        text: line.to_string(),
    })
}

/// One addon reference inside a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackAddon {
    pub external_id: String,
    pub channel: ChannelType,
}

/// A fully assembled pack definition ready for bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackDefinition {
    pub id: String,
    pub name: String,
    pub clients: Vec<ClientType>,
    pub addons: Vec<PackAddon>,
}

impl PackDefinition {
    /// Assembles a definition from parsed directives. Later `ID`/`NAME`
    /// lines win; `CLIENT` and `ADDON` lines accumulate.
    pub fn from_directives(directives: &[PackDirective]) -> PackDefinition {
        let mut definition = PackDefinition::default();

        for directive in directives {
            match directive.directive_type {
                DirectiveType::Id => {
                    definition.id = directive.arguments.first().cloned().unwrap_or_default();
                }
                DirectiveType::Name => {
                    definition.name = directive.arguments.first().cloned().unwrap_or_default();
                }
                DirectiveType::Client => {
                    for token in &directive.arguments {
                        definition.clients.push(ClientType::from_token(token));
                    }
                }
                DirectiveType::Addon => {
                    let channel = directive
                        .arguments
                        .get(1)
                        .map(|token| ChannelType::from_str_lossy(token))
                        .unwrap_or(ChannelType::Stable);
                    definition.addons.push(PackAddon {
                        external_id: directive.arguments[0].clone(),
                        channel,
                    });
                }
            }
        }

        definition
    }
}
