// crates/input_core/src/params.rs
//! `name(key=value, ...)` lists used by composite headers, interactions and
//! processors.

use std::fmt;

use crate::error::{InputError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameAndParameters {
    pub name: String,
    pub parameters: Vec<(String, String)>,
}

impl NameAndParameters {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.parameters.push((key.to_string(), value.to_string()));
        self
    }

    /// Parse a single `name` or `name(a=1,b=2)`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (name, rest) = match text.find('(') {
            Some(open) => (&text[..open], Some(&text[open + 1..])),
            None => (text, None),
        };
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(InputError::InvalidParameter {
                name: text.to_string(),
                value: String::new(),
            });
        }

        let mut parameters = Vec::new();
        if let Some(rest) = rest {
            let body = rest.strip_suffix(')').ok_or_else(|| InputError::InvalidParameter {
                name: name.to_string(),
                value: rest.to_string(),
            })?;
            for pair in body.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let (key, value) =
                    pair.split_once('=')
                        .ok_or_else(|| InputError::InvalidParameter {
                            name: pair.to_string(),
                            value: String::new(),
                        })?;
                parameters.push((key.trim().to_string(), value.trim().to_string()));
            }
        }

        Ok(Self {
            name: name.to_string(),
            parameters,
        })
    }

    /// Parse a comma-separated list such as `tap(duration=0.1),slowTap`.
    pub fn parse_list(text: &str) -> Result<Vec<Self>> {
        let mut items = Vec::new();
        let mut depth = 0usize;
        let mut start = 0usize;
        for (i, c) in text.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ',' | ';' if depth == 0 => {
                    push_item(&text[start..i], &mut items)?;
                    start = i + 1;
                }
                _ => {}
            }
        }
        push_item(&text[start..], &mut items)?;
        Ok(items)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_f32(&self, key: &str) -> Result<Option<f32>> {
        self.get(key)
            .map(|v| v.parse::<f32>().map_err(|_| self.bad(key, v)))
            .transpose()
    }

    pub fn get_u32(&self, key: &str) -> Result<Option<u32>> {
        self.get(key)
            .map(|v| v.parse::<u32>().map_err(|_| self.bad(key, v)))
            .transpose()
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.get(key)
            .map(|v| match v.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(self.bad(key, v)),
            })
            .transpose()
    }

    fn bad(&self, key: &str, value: &str) -> InputError {
        InputError::InvalidParameter {
            name: format!("{}.{}", self.name, key),
            value: value.to_string(),
        }
    }
}

fn push_item(text: &str, items: &mut Vec<NameAndParameters>) -> Result<()> {
    if !text.trim().is_empty() {
        items.push(NameAndParameters::parse(text)?);
    }
    Ok(())
}

impl fmt::Display for NameAndParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.parameters.is_empty() {
            f.write_str("(")?;
            for (i, (k, v)) in self.parameters.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{k}={v}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}
