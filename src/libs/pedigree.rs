use std::collections::HashMap;

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

use crate::error::MutkError::PedigreeInvalid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[default]
    Unknown,
    Autosomal,
    Male,
    Female,
}

impl Sex {
    pub fn parse(value: &str) -> Option<Sex> {
        match value.to_ascii_lowercase().as_str() {
            "male" | "m" | "1" => Some(Sex::Male),
            "female" | "f" | "2" => Some(Sex::Female),
            "autosomal" | "a" | "0" => Some(Sex::Autosomal),
            "unknown" | "u" | "." => Some(Sex::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Autosomal => "autosomal",
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub sex: Sex,
    pub dad: Option<String>,
    pub mom: Option<String>,
    pub dad_length: Option<f64>,
    pub mom_length: Option<f64>,
    pub tags: Vec<String>,
    pub samples: Vec<String>,
}

impl Member {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// An ordered family structure. Member positions are stable and double as
/// vertex indices in the relationship graph.
#[derive(Debug, Clone, Default)]
pub struct Pedigree {
    members: Vec<Member>,
    positions: HashMap<String, usize>,
}

impl Pedigree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&mut self, member: Member) -> Result<()> {
        if self.positions.contains_key(&member.name) {
            return Err(eyre!(PedigreeInvalid((
                member.name.clone(),
                format!("member '{}' is listed twice", member.name),
            ))));
        }
        self.positions.insert(member.name.clone(), self.members.len());
        self.members.push(member);
        Ok(())
    }

    pub fn number_of_members(&self) -> usize {
        self.members.len()
    }

    pub fn get_member(&self, pos: usize) -> &Member {
        &self.members[pos]
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn lookup_member_position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Parses a whitespace-separated pedigree table.
    ///
    /// One member per line: `name dad mom sex [field ...]`. A `.` marks a
    /// missing parent and `parent:length` attaches a branch length. Trailing
    /// fields are tags (`founder`, `clone`, `p=1`, ...) unless they contain a
    /// parenthesis or end with `;`, in which case they are Newick sample
    /// trees. `#` starts a comment.
    pub fn parse(text: &str) -> Result<Pedigree> {
        let mut pedigree = Pedigree::new();

        for line in text.lines() {
            let line = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(eyre!(PedigreeInvalid((
                    fields[0].to_string(),
                    format!(
                        "row for '{}' has {} columns, expected at least 4 (name dad mom sex)",
                        fields[0],
                        fields.len()
                    ),
                ))));
            }

            let name = fields[0].to_string();
            let (dad, dad_length) = parse_parent(&name, fields[1])?;
            let (mom, mom_length) = parse_parent(&name, fields[2])?;
            let sex = Sex::parse(fields[3]).ok_or_else(|| {
                eyre!(PedigreeInvalid((
                    name.clone(),
                    format!("the sex of '{name}' is not recognized: {:?}", fields[3]),
                )))
            })?;

            let mut tags = vec![];
            let mut samples = vec![];
            for field in &fields[4..] {
                if field.contains('(') || field.ends_with(';') {
                    samples.push(field.to_string());
                } else {
                    tags.push(field.to_string());
                }
            }

            pedigree.add_member(Member {
                name,
                sex,
                dad,
                mom,
                dad_length,
                mom_length,
                tags,
                samples,
            })?;
        }

        Ok(pedigree)
    }
}

fn parse_parent(member: &str, field: &str) -> Result<(Option<String>, Option<f64>)> {
    if field == "." {
        return Ok((None, None));
    }
    match field.split_once(':') {
        None => Ok((Some(field.to_string()), None)),
        Some((parent, length)) => {
            let length: f64 = length.parse().map_err(|_| {
                eyre!(PedigreeInvalid((
                    member.to_string(),
                    format!("the branch length of '{member}' is not a number: {length:?}"),
                )))
            })?;
            Ok((Some(parent.to_string()), Some(length)))
        }
    }
}
