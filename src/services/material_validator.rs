// ==================== MATERIAL VALIDATOR ====================
// Normalization, in-list duplicates and conflicts between students.
// Every comparison goes through `normalize`, so what is stored and what is
// checked always agree.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Every student submits exactly this many materials
pub const MATERIALS_PER_STUDENT: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMaterial {
    /// Trimmed, original casing (what gets stored)
    pub stored: String,
    /// Trimmed and case-folded (comparison only)
    pub key: String,
}

pub fn normalize(raw: &str) -> NormalizedMaterial {
    let stored = raw.trim().to_string();
    let key = stored.to_lowercase();
    NormalizedMaterial { stored, key }
}

pub fn material_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Loose key for the availability search: no whitespace at all, case-folded
pub fn search_key(raw: &str) -> String {
    raw.split_whitespace().collect::<String>().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    WrongCount { expected: usize, actual: usize },
    /// 1-based position of the first blank entry
    EmptyField { position: usize },
    Duplicate { material: String },
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::WrongCount { .. } => "wrong_count",
            ValidationError::EmptyField { .. } => "empty_field",
            ValidationError::Duplicate { .. } => "duplicate",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::WrongCount { expected, actual } => write!(
                f,
                "You must submit exactly {} materials (got {})",
                expected, actual
            ),
            ValidationError::EmptyField { position } => write!(
                f,
                "All {} material fields must be filled (field {} is empty)",
                MATERIALS_PER_STUDENT, position
            ),
            ValidationError::Duplicate { material } => write!(
                f,
                "Your list contains duplicate materials ({}). Please ensure all {} are unique.",
                material, MATERIALS_PER_STUDENT
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Checks count, blanks and intra-list duplicates.
/// Returns the trimmed list in the original order.
pub fn validate_list(raw: &[String]) -> Result<Vec<String>, ValidationError> {
    if raw.len() != MATERIALS_PER_STUDENT {
        return Err(ValidationError::WrongCount {
            expected: MATERIALS_PER_STUDENT,
            actual: raw.len(),
        });
    }

    let normalized: Vec<NormalizedMaterial> = raw.iter().map(|m| normalize(m)).collect();

    if let Some(position) = normalized.iter().position(|m| m.stored.is_empty()) {
        return Err(ValidationError::EmptyField {
            position: position + 1,
        });
    }

    let mut seen = HashSet::with_capacity(MATERIALS_PER_STUDENT);
    for material in &normalized {
        if !seen.insert(material.key.as_str()) {
            return Err(ValidationError::Duplicate {
                material: material.stored.clone(),
            });
        }
    }

    Ok(normalized.into_iter().map(|m| m.stored).collect())
}

/// Stored list of some other user, as seen by the conflict checker
#[derive(Debug, Clone)]
pub struct MaterialHolder {
    pub user_id: String,
    pub name: String,
    pub materials: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Conflict {
    /// Candidate item as submitted (trimmed)
    pub material: String,
    /// Display names of the users already holding it. Left empty on
    /// student-facing responses.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub claimed_by: Vec<String>,
}

/// Whole-string, case-insensitive comparison of every candidate item against
/// every holder's list. All conflicting items are reported, in candidate order.
pub fn find_conflicts(candidate: &[String], holders: &[MaterialHolder]) -> Vec<Conflict> {
    let holder_keys: Vec<(&MaterialHolder, HashSet<String>)> = holders
        .iter()
        .map(|h| (h, h.materials.iter().map(|m| material_key(m)).collect()))
        .collect();

    candidate
        .iter()
        .filter_map(|item| {
            let key = material_key(item);
            let claimed_by: Vec<String> = holder_keys
                .iter()
                .filter(|(_, keys)| keys.contains(&key))
                .map(|(h, _)| h.name.clone())
                .collect();

            if claimed_by.is_empty() {
                None
            } else {
                Some(Conflict {
                    material: item.trim().to_string(),
                    claimed_by,
                })
            }
        })
        .collect()
}
