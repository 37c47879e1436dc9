//! Core domain types: queries, extracted profiles, and output schemas.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of phone columns on every output row.
pub const PHONE_SLOTS: usize = 5;

/// Fixed profile columns, in output order.
pub const PROFILE_COLUMNS: [&str; 7 + PHONE_SLOTS] = [
    "name",
    "age",
    "birth_year",
    "street",
    "city",
    "region",
    "zipcode",
    "phone-1",
    "phone-2",
    "phone-3",
    "phone-4",
    "phone-5",
];

/// A source record collapsed to single-level `key -> scalar` pairs.
pub type FlatRecord = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// One search request derived from one owner on one source record.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Owner name as given in the input.
    pub name: String,
    pub city: String,
    pub state: String,
    /// Empty when the input carries no zip code.
    pub zipcode: String,
    /// The originating record, flattened, with `owners` removed.
    pub source: FlatRecord,
}

// ---------------------------------------------------------------------------
// ProfileFields
// ---------------------------------------------------------------------------

/// Fields extracted from a profile page. `None` means "not on the page".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub name: Option<String>,
    pub age: Option<String>,
    pub birth_year: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub zipcode: Option<String>,
    pub phones: [Option<String>; PHONE_SLOTS],
}

impl ProfileFields {
    /// All-null fields except the display name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Fill the phone slots from `numbers` in iteration order.
    ///
    /// Values are deduplicated by exact string; anything past
    /// [`PHONE_SLOTS`] distinct values is discarded.
    pub fn set_phones<I, S>(&mut self, numbers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phones = Default::default();
        let mut seen = HashSet::new();
        let mut slot = 0;
        for number in numbers {
            if slot == PHONE_SLOTS {
                break;
            }
            let number = number.into();
            if seen.insert(number.clone()) {
                self.phones[slot] = Some(number);
                slot += 1;
            }
        }
    }

    /// Number of filled phone slots.
    pub fn phone_count(&self) -> usize {
        self.phones.iter().filter(|p| p.is_some()).count()
    }

    /// Value of a fixed column by its output name.
    pub fn get(&self, column: &str) -> Option<&str> {
        let value = match column {
            "name" => &self.name,
            "age" => &self.age,
            "birth_year" => &self.birth_year,
            "street" => &self.street,
            "city" => &self.city,
            "region" => &self.region,
            "zipcode" => &self.zipcode,
            other => {
                let idx: usize = other.strip_prefix("phone-")?.parse().ok()?;
                self.phones.get(idx.checked_sub(1)?)?
            }
        };
        value.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Merge precedence
// ---------------------------------------------------------------------------

/// Which side wins when a flattened source key equals a fixed profile column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePrecedence {
    /// Source-record values replace extracted values on collision.
    SourceOverridesProfile,
    /// Extracted values are kept on collision.
    ProfileOverridesSource,
}

/// Precedence applied when building merged output rows.
pub const MERGE_PRECEDENCE: MergePrecedence = MergePrecedence::SourceOverridesProfile;

// ---------------------------------------------------------------------------
// ProfileRecord
// ---------------------------------------------------------------------------

/// How a query was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Profile page fetched and extracted.
    Matched,
    /// Results page had no profile link.
    NoMatch,
    /// Fetch or extraction failed terminally.
    Failed,
}

/// The final emitted unit: one per resolved query.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub fields: ProfileFields,
    /// Flattened source columns, present only when the schema merges them.
    pub source: Option<FlatRecord>,
    pub outcome: Outcome,
}

impl ProfileRecord {
    /// A successfully extracted profile.
    pub fn matched(fields: ProfileFields, source: Option<FlatRecord>) -> Self {
        Self {
            fields,
            source,
            outcome: Outcome::Matched,
        }
    }

    /// A null-filled row carrying only the display name (and source columns).
    pub fn placeholder(name: &str, source: Option<FlatRecord>, outcome: Outcome) -> Self {
        Self {
            fields: ProfileFields::named(name),
            source,
            outcome,
        }
    }

    /// Build the output row: fixed fields first, then source fields
    /// according to [`MERGE_PRECEDENCE`].
    pub fn to_row(&self) -> BTreeMap<String, Value> {
        self.to_row_with(MERGE_PRECEDENCE)
    }

    /// Build the output row with an explicit precedence rule.
    ///
    /// The rule applies to matched records only. Placeholders keep every
    /// fixed column except `name` null; their source values fill source
    /// columns and never a fixed one.
    pub fn to_row_with(&self, precedence: MergePrecedence) -> BTreeMap<String, Value> {
        let precedence = match self.outcome {
            Outcome::Matched => precedence,
            Outcome::NoMatch | Outcome::Failed => MergePrecedence::ProfileOverridesSource,
        };

        let mut row: BTreeMap<String, Value> = PROFILE_COLUMNS
            .iter()
            .map(|col| {
                let value = self
                    .fields
                    .get(col)
                    .map_or(Value::Null, |v| Value::String(v.to_string()));
                (col.to_string(), value)
            })
            .collect();

        if let Some(source) = &self.source {
            for (key, value) in source {
                match precedence {
                    MergePrecedence::SourceOverridesProfile => {
                        row.insert(key.clone(), value.clone());
                    }
                    MergePrecedence::ProfileOverridesSource => {
                        row.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
        }

        row
    }
}

// ---------------------------------------------------------------------------
// Column schema
// ---------------------------------------------------------------------------

/// Which output column set to write, chosen at configuration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnVariant {
    /// Profile fields only.
    Profile,
    /// Profile fields plus the configured flattened-source columns.
    #[default]
    Merged,
}

impl std::str::FromStr for ColumnVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "profile" => Ok(Self::Profile),
            "merged" => Ok(Self::Merged),
            other => Err(format!(
                "unknown column schema '{other}': expected 'profile' or 'merged'"
            )),
        }
    }
}

/// The fixed, ordered header of the output CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSchema {
    Profile,
    Merged { source_columns: Vec<String> },
}

impl ColumnSchema {
    /// Build a schema from a variant and the configured source column list.
    pub fn new(variant: ColumnVariant, source_columns: &[String]) -> Self {
        match variant {
            ColumnVariant::Profile => Self::Profile,
            ColumnVariant::Merged => Self::Merged {
                source_columns: source_columns.to_vec(),
            },
        }
    }

    /// Whether rows carry flattened source fields.
    pub fn merges_source(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }

    /// Header columns in output order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = PROFILE_COLUMNS.iter().map(|c| c.to_string()).collect();
        if let Self::Merged { source_columns } = self {
            for col in source_columns {
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }
        columns
    }
}
