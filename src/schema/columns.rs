//! Column tables consulted during inference and cleansing.

use crate::models::{FieldType, SourceRow};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Columns known to be noisy or irrelevant for search: volatile counters, private
/// flags, bookkeeping timestamps.
const DENYLISTED_COLUMNS: &[&str] = &[
    "occupations",
    "cup_sizes",
    "clothing_sizes",
    "age",
    "instagram_private",
    "account_type",
    "date",
    "first_seen",
    "is_business",
    "last_updated",
    "media_count",
    "index",
    "follower_count",
    "following_count",
    "establishment",
    "house_number",
    "main_sbi_code",
    "active",
    "vinted_id",
    "price_unit",
    "last_updated_at",
    "last_aggregated_at",
    "post_count",
];

/// Declared types for columns whose sample values are unreliable.
const KNOWN_COLUMN_TYPES: &[(&str, FieldType)] = &[
    ("link", FieldType::String),
    ("full_name", FieldType::String),
    ("location", FieldType::String),
    ("avatar_url", FieldType::String),
    ("zip", FieldType::String),
    ("address_street", FieldType::String),
    ("city_name", FieldType::String),
    ("follower_count", FieldType::Int64),
    ("following_count", FieldType::Int64),
    ("is_business", FieldType::Bool),
    ("status", FieldType::String),
    ("media_count", FieldType::Int64),
    ("dexter_id", FieldType::Int64),
    ("ondernemings_nr", FieldType::String),
    ("adress", FieldType::String),
    ("date", FieldType::String),
    ("ent", FieldType::String),
    ("company_name", FieldType::String),
    ("company_status", FieldType::String),
    ("incorporation_date", FieldType::String),
    ("company_number", FieldType::String),
    ("registered_office_address", FieldType::String),
    ("vinted_id", FieldType::Int64),
    ("age", FieldType::Int64),
    ("instagram_private", FieldType::Bool),
    ("rights_form", FieldType::String),
    ("last_update", FieldType::String),
    ("description", FieldType::String),
    ("region", FieldType::String),
    ("rights_form_code", FieldType::String),
    ("name_english", FieldType::String),
    ("legal_persons", FieldType::String),
    ("contact_data", FieldType::String),
    ("activities", FieldType::String),
    ("activity_code_table", FieldType::String),
    ("establishment_type", FieldType::String),
];

static DENYLIST: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| DENYLISTED_COLUMNS.iter().copied().collect());

static KNOWN_TYPES: LazyLock<HashMap<&'static str, FieldType>> =
    LazyLock::new(|| KNOWN_COLUMN_TYPES.iter().copied().collect());

pub fn is_denylisted(column: &str) -> bool {
    DENYLIST.contains(column)
}

pub fn declared_type(column: &str) -> Option<FieldType> {
    KNOWN_TYPES.get(column).copied()
}

/// Remove denylisted columns in place, keeping the order of the rest.
pub fn strip_denylisted(row: &mut SourceRow) {
    row.retain(|column, _| !is_denylisted(column));
}
