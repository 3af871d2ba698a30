#![forbid(unsafe_code)]

//! Deterministic synthetic cell values.
//!
//! Every value is a pure function of `(table seed, row sequence number,
//! column index, column name, column type)`. There is no shared RNG state, so
//! writers can synthesize disjoint batches in parallel and still agree.

use crate::ids::TableId;
use crate::model::{CellValue, ColumnType};
use sha2::{Digest, Sha256};

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Chloe", "Dmitri", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonas",
    "Kavya", "Liam", "Mei", "Nadia", "Oscar", "Priya", "Quinn", "Rosa", "Sami", "Tomas",
];

const LAST_NAMES: &[&str] = &[
    "Anders", "Baptiste", "Costa", "Dubois", "Eriksen", "Fischer", "Garcia", "Haddad", "Ito",
    "Jensen", "Kowalski", "Lopez", "Moreau", "Nakamura", "Okafor", "Petrov", "Rossi", "Silva",
    "Tanaka", "Weber",
];

const WORDS: &[&str] = &[
    "amber", "basalt", "cedar", "delta", "ember", "fjord", "granite", "harbor", "indigo", "juniper",
    "kestrel", "lagoon", "meadow", "nimbus", "orchid", "pepper", "quartz", "river", "saffron",
    "timber", "umber", "velvet", "willow", "xenon", "yarrow", "zephyr",
];

const EMAIL_DOMAIN: &str = "example.com";
const AGE_MIN: i64 = 18;
const AGE_SPAN: u64 = 63; // 18..=80
const NUMBER_SPAN: u64 = 10_000;

/// Stable per-table seed (first 8 bytes of SHA-256 over the table id).
pub fn table_seed(table_id: &TableId) -> u64 {
    let digest = Sha256::digest(table_id.as_str().as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn mix(seed: u64, n: u64, column_index: usize, n_prime: u64, column_prime: u64) -> u64 {
    n.wrapping_mul(n_prime)
        .wrapping_add((column_index as u64).wrapping_mul(column_prime))
        .wrapping_add(seed)
}

fn pick<'a>(pool: &[&'a str], key: u64) -> &'a str {
    pool[(key % pool.len() as u64) as usize]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rule {
    PersonName,
    Email,
    Age,
    Number,
    Word,
}

fn rule_for(column_name: &str, column_type: ColumnType) -> Rule {
    let name = column_name.trim();
    if name.eq_ignore_ascii_case("name") {
        Rule::PersonName
    } else if name.eq_ignore_ascii_case("email") {
        Rule::Email
    } else if name.eq_ignore_ascii_case("age") {
        Rule::Age
    } else if column_type == ColumnType::Number {
        Rule::Number
    } else {
        Rule::Word
    }
}

pub fn synthetic_value(
    seed: u64,
    n: u64,
    column_index: usize,
    column_name: &str,
    column_type: ColumnType,
) -> CellValue {
    match rule_for(column_name, column_type) {
        Rule::PersonName => {
            let first = pick(FIRST_NAMES, mix(seed, n, column_index, 7, 13));
            let last = pick(LAST_NAMES, mix(seed, n, column_index, 11, 5));
            CellValue::Text(format!("{first} {last}"))
        }
        Rule::Email => {
            let first = pick(FIRST_NAMES, mix(seed, n, column_index, 11, 17));
            let last = pick(LAST_NAMES, mix(seed, n, column_index, 13, 7));
            let suffix = mix(seed, n, column_index, 3, 1) % 1_000;
            CellValue::Text(
                format!("{first}.{last}{suffix}@{EMAIL_DOMAIN}").to_ascii_lowercase(),
            )
        }
        Rule::Age => {
            let offset = mix(seed, n, column_index, 31, 19) % AGE_SPAN;
            CellValue::Number(AGE_MIN + offset as i64)
        }
        Rule::Number => {
            let value = mix(seed, n, column_index, 37, 23) % NUMBER_SPAN;
            CellValue::Number(value as i64)
        }
        Rule::Word => CellValue::Text(pick(WORDS, mix(seed, n, column_index, 23, 29)).to_string()),
    }
}
