#![forbid(unsafe_code)]

pub mod cursor;
pub mod search;
pub mod synth;

pub mod ids {
    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct TableId(String);

    impl TableId {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn into_string(self) -> String {
            self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, TableIdError> {
            let value = value.into();
            validate_table_id(&value)?;
            Ok(Self(value))
        }
    }

    impl std::fmt::Display for TableId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum TableIdError {
        Empty,
        TooLong,
        InvalidFirstChar,
        InvalidChar { ch: char, index: usize },
    }

    impl TableIdError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::Empty => "table id must not be empty",
                Self::TooLong => "table id is too long",
                Self::InvalidFirstChar => "table id must start with an ascii letter or digit",
                Self::InvalidChar { .. } => "table id contains an invalid character",
            }
        }
    }

    impl std::fmt::Display for TableIdError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::InvalidChar { ch, index } => {
                    write!(f, "{} (ch={ch:?}, index={index})", self.message())
                }
                other => f.write_str(other.message()),
            }
        }
    }

    impl std::error::Error for TableIdError {}

    fn validate_table_id(value: &str) -> Result<(), TableIdError> {
        if value.is_empty() {
            return Err(TableIdError::Empty);
        }
        if value.len() > 128 {
            return Err(TableIdError::TooLong);
        }
        let mut chars = value.chars();
        let Some(first) = chars.next() else {
            return Err(TableIdError::Empty);
        };
        if !first.is_ascii_alphanumeric() {
            return Err(TableIdError::InvalidFirstChar);
        }
        for (index, ch) in value.chars().enumerate() {
            if index == 0 {
                continue;
            }
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                continue;
            }
            return Err(TableIdError::InvalidChar { ch, index });
        }
        Ok(())
    }
}

pub mod model {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum ColumnType {
        Text,
        Number,
    }

    impl ColumnType {
        pub fn as_str(self) -> &'static str {
            match self {
                ColumnType::Text => "TEXT",
                ColumnType::Number => "NUMBER",
            }
        }

        pub fn parse(value: &str) -> Result<Self, ColumnTypeError> {
            match value.trim().to_ascii_uppercase().as_str() {
                "TEXT" => Ok(ColumnType::Text),
                "NUMBER" => Ok(ColumnType::Number),
                _ => Err(ColumnTypeError {
                    value: value.to_string(),
                }),
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ColumnTypeError {
        pub value: String,
    }

    impl std::fmt::Display for ColumnTypeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(
                f,
                "unsupported column type {:?} (expected TEXT|NUMBER)",
                self.value
            )
        }
    }

    impl std::error::Error for ColumnTypeError {}

    /// A column as the bulk path sees it. `creation_order` is the canonical
    /// iteration order for value synthesis and for the `search` text.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Column {
        pub id: String,
        pub name: String,
        pub column_type: ColumnType,
        pub creation_order: i64,
    }

    /// Returns the columns sorted into creation order (ties broken by id).
    pub fn in_creation_order(columns: &[Column]) -> Vec<Column> {
        let mut out = columns.to_vec();
        out.sort_by(|a, b| {
            a.creation_order
                .cmp(&b.creation_order)
                .then_with(|| a.id.cmp(&b.id))
        });
        out
    }

    #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    pub enum CellValue {
        Text(String),
        Number(i64),
    }

    impl CellValue {
        pub fn render(&self) -> String {
            match self {
                CellValue::Text(text) => text.clone(),
                CellValue::Number(n) => n.to_string(),
            }
        }
    }
}
