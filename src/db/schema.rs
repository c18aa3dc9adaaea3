// src/db/schema.rs

/// Declared shape of one collection.
///
/// Field names are JSON keys inside the stored document. Required and
/// unique rules are turned into table constraints, so the storage layer
/// rejects offending writes even if application code forgets to check.
#[derive(Debug)]
pub struct Schema {
    /// Collection (table) name. Part of the on-disk contract.
    pub name: &'static str,

    /// Fields that must be present and non-empty.
    pub required: &'static [&'static str],

    /// Fields whose values must be unique across the collection.
    pub unique: &'static [&'static str],
}

impl Schema {
    /// Statements that create the collection and its constraints.
    /// All of them are idempotent (`IF NOT EXISTS`).
    pub(crate) fn ddl(&self) -> Vec<String> {
        let mut table = format!(
            "CREATE TABLE IF NOT EXISTS {} ( \
             id INTEGER PRIMARY KEY AUTOINCREMENT, \
             doc TEXT NOT NULL CHECK (json_valid(doc)), \
             created_at TEXT NOT NULL, \
             updated_at TEXT NOT NULL",
            self.name
        );

        for field in self.required {
            table.push_str(&format!(
                ", CONSTRAINT {name}_{field}_required CHECK (\
                 json_extract(doc, '$.{field}') IS NOT NULL \
                 AND json_extract(doc, '$.{field}') <> '')",
                name = self.name,
                field = field
            ));
        }
        table.push_str(" )");

        let mut statements = vec![table];

        for field in self.unique {
            statements.push(format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {name}_{field}_unique \
                 ON {name} (json_extract(doc, '$.{field}'))",
                name = self.name,
                field = field
            ));
        }

        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS {name}_created_at ON {name} (created_at)",
            name = self.name
        ));

        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: Schema = Schema {
        name: "robots",
        required: &["key", "value"],
        unique: &["key"],
    };

    #[test]
    fn ddl_declares_required_and_unique_rules() {
        let ddl = SAMPLE.ddl();

        assert!(ddl[0].starts_with("CREATE TABLE IF NOT EXISTS robots"));
        assert!(ddl[0].contains("robots_key_required"));
        assert!(ddl[0].contains("robots_value_required"));
        assert!(ddl.iter().any(|s| s.contains("UNIQUE INDEX IF NOT EXISTS robots_key_unique")));
        assert!(!ddl.iter().any(|s| s.contains("robots_value_unique")));
    }
}
