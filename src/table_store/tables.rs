use redb::TableDefinition;

/// Sheet metadata: "headers" -> msgpack Vec<String>
pub const SHEET_META: TableDefinition<&str, &[u8]> = TableDefinition::new("sheet_meta");

/// Data rows: row offset -> msgpack Vec<String>
pub const SHEET_ROWS: TableDefinition<u64, &[u8]> = TableDefinition::new("sheet_rows");

pub const HEADERS_KEY: &str = "headers";
