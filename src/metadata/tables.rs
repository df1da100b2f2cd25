use redb::TableDefinition;

/// File records: document id -> FileRecord (msgpack)
pub const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Owner index: email -> msgpack Vec of document ids, in creation order
pub const OWNER_FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_files");
