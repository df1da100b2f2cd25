use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{attr, FilePatch, FileRecord, Query};
use super::tables::*;

impl Database {
    // ========================================================================
    // File operations
    // ========================================================================

    /// Store a file record and add it to its owner's index
    pub fn put_file(&self, file: &FileRecord) -> Result<(), DatabaseError> {
        debug_assert!(!file.id.is_empty(), "file id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FILES)?;
            let data = rmp_serde::to_vec_named(file)?;
            table.insert(file.id.as_str(), data.as_slice())?;

            let mut owner_table = write_txn.open_table(OWNER_FILES)?;
            let mut file_ids: Vec<String> = match owner_table.get(file.email.as_str())? {
                Some(v) => rmp_serde::from_slice(v.value())?,
                None => Vec::new(),
            };

            if !file_ids.contains(&file.id) {
                file_ids.push(file.id.clone());
                let index_data = rmp_serde::to_vec_named(&file_ids)?;
                owner_table.insert(file.email.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_file(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(id)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Get all files owned by `email`, in creation order
    pub fn get_files_by_owner(&self, email: &str) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_FILES)?;
        let files_table = read_txn.open_table(FILES)?;

        let file_ids: Vec<String> = match owner_table.get(email)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut files = Vec::new();
        for file_id in file_ids {
            if let Some(data) = files_table.get(file_id.as_str())? {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                files.push(file);
            }
        }

        Ok(files)
    }

    /// Delete a file record and drop it from the owner index.
    /// Returns false when no record had this id.
    pub fn delete_file(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let owner: Option<String> = {
            let table = write_txn.open_table(FILES)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let file: FileRecord = rmp_serde::from_slice(data.value())?;
                    Some(file.email)
                }
                None => None,
            };
            result
        };

        let deleted = match owner {
            Some(email) => {
                {
                    let mut table = write_txn.open_table(FILES)?;
                    table.remove(id)?;
                }

                let file_ids: Option<Vec<String>> = {
                    let owner_table = write_txn.open_table(OWNER_FILES)?;
                    let result = match owner_table.get(email.as_str())? {
                        Some(data) => Some(rmp_serde::from_slice(data.value())?),
                        None => None,
                    };
                    result
                };

                if let Some(mut ids) = file_ids {
                    ids.retain(|fid| fid != id);
                    let mut owner_table = write_txn.open_table(OWNER_FILES)?;
                    if ids.is_empty() {
                        owner_table.remove(email.as_str())?;
                    } else {
                        let new_data = rmp_serde::to_vec_named(&ids)?;
                        owner_table.insert(email.as_str(), new_data.as_slice())?;
                    }
                }
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    /// Apply a partial update. Returns the updated record, or None when no
    /// record had this id. The owner never changes, so the index is untouched.
    pub fn update_file(
        &self,
        id: &str,
        patch: &FilePatch,
    ) -> Result<Option<FileRecord>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing = {
            let table = write_txn.open_table(FILES)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let file: FileRecord = rmp_serde::from_slice(data.value())?;
                    Some(file)
                }
                None => None,
            };
            result
        };

        let updated = match existing {
            Some(mut file) => {
                patch.apply(&mut file);

                let serialized = rmp_serde::to_vec_named(&file)?;
                let mut table = write_txn.open_table(FILES)?;
                table.insert(id, serialized.as_slice())?;
                Some(file)
            }
            None => None,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    pub fn get_all_files(&self) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        let mut files = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let file: FileRecord = rmp_serde::from_slice(value.value())?;
            files.push(file);
        }

        Ok(files)
    }

    /// List files matching every query
    pub fn list_files(&self, queries: &[Query]) -> Result<Vec<FileRecord>, DatabaseError> {
        // Use the owner index when a query pins the email
        let owner = queries.iter().find_map(|q| q.pinned_str(attr::EMAIL));
        let candidates = match owner {
            Some(email) => self.get_files_by_owner(email)?,
            None => self.get_all_files()?,
        };

        if queries.is_empty() {
            return Ok(candidates);
        }

        let mut files = Vec::new();
        for file in candidates {
            let doc = serde_json::to_value(&file)?;
            if queries.iter().all(|q| q.matches(&doc)) {
                files.push(file);
            }
        }
        Ok(files)
    }
}
