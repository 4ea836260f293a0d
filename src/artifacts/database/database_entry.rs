use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use derive_new::new;

/// Mode git assigns to regular, non-executable files
pub const REGULAR_FILE_MODE: u32 = 0o100644;

/// One entry of a tree object: `<mode> <type> <oid>\t<name>`
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct DatabaseEntry {
    pub mode: u32,
    pub object_type: ObjectType,
    pub oid: ObjectId,
    pub name: String,
}

impl DatabaseEntry {
    pub fn blob(oid: ObjectId, name: String) -> Self {
        Self::new(REGULAR_FILE_MODE, ObjectType::Blob, oid, name)
    }

    pub fn is_blob(&self) -> bool {
        self.object_type == ObjectType::Blob
    }

    /// Parse a single record as printed by `git ls-tree -z` (without the NUL)
    pub fn parse_ls_tree_record(record: &str) -> anyhow::Result<Self> {
        let (meta, name) = record
            .split_once('\t')
            .with_context(|| format!("Malformed tree record: {record:?}"))?;

        let mut fields = meta.split(' ');
        let (Some(mode), Some(object_type), Some(oid), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            anyhow::bail!("Malformed tree record header: {meta:?}");
        };

        Ok(Self {
            mode: u32::from_str_radix(mode, 8)
                .with_context(|| format!("Invalid tree entry mode {mode:?}"))?,
            object_type: ObjectType::try_from(object_type)?,
            oid: ObjectId::try_parse(oid.to_string())?,
            name: name.to_string(),
        })
    }

    /// Render the record in the form `git mktree -z` expects (without the NUL)
    pub fn to_mktree_record(&self) -> String {
        format!(
            "{:06o} {} {}\t{}",
            self.mode, self.object_type, self.oid, self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const OID: &str = "ce013625030ba8dba906f756967f9e9ca394464a";

    #[rstest]
    fn test_parse_blob_record() {
        let record = format!("100644 blob {OID}\tassets-logo-{OID}.cdc");
        let entry = DatabaseEntry::parse_ls_tree_record(&record).unwrap();

        pretty_assertions::assert_eq!(
            entry,
            DatabaseEntry::blob(
                ObjectId::try_parse(OID.to_string()).unwrap(),
                format!("assets-logo-{OID}.cdc")
            )
        );
        assert!(entry.is_blob());
    }

    #[rstest]
    fn test_record_round_trips_through_mktree_format() {
        let entry = DatabaseEntry::blob(
            ObjectId::try_parse(OID.to_string()).unwrap(),
            ".gitattributes".to_string(),
        );

        let parsed = DatabaseEntry::parse_ls_tree_record(&entry.to_mktree_record()).unwrap();
        pretty_assertions::assert_eq!(parsed, entry);
    }

    #[rstest]
    #[case::missing_tab("100644 blob ce013625030ba8dba906f756967f9e9ca394464a name")]
    #[case::missing_field("100644 ce013625030ba8dba906f756967f9e9ca394464a\tname")]
    #[case::bad_mode("10064x blob ce013625030ba8dba906f756967f9e9ca394464a\tname")]
    #[case::bad_type("100644 tag ce013625030ba8dba906f756967f9e9ca394464a\tname")]
    fn test_malformed_records_are_rejected(#[case] record: &str) {
        assert!(DatabaseEntry::parse_ls_tree_record(record).is_err());
    }
}
