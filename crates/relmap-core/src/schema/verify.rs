use super::{MappingId, Relationship, Schema, TableMapping};
use crate::{Error, Result};

use std::collections::HashSet;

/// Relationship aliases are one letter per declaration index.
const MAX_RELATIONSHIPS: usize = 26;

struct Verify<'a> {
    schema: &'a Schema,
}

impl Schema {
    pub(super) fn verify(&self) -> Result<()> {
        Verify { schema: self }.verify()
    }
}

impl Verify<'_> {
    fn verify(&self) -> Result<()> {
        for mapping in &self.schema.mappings {
            self.verify_primary_key(mapping)?;
            self.verify_auto_increment(mapping)?;
            self.verify_members(mapping)?;

            for relationship in &mapping.relationships {
                self.verify_relationship(mapping, relationship)?;
            }
        }

        Ok(())
    }

    fn verify_primary_key(&self, mapping: &TableMapping) -> Result<()> {
        if mapping.primary_key.is_empty() {
            return Err(Error::invalid_schema(format!(
                "table `{}` has no primary key",
                mapping.table
            )));
        }

        let mut seen = HashSet::new();
        for column in &mapping.primary_key {
            if !seen.insert(column) {
                return Err(Error::invalid_schema(format!(
                    "primary key column `{column}` of `{}` is listed twice",
                    mapping.table
                )));
            }
        }

        Ok(())
    }

    fn verify_auto_increment(&self, mapping: &TableMapping) -> Result<()> {
        let Some(column) = &mapping.auto_increment else {
            return Ok(());
        };

        if mapping.primary_key.len() != 1 || mapping.primary_key[0] != *column {
            return Err(Error::invalid_schema(format!(
                "auto-increment column `{column}` of `{}` must be its sole primary key column",
                mapping.table
            )));
        }

        Ok(())
    }

    fn verify_members(&self, mapping: &TableMapping) -> Result<()> {
        if mapping.relationships.len() > MAX_RELATIONSHIPS {
            return Err(Error::invalid_schema(format!(
                "table `{}` declares {} relationships; at most {MAX_RELATIONSHIPS} are supported",
                mapping.table,
                mapping.relationships.len()
            )));
        }

        let mut seen = HashSet::new();

        for relationship in &mapping.relationships {
            let member = relationship.member();

            if member.is_empty() || member.contains('.') {
                return Err(Error::invalid_schema(format!(
                    "invalid relationship member `{member}` on `{}`",
                    mapping.table
                )));
            }

            if mapping.has_column(member) {
                return Err(Error::invalid_schema(format!(
                    "relationship member `{member}` collides with a column of `{}`",
                    mapping.table
                )));
            }

            if !seen.insert(member) {
                return Err(Error::invalid_schema(format!(
                    "relationship member `{member}` is declared twice on `{}`",
                    mapping.table
                )));
            }
        }

        Ok(())
    }

    fn verify_relationship(&self, parent: &TableMapping, relationship: &Relationship) -> Result<()> {
        let child = self.target(parent, relationship)?;
        let member = relationship.member();

        match relationship {
            Relationship::OneToOne(_) | Relationship::OneToMany(_) => {
                let Some(fk) = relationship.child_foreign_key() else {
                    return Ok(());
                };

                self.verify_key_present(parent, member, fk.is_empty())?;

                for field in &fk.fields {
                    self.verify_column(child, &field.source, member)?;
                    self.verify_column(parent, &field.target, member)?;
                }

                for filter in relationship.filters() {
                    self.verify_column(child, &filter.column, member)?;
                }
            }
            Relationship::ManyToOne(rel) => {
                self.verify_key_present(parent, member, rel.foreign_key.is_empty())?;

                for field in &rel.foreign_key.fields {
                    self.verify_column(parent, &field.source, member)?;
                    self.verify_column(child, &field.target, member)?;
                }
            }
            Relationship::ManyToMany(rel) => {
                if rel.link.table.is_empty() {
                    return Err(Error::invalid_schema(format!(
                        "relationship `{member}` on `{}` names no link table",
                        parent.table
                    )));
                }

                self.verify_key_present(parent, member, rel.link.parent.is_empty())?;
                self.verify_key_present(parent, member, rel.link.child.is_empty())?;

                for field in &rel.link.parent.fields {
                    self.verify_column(parent, &field.target, member)?;
                }

                for field in &rel.link.child.fields {
                    self.verify_column(child, &field.target, member)?;
                }
            }
        }

        Ok(())
    }

    fn target(&self, parent: &TableMapping, relationship: &Relationship) -> Result<&TableMapping> {
        let MappingId(index) = relationship.target();

        self.schema.mappings.get(index).ok_or_else(|| {
            Error::invalid_schema(format!(
                "relationship `{}` on `{}` targets an unknown mapping",
                relationship.member(),
                parent.table
            ))
        })
    }

    fn verify_key_present(&self, parent: &TableMapping, member: &str, empty: bool) -> Result<()> {
        if empty {
            return Err(Error::invalid_schema(format!(
                "relationship `{member}` on `{}` has an empty key",
                parent.table
            )));
        }

        Ok(())
    }

    fn verify_column(&self, mapping: &TableMapping, column: &str, member: &str) -> Result<()> {
        if !mapping.has_column(column) {
            return Err(Error::invalid_schema(format!(
                "relationship `{member}` refers to unknown column `{}.{column}`",
                mapping.table
            )));
        }

        Ok(())
    }
}
