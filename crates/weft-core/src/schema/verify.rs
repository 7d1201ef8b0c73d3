use super::{Field, FieldTy, Model, OnDelete, Schema};
use crate::{stmt::Type, Error, Result};

struct Verify<'a> {
    schema: &'a Schema,
}

pub(super) fn verify(schema: &Schema) -> Result<()> {
    Verify { schema }.verify()
}

impl Verify<'_> {
    fn verify(&self) -> Result<()> {
        for model in self.schema.models() {
            self.verify_primary_key(model)?;

            for field in model.relations() {
                self.verify_relation(model, field)?;
            }
        }

        Ok(())
    }

    fn verify_primary_key(&self, model: &Model) -> Result<()> {
        let pk = model.primary_key_field();

        if pk.primitive_ty().is_none() {
            return Err(Error::invalid_schema(format!(
                "primary key `{}.{}` must be a primitive field",
                model.name, pk.name
            )));
        }

        Ok(())
    }

    fn verify_relation(&self, model: &Model, field: &Field) -> Result<()> {
        let display = format!("{}.{}", model.name, field.name);
        let Some(fk) = field.foreign_key() else {
            return Ok(());
        };

        let source = self.schema.field(fk.source);
        let target = self.schema.field(fk.target);

        let (Some(source_ty), Some(target_ty)) = (source.primitive_ty(), target.primitive_ty())
        else {
            return Err(Error::invalid_schema(format!(
                "association `{display}` uses a non-primitive foreign key"
            )));
        };

        if source_ty != target_ty {
            return Err(Error::invalid_schema(format!(
                "association `{display}`: foreign key `{}` is {} but references {}",
                self.schema.qualified_name(fk.source),
                source_ty.name(),
                target_ty.name(),
            )));
        }

        for identity in field.identity() {
            if self.schema.field(*identity).is_relation() {
                return Err(Error::invalid_schema(format!(
                    "association `{display}`: identity field `{}` is not primitive",
                    self.schema.qualified_name(*identity)
                )));
            }
        }

        if let Some(OnDelete::Nullify(columns)) = field.on_delete() {
            for column in columns {
                let column_field = self.schema.field(*column);

                if column_field.required || column_field.primary_key || column_field.is_relation()
                {
                    return Err(Error::invalid_schema(format!(
                        "association `{display}` nullifies `{}`, which cannot hold null",
                        self.schema.qualified_name(*column)
                    )));
                }
            }
        }

        if let FieldTy::HasMany(has_many) = &field.ty {
            if let Some(position) = has_many.position {
                if self.schema.field(position).primitive_ty() != Some(Type::I64) {
                    return Err(Error::invalid_schema(format!(
                        "association `{display}`: position field `{}` must be i64",
                        self.schema.qualified_name(position)
                    )));
                }
            }
        }

        Ok(())
    }
}
