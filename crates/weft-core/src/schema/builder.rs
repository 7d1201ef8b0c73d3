use super::{
    verify, Auto, BelongsTo, Field, FieldId, FieldPrimitive, FieldTy, ForeignKey, HasMany, HasOne,
    Model, ModelId, OnDelete, Schema,
};
use crate::{stmt::Type, Error, Result};

use indexmap::IndexMap;

/// Declarative schema builder.
///
/// Models and associations are declared by name; `build` resolves the names
/// to ids and verifies the result.
#[derive(Debug, Default)]
pub struct Builder {
    models: Vec<ModelDef>,
}

/// Declaration of a single model.
#[derive(Debug, Clone)]
pub struct ModelDef {
    name: String,
    members: Vec<Member>,
}

#[derive(Debug, Clone)]
enum Member {
    Field(FieldDef),
    Relation(RelationDef),
}

#[derive(Debug, Clone)]
struct FieldDef {
    name: String,
    ty: Type,
    required: bool,
    primary_key: bool,
    auto: Option<Auto>,
}

/// Declaration of an association.
#[derive(Debug, Clone)]
pub struct RelationDef {
    name: String,
    kind: RelationKind,
    target: String,
    foreign_key: String,
    references: Option<String>,
    policy: Option<PolicyDef>,
    identity: Option<Vec<String>>,
    delete_missing: bool,
    position: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationKind {
    BelongsTo,
    HasMany,
    HasOne,
}

#[derive(Debug, Clone)]
enum PolicyDef {
    None,
    Cascade,
    Nullify(Option<Vec<String>>),
    Restrict,
}

impl Builder {
    pub fn model(mut self, model: ModelDef) -> Self {
        self.models.push(model);
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut ids = IndexMap::new();

        for (index, def) in self.models.iter().enumerate() {
            if ids.insert(def.name.clone(), ModelId(index)).is_some() {
                return Err(Error::invalid_schema(format!(
                    "duplicate model `{}`",
                    def.name
                )));
            }
        }

        // First pass: lay out fields so every name resolves to a FieldId
        // before any association is wired up.
        let mut models = IndexMap::new();

        for (index, def) in self.models.iter().enumerate() {
            let model = def.layout(ModelId(index))?;
            models.insert(model.id, model);
        }

        let mut schema = Schema { models };

        for (index, def) in self.models.iter().enumerate() {
            let id = ModelId(index);

            for (member_index, member) in def.members.iter().enumerate() {
                let Member::Relation(relation) = member else {
                    continue;
                };

                let ty = relation.resolve(&schema, &ids, id.field(member_index))?;
                schema.models[&id].fields[member_index].ty = ty;
            }
        }

        link_pairs(&mut schema);
        verify::verify(&schema)?;
        warn_implicit_policies(&schema, &self.models);

        Ok(schema)
    }
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: vec![],
        }
    }

    /// Declares the primary key. `I64` keys auto-increment and `Uuid` keys
    /// are generated by the storage adapter.
    pub fn key(self, name: impl Into<String>, ty: Type) -> Self {
        let auto = match ty {
            Type::I64 => Some(Auto::Increment),
            Type::Uuid => Some(Auto::Uuid),
            _ => None,
        };
        self.key_with(name, ty, auto)
    }

    /// Declares the primary key with an explicit population strategy.
    pub fn key_with(mut self, name: impl Into<String>, ty: Type, auto: Option<Auto>) -> Self {
        self.members.push(Member::Field(FieldDef {
            name: name.into(),
            ty,
            required: auto.is_none(),
            primary_key: true,
            auto,
        }));
        self
    }

    /// Declares an optional field.
    pub fn field(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.members.push(Member::Field(FieldDef {
            name: name.into(),
            ty,
            required: false,
            primary_key: false,
            auto: None,
        }));
        self
    }

    /// Declares a field that must hold a value for the entity to be valid.
    pub fn required(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.members.push(Member::Field(FieldDef {
            name: name.into(),
            ty,
            required: true,
            primary_key: false,
            auto: None,
        }));
        self
    }

    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.members.push(Member::Relation(relation));
        self
    }

    fn layout(&self, id: ModelId) -> Result<Model> {
        let mut fields: Vec<Field> = Vec::with_capacity(self.members.len());
        let mut primary_key = None;

        for (index, member) in self.members.iter().enumerate() {
            let name = match member {
                Member::Field(field) => &field.name,
                Member::Relation(relation) => &relation.name,
            };

            if fields.iter().any(|field| field.name == *name) {
                return Err(Error::invalid_schema(format!(
                    "duplicate field `{}.{}`",
                    self.name, name
                )));
            }

            let field_id = id.field(index);

            let field = match member {
                Member::Field(def) => {
                    if def.primary_key {
                        if primary_key.is_some() {
                            return Err(Error::invalid_schema(format!(
                                "model `{}` declares more than one primary key",
                                self.name
                            )));
                        }
                        primary_key = Some(field_id);
                    }

                    Field {
                        id: field_id,
                        name: def.name.clone(),
                        ty: FieldTy::Primitive(FieldPrimitive { ty: def.ty }),
                        required: def.required,
                        primary_key: def.primary_key,
                        auto: def.auto,
                    }
                }
                // Placeholder until associations are resolved
                Member::Relation(def) => Field {
                    id: field_id,
                    name: def.name.clone(),
                    ty: FieldTy::Primitive(FieldPrimitive { ty: Type::Bool }),
                    required: false,
                    primary_key: false,
                    auto: None,
                },
            };

            fields.push(field);
        }

        let Some(primary_key) = primary_key else {
            return Err(Error::invalid_schema(format!(
                "model `{}` has no primary key",
                self.name
            )));
        };

        Ok(Model {
            id,
            name: self.name.clone(),
            fields,
            primary_key,
        })
    }
}

impl RelationDef {
    /// `name` holds one `target`, referenced through `foreign_key` on the
    /// declaring model.
    pub fn belongs_to(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::BelongsTo, name, target, foreign_key)
    }

    /// `name` holds many `target` records whose `foreign_key` references the
    /// declaring model.
    pub fn has_many(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::HasMany, name, target, foreign_key)
    }

    /// `name` holds at most one `target` record whose `foreign_key`
    /// references the declaring model.
    pub fn has_one(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::HasOne, name, target, foreign_key)
    }

    fn new(
        kind: RelationKind,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            foreign_key: foreign_key.into(),
            references: None,
            policy: None,
            identity: None,
            delete_missing: false,
            position: None,
        }
    }

    /// The key the foreign key references. Defaults to the referenced
    /// model's primary key.
    pub fn references(mut self, field: impl Into<String>) -> Self {
        self.references = Some(field.into());
        self
    }

    /// Explicitly leave dependents alone on delete.
    pub fn no_action(mut self) -> Self {
        self.policy = Some(PolicyDef::None);
        self
    }

    pub fn cascade(mut self) -> Self {
        self.policy = Some(PolicyDef::Cascade);
        self
    }

    pub fn restrict(mut self) -> Self {
        self.policy = Some(PolicyDef::Restrict);
        self
    }

    /// Clear the foreign key on dependents when the parent is deleted.
    pub fn nullify(mut self) -> Self {
        self.policy = Some(PolicyDef::Nullify(None));
        self
    }

    /// Clear the listed columns on dependents when the parent is deleted.
    pub fn nullify_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy = Some(PolicyDef::Nullify(Some(
            columns.into_iter().map(Into::into).collect(),
        )));
        self
    }

    /// Fields on the target used to match nested input with persisted
    /// children. Defaults to the target's primary key.
    pub fn identity<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identity = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn delete_missing(mut self, delete_missing: bool) -> Self {
        self.delete_missing = delete_missing;
        self
    }

    /// Field on the target that records a child's position when attached.
    pub fn position(mut self, field: impl Into<String>) -> Self {
        self.position = Some(field.into());
        self
    }

    fn resolve(
        &self,
        schema: &Schema,
        ids: &IndexMap<String, ModelId>,
        id: FieldId,
    ) -> Result<FieldTy> {
        let model = schema.model(id.model);
        let display = format!("{}.{}", model.name, self.name);

        let Some(&target) = ids.get(&self.target) else {
            return Err(Error::invalid_schema(format!(
                "association `{display}` targets unknown model `{}`",
                self.target
            )));
        };
        let target_model = schema.model(target);

        let lookup = |model: &Model, name: &str| -> Result<FieldId> {
            model
                .field_by_name(name)
                .map(|field| field.id)
                .ok_or_else(|| {
                    Error::invalid_schema(format!(
                        "association `{display}` references unknown field `{}.{}`",
                        model.name, name
                    ))
                })
        };

        let identity = match &self.identity {
            Some(names) => names
                .iter()
                .map(|name| lookup(target_model, name))
                .collect::<Result<Vec<_>>>()?,
            None => vec![target_model.primary_key],
        };

        if self.kind == RelationKind::BelongsTo {
            if self.policy.is_some() || self.delete_missing || self.position.is_some() {
                return Err(Error::invalid_schema(format!(
                    "association `{display}` is belongs_to; delete policies, delete_missing and position belong on the other side"
                )));
            }

            let foreign_key = ForeignKey {
                source: lookup(model, &self.foreign_key)?,
                target: match &self.references {
                    Some(name) => lookup(target_model, name)?,
                    None => target_model.primary_key,
                },
            };

            return Ok(FieldTy::BelongsTo(BelongsTo {
                target,
                pair: None,
                foreign_key,
                identity,
            }));
        }

        let foreign_key = ForeignKey {
            source: lookup(target_model, &self.foreign_key)?,
            target: match &self.references {
                Some(name) => lookup(model, name)?,
                None => model.primary_key,
            },
        };

        let on_delete = match &self.policy {
            None | Some(PolicyDef::None) => OnDelete::None,
            Some(PolicyDef::Cascade) => OnDelete::Cascade,
            Some(PolicyDef::Restrict) => OnDelete::Restrict,
            Some(PolicyDef::Nullify(None)) => OnDelete::Nullify(vec![foreign_key.source]),
            Some(PolicyDef::Nullify(Some(columns))) => OnDelete::Nullify(
                columns
                    .iter()
                    .map(|name| lookup(target_model, name))
                    .collect::<Result<_>>()?,
            ),
        };

        if self.kind == RelationKind::HasOne {
            if self.position.is_some() {
                return Err(Error::invalid_schema(format!(
                    "association `{display}` is has_one and cannot declare a position"
                )));
            }

            return Ok(FieldTy::HasOne(HasOne {
                target,
                pair: None,
                foreign_key,
                on_delete,
                identity,
                delete_missing: self.delete_missing,
            }));
        }

        let position = self
            .position
            .as_ref()
            .map(|name| lookup(target_model, name))
            .transpose()?;

        Ok(FieldTy::HasMany(HasMany {
            target,
            pair: None,
            foreign_key,
            on_delete,
            identity,
            delete_missing: self.delete_missing,
            position,
        }))
    }
}

/// Pairs `has_many`/`has_one` associations with the `belongs_to` on the
/// target that uses the same foreign key.
fn link_pairs(schema: &mut Schema) {
    let mut links = vec![];

    for model in schema.models.values() {
        for field in model.dependents() {
            let Some(fk) = field.foreign_key() else {
                continue;
            };
            let target = schema.model(fk.source.model);

            if let Some(pair) = target.fields.iter().find(|candidate| {
                candidate
                    .as_belongs_to()
                    .is_some_and(|belongs_to| belongs_to.foreign_key == *fk)
            }) {
                links.push((field.id, pair.id));
            }
        }
    }

    for (has, belongs) in links {
        match &mut schema.models[&has.model].fields[has.index].ty {
            FieldTy::HasMany(has_many) => has_many.pair = Some(belongs),
            FieldTy::HasOne(has_one) => has_one.pair = Some(belongs),
            _ => {}
        }

        if let FieldTy::BelongsTo(belongs_to) =
            &mut schema.models[&belongs.model].fields[belongs.index].ty
        {
            belongs_to.pair = Some(has);
        }
    }
}

fn warn_implicit_policies(schema: &Schema, defs: &[ModelDef]) {
    for (index, def) in defs.iter().enumerate() {
        for member in &def.members {
            let Member::Relation(relation) = member else {
                continue;
            };

            if relation.kind != RelationKind::BelongsTo && relation.policy.is_none() {
                tracing::warn!(
                    association = %format!("{}.{}", schema.model(ModelId(index)).name, relation.name),
                    "no on_delete policy declared; deleting a parent will leave dangling children"
                );
            }
        }
    }
}
