//! One-to-one relations with per-instance resolution caches.
//!
//! A [`OneToOne<O, R>`] declares that the owner model `O` holds a unique key
//! to the related model `R`. It hands out two accessors:
//!
//! - [`forward`](OneToOne::forward): from an `O` to its `R` (`human.dog`).
//! - [`reverse`](OneToOne::reverse): from an `R` back to the `O` pointing at
//!   it (`dog.human`).
//!
//! Each accessor resolves through the instance's [`RelationCache`]:
//!
//! | State | Event | Next state | Effect |
//! |---|---|---|---|
//! | unresolved | lookup succeeds | present | cache row, return it |
//! | unresolved | lookup misses | absent | cache miss (per [`OneToOneKind`]) |
//! | present | access | present | return cached row |
//! | absent | access | absent | `None`, or re-raise `DoesNotExist` |
//! | any | relation set from either side | present / unresolved | miss cleared |
//!
//! Caches live on the in-memory instance and are never persisted. Accessors
//! take the instance by `&mut`, so a cache has a single owner at any time.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use fields_of_gold_core::{FogError, FogResult, ValidationError};

use crate::executor::{fetch_one_by, get_model, DbExecutor};
use crate::fields::{Deconstructed, FieldDef, FieldType, OnDelete, OneToOneKind};
use crate::model::Model;
use crate::value::Value;

/// What an accessor remembers about a resolution.
pub enum CachedRelation {
    /// The related instance.
    Present(Box<dyn Any + Send + Sync>),
    /// The lookup found nothing; holds the `DoesNotExist` message.
    Missing(String),
}

/// Per-instance resolution state, keyed by accessor.
///
/// Cloning yields an empty cache: a cloned instance resolves its relations
/// again.
#[derive(Default)]
pub struct RelationCache {
    entries: HashMap<String, CachedRelation>,
}

impl RelationCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached instance for `key`, if one of type `T` is cached.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        match self.entries.get(key) {
            Some(CachedRelation::Present(value)) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Returns the remembered miss for `key`.
    pub fn miss(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(CachedRelation::Missing(msg)) => Some(msg),
            _ => None,
        }
    }

    /// Returns `true` if `key` is resolved either way.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Caches a related instance, replacing any miss.
    pub fn store<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.entries
            .insert(key.into(), CachedRelation::Present(Box::new(value)));
    }

    /// Remembers a miss.
    pub fn store_miss(&mut self, key: impl Into<String>, msg: impl Into<String>) {
        self.entries
            .insert(key.into(), CachedRelation::Missing(msg.into()));
    }

    /// Forgets `key`, returning it to unresolved.
    pub fn clear(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Number of resolved accessors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is resolved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Clone for RelationCache {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for RelationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort_unstable();
        f.debug_struct("RelationCache").field("resolved", &keys).finish()
    }
}

/// A model whose instances carry a [`RelationCache`].
pub trait CachesRelations: Model + Clone {
    /// The instance's cache.
    fn relation_cache(&self) -> &RelationCache;

    /// The instance's cache, mutably.
    fn relation_cache_mut(&mut self) -> &mut RelationCache;
}

/// Declaration of a one-to-one relation from `O` to `R`.
///
/// The key column lives on `O`. `get_fk` and `set_fk` read and write it on
/// an instance.
pub struct OneToOne<O, R> {
    name: &'static str,
    column: String,
    related_name: Option<&'static str>,
    kind: OneToOneKind,
    on_delete: OnDelete,
    blank: bool,
    get_fk: fn(&O) -> Value,
    set_fk: fn(&mut O, Value),
    _models: PhantomData<fn() -> (O, R)>,
}

impl<O, R> OneToOne<O, R>
where
    O: CachesRelations,
    R: CachesRelations,
{
    /// Declares the relation stored in attribute `name` (column `<name>_id`).
    pub fn new(name: &'static str, get_fk: fn(&O) -> Value, set_fk: fn(&mut O, Value)) -> Self {
        Self {
            name,
            column: format!("{name}_id"),
            related_name: None,
            kind: OneToOneKind::Standard,
            on_delete: OnDelete::Cascade,
            blank: false,
            get_fk,
            set_fk,
            _models: PhantomData,
        }
    }

    /// Sets how misses are treated.
    ///
    /// [`OneToOneKind::Nullable`] also makes the column nullable and blank.
    #[must_use]
    pub const fn kind(mut self, kind: OneToOneKind) -> Self {
        self.kind = kind;
        if matches!(kind, OneToOneKind::Nullable) {
            self.blank = true;
        }
        self
    }

    /// Sets the reverse accessor name. Defaults to the owner's model name.
    #[must_use]
    pub const fn related_name(mut self, related_name: &'static str) -> Self {
        self.related_name = Some(related_name);
        self
    }

    /// Sets the `ON DELETE` action.
    #[must_use]
    pub const fn on_delete(mut self, on_delete: OnDelete) -> Self {
        self.on_delete = on_delete;
        self
    }

    /// Sets whether the relation may be left empty in validation.
    #[must_use]
    pub const fn blank(mut self, blank: bool) -> Self {
        self.blank = blank;
        self
    }

    /// Sets the key column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// The forward attribute name on `O`.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The key column on `O`'s table.
    pub fn column_name(&self) -> &str {
        &self.column
    }

    /// The reverse attribute name on `R`.
    pub fn reverse_name(&self) -> &'static str {
        self.related_name.unwrap_or(O::meta().model_name)
    }

    /// The miss behaviour.
    pub const fn relation_kind(&self) -> OneToOneKind {
        self.kind
    }

    const fn nullable(&self) -> bool {
        matches!(self.kind, OneToOneKind::Nullable)
    }

    /// The field definition for `O`'s metadata. The column is always unique.
    pub fn field_def(&self) -> FieldDef {
        let mut def = FieldDef::new(
            self.name,
            FieldType::OneToOneField {
                to: R::meta().label(),
                on_delete: self.on_delete,
                related_name: self.related_name.map(ToString::to_string),
                kind: self.kind,
            },
        )
        .column(self.column.clone())
        .unique();
        def.null = self.nullable();
        def.blank = self.blank;
        def
    }

    /// Returns the configuration for schema tooling.
    ///
    /// `unique` is implied by every one-to-one relation and `null` by the
    /// nullable kind, so neither is recorded.
    pub fn deconstruct(&self) -> Deconstructed {
        let mut d = self.field_def().deconstruct();
        d.kwargs.remove("unique");
        if self.nullable() {
            d.kwargs.remove("null");
        }
        d
    }

    /// The accessor from an `O` to its `R`.
    pub const fn forward(&self) -> ForwardOneToOne<'_, O, R> {
        ForwardOneToOne { field: self }
    }

    /// The accessor from an `R` to the `O` that points at it.
    pub const fn reverse(&self) -> ReverseOneToOne<'_, O, R> {
        ReverseOneToOne { field: self }
    }

    fn forward_key(&self) -> String {
        format!("{}:{}", O::meta().label(), self.name)
    }

    fn reverse_key(&self) -> String {
        format!("{}:{}:reverse", O::meta().label(), self.name)
    }

    fn reverse_miss_message(&self) -> String {
        format!("{} has no {}.", R::meta().model_name, self.reverse_name())
    }

    fn forward_miss_message(&self) -> String {
        format!("{} has no {}.", O::meta().model_name, self.name)
    }
}

impl<O, R> fmt::Debug for OneToOne<O, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneToOne")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Resolves `owner.<name>`.
pub struct ForwardOneToOne<'a, O, R> {
    field: &'a OneToOne<O, R>,
}

impl<O, R> ForwardOneToOne<'_, O, R>
where
    O: CachesRelations,
    R: CachesRelations,
{
    /// Returns the related instance.
    ///
    /// A null key yields `None` when the relation is nullable. A key that
    /// points at no row yields `None` (remembered) for the nullable kind and
    /// `DoesNotExist` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `DoesNotExist` as above, or any lookup error.
    pub async fn get(&self, owner: &mut O, db: &dyn DbExecutor) -> FogResult<Option<R>> {
        let field = self.field;
        let key = field.forward_key();
        if let Some(hit) = resolve_cached::<R>(owner.relation_cache(), &key, field.kind)? {
            return Ok(hit);
        }

        let fk = (field.get_fk)(owner);
        if fk.is_null() {
            if field.nullable() {
                return Ok(None);
            }
            return Err(FogError::DoesNotExist(field.forward_miss_message()));
        }

        match get_model::<R>(db, fk).await {
            Ok(related) => {
                owner.relation_cache_mut().store(key, related.clone());
                Ok(Some(related))
            }
            Err(FogError::DoesNotExist(_)) if field.nullable() => {
                owner
                    .relation_cache_mut()
                    .store_miss(key, field.forward_miss_message());
                Ok(None)
            }
            Err(FogError::DoesNotExist(_)) => {
                Err(FogError::DoesNotExist(field.forward_miss_message()))
            }
            Err(e) => Err(e),
        }
    }

    /// Points `owner` at `related`, caching both directions.
    ///
    /// Any remembered miss on `related`'s reverse accessor is cleared. The
    /// change is in memory only until `owner` is saved.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if `related` is unsaved and a `ValidationError`
    /// when clearing a relation that is not nullable.
    pub fn set(&self, owner: &mut O, related: Option<&mut R>) -> FogResult<()> {
        let field = self.field;
        let Some(related) = related else {
            if !field.nullable() {
                return Err(ValidationError::new("This field cannot be null.", "null")
                    .with_prefix(field.name)
                    .into());
            }
            (field.set_fk)(owner, Value::Null);
            owner
                .relation_cache_mut()
                .store_miss(field.forward_key(), field.forward_miss_message());
            return Ok(());
        };
        let pk = related.pk().cloned().ok_or_else(|| {
            FogError::DatabaseError(format!(
                "Cannot assign an unsaved {} to {}",
                R::meta().model_name,
                field.name
            ))
        })?;
        (field.set_fk)(owner, pk);
        link(field, owner, related);
        Ok(())
    }
}

/// Resolves `related.<related_name>`.
pub struct ReverseOneToOne<'a, O, R> {
    field: &'a OneToOne<O, R>,
}

impl<O, R> ReverseOneToOne<'_, O, R>
where
    O: CachesRelations,
    R: CachesRelations,
{
    /// Returns the owner pointing at `related`.
    ///
    /// On a miss:
    ///
    /// - [`Standard`](OneToOneKind::Standard) raises `DoesNotExist` and looks
    ///   up again next time.
    /// - [`Smart`](OneToOneKind::Smart) raises `DoesNotExist` and re-raises it
    ///   on every later access without a lookup.
    /// - [`OneOrNone`](OneToOneKind::OneOrNone) and
    ///   [`Nullable`](OneToOneKind::Nullable) return `None`, remembered.
    ///
    /// An unsaved `related` misses without a lookup and without caching.
    ///
    /// # Errors
    ///
    /// Returns `DoesNotExist` as above, or any lookup error.
    pub async fn get(&self, related: &mut R, db: &dyn DbExecutor) -> FogResult<Option<O>> {
        let field = self.field;
        let key = field.reverse_key();
        if let Some(hit) = resolve_cached::<O>(related.relation_cache(), &key, field.kind)? {
            return Ok(hit);
        }

        let Some(pk) = related.pk().cloned() else {
            return miss_outcome(field.kind, field.reverse_miss_message());
        };

        match fetch_one_by::<O>(db, &field.column, &pk).await {
            Ok(owner) => {
                related.relation_cache_mut().store(key, owner.clone());
                Ok(Some(owner))
            }
            Err(FogError::DoesNotExist(_)) => {
                let msg = field.reverse_miss_message();
                if field.kind.caches_miss() {
                    tracing::debug!(accessor = %key, "remembering missing relation");
                    related.relation_cache_mut().store_miss(key, msg.clone());
                }
                miss_outcome(field.kind, msg)
            }
            Err(e) => Err(e),
        }
    }

    /// Points `owner` at `related`, caching both directions and clearing
    /// any remembered miss. `None` returns the accessor to unresolved.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if `related` is unsaved.
    pub fn set(&self, related: &mut R, owner: Option<&mut O>) -> FogResult<()> {
        let field = self.field;
        let Some(owner) = owner else {
            related.relation_cache_mut().clear(&field.reverse_key());
            return Ok(());
        };
        let pk = related.pk().cloned().ok_or_else(|| {
            FogError::DatabaseError(format!(
                "Cannot assign to {} of an unsaved {}",
                field.reverse_name(),
                R::meta().model_name
            ))
        })?;
        (field.set_fk)(owner, pk);
        link(field, owner, related);
        Ok(())
    }
}

fn link<O, R>(field: &OneToOne<O, R>, owner: &mut O, related: &mut R)
where
    O: CachesRelations,
    R: CachesRelations,
{
    related.relation_cache_mut().clear(&field.reverse_key());
    related
        .relation_cache_mut()
        .store(field.reverse_key(), owner.clone());
    owner
        .relation_cache_mut()
        .store(field.forward_key(), related.clone());
}

/// `Ok(Some(outcome))` on a cache hit, `Ok(None)` when unresolved.
fn resolve_cached<T: CachesRelations>(
    cache: &RelationCache,
    key: &str,
    kind: OneToOneKind,
) -> FogResult<Option<Option<T>>> {
    if let Some(value) = cache.get::<T>(key) {
        tracing::trace!(accessor = key, "relation cache hit");
        return Ok(Some(Some(value.clone())));
    }
    if let Some(msg) = cache.miss(key) {
        tracing::trace!(accessor = key, "relation cache hit (missing)");
        return miss_outcome(kind, msg.to_string()).map(Some);
    }
    Ok(None)
}

fn miss_outcome<T>(kind: OneToOneKind, msg: String) -> FogResult<Option<T>> {
    if kind.miss_is_none() {
        Ok(None)
    } else {
        Err(FogError::DoesNotExist(msg))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;
    use crate::model::{ModelMeta, Row};

    #[derive(Debug, Clone, Default)]
    struct Kennel {
        id: Value,
        relations: RelationCache,
    }

    #[derive(Debug, Clone, Default)]
    struct Keeper {
        id: Value,
        kennel_id: Value,
        relations: RelationCache,
    }

    impl Model for Kennel {
        fn meta() -> &'static ModelMeta {
            static META: LazyLock<ModelMeta> = LazyLock::new(|| {
                ModelMeta::new("zoo", "kennel").fields(vec![FieldDef::new(
                    "id",
                    FieldType::BigAutoField,
                )
                .primary_key()])
            });
            &META
        }
        fn pk(&self) -> Option<&Value> {
            (!self.id.is_null()).then_some(&self.id)
        }
        fn set_pk(&mut self, value: Value) {
            self.id = value;
        }
        fn field_values(&self) -> FogResult<Vec<(&'static str, Value)>> {
            Ok(vec![("id", self.id.clone())])
        }
        fn from_row(row: &Row) -> FogResult<Self> {
            Ok(Self {
                id: row.get("id")?,
                ..Self::default()
            })
        }
    }

    impl CachesRelations for Kennel {
        fn relation_cache(&self) -> &RelationCache {
            &self.relations
        }
        fn relation_cache_mut(&mut self) -> &mut RelationCache {
            &mut self.relations
        }
    }

    impl Model for Keeper {
        fn meta() -> &'static ModelMeta {
            static META: LazyLock<ModelMeta> =
                LazyLock::new(|| ModelMeta::new("zoo", "keeper"));
            &META
        }
        fn pk(&self) -> Option<&Value> {
            (!self.id.is_null()).then_some(&self.id)
        }
        fn set_pk(&mut self, value: Value) {
            self.id = value;
        }
        fn field_values(&self) -> FogResult<Vec<(&'static str, Value)>> {
            Ok(vec![("id", self.id.clone()), ("kennel_id", self.kennel_id.clone())])
        }
        fn from_row(row: &Row) -> FogResult<Self> {
            Ok(Self {
                id: row.get("id")?,
                kennel_id: row.get("kennel_id")?,
                ..Self::default()
            })
        }
    }

    impl CachesRelations for Keeper {
        fn relation_cache(&self) -> &RelationCache {
            &self.relations
        }
        fn relation_cache_mut(&mut self) -> &mut RelationCache {
            &mut self.relations
        }
    }

    fn relation(kind: OneToOneKind) -> OneToOne<Keeper, Kennel> {
        OneToOne::new("kennel", |k: &Keeper| k.kennel_id.clone(), |k: &mut Keeper, v| {
            k.kennel_id = v;
        })
        .kind(kind)
    }

    #[test]
    fn test_cache_states() {
        let mut cache = RelationCache::new();
        assert!(!cache.contains("a"));
        cache.store_miss("a", "gone");
        assert_eq!(cache.miss("a"), Some("gone"));
        assert!(cache.get::<Kennel>("a").is_none());

        cache.store("a", Kennel::default());
        assert!(cache.miss("a").is_none());
        assert!(cache.get::<Kennel>("a").is_some());
        assert!(cache.get::<Keeper>("a").is_none());

        assert_eq!(cache.clone().len(), 0);
        cache.clear("a");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_field_def_and_deconstruct() {
        let def = relation(OneToOneKind::Smart).field_def();
        assert_eq!(def.column, "kennel_id");
        assert!(def.unique);
        assert!(!def.null);

        let d = relation(OneToOneKind::Smart).deconstruct();
        assert_eq!(d.path, "fields_of_gold.fields.SmartOneToOneField");
        assert_eq!(d.string("to"), Some("zoo.kennel"));
        assert!(!d.kwargs.contains_key("unique"));
    }

    #[test]
    fn test_nullable_declaration() {
        let field = relation(OneToOneKind::Nullable);
        let def = field.field_def();
        assert!(def.null && def.unique && def.blank);

        let d = field.deconstruct();
        assert!(!d.kwargs.contains_key("null"));
        assert!(!d.kwargs.contains_key("unique"));
        assert!(d.flag("blank"));
        assert_eq!(d.path, "fields_of_gold.fields.NullableOneToOneField");
    }

    #[test]
    fn test_reverse_name_defaults_to_owner() {
        assert_eq!(relation(OneToOneKind::Standard).reverse_name(), "keeper");
        assert_eq!(
            relation(OneToOneKind::Standard)
                .related_name("warden")
                .reverse_name(),
            "warden"
        );
    }

    #[test]
    fn test_set_links_both_sides_and_clears_miss() {
        let field = relation(OneToOneKind::Smart);
        let mut kennel = Kennel {
            id: Value::Int(4),
            ..Kennel::default()
        };
        kennel
            .relations
            .store_miss(field.reverse_key(), "kennel has no keeper.");
        let mut keeper = Keeper::default();

        field.forward().set(&mut keeper, Some(&mut kennel)).unwrap();
        assert_eq!(keeper.kennel_id, Value::Int(4));
        assert!(kennel.relations.miss(&field.reverse_key()).is_none());
        assert!(kennel.relations.get::<Keeper>(&field.reverse_key()).is_some());
        assert!(keeper.relations.get::<Kennel>(&field.forward_key()).is_some());
    }

    #[test]
    fn test_set_rejects_unsaved_and_null() {
        let field = relation(OneToOneKind::Standard);
        let mut keeper = Keeper::default();
        let mut unsaved = Kennel::default();
        assert!(matches!(
            field.forward().set(&mut keeper, Some(&mut unsaved)),
            Err(FogError::DatabaseError(_))
        ));
        assert!(matches!(
            field.forward().set(&mut keeper, None),
            Err(FogError::ValidationError(_))
        ));
        assert!(relation(OneToOneKind::Nullable)
            .forward()
            .set(&mut keeper, None)
            .is_ok());
    }

    #[test]
    fn test_resolve_cached_outcomes() {
        let mut cache = RelationCache::new();
        assert!(resolve_cached::<Keeper>(&cache, "k", OneToOneKind::Smart)
            .unwrap()
            .is_none());

        cache.store_miss("k", "kennel has no keeper.");
        assert!(matches!(
            resolve_cached::<Keeper>(&cache, "k", OneToOneKind::Smart),
            Err(FogError::DoesNotExist(ref m)) if m == "kennel has no keeper."
        ));
        assert!(matches!(
            resolve_cached::<Keeper>(&cache, "k", OneToOneKind::OneOrNone),
            Ok(Some(None))
        ));
    }
}
