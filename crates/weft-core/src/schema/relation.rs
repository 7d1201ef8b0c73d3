mod belongs_to;
pub use belongs_to::BelongsTo;

mod has_many;
pub use has_many::HasMany;

mod has_one;
pub use has_one::HasOne;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Which side of an association stores the foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwningSide {
    /// The declaring model stores the key (`belongs_to`).
    ThisHasFk,

    /// The target model stores the key (`has_many`, `has_one`).
    OtherHasFk,
}
