use super::{Direction, FieldRef};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBy {
    pub field: FieldRef,
    pub direction: Direction,
}
