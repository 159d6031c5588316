//! Type-erased component columns.
//!
//! A [`Column`] stores every instance of one component type inside one
//! archetype. The concrete storage is a `Vec<T>` hidden behind the
//! [`ErasedColumn`] trait, so rows are moved, cloned and dropped with the
//! component's own move/clone/drop semantics rather than raw byte copies.

use std::any::Any;
use std::fmt;

use crate::component::{Component, ComponentId, ComponentMeta};

/// Object-safe operations on a column of one component type.
///
/// Implemented for `Vec<T>` for every [`Component`] `T`. Row indices passed
/// to these methods must be in bounds.
pub trait ErasedColumn: fmt::Debug + Send + Sync {
    /// Number of stored instances.
    fn len(&self) -> usize;

    /// Returns `true` if the column holds no instances.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the instance at `row`, moving the last instance into its place.
    fn swap_remove(&mut self, row: usize);

    /// Move the instance at `row` to the end of `dst` (which must hold the
    /// same component type), moving the last instance into `row`.
    fn move_row(&mut self, row: usize, dst: &mut dyn ErasedColumn);

    /// Append a clone of the instance at `row`.
    fn clone_row(&mut self, row: usize);

    /// Append a default-constructed instance.
    fn push_default(&mut self);

    /// Append a boxed instance. The box is handed back if it holds a
    /// different type.
    fn push_any(&mut self, value: Box<dyn Any>) -> Result<(), Box<dyn Any>>;

    /// Borrow the instance at `row` as [`Any`].
    fn get_any(&self, row: usize) -> Option<&dyn Any>;

    /// Mutably borrow the instance at `row` as [`Any`].
    fn get_any_mut(&mut self, row: usize) -> Option<&mut dyn Any>;

    /// Downcasting support.
    fn as_any(&self) -> &dyn Any;

    /// Downcasting support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedColumn for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn swap_remove(&mut self, row: usize) {
        Vec::swap_remove(self, row);
    }

    fn move_row(&mut self, row: usize, dst: &mut dyn ErasedColumn) {
        let value = Vec::swap_remove(self, row);
        match dst.as_any_mut().downcast_mut::<Vec<T>>() {
            Some(dst) => dst.push(value),
            None => panic!(
                "column type mismatch while moving a '{}' row",
                T::type_name()
            ),
        }
    }

    fn clone_row(&mut self, row: usize) {
        let value = self[row].clone();
        self.push(value);
    }

    fn push_default(&mut self) {
        self.push(T::default());
    }

    fn push_any(&mut self, value: Box<dyn Any>) -> Result<(), Box<dyn Any>> {
        self.push(*value.downcast::<T>()?);
        Ok(())
    }

    fn get_any(&self, row: usize) -> Option<&dyn Any> {
        self.get(row).map(|value| value as &dyn Any)
    }

    fn get_any_mut(&mut self, row: usize) -> Option<&mut dyn Any> {
        self.get_mut(row).map(|value| value as &mut dyn Any)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A column in an archetype table, storing components of a single type.
#[derive(Debug)]
pub struct Column {
    /// The component type stored in this column.
    pub type_id: ComponentId,
    /// Size of a single component instance in bytes.
    pub item_size: usize,
    meta: ComponentMeta,
    data: Box<dyn ErasedColumn>,
}

impl Column {
    /// Create a new empty column for the given component type.
    #[must_use]
    pub fn new(meta: ComponentMeta) -> Self {
        Self {
            type_id: meta.id,
            item_size: meta.size(),
            meta,
            data: (meta.new_column)(),
        }
    }

    /// The function table of the stored component type.
    #[must_use]
    pub fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    /// Returns the number of component instances stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if this column contains no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Push a typed component value into the column.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the component type stored in this column.
    pub fn push<T: Component>(&mut self, value: T) {
        match self.data.as_any_mut().downcast_mut::<Vec<T>>() {
            Some(values) => values.push(value),
            None => panic!(
                "cannot push '{}' into a '{}' column",
                T::type_name(),
                self.meta.name
            ),
        }
    }

    /// Push a default-constructed instance, e.g. as a slot to deserialise into.
    pub fn push_default(&mut self) {
        self.data.push_default();
    }

    /// Push a boxed component value without knowing its type.
    ///
    /// # Errors
    ///
    /// Hands the box back if it does not hold this column's type.
    pub fn push_any(&mut self, value: Box<dyn Any>) -> Result<(), Box<dyn Any>> {
        self.data.push_any(value)
    }

    /// Get a typed reference to the component at `row`.
    ///
    /// Returns `None` if `row` is out of bounds or `T` is not the stored type.
    #[must_use]
    pub fn get<T: Component>(&self, row: usize) -> Option<&T> {
        self.data.as_any().downcast_ref::<Vec<T>>()?.get(row)
    }

    /// Get a typed mutable reference to the component at `row`.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, row: usize) -> Option<&mut T> {
        self.data.as_any_mut().downcast_mut::<Vec<T>>()?.get_mut(row)
    }

    /// Borrow the component at `row` without knowing its type.
    #[must_use]
    pub fn get_any(&self, row: usize) -> Option<&dyn Any> {
        self.data.get_any(row)
    }

    /// Mutably borrow the component at `row` without knowing its type.
    #[must_use]
    pub fn get_any_mut(&mut self, row: usize) -> Option<&mut dyn Any> {
        self.data.get_any_mut(row)
    }

    /// Drop the component at `row` (swap-with-last).
    pub fn swap_remove(&mut self, row: usize) {
        self.data.swap_remove(row);
    }

    /// Move the component at `row` to the end of `dst` (swap-with-last).
    ///
    /// # Panics
    ///
    /// Panics if `dst` stores a different component type.
    pub fn move_row_into(&mut self, row: usize, dst: &mut Column) {
        assert_eq!(
            self.type_id, dst.type_id,
            "column type mismatch: '{}' into '{}'",
            self.meta.name, dst.meta.name
        );
        self.data.move_row(row, dst.data.as_mut());
    }

    /// Append a clone of the component at `row`.
    pub fn clone_row(&mut self, row: usize) {
        self.data.clone_row(row);
    }
}
