//! Item repository.
//!
//! Items need no query methods beyond the generic ones; the alias only pins
//! the entity type.

use crate::model::item::Item;
use crate::repo::crud::SqliteRepository;

pub type SqliteItemRepository<'conn> = SqliteRepository<'conn, Item>;
