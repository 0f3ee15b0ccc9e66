//! # Repository Module
//!
//! Database repository implementations for the item ledger and block store.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Access Paths                              │
//! │                                                                         │
//! │  Pool-level (pub, one statement each)                                  │
//! │       db.items().create(&new_item)                                     │
//! │       db.items().get_by_id(id)                                         │
//! │       db.blocks().list_for_item(item_id)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqlitePool ──► any free connection                                    │
//! │                                                                         │
//! │  Transaction-scoped (pub(crate), engine only)                          │
//! │       ItemRepository::get_for_update(&mut *tx, id)                     │
//! │       ItemRepository::set_quantity(&mut *tx, id, n, now)               │
//! │       BlockRepository::insert / get_for_update / set_permanent         │
//! │       BlockRepository::select_expired_for_update / delete_many         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  &mut SqliteConnection owned by one open transaction                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantity and block-state writes only happen through the transaction-scoped
//! functions, so the only way to change stock is through the engine.
//!
//! ## Row Locks on SQLite
//!
//! SQLite has no `SELECT ... FOR UPDATE`. The `*_for_update` functions read
//! with a no-op `UPDATE ... RETURNING` instead: the first write in a
//! transaction takes the database write lock, which is held until commit or
//! rollback, and the returned row is read under that lock.
//!
//! ## Available Repositories
//!
//! - [`ItemRepository`] - Item ledger
//! - [`BlockRepository`] - Block store

pub mod block;
pub mod item;

pub use block::BlockRepository;
pub use item::ItemRepository;
