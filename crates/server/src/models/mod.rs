//! Domain models for the minimart backend.
//!
//! These types represent validated domain objects separate from database row
//! types. Anything that crosses the JSONB boundary (cart lines, order lines,
//! status history) derives both `Serialize` and `Deserialize`.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem};
pub use order::{Order, OrderItem, StatusEntry};
pub use product::{NewProduct, Product, ProductPatch};
pub use user::{User, UserPatch};
