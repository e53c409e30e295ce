//! Cart service: add, update, remove, and view operations.
//!
//! Every mutation is a read-modify-write over the cart's JSONB document,
//! protected by the version column: if another request wrote the cart
//! between our read and our write, the save conflicts and the whole
//! mutation is retried against the fresh document.

use sqlx::PgPool;

use minimart_core::{Email, ProductId};

use crate::db::RepositoryError;
use crate::db::carts::CartRepository;
use crate::models::cart::{Cart, CartItem};

/// Bounded retries for optimistic-concurrency conflicts.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Errors from cart operations.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// The referenced product is not in the cart.
    #[error("item not found in cart")]
    ItemNotFound,

    /// Quantity must be positive when adding.
    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    /// Underlying repository error (including exhausted OCC retries).
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cart service.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
        }
    }

    /// Fetch the user's cart. A user with no cart row gets an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the read fails.
    pub async fn view(&self, email: &Email) -> Result<Cart, CartError> {
        let items = self
            .carts
            .get(email)
            .await?
            .map(|record| record.items)
            .unwrap_or_default();

        Ok(Cart {
            user_email: email.clone(),
            items,
        })
    }

    /// Add `quantity` of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero quantity.
    /// Returns `CartError::Repository` if the write fails.
    pub async fn add(
        &self,
        email: &Email,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        self.mutate(email, |items| {
            merge_add(items, product_id, quantity);
            Ok(())
        })
        .await
    }

    /// Set a line's quantity; zero removes the line entirely.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the product isn't in the cart.
    /// Returns `CartError::Repository` if the write fails.
    pub async fn update(
        &self,
        email: &Email,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        self.mutate(email, |items| apply_quantity(items, product_id, quantity))
            .await
    }

    /// Remove one product line from the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the product isn't in the cart.
    /// Returns `CartError::Repository` if the write fails.
    pub async fn remove(&self, email: &Email, product_id: ProductId) -> Result<Cart, CartError> {
        self.mutate(email, |items| remove_line(items, product_id)).await
    }

    /// Empty the user's cart in one call.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the write fails.
    pub async fn clear(&self, email: &Email) -> Result<Cart, CartError> {
        self.carts.clear(email).await?;
        Ok(Cart::empty(email.clone()))
    }

    /// Run one read-modify-write cycle with OCC retries.
    async fn mutate<F>(&self, email: &Email, mut apply: F) -> Result<Cart, CartError>
    where
        F: FnMut(&mut Vec<CartItem>) -> Result<(), CartError>,
    {
        let mut last_conflict = None;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let record = self.carts.get(email).await?;
            let (mut items, version) = match record {
                Some(r) => (r.items, Some(r.version)),
                None => (Vec::new(), None),
            };

            apply(&mut items)?;

            match self.carts.save(email, &items, version).await {
                Ok(()) => {
                    return Ok(Cart {
                        user_email: email.clone(),
                        items,
                    });
                }
                Err(RepositoryError::Conflict(msg)) => {
                    tracing::debug!(user = %email, "cart write conflict, retrying");
                    last_conflict = Some(RepositoryError::Conflict(msg));
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(CartError::Repository(last_conflict.unwrap_or_else(|| {
            RepositoryError::Conflict("cart write conflict".to_owned())
        })))
    }
}

/// Merge-add a line: bump the quantity if the product is already present,
/// append a new line otherwise.
fn merge_add(items: &mut Vec<CartItem>, product_id: ProductId, quantity: u32) {
    if let Some(line) = items.iter_mut().find(|l| l.product_id == product_id) {
        line.quantity = line.quantity.saturating_add(quantity);
    } else {
        items.push(CartItem {
            product_id,
            quantity,
        });
    }
}

/// Overwrite a line's quantity; zero removes the line instead of storing a
/// zero quantity.
fn apply_quantity(
    items: &mut Vec<CartItem>,
    product_id: ProductId,
    quantity: u32,
) -> Result<(), CartError> {
    if quantity == 0 {
        return remove_line(items, product_id);
    }

    let line = items
        .iter_mut()
        .find(|l| l.product_id == product_id)
        .ok_or(CartError::ItemNotFound)?;
    line.quantity = quantity;
    Ok(())
}

/// Drop a line from the cart.
fn remove_line(items: &mut Vec<CartItem>, product_id: ProductId) -> Result<(), CartError> {
    let before = items.len();
    items.retain(|l| l.product_id != product_id);
    if items.len() == before {
        return Err(CartError::ItemNotFound);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product_id: ProductId, quantity: u32) -> CartItem {
        CartItem {
            product_id,
            quantity,
        }
    }

    #[test]
    fn test_merge_add_new_line() {
        let mut items = Vec::new();
        let p = ProductId::generate();

        merge_add(&mut items, p, 2);
        assert_eq!(items, vec![line(p, 2)]);
    }

    #[test]
    fn test_merge_add_existing_line_increments() {
        let p = ProductId::generate();
        let mut items = vec![line(p, 2)];

        merge_add(&mut items, p, 3);
        assert_eq!(items, vec![line(p, 5)]);
    }

    #[test]
    fn test_apply_quantity_overwrites() {
        let p = ProductId::generate();
        let mut items = vec![line(p, 2)];

        apply_quantity(&mut items, p, 7).unwrap();
        assert_eq!(items, vec![line(p, 7)]);
    }

    #[test]
    fn test_apply_quantity_zero_removes_line() {
        let p = ProductId::generate();
        let other = ProductId::generate();
        let mut items = vec![line(p, 2), line(other, 1)];

        apply_quantity(&mut items, p, 0).unwrap();
        assert_eq!(items, vec![line(other, 1)]);
    }

    #[test]
    fn test_apply_quantity_missing_line() {
        let mut items = vec![line(ProductId::generate(), 2)];
        let err = apply_quantity(&mut items, ProductId::generate(), 1).unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound));
    }

    #[test]
    fn test_remove_line_missing() {
        let mut items: Vec<CartItem> = Vec::new();
        let err = remove_line(&mut items, ProductId::generate()).unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound));
    }

    #[test]
    fn test_zero_quantity_never_stored() {
        // The invariant: no path stores a zero-quantity line.
        let p = ProductId::generate();
        let mut items = vec![line(p, 4)];

        apply_quantity(&mut items, p, 0).unwrap();
        assert!(items.iter().all(|l| l.quantity > 0));
        assert!(items.is_empty());
    }
}
