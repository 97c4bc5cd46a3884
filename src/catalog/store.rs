//! Product collection over the `products` table

use crate::catalog::models::{NewProduct, Pagination, Product};
use crate::db::Database;
use crate::error::StoreError;
use rusqlite::params;
use tracing::info;

#[derive(Clone)]
pub struct ProductStore {
    db: Database,
}

impl ProductStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// One page of products in insertion order. Past the end is an empty page.
    pub async fn list(&self, page: Pagination) -> Result<Vec<Product>, StoreError> {
        let limit = i64::try_from(page.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

        let conn = self.db.conn().lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, description, price FROM products
             ORDER BY id ASC LIMIT ?1 OFFSET ?2",
        )?;

        let products = stmt
            .query_map(params![limit, offset], |row| {
                Ok(Product {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    price: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(products)
    }

    pub async fn insert(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let conn = self.db.conn().lock().await;
        conn.execute(
            "INSERT INTO products (name, description, price) VALUES (?1, ?2, ?3)",
            params![product.name, product.description, product.price],
        )?;

        Ok(Product {
            id: conn.last_insert_rowid(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
        })
    }

    /// Insert all products atomically, preserving order.
    pub async fn insert_many(&self, products: &[NewProduct]) -> Result<usize, StoreError> {
        let mut conn = self.db.conn().lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO products (name, description, price) VALUES (?1, ?2, ?3)",
            )?;
            for product in products {
                stmt.execute(params![product.name, product.description, product.price])?;
            }
        }
        tx.commit()?;

        info!("Inserted {} products", products.len());
        Ok(products.len())
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let conn = self.db.conn().lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}
