use std::sync::{Arc, RwLock};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use common_http_errors::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use tracing::info;

const MAX_NAME_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,
    pub name: String,
    pub price: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewBook {
    pub name: String,
    pub price: i64,
}

#[derive(Debug, Serialize)]
pub struct BookCreated {
    pub success: bool,
    pub message: String,
    pub data: Book,
}

/// Shared in-memory catalogue.
#[derive(Debug, Clone, Default)]
pub struct BookStore {
    books: Arc<RwLock<Vec<Book>>>,
}

impl BookStore {
    pub fn seeded() -> Self {
        let books = [("Book One", 100), ("Book Two", 200), ("Book Three", 300)]
            .into_iter()
            .enumerate()
            .map(|(index, (name, price))| Book {
                id: index as u64 + 1,
                name: name.to_string(),
                price,
            })
            .collect();
        Self {
            books: Arc::new(RwLock::new(books)),
        }
    }

    pub fn list(&self) -> ApiResult<Vec<Book>> {
        let books = self.books.read().map_err(|err| ApiError::internal(err, None))?;
        Ok(books.clone())
    }

    pub fn get(&self, id: u64) -> ApiResult<Option<Book>> {
        let books = self.books.read().map_err(|err| ApiError::internal(err, None))?;
        Ok(books.iter().find(|book| book.id == id).cloned())
    }

    /// Append a book; ids are `len + 1` at insert time.
    pub fn insert(&self, new_book: NewBook) -> ApiResult<Book> {
        let mut books = self.books.write().map_err(|err| ApiError::internal(err, None))?;
        let book = Book {
            id: books.len() as u64 + 1,
            name: new_book.name,
            price: new_book.price,
        };
        books.push(book.clone());
        Ok(book)
    }
}

pub async fn list_books(State(store): State<BookStore>) -> ApiResult<Json<Vec<Book>>> {
    store.list().map(Json)
}

pub async fn get_book(
    State(store): State<BookStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<Book>> {
    let id = id.parse::<u64>().map_err(|err| ApiError::BadRequest {
        code: "invalid_book_id",
        trace_id: None,
        message: Some(err.to_string()),
    })?;

    store.get(id)?.map(Json).ok_or(ApiError::NotFound {
        code: "book_not_found",
        trace_id: None,
    })
}

pub async fn create_book(
    State(store): State<BookStore>,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> ApiResult<Json<BookCreated>> {
    let Json(new_book) = payload.map_err(|rejection| ApiError::BadRequest {
        code: "invalid_request",
        trace_id: None,
        message: Some(rejection.body_text()),
    })?;
    validate_new_book(&new_book)?;

    let book = store.insert(new_book)?;
    info!(book_id = book.id, name = %book.name, "Book created");

    Ok(Json(BookCreated {
        success: true,
        message: "Book created successfully".to_string(),
        data: book,
    }))
}

fn validate_new_book(book: &NewBook) -> ApiResult<()> {
    let name_len = book.name.trim().chars().count();
    if name_len == 0 || name_len > MAX_NAME_LEN {
        return Err(ApiError::BadRequest {
            code: "invalid_book_name",
            trace_id: None,
            message: Some(format!("name must be 1 to {MAX_NAME_LEN} characters")),
        });
    }
    if book.price < 0 {
        return Err(ApiError::BadRequest {
            code: "invalid_book_price",
            trace_id: None,
            message: Some("price must not be negative".to_string()),
        });
    }
    Ok(())
}
